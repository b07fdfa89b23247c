use super::*;
use crate::audit::AuditWorker;
use crate::checkout::CheckoutEngine;
use crate::receipts::ReceiptAllocator;
use crate::tables::TableRegistry;
use shared::models::{
    DiningTable, MenuItemRef, OrderLineInput, PaymentLine, PaymentMethod, Role, SettleRequest,
};

mod test_concurrency;

struct TestEngine {
    tables: TableRegistry,
    orders: OrdersManager,
    receipts: ReceiptAllocator,
    checkout: CheckoutEngine,
    audit: Arc<AuditService>,
    storage: PosStorage,
    worker: AuditWorker,
}

fn create_test_engine() -> TestEngine {
    let storage = PosStorage::open_in_memory().unwrap();
    let (audit, worker) = AuditService::new(storage.clone(), 4096);
    let orders = OrdersManager::new(storage.clone(), audit.clone());
    let checkout = CheckoutEngine::new(storage.clone(), audit.clone(), orders.event_sender(), 0.01);
    TestEngine {
        tables: TableRegistry::new(storage.clone(), audit.clone()),
        receipts: ReceiptAllocator::new(storage.clone(), audit.clone(), false),
        orders,
        checkout,
        audit,
        storage,
        worker,
    }
}

fn admin() -> Actor {
    Actor::new("admin-1", Role::Admin)
}

fn waiter() -> Actor {
    Actor::new("waiter-1", Role::Waiter)
}

fn cashier(id: &str) -> Actor {
    Actor::new(id, Role::Cashier)
}

fn menu_item(id: &str, name: &str, price: f64) -> MenuItemRef {
    MenuItemRef {
        id: id.to_string(),
        name: name.to_string(),
        unit_price: price,
    }
}

fn pollo() -> MenuItemRef {
    menu_item("m-pollo", "Pollo", 30.0)
}

fn line(item: MenuItemRef, qty: u32) -> OrderLineInput {
    OrderLineInput { item, qty }
}

fn cash(amount: f64) -> PaymentLine {
    PaymentLine {
        method: PaymentMethod::Cash,
        amount,
        details: None,
    }
}

// ========================================================================
// Helper: table + order in a given state
// ========================================================================

fn open_order(engine: &TestEngine, number: u32, items: Vec<OrderLineInput>) -> (DiningTable, Order) {
    let table = engine.tables.create_table(number, &admin()).unwrap();
    let order = engine
        .orders
        .create_order(
            CreateOrder {
                table_id: table.id.clone(),
                items,
            },
            &waiter(),
        )
        .unwrap();
    (table, order)
}

fn delivered_order(engine: &TestEngine, number: u32) -> (DiningTable, Order) {
    let (table, order) = open_order(engine, number, vec![line(pollo(), 2)]);
    let order = engine.orders.deliver(&order.id, &waiter()).unwrap();
    (table, order)
}

fn settle_cash(amount: f64, reservation_id: Option<String>) -> SettleRequest {
    SettleRequest {
        payments: vec![cash(amount)],
        reservation_id,
        customer: None,
    }
}
