use super::*;
use crate::db::storage::SALES;
use shared::models::{DocumentType, SalesRecord};
use std::collections::HashSet;
use std::sync::Barrier;

const THREADS: usize = 8;

#[test]
fn test_concurrent_settle_has_one_winner() {
    let engine = create_test_engine();
    let (table, order) = delivered_order(&engine, 5);
    let barrier = Barrier::new(2);

    let results: Vec<PosResult<SalesRecord>> = std::thread::scope(|s| {
        let handles: Vec<_> = ["c1", "c2"]
            .into_iter()
            .map(|id| {
                let engine = &engine;
                let barrier = &barrier;
                let order_id = order.id.clone();
                s.spawn(move || {
                    barrier.wait();
                    engine
                        .checkout
                        .settle(&order_id, &cashier(id), settle_cash(60.0, None))
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    let loser = results.into_iter().find_map(Result::err).unwrap();
    assert!(matches!(loser, PosError::InvalidState { .. }));

    assert_eq!(engine.storage.read_all::<SalesRecord>(SALES).unwrap().len(), 1);
    assert_eq!(
        engine.orders.get_order(&order.id).unwrap().status,
        OrderStatus::Settled
    );
    assert!(engine.tables.get_table(&table.id).unwrap().available);
}

#[test]
fn test_concurrent_reserve_is_unique_and_monotonic() {
    const PER_THREAD: usize = 25;
    let engine = create_test_engine();
    let barrier = Barrier::new(THREADS);

    let per_thread: Vec<Vec<u64>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let engine = &engine;
                let barrier = &barrier;
                s.spawn(move || {
                    let actor = cashier(&format!("c{i}"));
                    barrier.wait();
                    (0..PER_THREAD)
                        .map(|_| {
                            let r = engine
                                .receipts
                                .reserve(DocumentType::Boleta, None, &actor)
                                .unwrap();
                            r.number.parse::<u64>().unwrap()
                        })
                        .collect::<Vec<u64>>()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    // 每个调用方看到的号码严格递增
    for numbers in &per_thread {
        assert!(numbers.windows(2).all(|w| w[0] < w[1]));
    }

    // 全局无重复、无跳号
    let all: HashSet<u64> = per_thread.iter().flatten().copied().collect();
    let total = (THREADS * PER_THREAD) as u64;
    assert_eq!(all.len() as u64, total);
    assert_eq!(all, (1..=total).collect::<HashSet<u64>>());
    assert_eq!(
        engine.receipts.current_counter(DocumentType::Boleta).unwrap(),
        total
    );
    assert_eq!(
        engine.receipts.current_counter(DocumentType::Factura).unwrap(),
        0
    );
}

#[test]
fn test_concurrent_create_on_same_table() {
    let engine = create_test_engine();
    let table = engine.tables.create_table(9, &admin()).unwrap();
    let barrier = Barrier::new(THREADS);

    let results: Vec<PosResult<Order>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let engine = &engine;
                let barrier = &barrier;
                let table_id = table.id.clone();
                s.spawn(move || {
                    let actor = Actor::new(format!("w{i}"), Role::Waiter);
                    barrier.wait();
                    engine.orders.create_order(
                        CreateOrder {
                            table_id,
                            items: vec![line(pollo(), 1)],
                        },
                        &actor,
                    )
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, PosError::TableUnavailable(_)))
    );
    assert_eq!(
        engine
            .orders
            .list_orders(&OrderFilter::default())
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn test_concurrent_settle_and_delete_never_both_apply() {
    let engine = create_test_engine();
    let (_table, order) = delivered_order(&engine, 1);
    let barrier = Barrier::new(2);

    let (settled, deleted) = std::thread::scope(|s| {
        let settle = s.spawn(|| {
            barrier.wait();
            engine
                .checkout
                .settle(&order.id, &cashier("c1"), settle_cash(60.0, None))
        });
        let delete = s.spawn(|| {
            barrier.wait();
            engine.orders.delete_pending(&order.id, &admin(), None)
        });
        (settle.join().unwrap(), delete.join().unwrap())
    });

    // delivered 订单不能删除，结账必定成功
    assert!(settled.is_ok());
    assert!(matches!(deleted, Err(PosError::InvalidState { .. })));
    assert_eq!(
        engine.orders.get_order(&order.id).unwrap().status,
        OrderStatus::Settled
    );
}
