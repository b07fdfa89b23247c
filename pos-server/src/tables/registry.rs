//! Table Registry
//!
//! 桌台的创建、占用切换和删除。订单创建/结账对占用标志的修改
//! 在各自的事务内完成，不经过这里。

use shared::models::{Actor, DiningTable, Order};
use std::sync::Arc;

use crate::audit::{AuditRecord, AuditService, snapshot};
use crate::core::{PosError, PosResult};
use crate::db::PosStorage;
use crate::db::storage::{ORDERS, TABLES};

const RESOURCE: &str = "dining_table";

#[derive(Debug, Clone)]
pub struct TableRegistry {
    storage: PosStorage,
    audit: Arc<AuditService>,
}

impl TableRegistry {
    pub fn new(storage: PosStorage, audit: Arc<AuditService>) -> Self {
        Self { storage, audit }
    }

    /// 创建桌台
    ///
    /// 桌号必须为正整数且唯一，否则返回 `Validation` / `DuplicateTable`。
    pub fn create_table(&self, number: u32, actor: &Actor) -> PosResult<DiningTable> {
        if number == 0 {
            return Err(PosError::validation("table number must be a positive integer"));
        }

        let txn = self.storage.begin_write()?;
        if self.storage.table_id_for_number_txn(&txn, number)?.is_some() {
            return Err(PosError::DuplicateTable(number));
        }

        let table = DiningTable {
            id: shared::util::generate_id(),
            number,
            available: true,
            created_at: shared::util::now_millis(),
        };
        self.storage.store_table(&txn, &table)?;
        self.storage.index_table_number(&txn, number, &table.id)?;
        txn.commit()?;

        tracing::info!(table_id = %table.id, number, "Table created");
        self.audit.record(
            AuditRecord::create(actor, RESOURCE, &table.id, snapshot(&table))
                .with_name(format!("Table {}", number)),
        );
        Ok(table)
    }

    /// 手动切换占用状态（幂等）
    pub fn set_occupied(
        &self,
        table_id: &str,
        occupied: bool,
        actor: &Actor,
    ) -> PosResult<DiningTable> {
        let txn = self.storage.begin_write()?;
        let mut table = self
            .storage
            .get_table_txn(&txn, table_id)?
            .ok_or_else(|| PosError::not_found(RESOURCE, table_id))?;

        if table.available == !occupied {
            // 已是目标状态，不写入也不记审计
            return Ok(table);
        }

        let before = snapshot(&table);
        table.available = !occupied;
        self.storage.store_table(&txn, &table)?;
        txn.commit()?;

        tracing::debug!(table_id = %table_id, occupied, "Table occupancy toggled");
        self.audit.record(AuditRecord::update(
            actor,
            RESOURCE,
            table_id,
            &before,
            &snapshot(&table),
        ));
        Ok(table)
    }

    pub fn get_table(&self, table_id: &str) -> PosResult<DiningTable> {
        self.storage
            .read(TABLES, table_id)?
            .ok_or_else(|| PosError::not_found(RESOURCE, table_id))
    }

    /// 所有桌台（按桌号排序）
    pub fn list_tables(&self) -> PosResult<Vec<DiningTable>> {
        let mut tables: Vec<DiningTable> = self.storage.read_all(TABLES)?;
        tables.sort_by_key(|t| t.number);
        Ok(tables)
    }

    /// 空闲桌台
    ///
    /// 结果只用于选桌展示，下单时会在事务内重新校验。
    pub fn list_available(&self) -> PosResult<Vec<DiningTable>> {
        let mut tables = self.list_tables()?;
        tables.retain(|t| t.available);
        Ok(tables)
    }

    /// 删除桌台
    ///
    /// 仍有未结账订单 (pending / delivered) 时拒绝。删除前先归档快照。
    pub fn delete_table(&self, table_id: &str, actor: &Actor, reason: Option<&str>) -> PosResult<()> {
        let table = self.get_table(table_id)?;
        self.ensure_no_open_order(table_id)?;

        self.audit.archive(RESOURCE, table_id, &table, actor, reason);

        let txn = self.storage.begin_write()?;
        let Some(current) = self.storage.get_table_txn(&txn, table_id)? else {
            return Err(PosError::not_found(RESOURCE, table_id));
        };
        if let Some(order) = self.storage.find_open_order_for_table_txn(&txn, table_id)? {
            return Err(PosError::invalid_state(
                RESOURCE,
                table_id,
                format!("order {} is still open", order.id),
            ));
        }
        self.storage.remove(&txn, TABLES, table_id)?;
        self.storage.unindex_table_number(&txn, current.number)?;
        txn.commit()?;

        tracing::info!(table_id = %table_id, number = current.number, "Table deleted");
        self.audit.record(
            AuditRecord::delete(actor, RESOURCE, table_id, snapshot(&current))
                .with_name(format!("Table {}", current.number)),
        );
        Ok(())
    }

    fn ensure_no_open_order(&self, table_id: &str) -> PosResult<()> {
        let orders: Vec<Order> = self.storage.read_all(ORDERS)?;
        if let Some(order) = orders
            .iter()
            .find(|o| o.table_id == table_id && o.status.is_open())
        {
            return Err(PosError::invalid_state(
                RESOURCE,
                table_id,
                format!("order {} is still open", order.id),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditWorker;
    use shared::models::{OrderStatus, Role};

    struct Fixture {
        registry: TableRegistry,
        storage: PosStorage,
        audit: Arc<AuditService>,
        _worker: AuditWorker,
    }

    fn setup() -> Fixture {
        let storage = PosStorage::open_in_memory().unwrap();
        let (audit, worker) = AuditService::new(storage.clone(), 64);
        Fixture {
            registry: TableRegistry::new(storage.clone(), audit.clone()),
            storage,
            audit,
            _worker: worker,
        }
    }

    fn admin() -> Actor {
        Actor::new("admin-1", Role::Admin)
    }

    fn put_order(storage: &PosStorage, table_id: &str, status: OrderStatus) {
        let order = Order {
            id: shared::util::generate_id(),
            table_id: table_id.to_string(),
            table_number: 1,
            owner_id: "w1".into(),
            items: vec![],
            total: 0.0,
            status,
            created_at: 0,
            updated_at: 0,
        };
        let txn = storage.begin_write().unwrap();
        storage.store_order(&txn, &order).unwrap();
        txn.commit().unwrap();
    }

    #[test]
    fn test_create_table() {
        let fx = setup();
        let registry = &fx.registry;
        let table = registry.create_table(5, &admin()).unwrap();
        assert_eq!(table.number, 5);
        assert!(table.available);
        assert_eq!(registry.get_table(&table.id).unwrap(), table);
    }

    #[test]
    fn test_duplicate_number_rejected() {
        let fx = setup();
        let registry = &fx.registry;
        registry.create_table(5, &admin()).unwrap();
        let err = registry.create_table(5, &admin()).unwrap_err();
        assert!(matches!(err, PosError::DuplicateTable(5)));
        assert_eq!(registry.list_tables().unwrap().len(), 1);
    }

    #[test]
    fn test_zero_number_rejected() {
        let fx = setup();
        let registry = &fx.registry;
        let err = registry.create_table(0, &admin()).unwrap_err();
        assert!(matches!(err, PosError::Validation(_)));
    }

    #[test]
    fn test_set_occupied_is_idempotent() {
        let fx = setup();
        let registry = &fx.registry;
        let table = registry.create_table(3, &admin()).unwrap();

        let t = registry.set_occupied(&table.id, true, &admin()).unwrap();
        assert!(!t.available);
        let t = registry.set_occupied(&table.id, true, &admin()).unwrap();
        assert!(!t.available);

        let t = registry.set_occupied(&table.id, false, &admin()).unwrap();
        assert!(t.available);
    }

    #[test]
    fn test_set_occupied_unknown_table() {
        let fx = setup();
        let registry = &fx.registry;
        let err = registry.set_occupied("missing", true, &admin()).unwrap_err();
        assert!(matches!(err, PosError::NotFound { entity: "dining_table", .. }));
    }

    #[test]
    fn test_list_available_sorted() {
        let fx = setup();
        let registry = &fx.registry;
        let t9 = registry.create_table(9, &admin()).unwrap();
        registry.create_table(2, &admin()).unwrap();
        let t4 = registry.create_table(4, &admin()).unwrap();
        registry.set_occupied(&t4.id, true, &admin()).unwrap();

        let numbers: Vec<u32> = registry
            .list_available()
            .unwrap()
            .iter()
            .map(|t| t.number)
            .collect();
        assert_eq!(numbers, vec![2, 9]);
        assert_eq!(registry.list_tables().unwrap().len(), 3);
        assert!(registry.get_table(&t9.id).unwrap().available);
    }

    #[test]
    fn test_delete_table_archives_and_frees_number() {
        let fx = setup();
        let (registry, audit) = (&fx.registry, &fx.audit);
        let table = registry.create_table(7, &admin()).unwrap();

        registry.delete_table(&table.id, &admin(), Some("broken")).unwrap();
        assert!(registry.get_table(&table.id).is_err());

        let archived = audit.list_archived(Some("dining_table")).unwrap();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].entity_id, table.id);

        // 桌号可以重新使用
        registry.create_table(7, &admin()).unwrap();
    }

    #[test]
    fn test_delete_table_with_open_order_rejected() {
        let fx = setup();
        let (registry, storage, audit) = (&fx.registry, &fx.storage, &fx.audit);
        let table = registry.create_table(1, &admin()).unwrap();
        put_order(storage, &table.id, OrderStatus::Delivered);

        let err = registry.delete_table(&table.id, &admin(), None).unwrap_err();
        assert!(matches!(err, PosError::InvalidState { .. }));
        assert!(registry.get_table(&table.id).is_ok());
        assert!(audit.list_archived(None).unwrap().is_empty());
    }

    #[test]
    fn test_delete_table_with_settled_order_allowed() {
        let fx = setup();
        let (registry, storage) = (&fx.registry, &fx.storage);
        let table = registry.create_table(1, &admin()).unwrap();
        put_order(storage, &table.id, OrderStatus::Settled);

        registry.delete_table(&table.id, &admin(), None).unwrap();
    }

    #[test]
    fn test_delete_proceeds_when_archive_fails() {
        let fx = setup();
        let (registry, audit) = (&fx.registry, &fx.audit);
        let table = registry.create_table(2, &admin()).unwrap();
        audit.set_fail_archive(true);

        registry.delete_table(&table.id, &admin(), None).unwrap();
        assert!(registry.get_table(&table.id).is_err());
        assert_eq!(audit.failure_count(), 1);
    }
}
