//! redb-based storage layer for the POS engine
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `tables` | `table_id` | `DiningTable` | 桌台 |
//! | `table_numbers` | `number` | `table_id` | 桌号唯一索引 |
//! | `orders` | `order_id` | `Order` | 订单 |
//! | `receipt_reservations` | `reservation_id` | `ReceiptReservation` | 票据号预留 |
//! | `series_counters` | `series` | `u64` | 每个序列最后发出的号码 |
//! | `sales_records` | `sale_id` | `SalesRecord` | 销售历史 (不可变) |
//! | `audit_entries` | `sequence` | `AuditEntry` | 审计日志 (append-only) |
//! | `archived_entities` | `archive_id` | `ArchivedEntity` | 删除前快照 |
//! | `customers` | `document` | `Customer` | 客户 |
//! | `backups` | `backup_id` | `Backup` | JSON 备份 |
//!
//! # Atomicity
//!
//! redb serialises write transactions. Every multi-entity unit (open order +
//! claim table, settle, delete pending order + release table, reserve number
//! + bump counter) runs inside ONE `WriteTransaction` and re-reads its
//! preconditions there. Dropping the transaction without `commit()` aborts it.

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::models::{DiningTable, Order};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// JSON 值表 (字符串键)
pub type JsonTable = TableDefinition<'static, &'static str, &'static [u8]>;

/// 桌台: key = table_id
pub const TABLES: JsonTable = TableDefinition::new("tables");

/// 桌号索引: key = number, value = table_id
pub const TABLE_NUMBERS: TableDefinition<u32, &str> = TableDefinition::new("table_numbers");

/// 订单: key = order_id
pub const ORDERS: JsonTable = TableDefinition::new("orders");

/// 票据号预留: key = reservation_id
pub const RESERVATIONS: JsonTable = TableDefinition::new("receipt_reservations");

/// 序列计数器: key = series ("B001"), value = last issued
pub const SERIES_COUNTERS: TableDefinition<&str, u64> = TableDefinition::new("series_counters");

/// 销售记录: key = sale_id
pub const SALES: JsonTable = TableDefinition::new("sales_records");

/// 审计日志: key = sequence
pub const AUDIT_ENTRIES: TableDefinition<u64, &[u8]> = TableDefinition::new("audit_entries");

/// 删除前快照: key = archive_id
pub const ARCHIVED: JsonTable = TableDefinition::new("archived_entities");

/// 客户: key = document
pub const CUSTOMERS: JsonTable = TableDefinition::new("customers");

/// 备份: key = backup_id
pub const BACKUPS: JsonTable = TableDefinition::new("backups");

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// POS storage backed by redb
#[derive(Clone)]
pub struct PosStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for PosStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PosStorage").finish_non_exhaustive()
    }
}

impl PosStorage {
    /// Open or create the database at the given path
    ///
    /// redb commits with `Durability::Immediate` by default: once `commit()`
    /// returns the write is on disk, and the file is always consistent.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        // Create all tables if they don't exist
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(TABLES)?;
            let _ = write_txn.open_table(TABLE_NUMBERS)?;
            let _ = write_txn.open_table(ORDERS)?;
            let _ = write_txn.open_table(RESERVATIONS)?;
            let _ = write_txn.open_table(SERIES_COUNTERS)?;
            let _ = write_txn.open_table(SALES)?;
            let _ = write_txn.open_table(AUDIT_ENTRIES)?;
            let _ = write_txn.open_table(ARCHIVED)?;
            let _ = write_txn.open_table(CUSTOMERS)?;
            let _ = write_txn.open_table(BACKUPS)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    ///
    /// Blocks until any other write transaction has finished.
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    /// Begin a read transaction (consistent snapshot)
    pub fn begin_read(&self) -> StorageResult<redb::ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    // ========== Generic JSON helpers ==========

    /// Read one value (outside transaction)
    pub fn read<T: DeserializeOwned>(&self, def: JsonTable, key: &str) -> StorageResult<Option<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(def)?;
        let value = match table.get(key)? {
            Some(guard) => Some(serde_json::from_slice(guard.value())?),
            None => None,
        };
        Ok(value)
    }

    /// Read every value of a table (outside transaction)
    pub fn read_all<T: DeserializeOwned>(&self, def: JsonTable) -> StorageResult<Vec<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(def)?;

        let mut values = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            values.push(serde_json::from_slice(value.value())?);
        }
        Ok(values)
    }

    /// Number of rows in a table
    pub fn count(&self, def: JsonTable) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(def)?;
        Ok(table.len()?)
    }

    /// Read one value (within transaction)
    pub fn get_txn<T: DeserializeOwned>(
        &self,
        txn: &WriteTransaction,
        def: JsonTable,
        key: &str,
    ) -> StorageResult<Option<T>> {
        let table = txn.open_table(def)?;
        let value = match table.get(key)? {
            Some(guard) => Some(serde_json::from_slice(guard.value())?),
            None => None,
        };
        Ok(value)
    }

    /// Read every value of a table (within transaction)
    pub fn all_txn<T: DeserializeOwned>(
        &self,
        txn: &WriteTransaction,
        def: JsonTable,
    ) -> StorageResult<Vec<T>> {
        let table = txn.open_table(def)?;

        let mut values = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            values.push(serde_json::from_slice(value.value())?);
        }
        Ok(values)
    }

    /// Insert or overwrite one value
    pub fn put<T: Serialize>(
        &self,
        txn: &WriteTransaction,
        def: JsonTable,
        key: &str,
        value: &T,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(def)?;
        let bytes = serde_json::to_vec(value)?;
        table.insert(key, bytes.as_slice())?;
        Ok(())
    }

    /// Remove one value, returns whether it existed
    pub fn remove(&self, txn: &WriteTransaction, def: JsonTable, key: &str) -> StorageResult<bool> {
        let mut table = txn.open_table(def)?;
        let existed = table.remove(key)?.is_some();
        Ok(existed)
    }

    // ========== Tables ==========

    pub fn get_table_txn(
        &self,
        txn: &WriteTransaction,
        table_id: &str,
    ) -> StorageResult<Option<DiningTable>> {
        self.get_txn(txn, TABLES, table_id)
    }

    pub fn store_table(&self, txn: &WriteTransaction, table: &DiningTable) -> StorageResult<()> {
        self.put(txn, TABLES, &table.id, table)
    }

    /// Look up the table id owning a number (within transaction)
    pub fn table_id_for_number_txn(
        &self,
        txn: &WriteTransaction,
        number: u32,
    ) -> StorageResult<Option<String>> {
        let index = txn.open_table(TABLE_NUMBERS)?;
        let id = index.get(number)?.map(|guard| guard.value().to_string());
        Ok(id)
    }

    pub fn index_table_number(
        &self,
        txn: &WriteTransaction,
        number: u32,
        table_id: &str,
    ) -> StorageResult<()> {
        let mut index = txn.open_table(TABLE_NUMBERS)?;
        index.insert(number, table_id)?;
        Ok(())
    }

    pub fn unindex_table_number(&self, txn: &WriteTransaction, number: u32) -> StorageResult<()> {
        let mut index = txn.open_table(TABLE_NUMBERS)?;
        index.remove(number)?;
        Ok(())
    }

    // ========== Orders ==========

    pub fn get_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<Order>> {
        self.get_txn(txn, ORDERS, order_id)
    }

    pub fn store_order(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        self.put(txn, ORDERS, &order.id, order)
    }

    /// Find an open (pending | delivered) order on a table (within transaction)
    pub fn find_open_order_for_table_txn(
        &self,
        txn: &WriteTransaction,
        table_id: &str,
    ) -> StorageResult<Option<Order>> {
        let orders: Vec<Order> = self.all_txn(txn, ORDERS)?;
        Ok(orders
            .into_iter()
            .find(|o| o.table_id == table_id && o.status.is_open()))
    }

    // ========== Series Counters ==========

    /// Increment a series counter and return the NEW value (within transaction)
    pub fn increment_counter(&self, txn: &WriteTransaction, series: &str) -> StorageResult<u64> {
        let mut table = txn.open_table(SERIES_COUNTERS)?;
        let current = table.get(series)?.map(|guard| guard.value()).unwrap_or(0);
        let next = current + 1;
        table.insert(series, next)?;
        Ok(next)
    }

    /// Last issued number of a series (0 if none)
    pub fn current_counter(&self, series: &str) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SERIES_COUNTERS)?;
        Ok(table.get(series)?.map(|guard| guard.value()).unwrap_or(0))
    }
}
