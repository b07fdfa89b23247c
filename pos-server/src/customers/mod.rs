//! 客户目录 (按证件号)
//!
//! 结账时填写的客户信息会合并进来，下次按证件号直接带出。

use redb::WriteTransaction;
use shared::models::{Actor, Customer};
use std::sync::Arc;

use crate::audit::{AuditRecord, AuditService, snapshot};
use crate::core::{PosError, PosResult};
use crate::db::storage::CUSTOMERS;
use crate::db::{PosStorage, StorageResult};

const RESOURCE: &str = "customer";

#[derive(Debug, Clone)]
pub struct CustomerDirectory {
    storage: PosStorage,
    audit: Arc<AuditService>,
}

impl CustomerDirectory {
    pub fn new(storage: PosStorage, audit: Arc<AuditService>) -> Self {
        Self { storage, audit }
    }

    pub fn find_customer(&self, document: &str) -> PosResult<Customer> {
        self.storage
            .read(CUSTOMERS, document.trim())?
            .ok_or_else(|| PosError::not_found(RESOURCE, document))
    }

    /// 新建或合并客户
    pub fn upsert_customer(&self, customer: Customer, actor: &Actor) -> PosResult<Customer> {
        validate_customer(&customer)?;

        let txn = self.storage.begin_write()?;
        let (before, merged) = upsert_txn(&self.storage, &txn, customer)?;
        txn.commit()?;

        tracing::debug!(document = %merged.document, "Customer saved");
        let record = match before {
            Some(before) => AuditRecord::update(
                actor,
                RESOURCE,
                &merged.document,
                &snapshot(&before),
                &snapshot(&merged),
            ),
            None => AuditRecord::create(actor, RESOURCE, &merged.document, snapshot(&merged)),
        };
        self.audit.record(record.with_name(merged.name.clone()));
        Ok(merged)
    }
}

/// 证件号与证件类型匹配，姓名非空
pub fn validate_customer(customer: &Customer) -> PosResult<()> {
    if !customer.has_valid_document() {
        return Err(PosError::InvalidDocument(customer.document.clone()));
    }
    if customer.name.trim().is_empty() {
        return Err(PosError::validation("customer name must not be empty"));
    }
    Ok(())
}

/// 在调用方事务内合并写入，返回 (旧值, 新值)
pub(crate) fn upsert_txn(
    storage: &PosStorage,
    txn: &WriteTransaction,
    incoming: Customer,
) -> StorageResult<(Option<Customer>, Customer)> {
    let existing: Option<Customer> = storage.get_txn(txn, CUSTOMERS, &incoming.document)?;
    let merged = merge(existing.as_ref(), incoming);
    storage.put(txn, CUSTOMERS, &merged.document, &merged)?;
    Ok((existing, merged))
}

/// 新值覆盖旧值；未提供地址时保留原地址
fn merge(existing: Option<&Customer>, incoming: Customer) -> Customer {
    let address = incoming
        .address
        .filter(|a| !a.trim().is_empty())
        .or_else(|| existing.and_then(|e| e.address.clone()));
    Customer {
        document: incoming.document.trim().to_string(),
        doc_type: incoming.doc_type,
        name: incoming.name.trim().to_string(),
        address,
        updated_at: shared::util::now_millis(),
    }
}
