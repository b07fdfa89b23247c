//! 审计日志后台 Worker
//!
//! 从 mpsc 通道消费 AuditRecord，写入 redb。
//! 通道关闭（所有 AuditService 句柄释放）时自动退出。
//! redb 写事务会阻塞等待其他写者，所以循环跑在 blocking 线程池上。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::service::AuditRecord;
use super::storage::AuditStorage;

/// 审计日志后台 Worker
pub struct AuditWorker {
    storage: AuditStorage,
    rx: mpsc::Receiver<AuditRecord>,
    failures: Arc<AtomicU64>,
}

impl AuditWorker {
    pub fn new(
        storage: AuditStorage,
        rx: mpsc::Receiver<AuditRecord>,
        failures: Arc<AtomicU64>,
    ) -> Self {
        Self {
            storage,
            rx,
            failures,
        }
    }

    /// 在 blocking 线程池上启动 worker
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::task::spawn_blocking(move || self.run())
    }

    /// 运行 worker（直到通道关闭），会阻塞当前线程
    pub fn run(mut self) {
        tracing::info!("📋 Audit log worker started");

        while let Some(record) = self.rx.blocking_recv() {
            self.write(record);
        }

        tracing::info!("Audit log channel closed, worker stopping");
    }

    /// 同步写入所有已排队的条目，返回写入条数
    pub fn drain(&mut self) -> usize {
        let mut written = 0;
        while let Ok(record) = self.rx.try_recv() {
            if self.write(record) {
                written += 1;
            }
        }
        written
    }

    fn write(&self, record: AuditRecord) -> bool {
        match self.storage.append(record) {
            Ok(entry) => {
                tracing::debug!(
                    audit_id = entry.id,
                    action = %entry.action,
                    entity = %entry.entity_type,
                    "Audit entry recorded"
                );
                true
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::error!("Failed to write audit entry: {:?}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::service::AuditService;
    use super::*;
    use crate::db::PosStorage;
    use shared::models::{Actor, AuditQuery, Role};
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_worker_does_not_stall_runtime_while_db_locked() {
        let storage = PosStorage::open_in_memory().unwrap();
        let audit = AuditStorage::new(storage.clone());
        let (service, worker) = AuditService::new(storage.clone(), 16);
        let handle = worker.spawn();

        // 另一个线程持有写事务，审计写入必须等待
        let (locked_tx, locked_rx) = std::sync::mpsc::channel();
        let holder = std::thread::spawn(move || {
            let txn = storage.begin_write().unwrap();
            locked_tx.send(()).unwrap();
            std::thread::sleep(Duration::from_millis(500));
            drop(txn);
        });
        locked_rx.recv().unwrap();

        service.record(AuditRecord::create(
            &Actor::new("c1", Role::Cashier),
            "order",
            "o1",
            serde_json::json!({}),
        ));

        let started = Instant::now();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(started.elapsed() < Duration::from_millis(300));

        holder.join().unwrap();
        drop(service);
        handle.await.unwrap();

        let (items, total) = audit.query(&AuditQuery::default()).unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].entity_id, "o1");
    }
}
