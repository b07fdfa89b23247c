//! 销售历史查询与日结

use chrono::NaiveDate;
use rust_decimal::Decimal;
use shared::models::{DailyClose, PaymentMethod, SalesQuery, SalesRecord};
use std::collections::BTreeMap;

use crate::core::{PosError, PosResult};
use crate::db::PosStorage;
use crate::db::storage::SALES;
use crate::orders::money::{to_decimal, to_f64};

#[derive(Debug, Clone)]
pub struct SalesHistory {
    storage: PosStorage,
}

impl SalesHistory {
    pub fn new(storage: PosStorage) -> Self {
        Self { storage }
    }

    pub fn get_sale(&self, sale_id: &str) -> PosResult<SalesRecord> {
        self.storage
            .read(SALES, sale_id)?
            .ok_or_else(|| PosError::not_found("sales_record", sale_id))
    }

    /// 按时间倒序
    pub fn list_sales(&self, query: &SalesQuery) -> PosResult<Vec<SalesRecord>> {
        let mut records: Vec<SalesRecord> = self.storage.read_all(SALES)?;
        records.retain(|r| query.matches(r));
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    /// 日结: 某天 (UTC) 的笔数、总额和各支付方式合计
    pub fn day_close(&self, cashier_id: Option<&str>, day: NaiveDate) -> PosResult<DailyClose> {
        let records: Vec<SalesRecord> = self.storage.read_all(SALES)?;

        let mut count = 0;
        let mut total = Decimal::ZERO;
        let mut by_method: BTreeMap<PaymentMethod, Decimal> = BTreeMap::new();
        for record in records.iter().filter(|r| {
            shared::util::day_of(r.created_at) == Some(day)
                && cashier_id.is_none_or(|c| c == r.cashier_id)
        }) {
            count += 1;
            total += to_decimal(record.total);
            for payment in &record.payments {
                *by_method.entry(payment.method).or_default() += to_decimal(payment.amount);
            }
        }

        tracing::debug!(%day, count, cashier_id = ?cashier_id, "Day close computed");
        Ok(DailyClose {
            day,
            cashier_id: cashier_id.map(str::to_string),
            count,
            total: to_f64(total),
            by_method: by_method
                .into_iter()
                .map(|(method, amount)| (method, to_f64(amount)))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::PaymentLine;

    const DAY_MS: i64 = 86_400_000;
    // 2024-01-01 00:00:00 UTC
    const JAN_1: i64 = 1_704_067_200_000;

    fn record(
        id: &str,
        cashier: &str,
        created_at: i64,
        payments: &[(PaymentMethod, f64)],
    ) -> SalesRecord {
        let payments: Vec<PaymentLine> = payments
            .iter()
            .map(|(method, amount)| PaymentLine {
                method: *method,
                amount: *amount,
                details: None,
            })
            .collect();
        SalesRecord {
            id: id.into(),
            order_id: format!("o-{id}"),
            table_id: "t1".into(),
            table_number: 1,
            cashier_id: cashier.into(),
            waiter_id: "w1".into(),
            items: vec![],
            total: payments.iter().map(|p| p.amount).sum(),
            document_type: None,
            series: None,
            number: None,
            payments,
            customer: None,
            created_at,
        }
    }

    fn history(records: &[SalesRecord]) -> SalesHistory {
        let storage = PosStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        for r in records {
            storage.put(&txn, SALES, &r.id, r).unwrap();
        }
        txn.commit().unwrap();
        SalesHistory::new(storage)
    }

    #[test]
    fn test_day_close_groups_by_method() {
        let history = history(&[
            record("s1", "c1", JAN_1 + 1_000, &[(PaymentMethod::Cash, 60.0)]),
            record(
                "s2",
                "c1",
                JAN_1 + 2_000,
                &[(PaymentMethod::Cash, 10.1), (PaymentMethod::Qr, 20.2)],
            ),
            record("s3", "c2", JAN_1 + 3_000, &[(PaymentMethod::Card, 15.0)]),
            record("s4", "c1", JAN_1 + DAY_MS, &[(PaymentMethod::Cash, 99.0)]),
        ]);
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let close = history.day_close(Some("c1"), day).unwrap();
        assert_eq!(close.count, 2);
        assert_eq!(close.total, 90.3);
        assert_eq!(close.by_method.get(&PaymentMethod::Cash), Some(&70.1));
        assert_eq!(close.by_method.get(&PaymentMethod::Qr), Some(&20.2));
        assert!(!close.by_method.contains_key(&PaymentMethod::Card));

        let all = history.day_close(None, day).unwrap();
        assert_eq!(all.count, 3);
        assert_eq!(all.total, 105.3);
    }

    #[test]
    fn test_list_sales_newest_first() {
        let history = history(&[
            record("s1", "c1", JAN_1, &[(PaymentMethod::Cash, 1.0)]),
            record("s2", "c2", JAN_1 + 10, &[(PaymentMethod::Cash, 1.0)]),
            record("s3", "c1", JAN_1 + 20, &[(PaymentMethod::Cash, 1.0)]),
        ]);

        let ids: Vec<String> = history
            .list_sales(&SalesQuery {
                cashier_id: Some("c1".into()),
                ..Default::default()
            })
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["s3", "s1"]);
        assert!(history.get_sale("missing").is_err());
    }
}
