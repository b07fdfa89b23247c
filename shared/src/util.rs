/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// 生成资源 ID (UUID v4, simple 格式)
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// 毫秒时间戳所在的 UTC 日期
pub fn day_of(millis: i64) -> Option<chrono::NaiveDate> {
    chrono::DateTime::from_timestamp_millis(millis).map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_unique() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_day_of() {
        // 2024-01-01 00:00:00 UTC
        let day = day_of(1_704_067_200_000).unwrap();
        assert_eq!(day, chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }
}
