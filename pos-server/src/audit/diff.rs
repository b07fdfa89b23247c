//! 审计日志 JSON diff 计算
//!
//! 比较更新前后的 JSON 对象，只保留发生变化的顶层字段。
//! 浮点数使用容差比较避免精度问题。

use serde_json::{Map, Value};

/// 浮点数比较容差 (用于处理序列化/反序列化精度损失)
const FLOAT_EPSILON: f64 = 1e-9;

/// 不参与比较的字段
const IGNORED_FIELDS: &[&str] = &["updated_at"];

/// 递归比较两个 JSON 值是否相等（浮点数使用容差比较）
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(fa), Some(fb)) => (fa - fb).abs() < FLOAT_EPSILON,
            _ => a == b,
        },
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(va, vb)| values_equal(va, vb))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(key, va)| b.get(key).is_some_and(|vb| values_equal(va, vb)))
        }
        _ => a == b,
    }
}

/// 计算变更字段
///
/// 返回 `(old_values, new_values)`，两边只包含变化的字段。
/// 非对象值按整体比较。没有变化时返回 `(None, None)`。
pub fn changed_values(old: &Value, new: &Value) -> (Option<Value>, Option<Value>) {
    let (Value::Object(old_map), Value::Object(new_map)) = (old, new) else {
        if values_equal(old, new) {
            return (None, None);
        }
        return (Some(old.clone()), Some(new.clone()));
    };

    let mut old_changed = Map::new();
    let mut new_changed = Map::new();

    for (key, new_value) in new_map {
        if IGNORED_FIELDS.contains(&key.as_str()) {
            continue;
        }
        match old_map.get(key) {
            Some(old_value) if values_equal(old_value, new_value) => {}
            Some(old_value) => {
                old_changed.insert(key.clone(), old_value.clone());
                new_changed.insert(key.clone(), new_value.clone());
            }
            None => {
                new_changed.insert(key.clone(), new_value.clone());
            }
        }
    }
    for (key, old_value) in old_map {
        if !new_map.contains_key(key) && !IGNORED_FIELDS.contains(&key.as_str()) {
            old_changed.insert(key.clone(), old_value.clone());
        }
    }

    if old_changed.is_empty() && new_changed.is_empty() {
        return (None, None);
    }
    (Some(Value::Object(old_changed)), Some(Value::Object(new_changed)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_only_changed_fields_are_kept() {
        let old = json!({"status": "pending", "total": 60.0, "table_id": "t1", "updated_at": 1});
        let new = json!({"status": "delivered", "total": 60.0, "table_id": "t1", "updated_at": 2});

        let (old_values, new_values) = changed_values(&old, &new);
        assert_eq!(old_values, Some(json!({"status": "pending"})));
        assert_eq!(new_values, Some(json!({"status": "delivered"})));
    }

    #[test]
    fn test_no_change_returns_none() {
        let value = json!({"available": true});
        assert_eq!(changed_values(&value, &value), (None, None));
    }

    #[test]
    fn test_float_tolerance() {
        let old = json!({"total": 0.30000000000000004});
        let new = json!({"total": 0.3});
        assert_eq!(changed_values(&old, &new), (None, None));
    }

    #[test]
    fn test_nested_items_change() {
        let old = json!({"items": [{"qty": 1}]});
        let new = json!({"items": [{"qty": 2}]});
        let (old_values, new_values) = changed_values(&old, &new);
        assert_eq!(old_values, Some(json!({"items": [{"qty": 1}]})));
        assert_eq!(new_values, Some(json!({"items": [{"qty": 2}]})));
    }
}
