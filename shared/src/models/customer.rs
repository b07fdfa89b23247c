//! Customer Model

use serde::{Deserialize, Serialize};

/// 证件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerDocType {
    /// 个人身份证 (8 位)
    Dni,
    /// 纳税人号 (11 位)
    Ruc,
}

/// 客户 (以证件号为键)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub document: String,
    pub doc_type: CustomerDocType,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub updated_at: i64,
}

/// DNI: 8 位数字，不以 0 开头
pub fn is_valid_dni(document: &str) -> bool {
    document.len() == 8
        && document.bytes().all(|b| b.is_ascii_digit())
        && !document.starts_with('0')
}

/// RUC: 11 位数字，以 10 或 20 开头
pub fn is_valid_ruc(document: &str) -> bool {
    document.len() == 11
        && document.bytes().all(|b| b.is_ascii_digit())
        && (document.starts_with("10") || document.starts_with("20"))
}

impl Customer {
    /// 证件号是否符合证件类型
    pub fn has_valid_document(&self) -> bool {
        match self.doc_type {
            CustomerDocType::Dni => is_valid_dni(&self.document),
            CustomerDocType::Ruc => is_valid_ruc(&self.document),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dni_validation() {
        assert!(is_valid_dni("45678912"));
        assert!(!is_valid_dni("05678912"));
        assert!(!is_valid_dni("4567891"));
        assert!(!is_valid_dni("4567891a"));
    }

    #[test]
    fn test_ruc_validation() {
        assert!(is_valid_ruc("20123456789"));
        assert!(is_valid_ruc("10123456789"));
        assert!(!is_valid_ruc("30123456789"));
        assert!(!is_valid_ruc("2012345678"));
    }

    #[test]
    fn test_customer_document_check() {
        let customer = Customer {
            document: "20123456789".into(),
            doc_type: CustomerDocType::Dni,
            name: "ACME SAC".into(),
            address: None,
            updated_at: 0,
        };
        assert!(!customer.has_valid_document());
    }
}
