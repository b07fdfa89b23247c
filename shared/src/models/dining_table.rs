//! Dining Table Model

use serde::{Deserialize, Serialize};

/// Dining table entity (桌台)
///
/// `available = false` means an open order currently holds the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiningTable {
    pub id: String,
    /// 桌号 (唯一, 正整数)
    pub number: u32,
    pub available: bool,
    pub created_at: i64,
}

/// Create dining table payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiningTableCreate {
    pub number: u32,
}

/// Manual occupancy toggle payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetOccupied {
    pub occupied: bool,
}
