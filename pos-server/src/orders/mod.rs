//! Order lifecycle
//!
//! - **manager**: `OrdersManager`, creation / item editing / delivery / deletion
//! - **money**: Decimal-backed totals and payment checks
//!
//! # Lifecycle
//!
//! ```text
//! create ──► pending ──deliver──► delivered ──settle (checkout)──► settled
//!               │
//!               └──delete──► (archived + removed, table released)
//! ```
//!
//! Every transition that touches the table runs in the same redb write
//! transaction as the order write.

pub mod manager;
pub mod money;

pub use manager::OrdersManager;
