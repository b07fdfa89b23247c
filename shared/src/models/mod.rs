//! Data models
//!
//! Shared between the engine and its clients (via API).
//! All IDs are `String` (generated UUIDs) except audit sequences and
//! series counters, which are keyed by sequence number and series name.

pub mod actor;
pub mod audit;
pub mod backup;
pub mod customer;
pub mod dining_table;
pub mod order;
pub mod receipt;
pub mod sale;

// Re-exports
pub use actor::*;
pub use audit::*;
pub use backup::*;
pub use customer::*;
pub use dining_table::*;
pub use order::*;
pub use receipt::*;
pub use sale::*;
