//! 嵌入式存储 (redb)

pub mod storage;

pub use storage::{PosStorage, StorageError, StorageResult};
