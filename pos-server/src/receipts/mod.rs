//! 票据号分配 (boleta / factura)

mod allocator;

pub use allocator::ReceiptAllocator;
