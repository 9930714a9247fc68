pub mod in_memory;
pub mod mailer;
pub mod midtrans;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
