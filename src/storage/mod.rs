pub mod engine;
pub mod memory;
pub mod s3;

pub use engine::ObjectStorage;
pub use memory::{InMemoryStorage, StorageCall, StorageOp, StoredObject};
pub use s3::{S3Storage, s3_client};
