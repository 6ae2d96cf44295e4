//! S3-compatible object storage gateway.

mod gateway;
pub mod sign;

pub use gateway::{ObjectStorageGateway, StorageConfig, AVATAR_BUCKET};
