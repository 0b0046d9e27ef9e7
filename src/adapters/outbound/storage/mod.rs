// Infrastructure error conversions
pub mod error;

// Storage implementations
pub mod memory;
pub mod object_store_client;

// Provider-specific implementations
pub mod oss;

// Re-export key types
pub use memory::{InMemoryBuckets, InMemoryClientFactory};
pub use object_store_client::{BackendProvider, BucketBackend, ObjectStoreBucketClient};
pub use oss::{OssBackends, OssClientFactory};
