pub mod adapters;
pub mod app;
pub mod domain;
pub mod ports;
pub mod services;

// Re-export key types for convenience

// Domain types - configuration, value objects and results
pub use domain::{
    BucketName,
    DeletedObjects,
    DomainValidationError,
    ListObjectsRequest,
    ObjectKey,
    ObjectListing,
    ObjectMeta,
    ObjectSummary,
    ObjectType,
    OssConfig,
    SignMethod,
    // Errors
    StorageError,
    StorageResult,
};

// Port types - the storage SDK boundary
pub use ports::{BucketClient, ClientFactory};

// The bucket façade
pub use services::{CallArgs, OssBucket};

// Application factory and configuration
pub use app::{
    AppError, StorageBackend, config_from_env, create_bucket, create_bucket_from_env,
    create_in_memory_bucket, create_oss_bucket,
};

// Adapter types - infrastructure implementations
pub use adapters::outbound::storage::{
    InMemoryClientFactory, ObjectStoreBucketClient, OssClientFactory,
};

// Public facade for easy construction
pub mod prelude {
    pub use crate::{
        BucketName, InMemoryClientFactory, ObjectKey, OssBucket, OssClientFactory, OssConfig,
        SignMethod, StorageError, StorageResult, create_in_memory_bucket, create_oss_bucket,
    };
}
