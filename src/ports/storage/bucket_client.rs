use std::{path::Path, sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::{
    errors::StorageResult,
    models::{DeletedObjects, ListObjectsRequest, ObjectListing, ObjectMeta, OssConfig, SignMethod},
    value_objects::{BucketName, ObjectKey},
};

/// Port for the storage SDK client.
///
/// One method per provider operation, each scoped by the bucket it acts on.
/// Implementations own the wire protocol; callers only see results or a
/// [`StorageError`](crate::domain::errors::StorageError).
#[async_trait]
pub trait BucketClient: Send + Sync + 'static {
    /// List objects and common prefixes
    async fn list_objects(
        &self,
        bucket: &BucketName,
        request: &ListObjectsRequest,
    ) -> StorageResult<ObjectListing>;

    /// Create an empty directory marker; `key` ends with '/'
    async fn create_object_dir(&self, bucket: &BucketName, key: &ObjectKey) -> StorageResult<()>;

    /// Store object content, replacing any existing object
    async fn put_object(&self, bucket: &BucketName, key: &ObjectKey, content: Bytes)
    -> StorageResult<()>;

    /// Store the content of a local file
    async fn upload_file(&self, bucket: &BucketName, key: &ObjectKey, file: &Path)
    -> StorageResult<()>;

    /// Append content at `position`, returning the next append position
    async fn append_object(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
        content: Bytes,
        position: u64,
    ) -> StorageResult<u64>;

    /// Append a local file at `position`, returning the next append position
    async fn append_file(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
        file: &Path,
        position: u64,
    ) -> StorageResult<u64>;

    /// Copy an object, possibly into another bucket of the same region
    async fn copy_object(
        &self,
        from_bucket: &BucketName,
        from_key: &ObjectKey,
        to_bucket: &BucketName,
        to_key: &ObjectKey,
    ) -> StorageResult<()>;

    /// Fetch object metadata without its content
    async fn get_object_meta(&self, bucket: &BucketName, key: &ObjectKey)
    -> StorageResult<ObjectMeta>;

    /// Delete one object
    async fn delete_object(&self, bucket: &BucketName, key: &ObjectKey) -> StorageResult<()>;

    /// Delete several objects of one bucket
    async fn delete_objects(
        &self,
        bucket: &BucketName,
        keys: &[ObjectKey],
    ) -> StorageResult<DeletedObjects>;

    /// Fetch object content
    async fn get_object(&self, bucket: &BucketName, key: &ObjectKey) -> StorageResult<Bytes>;

    /// Check whether an object exists
    async fn does_object_exist(&self, bucket: &BucketName, key: &ObjectKey) -> StorageResult<bool>;

    /// Upload a local file in parts
    async fn multiupload_file(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
        file: &Path,
    ) -> StorageResult<()>;

    /// Produce a URL granting `method` on the object for `expires_in`
    async fn sign_url(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
        expires_in: Duration,
        method: SignMethod,
    ) -> StorageResult<String>;
}

/// Port for constructing a [`BucketClient`] from configuration
#[async_trait]
pub trait ClientFactory: Send + Sync + 'static {
    async fn create_client(&self, config: &OssConfig) -> StorageResult<Arc<dyn BucketClient>>;
}
