use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;
use object_store::memory::InMemory;

use super::object_store_client::{BackendProvider, BucketBackend, ObjectStoreBucketClient};
use crate::{
    domain::{errors::StorageResult, models::OssConfig, value_objects::BucketName},
    ports::storage::{BucketClient, ClientFactory},
};

/// In-memory buckets shared by every client built from one factory
#[derive(Default)]
pub struct InMemoryBuckets {
    buckets: Mutex<HashMap<BucketName, Arc<InMemory>>>,
}

impl InMemoryBuckets {
    /// Store backing `bucket`, created empty on first request
    pub fn store(&self, bucket: &BucketName) -> Arc<InMemory> {
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        buckets
            .entry(bucket.clone())
            .or_insert_with(|| Arc::new(InMemory::new()))
            .clone()
    }
}

impl BackendProvider for InMemoryBuckets {
    fn backend(&self, bucket: &BucketName) -> StorageResult<BucketBackend> {
        Ok(BucketBackend::new(self.store(bucket)))
    }
}

/// Factory producing clients over process-local buckets, for tests and dry runs
#[derive(Clone, Default)]
pub struct InMemoryClientFactory {
    buckets: Arc<InMemoryBuckets>,
}

impl InMemoryClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared bucket set, for seeding or inspecting contents
    pub fn buckets(&self) -> Arc<InMemoryBuckets> {
        self.buckets.clone()
    }
}

#[async_trait]
impl ClientFactory for InMemoryClientFactory {
    async fn create_client(&self, config: &OssConfig) -> StorageResult<Arc<dyn BucketClient>> {
        let client = ObjectStoreBucketClient::new(self.buckets.clone())
            .with_multipart(config.multipart_part_size, config.multipart_concurrency);
        Ok(Arc::new(client))
    }
}
