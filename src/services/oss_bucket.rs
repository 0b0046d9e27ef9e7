use std::{future::Future, path::Path, sync::Arc, time::Duration};

use bytes::Bytes;
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use super::call_args::CallArgs;
use crate::{
    domain::{
        errors::StorageResult,
        models::{DeletedObjects, ListObjectsRequest, ObjectListing, ObjectMeta, OssConfig, SignMethod},
        value_objects::{BucketName, ObjectKey},
    },
    ports::storage::{BucketClient, ClientFactory},
};

/// Operations on the objects of one configured bucket.
///
/// Every call is logged at `INFO` with its flattened arguments. A failing
/// call is logged once at `ERROR` and its error returned unchanged; nothing
/// is retried. The storage client is built on first use and shared by all
/// later calls.
pub struct OssBucket {
    config: OssConfig,
    factory: Arc<dyn ClientFactory>,
    client: OnceCell<Arc<dyn BucketClient>>,
}

impl OssBucket {
    pub fn new(config: OssConfig, factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            config,
            factory,
            client: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &OssConfig {
        &self.config
    }

    pub fn bucket(&self) -> &BucketName {
        &self.config.bucket
    }

    /// The shared client, constructed on first call
    pub async fn client(&self) -> StorageResult<Arc<dyn BucketClient>> {
        let client = self
            .client
            .get_or_try_init(|| async {
                debug!(bucket = %self.config.bucket, endpoint = %self.config.endpoint, "initializing bucket client");
                self.factory.create_client(&self.config).await
            })
            .await?;
        Ok(client.clone())
    }

    async fn logged<T>(
        &self,
        operation: &'static str,
        args: CallArgs,
        call: impl Future<Output = StorageResult<T>>,
    ) -> StorageResult<T> {
        info!(operation, args = %args, "{} called", operation);
        let result = call.await;
        if let Err(e) = &result {
            error!(operation, error = %e, "{} failed", operation);
        }
        result
    }

    /// List objects whose keys start with `prefix`.
    ///
    /// Keys sharing a segment after the prefix are rolled up into common
    /// prefixes when `delimiter` is `/`. Listing resumes after `marker`.
    pub async fn list_objects(
        &self,
        prefix: &str,
        max_keys: usize,
        delimiter: &str,
        marker: &str,
    ) -> StorageResult<ObjectListing> {
        let args = CallArgs::new()
            .arg("prefix", prefix)
            .arg("max_keys", max_keys)
            .arg("delimiter", delimiter)
            .arg("marker", marker);

        self.logged("list_objects", args, async {
            let request = ListObjectsRequest {
                prefix: prefix.to_string(),
                max_keys,
                delimiter: delimiter.to_string(),
                marker: marker.to_string(),
            };
            self.client()
                .await?
                .list_objects(self.bucket(), &request)
                .await
        })
        .await
    }

    /// Create a virtual directory. The trailing '/' is added here.
    pub async fn create_object_dir(&self, name: &str) -> StorageResult<()> {
        let args = CallArgs::new().arg("name", name);

        self.logged("create_object_dir", args, async {
            let key = ObjectKey::directory(name)?;
            self.client()
                .await?
                .create_object_dir(self.bucket(), &key)
                .await
        })
        .await
    }

    pub async fn put_object(&self, name: &str, content: impl Into<Bytes>) -> StorageResult<()> {
        let content = content.into();
        let args = CallArgs::new()
            .arg("name", name)
            .arg("content", format!("<{} bytes>", content.len()));

        self.logged("put_object", args, async {
            let key = ObjectKey::new(name)?;
            self.client()
                .await?
                .put_object(self.bucket(), &key, content)
                .await
        })
        .await
    }

    pub async fn upload_file(&self, name: &str, file_path: impl AsRef<Path>) -> StorageResult<()> {
        let file_path = file_path.as_ref();
        let args = CallArgs::new()
            .arg("name", name)
            .arg("file_path", file_path.display());

        self.logged("upload_file", args, async {
            let key = ObjectKey::new(name)?;
            self.client()
                .await?
                .upload_file(self.bucket(), &key, file_path)
                .await
        })
        .await
    }

    /// Append to an appendable object, returning the next append position.
    ///
    /// `position` must equal the current object length (0 creates the
    /// object). Objects written by `put_object` cannot be appended to.
    pub async fn append_object(
        &self,
        name: &str,
        content: impl Into<Bytes>,
        position: u64,
    ) -> StorageResult<u64> {
        let content = content.into();
        let args = CallArgs::new()
            .arg("name", name)
            .arg("content", format!("<{} bytes>", content.len()))
            .arg("position", position);

        self.logged("append_object", args, async {
            let key = ObjectKey::new(name)?;
            self.client()
                .await?
                .append_object(self.bucket(), &key, content, position)
                .await
        })
        .await
    }

    /// Append a local file; see [`OssBucket::append_object`]
    pub async fn append_file(
        &self,
        name: &str,
        file_path: impl AsRef<Path>,
        position: u64,
    ) -> StorageResult<u64> {
        let file_path = file_path.as_ref();
        let args = CallArgs::new()
            .arg("name", name)
            .arg("file_path", file_path.display())
            .arg("position", position);

        self.logged("append_file", args, async {
            let key = ObjectKey::new(name)?;
            self.client()
                .await?
                .append_file(self.bucket(), &key, file_path, position)
                .await
        })
        .await
    }

    /// Copy an existing object.
    ///
    /// An empty `to_bucket` copies within this bucket. Both buckets must be
    /// in the same region, the source must be under 1 GiB and must not be
    /// an appendable object.
    pub async fn copy_object(
        &self,
        from_name: &str,
        to_name: &str,
        to_bucket: &str,
    ) -> StorageResult<()> {
        let args = CallArgs::new()
            .arg("from_name", from_name)
            .arg("to_name", to_name)
            .arg("to_bucket", to_bucket);

        self.logged("copy_object", args, async {
            let from_key = ObjectKey::new(from_name)?;
            let to_key = ObjectKey::new(to_name)?;
            let to_bucket = if to_bucket.is_empty() {
                self.bucket().clone()
            } else {
                BucketName::new(to_bucket)?
            };
            self.client()
                .await?
                .copy_object(self.bucket(), &from_key, &to_bucket, &to_key)
                .await
        })
        .await
    }

    pub async fn get_object_meta(&self, name: &str) -> StorageResult<ObjectMeta> {
        let args = CallArgs::new().arg("name", name);

        self.logged("get_object_meta", args, async {
            let key = ObjectKey::new(name)?;
            self.client()
                .await?
                .get_object_meta(self.bucket(), &key)
                .await
        })
        .await
    }

    pub async fn delete_object(&self, name: &str) -> StorageResult<()> {
        let args = CallArgs::new().arg("name", name);

        self.logged("delete_object", args, async {
            let key = ObjectKey::new(name)?;
            self.client()
                .await?
                .delete_object(self.bucket(), &key)
                .await
        })
        .await
    }

    /// Delete several objects of this bucket in one request
    pub async fn delete_objects<S: AsRef<str>>(&self, names: &[S]) -> StorageResult<DeletedObjects> {
        let args = CallArgs::new().list("names", names.iter().map(AsRef::<str>::as_ref));

        self.logged("delete_objects", args, async {
            let keys = names
                .iter()
                .map(|n| ObjectKey::new(AsRef::<str>::as_ref(n)))
                .collect::<Result<Vec<_>, _>>()?;
            self.client()
                .await?
                .delete_objects(self.bucket(), &keys)
                .await
        })
        .await
    }

    pub async fn get_object(&self, name: &str) -> StorageResult<Bytes> {
        let args = CallArgs::new().arg("name", name);

        self.logged("get_object", args, async {
            let key = ObjectKey::new(name)?;
            self.client()
                .await?
                .get_object(self.bucket(), &key)
                .await
        })
        .await
    }

    pub async fn does_object_exist(&self, name: &str) -> StorageResult<bool> {
        let args = CallArgs::new().arg("name", name);

        self.logged("does_object_exist", args, async {
            let key = ObjectKey::new(name)?;
            self.client()
                .await?
                .does_object_exist(self.bucket(), &key)
                .await
        })
        .await
    }

    /// Upload a local file in parts; chunking is left to the storage client
    pub async fn multiupload_file(
        &self,
        name: &str,
        file_path: impl AsRef<Path>,
    ) -> StorageResult<()> {
        let file_path = file_path.as_ref();
        let args = CallArgs::new()
            .arg("name", name)
            .arg("file_path", file_path.display());

        self.logged("multiupload_file", args, async {
            let key = ObjectKey::new(name)?;
            self.client()
                .await?
                .multiupload_file(self.bucket(), &key, file_path)
                .await
        })
        .await
    }

    /// A URL granting `method` on the object for `timeout` seconds
    pub async fn sign_url(
        &self,
        name: &str,
        timeout: u64,
        method: SignMethod,
    ) -> StorageResult<String> {
        let args = CallArgs::new()
            .arg("name", name)
            .arg("timeout", timeout)
            .arg("method", method);

        self.logged("sign_url", args, async {
            let key = ObjectKey::new(name)?;
            self.client()
                .await?
                .sign_url(self.bucket(), &key, Duration::from_secs(timeout), method)
                .await
        })
        .await
    }
}

impl std::fmt::Debug for OssBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OssBucket")
            .field("config", &self.config)
            .field("client_initialized", &self.client.initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::outbound::storage::InMemoryClientFactory;
    use crate::domain::errors::StorageError;

    fn bucket() -> OssBucket {
        let config = OssConfig::builder()
            .endpoint("memory")
            .access_key_id("id")
            .access_key_secret("secret")
            .bucket(BucketName::new("unit-bucket").unwrap())
            .build();
        OssBucket::new(config, Arc::new(InMemoryClientFactory::new()))
    }

    #[tokio::test]
    async fn test_client_is_lazy() {
        let bucket = bucket();
        assert!(!bucket.client.initialized());

        bucket.put_object("a.txt", "abc").await.unwrap();
        assert!(bucket.client.initialized());
    }

    #[tokio::test]
    async fn test_invalid_names_are_errors() {
        let bucket = bucket();

        assert!(matches!(
            bucket.get_object("").await,
            Err(StorageError::ValidationError(_))
        ));
        assert!(matches!(
            bucket.copy_object("a.txt", "b.txt", "Not_A_Bucket").await,
            Err(StorageError::ValidationError(_))
        ));
        assert!(matches!(
            bucket.delete_objects(&["ok.txt", "/bad"]).await,
            Err(StorageError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_directory_marker_visible_in_listing() {
        let bucket = bucket();
        bucket.create_object_dir("photos").await.unwrap();

        assert!(bucket.does_object_exist("photos/").await.unwrap());

        let root = bucket.list_objects("", 100, "/", "").await.unwrap();
        assert_eq!(root.common_prefixes, vec!["photos/".to_string()]);
        assert!(root.objects.is_empty());

        let inside = bucket.list_objects("photos/", 100, "/", "").await.unwrap();
        let keys: Vec<_> = inside.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["photos/"]);
    }
}
