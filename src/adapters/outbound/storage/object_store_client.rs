use std::{
    borrow::Cow,
    collections::HashMap,
    path::Path,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{StreamExt, TryStreamExt, stream};
use object_store::{
    Attribute, AttributeValue, Attributes, GetOptions, ObjectMeta as StoreObjectMeta,
    ObjectStore as ObjectStoreBackend, PutMode, PutMultipartOpts, PutOptions, PutPayload,
    UpdateVersion, WriteMultipart, path::Path as ObjectPath, signer::Signer,
};
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use crate::{
    domain::{
        errors::{StorageError, StorageResult},
        models::{
            DEFAULT_MULTIPART_CONCURRENCY, DEFAULT_MULTIPART_PART_SIZE, DeletedObjects,
            ListObjectsRequest, MAX_LIST_KEYS, ObjectListing, ObjectMeta, ObjectSummary,
            ObjectType, SignMethod,
        },
        value_objects::{BucketName, ObjectKey},
    },
    ports::storage::BucketClient,
};

/// Object stored in place of a `name/` key; paths cannot end with a delimiter
pub const DIRECTORY_MARKER: &str = ".oss-dir";

/// Largest object a single copy may move
pub const COPY_SIZE_LIMIT: u64 = 1024 * 1024 * 1024;

/// Most keys one batch delete accepts
pub const MAX_DELETE_KEYS: usize = 1000;

/// User metadata entry recording how the object was written
const OBJECT_TYPE_ATTRIBUTE: &str = "object-type";

/// The object_store handles serving one bucket
#[derive(Clone)]
pub struct BucketBackend {
    pub store: Arc<dyn ObjectStoreBackend>,
    pub signer: Option<Arc<dyn Signer>>,
}

impl BucketBackend {
    pub fn new(store: Arc<dyn ObjectStoreBackend>) -> Self {
        Self {
            store,
            signer: None,
        }
    }

    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }
}

/// Builds the backend for a bucket on first use
pub trait BackendProvider: Send + Sync + 'static {
    fn backend(&self, bucket: &BucketName) -> StorageResult<BucketBackend>;
}

/// [`BucketClient`] delegating every operation to the object_store crate
pub struct ObjectStoreBucketClient {
    provider: Arc<dyn BackendProvider>,
    backends: Mutex<HashMap<BucketName, BucketBackend>>,
    part_size: usize,
    max_concurrency: usize,
}

impl ObjectStoreBucketClient {
    pub fn new(provider: Arc<dyn BackendProvider>) -> Self {
        Self {
            provider,
            backends: Mutex::new(HashMap::new()),
            part_size: DEFAULT_MULTIPART_PART_SIZE,
            max_concurrency: DEFAULT_MULTIPART_CONCURRENCY,
        }
    }

    /// Configure part size and parallelism of multipart uploads
    pub fn with_multipart(mut self, part_size: usize, max_concurrency: usize) -> Self {
        self.part_size = part_size.max(1);
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Backend for `bucket`, built once and cached
    pub fn backend(&self, bucket: &BucketName) -> StorageResult<BucketBackend> {
        let mut backends = self.backends.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(backend) = backends.get(bucket) {
            return Ok(backend.clone());
        }

        debug!(bucket = %bucket, "building storage backend");
        let backend = self.provider.backend(bucket)?;
        backends.insert(bucket.clone(), backend.clone());
        Ok(backend)
    }

    async fn put(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
        content: Bytes,
        object_type: ObjectType,
    ) -> StorageResult<()> {
        let backend = self.backend(bucket)?;
        let options = PutOptions {
            attributes: object_type_attributes(object_type),
            ..Default::default()
        };

        backend
            .store
            .put_opts(&to_object_path(key)?, PutPayload::from(content), options)
            .await?;

        Ok(())
    }

    async fn append(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
        content: Bytes,
        position: u64,
    ) -> StorageResult<u64> {
        let backend = self.backend(bucket)?;
        let path = to_object_path(key)?;

        let existing = match backend.store.get(&path).await {
            Ok(result) => Some(result),
            Err(object_store::Error::NotFound { .. }) => None,
            Err(e) => return Err(e.into()),
        };

        let (payload, mode) = match existing {
            None => {
                if position != 0 {
                    return Err(StorageError::PositionMismatch {
                        key: key.to_string(),
                        expected: 0,
                        actual: position,
                    });
                }
                (content, PutMode::Create)
            }
            Some(existing) => {
                if object_type(&existing.attributes) != ObjectType::Appendable {
                    return Err(StorageError::NotAppendable {
                        key: key.to_string(),
                    });
                }

                let current = existing.meta.size;
                if current != position {
                    return Err(StorageError::PositionMismatch {
                        key: key.to_string(),
                        expected: current,
                        actual: position,
                    });
                }

                let version = UpdateVersion {
                    e_tag: existing.meta.e_tag.clone(),
                    version: existing.meta.version.clone(),
                };
                let previous = existing.bytes().await?;

                let mut combined = BytesMut::with_capacity(previous.len() + content.len());
                combined.extend_from_slice(&previous);
                combined.extend_from_slice(&content);
                (combined.freeze(), PutMode::Update(version))
            }
        };

        let next_position = payload.len() as u64;
        let options = PutOptions {
            mode,
            attributes: object_type_attributes(ObjectType::Appendable),
            ..Default::default()
        };

        backend
            .store
            .put_opts(&path, PutPayload::from(payload), options)
            .await
            .map_err(|e| match e {
                // Another writer got there between our read and write
                object_store::Error::AlreadyExists { .. }
                | object_store::Error::Precondition { .. } => StorageError::Conflict {
                    key: key.to_string(),
                },
                e => e.into(),
            })?;

        Ok(next_position)
    }
}

#[async_trait]
impl BucketClient for ObjectStoreBucketClient {
    async fn list_objects(
        &self,
        bucket: &BucketName,
        request: &ListObjectsRequest,
    ) -> StorageResult<ObjectListing> {
        if request.max_keys == 0 || request.max_keys > MAX_LIST_KEYS {
            return Err(StorageError::InvalidArgument {
                name: "max_keys".to_string(),
                reason: format!("must be between 1 and {}", MAX_LIST_KEYS),
            });
        }

        let backend = self.backend(bucket)?;

        let mut listing = ObjectListing {
            bucket: bucket.to_string(),
            prefix: request.prefix.clone(),
            marker: request.marker.clone(),
            delimiter: request.delimiter.clone(),
            max_keys: request.max_keys,
            is_truncated: false,
            next_marker: None,
            objects: Vec::new(),
            common_prefixes: Vec::new(),
        };

        // object_store lists whole path segments; narrow to the string prefix afterwards
        let base = match request.prefix.rfind('/') {
            Some(idx) => match ObjectPath::parse(&request.prefix[..idx]) {
                Ok(base) => Some(base),
                // Every stored key parses, so none can sit under this prefix
                Err(_) => return Ok(listing),
            },
            None => None,
        };

        let (objects, common_prefixes) = match request.delimiter.as_str() {
            "/" => {
                let result = backend.store.list_with_delimiter(base.as_ref()).await?;
                let prefixes = result
                    .common_prefixes
                    .iter()
                    .map(|p| format!("{}/", p))
                    .collect::<Vec<_>>();
                let objects = result.objects.into_iter().map(summarize).collect::<Vec<_>>();
                (objects, prefixes)
            }
            "" => {
                let objects = backend
                    .store
                    .list(base.as_ref())
                    .map_ok(summarize)
                    .try_collect::<Vec<_>>()
                    .await?;
                (objects, Vec::new())
            }
            other => {
                return Err(StorageError::InvalidArgument {
                    name: "delimiter".to_string(),
                    reason: format!("only '/' or no delimiter is supported, got '{}'", other),
                });
            }
        };

        let wanted = |name: &str| {
            name.starts_with(request.prefix.as_str()) && name > request.marker.as_str()
        };

        let mut entries = objects
            .into_iter()
            .filter(|o| wanted(&o.key))
            .map(ListingEntry::Object)
            .chain(
                common_prefixes
                    .into_iter()
                    .filter(|p| wanted(p))
                    .map(ListingEntry::Prefix),
            )
            .collect::<Vec<_>>();
        entries.sort_by(|a, b| a.name().cmp(b.name()));

        listing.is_truncated = entries.len() > request.max_keys;
        entries.truncate(request.max_keys);
        if listing.is_truncated {
            listing.next_marker = entries.last().map(|e| e.name().to_string());
        }

        for entry in entries {
            match entry {
                ListingEntry::Object(object) => listing.objects.push(object),
                ListingEntry::Prefix(prefix) => listing.common_prefixes.push(prefix),
            }
        }

        Ok(listing)
    }

    async fn create_object_dir(&self, bucket: &BucketName, key: &ObjectKey) -> StorageResult<()> {
        if !key.is_directory() {
            return Err(StorageError::InvalidArgument {
                name: "name".to_string(),
                reason: format!("directory key must end with '/': {}", key),
            });
        }

        self.put(bucket, key, Bytes::new(), ObjectType::Normal).await
    }

    async fn put_object(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
        content: Bytes,
    ) -> StorageResult<()> {
        self.put(bucket, key, content, ObjectType::Normal).await
    }

    async fn upload_file(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
        file: &Path,
    ) -> StorageResult<()> {
        let content = tokio::fs::read(file).await?;
        self.put(bucket, key, Bytes::from(content), ObjectType::Normal)
            .await
    }

    async fn append_object(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
        content: Bytes,
        position: u64,
    ) -> StorageResult<u64> {
        self.append(bucket, key, content, position).await
    }

    async fn append_file(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
        file: &Path,
        position: u64,
    ) -> StorageResult<u64> {
        let content = tokio::fs::read(file).await?;
        self.append(bucket, key, Bytes::from(content), position)
            .await
    }

    async fn copy_object(
        &self,
        from_bucket: &BucketName,
        from_key: &ObjectKey,
        to_bucket: &BucketName,
        to_key: &ObjectKey,
    ) -> StorageResult<()> {
        let source = self.backend(from_bucket)?;
        let from_path = to_object_path(from_key)?;
        let to_path = to_object_path(to_key)?;

        let head = source.store.get_opts(&from_path, head_options()).await?;
        ensure_copyable(from_key, head.meta.size, &head.attributes)?;

        if from_bucket == to_bucket {
            source.store.copy(&from_path, &to_path).await?;
            return Ok(());
        }

        // Stores are bound to one bucket, so cross-bucket copies move the bytes
        let content = source.store.get(&from_path).await?.bytes().await?;
        self.put(to_bucket, to_key, content, ObjectType::Normal)
            .await
    }

    async fn get_object_meta(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
    ) -> StorageResult<ObjectMeta> {
        let backend = self.backend(bucket)?;
        let head = backend
            .store
            .get_opts(&to_object_path(key)?, head_options())
            .await?;

        let kind = object_type(&head.attributes);
        let mut meta = ObjectMeta::new();
        meta.insert(ObjectMeta::CONTENT_LENGTH, head.meta.size.to_string());
        meta.insert(ObjectMeta::LAST_MODIFIED, head.meta.last_modified.to_rfc2822());
        meta.insert(ObjectMeta::OBJECT_TYPE, kind.as_str());
        if kind == ObjectType::Appendable {
            meta.insert(ObjectMeta::NEXT_APPEND_POSITION, head.meta.size.to_string());
        }
        if let Some(e_tag) = &head.meta.e_tag {
            meta.insert(ObjectMeta::ETAG, e_tag.as_str());
        }
        if let Some(version) = &head.meta.version {
            meta.insert(ObjectMeta::VERSION_ID, version.as_str());
        }

        for (attribute, value) in head.attributes.iter() {
            let value: &str = value.as_ref();
            match attribute {
                Attribute::ContentType => meta.insert(ObjectMeta::CONTENT_TYPE, value),
                Attribute::ContentEncoding => meta.insert("content-encoding", value),
                Attribute::ContentDisposition => meta.insert("content-disposition", value),
                Attribute::ContentLanguage => meta.insert("content-language", value),
                Attribute::CacheControl => meta.insert("cache-control", value),
                Attribute::Metadata(name) if name.as_ref() == OBJECT_TYPE_ATTRIBUTE => {}
                Attribute::Metadata(name) => meta.insert(format!("x-oss-meta-{}", name), value),
                _ => {}
            }
        }

        Ok(meta)
    }

    async fn delete_object(&self, bucket: &BucketName, key: &ObjectKey) -> StorageResult<()> {
        let backend = self.backend(bucket)?;
        backend.store.delete(&to_object_path(key)?).await?;
        Ok(())
    }

    async fn delete_objects(
        &self,
        bucket: &BucketName,
        keys: &[ObjectKey],
    ) -> StorageResult<DeletedObjects> {
        if keys.is_empty() || keys.len() > MAX_DELETE_KEYS {
            return Err(StorageError::InvalidArgument {
                name: "names".to_string(),
                reason: format!("must name between 1 and {} objects", MAX_DELETE_KEYS),
            });
        }

        let backend = self.backend(bucket)?;
        let paths = keys
            .iter()
            .map(to_object_path)
            .collect::<StorageResult<Vec<_>>>()?;
        let locations = stream::iter(paths.into_iter().map(Ok)).boxed();

        // Any failed key fails the whole batch
        backend
            .store
            .delete_stream(locations)
            .try_collect::<Vec<_>>()
            .await?;

        Ok(DeletedObjects::from_keys(keys))
    }

    async fn get_object(&self, bucket: &BucketName, key: &ObjectKey) -> StorageResult<Bytes> {
        let backend = self.backend(bucket)?;
        let result = backend.store.get(&to_object_path(key)?).await?;
        Ok(result.bytes().await?)
    }

    async fn does_object_exist(&self, bucket: &BucketName, key: &ObjectKey) -> StorageResult<bool> {
        let backend = self.backend(bucket)?;
        match backend.store.head(&to_object_path(key)?).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn multiupload_file(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
        file: &Path,
    ) -> StorageResult<()> {
        let backend = self.backend(bucket)?;
        let path = to_object_path(key)?;
        let mut file = tokio::fs::File::open(file).await?;

        let options = PutMultipartOpts {
            attributes: object_type_attributes(ObjectType::Multipart),
            ..Default::default()
        };
        let upload = backend
            .store
            .put_multipart_opts(&path, options)
            .await?;
        let mut writer = WriteMultipart::new_with_chunk_size(upload, self.part_size);

        match feed_parts(&mut file, &mut writer, self.part_size, self.max_concurrency).await {
            Ok(()) => {
                writer.finish().await?;
                Ok(())
            }
            Err(e) => {
                if let Err(abort_err) = writer.abort().await {
                    warn!(key = %key, error = %abort_err, "failed to abort multipart upload");
                }
                Err(e)
            }
        }
    }

    async fn sign_url(
        &self,
        bucket: &BucketName,
        key: &ObjectKey,
        expires_in: Duration,
        method: SignMethod,
    ) -> StorageResult<String> {
        if expires_in.is_zero() {
            return Err(StorageError::InvalidArgument {
                name: "timeout".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        let backend = self.backend(bucket)?;
        let signer = backend
            .signer
            .as_ref()
            .ok_or_else(|| StorageError::UnsupportedOperation {
                operation: "sign_url".to_string(),
                reason: format!("backend for bucket '{}' cannot sign URLs", bucket),
            })?;

        let url = signer
            .signed_url(method.into(), &to_object_path(key)?, expires_in)
            .await?;

        Ok(url.to_string())
    }
}

/// An object or rolled-up prefix, ordered together by name
enum ListingEntry {
    Object(ObjectSummary),
    Prefix(String),
}

impl ListingEntry {
    fn name(&self) -> &str {
        match self {
            ListingEntry::Object(object) => &object.key,
            ListingEntry::Prefix(prefix) => prefix,
        }
    }
}

/// Read the file part by part into the multipart writer
async fn feed_parts(
    file: &mut tokio::fs::File,
    writer: &mut WriteMultipart,
    part_size: usize,
    max_concurrency: usize,
) -> StorageResult<()> {
    let mut buf = vec![0u8; part_size];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        writer.wait_for_capacity(max_concurrency).await?;
        writer.write(&buf[..n]);
    }
}

fn head_options() -> GetOptions {
    GetOptions {
        head: true,
        ..Default::default()
    }
}

/// Copies are refused for appendable sources and sources of [`COPY_SIZE_LIMIT`] or more
fn ensure_copyable(key: &ObjectKey, size: u64, attributes: &Attributes) -> StorageResult<()> {
    if object_type(attributes) == ObjectType::Appendable {
        return Err(StorageError::NotAppendable {
            key: key.to_string(),
        });
    }
    if size >= COPY_SIZE_LIMIT {
        return Err(StorageError::ObjectTooLarge {
            key: key.to_string(),
            size,
            limit: COPY_SIZE_LIMIT,
        });
    }
    Ok(())
}

/// Path holding `key`; directory keys map to their marker object.
///
/// The key is taken verbatim, so the remote name is exactly the key and
/// listed paths read back as the same key.
pub fn to_object_path(key: &ObjectKey) -> StorageResult<ObjectPath> {
    let raw = if key.is_directory() {
        Cow::Owned(format!("{}{}", key.as_str(), DIRECTORY_MARKER))
    } else {
        Cow::Borrowed(key.as_str())
    };

    ObjectPath::parse(raw.as_ref()).map_err(|e| StorageError::InvalidArgument {
        name: "name".to_string(),
        reason: format!("'{}' is not a storable key: {}", key, e),
    })
}

/// Key stored at `path`; the inverse of [`to_object_path`]
pub fn key_from_path(path: &ObjectPath) -> String {
    let raw: &str = path.as_ref();
    match raw.strip_suffix(DIRECTORY_MARKER) {
        Some(dir) if dir.ends_with('/') => dir.to_string(),
        _ => raw.to_string(),
    }
}

fn summarize(meta: StoreObjectMeta) -> ObjectSummary {
    ObjectSummary {
        key: key_from_path(&meta.location),
        size: meta.size,
        last_modified: meta.last_modified,
        etag: meta.e_tag,
    }
}

fn object_type(attributes: &Attributes) -> ObjectType {
    attributes
        .get(&Attribute::Metadata(Cow::Borrowed(OBJECT_TYPE_ATTRIBUTE)))
        .and_then(|value| ObjectType::parse(value.as_ref()))
        .unwrap_or(ObjectType::Normal)
}

fn object_type_attributes(object_type: ObjectType) -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert(
        Attribute::Metadata(Cow::Borrowed(OBJECT_TYPE_ATTRIBUTE)),
        AttributeValue::from(object_type.as_str()),
    );
    attributes
}
