use std::sync::Arc;

use crate::{
    adapters::outbound::storage::{InMemoryClientFactory, OssClientFactory},
    domain::{
        models::{
            DEFAULT_MULTIPART_CONCURRENCY, DEFAULT_MULTIPART_PART_SIZE, DEFAULT_REGION,
            MIN_MULTIPART_PART_SIZE, OssConfig,
        },
        value_objects::BucketName,
    },
    ports::storage::ClientFactory,
    services::OssBucket,
};

/// Storage backend configuration
#[derive(Debug, Clone, Default)]
pub enum StorageBackend {
    /// Real OSS endpoint from the configuration
    #[default]
    Oss,
    /// Process-local buckets; nothing leaves the process
    InMemory,
}

/// Application-level errors
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

/// Create a bucket façade for the given backend
pub fn create_bucket(config: OssConfig, backend: StorageBackend) -> OssBucket {
    let factory: Arc<dyn ClientFactory> = match backend {
        StorageBackend::Oss => Arc::new(OssClientFactory),
        StorageBackend::InMemory => Arc::new(InMemoryClientFactory::new()),
    };
    OssBucket::new(config, factory)
}

/// Create a bucket façade talking to OSS
pub fn create_oss_bucket(config: OssConfig) -> OssBucket {
    create_bucket(config, StorageBackend::Oss)
}

/// Create an in-memory bucket for testing and development
pub fn create_in_memory_bucket(bucket: &str) -> Result<OssBucket, AppError> {
    let bucket = BucketName::new(bucket).map_err(|e| AppError::Configuration {
        message: format!("invalid bucket name '{}': {}", bucket, e),
    })?;

    let config = OssConfig::builder()
        .endpoint("memory://local")
        .access_key_id("local")
        .access_key_secret("local")
        .bucket(bucket)
        .build();

    Ok(create_bucket(config, StorageBackend::InMemory))
}

/// Read bucket configuration from environment variables
pub fn config_from_env() -> Result<OssConfig, AppError> {
    config_from_lookup(|name| std::env::var(name).ok())
}

/// Create a bucket façade from environment variables
pub fn create_bucket_from_env() -> Result<OssBucket, AppError> {
    let backend = match std::env::var("OSS_BACKEND").as_deref() {
        Ok("memory") => StorageBackend::InMemory,
        _ => StorageBackend::Oss,
    };
    Ok(create_bucket(config_from_env()?, backend))
}

fn config_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<OssConfig, AppError> {
    let required = |name: &str| {
        lookup(name)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Configuration {
                message: format!("{} environment variable required", name),
            })
    };
    let parsed = |name: &str, min: usize, default: usize| -> Result<usize, AppError> {
        let Some(value) = lookup(name) else {
            return Ok(default);
        };
        match value.parse::<usize>() {
            Ok(n) if n >= min => Ok(n),
            _ => Err(AppError::Configuration {
                message: format!("{} must be an integer of at least {}, got '{}'", name, min, value),
            }),
        }
    };

    let bucket_name = required("OSS_BUCKET")?;
    let bucket = BucketName::new(bucket_name.as_str()).map_err(|e| AppError::Configuration {
        message: format!("invalid OSS_BUCKET '{}': {}", bucket_name, e),
    })?;

    Ok(OssConfig::builder()
        .endpoint(required("OSS_ENDPOINT")?)
        .access_key_id(required("OSS_ACCESS_KEY_ID")?)
        .access_key_secret(required("OSS_ACCESS_KEY_SECRET")?)
        .bucket(bucket)
        .maybe_cname(lookup("OSS_CNAME").filter(|v| !v.is_empty()))
        .region(lookup("OSS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()))
        .multipart_part_size(parsed(
            "OSS_MULTIPART_PART_SIZE",
            MIN_MULTIPART_PART_SIZE,
            DEFAULT_MULTIPART_PART_SIZE,
        )?)
        .multipart_concurrency(parsed(
            "OSS_MULTIPART_CONCURRENCY",
            1,
            DEFAULT_MULTIPART_CONCURRENCY,
        )?)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_config_from_lookup() {
        let config = config_from_lookup(lookup(&[
            ("OSS_ENDPOINT", "oss-cn-shanghai.aliyuncs.com"),
            ("OSS_ACCESS_KEY_ID", "id"),
            ("OSS_ACCESS_KEY_SECRET", "secret"),
            ("OSS_BUCKET", "assets"),
            ("OSS_CNAME", "static.example.com"),
            ("OSS_MULTIPART_CONCURRENCY", "8"),
        ]))
        .unwrap();

        assert_eq!(config.bucket.as_str(), "assets");
        assert_eq!(config.cname.as_deref(), Some("static.example.com"));
        assert_eq!(config.region, DEFAULT_REGION);
        assert_eq!(config.multipart_concurrency, 8);
        assert_eq!(config.multipart_part_size, DEFAULT_MULTIPART_PART_SIZE);
    }

    #[test]
    fn test_config_requires_bucket() {
        let err = config_from_lookup(lookup(&[
            ("OSS_ENDPOINT", "oss-cn-shanghai.aliyuncs.com"),
            ("OSS_ACCESS_KEY_ID", "id"),
            ("OSS_ACCESS_KEY_SECRET", "secret"),
        ]))
        .unwrap_err();

        assert!(err.to_string().contains("OSS_BUCKET"));
    }

    #[test]
    fn test_config_rejects_bad_numbers() {
        let err = config_from_lookup(lookup(&[
            ("OSS_ENDPOINT", "e"),
            ("OSS_ACCESS_KEY_ID", "id"),
            ("OSS_ACCESS_KEY_SECRET", "secret"),
            ("OSS_BUCKET", "assets"),
            ("OSS_MULTIPART_PART_SIZE", "lots"),
        ]))
        .unwrap_err();

        assert!(matches!(err, AppError::Configuration { .. }));
    }

    #[test]
    fn test_config_rejects_tiny_multipart_settings() {
        let base = [
            ("OSS_ENDPOINT", "e"),
            ("OSS_ACCESS_KEY_ID", "id"),
            ("OSS_ACCESS_KEY_SECRET", "secret"),
            ("OSS_BUCKET", "assets"),
        ];

        for extra in [
            ("OSS_MULTIPART_CONCURRENCY", "0"),
            ("OSS_MULTIPART_PART_SIZE", "0"),
            ("OSS_MULTIPART_PART_SIZE", "1048576"),
        ] {
            let mut vars = base.to_vec();
            vars.push(extra);
            let err = config_from_lookup(lookup(&vars)).unwrap_err();
            assert!(err.to_string().contains(extra.0), "{}", err);
        }

        let mut vars = base.to_vec();
        vars.push(("OSS_MULTIPART_PART_SIZE", "10485760"));
        let config = config_from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.multipart_part_size, 10 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_create_in_memory_bucket() {
        let bucket = create_in_memory_bucket("dev-bucket").unwrap();
        assert_eq!(bucket.bucket().as_str(), "dev-bucket");

        bucket.put_object("hello.txt", "hi").await.unwrap();
        assert!(bucket.does_object_exist("hello.txt").await.unwrap());

        assert!(create_in_memory_bucket("Bad Name").is_err());
    }
}
