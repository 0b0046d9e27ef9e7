//! OSS backend over the S3-compatible API of the object_store crate
//!
//! OSS only serves virtual-hosted style requests, so every bucket gets its
//! own endpoint of the form `https://{bucket}.{endpoint-host}`.

use std::{net::IpAddr, sync::Arc};

use async_trait::async_trait;
use object_store::aws::AmazonS3Builder;
use tracing::info;

use super::object_store_client::{BackendProvider, BucketBackend, ObjectStoreBucketClient};
use crate::{
    domain::{
        errors::{StorageError, StorageResult},
        models::OssConfig,
        value_objects::BucketName,
    },
    ports::storage::{BucketClient, ClientFactory},
};

/// Builds one S3-compatible store per bucket from shared credentials
pub struct OssBackends {
    config: OssConfig,
}

impl OssBackends {
    pub fn new(config: OssConfig) -> Self {
        Self { config }
    }

    fn builder(&self, bucket: &BucketName) -> AmazonS3Builder {
        let endpoint = virtual_hosted_endpoint(&self.config.endpoint, bucket);
        AmazonS3Builder::new()
            .with_bucket_name(bucket.as_str())
            .with_region(&self.config.region)
            .with_access_key_id(&self.config.access_key_id)
            .with_secret_access_key(&self.config.access_key_secret)
            .with_allow_http(endpoint.starts_with("http://"))
            .with_endpoint(endpoint)
            .with_virtual_hosted_style_request(true)
    }
}

impl BackendProvider for OssBackends {
    fn backend(&self, bucket: &BucketName) -> StorageResult<BucketBackend> {
        let store = self
            .builder(bucket)
            .build()
            .map_err(|e| StorageError::Configuration {
                message: format!("Failed to build OSS store for bucket '{}': {}", bucket, e),
            })?;

        let store = Arc::new(store);
        Ok(BucketBackend::new(store.clone()).with_signer(store))
    }
}

/// Factory producing clients against a real OSS endpoint
#[derive(Debug, Clone, Copy, Default)]
pub struct OssClientFactory;

#[async_trait]
impl ClientFactory for OssClientFactory {
    async fn create_client(&self, config: &OssConfig) -> StorageResult<Arc<dyn BucketClient>> {
        validate(config)?;

        info!(
            endpoint = %config.endpoint,
            bucket = %config.bucket,
            cname = config.cname.as_deref().unwrap_or(""),
            "creating OSS client"
        );

        let client = ObjectStoreBucketClient::new(Arc::new(OssBackends::new(config.clone())))
            .with_multipart(config.multipart_part_size, config.multipart_concurrency);

        // Surface bad configuration now rather than on the first request
        client.backend(&config.bucket)?;

        Ok(Arc::new(client))
    }
}

fn validate(config: &OssConfig) -> StorageResult<()> {
    let required = [
        ("endpoint", &config.endpoint),
        ("access_key_id", &config.access_key_id),
        ("access_key_secret", &config.access_key_secret),
        ("region", &config.region),
    ];

    for (name, value) in required {
        if value.trim().is_empty() {
            return Err(StorageError::Configuration {
                message: format!("{} must not be empty", name),
            });
        }
    }

    // Buckets are addressed as subdomains, which an IP address cannot have
    let host = endpoint_host(&config.endpoint);
    if host.starts_with('[') || host.parse::<IpAddr>().is_ok() {
        return Err(StorageError::Configuration {
            message: format!("endpoint must be a host name, not an IP address: {}", host),
        });
    }

    Ok(())
}

/// Host of `endpoint` without scheme, port or path
fn endpoint_host(endpoint: &str) -> &str {
    let endpoint = endpoint.trim();
    let rest = endpoint
        .split_once("://")
        .map_or(endpoint, |(_, rest)| rest);
    let authority = rest.split('/').next().unwrap_or(rest);
    if authority.starts_with('[') {
        return authority.find(']').map_or(authority, |end| &authority[..=end]);
    }
    authority.split(':').next().unwrap_or(authority)
}

/// Endpoint URL addressing `bucket` in virtual-hosted style
pub fn virtual_hosted_endpoint(endpoint: &str, bucket: &BucketName) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    let (scheme, host) = endpoint
        .split_once("://")
        .unwrap_or(("https", endpoint));

    let bucket_host_prefix = format!("{}.", bucket);
    if host.starts_with(&bucket_host_prefix) {
        format!("{}://{}", scheme, host)
    } else {
        format!("{}://{}{}", scheme, bucket_host_prefix, host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::SignMethod;
    use std::time::Duration;

    fn bucket() -> BucketName {
        BucketName::new("my-bucket").unwrap()
    }

    fn config(endpoint: &str) -> OssConfig {
        OssConfig::builder()
            .endpoint(endpoint)
            .access_key_id("LTAI-test-id")
            .access_key_secret("test-secret")
            .bucket(bucket())
            .build()
    }

    #[test]
    fn test_virtual_hosted_endpoint() {
        assert_eq!(
            virtual_hosted_endpoint("oss-cn-hangzhou.aliyuncs.com", &bucket()),
            "https://my-bucket.oss-cn-hangzhou.aliyuncs.com"
        );
        assert_eq!(
            virtual_hosted_endpoint("http://oss-cn-beijing.aliyuncs.com/", &bucket()),
            "http://my-bucket.oss-cn-beijing.aliyuncs.com"
        );
        assert_eq!(
            virtual_hosted_endpoint("https://my-bucket.oss-cn-hangzhou.aliyuncs.com", &bucket()),
            "https://my-bucket.oss-cn-hangzhou.aliyuncs.com"
        );
    }

    #[test]
    fn test_http_endpoint_allows_http() {
        use object_store::{ClientConfigKey, aws::AmazonS3ConfigKey};
        let allow_http = AmazonS3ConfigKey::Client(ClientConfigKey::AllowHttp);

        let backends = OssBackends::new(config("http://oss-cn-hangzhou.aliyuncs.com"));
        let builder = backends.builder(&bucket());
        assert_eq!(builder.get_config_value(&allow_http).as_deref(), Some("true"));
        assert_eq!(
            builder.get_config_value(&AmazonS3ConfigKey::Endpoint).as_deref(),
            Some("http://my-bucket.oss-cn-hangzhou.aliyuncs.com")
        );

        let backends = OssBackends::new(config("oss-cn-hangzhou.aliyuncs.com"));
        let builder = backends.builder(&bucket());
        assert_eq!(builder.get_config_value(&allow_http).as_deref(), Some("false"));
    }

    #[tokio::test]
    async fn test_ip_endpoints_rejected() {
        for endpoint in ["http://127.0.0.1:9", "10.0.0.8", "https://[::1]:9000/"] {
            let err = OssClientFactory
                .create_client(&config(endpoint))
                .await
                .err()
                .unwrap();
            assert!(
                matches!(err, StorageError::Configuration { .. }),
                "{}: {}",
                endpoint,
                err
            );
        }
    }

    #[test]
    fn test_endpoint_host() {
        assert_eq!(endpoint_host("https://oss-cn-hangzhou.aliyuncs.com/"), "oss-cn-hangzhou.aliyuncs.com");
        assert_eq!(endpoint_host("localhost:9000"), "localhost");
        assert_eq!(endpoint_host("http://[::1]:9000"), "[::1]");
    }

    #[tokio::test]
    async fn test_empty_credentials_rejected() {
        let mut config = config("oss-cn-hangzhou.aliyuncs.com");
        config.access_key_secret = String::new();

        let err = OssClientFactory.create_client(&config).await.err().unwrap();
        assert!(matches!(err, StorageError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_signed_url_targets_bucket_host() {
        let client = OssClientFactory
            .create_client(&config("https://oss-cn-hangzhou.aliyuncs.com"))
            .await
            .unwrap();

        let url = client
            .sign_url(
                &bucket(),
                &crate::ObjectKey::new("docs/report.pdf").unwrap(),
                Duration::from_secs(60),
                SignMethod::Get,
            )
            .await
            .unwrap();

        assert!(url.starts_with("https://my-bucket.oss-cn-hangzhou.aliyuncs.com/docs/report.pdf?"));
        assert!(url.contains("X-Amz-Expires=60"));
        assert!(url.contains("X-Amz-Signature="));
    }
}
