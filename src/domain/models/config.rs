use bon::Builder;

use crate::domain::value_objects::BucketName;

/// Default OSS region used for request signing
pub const DEFAULT_REGION: &str = "oss-cn-hangzhou";

/// Smallest part OSS accepts for any part but the last
pub const MIN_MULTIPART_PART_SIZE: usize = 5 * 1024 * 1024;

pub const DEFAULT_MULTIPART_PART_SIZE: usize = MIN_MULTIPART_PART_SIZE;

/// Parts in flight at once during a multipart upload
pub const DEFAULT_MULTIPART_CONCURRENCY: usize = 4;

/// Connection settings of one bucket.
///
/// Built once by the host application and never changed afterwards.
#[derive(Clone, Builder)]
pub struct OssConfig {
    /// OSS endpoint, e.g. `https://oss-cn-hangzhou.aliyuncs.com`
    #[builder(into)]
    pub endpoint: String,

    #[builder(into)]
    pub access_key_id: String,

    #[builder(into)]
    pub access_key_secret: String,

    pub bucket: BucketName,

    /// Custom domain bound to the bucket. Informational only.
    #[builder(into)]
    pub cname: Option<String>,

    #[builder(into, default = DEFAULT_REGION.to_string())]
    pub region: String,

    #[builder(default = DEFAULT_MULTIPART_PART_SIZE)]
    pub multipart_part_size: usize,

    #[builder(default = DEFAULT_MULTIPART_CONCURRENCY)]
    pub multipart_concurrency: usize,
}

impl std::fmt::Debug for OssConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OssConfig")
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("cname", &self.cname)
            .field("region", &self.region)
            .field("multipart_part_size", &self.multipart_part_size)
            .field("multipart_concurrency", &self.multipart_concurrency)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = OssConfig::builder()
            .endpoint("https://oss-cn-hangzhou.aliyuncs.com")
            .access_key_id("id")
            .access_key_secret("secret")
            .bucket(BucketName::new("my-bucket").unwrap())
            .build();

        assert_eq!(config.region, DEFAULT_REGION);
        assert_eq!(config.cname, None);
        assert_eq!(config.multipart_part_size, DEFAULT_MULTIPART_PART_SIZE);
        assert_eq!(config.multipart_concurrency, DEFAULT_MULTIPART_CONCURRENCY);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = OssConfig::builder()
            .endpoint("oss-cn-beijing.aliyuncs.com")
            .access_key_id("id")
            .access_key_secret("top-secret")
            .bucket(BucketName::new("my-bucket").unwrap())
            .cname("cdn.example.com")
            .build();

        let debug = format!("{:?}", config);
        assert!(!debug.contains("top-secret"));
        assert!(debug.contains("cdn.example.com"));
    }
}
