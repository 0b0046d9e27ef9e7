use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::value_objects::ObjectKey;

/// Largest `max_keys` a single listing request may ask for
pub const MAX_LIST_KEYS: usize = 1000;

/// Parameters of a bucket listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListObjectsRequest {
    pub prefix: String,
    pub max_keys: usize,
    pub delimiter: String,
    pub marker: String,
}

impl Default for ListObjectsRequest {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            max_keys: 100,
            delimiter: "/".to_string(),
            marker: String::new(),
        }
    }
}

/// One object entry in a listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub etag: Option<String>,
}

/// Result of listing a bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectListing {
    pub bucket: String,
    pub prefix: String,
    pub marker: String,
    pub delimiter: String,
    pub max_keys: usize,
    pub is_truncated: bool,
    /// Marker to pass to the next call when `is_truncated` is set
    pub next_marker: Option<String>,
    pub objects: Vec<ObjectSummary>,
    /// Groups rolled up by the delimiter, each ending with it
    pub common_prefixes: Vec<String>,
}

/// Metadata headers of a single object.
///
/// Keys are lowercase header names such as `content-length`, `etag`,
/// `last-modified` and `x-oss-object-type`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ObjectMeta(BTreeMap<String, String>);

impl ObjectMeta {
    pub const CONTENT_LENGTH: &'static str = "content-length";
    pub const CONTENT_TYPE: &'static str = "content-type";
    pub const ETAG: &'static str = "etag";
    pub const LAST_MODIFIED: &'static str = "last-modified";
    pub const OBJECT_TYPE: &'static str = "x-oss-object-type";
    pub const NEXT_APPEND_POSITION: &'static str = "x-oss-next-append-position";
    pub const VERSION_ID: &'static str = "x-oss-version-id";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn content_length(&self) -> Option<u64> {
        self.get(Self::CONTENT_LENGTH).and_then(|v| v.parse().ok())
    }

    pub fn object_type(&self) -> Option<ObjectType> {
        self.get(Self::OBJECT_TYPE).and_then(ObjectType::parse)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// How an object was created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ObjectType {
    /// Written whole by put, upload or copy
    Normal,
    /// Written by appends; carries a next-append offset
    Appendable,
    /// Assembled from parts by a multipart upload
    Multipart,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Normal => "Normal",
            ObjectType::Appendable => "Appendable",
            ObjectType::Multipart => "Multipart",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Normal" => Some(ObjectType::Normal),
            "Appendable" => Some(ObjectType::Appendable),
            "Multipart" => Some(ObjectType::Multipart),
            _ => None,
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a batch delete
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletedObjects {
    pub deleted: Vec<String>,
}

impl DeletedObjects {
    pub fn from_keys(keys: &[ObjectKey]) -> Self {
        Self {
            deleted: keys.iter().map(|k| k.as_str().to_string()).collect(),
        }
    }
}

/// HTTP method a signed URL grants
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignMethod {
    #[default]
    Get,
    Put,
}

impl SignMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignMethod::Get => "GET",
            SignMethod::Put => "PUT",
        }
    }
}

impl std::fmt::Display for SignMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SignMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(SignMethod::Get),
            "PUT" => Ok(SignMethod::Put),
            other => Err(format!("unsupported signing method: {}", other)),
        }
    }
}

impl From<SignMethod> for http::Method {
    fn from(method: SignMethod) -> Self {
        match method {
            SignMethod::Get => http::Method::GET,
            SignMethod::Put => http::Method::PUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_method_parsing() {
        assert_eq!("get".parse::<SignMethod>(), Ok(SignMethod::Get));
        assert_eq!("PUT".parse::<SignMethod>(), Ok(SignMethod::Put));
        assert!("DELETE".parse::<SignMethod>().is_err());
        assert_eq!(http::Method::from(SignMethod::Put), http::Method::PUT);
    }

    #[test]
    fn test_object_meta_accessors() {
        let mut meta = ObjectMeta::new();
        meta.insert(ObjectMeta::CONTENT_LENGTH, "42");
        meta.insert(ObjectMeta::OBJECT_TYPE, "Appendable");

        assert_eq!(meta.content_length(), Some(42));
        assert_eq!(meta.object_type(), Some(ObjectType::Appendable));
        assert_eq!(meta.len(), 2);
        assert_eq!(
            serde_json::to_string(&meta).unwrap(),
            r#"{"content-length":"42","x-oss-object-type":"Appendable"}"#
        );
    }
}
