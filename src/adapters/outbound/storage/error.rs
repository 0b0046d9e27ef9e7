use crate::domain::errors::StorageError;

/// Convert object_store errors to domain storage errors
impl From<object_store::Error> for StorageError {
    fn from(err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { path, .. } => StorageError::ObjectNotFound { key: path },
            object_store::Error::AlreadyExists { path, .. } => {
                StorageError::ObjectAlreadyExists { key: path }
            }
            object_store::Error::Precondition { path, .. } => StorageError::Conflict { key: path },
            object_store::Error::PermissionDenied { .. }
            | object_store::Error::Unauthenticated { .. } => StorageError::AccessDenied {
                message: err.to_string(),
            },
            object_store::Error::NotSupported { .. } | object_store::Error::NotImplemented => {
                StorageError::UnsupportedOperation {
                    operation: "unknown".to_string(),
                    reason: err.to_string(),
                }
            }
            object_store::Error::UnknownConfigurationKey { .. } => StorageError::Configuration {
                message: err.to_string(),
            },
            _ => StorageError::Provider {
                message: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_keeps_path() {
        let err = object_store::Error::NotFound {
            path: "docs/a.txt".to_string(),
            source: "missing".into(),
        };
        match StorageError::from(err) {
            StorageError::ObjectNotFound { key } => assert_eq!(key, "docs/a.txt"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_precondition_is_conflict() {
        let err = object_store::Error::Precondition {
            path: "log.txt".to_string(),
            source: "etag mismatch".into(),
        };
        assert!(matches!(
            StorageError::from(err),
            StorageError::Conflict { .. }
        ));
    }

    #[test]
    fn test_generic_is_provider_error() {
        let err = object_store::Error::Generic {
            store: "S3",
            source: "connection reset".into(),
        };
        match StorageError::from(err) {
            StorageError::Provider { message } => assert!(message.contains("connection reset")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
