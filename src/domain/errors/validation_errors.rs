/// Rejections raised while building object keys and bucket names
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Object key cannot be empty")]
    EmptyObjectKey,

    #[error("Object key too long: {actual} bytes (max: {max})")]
    ObjectKeyTooLong { actual: usize, max: usize },

    #[error("Invalid character in object key: {0:?}")]
    InvalidObjectKeyCharacter(char),

    #[error("Object key cannot start with '/'")]
    ObjectKeyStartsWithSlash,

    #[error("Object key cannot contain '//'")]
    ObjectKeyContainsDoubleSlash,

    /// `.` and `..` segments have no stable meaning in a flat key space
    #[error("Object key cannot contain a '{0}' segment")]
    ObjectKeyRelativeSegment(String),

    #[error("Bucket name must be {min}-{max} characters, got {actual}")]
    BucketNameLength { actual: usize, min: usize, max: usize },

    #[error("Bucket name must start and end with a lowercase letter or number")]
    BucketNameBoundary,

    #[error("Invalid character in bucket name: '{0}'. Only lowercase letters, numbers, and hyphens allowed")]
    BucketNameInvalidCharacter(char),
}
