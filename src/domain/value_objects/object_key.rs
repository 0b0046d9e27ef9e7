use crate::domain::errors::ValidationError;

/// Longest key the provider accepts, in bytes
pub const MAX_OBJECT_KEY_LEN: usize = 1023;

/// A validated object key within a bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Create a new ObjectKey with validation
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();

        if value.is_empty() {
            return Err(ValidationError::EmptyObjectKey);
        }

        if value.len() > MAX_OBJECT_KEY_LEN {
            return Err(ValidationError::ObjectKeyTooLong {
                actual: value.len(),
                max: MAX_OBJECT_KEY_LEN,
            });
        }

        if let Some(c) = value.chars().find(char::is_ascii_control) {
            return Err(ValidationError::InvalidObjectKeyCharacter(c));
        }

        if value.starts_with('/') || value.starts_with('\\') {
            return Err(ValidationError::ObjectKeyStartsWithSlash);
        }

        if value.contains("//") {
            return Err(ValidationError::ObjectKeyContainsDoubleSlash);
        }

        if let Some(segment) = value.split('/').find(|s| *s == "." || *s == "..") {
            return Err(ValidationError::ObjectKeyRelativeSegment(segment.to_string()));
        }

        Ok(Self(value))
    }

    /// Get the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key of the directory marker for `name/`
    pub fn directory(name: &str) -> Result<Self, ValidationError> {
        Self::new(format!("{}/", name.trim_end_matches('/')))
    }

    /// Whether this key names a directory (ends with '/')
    pub fn is_directory(&self) -> bool {
        self.0.ends_with('/')
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
