mod bucket_name;
mod object_key;

pub use bucket_name::BucketName;
pub use object_key::{MAX_OBJECT_KEY_LEN, ObjectKey};
