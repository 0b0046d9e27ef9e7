mod call_args;
mod oss_bucket;

pub use call_args::{ArgValue, CallArgs};
pub use oss_bucket::OssBucket;
