pub mod config;
pub mod object;

pub use config::*;
pub use object::*;
