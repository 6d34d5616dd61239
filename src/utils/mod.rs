pub mod config;
pub mod error;

pub use config::{Config, Environment};
pub use error::{ApiError, ApiResult, ErrorBody, ErrorKind, ErrorReport};
