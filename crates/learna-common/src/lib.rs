pub mod errors;
pub mod id;

pub use errors::{ConfigError, LearnaError};
pub use id::{new_correlation_id, ChatId};

pub type Result<T> = std::result::Result<T, LearnaError>;
