pub mod error;
pub mod models;
pub mod storage;
pub mod types;

pub use error::Error;
pub use models::GenerativeModel;
pub use storage::HistoryStorage;
pub use types::*;

pub type Result<T> = std::result::Result<T, Error>;
