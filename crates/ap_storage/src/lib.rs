use std::path::Path;
use std::sync::Arc;

use ap_core::{Error, HistoryStorage, Result};

pub mod backends;

pub use backends::*;

pub const DEFAULT_DB_PATH: &str = "content_history.db";

/// Build a history backend by name: `memory` or `sqlite`
pub async fn create_storage(kind: &str, db_path: Option<&Path>) -> Result<Arc<dyn HistoryStorage>> {
    match kind.to_lowercase().as_str() {
        "memory" => {
            tracing::info!("💾 Using in-memory history storage");
            Ok(Arc::new(MemoryStorage::new()))
        }
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let path = db_path.unwrap_or_else(|| Path::new(DEFAULT_DB_PATH));
            let storage = SqliteStorage::new_with_path(path).await?;
            tracing::info!("💾 Using SQLite history storage at {}", path.display());
            Ok(Arc::new(storage))
        }
        other => {
            let _ = db_path;
            Err(Error::Config(format!(
                "Unknown storage backend: {}. Available backends: {}",
                other,
                available_backends().join(", ")
            )))
        }
    }
}

pub fn available_backends() -> Vec<&'static str> {
    let mut backends = vec!["memory"];
    if cfg!(feature = "sqlite") {
        backends.push("sqlite");
    }
    backends
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::create_storage;
}
