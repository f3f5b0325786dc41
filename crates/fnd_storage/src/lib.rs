use async_trait::async_trait;
use fnd_core::{ArticleStorage, Error, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

pub mod backends;

pub use backends::*;

#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn get_error_message() -> &'static str;
    async fn new() -> Result<Self> where Self: Sized;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageKind {
    #[default]
    Memory,
    SQLite,
}

impl FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::SQLite),
            other => Err(Error::Storage(format!("Unknown storage backend: {}", other))),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::SQLite => f.write_str("sqlite"),
        }
    }
}

fn backend_error<B: StorageBackend>(e: Error) -> Error {
    Error::Storage(format!("{} ({})", B::get_error_message(), e))
}

/// Opens the requested backend. `path` only applies to SQLite.
pub async fn create_storage(kind: StorageKind, path: Option<PathBuf>) -> Result<Arc<dyn ArticleStorage>> {
    let storage: Arc<dyn ArticleStorage> = match kind {
        StorageKind::Memory => {
            let storage = <InMemoryStorage as StorageBackend>::new()
                .await
                .map_err(backend_error::<InMemoryStorage>)?;
            Arc::new(storage)
        }
        #[cfg(feature = "sqlite")]
        StorageKind::SQLite => {
            let storage = match path {
                Some(path) => SQLiteStorage::new_with_path(&path).await,
                None => <SQLiteStorage as StorageBackend>::new().await,
            }
            .map_err(backend_error::<SQLiteStorage>)?;
            Arc::new(storage)
        }
        #[cfg(not(feature = "sqlite"))]
        StorageKind::SQLite => {
            let _ = path;
            return Err(Error::Storage("SQLite support not compiled in".to_string()));
        }
    };
    info!("🏦 Storage backend ready ({})", kind);
    Ok(storage)
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_storage, StorageBackend, StorageKind};
}
