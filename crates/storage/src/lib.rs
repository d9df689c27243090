pub mod error;
pub mod fs;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use error::StorageError;
pub use fs::FsBlobStore;
pub use memory::{MemoryBlobStore, MemoryCache};
pub use sqlite::{SqliteCache, SqliteStore};
pub use traits::*;
