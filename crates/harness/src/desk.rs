use std::collections::BTreeMap;
use std::sync::Arc;

use tempfile::TempDir;

use countrydesk_core::{Column, ColumnValue, DocumentId};
use countrydesk_engine::{BlobLayout, Desk, EngineError};
use countrydesk_storage::{LocalCache, MemoryCache, SqliteCache, SqliteStore, StorageError};

use crate::doubles::{FlakyBlobStore, FlakyStore, RecordingNotifier, ScriptedGate};

pub const PUBLIC_BASE: &str = "https://cdn.test";
pub const COLLECTION: &str = "countries";

/// A desk wired to an in-memory store and blob store, with every collaborator
/// reachable for scripting and inspection.
pub struct TestDesk {
    pub desk: Desk,
    pub store: Arc<FlakyStore>,
    pub cache: Arc<dyn LocalCache>,
    pub blobs: Arc<FlakyBlobStore>,
    pub gate: Arc<ScriptedGate>,
    pub notices: Arc<RecordingNotifier>,
    _dir: Option<TempDir>,
}

impl TestDesk {
    pub fn new() -> Result<Self, StorageError> {
        Self::with_cache(Arc::new(MemoryCache::new()), None)
    }

    /// Same as `new` but with the cache persisted to a temporary SQLite file.
    pub fn with_disk_cache() -> Result<Self, StorageError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("cache.db");
        let path = path
            .to_str()
            .ok_or_else(|| StorageError::InvalidPath(path.display().to_string()))?;
        let cache = Arc::new(SqliteCache::open(path)?);
        Self::with_cache(cache, Some(dir))
    }

    fn with_cache(cache: Arc<dyn LocalCache>, dir: Option<TempDir>) -> Result<Self, StorageError> {
        let store = Arc::new(FlakyStore::new(Arc::new(SqliteStore::open_in_memory()?)));
        let blobs = Arc::new(FlakyBlobStore::new());
        let gate = Arc::new(ScriptedGate::new());
        let notices = Arc::new(RecordingNotifier::new());
        let desk = Desk::new(
            store.clone(),
            cache.clone(),
            blobs.clone(),
            BlobLayout::new(PUBLIC_BASE),
            COLLECTION,
            gate.clone(),
            notices.clone(),
        );
        Ok(Self {
            desk,
            store,
            cache,
            blobs,
            gate,
            notices,
            _dir: dir,
        })
    }

    /// Creates a country with `name` and the given columns, bypassing validation.
    pub async fn seed_country(
        &self,
        name: &str,
        columns: Vec<(Column, ColumnValue)>,
    ) -> Result<DocumentId, EngineError> {
        let mut fields = BTreeMap::new();
        fields.insert(Column::Name.as_str().to_string(), ColumnValue::Text(name.to_string()));
        for (column, value) in columns {
            fields.insert(column.as_str().to_string(), value);
        }
        self.desk.repository().create_country(fields).await
    }

    pub fn blob_url(&self, path: &str) -> String {
        self.desk.layout().url_for(path)
    }
}
