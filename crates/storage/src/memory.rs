use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use countrydesk_core::Document;

use crate::error::StorageError;
use crate::traits::{BlobStore, LocalCache};

/// Process-local cache. Cleared when the process exits.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Vec<Document>>, StorageError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, documents: &[Document]) -> Result<(), StorageError> {
        self.entries.write().insert(key.to_string(), documents.to_vec());
        Ok(())
    }

    fn invalidate(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.entries.write().clear();
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects.lock().contains_key(path)
    }

    pub fn read(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.lock().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        self.objects.lock().keys().cloned().collect()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.objects.lock().insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        match self.objects.lock().remove(path) {
            Some(_) => Ok(()),
            None => Err(StorageError::Delete {
                path: path.to_string(),
                reason: "object does not exist".into(),
            }),
        }
    }
}
