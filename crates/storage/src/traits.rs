use std::collections::BTreeMap;

use async_trait::async_trait;
use countrydesk_core::{ColumnValue, Document, DocumentId};

use crate::error::StorageError;

/// Remote document database holding one record per country.
#[async_trait]
pub trait StoreGateway: Send + Sync {
    /// All documents of a collection in creation order. An unknown collection is empty.
    async fn fetch_list(&self, collection: &str) -> Result<Vec<Document>, StorageError>;

    async fn get(
        &self,
        collection: &str,
        id: DocumentId,
    ) -> Result<Option<Document>, StorageError>;

    /// Overwrites one field. Fails with `NotFound` when the document does not exist.
    async fn update_field(
        &self,
        collection: &str,
        id: DocumentId,
        field: &str,
        value: &ColumnValue,
    ) -> Result<(), StorageError>;

    async fn create_record(
        &self,
        collection: &str,
        fields: BTreeMap<String, ColumnValue>,
    ) -> Result<DocumentId, StorageError>;
}

/// Object storage for images and pdfs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError>;

    async fn delete(&self, path: &str) -> Result<(), StorageError>;
}

/// Key-value mirror of fetched collections. Entries are only ever overwritten,
/// invalidated explicitly, or cleared on logout.
pub trait LocalCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<Document>>, StorageError>;

    fn set(&self, key: &str, documents: &[Document]) -> Result<(), StorageError>;

    fn invalidate(&self, key: &str) -> Result<(), StorageError>;

    fn clear(&self) -> Result<(), StorageError>;
}
