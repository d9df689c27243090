use std::collections::BTreeMap;
use std::sync::Arc;

use countrydesk_core::{Column, ColumnValue, Document, DocumentId};
use countrydesk_storage::{LocalCache, StoreGateway};
use tracing::{debug, error, warn};

use crate::error::EngineError;

/// Country collection access: remote store reads go through the local cache,
/// remote writes patch it immediately afterwards.
#[derive(Clone)]
pub struct CountryRepository {
    gateway: Arc<dyn StoreGateway>,
    cache: Arc<dyn LocalCache>,
    collection: String,
}

impl CountryRepository {
    pub fn new(
        gateway: Arc<dyn StoreGateway>,
        cache: Arc<dyn LocalCache>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            cache,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Cached list if present, otherwise a fresh fetch that populates the cache.
    pub async fn countries(&self) -> Result<Vec<Document>, EngineError> {
        match self.cache.get(&self.collection) {
            Ok(Some(documents)) => {
                debug!(collection = %self.collection, "country list served from cache");
                return Ok(documents);
            }
            Ok(None) => {}
            Err(err) => warn!(collection = %self.collection, %err, "cache read failed, fetching"),
        }
        self.refresh().await
    }

    /// Always fetches and overwrites the cached list.
    pub async fn refresh(&self) -> Result<Vec<Document>, EngineError> {
        let documents = self.gateway.fetch_list(&self.collection).await?;
        self.cache.set(&self.collection, &documents)?;
        Ok(documents)
    }

    pub async fn country(&self, id: DocumentId) -> Result<Document, EngineError> {
        self.countries()
            .await?
            .into_iter()
            .find(|doc| doc.id == id)
            .ok_or_else(|| EngineError::CountryNotFound(id.to_string()))
    }

    /// Writes one column remotely, then patches the cached copy in place.
    pub async fn update_field(
        &self,
        id: DocumentId,
        column: Column,
        value: &ColumnValue,
    ) -> Result<(), EngineError> {
        self.gateway
            .update_field(&self.collection, id, column.as_str(), value)
            .await?;
        if let Err(err) = self.patch_cache(id, column, value) {
            // The remote write stands; drop the entry so the next read refetches.
            warn!(%id, %column, %err, "cache patch failed, invalidating");
            if let Err(err) = self.cache.invalidate(&self.collection) {
                error!(collection = %self.collection, %err, "cache invalidation failed, entry may be stale");
            }
        }
        Ok(())
    }

    fn patch_cache(
        &self,
        id: DocumentId,
        column: Column,
        value: &ColumnValue,
    ) -> Result<(), EngineError> {
        let Some(mut documents) = self.cache.get(&self.collection)? else {
            return Ok(());
        };
        if let Some(doc) = documents.iter_mut().find(|doc| doc.id == id) {
            doc.set_field(column.as_str(), value.clone());
            self.cache.set(&self.collection, &documents)?;
        }
        Ok(())
    }

    /// Creates a country document. The cached list is dropped so the next read includes it.
    pub async fn create_country(
        &self,
        fields: BTreeMap<String, ColumnValue>,
    ) -> Result<DocumentId, EngineError> {
        let id = self.gateway.create_record(&self.collection, fields).await?;
        self.cache.invalidate(&self.collection)?;
        Ok(id)
    }

    /// Clears every cached collection.
    pub fn logout(&self) -> Result<(), EngineError> {
        self.cache.clear()?;
        Ok(())
    }
}
