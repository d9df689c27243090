pub mod assets;
pub mod config;
pub mod creation;
pub mod error;
pub mod gate;
pub mod repository;
pub mod selector;
pub mod session;
pub mod telemetry;

pub use assets::{AssetSession, BlobLayout, StagedFile};
pub use config::DeskConfig;
pub use creation::{NewCountry, ValidationError};
pub use error::EngineError;
pub use gate::{ConfirmationGate, Notice, Notifier};
pub use repository::CountryRepository;
pub use selector::GroupSelector;
pub use session::{BusyFlag, EditSession, SessionContext, DELETE_PROMPT, DISCARD_PROMPT};

use std::sync::Arc;

use countrydesk_core::{Buffer, Column, Document, DocumentId};
use countrydesk_storage::{
    BlobStore, FsBlobStore, LocalCache, MemoryCache, SqliteCache, SqliteStore, StoreGateway,
};
use tracing::info;

/// Process-wide wiring: store, cache, blob store and the UI collaborators.
/// Built once at start-up; every section session borrows its context from here.
pub struct Desk {
    repository: CountryRepository,
    blobs: Arc<dyn BlobStore>,
    layout: BlobLayout,
    gate: Arc<dyn ConfirmationGate>,
    notifier: Arc<dyn Notifier>,
}

impl Desk {
    pub fn new(
        gateway: Arc<dyn StoreGateway>,
        cache: Arc<dyn LocalCache>,
        blobs: Arc<dyn BlobStore>,
        layout: BlobLayout,
        collection: &str,
        gate: Arc<dyn ConfirmationGate>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            repository: CountryRepository::new(gateway, cache, collection),
            blobs,
            layout,
            gate,
            notifier,
        }
    }

    /// Opens the SQLite store, the configured cache and the filesystem blob store.
    pub fn open(
        config: &DeskConfig,
        gate: Arc<dyn ConfirmationGate>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, EngineError> {
        let gateway = Arc::new(SqliteStore::open(&config.store.path)?);
        let cache: Arc<dyn LocalCache> = match &config.cache.path {
            Some(path) => Arc::new(SqliteCache::open(path)?),
            None => Arc::new(MemoryCache::new()),
        };
        let blobs = Arc::new(FsBlobStore::new(config.blobs.root.clone()));
        info!(
            store = %config.store.path,
            collection = %config.store.collection,
            blobs = %config.blobs.root.display(),
            "desk opened"
        );
        Ok(Self::new(
            gateway,
            cache,
            blobs,
            BlobLayout::new(config.blobs.public_base.clone()),
            &config.store.collection,
            gate,
            notifier,
        ))
    }

    pub fn context(&self) -> SessionContext {
        SessionContext {
            repository: self.repository.clone(),
            gate: self.gate.clone(),
            notifier: self.notifier.clone(),
        }
    }

    pub fn repository(&self) -> &CountryRepository {
        &self.repository
    }

    pub fn layout(&self) -> &BlobLayout {
        &self.layout
    }

    pub async fn countries(&self) -> Result<Vec<Document>, EngineError> {
        self.repository.countries().await
    }

    pub async fn country(&self, id: DocumentId) -> Result<Document, EngineError> {
        self.repository.country(id).await
    }

    /// Opens an edit session for one content column of a country.
    pub async fn open_section<T: Buffer>(
        &self,
        country: DocumentId,
        column: Column,
    ) -> Result<EditSession<T>, EngineError> {
        let document = self.repository.country(country).await?;
        EditSession::open(self.context(), &document, column)
    }

    /// Opens a file-backed section (gallery, flag, banner, pdf).
    pub async fn open_assets(
        &self,
        country: DocumentId,
        column: Column,
    ) -> Result<AssetSession, EngineError> {
        let document = self.repository.country(country).await?;
        AssetSession::open(
            self.context(),
            self.blobs.clone(),
            self.layout.clone(),
            &document,
            column,
        )
    }

    pub async fn create_country(&self, new: NewCountry) -> Result<DocumentId, EngineError> {
        creation::create_country(
            &self.repository,
            self.blobs.as_ref(),
            &self.layout,
            self.notifier.as_ref(),
            new,
        )
        .await
    }

    /// Drops every cached collection.
    pub fn logout(&self) -> Result<(), EngineError> {
        self.repository.logout()
    }
}
