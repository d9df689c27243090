use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use countrydesk_core::{ColumnValue, Document, DocumentId};
use countrydesk_engine::{ConfirmationGate, Notice, Notifier};
use countrydesk_storage::{BlobStore, MemoryBlobStore, StorageError, StoreGateway};

/// Confirmation gate answering from a queue. An unscripted prompt is declined.
#[derive(Default)]
pub struct ScriptedGate {
    answers: Mutex<VecDeque<bool>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(&self, yes: bool) {
        self.answers.lock().push_back(yes);
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl ConfirmationGate for ScriptedGate {
    async fn confirm(&self, message: &str) -> bool {
        self.prompts.lock().push(message.to_string());
        self.answers.lock().pop_front().unwrap_or(false)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    pub fn successes(&self) -> Vec<String> {
        self.notices
            .lock()
            .iter()
            .filter_map(|n| match n {
                Notice::Success(msg) => Some(msg.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.notices
            .lock()
            .iter()
            .filter_map(|n| match n {
                Notice::Error(msg) => Some(msg.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.notices.lock().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}

/// Parks the next call of an operation until the test releases it.
#[derive(Default)]
pub struct Hold {
    armed: AtomicBool,
    entered: Notify,
    released: Notify,
}

impl Hold {
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Resolves once the held call has started.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.released.notify_one();
    }

    async fn pass(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.released.notified().await;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFailure {
    NotFound,
    Network,
}

/// Store gateway that can be told to fail its next field update.
pub struct FlakyStore {
    inner: Arc<dyn StoreGateway>,
    next_update_failure: Mutex<Option<StoreFailure>>,
    /// Parks the next field update before it reaches the inner store.
    pub update_hold: Hold,
    fetches: AtomicUsize,
    updates: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<dyn StoreGateway>) -> Self {
        Self {
            inner,
            next_update_failure: Mutex::new(None),
            update_hold: Hold::default(),
            fetches: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
        }
    }

    pub fn fail_next_update(&self, failure: StoreFailure) {
        *self.next_update_failure.lock() = Some(failure);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Successful field updates that reached the inner store.
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreGateway for FlakyStore {
    async fn fetch_list(&self, collection: &str) -> Result<Vec<Document>, StorageError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_list(collection).await
    }

    async fn get(
        &self,
        collection: &str,
        id: DocumentId,
    ) -> Result<Option<Document>, StorageError> {
        self.inner.get(collection, id).await
    }

    async fn update_field(
        &self,
        collection: &str,
        id: DocumentId,
        field: &str,
        value: &ColumnValue,
    ) -> Result<(), StorageError> {
        self.update_hold.pass().await;
        let failure = self.next_update_failure.lock().take();
        match failure {
            Some(StoreFailure::NotFound) => {
                return Err(StorageError::NotFound(format!("{collection}/{id}")));
            }
            Some(StoreFailure::Network) => {
                return Err(StorageError::Network("connection reset".into()));
            }
            None => {}
        }
        self.inner.update_field(collection, id, field, value).await?;
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn create_record(
        &self,
        collection: &str,
        fields: BTreeMap<String, ColumnValue>,
    ) -> Result<DocumentId, StorageError> {
        self.inner.create_record(collection, fields).await
    }
}

/// In-memory blob store with per-path failure injection and an upload log.
#[derive(Default)]
pub struct FlakyBlobStore {
    inner: MemoryBlobStore,
    failing_uploads: Mutex<BTreeSet<String>>,
    failing_deletes: Mutex<BTreeSet<String>>,
    uploads: Mutex<Vec<String>>,
    deletes: Mutex<Vec<String>>,
    /// Parks the next upload before it reaches the inner store.
    pub upload_hold: Hold,
}

impl FlakyBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_upload_of(&self, path: &str) {
        self.failing_uploads.lock().insert(path.to_string());
    }

    pub fn fail_delete_of(&self, path: &str) {
        self.failing_deletes.lock().insert(path.to_string());
    }

    pub fn heal(&self) {
        self.failing_uploads.lock().clear();
        self.failing_deletes.lock().clear();
    }

    pub fn contains(&self, path: &str) -> bool {
        self.inner.contains(path)
    }

    pub fn read(&self, path: &str) -> Option<Vec<u8>> {
        self.inner.read(path)
    }

    /// Paths of successful uploads, in order.
    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().clone()
    }

    /// Paths of successful deletes, in order.
    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().clone()
    }
}

#[async_trait]
impl BlobStore for FlakyBlobStore {
    async fn upload(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.upload_hold.pass().await;
        let failing = self.failing_uploads.lock().contains(path);
        if failing {
            return Err(StorageError::Upload {
                path: path.to_string(),
                reason: "quota exceeded".into(),
            });
        }
        self.inner.upload(path, bytes).await?;
        self.uploads.lock().push(path.to_string());
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let failing = self.failing_deletes.lock().contains(path);
        if failing {
            return Err(StorageError::Delete {
                path: path.to_string(),
                reason: "permission denied".into(),
            });
        }
        self.inner.delete(path).await?;
        self.deletes.lock().push(path.to_string());
        Ok(())
    }
}
