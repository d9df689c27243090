use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use countrydesk_core::{
    structurally_equal, Buffer, Change, Column, ContentItem, CoreError, Document, DocumentId,
    Slot,
};
use tracing::{debug, error, info, warn};

use crate::error::EngineError;
use crate::gate::{ConfirmationGate, Notice, Notifier};
use crate::repository::CountryRepository;

pub const DELETE_PROMPT: &str = "Are you sure you want to delete this item?";
pub const DISCARD_PROMPT: &str = "You have unsaved changes. Are you sure you want to discard them?";

/// Collaborators shared by every session of one desk.
#[derive(Clone)]
pub struct SessionContext {
    pub repository: CountryRepository,
    pub gate: Arc<dyn ConfirmationGate>,
    pub notifier: Arc<dyn Notifier>,
}

/// Shared view of a session's in-flight save. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct BusyFlag(Arc<AtomicBool>);

impl BusyFlag {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Sets the flag until the returned guard is dropped.
    pub(crate) fn raise(&self) -> BusyGuard {
        self.0.store(true, Ordering::Release);
        BusyGuard(self.clone())
    }
}

pub(crate) struct BusyGuard(BusyFlag);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.0.store(false, Ordering::Release);
    }
}

/// Edit buffer for one column of one country.
///
/// `buffer` starts as a copy of `canonical` and is only changed through the
/// session's operations. `dirty` is recomputed after every mutation and is
/// true exactly when the two differ structurally.
///
/// `busy` is set while a save is in flight, and cleared even when the save
/// future is dropped. Callers must not start another save or cancel while it
/// is set.
pub struct EditSession<T: Buffer> {
    ctx: SessionContext,
    country: DocumentId,
    column: Column,
    canonical: T,
    buffer: T,
    dirty: bool,
    busy: BusyFlag,
}

impl<T: Buffer> EditSession<T> {
    pub fn new(ctx: SessionContext, country: DocumentId, column: Column, canonical: T) -> Self {
        let buffer = canonical.clone();
        Self {
            ctx,
            country,
            column,
            canonical,
            buffer,
            dirty: false,
            busy: BusyFlag::default(),
        }
    }

    /// Seeds a session from one column of a fetched country document.
    /// File columns go through `AssetSession`, which uploads before saving.
    pub fn open(ctx: SessionContext, document: &Document, column: Column) -> Result<Self, EngineError> {
        if column.is_asset() {
            return Err(CoreError::InvalidData(format!("column {column} holds files")).into());
        }
        Self::open_column(ctx, document, column)
    }

    pub(crate) fn open_column(
        ctx: SessionContext,
        document: &Document,
        column: Column,
    ) -> Result<Self, EngineError> {
        if column.is_text() {
            return Err(CoreError::InvalidData(format!("column {column} is not a content section")).into());
        }
        let canonical = T::from_column(column, document.column(column))?;
        Ok(Self::new(ctx, document.id, column, canonical))
    }

    pub fn initialize(&mut self, canonical: T) {
        self.buffer = canonical.clone();
        self.canonical = canonical;
        self.dirty = false;
    }

    /// Upstream data changed. Replaces canonical and buffer without asking,
    /// even when there are unsaved edits.
    pub fn reload(&mut self, canonical: T) {
        if self.dirty {
            warn!(
                country = %self.country,
                column = %self.column,
                "upstream reload discarded unsaved edits"
            );
        }
        self.initialize(canonical);
    }

    pub fn reload_from(&mut self, document: &Document) -> Result<(), EngineError> {
        let canonical = T::from_column(self.column, document.column(self.column))?;
        self.reload(canonical);
        Ok(())
    }

    pub fn country(&self) -> DocumentId {
        self.country
    }

    pub fn column(&self) -> Column {
        self.column
    }

    pub fn canonical(&self) -> &T {
        &self.canonical
    }

    pub fn buffer(&self) -> &T {
        &self.buffer
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_set()
    }

    pub fn busy_flag(&self) -> BusyFlag {
        self.busy.clone()
    }

    fn recompute_dirty(&mut self) {
        self.dirty = !structurally_equal(&self.buffer, &self.canonical);
    }

    fn check_shape(&self, item: &ContentItem) -> Result<(), CoreError> {
        let expected = self.column.shape();
        if item.shape() != expected {
            return Err(CoreError::ShapeMismatch {
                expected,
                actual: item.shape(),
            });
        }
        Ok(())
    }

    /// Appends an item (to `group` for grouped content) and asks the view to scroll to it.
    pub fn add(&mut self, item: ContentItem, group: Option<usize>) -> Result<usize, EngineError> {
        self.check_shape(&item)?;
        let mut next = self.buffer.clone();
        let index = next.push_item(item, group)?;
        self.buffer = next;
        self.recompute_dirty();
        self.ctx.notifier.notify(Notice::ScrollToEnd {
            column: self.column,
            group,
            index,
        });
        Ok(index)
    }

    /// Deletes by position after the user confirms. Returns whether anything was deleted.
    pub async fn remove(&mut self, slot: Slot) -> Result<bool, EngineError> {
        let mut next = self.buffer.clone();
        next.remove_item(slot)?;
        if !self.ctx.gate.confirm(DELETE_PROMPT).await {
            debug!(column = %self.column, ?slot, "delete declined");
            return Ok(false);
        }
        self.buffer = next;
        self.recompute_dirty();
        Ok(true)
    }

    /// Applies `change` to a copy of the buffer and swaps it in. On error the buffer is untouched.
    pub fn change(&mut self, slot: Slot, change: Change) -> Result<(), EngineError> {
        if let Change::Replace(item) = &change {
            self.check_shape(item)?;
        }
        let mut next = self.buffer.clone();
        next.apply(slot, change)?;
        self.buffer = next;
        self.recompute_dirty();
        Ok(())
    }

    /// Writes the buffer to the store. On success it becomes the new canonical value.
    /// On failure the buffer is kept so the user can retry.
    pub async fn save(&mut self) -> Result<(), EngineError> {
        let value = self.buffer.to_column();
        let result = {
            let _busy = self.busy.raise();
            self.ctx
                .repository
                .update_field(self.country, self.column, &value)
                .await
        };

        match result {
            Ok(()) => {
                self.canonical = self.buffer.clone();
                self.dirty = false;
                info!(country = %self.country, column = %self.column, "section saved");
                self.ctx.notifier.notify(Notice::Success(format!(
                    "{} updated successfully!",
                    self.column.title()
                )));
                Ok(())
            }
            Err(err) => {
                error!(country = %self.country, column = %self.column, %err, "section save failed");
                self.ctx.notifier.notify(Notice::Error(failure_message(&err, self.column)));
                Err(err)
            }
        }
    }

    /// Reverts the buffer. Unsaved edits are only discarded after confirmation.
    pub async fn cancel(&mut self) -> bool {
        if self.dirty && !self.ctx.gate.confirm(DISCARD_PROMPT).await {
            return false;
        }
        self.buffer = self.canonical.clone();
        self.dirty = false;
        true
    }

    pub(crate) fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub(crate) fn rewrite_buffer(&mut self, rewrite: impl FnOnce(&mut T)) {
        let mut next = self.buffer.clone();
        rewrite(&mut next);
        self.buffer = next;
        self.recompute_dirty();
    }
}

pub(crate) fn failure_message(err: &EngineError, column: Column) -> String {
    if err.is_not_found() {
        "Document not found!".to_string()
    } else {
        format!("Failed to update {}.", column.title().to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use countrydesk_core::{ColumnValue, FieldValue};
    use countrydesk_storage::{MemoryCache, SqliteStore, StoreGateway};
    use parking_lot::Mutex;
    use std::collections::{BTreeMap, VecDeque};

    #[derive(Default)]
    struct Answers {
        answers: Mutex<VecDeque<bool>>,
        asked: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ConfirmationGate for Answers {
        async fn confirm(&self, message: &str) -> bool {
            self.asked.lock().push(message.to_string());
            self.answers.lock().pop_front().unwrap_or(false)
        }
    }

    #[derive(Default)]
    struct Log(Mutex<Vec<Notice>>);

    impl Notifier for Log {
        fn notify(&self, notice: Notice) {
            self.0.lock().push(notice);
        }
    }

    async fn fun_facts(
        answers: &[bool],
    ) -> Result<(EditSession<Vec<ContentItem>>, Arc<Answers>, Arc<Log>), EngineError> {
        let store = Arc::new(SqliteStore::open_in_memory()?);
        let mut fields = BTreeMap::new();
        fields.insert(
            Column::FunFacts.as_str().to_string(),
            ColumnValue::Items(vec![ContentItem::scalar("fact1"), ContentItem::scalar("fact2")]),
        );
        let id = store.create_record("countries", fields).await?;
        let repository = CountryRepository::new(store, Arc::new(MemoryCache::new()), "countries");
        let gate = Arc::new(Answers::default());
        gate.answers.lock().extend(answers.iter().copied());
        let log = Arc::new(Log::default());
        let ctx = SessionContext {
            repository: repository.clone(),
            gate: gate.clone(),
            notifier: log.clone(),
        };
        let doc = repository.country(id).await?;
        Ok((EditSession::open(ctx, &doc, Column::FunFacts)?, gate, log))
    }

    #[tokio::test]
    async fn clean_cancel_never_asks() -> Result<(), EngineError> {
        let (mut session, gate, _) = fun_facts(&[]).await?;
        assert!(session.cancel().await);
        assert!(gate.asked.lock().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn inverse_edit_clears_dirty() -> Result<(), EngineError> {
        let (mut session, _, _) = fun_facts(&[]).await?;
        session.change(Slot::flat(0), Change::field("text", "changed"))?;
        assert!(session.is_dirty());
        session.change(Slot::flat(0), Change::field("text", "fact1"))?;
        assert!(!session.is_dirty());
        Ok(())
    }

    #[tokio::test]
    async fn wrong_shape_is_rejected() -> Result<(), EngineError> {
        let (mut session, _, log) = fun_facts(&[]).await?;
        let err = session.add(ContentItem::keyed("k", "v"), None).unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::ShapeMismatch { .. })));
        let err = session
            .change(Slot::flat(0), Change::Replace(ContentItem::record([("name", FieldValue::Null)])))
            .unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::ShapeMismatch { .. })));
        assert!(!session.is_dirty());
        assert!(log.0.lock().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn removing_missing_index_does_not_prompt() -> Result<(), EngineError> {
        let (mut session, gate, _) = fun_facts(&[true]).await?;
        assert!(session.remove(Slot::flat(9)).await.is_err());
        assert!(gate.asked.lock().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn reload_discards_edits_without_asking() -> Result<(), EngineError> {
        let (mut session, gate, _) = fun_facts(&[]).await?;
        session.add(ContentItem::scalar("draft"), None)?;
        session.reload(vec![ContentItem::scalar("fresh")]);
        assert!(!session.is_dirty());
        assert_eq!(session.buffer(), &vec![ContentItem::scalar("fresh")]);
        assert!(gate.asked.lock().is_empty());
        Ok(())
    }

    #[test]
    fn failure_messages() {
        let missing = EngineError::Storage(countrydesk_storage::StorageError::NotFound("x".into()));
        assert_eq!(failure_message(&missing, Column::Gallery), "Document not found!");
        let network = EngineError::Storage(countrydesk_storage::StorageError::Network("down".into()));
        assert_eq!(
            failure_message(&network, Column::EmergencyContacts),
            "Failed to update emergency contacts."
        );
    }
}
