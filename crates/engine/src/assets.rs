//! Sections whose items are files: gallery, flag, banner and pdf.
//!
//! Files are staged locally while editing. Saving uploads every staged file
//! still referenced by the buffer, then writes the column, then deletes the
//! blobs the save dropped. A failed upload aborts the save; blobs already
//! uploaded in that batch stay in the blob store.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use countrydesk_core::{BlobHash, BlobRef, Change, Column, ContentItem, CoreError, Document, Slot};
use countrydesk_storage::BlobStore;
use tracing::{info, warn};

use crate::error::EngineError;
use crate::gate::Notice;
use crate::session::{BusyFlag, EditSession, SessionContext};

/// Maps (country, file) to a blob path and its public URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobLayout {
    public_base: String,
}

impl BlobLayout {
    pub fn new(public_base: impl Into<String>) -> Self {
        let base: String = public_base.into();
        Self {
            public_base: base.trim_end_matches('/').to_string(),
        }
    }

    /// Fails when either name has nothing left after slugging.
    pub fn path_for(&self, country_name: &str, file_name: &str) -> Result<String, CoreError> {
        let country = slug(country_name);
        let file = file_slug(file_name);
        if country.is_empty() || file.is_empty() {
            return Err(CoreError::InvalidData(format!(
                "no blob path for file {file_name:?} of country {country_name:?}"
            )));
        }
        Ok(format!("countries/{country}/{file}"))
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.public_base, path)
    }

    /// Inverse of `url_for`. URLs outside this layout yield `None`.
    pub fn path_from_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(&self.public_base)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|path| !path.is_empty())
            .map(str::to_string)
    }
}

fn slug(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.trim().chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            out.push(c);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

fn file_slug(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

/// A file picked by the user, not yet uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl StagedFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

pub struct AssetSession {
    session: EditSession<Vec<ContentItem>>,
    blobs: Arc<dyn BlobStore>,
    layout: BlobLayout,
    country_name: String,
    staged: HashMap<BlobHash, Vec<u8>>,
}

impl AssetSession {
    pub fn open(
        ctx: SessionContext,
        blobs: Arc<dyn BlobStore>,
        layout: BlobLayout,
        document: &Document,
        column: Column,
    ) -> Result<Self, EngineError> {
        if !column.is_asset() {
            return Err(CoreError::InvalidData(format!("column {column} does not hold files")).into());
        }
        let country_name = document
            .name()
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| CoreError::InvalidData(format!("country {} has no name", document.id)))?
            .to_string();
        Ok(Self {
            session: EditSession::open_column(ctx, document, column)?,
            blobs,
            layout,
            country_name,
            staged: HashMap::new(),
        })
    }

    pub fn session(&self) -> &EditSession<Vec<ContentItem>> {
        &self.session
    }

    pub fn is_dirty(&self) -> bool {
        self.session.is_dirty()
    }

    pub fn busy_flag(&self) -> BusyFlag {
        self.session.busy_flag()
    }

    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }

    /// Keeps the bytes locally and returns a pending item pointing at the final URL.
    pub fn stage(&mut self, file: StagedFile) -> Result<ContentItem, EngineError> {
        let hash = BlobHash::of(&file.bytes);
        let path = self.layout.path_for(&self.country_name, &file.file_name)?;
        let url = self.layout.url_for(&path);
        self.staged.insert(hash, file.bytes);
        Ok(ContentItem::Asset(BlobRef::Pending { hash, path, url }))
    }

    pub fn add_file(&mut self, file: StagedFile) -> Result<usize, EngineError> {
        let item = self.stage(file)?;
        let added = self.session.add(item, None);
        self.prune_staged();
        added
    }

    pub fn replace_file(&mut self, index: usize, file: StagedFile) -> Result<(), EngineError> {
        let item = self.stage(file)?;
        let changed = self.session.change(Slot::flat(index), Change::Replace(item));
        self.prune_staged();
        changed
    }

    /// Single-file columns (flag, banner, pdf): replaces the current file or adds the first one.
    pub fn set_file(&mut self, file: StagedFile) -> Result<(), EngineError> {
        if self.session.buffer().is_empty() {
            self.add_file(file).map(|_| ())
        } else {
            self.replace_file(0, file)
        }
    }

    pub async fn remove(&mut self, index: usize) -> Result<bool, EngineError> {
        let removed = self.session.remove(Slot::flat(index)).await?;
        if removed {
            self.prune_staged();
        }
        Ok(removed)
    }

    pub async fn cancel(&mut self) -> bool {
        let reverted = self.session.cancel().await;
        if reverted {
            self.staged.clear();
        }
        reverted
    }

    /// Upstream data changed. Unsaved edits and staged files are dropped without asking.
    pub fn reload_from(&mut self, document: &Document) -> Result<(), EngineError> {
        self.session.reload_from(document)?;
        self.staged.clear();
        Ok(())
    }

    /// Drops staged bytes no pending item of the buffer refers to.
    fn prune_staged(&mut self) {
        let referenced: BTreeSet<BlobHash> = self
            .session
            .buffer()
            .iter()
            .filter_map(|item| match item.as_asset() {
                Some(BlobRef::Pending { hash, .. }) => Some(*hash),
                _ => None,
            })
            .collect();
        self.staged.retain(|hash, _| referenced.contains(hash));
    }

    pub async fn save(&mut self) -> Result<(), EngineError> {
        let uploaded = {
            let _busy = self.session.busy_flag().raise();
            self.upload_pending().await
        };
        uploaded?;

        self.session.rewrite_buffer(|items| {
            for item in items.iter_mut() {
                if let ContentItem::Asset(blob) = item
                    && blob.is_pending()
                {
                    *blob = BlobRef::Stored {
                        url: blob.url().to_string(),
                    };
                }
            }
        });

        let before = stored_urls(self.session.canonical());
        self.session.save().await?;
        self.staged.clear();

        let after = stored_urls(self.session.canonical());
        for url in before.difference(&after) {
            let Some(path) = self.layout.path_from_url(url) else {
                continue;
            };
            match self.blobs.delete(&path).await {
                Ok(()) => info!(path, "removed dropped blob"),
                Err(err) => {
                    warn!(path, %err, "blob delete failed");
                    self.session
                        .context()
                        .notifier
                        .notify(Notice::Error(format!("Failed to delete {path}.")));
                }
            }
        }
        Ok(())
    }

    /// Uploads every pending file of the buffer, stopping at the first failure.
    /// When several pending items share a path, the last one's bytes are uploaded.
    async fn upload_pending(&self) -> Result<(), EngineError> {
        let mut batch: Vec<(&str, &BlobHash)> = Vec::new();
        for item in self.session.buffer() {
            let Some(BlobRef::Pending { hash, path, .. }) = item.as_asset() else {
                continue;
            };
            match batch.iter_mut().find(|(queued, _)| *queued == path.as_str()) {
                Some(entry) => entry.1 = hash,
                None => batch.push((path.as_str(), hash)),
            }
        }
        for (path, hash) in batch {
            let bytes = self
                .staged
                .get(hash)
                .ok_or_else(|| CoreError::InvalidData(format!("no staged bytes for {path}")))?;
            if let Err(err) = self.blobs.upload(path, bytes).await {
                warn!(path, %err, "upload failed, aborting save");
                self.session
                    .context()
                    .notifier
                    .notify(Notice::Error(format!("Failed to upload {path}.")));
                return Err(err.into());
            }
            info!(path, size = bytes.len(), "uploaded staged file");
        }
        Ok(())
    }
}

fn stored_urls(items: &[ContentItem]) -> BTreeSet<String> {
    items
        .iter()
        .filter_map(ContentItem::as_asset)
        .filter_map(|blob| match blob {
            BlobRef::Stored { url } => Some(url.clone()),
            BlobRef::Pending { .. } => None,
        })
        .collect()
}
