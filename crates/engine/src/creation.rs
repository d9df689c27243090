use std::collections::BTreeMap;
use std::fmt;

use countrydesk_core::{Buffer, Column, ColumnValue, ContentItem, DocumentId, GroupedList};
use countrydesk_storage::BlobStore;
use thiserror::Error;
use tracing::{info, warn};

use crate::assets::{BlobLayout, StagedFile};
use crate::error::EngineError;
use crate::gate::{Notice, Notifier};
use crate::repository::CountryRepository;

/// Required fields missing from a new country. Raised before any remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required fields: {}", .missing.join(", "))]
pub struct ValidationError {
    pub missing: Vec<&'static str>,
}

/// Form data for a new country.
#[derive(Clone, Default)]
pub struct NewCountry {
    pub name: String,
    pub region: String,
    pub flag: Option<StagedFile>,
}

impl fmt::Debug for NewCountry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewCountry")
            .field("name", &self.name)
            .field("region", &self.region)
            .field("flag", &self.flag.as_ref().map(|file| &file.file_name))
            .finish()
    }
}

impl NewCountry {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if self.flag.as_ref().is_none_or(|file| file.bytes.is_empty()) {
            missing.push("flag");
        }
        if self.region.trim().is_empty() {
            missing.push("region");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { missing })
        }
    }
}

/// Every column a freshly created country starts with.
fn initial_fields(name: &str, region: &str, flag_url: String) -> BTreeMap<String, ColumnValue> {
    let mut fields = BTreeMap::new();
    for column in Column::ALL {
        let value = match column {
            Column::Name => ColumnValue::Text(name.to_string()),
            Column::Region => ColumnValue::Text(region.to_string()),
            Column::Flag => ColumnValue::Items(vec![ContentItem::stored_asset(flag_url.clone())]),
            c if c.is_grouped() => GroupedList::with_keys(c.group_keys()).to_column(),
            _ => ColumnValue::Items(Vec::new()),
        };
        fields.insert(column.as_str().to_string(), value);
    }
    fields
}

/// Validates, uploads the flag and creates the document.
///
/// Validation failures are returned to the caller only. Remote failures are
/// also reported through the notifier.
pub(crate) async fn create_country(
    repository: &CountryRepository,
    blobs: &dyn BlobStore,
    layout: &BlobLayout,
    notifier: &dyn Notifier,
    new: NewCountry,
) -> Result<DocumentId, EngineError> {
    new.validate()?;
    let name = new.name.trim();
    let region = new.region.trim();
    let flag = new
        .flag
        .as_ref()
        .ok_or_else(|| ValidationError { missing: vec!["flag"] })?;

    let path = layout.path_for(name, &flag.file_name)?;
    if let Err(err) = blobs.upload(&path, &flag.bytes).await {
        warn!(path, %err, "flag upload failed");
        notifier.notify(Notice::Error(format!("Failed to upload {path}.")));
        return Err(err.into());
    }

    let fields = initial_fields(name, region, layout.url_for(&path));
    match repository.create_country(fields).await {
        Ok(id) => {
            info!(%id, name, "country created");
            notifier.notify(Notice::Success(format!("{name} created successfully!")));
            Ok(id)
        }
        Err(err) => {
            warn!(name, %err, "country creation failed");
            notifier.notify(Notice::Error(format!("Failed to create {name}.")));
            Err(err)
        }
    }
}
