use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::field_value::FieldValue;
use crate::ids::BlobHash;

/// Discriminant of a `ContentItem`. Each section edits exactly one shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentShape {
    Scalar,
    KeyedField,
    Record,
    Asset,
}

impl ContentShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::KeyedField => "keyed_field",
            Self::Record => "record",
            Self::Asset => "asset",
        }
    }
}

/// Reference to a file in the blob store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlobRef {
    Stored {
        url: String,
    },
    /// Staged locally, uploaded to `path` on save.
    Pending {
        hash: BlobHash,
        path: String,
        url: String,
    },
}

impl BlobRef {
    pub fn url(&self) -> &str {
        match self {
            BlobRef::Stored { url } | BlobRef::Pending { url, .. } => url,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, BlobRef::Pending { .. })
    }
}

/// One editable unit of a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentItem {
    Scalar(String),
    KeyedField { key: String, value: String },
    Record(BTreeMap<String, FieldValue>),
    Asset(BlobRef),
}

impl ContentItem {
    pub fn scalar(text: impl Into<String>) -> Self {
        ContentItem::Scalar(text.into())
    }

    pub fn keyed(key: impl Into<String>, value: impl Into<String>) -> Self {
        ContentItem::KeyedField {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn record<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        ContentItem::Record(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn stored_asset(url: impl Into<String>) -> Self {
        ContentItem::Asset(BlobRef::Stored { url: url.into() })
    }

    pub fn shape(&self) -> ContentShape {
        match self {
            ContentItem::Scalar(_) => ContentShape::Scalar,
            ContentItem::KeyedField { .. } => ContentShape::KeyedField,
            ContentItem::Record(_) => ContentShape::Record,
            ContentItem::Asset(_) => ContentShape::Asset,
        }
    }

    pub fn field(&self, field: &str) -> Option<FieldValue> {
        match (self, field) {
            (ContentItem::Scalar(text), "text") => Some(FieldValue::Text(text.clone())),
            (ContentItem::KeyedField { key, .. }, "key") => Some(FieldValue::Text(key.clone())),
            (ContentItem::KeyedField { value, .. }, "value") => {
                Some(FieldValue::Text(value.clone()))
            }
            (ContentItem::Record(fields), _) => fields.get(field).cloned(),
            _ => None,
        }
    }

    /// Writes one named field in place.
    ///
    /// Scalars expose `text`, keyed fields expose `key` and `value` (both text only).
    /// Records accept any field name. Assets have no addressable fields.
    pub fn set_field(&mut self, field: &str, value: FieldValue) -> Result<(), CoreError> {
        let shape = self.shape();
        let invalid = || CoreError::InvalidField {
            field: field.to_string(),
            shape,
        };
        match self {
            ContentItem::Scalar(text) => match (field, value) {
                ("text", FieldValue::Text(v)) => *text = v,
                _ => return Err(invalid()),
            },
            ContentItem::KeyedField { key, value: current } => match (field, value) {
                ("key", FieldValue::Text(v)) => *key = v,
                ("value", FieldValue::Text(v)) => *current = v,
                _ => return Err(invalid()),
            },
            ContentItem::Record(fields) => {
                fields.insert(field.to_string(), value);
            }
            ContentItem::Asset(_) => return Err(invalid()),
        }
        Ok(())
    }

    pub fn as_asset(&self) -> Option<&BlobRef> {
        match self {
            ContentItem::Asset(blob) => Some(blob),
            _ => None,
        }
    }
}
