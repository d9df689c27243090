use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::buffer::Group;
use crate::column::Column;
use crate::content::ContentItem;
use crate::ids::DocumentId;

/// Value stored under one field of a remote document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnValue {
    Null,
    Text(String),
    Items(Vec<ContentItem>),
    Groups(Vec<Group>),
}

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ColumnValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_msgpack(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec(self)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, rmp_serde::decode::Error> {
        rmp_serde::from_slice(bytes)
    }
}

/// A record fetched from a collection of the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub fields: BTreeMap<String, ColumnValue>,
}

impl Document {
    pub fn new(id: DocumentId) -> Self {
        Self {
            id,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, field: &str, value: ColumnValue) -> Self {
        self.fields.insert(field.to_string(), value);
        self
    }

    pub fn field(&self, field: &str) -> Option<&ColumnValue> {
        self.fields.get(field)
    }

    pub fn column(&self, column: Column) -> Option<&ColumnValue> {
        self.field(column.as_str())
    }

    pub fn set_field(&mut self, field: &str, value: ColumnValue) {
        self.fields.insert(field.to_string(), value);
    }

    pub fn text(&self, column: Column) -> Option<&str> {
        self.column(column).and_then(ColumnValue::as_text)
    }

    pub fn name(&self) -> Option<&str> {
        self.text(Column::Name)
    }
}
