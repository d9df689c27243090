use std::fmt;

use serde::{Deserialize, Serialize};

use crate::column::Column;
use crate::content::{ContentItem, ContentShape};
use crate::document::ColumnValue;
use crate::error::CoreError;
use crate::field_value::FieldValue;

/// Position of one item: `group` is required for grouped content and rejected for flat content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub group: Option<usize>,
    pub index: usize,
}

impl Slot {
    pub fn flat(index: usize) -> Self {
        Self { group: None, index }
    }

    pub fn grouped(group: usize, index: usize) -> Self {
        Self {
            group: Some(group),
            index,
        }
    }
}

/// Mutation applied to the item at a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Replace(ContentItem),
    SetField { field: String, value: FieldValue },
}

impl Change {
    pub fn field(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Change::SetField {
            field: field.into(),
            value: value.into(),
        }
    }

    pub(crate) fn apply(self, item: &mut ContentItem) -> Result<(), CoreError> {
        match self {
            Change::Replace(next) => {
                *item = next;
                Ok(())
            }
            Change::SetField { field, value } => item.set_field(&field, value),
        }
    }
}

/// One bucket of a multi-category section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub key: String,
    pub items: Vec<ContentItem>,
}

impl Group {
    pub fn new(key: impl Into<String>, items: Vec<ContentItem>) -> Self {
        Self {
            key: key.into(),
            items,
        }
    }
}

/// Two-level container addressed by (group, item).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupedList {
    pub groups: Vec<Group>,
}

impl GroupedList {
    pub fn new(groups: Vec<Group>) -> Self {
        Self { groups }
    }

    pub fn with_keys(keys: &[&str]) -> Self {
        Self {
            groups: keys.iter().map(|k| Group::new(*k, Vec::new())).collect(),
        }
    }

    pub fn group(&self, group: usize) -> Option<&Group> {
        self.groups.get(group)
    }

    fn group_mut(&mut self, group: Option<usize>) -> Result<&mut Group, CoreError> {
        let group = group.ok_or(CoreError::GroupRequired)?;
        let len = self.groups.len();
        self.groups
            .get_mut(group)
            .ok_or(CoreError::IndexOutOfRange { index: group, len })
    }
}

/// A container an edit session can hold as canonical value and buffer.
pub trait Buffer: Clone + fmt::Debug + Serialize + Send + Sync + 'static {
    /// Appends `item` and returns its index within the list it landed in.
    fn push_item(&mut self, item: ContentItem, group: Option<usize>) -> Result<usize, CoreError>;

    fn remove_item(&mut self, slot: Slot) -> Result<ContentItem, CoreError>;

    fn item_mut(&mut self, slot: Slot) -> Result<&mut ContentItem, CoreError>;

    fn to_column(&self) -> ColumnValue;

    fn from_column(column: Column, value: Option<&ColumnValue>) -> Result<Self, CoreError>;

    fn apply(&mut self, slot: Slot, change: Change) -> Result<(), CoreError> {
        change.apply(self.item_mut(slot)?)
    }
}

fn remove_at(items: &mut Vec<ContentItem>, index: usize) -> Result<ContentItem, CoreError> {
    if index >= items.len() {
        return Err(CoreError::IndexOutOfRange {
            index,
            len: items.len(),
        });
    }
    Ok(items.remove(index))
}

fn get_at(items: &mut [ContentItem], index: usize) -> Result<&mut ContentItem, CoreError> {
    let len = items.len();
    items
        .get_mut(index)
        .ok_or(CoreError::IndexOutOfRange { index, len })
}

fn flat_only(group: Option<usize>) -> Result<(), CoreError> {
    match group {
        Some(g) => Err(CoreError::UnexpectedGroup(g)),
        None => Ok(()),
    }
}

impl Buffer for Vec<ContentItem> {
    fn push_item(&mut self, item: ContentItem, group: Option<usize>) -> Result<usize, CoreError> {
        flat_only(group)?;
        self.push(item);
        Ok(self.len() - 1)
    }

    fn remove_item(&mut self, slot: Slot) -> Result<ContentItem, CoreError> {
        flat_only(slot.group)?;
        remove_at(self, slot.index)
    }

    fn item_mut(&mut self, slot: Slot) -> Result<&mut ContentItem, CoreError> {
        flat_only(slot.group)?;
        get_at(self, slot.index)
    }

    fn to_column(&self) -> ColumnValue {
        ColumnValue::Items(self.clone())
    }

    fn from_column(column: Column, value: Option<&ColumnValue>) -> Result<Self, CoreError> {
        if column.is_grouped() {
            return Err(CoreError::InvalidData(format!(
                "column {column} is grouped, expected a flat list"
            )));
        }
        match value {
            None | Some(ColumnValue::Null) => Ok(Vec::new()),
            Some(ColumnValue::Items(items)) => Ok(items.clone()),
            // Flag, banner and pdf used to be stored as a bare URL.
            Some(ColumnValue::Text(url)) if column.shape() == ContentShape::Asset => {
                if url.is_empty() {
                    Ok(Vec::new())
                } else {
                    Ok(vec![ContentItem::stored_asset(url.clone())])
                }
            }
            Some(other) => Err(CoreError::InvalidData(format!(
                "column {column} holds {other:?}, expected a list"
            ))),
        }
    }
}

impl Buffer for GroupedList {
    fn push_item(&mut self, item: ContentItem, group: Option<usize>) -> Result<usize, CoreError> {
        let group = self.group_mut(group)?;
        group.items.push(item);
        Ok(group.items.len() - 1)
    }

    fn remove_item(&mut self, slot: Slot) -> Result<ContentItem, CoreError> {
        remove_at(&mut self.group_mut(slot.group)?.items, slot.index)
    }

    fn item_mut(&mut self, slot: Slot) -> Result<&mut ContentItem, CoreError> {
        get_at(&mut self.group_mut(slot.group)?.items, slot.index)
    }

    fn to_column(&self) -> ColumnValue {
        ColumnValue::Groups(self.groups.clone())
    }

    fn from_column(column: Column, value: Option<&ColumnValue>) -> Result<Self, CoreError> {
        if !column.is_grouped() {
            return Err(CoreError::InvalidData(format!(
                "column {column} is flat, expected groups"
            )));
        }
        match value {
            None | Some(ColumnValue::Null) => Ok(GroupedList::with_keys(column.group_keys())),
            Some(ColumnValue::Groups(groups)) => Ok(GroupedList::new(groups.clone())),
            Some(other) => Err(CoreError::InvalidData(format!(
                "column {column} holds {other:?}, expected groups"
            ))),
        }
    }
}
