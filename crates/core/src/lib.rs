pub mod buffer;
pub mod column;
pub mod content;
pub mod document;
pub mod equality;
pub mod error;
pub mod field_value;
pub mod ids;

pub use buffer::{Buffer, Change, Group, GroupedList, Slot};
pub use column::Column;
pub use content::{BlobRef, ContentItem, ContentShape};
pub use document::{ColumnValue, Document};
pub use equality::structurally_equal;
pub use error::CoreError;
pub use field_value::FieldValue;
pub use ids::*;
