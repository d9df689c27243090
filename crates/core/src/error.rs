use thiserror::Error;

use crate::content::ContentShape;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("grouped content requires a group index")]
    GroupRequired,

    #[error("flat content does not take a group index (got {0})")]
    UnexpectedGroup(usize),

    #[error("field `{field}` is not addressable on {shape:?} content")]
    InvalidField { field: String, shape: ContentShape },

    #[error("expected {expected:?} content, got {actual:?}")]
    ShapeMismatch {
        expected: ContentShape,
        actual: ContentShape,
    },

    #[error("invalid data: {0}")]
    InvalidData(String),
}
