//! Error types for manifest parsing and editing.

use crate::ElementPath;

/// Errors produced while reading or editing a manifest document.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("XML parse error at byte {position}: {message}")]
    Parse { position: u64, message: String },

    #[error("invalid UTF-8 in {context}")]
    Utf8 { context: String },

    #[error("document has no root element")]
    NoRoot,

    #[error("document has more than one root element")]
    MultipleRoots,

    #[error("element <{0}> is never closed")]
    Unclosed(String),

    #[error("no element at {0}")]
    ElementNotFound(ElementPath),
}

impl ManifestError {
    pub(crate) fn parse(position: u64, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }
}
