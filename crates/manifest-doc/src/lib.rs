//! Application manifest document model.
//!
//! Parses manifest XML into an owned element tree that keeps the exact source
//! bytes of every event, so serializing an untouched document reproduces the
//! input byte-for-byte. Attribute edits rewrite only the start tag of the
//! element they target.

pub mod error;
pub mod names;

mod document;
mod mutation;
mod reader;
mod writer;

pub use document::{
    Attribute, ComponentKind, ComponentNode, Element, ElementPath, ManifestDocument, Node, QName,
};
pub use error::ManifestError;
pub use mutation::AttributeMutation;
pub use reader::parse_document;
