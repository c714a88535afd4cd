mod builder;
mod document;

pub use builder::{element, text, ElementSpec, NodeSpec};
pub use document::{
    Descendants, Document, DocumentView, MutationRecord, NodeId, ScrollBehavior, ScrollBlock,
    ScrollRequest,
};
