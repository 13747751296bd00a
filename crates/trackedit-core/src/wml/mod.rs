mod document;
mod editor;
mod revisions;
mod rewriter;
mod text_map;

pub use document::Document;
pub use editor::RevisionEditor;
pub use revisions::{
    accept_all, accept_revision, list_revisions, reject_all, reject_revision, IdAllocator,
    Revision, RevisionKind, RevisionSettings,
};
pub use rewriter::{classify_segments, InsertSide, Rewriter, Segment};
pub use text_map::{TextMap, TextMatch, TextPosition};
