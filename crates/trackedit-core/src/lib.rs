pub mod error;
pub mod package;
pub mod session;
pub mod wml;
pub mod xml;

pub use error::{EditError, Result};

pub use session::{DocumentCache, Session};
pub use wml::{Document, Revision, RevisionEditor, RevisionKind, RevisionSettings};
