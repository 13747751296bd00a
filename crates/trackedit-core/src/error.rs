use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditError {
    #[error("text not found: '{query}' (occurrence {occurrence})")]
    TextNotFound { query: String, occurrence: usize },

    #[error("malformed document tree: {0}")]
    MalformedTree(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("file was modified externally: {}", path.display())]
    ExternalModification { path: PathBuf },

    #[error("document not open: {}", path.display())]
    DocumentNotOpen { path: PathBuf },

    #[error("missing required part '{part}' in package")]
    MissingPart { part: String },

    #[error("XML parsing error: {message}")]
    XmlParse { message: String },

    #[error("XML serialization error: {0}")]
    XmlWrite(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

pub type Result<T> = std::result::Result<T, EditError>;
