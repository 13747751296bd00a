mod docx;

pub use docx::{DocxPackage, DOCUMENT_PART};
