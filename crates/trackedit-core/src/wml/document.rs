use super::editor::RevisionEditor;
use super::revisions::{Revision, RevisionSettings};
use crate::error::{EditError, Result};
use crate::package::{DocxPackage, DOCUMENT_PART};
use std::fs;
use std::path::{Path, PathBuf};

/// A .docx document open for revision editing: the package plus the
/// main document part parsed into an editor.
pub struct Document {
    package: DocxPackage,
    editor: RevisionEditor,
    path: Option<PathBuf>,
}

impl Document {
    pub fn open(path: impl AsRef<Path>, author: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let mut doc = Self::from_bytes(&bytes, author)?;
        doc.path = Some(path.to_path_buf());
        Ok(doc)
    }

    pub fn from_bytes(bytes: &[u8], author: Option<&str>) -> Result<Self> {
        let package = DocxPackage::open(bytes)?;
        let tree = package.get_xml_part(DOCUMENT_PART)?;
        let settings = RevisionSettings::for_author(author.unwrap_or("Reviewer"));
        let editor = RevisionEditor::from_tree(tree, settings)?;
        Ok(Self {
            package,
            editor,
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn author(&self) -> &str {
        self.editor.author()
    }

    pub fn editor(&self) -> &RevisionEditor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut RevisionEditor {
        &mut self.editor
    }

    /// Serialize the edited document part back into the package and
    /// return the whole archive.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.package.put_xml_part(DOCUMENT_PART, self.editor.tree())?;
        self.package.save()
    }

    pub fn save(&mut self) -> Result<()> {
        let path = self.path.clone().ok_or_else(|| {
            EditError::InvalidArgument("document has no backing path".to_string())
        })?;
        self.save_as(path)
    }

    pub fn save_as(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.to_bytes()?;
        fs::write(path.as_ref(), bytes)?;
        self.path = Some(path.as_ref().to_path_buf());
        Ok(())
    }

    // Editor operations, re-exposed so callers rarely need editor_mut.

    pub fn replace(&mut self, find: &str, with: &str, nth: usize) -> Result<i32> {
        self.editor.replace(find, with, nth)
    }

    pub fn delete(&mut self, find: &str, nth: usize) -> Result<i32> {
        self.editor.delete(find, nth)
    }

    pub fn insert_before(&mut self, anchor: &str, text: &str, nth: usize) -> Result<i32> {
        self.editor.insert_before(anchor, text, nth)
    }

    pub fn insert_after(&mut self, anchor: &str, text: &str, nth: usize) -> Result<i32> {
        self.editor.insert_after(anchor, text, nth)
    }

    pub fn accept(&mut self, id: i32) -> bool {
        self.editor.accept(id)
    }

    pub fn reject(&mut self, id: i32) -> bool {
        self.editor.reject(id)
    }

    pub fn accept_all(&mut self, author: Option<&str>) -> usize {
        self.editor.accept_all(author)
    }

    pub fn reject_all(&mut self, author: Option<&str>) -> usize {
        self.editor.reject_all(author)
    }

    pub fn list_revisions(&self, author: Option<&str>) -> Vec<Revision> {
        self.editor.list_revisions(author)
    }

    pub fn find(&self, text: &str) -> Result<bool> {
        self.editor.find(text)
    }

    pub fn count(&self, text: &str) -> Result<usize> {
        self.editor.count(text)
    }

    pub fn visible_text(&self) -> String {
        self.editor.visible_text()
    }
}
