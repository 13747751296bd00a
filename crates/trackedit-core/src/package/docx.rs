use crate::error::{EditError, Result};
use crate::xml::XmlTree;
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use zip::read::ZipArchive;
use zip::write::ZipWriter;
use zip::CompressionMethod;

/// Path of the main document part inside a .docx archive.
pub const DOCUMENT_PART: &str = "word/document.xml";

/// A .docx archive held in memory as raw parts.
///
/// Parts other than the ones the editor touches are carried through
/// save byte-for-byte. BTreeMap keeps part order deterministic across
/// round-trips.
pub struct DocxPackage {
    parts: BTreeMap<String, Vec<u8>>,
}

impl DocxPackage {
    pub fn open(bytes: &[u8]) -> Result<Self> {
        let cursor = Cursor::new(bytes);
        let mut archive = ZipArchive::new(cursor)?;

        let mut parts = BTreeMap::new();
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let name = file.name().to_string();
            let mut content = Vec::new();
            file.read_to_end(&mut content)?;
            parts.insert(name, content);
        }

        Ok(Self { parts })
    }

    pub fn save(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        let mut writer = ZipWriter::new(&mut buffer);

        for (path, content) in &self.parts {
            let options: zip::write::FileOptions<'_, ()> =
                zip::write::FileOptions::default().compression_method(CompressionMethod::Deflated);
            writer.start_file(path, options)?;
            writer.write_all(content)?;
        }

        writer.finish()?;
        Ok(buffer.into_inner())
    }

    pub fn get_part(&self, path: &str) -> Option<&[u8]> {
        self.parts.get(path).map(|v| v.as_slice())
    }

    pub fn set_part(&mut self, path: &str, content: Vec<u8>) {
        self.parts.insert(path.to_string(), content);
    }

    pub fn get_xml_part(&self, path: &str) -> Result<XmlTree> {
        let bytes = self.get_part(path).ok_or_else(|| EditError::MissingPart {
            part: path.to_string(),
        })?;
        crate::xml::parser::parse_bytes(bytes)
    }

    pub fn put_xml_part(&mut self, path: &str, tree: &XmlTree) -> Result<()> {
        let bytes = crate::xml::builder::serialize_bytes(tree)?;
        self.set_part(path, bytes);
        Ok(())
    }

    pub fn part_names(&self) -> impl Iterator<Item = &String> {
        self.parts.keys()
    }
}
