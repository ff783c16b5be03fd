//! ZIP archive helper utilities for the Excel (.xlsx) container
//! Provides convenient methods for accessing parts within ZIP archives

use crate::error::ChipToolsError;
use crate::helpers::xml::XmlReader;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use zip::read::ZipFile;
use zip::result::ZipError;
use zip::ZipArchive;

/// Helper trait for ZIP archive operations with specialized reader creation
pub(crate) trait ZipHelper<RS: Read + Seek> {
    /// Gets a file from the ZIP archive by name (case-insensitive, path separator agnostic)
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, ChipToolsError>;

    /// Creates an XML reader for a file within the ZIP archive
    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, ChipToolsError>;

    /// Reads a file within the ZIP archive fully into memory
    fn read_bytes(&mut self, name: &str) -> Result<Option<Vec<u8>>, ChipToolsError>;
}

impl<RS: Read + Seek> ZipHelper<RS> for ZipArchive<RS> {
    /// Gets a file from the ZIP archive by name with case-insensitive matching
    /// and path separator normalization (backslash to forward slash)
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, ChipToolsError> {
        let pattern = name.replace('\\', "/");
        let path = self.file_names()
            .find(|file_name| pattern.eq_ignore_ascii_case(*file_name))
            .map(|file_name| file_name.to_owned());
        match path.map(|file_name| self.by_name(&file_name)).transpose() {
            Ok(Some(file)) => Ok(Some(file)),
            Ok(None) | Err(ZipError::FileNotFound) => Ok(None),
            Err(error) => Err(error)?,
        }
    }

    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, ChipToolsError> {
        let reader = self
            .file(name)?
            .map(|file| XmlReader::new(BufReader::new(file)));
        Ok(reader)
    }

    fn read_bytes(&mut self, name: &str) -> Result<Option<Vec<u8>>, ChipToolsError> {
        match self.file(name)? {
            Some(mut file) => {
                let mut bytes = Vec::new();
                file.read_to_end(&mut bytes)?;
                Ok(Some(bytes))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn archive() -> ZipArchive<Cursor<Vec<u8>>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("xl/media/image1.png", SimpleFileOptions::default()).unwrap();
        writer.write_all(b"payload").unwrap();
        let cursor = writer.finish().unwrap();
        ZipArchive::new(cursor).unwrap()
    }

    #[test]
    fn file_lookup_is_case_insensitive() {
        let mut zip = archive();
        assert!(zip.file("XL\\Media\\Image1.PNG").unwrap().is_some());
        assert!(zip.file("xl/media/image2.png").unwrap().is_none());
    }

    #[test]
    fn read_bytes_returns_content() {
        let mut zip = archive();
        assert_eq!(zip.read_bytes("xl/media/image1.png").unwrap(), Some(b"payload".to_vec()));
        assert_eq!(zip.read_bytes("missing").unwrap(), None);
    }

    #[test]
    fn read_bytes_grows_with_content() {
        let large: Vec<u8> = (0..200_000u32).map(|value| (value % 251) as u8).collect();
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("xl/media/empty.png", SimpleFileOptions::default()).unwrap();
        writer.start_file("xl/media/large.png", SimpleFileOptions::default()).unwrap();
        writer.write_all(&large).unwrap();
        let mut zip = ZipArchive::new(writer.finish().unwrap()).unwrap();

        assert_eq!(zip.read_bytes("xl/media/empty.png").unwrap(), Some(Vec::new()));
        assert_eq!(zip.read_bytes("xl/media/large.png").unwrap(), Some(large));
    }
}
