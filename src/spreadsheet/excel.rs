//! Microsoft Office Excel container helpers
use crate::error::ChipToolsError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use zip::ZipArchive;

/// XML tag name for relationship elements in Excel files
const TAG_RELATIONSHIP: &[u8] = b"Relationship";

/// Signature of a Compound File Binary container (legacy .xls or an encrypted package)
const CFB_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Opens the zip container of an xlsx workbook.
///
/// # Arguments
/// * `file_name` - Name of the workbook, used in error messages
/// * `reader` - Reader positioned anywhere in the workbook bytes
///
/// # Returns
/// Zip archive handle over the container
pub(super) fn open<RS: Read + Seek>(
    file_name: &str,
    mut reader: RS,
) -> Result<ZipArchive<RS>, ChipToolsError> {
    // Password protected workbooks are stored as an EncryptedPackage inside a CFB file
    if is_compound_file(&mut reader)? {
        Err(SpreadsheetError::SpreadsheetPasswordProtectedError(file_name.to_owned()))?;
    }
    Ok(ZipArchive::new(reader)?)
}

/// Loads the relationships of a part from its `_rels/<part>.rels` file
///
/// # Arguments
/// * `zip` - Zip archive handle
/// * `part` - Path of the part whose relationships are loaded
/// * `kind` - Last segment of the relationship type to keep (e.g. "worksheet", "drawing", "image")
///
/// # Returns
/// Mapping of relationship IDs to part paths inside the archive, empty if the part has none
pub(super) fn load_relationships<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    part: &str,
    kind: &str,
) -> Result<HashMap<String, String>, ChipToolsError> {
    let mut relationships: HashMap<String, String> = HashMap::new();
    let mut reader = match zip.xml_reader(&relationships_path(part))? {
        Some(reader) => reader,
        None => return Ok(relationships),
    };
    let suffix = format!("/{kind}");
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let relationship_type = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            let external = event.get_attribute_value("TargetMode")?
                .map(|mode| mode.eq_ignore_ascii_case("External"))
                .unwrap_or(false);
            if !external && relationship_type.map(|it| it.ends_with(&suffix)).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), resolve_target(part, &target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Returns the path of the relationships file of a part:
/// `xl/foo/bar.xml` → `xl/foo/_rels/bar.xml.rels`
pub(crate) fn relationships_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((directory, file)) => format!("{directory}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolves a relationship target against the directory of the part that declares it
///
/// # Arguments
/// * `part` - Path of the source part (e.g. "xl/drawings/drawing1.xml")
/// * `target` - Target from the relationship (e.g. "../media/image1.png" or "/xl/media/image1.png")
///
/// # Returns
/// Normalized path suitable for accessing files within the zip archive
pub(crate) fn resolve_target(part: &str, target: &str) -> String {
    let target = target.replace('\\', "/");
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_owned();
    }

    let mut segments: Vec<&str> = match part.rsplit_once('/') {
        Some((directory, _)) => directory.split('/').collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => (),
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }
    segments.join("/")
}

/// Checks whether the reader holds a Compound File Binary container instead of a zip
///
/// # Arguments
/// * `reader` - File reader; rewound to the beginning afterwards
///
/// # Returns
/// `true` if the data starts with the CFB signature
fn is_compound_file<RS: Read + Seek>(reader: &mut RS) -> Result<bool, ChipToolsError> {
    let mut signature = [0u8; 8];
    reader.seek(SeekFrom::Start(0))?;
    let matches = match reader.read_exact(&mut signature) {
        Ok(()) => signature == CFB_SIGNATURE,
        Err(error) if error.kind() == std::io::ErrorKind::UnexpectedEof => false,
        Err(error) => Err(error)?,
    };
    reader.seek(SeekFrom::Start(0))?;
    Ok(matches)
}
