//! Picture extraction: saves the images embedded in a workbook's sheets under the
//! file names listed in each sheet's image column.
pub mod criteria;

pub use criteria::ExtractCriteria;

use crate::error::ChipToolsError;
use crate::error::ResultMessage;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::Sheet;
use crate::spreadsheet::SpreadsheetError;
use crate::spreadsheet::XlsxWorkbook;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fs;
use std::io::Read;
use std::io::Seek;
use std::path::Component;
use std::path::Path;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

/// File name chosen for a picture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageName {
    /// Text of the image column cell in the picture's row
    Cell(String),
    /// `image{N}`, used when that cell is absent, empty or not a plain file name
    Fallback(String),
}

impl ImageName {
    pub fn as_str(&self) -> &str {
        match self {
            ImageName::Cell(name) | ImageName::Fallback(name) => name,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ImageName::Fallback(_))
    }
}

impl Display for ImageName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts reported after an extraction run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Sheets whose image column was found
    pub sheets_processed: usize,
    /// Selected sheets without an image column
    pub sheets_skipped: usize,
    pub images_written: usize,
    /// Pictures without a cell anchor or without an image part
    pub images_skipped: usize,
    /// Images saved under an `image{N}` name
    pub fallback_names: usize,
}

impl Display for ExtractSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} sheets processed, {} skipped, {} images written, {} skipped, {} fallback names",
            self.sheets_processed,
            self.sheets_skipped,
            self.images_written,
            self.images_skipped,
            self.fallback_names
        )
    }
}

/// Resolves the file name of a picture anchored at a zero-based row.
///
/// The name is read from the image column in the picture's own row, which in one-based
/// cell addressing is `anchor_row + 1`. When that cell is absent or empty, or holds a
/// path rather than a plain file name, the picture is named `image{sequence}`.
pub fn resolve_image_name(
    sheet: &Sheet,
    column: usize,
    anchor_row: usize,
    sequence: usize,
) -> ImageName {
    let reference = index_to_reference(anchor_row, column);
    match sheet.text(anchor_row, column) {
        Some(name) if is_file_name(&name) => {
            debug!(sheet = sheet.name(), cell = %reference, "Resolved image name '{name}'");
            ImageName::Cell(name)
        }
        Some(name) => {
            warn!(sheet = sheet.name(), cell = %reference, "'{name}' is not a file name");
            ImageName::Fallback(format!("image{sequence}"))
        }
        None => ImageName::Fallback(format!("image{sequence}")),
    }
}

/// A name made of exactly one normal path component, so it stays inside the output directory.
fn is_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Extracts the pictures of a workbook into `output_dir`.
///
/// # Arguments
/// * `workbook` - Path of the xlsx workbook
/// * `output_dir` - Directory receiving the images; created when missing
/// * `criteria` - Sheet selection and image column header
///
/// # Returns
/// Counts of processed sheets and written images
pub fn extract_images(
    workbook: &Path,
    output_dir: &Path,
    criteria: &ExtractCriteria,
) -> Result<ExtractSummary, ChipToolsError> {
    fs::create_dir_all(output_dir)
        .map_err(ChipToolsError::from)
        .with_prefix(&format!("Create directory '{}' failed", output_dir.display()))?;
    let mut workbook = XlsxWorkbook::open(workbook)?;
    extract_from_workbook(&mut workbook, output_dir, criteria)
}

/// Extracts the pictures of an opened workbook into an existing directory.
pub fn extract_from_workbook<RS: Read + Seek>(
    workbook: &mut XlsxWorkbook<RS>,
    output_dir: &Path,
    criteria: &ExtractCriteria,
) -> Result<ExtractSummary, ChipToolsError> {
    let mut summary = ExtractSummary::default();
    for index in criteria.select(workbook.sheet_names()) {
        let sheet = workbook.read_sheet(index)?;
        info!(sheet = sheet.name(), "Processing sheet");
        let column = match sheet.find_header_column(&criteria.header) {
            Some(column) => column,
            None => {
                error!(sheet = sheet.name(), "Couldn't find the '{}' column", criteria.header);
                summary.sheets_skipped += 1;
                continue;
            }
        };
        summary.sheets_processed += 1;
        extract_sheet(workbook, &sheet, column, output_dir, &mut summary)?;
    }
    info!("Extraction completed: {summary}");
    Ok(summary)
}

fn extract_sheet<RS: Read + Seek>(
    workbook: &mut XlsxWorkbook<RS>,
    sheet: &Sheet,
    column: usize,
    output_dir: &Path,
    summary: &mut ExtractSummary,
) -> Result<(), ChipToolsError> {
    let mut sequence = 1usize;
    for picture in workbook.read_pictures(sheet)? {
        let Some(marker) = picture.anchor.start() else {
            let anchor = &picture.anchor;
            warn!(sheet = sheet.name(), "Unknown anchor type for {picture}: {anchor:?}");
            summary.images_skipped += 1;
            continue;
        };
        let (row, col) = (marker.row, marker.col);
        debug!(sheet = sheet.name(), row, col, "Anchor of {picture}");

        let bytes = match picture.media.as_deref().map(|media| workbook.read_media(media)) {
            Some(Ok(bytes)) => bytes,
            None
            | Some(Err(ChipToolsError::SpreadsheetError(SpreadsheetError::FileError(_)))) => {
                warn!(sheet = sheet.name(), "Image data of {picture} not found");
                summary.images_skipped += 1;
                continue;
            }
            Some(Err(error)) => return Err(error),
        };

        let name = resolve_image_name(sheet, column, marker.row, sequence);
        if name.is_fallback() {
            info!(sheet = sheet.name(), "Could not find cell for {picture}, using '{name}'");
            summary.fallback_names += 1;
        }
        let path = output_dir.join(name.as_str());
        let context = format!(
            "Save {picture} of sheet '{}' as '{}' failed",
            sheet.name(),
            path.display()
        );
        save_image(&bytes, &path).with_prefix(&context)?;
        info!(sheet = sheet.name(), "Saved: {}", path.display());
        summary.images_written += 1;
        sequence += 1;
    }
    Ok(())
}

/// Decodes an image and encodes it again at `path`.
///
/// The output format follows the file extension; a name without extension keeps the
/// format of the source bytes.
fn save_image(bytes: &[u8], path: &Path) -> Result<(), ChipToolsError> {
    let decoded = image::load_from_memory(bytes)?;
    if path.extension().is_some() {
        decoded.save(path)?;
    } else {
        decoded.save_with_format(path, image::guess_format(bytes)?)?;
    }
    Ok(())
}
