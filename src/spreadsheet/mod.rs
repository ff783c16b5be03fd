//! # Spreadsheet Reading Module
//!
//! A minimal reader for Excel 2007+ workbooks (.xlsx). It covers what the image
//! extractor needs: sheet order, cell text (inline and shared strings) and the
//! pictures of each sheet's drawing together with their cell anchors.
use thiserror::Error;

pub(crate) mod cell;
pub mod drawing;
pub(crate) mod excel;
pub(crate) mod reference;
pub mod sheet;
pub mod xlsx;

pub use drawing::Anchor;
pub use drawing::Marker;
pub use drawing::Picture;
pub use sheet::Sheet;
pub use xlsx::XlsxWorkbook;

/// Errors raised while reading a workbook container.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Missing part '{0}' in spreadsheet")]
    FileError(String),

    #[error("Spreadsheet '{0}' is password protected or not an xlsx container")]
    SpreadsheetPasswordProtectedError(String),

    #[error("Spreadsheet '{0}' contains no worksheets")]
    SpreadsheetEmptyError(String),

    #[error("Sheet #{1} not found in '{0}'")]
    SheetNotFoundError(String, usize),

    #[error("Shared string #{1} referenced by sheet '{0}' does not exist")]
    SharedStringError(String, usize),
}
