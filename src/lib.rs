//! # Chip Tools
//!
//! Offline converters for a battle chip catalog.
//!
//! ## Features
//!
//! - **Table deduplication**: reads chip tables (`Giga.csv`, `Mega.csv`, `Standard.csv`),
//!   merges rows describing the same chip and writes one JSON document per table with
//!   the chip's code letters collected in a list
//! - **Image extraction**: reads the pictures embedded in `chips.xlsx` and saves each one
//!   under the file name found in the sheet's `Image` column
//! - **Pure Rust xlsx reading**: workbook, shared strings, worksheets and drawings are
//!   parsed straight from the zip container
//!
//! ## Binaries
//!
//! - `chips-to-json`: runs [`chips::convert_all`] over the chip tables
//! - `extract-images`: runs [`images::extract_images`] over the workbook
pub mod chips;
pub mod error;
mod helpers;
pub mod images;
pub mod logging;
pub mod spreadsheet;

pub use error::ChipToolsError;
