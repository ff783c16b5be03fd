//! Low-level container and markup helpers shared by the spreadsheet reader.
pub(crate) mod xml;
pub(crate) mod zip;
