use crate::error::ChipToolsError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::drawing::parse_drawing;
use crate::spreadsheet::drawing::Picture;
use crate::spreadsheet::excel;
use crate::spreadsheet::excel::load_relationships;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

// XML tag names for parsing Excel XLSX format
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");   // Shared string table item
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");       // Phonetic text for Asian languages
const TAG_TEXT: QName = QName(b"t");                  // Text content within strings
const TAG_SHEET: QName = QName(b"sheet");             // Worksheet definition
const TAG_ROW: QName = QName(b"row");                 // Row in worksheet
const TAG_CELL: QName = QName(b"c");                  // Cell in worksheet
const TAG_INLINE_STRING: QName = QName(b"is");        // Inline string value
const TAG_VALUE: QName = QName(b"v");                 // Cell value content
const TAG_DRAWING: &[u8] = b"drawing";                // Drawing reference of a worksheet

const WORKBOOK_PART: &str = "xl/workbook.xml";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// An Excel XLSX workbook opened for reading cells and embedded pictures
pub struct XlsxWorkbook<RS: Read + Seek> {
    /// File name of the workbook
    pub(crate) name: String,
    /// ZIP archive containing the XLSX file contents
    zip: ZipArchive<RS>,
    /// List of worksheets with (name, zip_path) pairs in workbook order
    sheets: Vec<(String, String)>,
    /// Shared string table
    shared_strings: Vec<String>,
}

impl XlsxWorkbook<BufReader<File>> {
    /// Opens an XLSX workbook file and parses its structure
    ///
    /// # Arguments
    /// * `path` - Path to the XLSX file
    ///
    /// # Returns
    /// Result containing the initialized workbook or an error
    pub fn open(path: &Path) -> Result<Self, ChipToolsError> {
        let file = File::open(path)?;
        Self::from_reader(&path.display().to_string(), BufReader::new(file))
    }
}

impl<RS: Read + Seek> XlsxWorkbook<RS> {
    /// Reads a workbook from any seekable reader
    pub fn from_reader(name: &str, reader: RS) -> Result<Self, ChipToolsError> {
        let mut zip = excel::open(name, reader)?;
        let sheets = load_workbook(&mut zip)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmptyError(name.to_owned()))?
        }
        let shared_strings = load_shared_strings(&mut zip)?;
        Ok(XlsxWorkbook {
            name: name.to_owned(),
            zip,
            sheets,
            shared_strings,
        })
    }

    /// Returns the sheet names in workbook order
    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(|(name, _)| name.as_str())
    }

    /// Reads the cells of a worksheet and the id of its drawing
    ///
    /// # Arguments
    /// * `index` - Position of the sheet in workbook order
    ///
    /// # Returns
    /// The sheet with all non-empty cells, shared strings resolved
    pub fn read_sheet(&mut self, index: usize) -> Result<Sheet, ChipToolsError> {
        let (sheet_name, zip_path) = self.sheets.get(index)
            .ok_or_else(|| SpreadsheetError::SheetNotFoundError(self.name.to_owned(), index))?;
        let mut sheet = Sheet::new(&self.name, sheet_name, zip_path);
        let mut reader = self.zip.xml_reader(zip_path)?
            .ok_or_else(|| SpreadsheetError::FileError(zip_path.to_owned()))?;

        let mut row_count = 0usize;
        let mut col_count = 0usize;
        let mut row = 0usize;
        let mut col = 0usize;
        let mut kind = CellType::default();
        let mut value = String::new();
        match_xml_events!(reader => {
            Event::End(event) if event.name() == TAG_ROW => {
                row_count += 1;
                col_count = 0;
            }
            Event::Start(event) if event.name() == TAG_ROW => {
                if let Some(number) = event.parse_attribute_value::<usize>("r")? {
                    row_count = number.saturating_sub(1);
                }
            }
            Event::Start(event) if event.name() == TAG_CELL => {
                (row, col) = event.get_attribute_value("r")?
                    .and_then(|reference| reference_to_index(&reference))
                    .unwrap_or((row_count, col_count));
                col_count = col + 1;
                kind = CellType::from_type_attribute(event.get_attribute_value("t")?.as_deref());
                value.clear();
            }
            Event::Start(event) if kind != CellType::Empty && event.name() == TAG_INLINE_STRING => {
                value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
            }
            Event::Start(event) if kind != CellType::Empty && event.name() == TAG_VALUE => {
                value = read_string_value(&mut reader, TAG_VALUE, true)?;
            }
            Event::Start(event) if event.local_name().as_ref() == TAG_DRAWING => {
                sheet.drawing_id = event.get_local_attribute_value("id")?.map(|id| id.into_owned());
            }
            Event::End(event) if event.name() == TAG_CELL => {
                if kind != CellType::Empty && !value.is_empty() {
                    if kind == CellType::SharedString {
                        let index = value.parse::<usize>()?;
                        let missing = || {
                            SpreadsheetError::SharedStringError(sheet.name.to_owned(), index)
                        };
                        value = self.shared_strings.get(index).ok_or_else(missing)?.to_owned();
                    }
                    sheet.push(Cell {
                        row,
                        col,
                        kind,
                        value: std::mem::take(&mut value),
                    });
                }
                kind = CellType::Empty;
            }
        });

        let cells = sheet.cells.len();
        debug!(workbook = %sheet.file_name, sheet = %sheet.name, cells, "Read worksheet");
        Ok(sheet)
    }

    /// Lists the pictures of the drawing attached to a sheet, with media paths resolved
    ///
    /// # Arguments
    /// * `sheet` - Sheet previously returned by `read_sheet`
    ///
    /// # Returns
    /// Pictures in drawing order; empty if the sheet has no drawing
    pub fn read_pictures(&mut self, sheet: &Sheet) -> Result<Vec<Picture>, ChipToolsError> {
        let drawing_id = match &sheet.drawing_id {
            Some(drawing_id) => drawing_id,
            None => return Ok(Vec::new()),
        };
        let drawings = load_relationships(&mut self.zip, &sheet.path, "drawing")?;
        let drawing_path = match drawings.get(drawing_id) {
            Some(drawing_path) => drawing_path,
            None => return Ok(Vec::new()),
        };

        let mut pictures = match self.zip.xml_reader(drawing_path)? {
            Some(mut reader) => parse_drawing(&mut reader)?,
            None => return Err(SpreadsheetError::FileError(drawing_path.to_owned()).into()),
        };
        let images = load_relationships(&mut self.zip, drawing_path, "image")?;
        for picture in &mut pictures {
            picture.media = picture.embed.as_ref().and_then(|embed| images.get(embed)).cloned();
        }
        Ok(pictures)
    }

    /// Reads the raw bytes of a media part
    pub fn read_media(&mut self, path: &str) -> Result<Vec<u8>, ChipToolsError> {
        self.zip.read_bytes(path)?
            .ok_or_else(|| SpreadsheetError::FileError(path.to_owned()).into())
    }
}

/// Loads worksheet names and their part paths from the workbook part
///
/// # Arguments
/// * `zip` - ZIP archive containing the XLSX file
///
/// # Returns
/// Worksheets as (name, zip_path) pairs in workbook order
fn load_workbook<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
) -> Result<Vec<(String, String)>, ChipToolsError> {
    let relationships = load_relationships(zip, WORKBOOK_PART, "worksheet")?;
    let mut reader = zip.xml_reader(WORKBOOK_PART)?
        .ok_or_else(|| SpreadsheetError::FileError(WORKBOOK_PART.to_string()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let name = event.get_attribute_value("name")?;
            let id = event.get_local_attribute_value("id")?;
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(&*id) {
                    sheets.push((name.to_string(), path.to_owned()));
                }
            }
        }
    });
    Ok(sheets)
}

/// Loads the shared string table; workbooks without one get an empty table
fn load_shared_strings<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
) -> Result<Vec<String>, ChipToolsError> {
    let mut shared_strings = Vec::<String>::new();
    let mut reader = match zip.xml_reader(SHARED_STRINGS_PART)? {
        Some(reader) => reader,
        None => return Ok(shared_strings),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
            let string = read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?;
            shared_strings.push(string);
        }
    });
    Ok(shared_strings)
}

/// Reads string value from XML content, handling text and CDATA sections
///
/// Extracts string content from XML elements, skipping phonetic text annotations.
///
/// # Arguments
/// * `reader` - XML reader positioned at the start of the string content
/// * `end_tag` - XML tag that marks the end of the string content
/// * `is_text_content` - Whether to treat the content as text by default
///
/// # Returns
/// Extracted string value
fn read_string_value<R: BufRead>(
    reader: &mut XmlReader<R>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, ChipToolsError> {
    use crate::helpers::xml::XmlTextContextHelper;

    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}

/// Builds small xlsx containers in memory for tests.
#[cfg(test)]
pub(crate) mod fixture {
    use image::ImageFormat;
    use image::Rgba;
    use image::RgbaImage;
    use std::io::Cursor;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    /// A picture to embed: (anchor XML, media file name)
    pub(crate) struct FixturePicture {
        pub(crate) anchor: String,
        pub(crate) media: String,
    }

    /// A worksheet: name, rows of inline string cells, pictures
    pub(crate) struct FixtureSheet {
        pub(crate) name: String,
        pub(crate) rows: Vec<Vec<String>>,
        pub(crate) pictures: Vec<FixturePicture>,
    }

    impl FixtureSheet {
        pub(crate) fn new(name: &str, rows: &[&[&str]]) -> Self {
            FixtureSheet {
                name: name.to_owned(),
                rows: rows.iter()
                    .map(|row| row.iter().map(|value| value.to_string()).collect())
                    .collect(),
                pictures: Vec::new(),
            }
        }

        /// Adds a twoCellAnchor picture starting at zero-based (row, col)
        pub(crate) fn two_cell(mut self, row: usize, col: usize, media: &str) -> Self {
            let anchor = format!(
                "<xdr:twoCellAnchor>{}{}",
                marker("from", row, col),
                marker("to", row + 1, col + 1)
            );
            self.pictures.push(FixturePicture { anchor, media: media.to_owned() });
            self
        }

        /// Adds a oneCellAnchor picture at zero-based (row, col)
        pub(crate) fn one_cell(mut self, row: usize, col: usize, media: &str) -> Self {
            let anchor = format!(
                "<xdr:oneCellAnchor>{}<xdr:ext cx=\"9525\" cy=\"9525\"/>",
                marker("from", row, col)
            );
            self.pictures.push(FixturePicture { anchor, media: media.to_owned() });
            self
        }

        /// Adds an absoluteAnchor picture, which has no cell position
        pub(crate) fn absolute(mut self, media: &str) -> Self {
            let anchor = "<xdr:absoluteAnchor><xdr:pos x=\"0\" y=\"0\"/>\
                <xdr:ext cx=\"9525\" cy=\"9525\"/>"
                .to_owned();
            self.pictures.push(FixturePicture { anchor, media: media.to_owned() });
            self
        }
    }

    fn marker(tag: &str, row: usize, col: usize) -> String {
        format!(
            "<xdr:{tag}><xdr:col>{col}</xdr:col><xdr:colOff>0</xdr:colOff>\
             <xdr:row>{row}</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:{tag}>"
        )
    }

    /// Encodes a small solid PNG
    pub(crate) fn png(color: [u8; 4]) -> Vec<u8> {
        let image = RgbaImage::from_pixel(2, 2, Rgba(color));
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    const DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
    const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
    const DRAWING_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing";
    const DRAWINGML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
    const RELATIONSHIPS_NS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
    const PACKAGE_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

    fn relationships() -> String {
        format!("{DECLARATION}<Relationships xmlns=\"{PACKAGE_NS}\">")
    }

    fn relationship(id: &str, kind: &str, target: &str) -> String {
        format!(
            "<Relationship Id=\"{id}\" Type=\"{RELATIONSHIPS_NS}/{kind}\" Target=\"{target}\"/>"
        )
    }

    fn escape(value: &str) -> String {
        value.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
    }

    fn sheet_xml(sheet: &FixtureSheet) -> String {
        let mut xml = format!(
            "{DECLARATION}<worksheet xmlns=\"{MAIN_NS}\" xmlns:r=\"{RELATIONSHIPS_NS}\"><sheetData>"
        );
        for (row, values) in sheet.rows.iter().enumerate() {
            xml.push_str(&format!("<row r=\"{}\">", row + 1));
            for (col, value) in values.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                let reference = crate::spreadsheet::reference::index_to_reference(row, col);
                let value = escape(value);
                xml.push_str(&format!(
                    "<c r=\"{reference}\" t=\"inlineStr\"><is><t>{value}</t></is></c>"
                ));
            }
            xml.push_str("</row>");
        }
        xml.push_str("</sheetData>");
        if !sheet.pictures.is_empty() {
            xml.push_str("<drawing r:id=\"rId1\"/>");
        }
        xml.push_str("</worksheet>");
        xml
    }

    fn drawing_xml(sheet: &FixtureSheet) -> String {
        let mut xml = format!(
            "{DECLARATION}<xdr:wsDr xmlns:xdr=\"{DRAWING_NS}\" xmlns:a=\"{DRAWINGML_NS}\" \
             xmlns:r=\"{RELATIONSHIPS_NS}\">"
        );
        for (index, picture) in sheet.pictures.iter().enumerate() {
            let closing = if picture.anchor.starts_with("<xdr:twoCellAnchor") {
                "</xdr:twoCellAnchor>"
            } else if picture.anchor.starts_with("<xdr:oneCellAnchor") {
                "</xdr:oneCellAnchor>"
            } else {
                "</xdr:absoluteAnchor>"
            };
            xml.push_str(&picture.anchor);
            xml.push_str(&format!(
                "<xdr:pic><xdr:nvPicPr><xdr:cNvPr id=\"{}\" name=\"Picture {}\"/><xdr:cNvPicPr/>\
                 </xdr:nvPicPr><xdr:blipFill><a:blip r:embed=\"rId{}\"/></xdr:blipFill>\
                 <xdr:spPr/></xdr:pic><xdr:clientData/>",
                index + 2,
                index + 1,
                index + 1
            ));
            xml.push_str(closing);
        }
        xml.push_str("</xdr:wsDr>");
        xml
    }

    /// Builds an xlsx container; `media` holds (file name, bytes) pairs stored under xl/media/
    pub(crate) fn workbook(sheets: &[FixtureSheet], media: &[(&str, Vec<u8>)]) -> Vec<u8> {
        let options = SimpleFileOptions::default();
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        let mut workbook = format!(
            "{DECLARATION}<workbook xmlns=\"{MAIN_NS}\" xmlns:r=\"{RELATIONSHIPS_NS}\"><sheets>"
        );
        let mut workbook_rels = relationships();
        for (index, sheet) in sheets.iter().enumerate() {
            let number = index + 1;
            let name = escape(&sheet.name);
            workbook.push_str(&format!(
                "<sheet name=\"{name}\" sheetId=\"{number}\" r:id=\"rId{number}\"/>"
            ));
            workbook_rels.push_str(&relationship(
                &format!("rId{number}"),
                "worksheet",
                &format!("worksheets/sheet{number}.xml"),
            ));

            writer.start_file(format!("xl/worksheets/sheet{number}.xml"), options).unwrap();
            writer.write_all(sheet_xml(sheet).as_bytes()).unwrap();

            if sheet.pictures.is_empty() {
                continue;
            }
            let mut sheet_rels = relationships();
            let target = format!("../drawings/drawing{number}.xml");
            sheet_rels.push_str(&relationship("rId1", "drawing", &target));
            sheet_rels.push_str("</Relationships>");
            let part = format!("xl/worksheets/_rels/sheet{number}.xml.rels");
            writer.start_file(part, options).unwrap();
            writer.write_all(sheet_rels.as_bytes()).unwrap();

            writer.start_file(format!("xl/drawings/drawing{number}.xml"), options).unwrap();
            writer.write_all(drawing_xml(sheet).as_bytes()).unwrap();

            let mut drawing_rels = relationships();
            for (picture_index, picture) in sheet.pictures.iter().enumerate() {
                drawing_rels.push_str(&relationship(
                    &format!("rId{}", picture_index + 1),
                    "image",
                    &format!("../media/{}", picture.media),
                ));
            }
            drawing_rels.push_str("</Relationships>");
            let part = format!("xl/drawings/_rels/drawing{number}.xml.rels");
            writer.start_file(part, options).unwrap();
            writer.write_all(drawing_rels.as_bytes()).unwrap();
        }
        workbook.push_str("</sheets></workbook>");
        workbook_rels.push_str("</Relationships>");

        writer.start_file("xl/workbook.xml", options).unwrap();
        writer.write_all(workbook.as_bytes()).unwrap();
        writer.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
        writer.write_all(workbook_rels.as_bytes()).unwrap();
        for (name, bytes) in media {
            writer.start_file(format!("xl/media/{name}"), options).unwrap();
            writer.write_all(bytes).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }
}
