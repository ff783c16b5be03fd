//! XML parsing utilities for the Office Open XML parts of a workbook
//! Provides XML reader wrapper and helper traits for attribute and text processing

use crate::error::ChipToolsError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::borrow::Cow;
use std::io::BufRead;
use std::str::FromStr;
use thiserror::Error;

/// Errors specific to XML parsing operations
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Parse entity '{0}' failed")]
    ParseEntityError(String),

    #[error("Parse attribute value '{0}' failed")]
    ParseAttributeValueError(String),

    #[error("Parse text '{0}' of element '{1}' failed")]
    ParseTextError(String, String),
}

/// XML reader wrapper configured for workbook part parsing
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    /// Creates a new XML reader; empty elements are expanded into start/end pairs
    pub(crate) fn new(buf_reader: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(buf_reader);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        config.expand_empty_elements = true;
        config.trim_text(false);

        let buffer = Vec::with_capacity(1024);
        XmlReader { reader, buffer }
    }

    /// Reads the next XML event from the reader
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, ChipToolsError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer) {
            Ok(Event::Eof) => Ok(None),
            Ok(event) => Ok(Some(event)),
            Err(error) => Err(ChipToolsError::XmlError(error)),
        }
    }

    /// Collects the text content up to the end tag with the given local name
    pub(crate) fn read_text(&mut self, local_name: &[u8]) -> Result<String, ChipToolsError> {
        let mut text = String::new();
        crate::match_xml_events!(self => {
            Event::End(event) if event.local_name().as_ref() == local_name => break,
            Event::Text(event) => text.push_str(&event.xml_content()?),
            Event::CData(event) => text.push_str(&event.xml_content()?),
            Event::GeneralRef(event) => text.push_bytes_ref(&event)?,
        });
        Ok(text)
    }

    /// Reads the text content up to the end tag and parses it to the specified type
    pub(crate) fn parse_text<T: FromStr>(
        &mut self,
        local_name: &[u8],
    ) -> Result<T, ChipToolsError> {
        let text = self.read_text(local_name)?;
        text.trim().parse().map_err(|_| {
            let element = String::from_utf8_lossy(local_name).into_owned();
            ChipToolsError::XmlHelperError(XmlError::ParseTextError(text.to_owned(), element))
        })
    }
}

/// Helper trait for XML attributes providing convenient value extraction and parsing
pub(crate) trait XmlAttributeHelper<'a> {
    /// Gets the unescaped attribute value as a string
    fn get_value(&self) -> Result<Cow<'a, str>, ChipToolsError>;

    /// Parses the attribute value to the specified type
    fn parse_value<T: FromStr>(&self) -> Result<T, ChipToolsError>;
}

impl<'a> XmlAttributeHelper<'a> for Attribute<'a> {
    fn get_value(&self) -> Result<Cow<'a, str>, ChipToolsError> {
        Ok(self.unescape_value()?)
    }

    fn parse_value<T: FromStr>(&self) -> Result<T, ChipToolsError> {
        self.get_value()?
            .parse()
            .map_err(|_| match std::str::from_utf8(&self.value) {
                Ok(value) => {
                    ChipToolsError::from(XmlError::ParseAttributeValueError(value.to_string()))
                }
                Err(error) => ChipToolsError::StringEncodingError(error),
            })
    }
}

/// Helper trait for XML nodes providing attribute access methods
pub(crate) trait XmlNodeHelper<'a> {
    /// Gets an attribute value by its qualified name
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, ChipToolsError>;

    /// Gets an attribute value by its local name, ignoring the namespace prefix
    fn get_local_attribute_value(
        &'a self,
        local_name: &str,
    ) -> Result<Option<Cow<'a, str>>, ChipToolsError>;

    /// Parses an attribute value to the specified type
    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, ChipToolsError>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, ChipToolsError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.get_value())
            .transpose()
    }

    fn get_local_attribute_value(
        &'a self,
        local_name: &str,
    ) -> Result<Option<Cow<'a, str>>, ChipToolsError> {
        for result in self.attributes() {
            let attribute = result?;
            if attribute.key.local_name().as_ref() == local_name.as_bytes() {
                return Ok(Some(attribute.get_value()?));
            }
        }
        Ok(None)
    }

    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, ChipToolsError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.parse_value())
            .transpose()
    }
}

/// Helper trait for building text content from XML events
pub(crate) trait XmlTextContextHelper {
    /// Appends text content from BytesRef event (handles entities and character references)
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), ChipToolsError>;
}

impl XmlTextContextHelper for String {
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), ChipToolsError> {
        let raw = bytes.xml_content()?;
        if let Some(number) = raw.strip_prefix('#') {
            let code = if let Some(hex) = number.strip_prefix('x') {
                u32::from_str_radix(hex, 16)?
            } else {
                number.parse::<u32>()?
            };
            if let Some(character) = std::char::from_u32(code) {
                self.push(character);
            }
        } else if let Some(entity) = resolve_xml_entity(&raw) {
            self.push_str(entity);
        } else {
            Err(XmlError::ParseEntityError(raw.to_string()))?;
        }

        Ok(())
    }
}

#[macro_export]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(result) = $reader.next()? {
            match result {
                Event::Eof => break,
                $($arms)*
                _ => (),
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(xml: &str) -> XmlReader<Cursor<Vec<u8>>> {
        XmlReader::new(Cursor::new(xml.as_bytes().to_vec()))
    }

    #[test]
    fn read_text_resolves_entities() -> Result<(), ChipToolsError> {
        let mut reader = reader("<t>Fire &amp; Ice &#65;</t>");
        let mut text = None;
        match_xml_events!(reader => {
            Event::Start(event) if event.local_name().as_ref() == b"t" => {
                text = Some(reader.read_text(b"t")?);
            }
        });
        assert_eq!(text.as_deref(), Some("Fire & Ice A"));
        Ok(())
    }

    #[test]
    fn parse_text_trims_numbers() -> Result<(), ChipToolsError> {
        let mut reader = reader("<xdr:row> 12 </xdr:row>");
        let mut row = None;
        match_xml_events!(reader => {
            Event::Start(event) if event.local_name().as_ref() == b"row" => {
                row = Some(reader.parse_text::<usize>(b"row")?);
            }
        });
        assert_eq!(row, Some(12));
        Ok(())
    }

    #[test]
    fn parse_text_reports_element() -> Result<(), ChipToolsError> {
        let mut reader = reader("<col>x</col>");
        let mut error = None;
        match_xml_events!(reader => {
            Event::Start(event) if event.local_name().as_ref() == b"col" => {
                error = reader.parse_text::<usize>(b"col").err();
            }
        });
        assert_eq!(error.unwrap().to_string(), "Parse text 'x' of element 'col' failed");
        Ok(())
    }

    #[test]
    fn local_attribute_ignores_prefix() -> Result<(), ChipToolsError> {
        let mut reader = reader(r#"<a:blip xmlns:r="urn:r" r:embed="rId3"/>"#);
        let mut embed = None;
        match_xml_events!(reader => {
            Event::Start(event) if event.local_name().as_ref() == b"blip" => {
                embed = event.get_local_attribute_value("embed")?.map(|value| value.into_owned());
            }
        });
        assert_eq!(embed.as_deref(), Some("rId3"));
        Ok(())
    }
}
