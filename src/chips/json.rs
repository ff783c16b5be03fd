use crate::chips::ChipRecord;
use crate::error::ChipToolsError;
use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::ser::PrettyFormatter;
use serde_json::Serializer;
use std::io;
use std::io::Write;

/// Indentation of the generated JSON documents
const JSON_INDENT: &[u8] = b"    ";

/// Pretty formatter that writes every character outside printable ASCII as a `\uXXXX`
/// escape, using surrogate pairs above the basic plane.
pub struct AsciiFormatter<'a> {
    inner: PrettyFormatter<'a>,
}

impl<'a> AsciiFormatter<'a> {
    pub fn with_indent(indent: &'a [u8]) -> Self {
        Self {
            inner: PrettyFormatter::with_indent(indent),
        }
    }
}

impl Formatter for AsciiFormatter<'_> {
    fn begin_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_array(writer)
    }

    fn end_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object(writer)
    }

    fn end_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.inner.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_value(writer)
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        let mut start = 0;
        for (index, character) in fragment.char_indices() {
            if (' '..='~').contains(&character) {
                continue;
            }
            writer.write_all(&fragment.as_bytes()[start..index])?;
            let mut units = [0u16; 2];
            for unit in character.encode_utf16(&mut units).iter() {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = index + character.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }
}

/// Serializes records as a JSON array indented with four spaces, ASCII only.
pub fn to_json(records: &[ChipRecord]) -> Result<Vec<u8>, ChipToolsError> {
    let mut buffer = Vec::new();
    let formatter = AsciiFormatter::with_indent(JSON_INDENT);
    let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
    records.serialize(&mut serializer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: &str) -> String {
        let mut buffer = Vec::new();
        let formatter = AsciiFormatter::with_indent(b"  ");
        let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
        value.serialize(&mut serializer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn escapes_outside_ascii() {
        assert_eq!(encode("Canñon"), r#""Can\u00f1on""#);
        assert_eq!(encode("ロックマン"), r#""\u30ed\u30c3\u30af\u30de\u30f3""#);
        assert_eq!(encode("\u{1f525} Fire"), r#""\ud83d\udd25 Fire""#);
        assert_eq!(encode("del\u{7f}"), r#""del\u007f""#);
    }

    #[test]
    fn keeps_ascii_and_standard_escapes() {
        assert_eq!(encode("Cannon \"A\"\n"), r#""Cannon \"A\"\n""#);
        assert_eq!(encode("~ !"), r#""~ !""#);
    }

    #[test]
    fn pretty_layout() -> Result<(), ChipToolsError> {
        assert_eq!(String::from_utf8(to_json(&[]).unwrap()).unwrap(), "[]");
        let mut buffer = Vec::new();
        let formatter = AsciiFormatter::with_indent(JSON_INDENT);
        let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
        vec![Some('é'), None].serialize(&mut serializer)?;
        assert_eq!(String::from_utf8(buffer).unwrap(), "[\n    \"\\u00e9\",\n    null\n]");
        Ok(())
    }
}
