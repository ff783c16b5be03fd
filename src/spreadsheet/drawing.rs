//! Drawing part parsing: pictures and the anchors that pin them to worksheet cells.

use crate::error::ChipToolsError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::match_xml_events;
use quick_xml::events::Event;
use std::fmt::Display;
use std::io::BufRead;

const TAG_ONE_CELL_ANCHOR: &[u8] = b"oneCellAnchor";
const TAG_TWO_CELL_ANCHOR: &[u8] = b"twoCellAnchor";
const TAG_ABSOLUTE_ANCHOR: &[u8] = b"absoluteAnchor";
const TAG_FROM: &[u8] = b"from";
const TAG_TO: &[u8] = b"to";
const TAG_ROW: &[u8] = b"row";
const TAG_COL: &[u8] = b"col";
const TAG_PICTURE: &[u8] = b"pic";
const TAG_PROPERTIES: &[u8] = b"cNvPr";
const TAG_BLIP: &[u8] = b"blip";

/// A cell position inside a drawing, zero-based as stored in the XML.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Marker {
    pub row: usize,
    pub col: usize,
}

/// How a picture is pinned to its sheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Anchor {
    /// `oneCellAnchor`: a single cell position
    Point(Marker),
    /// `twoCellAnchor`: a cell range, starting at `from`
    Range { from: Marker, to: Marker },
    /// Any other anchor shape, e.g. `absoluteAnchor`, which carries no cell position
    Unsupported(String),
}

impl Anchor {
    /// The cell the picture starts at, if the anchor has one.
    pub fn start(&self) -> Option<Marker> {
        match self {
            Anchor::Point(marker) => Some(*marker),
            Anchor::Range { from, .. } => Some(*from),
            Anchor::Unsupported(_) => None,
        }
    }
}

/// An embedded picture of a sheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Picture {
    /// Position of the picture in its drawing part
    pub index: usize,
    /// Display name from the picture's non-visual properties
    pub name: Option<String>,
    pub anchor: Anchor,
    /// Relationship id of the embedded image
    pub(crate) embed: Option<String>,
    /// Path of the image part inside the container, once resolved
    pub media: Option<String>,
}

impl Display for Picture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "'{}'", name),
            None => write!(f, "picture #{}", self.index + 1),
        }
    }
}

#[derive(Copy, Clone, PartialEq)]
enum Side {
    From,
    To,
}

#[derive(Default)]
struct MarkerBuilder {
    row: Option<usize>,
    col: Option<usize>,
}

impl MarkerBuilder {
    fn build(&self) -> Option<Marker> {
        self.row.zip(self.col).map(|(row, col)| Marker { row, col })
    }
}

/// Builds the anchor for an anchor element from its collected markers.
fn build_anchor(kind: &str, from: &MarkerBuilder, to: &MarkerBuilder) -> Anchor {
    let kind_bytes = kind.as_bytes();
    if kind_bytes == TAG_ONE_CELL_ANCHOR {
        if let Some(from) = from.build() {
            return Anchor::Point(from);
        }
    } else if kind_bytes == TAG_TWO_CELL_ANCHOR {
        if let Some((from, to)) = from.build().zip(to.build()) {
            return Anchor::Range { from, to };
        }
    }
    Anchor::Unsupported(kind.to_owned())
}

fn is_anchor(local_name: &[u8]) -> bool {
    matches!(local_name, TAG_ONE_CELL_ANCHOR | TAG_TWO_CELL_ANCHOR | TAG_ABSOLUTE_ANCHOR)
}

/// Parses a drawing part (`xl/drawings/drawingN.xml`) and returns its pictures in document order.
/// Charts and shapes are ignored; media paths are left unresolved.
pub(crate) fn parse_drawing<R: BufRead>(
    reader: &mut XmlReader<R>,
) -> Result<Vec<Picture>, ChipToolsError> {
    let mut pictures = Vec::<Picture>::new();
    let mut pending = Vec::<(Option<String>, Option<String>)>::new();
    let mut anchor_kind = None::<String>;
    let mut side = None::<Side>;
    let mut from = MarkerBuilder::default();
    let mut to = MarkerBuilder::default();
    let mut in_picture = false;

    match_xml_events!(reader => {
        Event::Start(event) if is_anchor(event.local_name().as_ref()) => {
            anchor_kind = Some(String::from_utf8_lossy(event.local_name().as_ref()).into_owned());
            from = MarkerBuilder::default();
            to = MarkerBuilder::default();
            pending.clear();
        }
        Event::End(event) if is_anchor(event.local_name().as_ref()) => {
            if let Some(kind) = anchor_kind.take() {
                let anchor = build_anchor(&kind, &from, &to);
                for (name, embed) in pending.drain(..) {
                    pictures.push(Picture {
                        index: pictures.len(),
                        name,
                        anchor: anchor.clone(),
                        embed,
                        media: None,
                    });
                }
            }
        }
        Event::Start(event)
            if anchor_kind.is_some() && !in_picture && event.local_name().as_ref() == TAG_FROM =>
        {
            side = Some(Side::From);
        }
        Event::Start(event)
            if anchor_kind.is_some() && !in_picture && event.local_name().as_ref() == TAG_TO =>
        {
            side = Some(Side::To);
        }
        Event::End(event) if matches!(event.local_name().as_ref(), TAG_FROM | TAG_TO) => {
            side = None;
        }
        Event::Start(event) if side.is_some() && event.local_name().as_ref() == TAG_ROW => {
            let row = reader.parse_text(TAG_ROW)?;
            match side {
                Some(Side::From) => from.row = Some(row),
                _ => to.row = Some(row),
            }
        }
        Event::Start(event) if side.is_some() && event.local_name().as_ref() == TAG_COL => {
            let col = reader.parse_text(TAG_COL)?;
            match side {
                Some(Side::From) => from.col = Some(col),
                _ => to.col = Some(col),
            }
        }
        Event::Start(event)
            if anchor_kind.is_some() && event.local_name().as_ref() == TAG_PICTURE =>
        {
            in_picture = true;
            pending.push((None, None));
        }
        Event::End(event) if event.local_name().as_ref() == TAG_PICTURE => {
            in_picture = false;
        }
        Event::Start(event) if in_picture && event.local_name().as_ref() == TAG_PROPERTIES => {
            if let Some(last) = pending.last_mut() {
                last.0 = event.get_attribute_value("name")?.map(|name| name.into_owned());
            }
        }
        Event::Start(event) if in_picture && event.local_name().as_ref() == TAG_BLIP => {
            if let Some(last) = pending.last_mut() {
                last.1 = event.get_local_attribute_value("embed")?.map(|embed| embed.into_owned());
            }
        }
    });

    Ok(pictures)
}
