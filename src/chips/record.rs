use crate::chips::ChipError;
use csv::StringRecord;
use serde::Deserialize;
use serde::Serialize;

pub(crate) const COLUMN_SID: &str = "SId";
pub(crate) const COLUMN_MID: &str = "MId";
pub(crate) const COLUMN_NAME: &str = "Name";
pub(crate) const COLUMN_DESCRIPTION: &str = "Description";
pub(crate) const COLUMN_DAMAGE: &str = "Damage";
pub(crate) const COLUMN_CODE: &str = "Code";
pub(crate) const COLUMN_ELEMENT: &str = "Element";
pub(crate) const COLUMN_IMAGE: &str = "Image";
pub(crate) const COLUMN_MB: &str = "MB";

/// One row of a chip table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChipRow {
    /// Standard chip number; tables without the column leave it empty
    pub sid: Option<String>,
    /// Mega chip number; tables without the column leave it empty
    pub mid: Option<String>,
    pub name: String,
    pub description: String,
    pub damage: String,
    pub code: String,
    pub element: String,
    pub image: String,
    pub mb: String,
}

/// Fields that identify a chip regardless of its code.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChipKey {
    pub sid: Option<String>,
    pub mid: Option<String>,
    pub name: String,
    pub description: String,
    pub element: String,
    pub mb: String,
}

/// A deduplicated chip as written to the JSON document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipRecord {
    #[serde(rename = "SId")]
    pub sid: Option<String>,
    #[serde(rename = "MId")]
    pub mid: Option<String>,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Damage")]
    pub damage: String,
    /// First character of every code the chip appears with; `None` for rows without a code
    #[serde(rename = "Code")]
    pub code: Vec<Option<char>>,
    #[serde(rename = "Element")]
    pub element: String,
    #[serde(rename = "Image")]
    pub image: String,
    #[serde(rename = "MB")]
    pub mb: String,
}

impl ChipRow {
    /// The code letter this row contributes: the first character of `Code`, or `None` when empty.
    pub fn code_letter(&self) -> Option<char> {
        self.code.chars().next()
    }

    pub fn key(&self) -> ChipKey {
        ChipKey {
            sid: self.sid.clone(),
            mid: self.mid.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            element: self.element.clone(),
            mb: self.mb.clone(),
        }
    }

    /// Starts a record from this row, with its code letter as the only code.
    pub fn into_record(self) -> ChipRecord {
        let code = vec![self.code_letter()];
        ChipRecord {
            sid: self.sid,
            mid: self.mid,
            name: self.name,
            description: self.description,
            damage: self.damage,
            code,
            element: self.element,
            image: self.image,
            mb: self.mb,
        }
    }
}

/// Positions of the known columns in a table's header row.
#[derive(Clone, Debug, Default)]
pub(crate) struct Columns {
    sid: Option<usize>,
    mid: Option<usize>,
    name: Option<usize>,
    description: Option<usize>,
    damage: Option<usize>,
    code: Option<usize>,
    element: Option<usize>,
    image: Option<usize>,
    mb: Option<usize>,
}

impl Columns {
    /// Indexes the header row; when a header repeats, the last occurrence wins.
    pub(crate) fn new(headers: &StringRecord) -> Self {
        let mut columns = Columns::default();
        for (index, header) in headers.iter().enumerate() {
            let slot = match header {
                COLUMN_SID => &mut columns.sid,
                COLUMN_MID => &mut columns.mid,
                COLUMN_NAME => &mut columns.name,
                COLUMN_DESCRIPTION => &mut columns.description,
                COLUMN_DAMAGE => &mut columns.damage,
                COLUMN_CODE => &mut columns.code,
                COLUMN_ELEMENT => &mut columns.element,
                COLUMN_IMAGE => &mut columns.image,
                COLUMN_MB => &mut columns.mb,
                _ => continue,
            };
            *slot = Some(index);
        }
        columns
    }

    /// Builds a typed row. `SId` and `MId` are optional; every other column is required.
    ///
    /// # Arguments
    /// * `file` - Table name used in error messages
    /// * `line` - Line of the record in the table
    /// * `record` - The parsed record
    pub(crate) fn read(
        &self,
        file: &str,
        line: u64,
        record: &StringRecord,
    ) -> Result<ChipRow, ChipError> {
        let optional = |position: Option<usize>| -> Option<String> {
            position.and_then(|index| record.get(index)).map(str::to_owned)
        };
        let required = |position: Option<usize>, field: &'static str| -> Result<String, ChipError> {
            optional(position).ok_or_else(|| ChipError::MissingField {
                file: file.to_owned(),
                line,
                field,
            })
        };

        Ok(ChipRow {
            sid: optional(self.sid),
            mid: optional(self.mid),
            code: required(self.code, COLUMN_CODE)?,
            name: required(self.name, COLUMN_NAME)?,
            description: required(self.description, COLUMN_DESCRIPTION)?,
            element: required(self.element, COLUMN_ELEMENT)?,
            mb: required(self.mb, COLUMN_MB)?,
            damage: required(self.damage, COLUMN_DAMAGE)?,
            image: required(self.image, COLUMN_IMAGE)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(code: &str) -> ChipRow {
        ChipRow {
            sid: Some("1".to_owned()),
            mid: None,
            name: "Cannon".to_owned(),
            description: "Cannon to attack 1 enemy".to_owned(),
            damage: "40".to_owned(),
            code: code.to_owned(),
            element: "Null".to_owned(),
            image: "Cannon.png".to_owned(),
            mb: "6".to_owned(),
        }
    }

    #[test]
    fn code_letter_truncates() {
        assert_eq!(row("B2").code_letter(), Some('B'));
        assert_eq!(row("*").code_letter(), Some('*'));
        assert_eq!(row("").code_letter(), None);
    }

    #[test]
    fn key_ignores_code_damage_and_image() {
        let mut other = row("C");
        other.damage = "60".to_owned();
        other.image = "Other.png".to_owned();
        assert_eq!(row("A").key(), other.key());

        let mut other = row("A");
        other.mid = Some("".to_owned());
        assert_ne!(row("A").key(), other.key());
    }

    #[test]
    fn into_record_starts_code_list() {
        let record = row("A1").into_record();
        assert_eq!(record.code, vec![Some('A')]);
        assert_eq!(record.name, "Cannon");
        assert_eq!(row("").into_record().code, vec![None]);
    }

    #[test]
    fn read_with_optional_columns() {
        let headers = StringRecord::from(vec![
            "MId", "Name", "Description", "Damage", "Code", "Element", "Image", "MB", "Extra",
        ]);
        let record = StringRecord::from(vec![
            "12", "Bass", "Fires a shot", "200", "X", "Null", "Bass.png", "99", "?",
        ]);
        let row = Columns::new(&headers).read("Giga.csv", 2, &record).unwrap();
        assert_eq!(row.sid, None);
        assert_eq!(row.mid.as_deref(), Some("12"));
        assert_eq!(row.name, "Bass");
        assert_eq!(row.mb, "99");
    }

    #[test]
    fn read_missing_required_column() {
        let headers = StringRecord::from(vec![
            "SId", "Description", "Damage", "Code", "Element", "Image", "MB",
        ]);
        let record = StringRecord::from(vec!["1", "d", "40", "A", "Fire", "x.png", "5"]);
        let error = Columns::new(&headers).read("Standard.csv", 2, &record).unwrap_err();
        assert_eq!(error.to_string(), "Missing field 'Name' at line 2 of 'Standard.csv'");
    }

    #[test]
    fn serialized_key_order() {
        let json = serde_json::to_string(&row("").into_record()).unwrap();
        let expected = concat!(
            r#"{"SId":"1","MId":null,"Name":"Cannon","Description":"Cannon to attack 1 enemy","#,
            r#""Damage":"40","Code":[null],"Element":"Null","Image":"Cannon.png","MB":"6"}"#,
        );
        assert_eq!(json, expected);
    }
}
