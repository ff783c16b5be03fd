use crate::error::ChipToolsError;
use glob::Pattern;

/// Number of sheets processed when no limit is given.
pub const DEFAULT_SHEET_LIMIT: usize = 3;

/// Header text of the column holding image file names.
pub const DEFAULT_HEADER: &str = "Image";

/// Criteria for selecting sheets and locating the image name column.
#[derive(Clone, Debug)]
pub struct ExtractCriteria {
    /// Sheet name patterns for filtering which sheets to process.
    pub sheet_name_patterns: Option<Vec<Pattern>>,

    /// Maximum number of accepted sheets to process.
    pub sheet_limit: Option<usize>,

    /// Exact text of the header cell naming the image column.
    pub header: String,
}

impl Default for ExtractCriteria {
    fn default() -> Self {
        Self {
            sheet_name_patterns: None,
            sheet_limit: Some(DEFAULT_SHEET_LIMIT),
            header: DEFAULT_HEADER.to_owned(),
        }
    }
}

impl ExtractCriteria {
    /// Restricts processing to sheets matching any of the glob patterns.
    /// An empty pattern list accepts every sheet.
    pub fn with_sheet_patterns<S: AsRef<str>>(
        mut self,
        patterns: &[S],
    ) -> Result<Self, ChipToolsError> {
        self.sheet_name_patterns = if patterns.is_empty() {
            None
        } else {
            Some(patterns.iter()
                .map(|pattern| Pattern::new(pattern.as_ref()))
                .collect::<Result<Vec<_>, _>>()?)
        };
        Ok(self)
    }

    /// Checks if a sheet name matches the criteria patterns.
    /// Returns true if no patterns are specified or if name matches any pattern.
    pub fn accept(&self, sheet_name: &str) -> bool {
        match &self.sheet_name_patterns {
            Some(patterns) => patterns.iter().any(|pattern| pattern.matches(sheet_name)),
            None => true,
        }
    }

    /// Positions of the sheets to process: accepted names in workbook order, up to the limit.
    pub fn select<'a>(&self, sheet_names: impl Iterator<Item = &'a str>) -> Vec<usize> {
        sheet_names
            .enumerate()
            .filter(|(_, name)| self.accept(name))
            .map(|(index, _)| index)
            .take(self.sheet_limit.unwrap_or(usize::MAX))
            .collect()
    }
}
