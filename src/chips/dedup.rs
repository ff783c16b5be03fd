use crate::chips::record::ChipKey;
use crate::chips::record::ChipRecord;
use crate::chips::record::ChipRow;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Merges chip rows that share a [`ChipKey`], collecting their code letters.
///
/// Records keep the order in which their key was first seen. The first row of a group
/// provides `Damage` and `Image`; later rows of the same group only contribute codes.
#[derive(Debug, Default)]
pub struct ChipDeduplicator {
    positions: HashMap<ChipKey, usize>,
    records: Vec<ChipRecord>,
    rows: usize,
}

impl ChipDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a row, appending its code letter to an existing record unless already present.
    pub fn push(&mut self, row: ChipRow) {
        self.rows += 1;
        match self.positions.entry(row.key()) {
            Entry::Occupied(entry) => {
                let letter = row.code_letter();
                let codes = &mut self.records[*entry.get()].code;
                if !codes.contains(&letter) {
                    codes.push(letter);
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(self.records.len());
                self.records.push(row.into_record());
            }
        }
    }

    /// Number of rows pushed so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn records(&self) -> &[ChipRecord] {
        &self.records
    }

    pub fn finish(self) -> Vec<ChipRecord> {
        self.records
    }
}

impl Extend<ChipRow> for ChipDeduplicator {
    fn extend<I: IntoIterator<Item = ChipRow>>(&mut self, rows: I) {
        for row in rows {
            self.push(row);
        }
    }
}

/// Deduplicates rows in one pass; see [`ChipDeduplicator`].
pub fn deduplicate<I: IntoIterator<Item = ChipRow>>(rows: I) -> Vec<ChipRecord> {
    let mut deduplicator = ChipDeduplicator::new();
    deduplicator.extend(rows);
    deduplicator.finish()
}
