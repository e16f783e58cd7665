use crate::error::{KtViewError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One extracted entity: a fixed-width row of cell values.
///
/// Missing source values are stored as empty strings, so every row has one
/// cell per header column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Record {
    cells: Vec<String>,
}

impl Record {
    pub fn new(cells: Vec<String>) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    pub fn cell(&self, column: usize) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }

    /// Value of the first column.
    pub fn id(&self) -> &str {
        self.cell(0).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for Record {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// Read-only table of extracted records.
///
/// Built once from a document and never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct Table {
    header: Vec<String>,
    rows: Vec<Record>,
    #[serde(skip)]
    source: Option<PathBuf>,
}

impl Table {
    pub fn new(header: Vec<String>, rows: Vec<Record>) -> Result<Self> {
        let expected = header.len();
        if let Some((row, record)) = rows.iter().enumerate().find(|(_, r)| r.len() != expected) {
            return Err(KtViewError::RowWidthMismatch {
                row,
                expected,
                found: record.len(),
            });
        }

        Ok(Self {
            header,
            rows,
            source: None,
        })
    }

    pub fn with_source<P: Into<PathBuf>>(mut self, source: P) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.header.len()
    }

    pub fn header_at(&self, column: usize) -> Result<&str> {
        self.header
            .get(column)
            .map(String::as_str)
            .ok_or(KtViewError::IndexOutOfRange {
                kind: "column",
                index: column,
                len: self.header.len(),
            })
    }

    pub fn cell_at(&self, row: usize, column: usize) -> Result<&str> {
        let record = self.row(row)?;
        record.cell(column).ok_or(KtViewError::IndexOutOfRange {
            kind: "column",
            index: column,
            len: self.header.len(),
        })
    }

    pub fn row(&self, row: usize) -> Result<&Record> {
        self.rows.get(row).ok_or(KtViewError::IndexOutOfRange {
            kind: "row",
            index: row,
            len: self.rows.len(),
        })
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    /// True when the document contained no matching entities.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Records for the given indices, skipping any that are out of range.
    pub fn project<'a>(&'a self, indices: &'a [usize]) -> impl Iterator<Item = &'a Record> + 'a {
        indices.iter().filter_map(move |&i| self.rows.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        Table::new(
            vec!["ID".to_string(), "Name".to_string()],
            vec![
                Record::from_iter(["1", "AOK Nord"]),
                Record::from_iter(["2", "LKK Bayern"]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_dimensions_and_access() {
        let table = sample_table();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.header_at(1).unwrap(), "Name");
        assert_eq!(table.cell_at(1, 1).unwrap(), "LKK Bayern");
        assert_eq!(table.row(0).unwrap().id(), "1");
        assert!(!table.is_empty());
    }

    #[test]
    fn test_out_of_range_access() {
        let table = sample_table();
        assert!(matches!(
            table.header_at(2),
            Err(KtViewError::IndexOutOfRange { kind: "column", index: 2, len: 2 })
        ));
        assert!(matches!(
            table.cell_at(5, 0),
            Err(KtViewError::IndexOutOfRange { kind: "row", index: 5, len: 2 })
        ));
        assert!(matches!(
            table.cell_at(0, 9),
            Err(KtViewError::IndexOutOfRange { kind: "column", .. })
        ));
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let result = Table::new(
            vec!["A".to_string(), "B".to_string()],
            vec![Record::from_iter(["1", "x"]), Record::from_iter(["2"])],
        );
        assert!(matches!(
            result,
            Err(KtViewError::RowWidthMismatch { row: 1, expected: 2, found: 1 })
        ));
    }

    #[test]
    fn test_header_only_table() {
        let table = Table::new(vec!["A".to_string()], Vec::new()).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.column_count(), 1);
        assert!(table.row(0).is_err());
    }

    #[test]
    fn test_projection_follows_indices() {
        let table = sample_table().with_source("data.xml");
        let ids: Vec<&str> = table.project(&[1, 0, 7]).map(Record::id).collect();
        assert_eq!(ids, vec!["2", "1"]);
        assert_eq!(table.source(), Some(Path::new("data.xml")));
    }
}
