//! Entry points used by a presentation shell.
//!
//! A [`ViewerSession`] owns the loaded table and the current filter. The shell
//! loads once, forwards every query change to [`ViewerSession::set_query`] and
//! calls [`ViewerSession::trigger_export`] on demand.

use crate::config::ExtractionConfig;
use crate::error::Result;
use crate::exporter::{DelimitedExporter, Delimiter, ExportJob, ExportSummary, LineEnding};
use crate::extractor::AttributeExtractor;
use crate::table::{FilterState, Matcher, Record, Table};
use std::path::Path;

pub struct ViewerSession {
    table: Table,
    filter: FilterState,
    line_ending: LineEnding,
}

impl ViewerSession {
    pub fn new(table: Table) -> Self {
        let filter = FilterState::new(&table);
        Self {
            table,
            filter,
            line_ending: LineEnding::Platform,
        }
    }

    pub fn load_table<P: AsRef<Path>>(path: P, rules: ExtractionConfig) -> Result<Self> {
        let table = AttributeExtractor::new(rules).extract_file(path)?;
        Ok(Self::new(table))
    }

    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    pub fn set_query(&mut self, text: &str) -> &[usize] {
        self.filter.set_query(&self.table, text)
    }

    pub fn query(&self) -> &str {
        self.filter.query()
    }

    pub fn matcher(&self) -> &Matcher {
        self.filter.matcher()
    }

    pub fn visible_indices(&self) -> &[usize] {
        self.filter.visible()
    }

    pub fn visible_rows(&self) -> impl Iterator<Item = &Record> + '_ {
        self.table.project(self.filter.visible())
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Writes the currently visible rows to `destination`.
    ///
    /// `delimiter` is raw user input; empty input selects `;`. A failed
    /// export leaves the table and filter untouched.
    pub fn trigger_export(&self, delimiter: &str, destination: &Path) -> Result<ExportSummary> {
        let delimiter = Delimiter::parse(delimiter)?;
        let exporter = DelimitedExporter::new(delimiter).with_line_ending(self.line_ending);
        ExportJob::snapshot(self.filter.visible(), exporter).run(&self.table, destination)
    }
}
