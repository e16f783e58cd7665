use crate::error::{KtViewError, Result};
use crate::table::{Record, Table};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_DELIMITER: char = ';';

/// Single-character field separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiter(char);

impl Delimiter {
    pub fn new(c: char) -> Self {
        Self(c)
    }

    /// Parses user input. Empty input falls back to `;` and the two-character
    /// sequence `\t` means a tab; anything longer than one character is
    /// rejected.
    pub fn parse(value: &str) -> Result<Self> {
        if value == "\\t" {
            return Ok(Self('\t'));
        }

        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (None, _) => Ok(Self::default()),
            (Some(c), None) if c != '"' && c != '\r' && c != '\n' => Ok(Self(c)),
            _ => Err(KtViewError::InvalidDelimiter {
                value: value.to_string(),
            }),
        }
    }

    pub fn as_char(&self) -> char {
        self.0
    }
}

impl Default for Delimiter {
    fn default() -> Self {
        Self(DEFAULT_DELIMITER)
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            '\t' => write!(f, "\\t"),
            c => write!(f, "{}", c),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    /// `\r\n` on Windows, `\n` elsewhere.
    #[default]
    Platform,
    Lf,
    Crlf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Platform if cfg!(windows) => "\r\n",
            LineEnding::Platform | LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
        }
    }
}

/// Writes a header and rows as delimited text.
///
/// Known quirk: header fields are written raw, while every data cell is
/// quoted with embedded quotes doubled.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelimitedExporter {
    delimiter: Delimiter,
    line_ending: LineEnding,
}

impl DelimitedExporter {
    pub fn new(delimiter: Delimiter) -> Self {
        Self {
            delimiter,
            line_ending: LineEnding::Platform,
        }
    }

    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    pub fn delimiter(&self) -> Delimiter {
        self.delimiter
    }

    pub fn export<'a, I>(&self, header: &[String], rows: I) -> String
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut out = String::new();
        self.push_header(&mut out, header);
        for record in rows {
            self.push_row(&mut out, record);
        }
        out
    }

    /// Streams the text into `writer`, returning `(rows, bytes)` written.
    pub fn write_to<'a, W, I>(&self, writer: &mut W, header: &[String], rows: I) -> std::io::Result<(usize, u64)>
    where
        W: Write,
        I: IntoIterator<Item = &'a Record>,
    {
        let mut line = String::new();
        self.push_header(&mut line, header);
        writer.write_all(line.as_bytes())?;
        let mut bytes = line.len() as u64;
        let mut count = 0;

        for record in rows {
            line.clear();
            self.push_row(&mut line, record);
            writer.write_all(line.as_bytes())?;
            bytes += line.len() as u64;
            count += 1;
        }

        writer.flush()?;
        Ok((count, bytes))
    }

    fn push_header(&self, out: &mut String, header: &[String]) {
        for (i, field) in header.iter().enumerate() {
            if i > 0 {
                out.push(self.delimiter.as_char());
            }
            out.push_str(field);
        }
        out.push_str(self.line_ending.as_str());
    }

    fn push_row(&self, out: &mut String, record: &Record) {
        for (i, cell) in record.cells().iter().enumerate() {
            if i > 0 {
                out.push(self.delimiter.as_char());
            }
            out.push('"');
            out.push_str(&cell.replace('"', "\"\""));
            out.push('"');
        }
        out.push_str(self.line_ending.as_str());
    }
}

/// Result of a finished export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub rows_written: usize,
    pub bytes_written: u64,
    pub delimiter: String,
    pub exported_at: DateTime<Utc>,
}

/// One export invocation over a snapshot of the visible rows.
#[derive(Debug, Clone)]
pub struct ExportJob {
    exporter: DelimitedExporter,
    source_rows: Vec<usize>,
}

impl ExportJob {
    /// Captures `visible` so later query changes do not affect this job.
    pub fn snapshot(visible: &[usize], exporter: DelimitedExporter) -> Self {
        Self {
            exporter,
            source_rows: visible.to_vec(),
        }
    }

    pub fn source_rows(&self) -> &[usize] {
        &self.source_rows
    }

    pub fn render(&self, table: &Table) -> String {
        self.exporter.export(table.header(), table.project(&self.source_rows))
    }

    pub fn run(&self, table: &Table, destination: &Path) -> Result<ExportSummary> {
        debug!(
            "Exporting {} rows to {} with delimiter {:?}",
            self.source_rows.len(),
            destination.display(),
            self.exporter.delimiter().as_char()
        );

        let export_err = |source: std::io::Error| KtViewError::Export {
            path: destination.to_path_buf(),
            source,
        };

        let file = File::create(destination).map_err(export_err)?;
        let mut writer = BufWriter::new(file);
        let (rows_written, bytes_written) = self
            .exporter
            .write_to(&mut writer, table.header(), table.project(&self.source_rows))
            .map_err(export_err)?;

        info!("Exported {} rows ({} bytes) to {}", rows_written, bytes_written, destination.display());

        Ok(ExportSummary {
            path: destination.to_path_buf(),
            rows_written,
            bytes_written,
            delimiter: self.exporter.delimiter().to_string(),
            exported_at: Utc::now(),
        })
    }
}
