pub mod delimited;

pub use delimited::{
    DelimitedExporter, Delimiter, ExportJob, ExportSummary, LineEnding, DEFAULT_DELIMITER,
};
