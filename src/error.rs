use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KtViewError {
    #[error("Failed to extract records from {path}: {message}")]
    Extraction { path: String, message: String },

    #[error("Failed to export to {path}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("No XML file found in {directory}")]
    NoXmlFile { directory: String },

    #[error("No <{entity_tag}> records found in {path}")]
    NoRecordsFound { entity_tag: String, path: String },

    #[error("{kind} index {index} out of range (len {len})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Row {row} has {found} cells, expected {expected}")]
    RowWidthMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Invalid delimiter: {value:?}")]
    InvalidDelimiter { value: String },

    #[error("Output file already exists: {path}")]
    OutputExists { path: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Path validation failed: {path}")]
    InvalidPath { path: String },

    #[error("Operation was cancelled by user")]
    Cancelled,
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for KtViewError {
    fn user_message(&self) -> String {
        match self {
            KtViewError::Extraction { path, message } => {
                format!("Could not read XML document {}: {}", path, message)
            }
            KtViewError::Export { path, source } => {
                format!("Export to {} failed: {}", path.display(), source)
            }
            KtViewError::NoXmlFile { directory } => {
                format!("No XML file found in {}", directory)
            }
            KtViewError::NoRecordsFound { entity_tag, path } => {
                format!("No <{}> records found in {}", entity_tag, path)
            }
            KtViewError::InvalidDelimiter { value } => {
                format!("Invalid delimiter {:?}: a single character is required", value)
            }
            KtViewError::OutputExists { path } => {
                format!("Output file already exists: {}", path)
            }
            KtViewError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            KtViewError::InvalidPath { path } => {
                format!("Invalid path: {}", path)
            }
            KtViewError::Cancelled => "Operation was cancelled by user".to_string(),
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            KtViewError::Extraction { .. } => Some(
                "Make sure the file is well-formed, UTF-8 encoded XML.".to_string(),
            ),
            KtViewError::Export { .. } => Some(
                "Check that the target directory exists, is writable and has free space.".to_string(),
            ),
            KtViewError::NoXmlFile { .. } => Some(
                "Place an .xml file in the directory, pass its path as an argument, or use --dir.".to_string(),
            ),
            KtViewError::NoRecordsFound { .. } => Some(
                "The document contains no matching elements. Check --entity-tag or the [extraction] section of your configuration.".to_string(),
            ),
            KtViewError::InvalidDelimiter { .. } => Some(
                "Use a single character such as ';' or ',', or \\t for a tab.".to_string(),
            ),
            KtViewError::OutputExists { .. } => Some(
                "Choose a different file name or use --force to overwrite.".to_string(),
            ),
            KtViewError::Config { .. } => Some(
                "Check your configuration file syntax and ensure all required fields are present.".to_string(),
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for KtViewError {
    fn from(error: toml::de::Error) -> Self {
        KtViewError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, KtViewError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_friendly_messages() {
        let error = KtViewError::NoXmlFile {
            directory: "/tmp/data".to_string(),
        };
        assert!(error.user_message().contains("No XML file found"));
        assert!(error.suggestion().is_some());
    }

    #[test]
    fn test_export_error_keeps_cause() {
        let error = KtViewError::Export {
            path: PathBuf::from("out.csv"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(error.user_message().contains("denied"));
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_index_error_display() {
        let error = KtViewError::IndexOutOfRange {
            kind: "row",
            index: 7,
            len: 2,
        };
        assert_eq!(error.to_string(), "row index 7 out of range (len 2)");
        assert!(error.suggestion().is_none());
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_error = toml::from_str::<toml::Value>("= broken").unwrap_err();
        let error = KtViewError::from(toml_error);
        assert!(matches!(error, KtViewError::Config { .. }));
    }
}
