use crate::error::{KtViewError, Result};
use crate::exporter::{Delimiter, LineEnding};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub extraction: ExtractionConfig,
    pub export: ExportConfig,
    pub input: InputConfig,
    pub filter: FilterConfig,
}

/// Rules mapping XML elements to table rows.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Local name of the element that yields one row.
    pub entity_tag: String,
    /// Attribute on the entity element holding the first column.
    pub id_attribute: String,
    pub id_header: String,
    /// Attribute read from each field element.
    pub value_attribute: String,
    pub field_scope: FieldScope,
    pub fields: Vec<FieldRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FieldRule {
    pub header: String,
    pub tag: String,
}

/// Where field elements are looked up relative to the entity element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldScope {
    #[default]
    Children,
    Descendants,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExportConfig {
    pub delimiter: String,
    pub default_file_name: String,
    pub line_ending: LineEnding,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InputConfig {
    pub directory: PathBuf,
    pub extension: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterConfig {
    pub debounce_ms: u64,
    pub display_limit: Option<usize>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        let field = |header: &str, tag: &str| FieldRule {
            header: header.to_string(),
            tag: tag.to_string(),
        };

        Self {
            entity_tag: "kostentraeger".to_string(),
            id_attribute: "V".to_string(),
            id_header: "Kostenträger-ID".to_string(),
            value_attribute: "V".to_string(),
            field_scope: FieldScope::Children,
            fields: vec![
                field("Name", "name"),
                field("Kurzname", "kurzname"),
                field("Ort", "CTY"),
                field("IK", "ik"),
            ],
        }
    }
}

impl ExtractionConfig {
    /// Column headers in output order: id first, then one per field rule.
    pub fn header(&self) -> Vec<String> {
        std::iter::once(self.id_header.clone())
            .chain(self.fields.iter().map(|f| f.header.clone()))
            .collect()
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            delimiter: ";".to_string(),
            default_file_name: "kostentraeger.csv".to_string(),
            line_ending: LineEnding::Platform,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            extension: "xml".to_string(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 150,
            display_limit: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(KtViewError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| KtViewError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| KtViewError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["ktview.toml", ".ktview.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref entity_tag) = cli_args.entity_tag {
            self.extraction.entity_tag = entity_tag.clone();
        }

        if let Some(ref delimiter) = cli_args.delimiter {
            self.export.delimiter = delimiter.clone();
        }

        if let Some(ref directory) = cli_args.directory {
            self.input.directory = directory.clone();
        }

        if let Some(limit) = cli_args.display_limit {
            self.filter.display_limit = Some(limit);
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| KtViewError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| KtViewError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let rules = &self.extraction;

        if rules.entity_tag.trim().is_empty() {
            return Err(KtViewError::Config {
                message: "Entity tag must not be empty".to_string(),
            });
        }

        if rules.id_attribute.trim().is_empty() || rules.value_attribute.trim().is_empty() {
            return Err(KtViewError::Config {
                message: "Id and value attribute names must not be empty".to_string(),
            });
        }

        if let Some(rule) = rules.fields.iter().find(|f| f.tag.trim().is_empty()) {
            return Err(KtViewError::Config {
                message: format!("Field '{}' has an empty tag", rule.header),
            });
        }

        let mut seen = HashSet::new();
        for header in rules.header() {
            if !seen.insert(header.clone()) {
                return Err(KtViewError::Config {
                    message: format!("Duplicate column header: {}", header),
                });
            }
        }

        self.delimiter().map_err(|e| KtViewError::Config {
            message: e.to_string(),
        })?;

        if self.input.extension.trim().is_empty() {
            return Err(KtViewError::Config {
                message: "Input file extension must not be empty".to_string(),
            });
        }

        if self.export.default_file_name.trim().is_empty() {
            return Err(KtViewError::Config {
                message: "Default export file name must not be empty".to_string(),
            });
        }

        Ok(())
    }

    pub fn delimiter(&self) -> Result<Delimiter> {
        Delimiter::parse(&self.export.delimiter)
    }

    pub fn debounce_duration(&self) -> Duration {
        Duration::from_millis(self.filter.debounce_ms)
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub entity_tag: Option<String>,
    pub delimiter: Option<String>,
    pub directory: Option<PathBuf>,
    pub display_limit: Option<usize>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity_tag(mut self, entity_tag: Option<String>) -> Self {
        self.entity_tag = entity_tag;
        self
    }

    pub fn with_delimiter(mut self, delimiter: Option<String>) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_directory(mut self, directory: Option<PathBuf>) -> Self {
        self.directory = directory;
        self
    }

    pub fn with_display_limit(mut self, limit: Option<usize>) -> Self {
        self.display_limit = limit;
        self
    }
}
