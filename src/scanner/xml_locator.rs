use crate::config::InputConfig;
use crate::error::{KtViewError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Finds the input document in a directory.
///
/// Only the directory itself is searched. Candidates are ordered by file
/// name so the choice does not depend on how the platform enumerates
/// directory entries.
pub struct XmlLocator {
    extension: String,
}

impl XmlLocator {
    pub fn new(config: &InputConfig) -> Self {
        Self {
            extension: config.extension.trim_start_matches('.').to_lowercase(),
        }
    }

    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.to_lowercase() == self.extension)
    }

    /// All matching files, sorted lexicographically by file name.
    pub fn candidates<P: AsRef<Path>>(&self, directory: P) -> Result<Vec<PathBuf>> {
        let directory = directory.as_ref();

        if !directory.is_dir() {
            return Err(KtViewError::InvalidPath {
                path: format!("{} is not a directory", directory.display()),
            });
        }

        let mut candidates = Vec::new();
        let walker = WalkDir::new(directory)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Skipping unreadable entry: {}", err);
                    continue;
                }
            };

            if entry.file_type().is_file() && self.matches(entry.path()) {
                candidates.push(entry.into_path());
            }
        }

        debug!(
            "Found {} .{} candidates in {}",
            candidates.len(),
            self.extension,
            directory.display()
        );
        Ok(candidates)
    }

    pub fn locate<P: AsRef<Path>>(&self, directory: P) -> Result<PathBuf> {
        let directory = directory.as_ref();
        self.candidates(directory)?
            .into_iter()
            .next()
            .ok_or_else(|| KtViewError::NoXmlFile {
                directory: directory.display().to_string(),
            })
    }
}

impl Default for XmlLocator {
    fn default() -> Self {
        Self::new(&InputConfig::default())
    }
}
