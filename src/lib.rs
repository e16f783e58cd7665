pub mod cli;
pub mod config;
pub mod error;
pub mod exporter;
pub mod extractor;
pub mod scanner;
pub mod session;
pub mod table;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{CliOverrides, Config, ExportConfig, ExtractionConfig, FieldRule, FieldScope};
pub use error::{KtViewError, Result, UserFriendlyError};

// Core functionality re-exports
pub use exporter::{DelimitedExporter, Delimiter, ExportJob, ExportSummary, LineEnding};
pub use extractor::AttributeExtractor;
pub use scanner::XmlLocator;
pub use session::ViewerSession;
pub use table::{FilterEngine, FilterState, Matcher, QueryDebouncer, Record, Table};
pub use ui::{GracefulShutdown, InteractiveShell, OutputFormatter, OutputMode, ProgressManager};

use serde::Serialize;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use ui::interactive::{ensure_writable_target, ShellOptions};

/// What a single invocation should do once the table is loaded.
#[derive(Debug, Clone, Default)]
pub struct ViewOptions {
    pub input: Option<PathBuf>,
    pub query: Option<String>,
    pub export: Option<PathBuf>,
    pub interactive: bool,
    pub force: bool,
}

/// Outcome of [`KtView::view`], printed at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct ViewReport {
    pub source: PathBuf,
    pub total_rows: usize,
    pub visible_rows: usize,
    pub query: String,
    pub exports: Vec<ExportSummary>,
}

/// Main library interface for ktview functionality
pub struct KtView {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
}

impl KtView {
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);
        let shutdown = GracefulShutdown::new()?;

        Ok(Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
        })
    }

    /// Create a KtView instance for testing (no signal handler conflicts)
    #[cfg(test)]
    pub fn new_for_test(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        Self {
            config,
            output_formatter: OutputFormatter::new(output_mode, verbose, quiet),
            progress_manager: ProgressManager::new(false),
            shutdown: GracefulShutdown::new_for_test(),
        }
    }

    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = OutputMode::from(&cli_args.output_format);

        Self::new(config, output_mode, cli_args.verbosity_level(), cli_args.quiet)
    }

    /// Picks the document to load.
    ///
    /// An explicit file is used as is, an explicit directory is searched, and
    /// without input the configured directory is searched.
    pub fn resolve_input(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        match explicit {
            Some(path) if path.is_file() => Ok(path.to_path_buf()),
            Some(path) if path.is_dir() => self.discover(path),
            Some(path) => Err(KtViewError::InvalidPath {
                path: format!("{} does not exist", path.display()),
            }),
            None => self.discover(&self.config.input.directory),
        }
    }

    fn discover(&self, directory: &Path) -> Result<PathBuf> {
        let candidates = XmlLocator::new(&self.config.input).candidates(directory)?;
        let Some(first) = candidates.first() else {
            return Err(KtViewError::NoXmlFile {
                directory: directory.display().to_string(),
            });
        };

        if candidates.len() > 1 {
            self.output_formatter.info(&format!(
                "Found {} XML files in {}, using {}",
                candidates.len(),
                directory.display(),
                first.display()
            ));
        }
        Ok(first.clone())
    }

    /// Extracts the table behind a spinner. A document without records is
    /// reported as [`KtViewError::NoRecordsFound`].
    pub fn load_session(&self, path: &Path) -> Result<ViewerSession> {
        self.output_formatter
            .start_operation(&format!("Loading {}", path.display()));

        let spinner = self
            .progress_manager
            .create_spinner(&format!("Reading {}", path.display()));
        let loaded = ViewerSession::load_table(path, self.config.extraction.clone());
        ui::progress::finish_spinner(&spinner);

        let session = loaded?.with_line_ending(self.config.export.line_ending);
        if session.table().is_empty() {
            return Err(KtViewError::NoRecordsFound {
                entity_tag: self.config.extraction.entity_tag.clone(),
                path: path.display().to_string(),
            });
        }

        self.output_formatter.info(&format!(
            "Loaded {} records with {} columns",
            session.table().row_count(),
            session.table().column_count()
        ));
        self.output_formatter
            .debug(&format!("Columns: {}", session.table().header().join(", ")));
        Ok(session)
    }

    /// Runs one invocation, reading interactive input from stdin.
    pub fn view(&self, options: &ViewOptions) -> Result<ViewReport> {
        self.view_with_input(options, BufReader::new(std::io::stdin()))
    }

    pub fn view_with_input<R>(&self, options: &ViewOptions, input: R) -> Result<ViewReport>
    where
        R: BufRead + Send + 'static,
    {
        self.shutdown.check_shutdown()?;

        let source = self.resolve_input(options.input.as_deref())?;
        let mut session = self.load_session(&source)?;
        self.shutdown.check_shutdown()?;

        if let Some(ref query) = options.query {
            session.set_query(query);
        }

        let limit = self.config.filter.display_limit;
        self.output_formatter
            .print_table(session.table(), session.visible_indices(), limit);
        self.output_formatter.print_filter_status(
            session.query(),
            session.matcher().is_literal(),
            session.visible_indices().len(),
            session.table().row_count(),
        );

        let mut exports = Vec::new();
        if let Some(ref target) = options.export {
            match self.export_visible(&session, target, options.force) {
                Ok(summary) => exports.push(summary),
                // The interactive session outlives a failed export.
                Err(e) if options.interactive => self.handle_error(&e),
                Err(e) => return Err(e),
            }
        }

        if options.interactive {
            let shell_options = ShellOptions {
                default_export: PathBuf::from(&self.config.export.default_file_name),
                default_delimiter: self.config.export.delimiter.clone(),
                display_limit: limit,
                debounce: self.config.debounce_duration(),
                force: options.force,
            };
            let shell = InteractiveShell::new(
                &mut session,
                &self.output_formatter,
                &self.shutdown,
                shell_options,
            );
            exports.extend(shell.run(input)?);
        }

        Ok(ViewReport {
            source,
            total_rows: session.table().row_count(),
            visible_rows: session.visible_indices().len(),
            query: session.query().to_string(),
            exports,
        })
    }

    fn export_visible(&self, session: &ViewerSession, target: &Path, force: bool) -> Result<ExportSummary> {
        ensure_writable_target(target, force)?;
        let summary = session.trigger_export(&self.config.export.delimiter, target)?;
        self.output_formatter.print_export_summary(&summary);
        Ok(summary)
    }

    /// Generate sample configuration file
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        Config::new().save_to_file(output_path)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &KtViewError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}
