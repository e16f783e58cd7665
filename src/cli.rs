use crate::config::{CliOverrides, Config};
use crate::error::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ktview")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "View, search and export Kostenträger XML files")]
#[command(
    long_about = "ktview reads the Kostenträger entries of an XML file into a table, \
                  filters the rows with a case-insensitive regular expression and \
                  exports the visible rows as delimited text."
)]
#[command(after_help = "EXAMPLES:\n  \
    ktview\n  \
    ktview kostentraeger.xml --query kiel\n  \
    ktview --dir ./data --query '^10' --export=result.csv --delimiter ,\n  \
    ktview kostentraeger.xml --interactive\n  \
    ktview --generate-config --config ktview.toml")]
pub struct Cli {
    /// XML file to load (defaults to the first XML file in --dir)
    pub input: Option<PathBuf>,

    /// Filter rows by a case-insensitive regular expression
    #[arg(short, long)]
    pub query: Option<String>,

    /// Export the visible rows (to the configured default file name if no path is given)
    #[arg(short, long, num_args = 0..=1, require_equals = true, value_name = "PATH")]
    pub export: Option<Option<PathBuf>>,

    /// Column delimiter for the export (a single character, `\t` for tab)
    #[arg(short, long)]
    pub delimiter: Option<String>,

    /// Directory searched when no input file is given
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Element name of the entities to extract
    #[arg(long)]
    pub entity_tag: Option<String>,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Maximum number of rows printed
    #[arg(long)]
    pub limit: Option<usize>,

    /// Read queries and commands line by line from stdin
    #[arg(short, long)]
    pub interactive: bool,

    /// Verbose output level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Overwrite an existing export file
    #[arg(long)]
    pub force: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_entity_tag(self.entity_tag.clone())
            .with_delimiter(self.delimiter.clone())
            .with_directory(self.dir.clone())
            .with_display_limit(self.limit)
    }

    /// Export destination requested on the command line, if any.
    ///
    /// A bare `--export` falls back to `default_file_name`.
    pub fn export_target(&self, default_file_name: &str) -> Option<PathBuf> {
        self.export
            .as_ref()
            .map(|path| path.clone().unwrap_or_else(|| PathBuf::from(default_file_name)))
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("ktview").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_no_arguments_is_valid() {
        let cli = parse(&[]);
        assert!(cli.input.is_none());
        assert!(cli.export.is_none());
        assert!(!cli.interactive);
        assert_eq!(cli.verbosity_level(), 0);
    }

    #[test]
    fn test_export_flag_with_and_without_path() {
        let bare = parse(&["--export"]);
        assert_eq!(
            bare.export_target("kostentraeger.csv"),
            Some(PathBuf::from("kostentraeger.csv"))
        );

        let explicit = parse(&["data.xml", "--export=out.csv", "-d", ","]);
        assert_eq!(explicit.input, Some(PathBuf::from("data.xml")));
        assert_eq!(explicit.export_target("ignored.csv"), Some(PathBuf::from("out.csv")));
        assert_eq!(explicit.delimiter.as_deref(), Some(","));

        assert_eq!(parse(&[]).export_target("kostentraeger.csv"), None);
    }

    #[test]
    fn test_bare_export_does_not_swallow_input() {
        let cli = parse(&["-e", "data.xml"]);
        assert_eq!(cli.input, Some(PathBuf::from("data.xml")));
        assert_eq!(
            cli.export_target("kostentraeger.csv"),
            Some(PathBuf::from("kostentraeger.csv"))
        );
    }

    #[test]
    fn test_query_short_flag() {
        let cli = parse(&["-q", "^1", "--limit", "5"]);
        assert_eq!(cli.query.as_deref(), Some("^1"));
        assert_eq!(cli.limit, Some(5));
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["ktview", "--quiet", "-v"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_verbosity() {
        let cli = parse(&["-vv"]);
        assert_eq!(cli.verbosity_level(), 2);

        let quiet = parse(&["--quiet"]);
        assert_eq!(quiet.verbosity_level(), 0);
    }

    #[test]
    fn test_overrides_reach_config() {
        let cli = parse(&["--entity-tag", "item", "-d", "|", "--dir", "/tmp", "--limit", "3"]);
        let mut config = Config::default();
        config.merge_with_cli_args(&cli.create_cli_overrides());

        assert_eq!(config.extraction.entity_tag, "item");
        assert_eq!(config.export.delimiter, "|");
        assert_eq!(config.input.directory, PathBuf::from("/tmp"));
        assert_eq!(config.filter.display_limit, Some(3));
    }
}
