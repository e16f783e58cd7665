//! Line-based live search over a loaded session.
//!
//! Every entered line replaces the current query and the visible rows are
//! printed again. Lines starting with `:` are commands.

use crate::error::{KtViewError, Result};
use crate::exporter::ExportSummary;
use crate::session::ViewerSession;
use crate::table::QueryDebouncer;
use crate::ui::{GracefulShutdown, OutputFormatter};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub const HELP_TEXT: &str = "\
Type text to filter rows (case-insensitive regular expression).
Start a query with :: to search for text beginning with a colon.
  :export [PATH] [DELIM]  write the visible rows to PATH (no spaces in PATH)
  :clear                  show all rows again
  :help                   show this help
  :quit                   leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Query(String),
    Export {
        path: Option<PathBuf>,
        delimiter: Option<String>,
    },
    Clear,
    Help,
    Quit,
    Unknown(String),
}

impl ShellCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        if let Some(query) = line.strip_prefix("::") {
            return ShellCommand::Query(format!(":{}", query));
        }
        let Some(command) = line.strip_prefix(':') else {
            return ShellCommand::Query(line.to_string());
        };

        let mut parts = command.split_whitespace();
        match parts.next() {
            Some("export") | Some("e") => ShellCommand::Export {
                path: parts.next().map(PathBuf::from),
                delimiter: parts.next().map(str::to_string),
            },
            Some("clear") | Some("c") => ShellCommand::Clear,
            Some("help") | Some("h") => ShellCommand::Help,
            Some("quit") | Some("q") => ShellCommand::Quit,
            _ => ShellCommand::Unknown(line.to_string()),
        }
    }
}

/// Settings the shell needs from the surrounding configuration.
pub struct ShellOptions {
    pub default_export: PathBuf,
    pub default_delimiter: String,
    pub display_limit: Option<usize>,
    pub debounce: Duration,
    pub force: bool,
}

pub struct InteractiveShell<'a> {
    session: &'a mut ViewerSession,
    formatter: &'a OutputFormatter,
    shutdown: &'a GracefulShutdown,
    options: ShellOptions,
    exports: Vec<ExportSummary>,
}

impl<'a> InteractiveShell<'a> {
    pub fn new(
        session: &'a mut ViewerSession,
        formatter: &'a OutputFormatter,
        shutdown: &'a GracefulShutdown,
        options: ShellOptions,
    ) -> Self {
        Self {
            session,
            formatter,
            shutdown,
            options,
            exports: Vec::new(),
        }
    }

    /// Reads commands until `:quit`, end of input or Ctrl+C.
    ///
    /// Lines are read on a separate thread. Queries arriving within the
    /// debounce period of each other are coalesced to the latest one, and
    /// a pending query is applied before any command runs. Export failures
    /// are reported and the loop continues.
    pub fn run<R>(mut self, input: R) -> Result<Vec<ExportSummary>>
    where
        R: BufRead + Send + 'static,
    {
        self.formatter.print_header("Interactive search");
        self.formatter.notice(HELP_TEXT);
        self.prompt();

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || read_lines(input, tx));

        let mut debouncer = QueryDebouncer::new(self.options.debounce);
        let poll = self.options.debounce.max(MIN_POLL_INTERVAL);

        while self.shutdown.is_running() {
            match rx.recv_timeout(poll) {
                Ok(Err(e)) => {
                    self.formatter.warning(&format!("Failed to read input: {}", e));
                }
                Ok(Ok(line)) => {
                    debug!("Shell input {:?}", line);

                    match ShellCommand::parse(&line) {
                        ShellCommand::Query(query) => debouncer.push(query, Instant::now()),
                        ShellCommand::Clear => debouncer.push(String::new(), Instant::now()),
                        ShellCommand::Quit => break,
                        command => {
                            if let Some(query) = debouncer.flush() {
                                self.apply_query(&query);
                            }
                            self.execute(command);
                            self.prompt();
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if let Some(query) = debouncer.take_ready(Instant::now()) {
                        self.apply_query(&query);
                        self.prompt();
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    if let Some(query) = debouncer.flush() {
                        self.apply_query(&query);
                    }
                    break;
                }
            }
        }

        Ok(self.exports)
    }

    fn execute(&mut self, command: ShellCommand) {
        match command {
            ShellCommand::Export { path, delimiter } => {
                if let Err(e) = self.export(path, delimiter) {
                    self.formatter.print_user_friendly_error(&e);
                }
            }
            ShellCommand::Help => self.formatter.notice(HELP_TEXT),
            ShellCommand::Unknown(command) => {
                self.formatter.warning(&format!("Unknown command: {}", command));
            }
            ShellCommand::Query(_) | ShellCommand::Clear | ShellCommand::Quit => {}
        }
    }

    fn apply_query(&mut self, query: &str) {
        let visible = self.session.set_query(query).len();
        let table = self.session.table();
        self.formatter
            .print_table(table, self.session.visible_indices(), self.options.display_limit);
        self.formatter.print_filter_status(
            self.session.query(),
            self.session.matcher().is_literal(),
            visible,
            table.row_count(),
        );
    }

    fn export(&mut self, path: Option<PathBuf>, delimiter: Option<String>) -> Result<()> {
        let path = path.unwrap_or_else(|| self.options.default_export.clone());
        let delimiter = delimiter.unwrap_or_else(|| self.options.default_delimiter.clone());
        ensure_writable_target(&path, self.options.force)?;

        let summary = self.session.trigger_export(&delimiter, &path)?;
        self.formatter.print_export_summary(&summary);
        self.exports.push(summary);
        Ok(())
    }

    fn prompt(&self) {
        if self.formatter.mode() == crate::ui::OutputMode::Human {
            print!("query> ");
            let _ = std::io::stdout().flush();
        }
    }
}

/// Sends every input line to `tx`. Bytes that are not UTF-8 are replaced
/// rather than ending the session; a read error is forwarded once and stops
/// reading.
fn read_lines<R: BufRead>(mut input: R, tx: mpsc::Sender<std::io::Result<String>>) {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match input.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf)
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
                if tx.send(Ok(line)).is_err() {
                    break;
                }
            }
            Err(e) => {
                let _ = tx.send(Err(e));
                break;
            }
        }
    }
}

/// Refuses to replace an existing file unless `force` is set.
pub fn ensure_writable_target(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(KtViewError::OutputExists {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionConfig;
    use crate::exporter::LineEnding;
    use crate::ui::OutputMode;
    use std::io::Cursor;
    use tempfile::TempDir;

    const XML: &str = r#"<root>
  <kostentraeger V="1"><name V="AOK Nord"/><CTY V="Kiel"/><ik V="123"/></kostentraeger>
  <kostentraeger V="2"><name V="LKK Bayern"/><kurzname V="LKK"/><CTY V="München"/><ik V="456"/></kostentraeger>
</root>"#;

    fn session(temp_dir: &TempDir) -> ViewerSession {
        let path = temp_dir.path().join("kt.xml");
        std::fs::write(&path, XML).unwrap();
        ViewerSession::load_table(&path, ExtractionConfig::default())
            .unwrap()
            .with_line_ending(LineEnding::Lf)
    }

    fn options(temp_dir: &TempDir) -> ShellOptions {
        ShellOptions {
            default_export: temp_dir.path().join("kostentraeger.csv"),
            default_delimiter: ";".to_string(),
            display_limit: None,
            debounce: Duration::from_millis(20),
            force: false,
        }
    }

    #[test]
    fn test_command_parsing() {
        assert_eq!(ShellCommand::parse("kiel"), ShellCommand::Query("kiel".to_string()));
        assert_eq!(ShellCommand::parse(""), ShellCommand::Query(String::new()));
        assert_eq!(ShellCommand::parse(":q"), ShellCommand::Quit);
        assert_eq!(ShellCommand::parse(":clear"), ShellCommand::Clear);
        assert_eq!(
            ShellCommand::parse(":export out.csv ,"),
            ShellCommand::Export {
                path: Some(PathBuf::from("out.csv")),
                delimiter: Some(",".to_string()),
            }
        );
        assert_eq!(
            ShellCommand::parse(":export"),
            ShellCommand::Export { path: None, delimiter: None }
        );
        assert!(matches!(ShellCommand::parse(":bogus"), ShellCommand::Unknown(_)));
        assert_eq!(ShellCommand::parse("::quit"), ShellCommand::Query(":quit".to_string()));
    }

    #[test]
    fn test_session_export_after_query() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = session(&temp_dir);
        let formatter = OutputFormatter::new(OutputMode::Plain, 0, true);
        let shutdown = GracefulShutdown::new_for_test();

        let input = Cursor::new("bayern\n:export\n:quit\nignored\n");
        let exports = InteractiveShell::new(&mut session, &formatter, &shutdown, options(&temp_dir))
            .run(input)
            .unwrap();

        assert_eq!(exports.len(), 1);
        assert_eq!(exports[0].rows_written, 1);
        assert_eq!(session.query(), "bayern");

        let content = std::fs::read_to_string(temp_dir.path().join("kostentraeger.csv")).unwrap();
        assert_eq!(
            content,
            "Kostenträger-ID;Name;Kurzname;Ort;IK\n\"2\";\"LKK Bayern\";\"LKK\";\"München\";\"456\"\n"
        );
    }

    #[test]
    fn test_existing_target_is_kept_without_force() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("kostentraeger.csv");
        std::fs::write(&target, "keep me").unwrap();

        let mut session = session(&temp_dir);
        let formatter = OutputFormatter::new(OutputMode::Plain, 0, true);
        let shutdown = GracefulShutdown::new_for_test();

        let exports = InteractiveShell::new(&mut session, &formatter, &shutdown, options(&temp_dir))
            .run(Cursor::new(":export\n"))
            .unwrap();

        assert!(exports.is_empty());
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "keep me");
    }

    #[test]
    fn test_burst_is_coalesced_to_latest_query() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = session(&temp_dir);
        let formatter = OutputFormatter::new(OutputMode::Plain, 0, true);
        let shutdown = GracefulShutdown::new_for_test();

        InteractiveShell::new(&mut session, &formatter, &shutdown, options(&temp_dir))
            .run(Cursor::new("k\nki\nkie\nnord\n"))
            .unwrap();

        assert_eq!(session.query(), "nord");
        assert_eq!(session.visible_indices(), &[0]);
    }

    #[test]
    fn test_clear_resets_query() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = session(&temp_dir);
        let formatter = OutputFormatter::new(OutputMode::Plain, 0, true);
        let shutdown = GracefulShutdown::new_for_test();

        InteractiveShell::new(&mut session, &formatter, &shutdown, options(&temp_dir))
            .run(Cursor::new("kiel\n:clear\n"))
            .unwrap();

        assert_eq!(session.query(), "");
        assert_eq!(session.visible_indices(), &[0, 1]);
    }

    #[test]
    fn test_invalid_utf8_line_does_not_end_session() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = session(&temp_dir);
        let formatter = OutputFormatter::new(OutputMode::Plain, 0, true);
        let shutdown = GracefulShutdown::new_for_test();

        let input = Cursor::new(&b"M\xfcnchen\nkiel\n:export\n"[..]);
        let exports = InteractiveShell::new(&mut session, &formatter, &shutdown, options(&temp_dir))
            .run(input)
            .unwrap();

        assert_eq!(session.query(), "kiel");
        assert_eq!(exports.len(), 1);
        assert_eq!(exports[0].rows_written, 1);
        assert!(temp_dir.path().join("kostentraeger.csv").exists());
    }

    #[test]
    fn test_stops_when_shutdown_requested() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = session(&temp_dir);
        let formatter = OutputFormatter::new(OutputMode::Plain, 0, true);
        let shutdown = GracefulShutdown::new_for_test();
        shutdown.request_shutdown();

        InteractiveShell::new(&mut session, &formatter, &shutdown, options(&temp_dir))
            .run(Cursor::new("kiel\n"))
            .unwrap();

        assert_eq!(session.query(), "");
    }
}
