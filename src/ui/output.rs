use crate::error::{KtViewError, UserFriendlyError};
use crate::exporter::ExportSummary;
use crate::table::Table;
use crate::ViewReport;
use crate::cli::OutputFormat;
use console::{pad_str, style, Alignment, Emoji, Term};

/// Widest a column gets in human output before cells are truncated.
const MAX_COLUMN_WIDTH: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

impl From<&OutputFormat> for OutputMode {
    fn from(format: &OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        }
    }
}

// Emojis with text fallbacks
static CHECKMARK: Emoji = Emoji("✅ ", "✓ ");
static CROSS: Emoji = Emoji("❌ ", "✗ ");
static INFO: Emoji = Emoji("ℹ️  ", "i ");
static WARNING: Emoji = Emoji("⚠️  ", "! ");
static ROCKET: Emoji = Emoji("🚀 ", "> ");
static SPARKLES: Emoji = Emoji("✨ ", "* ");

pub struct OutputFormatter {
    mode: OutputMode,
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let use_colors = match mode {
            OutputMode::Human => Term::stdout().features().colors_supported() && !quiet,
            _ => false,
        };

        Self {
            mode,
            use_colors,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    // Core messaging methods
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Success, message),
            OutputMode::Json => self.print_json_message("success", message),
            OutputMode::Plain => println!("SUCCESS: {}", message),
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Error, message),
            OutputMode::Json => self.print_json_message("error", message),
            OutputMode::Plain => eprintln!("ERROR: {}", message),
        }
    }

    pub fn warning(&self, message: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Warning, message),
                OutputMode::Json => self.print_json_message("warning", message),
                OutputMode::Plain => println!("WARNING: {}", message),
            }
        }
    }

    pub fn info(&self, message: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Info, message),
                OutputMode::Json => self.print_json_message("info", message),
                OutputMode::Plain => println!("INFO: {}", message),
            }
        }
    }

    /// Like [`OutputFormatter::info`] but shown at the default verbosity.
    pub fn notice(&self, message: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Info, message),
                OutputMode::Json => self.print_json_message("info", message),
                OutputMode::Plain => println!("INFO: {}", message),
            }
        }
    }

    pub fn debug(&self, message: &str) {
        if self.should_show_message(2) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("  {}", style(message).dim());
                    } else {
                        println!("  DEBUG: {}", message);
                    }
                }
                OutputMode::Json => self.print_json_message("debug", message),
                OutputMode::Plain => println!("DEBUG: {}", message),
            }
        }
    }

    pub fn start_operation(&self, operation: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("{}{}", ROCKET, style(operation).bold());
                    } else {
                        println!("> {}", operation);
                    }
                }
                OutputMode::Json => self.print_json_message("operation_start", operation),
                OutputMode::Plain => println!("STARTING: {}", operation),
            }
        }
    }

    // User-friendly error handling
    pub fn print_user_friendly_error(&self, error: &KtViewError) {
        let user_message = error.user_message();
        self.error(&user_message);

        if let Some(suggestion) = error.suggestion() {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        eprintln!("{}{}", INFO, style(format!("Suggestion: {}", suggestion)).cyan());
                    } else {
                        eprintln!("Suggestion: {}", suggestion);
                    }
                }
                OutputMode::Json => {
                    self.print_json_object(&serde_json::json!({
                        "type": "suggestion",
                        "message": suggestion
                    }));
                }
                OutputMode::Plain => {
                    eprintln!("SUGGESTION: {}", suggestion);
                }
            }
        }
    }

    /// Prints the rows at `visible`, at most `limit` of them.
    ///
    /// Table data is printed even in quiet mode.
    pub fn print_table(&self, table: &Table, visible: &[usize], limit: Option<usize>) {
        let shown = &visible[..limit.map_or(visible.len(), |l| l.min(visible.len()))];

        match self.mode {
            OutputMode::Human => {
                for line in self.render_human_table(table, shown) {
                    println!("{}", line);
                }
            }
            OutputMode::Plain => {
                println!("{}", table.header().join("\t"));
                for record in table.project(shown) {
                    println!("{}", record.cells().join("\t"));
                }
            }
            OutputMode::Json => {
                let rows: Vec<serde_json::Map<String, serde_json::Value>> = table
                    .project(shown)
                    .map(|record| {
                        table
                            .header()
                            .iter()
                            .cloned()
                            .zip(record.cells().iter().map(|c| serde_json::Value::from(c.as_str())))
                            .collect()
                    })
                    .collect();
                self.print_json_object(&serde_json::json!({
                    "type": "table",
                    "header": table.header(),
                    "rows": rows,
                }));
            }
        }

        if shown.len() < visible.len() {
            self.notice(&format!("... {} more rows not shown", visible.len() - shown.len()));
        }
    }

    pub fn print_filter_status(&self, query: &str, literal: bool, visible: usize, total: usize) {
        if query.trim().is_empty() {
            self.notice(&format!("Showing all {} rows", total));
        } else if literal {
            self.notice(&format!(
                "{} of {} rows match {:?} (invalid pattern, matched as text)",
                visible, total, query
            ));
        } else {
            self.notice(&format!("{} of {} rows match {:?}", visible, total, query));
        }
    }

    pub fn print_export_summary(&self, summary: &ExportSummary) {
        match self.mode {
            OutputMode::Json => {
                let mut value = serde_json::to_value(summary).unwrap_or_default();
                if let Some(obj) = value.as_object_mut() {
                    obj.insert("type".to_string(), serde_json::Value::from("export"));
                }
                self.print_json_object(&value);
            }
            _ => self.success(&format!(
                "Exported {} rows ({}) to {}",
                summary.rows_written,
                format_bytes(summary.bytes_written),
                summary.path.display()
            )),
        }
    }

    pub fn print_view_report(&self, report: &ViewReport) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Json => {
                let mut value = serde_json::to_value(report).unwrap_or_default();
                if let Some(obj) = value.as_object_mut() {
                    obj.insert("type".to_string(), serde_json::Value::from("report"));
                }
                self.print_json_object(&value);
            }
            OutputMode::Plain => {
                println!("SOURCE: {}", report.source.display());
                println!("ROWS: {}/{}", report.visible_rows, report.total_rows);
            }
            OutputMode::Human => {
                if self.should_show_message(1) {
                    self.print_separator();
                    println!("  Source:  {}", report.source.display());
                    println!("  Rows:    {} of {}", report.visible_rows, report.total_rows);
                    for export in &report.exports {
                        println!("  Export:  {}", export.path.display());
                    }
                }
            }
        }
    }

    // Specialized output methods
    pub fn print_header(&self, title: &str) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                println!();
                if self.use_colors {
                    println!("{} {}", SPARKLES, style(title).bold().cyan());
                } else {
                    println!("=== {} ===", title);
                }
                println!();
            }
            OutputMode::Json => {
                self.print_json_object(&serde_json::json!({
                    "type": "header",
                    "title": title
                }));
            }
            OutputMode::Plain => {
                println!("=== {} ===", title);
            }
        }
    }

    pub fn print_separator(&self) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                if self.use_colors {
                    println!("{}", style("─".repeat(60)).dim());
                } else {
                    println!("{}", "-".repeat(60));
                }
            }
            OutputMode::Plain => {
                println!("{}", "-".repeat(60));
            }
            OutputMode::Json => {}
        }
    }

    // Private helper methods
    fn should_show_message(&self, min_verbose_level: u8) -> bool {
        !self.quiet && self.verbose_level >= min_verbose_level
    }

    fn render_human_table(&self, table: &Table, shown: &[usize]) -> Vec<String> {
        let widths: Vec<usize> = (0..table.column_count())
            .map(|col| {
                let header = table.header().get(col).map_or(0, |h| console::measure_text_width(h));
                table
                    .project(shown)
                    .filter_map(|record| record.cell(col))
                    .map(console::measure_text_width)
                    .fold(header, usize::max)
                    .min(MAX_COLUMN_WIDTH)
            })
            .collect();

        let render_line = |cells: &[String]| {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, &width)| pad_str(cell, width, Alignment::Left, Some("…")).into_owned())
                .collect::<Vec<_>>()
                .join("  ")
        };

        let mut lines = Vec::with_capacity(shown.len() + 2);
        let header = render_line(table.header());
        if self.use_colors {
            lines.push(style(header).bold().to_string());
        } else {
            lines.push(header);
        }
        lines.push(
            widths
                .iter()
                .map(|&w| "─".repeat(w))
                .collect::<Vec<_>>()
                .join("  "),
        );
        lines.extend(table.project(shown).map(|record| render_line(record.cells())));
        lines
    }

    fn print_human_message(&self, msg_type: MessageType, message: &str) {
        #[allow(clippy::type_complexity)]
        let (emoji, color_fn): (Emoji, Box<dyn Fn(&str) -> console::StyledObject<&str>>) =
            match msg_type {
                MessageType::Success => (CHECKMARK, Box::new(|msg| style(msg).green().bold())),
                MessageType::Error => (CROSS, Box::new(|msg| style(msg).red().bold())),
                MessageType::Warning => (WARNING, Box::new(|msg| style(msg).yellow().bold())),
                MessageType::Info => (INFO, Box::new(|msg| style(msg).cyan())),
            };

        if self.use_colors {
            match msg_type {
                MessageType::Error => eprintln!("{}{}", emoji, color_fn(message)),
                _ => println!("{}{}", emoji, color_fn(message)),
            }
        } else {
            let prefix = match msg_type {
                MessageType::Success => "✓",
                MessageType::Error => "✗",
                MessageType::Warning => "!",
                MessageType::Info => "i",
            };

            match msg_type {
                MessageType::Error => eprintln!("{} {}", prefix, message),
                _ => println!("{} {}", prefix, message),
            }
        }
    }

    fn print_json_message(&self, level: &str, message: &str) {
        self.print_json_object(&serde_json::json!({
            "type": "message",
            "level": level,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn print_json_object(&self, obj: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string(obj).unwrap_or_else(|_| "{}".to_string())
        );
    }
}

#[derive(Debug, Clone, Copy)]
enum MessageType {
    Success,
    Error,
    Warning,
    Info,
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
