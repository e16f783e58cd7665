use clap::Parser;
use ktview::{Cli, KtView, KtViewError, OutputFormatter, OutputMode, UserFriendlyError, ViewOptions};
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    let exit_code = run();
    process::exit(exit_code);
}

fn run() -> i32 {
    let cli = Cli::parse();
    setup_logging(cli.verbosity_level());

    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    let ktview = match KtView::from_cli(&cli) {
        Ok(ktview) => ktview,
        Err(e) => {
            print_startup_error(&e);
            return exit_code_for(&e);
        }
    };

    let options = ViewOptions {
        input: cli.input.clone(),
        query: cli.query.clone(),
        export: cli.export_target(&ktview.config().export.default_file_name),
        interactive: cli.interactive,
        force: cli.force,
    };

    match ktview.view(&options) {
        Ok(report) => {
            ktview.output_formatter().print_view_report(&report);
            0
        }
        Err(e) => {
            ktview.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn exit_code_for(error: &KtViewError) -> i32 {
    match error {
        KtViewError::Cancelled => 130, // Interrupted (SIGINT)
        KtViewError::Extraction { .. } => 2,
        KtViewError::NoXmlFile { .. } => 3,
        KtViewError::NoRecordsFound { .. } => 4,
        KtViewError::Export { .. } | KtViewError::InvalidDelimiter { .. } => 5,
        KtViewError::OutputExists { .. } => 6,
        KtViewError::Config { .. } => 7,
        _ => 1,
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "ktview.toml".to_string());

    match KtView::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  ktview --config {}", config_path);
            println!("\nEdit the file to describe other XML layouts or export defaults.");
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn print_startup_error(error: &KtViewError) {
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}

/// `RUST_LOG` wins over the verbosity flags.
fn setup_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
