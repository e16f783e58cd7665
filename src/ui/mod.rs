pub mod interactive;
pub mod output;
pub mod progress;
pub mod signals;

pub use interactive::{InteractiveShell, ShellCommand, ShellOptions};
pub use output::{OutputFormatter, OutputMode};
pub use progress::ProgressManager;
pub use signals::GracefulShutdown;
