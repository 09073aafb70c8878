//! Presentation layer for roundtable
//!
//! This crate contains CLI definitions, progress reporters, the console
//! formatter and the Markdown report renderer.

pub mod cli;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use cli::commands::{Cli, Command, OutputFormat, StartArgs};
pub use output::console::ConsoleFormatter;
pub use output::formatter::OutputFormatter;
pub use output::report::MarkdownReport;
pub use progress::reporter::{ProgressReporter, SimpleProgress};
