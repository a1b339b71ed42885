mod progress;
mod styling;
mod summary;
mod tables;

pub use progress::PhaseProgress;
pub use summary::print_summary;

use styling::{paint, Tone};

/// Prints the `CISync` banner to stderr.
///
/// Displays the tool name, version, and description at the start of execution.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        paint(Tone::Brand, "🔄 CISync"),
        paint(Tone::Label, env!("CARGO_PKG_VERSION")),
        paint(Tone::Label, "GitLab pipelines to Confluence")
    );
}
