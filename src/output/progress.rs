use std::fmt::Display;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{heading, paint, Tone};

/// Progress tracking for the three phases of a sync
pub struct PhaseProgress {
    pb: ProgressBar,
}

impl PhaseProgress {
    pub fn start_fetch(pipeline_id: u64) -> Self {
        eprintln!("{}", heading("⚙️ ", "Phases"));
        Self::spin(format!("Phase 1/3: Fetching pipeline {pipeline_id} from GitLab"))
    }

    pub fn finish_fetch_start_render(self, history_runs: usize) -> Self {
        self.finish(format!(
            "Phase 1/3: Fetched pipeline, tests and {history_runs} history runs ✓"
        ));
        Self::spin("Phase 2/3: Rendering section")
    }

    pub fn finish_render_start_update(self, page_id: &str) -> Self {
        self.finish("Phase 2/3: Rendered section ✓");
        Self::spin(format!("Phase 3/3: Updating Confluence page {page_id}"))
    }

    pub fn finish_update(self, written: bool) {
        self.finish(if written {
            "Phase 3/3: Confluence page updated ✓"
        } else {
            "Phase 3/3: Dry run, page not written ✓"
        });
        eprintln!();
    }

    fn spin(message: impl Display) -> Self {
        Self {
            pb: create_spinner(paint(Tone::Pending, message).to_string()),
        }
    }

    fn finish(self, message: impl Display) {
        self.pb.finish_with_message(paint(Tone::Done, message).to_string());
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {msg} {spinner}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
