use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use starphot_core::session::{ProgressReporter, SessionStage};

pub fn bar_style(prefix: &str) -> Result<ProgressStyle> {
    let style = ProgressStyle::default_bar()
        .template(&format!("{prefix} [{{bar:40}}] {{pos}}/{{len}} {{msg}}"))?
        .progress_chars("=> ");
    Ok(style)
}

/// Terminal progress bar driven by a session run.
pub struct IndicatifReporter {
    pb: ProgressBar,
}

impl IndicatifReporter {
    pub fn new() -> Self {
        let pb = ProgressBar::new(0);
        if let Ok(style) = bar_style("Tracking") {
            pb.set_style(style);
        }
        Self { pb }
    }

    /// Print above the bar without breaking it.
    pub fn println(&self, message: impl AsRef<str>) {
        self.pb.println(message);
    }

    pub fn abandon(&self) {
        self.pb.abandon();
    }
}

impl ProgressReporter for IndicatifReporter {
    fn begin_stage(&self, stage: SessionStage, total_items: Option<usize>) {
        self.pb.set_length(total_items.unwrap_or(0) as u64);
        self.pb.set_message(stage.to_string());
    }

    fn advance(&self, items_done: usize) {
        self.pb.set_position(items_done as u64);
    }

    fn finish_stage(&self) {
        self.pb.finish_and_clear();
    }
}
