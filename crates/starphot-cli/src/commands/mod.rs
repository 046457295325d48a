pub mod config;
pub mod info;
pub mod measure;
pub mod run;
pub mod track;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use indicatif::ProgressBar;
use starphot_core::frame::Position;
use starphot_core::io::ImageFolderSource;
use starphot_core::photometry::ApertureSampling;
use starphot_core::session::{
    DecisionReason, FailurePolicy, Resolution, RunOutcome, SessionConfig, SessionMode,
    SessionReport, WorkflowSession,
};
use starphot_core::track::TrackingStrategy;
use starphot_core::worker::{spawn_batch_worker, WorkerEvent};

use crate::csv_io::CsvResultSink;
use crate::progress::{bar_style, IndicatifReporter};

/// Session settings shared by the processing subcommands.
#[derive(Args)]
pub struct SessionArgs {
    /// Session config file (TOML); overrides the flags below
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Star identifier written to every record
    #[arg(long, default_value = "unnamed_star")]
    pub star: String,

    /// Signal aperture radius in pixels
    #[arg(long, default_value = "9")]
    pub aperture: f64,

    /// Sky annulus inner radius in pixels
    #[arg(long, default_value = "12")]
    pub annulus_inner: f64,

    /// Sky annulus outer radius in pixels (<= inner disables sky subtraction)
    #[arg(long, default_value = "17")]
    pub annulus_outer: f64,

    /// Tracking search radius in pixels
    #[arg(long, default_value = "25")]
    pub search_radius: f64,

    /// Use supplied positions as-is, without tracking
    #[arg(long)]
    pub no_tracking: bool,

    /// Score all centroid methods against each other
    #[arg(long)]
    pub consensus: bool,

    /// Split aperture edge pixels into NxN sub-samples
    #[arg(long)]
    pub subpixel: Option<u32>,

    /// Stop and ask when a frame cannot be decoded
    #[arg(long)]
    pub ask_on_decode_failure: bool,
}

impl SessionArgs {
    pub fn build_config(&self) -> Result<SessionConfig> {
        if let Some(ref path) = self.config {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            let config: SessionConfig = toml::from_str(&contents).context("Invalid session config")?;
            return Ok(config);
        }

        let mut config = SessionConfig {
            star_name: self.star.clone(),
            search_radius: self.search_radius,
            auto_tracking: !self.no_tracking,
            ..SessionConfig::default()
        };
        config.aperture.inner_radius = self.aperture;
        config.aperture.inner_annulus = self.annulus_inner;
        config.aperture.outer_annulus = self.annulus_outer;
        if self.consensus {
            config.tracker.strategy = TrackingStrategy::Consensus;
        }
        if let Some(n) = self.subpixel {
            config.aperture_sampling = ApertureSampling::Subpixel(n);
        }
        if self.ask_on_decode_failure {
            config.decode_failure = FailurePolicy::Ask;
        }
        Ok(config)
    }
}

/// What to do when the tracker loses the star.
#[derive(Clone, Copy, ValueEnum)]
pub enum OnLost {
    /// Keep the expected position
    Accept,
    /// Leave the frame without a position
    Skip,
    /// Stop pre-selection at the frame
    Stop,
}

/// Run pre-selection to the end, answering decisions non-interactively.
pub fn run_preselection(
    session: &mut WorkflowSession,
    source: &ImageFolderSource,
    anchor: Position,
    on_lost: OnLost,
) -> Result<()> {
    session.start_preselection()?;
    let reporter = IndicatifReporter::new();

    loop {
        match session.run(source, &reporter)? {
            RunOutcome::Complete => break,
            RunOutcome::AwaitingDecision(decision) => {
                let resolution = match decision.reason {
                    DecisionReason::AnchorRequired => Resolution::Position(anchor),
                    DecisionReason::FrameDecodeFailed => Resolution::Skip,
                    DecisionReason::TrackingLost { expected } => match on_lost {
                        OnLost::Accept => Resolution::Position(expected),
                        OnLost::Skip => Resolution::Skip,
                        OnLost::Stop => Resolution::Stop,
                    },
                    DecisionReason::PositionRequired => {
                        let previous = session.positions().iter().rev().flatten().next();
                        Resolution::Position(previous.copied().unwrap_or(anchor))
                    }
                };
                reporter.println(format!(
                    "Frame {}: {} -> {:?}",
                    decision.frame_index + 1,
                    decision.reason,
                    resolution
                ));
                session.resolve(resolution, source)?;
                if session.mode() == SessionMode::Paused {
                    reporter.abandon();
                    println!(
                        "Pre-selection stopped at frame {}",
                        session.current_frame_index() + 1
                    );
                    break;
                }
            }
            RunOutcome::Interrupted { .. } | RunOutcome::Paused { .. } => break,
        }
    }
    Ok(())
}

/// Measure every positioned frame on the worker thread and write the
/// results CSV.
pub fn run_batch(
    mut session: WorkflowSession,
    source: &ImageFolderSource,
    output: &Path,
) -> Result<SessionReport> {
    session.start_batch()?;
    let star_name = session.config().star_name.clone();
    let handle = spawn_batch_worker(session, Box::new(source.clone()))?;

    let pb = ProgressBar::new(0);
    pb.set_style(bar_style("Measuring")?);

    let mut finished = None;
    let mut worker_error = None;
    for event in handle.events.iter() {
        match event {
            WorkerEvent::Progress {
                items_done,
                items_total,
                ..
            } => {
                if let Some(total) = items_total {
                    pb.set_length(total as u64);
                }
                pb.set_position(items_done as u64);
            }
            WorkerEvent::Result(result) => {
                pb.set_message(result.label);
            }
            WorkerEvent::Failure(failure) => {
                pb.println(format!(
                    "Frame {} skipped: {}",
                    failure.frame_index + 1,
                    failure.message
                ));
            }
            WorkerEvent::DecisionRequired(decision) => {
                pb.println(format!(
                    "Frame {}: {}, skipping",
                    decision.frame_index + 1,
                    decision.reason
                ));
                handle.resolve(Resolution::Skip)?;
            }
            WorkerEvent::Interrupted { frame_index } => {
                pb.println(format!("Interrupted at frame {}", frame_index + 1));
            }
            WorkerEvent::Error(message) => worker_error = Some(message),
            WorkerEvent::Finished(session) => {
                finished = Some(session);
                break;
            }
        }
    }
    pb.finish_and_clear();
    handle.join()?;

    if let Some(message) = worker_error {
        bail!("Batch measurement failed: {message}");
    }
    let Some(mut session) = finished else {
        bail!("Worker exited without returning the session");
    };

    let mut sink = CsvResultSink::create(output, &star_name)?;
    let report = session.stop(&mut sink)?;
    Ok(report)
}
