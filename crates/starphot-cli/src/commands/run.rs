use anyhow::{bail, Context, Result};
use clap::Args;
use starphot_core::frame::Position;
use starphot_core::io::ImageFolderSource;
use starphot_core::source::FrameSource;
use starphot_core::session::{position_records, WorkflowSession, PRESELECTED_POSITION_TYPE};
use std::path::PathBuf;

use super::{run_batch, run_preselection, OnLost, SessionArgs};
use crate::csv_io::write_positions;
use crate::summary::{print_report, print_session_summary, print_tracking_report};

#[derive(Args)]
pub struct RunArgs {
    /// Folder of frames, processed in name order
    pub folder: PathBuf,

    /// Star x position in the first frame
    #[arg(long)]
    pub x: f64,

    /// Star y position in the first frame
    #[arg(long)]
    pub y: f64,

    /// What to do when the star is lost
    #[arg(long, value_enum, default_value = "accept")]
    pub on_lost: OnLost,

    #[command(flatten)]
    pub session: SessionArgs,

    /// Also save the pre-selected positions
    #[arg(long)]
    pub positions_output: Option<PathBuf>,

    /// Output results CSV
    #[arg(short, long, default_value = "photometry.csv")]
    pub output: PathBuf,
}

pub fn run(args: &RunArgs) -> Result<()> {
    let config = args.session.build_config()?;
    let source = ImageFolderSource::open(&args.folder)
        .with_context(|| format!("Failed to open {}", args.folder.display()))?;
    print_session_summary(&config, &args.folder, source.len());

    let mut session = WorkflowSession::new(config, source.len())?;
    run_preselection(
        &mut session,
        &source,
        Position::new(args.x, args.y),
        args.on_lost,
    )?;
    print_tracking_report(&session.report());
    if !session.is_complete() {
        bail!(
            "Pre-selection stopped at frame {}, nothing measured",
            session.current_frame_index() + 1
        );
    }

    if let Some(ref path) = args.positions_output {
        let records = position_records(&session, &source, PRESELECTED_POSITION_TYPE);
        write_positions(path, &records)?;
        println!("Saved {} positions to {}", records.len(), path.display());
    }

    let report = run_batch(session, &source, &args.output)?;
    print_report(&report);
    println!("Saved results to {}", args.output.display());
    Ok(())
}
