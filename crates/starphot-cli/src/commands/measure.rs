use anyhow::{bail, Context, Result};
use clap::Args;
use starphot_core::io::ImageFolderSource;
use starphot_core::source::FrameSource;
use starphot_core::session::{positions_from_records, WorkflowSession};
use std::path::PathBuf;

use super::{run_batch, SessionArgs};
use crate::csv_io::read_positions;
use crate::summary::{print_report, print_session_summary};

#[derive(Args)]
pub struct MeasureArgs {
    /// Folder of frames, processed in name order
    pub folder: PathBuf,

    /// Positions CSV written by `track`
    #[arg(long)]
    pub positions: PathBuf,

    /// Take star name and aperture from the positions file
    #[arg(long)]
    pub use_file_aperture: bool,

    #[command(flatten)]
    pub session: SessionArgs,

    /// Output results CSV
    #[arg(short, long, default_value = "photometry.csv")]
    pub output: PathBuf,
}

pub fn run(args: &MeasureArgs) -> Result<()> {
    let mut config = args.session.build_config()?;
    let source = ImageFolderSource::open(&args.folder)
        .with_context(|| format!("Failed to open {}", args.folder.display()))?;

    let records = read_positions(&args.positions)?;
    let Some(first) = records.first() else {
        bail!("{} holds no positions", args.positions.display());
    };
    if args.use_file_aperture {
        config.star_name = first.star_name.clone();
        config.aperture = first.aperture();
    }
    print_session_summary(&config, &args.folder, source.len());

    let positions = positions_from_records(&records, source.len());
    let session = WorkflowSession::from_positions(config, source.len(), positions)?;
    let report = run_batch(session, &source, &args.output)?;

    print_report(&report);
    println!("Saved results to {}", args.output.display());
    Ok(())
}
