use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use starphot_core::io::ImageFolderSource;
use starphot_core::source::FrameSource;

#[derive(Args)]
pub struct InfoArgs {
    /// Folder of frame images
    pub dir: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let source = ImageFolderSource::open(&args.dir)
        .with_context(|| format!("Failed to open {}", args.dir.display()))?;
    let first = source.load(0)?;

    println!("Folder:      {}", source.dir().display());
    println!("Frames:      {}", source.len());
    println!("Dimensions:  {}x{}", first.width(), first.height());
    println!(
        "Color mode:  {}",
        if first.is_rgb() { "RGB" } else { "Mono" }
    );
    println!("First frame: {}", source.label(0));
    println!("Last frame:  {}", source.label(source.len() - 1));

    Ok(())
}
