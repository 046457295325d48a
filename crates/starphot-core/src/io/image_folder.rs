use std::path::{Path, PathBuf};

use image::{ColorType, DynamicImage};
use ndarray::Array2;
use tracing::info;

use crate::error::{Result, StarphotError};
use crate::frame::PixelPlane;
use crate::source::FrameSource;

/// File extensions read by [`ImageFolderSource`], lowercase.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["tif", "tiff", "png", "jpg", "jpeg"];

/// A directory of image files, one frame per file, ordered by file name.
#[derive(Clone, Debug)]
pub struct ImageFolderSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
}

impl ImageFolderSource {
    pub fn open(dir: &Path) -> Result<Self> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && is_supported(&path) {
                files.push(path);
            }
        }
        files.sort();
        if files.is_empty() {
            return Err(StarphotError::EmptySequence);
        }
        info!(dir = %dir.display(), frames = files.len(), "Opened image folder");
        Ok(Self {
            dir: dir.to_path_buf(),
            files,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl FrameSource for ImageFolderSource {
    fn len(&self) -> usize {
        self.files.len()
    }

    fn label(&self, index: usize) -> String {
        self.files
            .get(index)
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("frame_{index:04}"))
    }

    fn load(&self, index: usize) -> Result<PixelPlane> {
        let path = self
            .files
            .get(index)
            .ok_or(StarphotError::FrameIndexOutOfRange {
                index,
                total: self.files.len(),
            })?;
        load_plane(path).map_err(|e| StarphotError::FrameDecodeFailed {
            index,
            reason: e.to_string(),
        })
    }
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Load an image file as a pixel plane in its native value scale
/// (0..255 for 8-bit, 0..65535 for 16-bit, as stored for float images).
/// Color images become RGB planes, everything else mono.
pub fn load_plane(path: &Path) -> Result<PixelPlane> {
    let img = image::open(path)?;
    Ok(plane_from_image(&img))
}

pub fn plane_from_image(img: &DynamicImage) -> PixelPlane {
    let (w, h) = (img.width() as usize, img.height() as usize);
    let color = img.color();

    if color.has_color() {
        let (mut red, mut green, mut blue) = (
            Array2::<f32>::zeros((h, w)),
            Array2::<f32>::zeros((h, w)),
            Array2::<f32>::zeros((h, w)),
        );
        let mut fill = |row: usize, col: usize, rgb: [f32; 3]| {
            red[[row, col]] = rgb[0];
            green[[row, col]] = rgb[1];
            blue[[row, col]] = rgb[2];
        };
        match color {
            ColorType::Rgb8 | ColorType::Rgba8 => {
                for (col, row, p) in img.to_rgb8().enumerate_pixels() {
                    fill(row as usize, col as usize, p.0.map(|v| v as f32));
                }
            }
            ColorType::Rgb16 | ColorType::Rgba16 => {
                for (col, row, p) in img.to_rgb16().enumerate_pixels() {
                    fill(row as usize, col as usize, p.0.map(|v| v as f32));
                }
            }
            _ => {
                for (col, row, p) in img.to_rgb32f().enumerate_pixels() {
                    fill(row as usize, col as usize, p.0);
                }
            }
        }
        return PixelPlane::Rgb { red, green, blue };
    }

    let mut data = Array2::<f32>::zeros((h, w));
    match color {
        ColorType::L8 | ColorType::La8 => {
            for (col, row, p) in img.to_luma8().enumerate_pixels() {
                data[[row as usize, col as usize]] = p.0[0] as f32;
            }
        }
        ColorType::L16 | ColorType::La16 => {
            for (col, row, p) in img.to_luma16().enumerate_pixels() {
                data[[row as usize, col as usize]] = p.0[0] as f32;
            }
        }
        _ => {
            for (col, row, p) in img.to_luma32f().enumerate_pixels() {
                data[[row as usize, col as usize]] = p.0[0];
            }
        }
    }
    PixelPlane::Mono(data)
}
