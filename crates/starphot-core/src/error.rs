use thiserror::Error;

#[derive(Error, Debug)]
pub enum StarphotError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Frame {index} could not be decoded: {reason}")]
    FrameDecodeFailed { index: usize, reason: String },

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("No anchor position for the first frame")]
    AnchorMissing,

    #[error("Invalid aperture: {0}")]
    InvalidAperture(String),

    #[error("Frame index {index} out of range (total: {total})")]
    FrameIndexOutOfRange { index: usize, total: usize },

    #[error("Empty frame sequence")]
    EmptySequence,

    #[error("Cannot {operation} while session is {mode}")]
    InvalidState {
        operation: &'static str,
        mode: String,
    },

    #[error("No decision is pending")]
    NoPendingDecision,

    #[error("Session has been stopped and is read-only")]
    SessionFrozen,

    #[error("Result sink error: {0}")]
    Sink(String),

    #[error("Worker error: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, StarphotError>;
