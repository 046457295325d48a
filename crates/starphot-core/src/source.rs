//! Frame input and result output seams.

use crate::error::{Result, StarphotError};
use crate::frame::PixelPlane;
use crate::session::{PhotometryResult, SessionReport};

/// An ordered, index-addressable sequence of decoded frames.
pub trait FrameSource: Send {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Human-readable name of a frame, used in records.
    fn label(&self, index: usize) -> String {
        format!("frame_{index:04}")
    }

    /// Decode one frame. Decode problems are reported as
    /// [`StarphotError::FrameDecodeFailed`].
    fn load(&self, index: usize) -> Result<PixelPlane>;
}

/// Consumer of the results of a stopped session.
pub trait ResultSink {
    fn accept(&mut self, result: &PhotometryResult) -> Result<()>;

    fn finish(&mut self, _report: &SessionReport) -> Result<()> {
        Ok(())
    }
}

/// Frames held in memory. `None` entries fail to decode.
#[derive(Clone, Debug, Default)]
pub struct InMemorySource {
    frames: Vec<Option<PixelPlane>>,
    labels: Vec<String>,
}

impl InMemorySource {
    pub fn new(frames: Vec<PixelPlane>) -> Self {
        Self::with_failures(frames.into_iter().map(Some).collect())
    }

    pub fn with_failures(frames: Vec<Option<PixelPlane>>) -> Self {
        let labels = (0..frames.len()).map(|i| format!("frame_{i:04}")).collect();
        Self { frames, labels }
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        for (slot, label) in self.labels.iter_mut().zip(labels) {
            *slot = label;
        }
        self
    }

    pub fn push(&mut self, frame: PixelPlane) {
        self.labels.push(format!("frame_{:04}", self.frames.len()));
        self.frames.push(Some(frame));
    }
}

impl FrameSource for InMemorySource {
    fn len(&self) -> usize {
        self.frames.len()
    }

    fn label(&self, index: usize) -> String {
        self.labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("frame_{index:04}"))
    }

    fn load(&self, index: usize) -> Result<PixelPlane> {
        match self.frames.get(index) {
            Some(Some(plane)) => Ok(plane.clone()),
            Some(None) => Err(StarphotError::FrameDecodeFailed {
                index,
                reason: "frame data unavailable".into(),
            }),
            None => Err(StarphotError::FrameIndexOutOfRange {
                index,
                total: self.frames.len(),
            }),
        }
    }
}

/// Sink that keeps everything it receives.
#[derive(Clone, Debug, Default)]
pub struct VecSink {
    pub results: Vec<PhotometryResult>,
    pub report: Option<SessionReport>,
}

impl ResultSink for VecSink {
    fn accept(&mut self, result: &PhotometryResult) -> Result<()> {
        self.results.push(result.clone());
        Ok(())
    }

    fn finish(&mut self, report: &SessionReport) -> Result<()> {
        self.report = Some(report.clone());
        Ok(())
    }
}
