//! Live frame display collaborator.
//!
//! Purely a side-effecting sink: the pipeline pushes each ingested frame to
//! a viewer so the operator can eyeball it while measurements run. Display
//! problems are logged and swallowed; a dead viewer must never stall the
//! night's processing.

use std::path::Path;
use std::process::Command;

/// Intensity scaling requested from the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleMode {
    /// IRAF-style zscale stretch
    #[default]
    ZScale,
    /// Linear min/max
    MinMax,
    /// Logarithmic stretch
    Log,
}

impl ScaleMode {
    fn as_arg(&self) -> &'static str {
        match self {
            ScaleMode::ZScale => "zscale",
            ScaleMode::MinMax => "minmax",
            ScaleMode::Log => "log",
        }
    }
}

/// The display seam. Implementations must be infallible from the pipeline's
/// point of view: report problems through logging, not errors.
pub trait FrameDisplay {
    fn show(&mut self, frame_path: &Path, scale: ScaleMode);
}

impl<T: FrameDisplay + ?Sized> FrameDisplay for Box<T> {
    fn show(&mut self, frame_path: &Path, scale: ScaleMode) {
        (**self).show(frame_path, scale)
    }
}

/// Pushes frames to a running DS9 instance over XPA (`xpaset`).
pub struct XpaDisplay {
    /// XPA access point, normally `ds9`
    pub target: String,
}

impl XpaDisplay {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    fn xpaset(&self, args: &[String]) {
        let result = Command::new("xpaset")
            .arg("-p")
            .arg(&self.target)
            .args(args)
            .status();
        match result {
            Ok(status) if status.success() => {}
            Ok(status) => log::warn!("xpaset {:?} exited with {status}", args),
            Err(e) => log::warn!("failed to run xpaset: {e}"),
        }
    }
}

impl FrameDisplay for XpaDisplay {
    fn show(&mut self, frame_path: &Path, scale: ScaleMode) {
        self.xpaset(&["file".to_string(), frame_path.display().to_string()]);
        self.xpaset(&["scale".to_string(), scale.as_arg().to_string()]);
    }
}

/// Sink for headless operation and tests.
#[derive(Debug, Default)]
pub struct NullDisplay;

impl FrameDisplay for NullDisplay {
    fn show(&mut self, frame_path: &Path, _scale: ScaleMode) {
        log::debug!("display suppressed for {}", frame_path.display());
    }
}
