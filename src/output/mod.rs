mod overlay;
mod report;

pub use overlay::{render_overlay, OverlayWriter};
pub use report::JsonReport;

use crate::pipeline::PipelineResult;
use anyhow::Result;
use image::RgbImage;

/// Trait for destinations of a measurement result
pub trait ResultSink {
    /// Emit the result measured from `image`
    fn write_result(&mut self, image: &RgbImage, result: &PipelineResult) -> Result<()>;
}
