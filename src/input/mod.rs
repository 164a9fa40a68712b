mod decode;

pub use decode::{decode_image, BytesSource, FileSource};

use crate::error::PipelineError;
use image::RgbImage;

/// Trait for image sources feeding the pipeline
pub trait ImageSource {
    /// Load and decode the image. Failures here are input errors.
    fn load(&mut self) -> Result<RgbImage, PipelineError>;

    /// Short description for logs
    fn describe(&self) -> String;
}
