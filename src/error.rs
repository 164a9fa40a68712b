use std::path::PathBuf;

/// Broad category of a [`PipelineError`].
///
/// Input errors are detected before any segmentation runs and never carry a
/// partial result. Processing errors come from mask acquisition or region
/// geometry and are distinct from a legitimate "nothing found" result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    Processing,
}

/// Errors that can occur while measuring pavement regions.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The image source could not be read.
    #[error("failed to read image from {path:?}: {source}")]
    ReadImage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The image bytes could not be decoded.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The image payload was empty or has a zero dimension.
    #[error("input image is empty")]
    EmptyImage,

    /// The pixels-per-foot scale was not a positive finite number.
    #[error("invalid pixels-per-foot scale: {0}")]
    InvalidScale(f64),

    /// The learned segmenter failed while producing masks.
    #[error("mask acquisition failed: {0:#}")]
    MaskAcquisition(#[source] anyhow::Error),

    /// A mask does not cover the same grid as the source image.
    #[error("mask {index} is {actual:?}, expected {expected:?}")]
    MaskDimensions {
        index: usize,
        actual: (u32, u32),
        expected: (u32, u32),
    },

    /// Region geometry produced a NaN or infinite area.
    #[error("region from mask {index} produced a non-finite area")]
    NonFiniteArea { index: usize },
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ReadImage { .. }
            | Self::ImageDecode(_)
            | Self::EmptyImage
            | Self::InvalidScale(_) => ErrorKind::Input,
            Self::MaskAcquisition(_) | Self::MaskDimensions { .. } | Self::NonFiniteArea { .. } => {
                ErrorKind::Processing
            }
        }
    }
}
