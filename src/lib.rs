//! Pavement surface-area measurement from raster images.
//!
//! An image is segmented into candidate pavement masks (by a learned model
//! when one is loaded, otherwise by an intensity-based classical extractor).
//! Each mask is traced to a boundary polygon, simplified, filtered for noise
//! and measured in square pixels and, given a pixels-per-foot scale, in
//! square feet.
//!
//! ```no_run
//! use pavement_area::input::{FileSource, ImageSource};
//! use pavement_area::{AreaPipeline, PixelsPerFoot, Segmenter};
//!
//! # fn main() -> Result<(), pavement_area::PipelineError> {
//! let image = FileSource::new("lot.png").load()?;
//! let mut segmenter = Segmenter::Unavailable;
//! let scale = PixelsPerFoot::new(12.5)?;
//!
//! let result = AreaPipeline::default().measure(&image, &mut segmenter, Some(scale))?;
//! println!("{} regions, {:.1} sq ft", result.regions.len(), result.total_area_sqft);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod geometry;
pub mod input;
pub mod output;
pub mod pipeline;
pub mod segmentation;

pub use error::{ErrorKind, PipelineError};
pub use geometry::{PixelsPerFoot, Point, Polygon};
pub use pipeline::{AreaPipeline, MeasuredArea, PipelineConfig, PipelineResult};
pub use segmentation::{Mask, SegmentationModel, Segmenter};
