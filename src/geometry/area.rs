use super::types::Polygon;
use crate::error::PipelineError;

/// Square meters per square foot.
pub const SQFT_TO_SQM: f64 = 0.092903;

/// Linear image scale: how many pixels span one real-world foot.
///
/// Pixels are assumed square and uniform across the image; there is no
/// perspective correction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelsPerFoot(f64);

impl PixelsPerFoot {
    /// Validate a caller-supplied scale. Zero, negative and non-finite values
    /// are input errors.
    pub fn new(value: f64) -> Result<Self, PipelineError> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(PipelineError::InvalidScale(value))
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

/// Planar area of the polygon in square pixels.
///
/// Shoelace formula over consecutive vertex pairs, wrapping last to first.
/// Exact for any simple polygon in either winding order.
pub fn area_pixels(polygon: &Polygon) -> f64 {
    let points = polygon.points();
    if points.len() < 3 {
        return 0.0;
    }

    let n = points.len();
    let twice_signed: f64 = (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum();

    (twice_signed * 0.5).abs()
}

/// Convert a pixel area to square feet. `None` means the scale, and therefore
/// the real-world area, is unknown; it is not the same as zero.
pub fn area_real_units(area_px: f64, pixels_per_foot: Option<PixelsPerFoot>) -> Option<f64> {
    pixels_per_foot.map(|ppf| area_px / (ppf.get() * ppf.get()))
}
