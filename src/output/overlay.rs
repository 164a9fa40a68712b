use super::ResultSink;
use crate::pipeline::PipelineResult;
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use std::path::{Path, PathBuf};

const OUTLINE: Rgb<u8> = Rgb([255, 64, 0]);

/// Draw every region outline on a copy of the source image
pub fn render_overlay(image: &RgbImage, result: &PipelineResult) -> RgbImage {
    let mut canvas = image.clone();

    for region in &result.regions {
        let points = region.coordinates.points();
        for (i, a) in points.iter().enumerate() {
            let b = points[(i + 1) % points.len()];
            draw_line_segment_mut(
                &mut canvas,
                (a.x as f32, a.y as f32),
                (b.x as f32, b.y as f32),
                OUTLINE,
            );
        }
    }

    canvas
}

/// Saves the outline overlay as an image file for visual inspection
pub struct OverlayWriter {
    path: PathBuf,
}

impl OverlayWriter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ResultSink for OverlayWriter {
    fn write_result(&mut self, image: &RgbImage, result: &PipelineResult) -> Result<()> {
        render_overlay(image, result)
            .save(&self.path)
            .with_context(|| format!("Failed to save overlay to {}", self.path.display()))?;

        tracing::info!("Overlay written to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::pipeline::{Condition, MaskSource, MeasuredArea};

    #[test]
    fn outlines_are_drawn_on_a_copy() {
        let image = RgbImage::from_pixel(40, 40, Rgb([0, 0, 0]));
        let square = [(5.0, 5.0), (30.0, 5.0), (30.0, 30.0), (5.0, 30.0)];
        let result = PipelineResult {
            regions: vec![MeasuredArea {
                id: "area_1".to_string(),
                coordinates: square.into_iter().map(Point::from).collect(),
                area_px: 625.0,
                area_sqft: None,
                area_sqm: None,
                condition: Condition::Good,
            }],
            total_area_sqft: 0.0,
            total_area_sqm: 0.0,
            unknown_area_regions: 1,
            condition: Condition::Good,
            confidence_score: 60,
            mask_source: MaskSource::Classical,
        };

        let overlay = render_overlay(&image, &result);
        assert_eq!(*overlay.get_pixel(15, 5), OUTLINE);
        assert_eq!(*overlay.get_pixel(5, 20), OUTLINE);
        assert_eq!(*overlay.get_pixel(15, 15), Rgb([0, 0, 0]));
        assert_eq!(*image.get_pixel(15, 5), Rgb([0, 0, 0]));
    }
}
