use image::RgbImage;
use rayon::prelude::*;
use serde::Serialize;

use crate::error::PipelineError;
use crate::geometry::{
    area_pixels, area_real_units, extract_boundary, simplify, PixelsPerFoot, Polygon,
    DEFAULT_EPSILON_RATIO, SQFT_TO_SQM,
};
use crate::segmentation::{ClassicalConfig, ClassicalExtractor, Mask, Segmenter};

/// Confidence reported when at least one region was measured.
const REGION_CONFIDENCE: u8 = 60;

/// Knobs for a measurement run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    /// Simplification tolerance in percent of each polygon's perimeter.
    pub epsilon_ratio: f64,
    /// Regions with a smaller simplified area are treated as noise.
    pub min_region_area_px: f64,
    pub classical: ClassicalConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            epsilon_ratio: DEFAULT_EPSILON_RATIO,
            min_region_area_px: 1000.0,
            classical: ClassicalConfig::default(),
        }
    }
}

/// Coarse qualitative label for a region or a whole result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Condition {
    Good,
    Unknown,
}

/// Which producer supplied the masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskSource {
    Learned,
    Classical,
    None,
}

/// One measured pavement region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasuredArea {
    /// `area_<n>`, where n is the 1-based position of the source mask.
    pub id: String,
    /// Simplified boundary.
    pub coordinates: Polygon,
    pub area_px: f64,
    /// `None` when no pixels-per-foot scale was supplied.
    pub area_sqft: Option<f64>,
    pub area_sqm: Option<f64>,
    pub condition: Condition,
}

/// Everything measured in one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResult {
    /// Regions in source-mask order.
    pub regions: Vec<MeasuredArea>,
    /// Sum over regions with a known area.
    pub total_area_sqft: f64,
    pub total_area_sqm: f64,
    /// Regions left out of the totals because their area is unknown.
    pub unknown_area_regions: usize,
    pub condition: Condition,
    pub confidence_score: u8,
    pub mask_source: MaskSource,
}

impl PipelineResult {
    fn empty() -> Self {
        Self {
            regions: Vec::new(),
            total_area_sqft: 0.0,
            total_area_sqm: 0.0,
            unknown_area_regions: 0,
            condition: Condition::Unknown,
            confidence_score: 0,
            mask_source: MaskSource::None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Image to measured regions: masks, then polygons, then areas.
///
/// Holds no per-image state; one instance can serve any number of runs.
pub struct AreaPipeline {
    config: PipelineConfig,
    classical: ClassicalExtractor,
}

impl AreaPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            classical: ClassicalExtractor::new(config.classical),
            config,
        }
    }

    /// Measure pavement in `image`.
    ///
    /// Masks come from the learned segmenter when it is available and finds
    /// something, otherwise from the classical extractor. Finding nothing is
    /// an empty result, not an error; segmenter failures and bad masks are
    /// processing errors.
    pub fn measure(
        &self,
        image: &RgbImage,
        segmenter: &mut Segmenter,
        pixels_per_foot: Option<PixelsPerFoot>,
    ) -> Result<PipelineResult, PipelineError> {
        let _span = tracing::debug_span!("measure").entered();

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(PipelineError::EmptyImage);
        }

        let (masks, source) = self.acquire_masks(image, segmenter)?;
        if masks.is_empty() {
            tracing::info!("No pavement masks found");
            return Ok(PipelineResult::empty());
        }

        let regions: Vec<Option<MeasuredArea>> = masks
            .par_iter()
            .enumerate()
            .map(|(index, mask)| self.measure_mask(index, mask, (width, height), pixels_per_foot))
            .collect::<Result<_, _>>()?;
        let regions: Vec<MeasuredArea> = regions.into_iter().flatten().collect();

        let result = assemble(regions, source);
        tracing::info!(
            "Measured {} region(s) from {} {:?} mask(s), total {:.1} sq ft",
            result.regions.len(),
            masks.len(),
            source,
            result.total_area_sqft
        );
        Ok(result)
    }

    fn acquire_masks(
        &self,
        image: &RgbImage,
        segmenter: &mut Segmenter,
    ) -> Result<(Vec<Mask>, MaskSource), PipelineError> {
        if let Segmenter::Available(model) = segmenter {
            let masks = model.infer(image).map_err(PipelineError::MaskAcquisition)?;
            if !masks.is_empty() {
                tracing::debug!("{} returned {} mask(s)", model.name(), masks.len());
                return Ok((masks, MaskSource::Learned));
            }
            tracing::debug!("{} found nothing, falling back to classical extraction", model.name());
        }

        let masks = self.classical.extract(image);
        let source = if masks.is_empty() {
            MaskSource::None
        } else {
            MaskSource::Classical
        };
        Ok((masks, source))
    }

    /// Boundary, simplification and area for one mask. `None` when the mask
    /// is degenerate or smaller than the noise floor.
    fn measure_mask(
        &self,
        index: usize,
        mask: &Mask,
        expected: (u32, u32),
        pixels_per_foot: Option<PixelsPerFoot>,
    ) -> Result<Option<MeasuredArea>, PipelineError> {
        let _span = tracing::debug_span!("region", index).entered();

        if mask.dimensions() != expected {
            return Err(PipelineError::MaskDimensions {
                index,
                actual: mask.dimensions(),
                expected,
            });
        }

        let boundary = extract_boundary(mask);
        if !boundary.is_valid() {
            tracing::debug!("Mask {} has no usable boundary", index);
            return Ok(None);
        }

        let polygon = simplify(&boundary, self.config.epsilon_ratio);
        let area_px = area_pixels(&polygon);
        if !area_px.is_finite() {
            return Err(PipelineError::NonFiniteArea { index });
        }
        if area_px < self.config.min_region_area_px {
            tracing::debug!("Mask {} dropped as noise ({:.0} px)", index, area_px);
            return Ok(None);
        }

        let area_sqft = area_real_units(area_px, pixels_per_foot);
        Ok(Some(MeasuredArea {
            id: format!("area_{}", index + 1),
            coordinates: polygon,
            area_px,
            area_sqft,
            area_sqm: area_sqft.map(|sqft| sqft * SQFT_TO_SQM),
            condition: Condition::Good,
        }))
    }
}

impl Default for AreaPipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

fn assemble(regions: Vec<MeasuredArea>, source: MaskSource) -> PipelineResult {
    let total_area_sqft = regions.iter().filter_map(|r| r.area_sqft).fold(0.0, |a, b| a + b);
    let unknown_area_regions = regions.iter().filter(|r| r.area_sqft.is_none()).count();
    let found = !regions.is_empty();

    PipelineResult {
        regions,
        total_area_sqft,
        total_area_sqm: total_area_sqft * SQFT_TO_SQM,
        unknown_area_regions,
        condition: if found { Condition::Good } else { Condition::Unknown },
        confidence_score: if found { REGION_CONFIDENCE } else { 0 },
        mask_source: source,
    }
}
