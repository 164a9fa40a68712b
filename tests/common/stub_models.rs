use anyhow::{bail, Result};
use image::RgbImage;
use pavement_area::{Mask, SegmentationModel, Segmenter};

/// Returns the same masks for every image.
pub struct FixedMasks {
    masks: Vec<Mask>,
}

impl SegmentationModel for FixedMasks {
    fn infer(&mut self, _image: &RgbImage) -> Result<Vec<Mask>> {
        Ok(self.masks.clone())
    }

    fn name(&self) -> &str {
        "fixed"
    }

    fn input_size(&self) -> (u32, u32) {
        (640, 640)
    }
}

/// Always fails, like a model whose runtime crashed mid-inference.
pub struct Broken;

impl SegmentationModel for Broken {
    fn infer(&mut self, _image: &RgbImage) -> Result<Vec<Mask>> {
        bail!("inference session crashed")
    }

    fn name(&self) -> &str {
        "broken"
    }

    fn input_size(&self) -> (u32, u32) {
        (640, 640)
    }
}

pub fn fixed(masks: Vec<Mask>) -> Segmenter {
    Segmenter::Available(Box::new(FixedMasks { masks }))
}

pub fn broken() -> Segmenter {
    Segmenter::Available(Box::new(Broken))
}
