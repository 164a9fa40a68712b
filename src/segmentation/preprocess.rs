use anyhow::Result;
use image::{imageops, GrayImage, Luma, RgbImage};
use ndarray::{Array4, ArrayView2};

use super::types::Mask;

/// Preprocessor for converting RGB images to model input tensors
pub struct Preprocessor {
    target_width: u32,
    target_height: u32,
}

impl Preprocessor {
    pub fn new(target_width: u32, target_height: u32) -> Self {
        Self {
            target_width,
            target_height,
        }
    }

    /// Preprocess an RGB image into a normalized NCHW tensor
    ///
    /// Steps:
    /// 1. Resize to target dimensions (aspect ratio is not preserved)
    /// 2. Convert to float and normalize to [0, 1]
    /// 3. Transpose from HWC to NCHW format
    ///
    /// Returns: Array4<f32> with shape [1, 3, height, width]
    pub fn preprocess(&self, image: &RgbImage) -> Result<Array4<f32>> {
        let _span = tracing::debug_span!("preprocess").entered();

        let resized = if image.dimensions() != (self.target_width, self.target_height) {
            imageops::resize(
                image,
                self.target_width,
                self.target_height,
                imageops::FilterType::Triangle,
            )
        } else {
            image.clone()
        };

        let (width, height) = resized.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

        for (x, y, pixel) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            tensor[[0, 0, y, x]] = f32::from(pixel[0]) / 255.0;
            tensor[[0, 1, y, x]] = f32::from(pixel[1]) / 255.0;
            tensor[[0, 2, y, x]] = f32::from(pixel[2]) / 255.0;
        }

        Ok(tensor)
    }

    /// Upsample a probability map to the frame and binarize it
    ///
    /// # Arguments
    /// * `probabilities` - Per-pixel foreground probability at model resolution
    /// * `target_width` - Desired output width
    /// * `target_height` - Desired output height
    /// * `threshold` - Probability above which a pixel is foreground
    ///
    /// Returns: Mask at the target dimensions
    pub fn postprocess_mask(
        probabilities: ArrayView2<f32>,
        target_width: u32,
        target_height: u32,
        threshold: f32,
    ) -> Mask {
        let _span = tracing::debug_span!("postprocess").entered();

        let (rows, cols) = probabilities.dim();
        let gray = GrayImage::from_fn(cols as u32, rows as u32, |x, y| {
            let value = (probabilities[[y as usize, x as usize]] * 255.0).clamp(0.0, 255.0) as u8;
            Luma([value])
        });

        let resized = if gray.dimensions() != (target_width, target_height) {
            imageops::resize(
                &gray,
                target_width,
                target_height,
                imageops::FilterType::Triangle,
            )
        } else {
            gray
        };

        let cutoff = (threshold * 255.0).clamp(0.0, 255.0) as u8;
        Mask::from_fn(target_width, target_height, |x, y| {
            resized.get_pixel(x, y)[0] > cutoff
        })
    }
}
