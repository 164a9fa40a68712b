use anyhow::Result;
use image::{GrayImage, Luma, RgbImage};

const FOREGROUND: Luma<u8> = Luma([255]);
const BACKGROUND: Luma<u8> = Luma([0]);

/// Binary foreground/background grid covering one candidate region.
///
/// Stored as a grayscale image holding only 0 and 255 so it can be handed
/// straight to `imageproc` routines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask(GrayImage);

impl Mask {
    /// An all-background mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self(GrayImage::new(width, height))
    }

    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> bool) -> Self {
        Self(GrayImage::from_fn(width, height, |x, y| {
            if f(x, y) {
                FOREGROUND
            } else {
                BACKGROUND
            }
        }))
    }

    /// Any nonzero pixel becomes foreground.
    pub fn from_gray(image: GrayImage) -> Self {
        let mut image = image;
        for p in image.pixels_mut() {
            *p = if p[0] > 0 { FOREGROUND } else { BACKGROUND };
        }
        Self(image)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.0.get_pixel(x, y)[0] > 0
    }

    pub fn set(&mut self, x: u32, y: u32, foreground: bool) {
        let value = if foreground { FOREGROUND } else { BACKGROUND };
        self.0.put_pixel(x, y, value);
    }

    pub fn foreground_count(&self) -> usize {
        self.0.pixels().filter(|p| p[0] > 0).count()
    }

    /// True when the mask has no foreground pixels.
    pub fn is_blank(&self) -> bool {
        self.0.pixels().all(|p| p[0] == 0)
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.0
    }
}

/// A learned instance segmenter.
/// Allows swapping between different backends (YOLO-seg, SAM, ...)
pub trait SegmentationModel: Send {
    /// Produce one mask per detected pavement instance.
    ///
    /// # Arguments
    /// * `image` - Input RGB image
    ///
    /// # Returns
    /// * Masks at the input image's dimensions, in detection order. An empty
    ///   list means the model found nothing.
    fn infer(&mut self, image: &RgbImage) -> Result<Vec<Mask>>;

    /// Human readable model identifier, used in logs and reports.
    fn name(&self) -> &str;

    /// Get the model's preferred input dimensions
    ///
    /// Returns (width, height)
    fn input_size(&self) -> (u32, u32);
}

/// The learned segmenter slot: either a loaded model or nothing.
///
/// Built once at startup and lent to every pipeline invocation.
pub enum Segmenter {
    Unavailable,
    Available(Box<dyn SegmentationModel>),
}

impl Segmenter {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Unavailable => "none",
            Self::Available(model) => model.name(),
        }
    }
}

impl std::fmt::Debug for Segmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => f.write_str("Unavailable"),
            Self::Available(model) => f.debug_tuple("Available").field(&model.name()).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_gray_binarizes_nonzero_pixels() {
        let gray = GrayImage::from_fn(4, 1, |x, _| Luma([x as u8 * 40]));
        let mask = Mask::from_gray(gray);
        assert!(!mask.is_foreground(0, 0));
        assert!(mask.is_foreground(1, 0));
        assert_eq!(mask.as_image().get_pixel(3, 0)[0], 255);
        assert_eq!(mask.foreground_count(), 3);
    }

    #[test]
    fn new_mask_is_blank() {
        let mut mask = Mask::new(8, 8);
        assert!(mask.is_blank());
        mask.set(2, 3, true);
        assert!(!mask.is_blank());
        assert_eq!(mask.foreground_count(), 1);
    }

    #[test]
    fn unavailable_segmenter_reports_no_name() {
        let segmenter = Segmenter::Unavailable;
        assert!(!segmenter.is_available());
        assert_eq!(segmenter.name(), "none");
    }
}
