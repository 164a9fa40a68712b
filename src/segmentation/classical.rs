use image::{GrayImage, Luma, RgbImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::morphology::{grayscale_dilate, grayscale_erode, Mask as StructuringElement};
use imageproc::point::Point as PixelPoint;
use imageproc::region_labelling::{connected_components, Connectivity};

use super::clahe::{to_intensity, Clahe};
use super::types::Mask;
use crate::geometry::{area_pixels, external_contours, Polygon};

/// Tuning for the intensity-based fallback extractor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassicalConfig {
    /// CLAHE clip limit, relative to a flat histogram.
    pub clahe_clip_limit: f64,
    /// CLAHE grid size along each axis.
    pub clahe_tiles: u32,
    /// Pixels darker than this are pavement candidates.
    pub threshold: u8,
    /// Width and height of the elliptical structuring element.
    pub kernel_size: u8,
    /// Erosions (then as many dilations) in the opening.
    pub open_iterations: u32,
    /// Dilations (then as many erosions) in the closing.
    pub close_iterations: u32,
    /// Outer contours enclosing less than this are dropped.
    pub min_contour_area_px: f64,
}

impl Default for ClassicalConfig {
    fn default() -> Self {
        Self {
            clahe_clip_limit: 2.0,
            clahe_tiles: 8,
            threshold: 100,
            kernel_size: 7,
            open_iterations: 2,
            close_iterations: 3,
            min_contour_area_px: 500.0,
        }
    }
}

/// Derives pavement masks from pixel intensity alone.
///
/// Assumes pavement is darker than its surroundings. Used when no learned
/// segmenter is loaded or the model finds nothing.
pub struct ClassicalExtractor {
    config: ClassicalConfig,
    clahe: Clahe,
    element: StructuringElement,
}

impl ClassicalExtractor {
    pub fn new(config: ClassicalConfig) -> Self {
        let size = config.kernel_size.max(1);
        let element = StructuringElement::from_image(&elliptical_kernel(size), size / 2, size / 2);

        Self {
            config,
            clahe: Clahe::new(config.clahe_clip_limit, config.clahe_tiles),
            element,
        }
    }

    /// One mask per connected pavement region, in label order. Returns an
    /// empty list when nothing survives the contour area filter.
    pub fn extract(&self, image: &RgbImage) -> Vec<Mask> {
        let _span = tracing::debug_span!("classical_extract").entered();

        let gray = to_intensity(image);
        let equalized = self.clahe.apply(&gray);
        let binary = self.binarize(&equalized);
        let cleaned = self.clean(binary);
        let filled = self.fill_large_contours(&cleaned);
        let masks = split_components(&filled);

        tracing::debug!("Classical extractor produced {} mask(s)", masks.len());
        masks
    }

    /// Inverse binary threshold: dark pixels become foreground.
    fn binarize(&self, gray: &GrayImage) -> GrayImage {
        let threshold = self.config.threshold;
        GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            if gray.get_pixel(x, y)[0] < threshold {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    /// Opening removes specks, closing fills small gaps. Each repeats the
    /// primitive `n` times before switching to its counterpart.
    fn clean(&self, binary: GrayImage) -> GrayImage {
        let mut img = binary;
        for _ in 0..self.config.open_iterations {
            img = grayscale_erode(&img, &self.element);
        }
        for _ in 0..self.config.open_iterations {
            img = grayscale_dilate(&img, &self.element);
        }
        for _ in 0..self.config.close_iterations {
            img = grayscale_dilate(&img, &self.element);
        }
        for _ in 0..self.config.close_iterations {
            img = grayscale_erode(&img, &self.element);
        }
        img
    }

    /// Rasterize every sufficiently large outer contour as a filled shape.
    /// Holes inside a kept contour are filled too.
    fn fill_large_contours(&self, cleaned: &GrayImage) -> GrayImage {
        let mut filled = GrayImage::new(cleaned.width(), cleaned.height());

        let mut kept = 0;
        for contour in external_contours(cleaned) {
            if area_pixels(&contour) < self.config.min_contour_area_px {
                continue;
            }
            let outline = pixel_outline(&contour);
            if outline.len() < 3 {
                continue;
            }
            draw_polygon_mut(&mut filled, &outline, Luma([255u8]));
            kept += 1;
        }

        tracing::debug!("Kept {} contour(s) above {} px", kept, self.config.min_contour_area_px);
        filled
    }
}

impl Default for ClassicalExtractor {
    fn default() -> Self {
        Self::new(ClassicalConfig::default())
    }
}

/// Filled ellipse inscribed in a `size` x `size` box.
fn elliptical_kernel(size: u8) -> GrayImage {
    let size = u32::from(size);
    let r = (size / 2) as i64;
    let c = (size / 2) as f64;
    let inv_r2 = if r > 0 { 1.0 / (r * r) as f64 } else { 0.0 };

    let mut kernel = GrayImage::new(size, size);
    for i in 0..size {
        let dy = i as i64 - r;
        if dy.abs() > r {
            continue;
        }
        let dx = (c * (((r * r - dy * dy) as f64) * inv_r2).sqrt()).round_ties_even() as i64;
        let j1 = (r - dx).max(0);
        let j2 = (r + dx + 1).min(size as i64);
        for j in j1..j2 {
            kernel.put_pixel(j as u32, i, Luma([255]));
        }
    }
    kernel
}

/// Integer vertices for `draw_polygon_mut`, which rejects an explicitly
/// closed path.
fn pixel_outline(contour: &Polygon) -> Vec<PixelPoint<i32>> {
    let mut points: Vec<PixelPoint<i32>> = contour
        .points()
        .iter()
        .map(|p| PixelPoint::new(p.x as i32, p.y as i32))
        .collect();
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

/// Split a binary image into one mask per 8-connected component.
fn split_components(binary: &GrayImage) -> Vec<Mask> {
    let (width, height) = binary.dimensions();
    let labels = connected_components(binary, Connectivity::Eight, Luma([0u8]));
    let count = labels.pixels().map(|p| p[0]).max().unwrap_or(0) as usize;

    let mut masks: Vec<Mask> = (0..count).map(|_| Mask::new(width, height)).collect();
    for (x, y, label) in labels.enumerate_pixels() {
        if label[0] > 0 {
            masks[label[0] as usize - 1].set(x, y, true);
        }
    }

    masks.into_iter().filter(|m| !m.is_blank()).collect()
}
