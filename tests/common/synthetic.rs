use image::{Rgb, RgbImage};
use pavement_area::Mask;

pub const ASPHALT: Rgb<u8> = Rgb([35, 38, 40]);
pub const CONCRETE: Rgb<u8> = Rgb([215, 212, 205]);

/// Axis-aligned rectangle: (x, y, width, height).
pub type Rect = (u32, u32, u32, u32);

fn inside(rects: &[Rect], x: u32, y: u32) -> bool {
    rects
        .iter()
        .any(|&(rx, ry, rw, rh)| x >= rx && x < rx + rw && y >= ry && y < ry + rh)
}

/// Bright surface with dark pavement rectangles painted on it.
pub fn lot_image(width: u32, height: u32, pavement: &[Rect]) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        if inside(pavement, x, y) {
            ASPHALT
        } else {
            CONCRETE
        }
    })
}

pub fn bright_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, CONCRETE)
}

pub fn rect_mask(width: u32, height: u32, rects: &[Rect]) -> Mask {
    Mask::from_fn(width, height, |x, y| inside(rects, x, y))
}

pub fn disk_mask(width: u32, height: u32, cx: f64, cy: f64, radius: f64) -> Mask {
    Mask::from_fn(width, height, |x, y| {
        let dx = f64::from(x) - cx;
        let dy = f64::from(y) - cy;
        dx * dx + dy * dy <= radius * radius
    })
}
