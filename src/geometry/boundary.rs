use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};

use super::area::area_pixels;
use super::types::{Point, Polygon};
use crate::segmentation::Mask;

/// Outer boundaries of every top-level foreground blob in a binary image.
///
/// Nested borders (holes, and blobs inside holes) are dropped. Each boundary
/// lists its pixel centers in border-following order.
///
/// Border following needs background on every side of a blob, otherwise a
/// blob touching the image edge is reported as a hole. The image is framed
/// with one background pixel before tracing and points are shifted back.
pub fn external_contours(binary: &GrayImage) -> Vec<Polygon> {
    let (width, height) = binary.dimensions();
    let mut framed = GrayImage::new(width + 2, height + 2);
    image::imageops::replace(&mut framed, binary, 1, 1);

    find_contours::<i32>(&framed)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| {
            c.points
                .into_iter()
                .map(|p| Point::new(f64::from(p.x - 1), f64::from(p.y - 1)))
                .collect()
        })
        .collect()
}

/// Unsimplified outer boundary of a mask.
///
/// A mask with several disconnected blobs yields the boundary enclosing the
/// largest area; ties keep the first blob found. An empty mask yields an
/// empty polygon.
pub fn extract_boundary(mask: &Mask) -> Polygon {
    let mut best: Option<(f64, Polygon)> = None;

    for contour in external_contours(mask.as_image()) {
        let area = area_pixels(&contour);
        match &best {
            Some((best_area, _)) if *best_area >= area => {}
            _ => best = Some((area, contour)),
        }
    }

    best.map(|(_, polygon)| polygon).unwrap_or_default()
}
