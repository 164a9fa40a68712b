mod area;
mod boundary;
mod simplify;
pub mod types;

pub use area::{area_pixels, area_real_units, PixelsPerFoot, SQFT_TO_SQM};
pub use boundary::{external_contours, extract_boundary};
pub use simplify::{simplify, DEFAULT_EPSILON_RATIO};
pub use types::{Point, Polygon};
