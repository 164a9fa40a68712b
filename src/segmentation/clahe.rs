use image::{GrayImage, Luma, RgbImage};

const HIST_SIZE: usize = 256;

/// Luma from RGB with ITU-R BT.601 weights in 14-bit fixed point.
/// (`to_luma8` uses BT.709 weights.)
pub fn to_intensity(image: &RgbImage) -> GrayImage {
    const R: u32 = 4899;
    const G: u32 = 9617;
    const B: u32 = 1868;
    const SHIFT: u32 = 14;

    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y);
        let v = (u32::from(p[0]) * R + u32::from(p[1]) * G + u32::from(p[2]) * B
            + (1 << (SHIFT - 1)))
            >> SHIFT;
        Luma([v.min(255) as u8])
    })
}

/// Contrast limited adaptive histogram equalization.
///
/// The image is split into `tiles` x `tiles` cells. Each cell gets an
/// equalization lookup table from its clipped histogram, and every output
/// pixel blends the tables of the four nearest cell centers.
///
/// When the size is not divisible by the grid, the image is extended on the
/// bottom and right by mirroring (without repeating the edge pixel) before
/// histograms are taken.
pub struct Clahe {
    clip_limit: f64,
    tiles: u32,
}

impl Clahe {
    pub fn new(clip_limit: f64, tiles: u32) -> Self {
        Self {
            clip_limit,
            tiles: tiles.max(1),
        }
    }

    pub fn apply(&self, src: &GrayImage) -> GrayImage {
        let _span = tracing::debug_span!("clahe").entered();

        let (width, height) = src.dimensions();
        if width == 0 || height == 0 {
            return src.clone();
        }

        let tiles = self.tiles;
        let padded;
        let source = if width % tiles == 0 && height % tiles == 0 {
            src
        } else {
            padded = reflect_pad(src, tiles - height % tiles, tiles - width % tiles);
            &padded
        };

        let tile_w = source.width() / tiles;
        let tile_h = source.height() / tiles;
        let luts = self.tile_luts(source, tile_w, tile_h);

        let inv_tw = 1.0 / tile_w as f32;
        let inv_th = 1.0 / tile_h as f32;
        let last = tiles as i64 - 1;
        let lut = |tx: i64, ty: i64| {
            let start = (ty as usize * tiles as usize + tx as usize) * HIST_SIZE;
            &luts[start..start + HIST_SIZE]
        };

        GrayImage::from_fn(width, height, |x, y| {
            let tyf = y as f32 * inv_th - 0.5;
            let ty1 = tyf.floor() as i64;
            let ya = tyf - ty1 as f32;
            let (ty1, ty2) = (ty1.max(0), (ty1 + 1).min(last));

            let txf = x as f32 * inv_tw - 0.5;
            let tx1 = txf.floor() as i64;
            let xa = txf - tx1 as f32;
            let (tx1, tx2) = (tx1.max(0), (tx1 + 1).min(last));

            let v = src.get_pixel(x, y)[0] as usize;
            let top = f32::from(lut(tx1, ty1)[v]) * (1.0 - xa) + f32::from(lut(tx2, ty1)[v]) * xa;
            let bottom = f32::from(lut(tx1, ty2)[v]) * (1.0 - xa) + f32::from(lut(tx2, ty2)[v]) * xa;
            Luma([saturate_u8(top * (1.0 - ya) + bottom * ya)])
        })
    }

    /// One 256-entry table per tile, row-major over the tile grid.
    fn tile_luts(&self, source: &GrayImage, tile_w: u32, tile_h: u32) -> Vec<u8> {
        let tiles = self.tiles;
        let tile_area = (tile_w * tile_h) as usize;
        let lut_scale = 255.0 / tile_area as f32;
        let clip = ((self.clip_limit * tile_area as f64 / HIST_SIZE as f64) as usize).max(1);

        let mut luts = vec![0u8; (tiles * tiles) as usize * HIST_SIZE];
        for ty in 0..tiles {
            for tx in 0..tiles {
                let mut hist = [0usize; HIST_SIZE];
                for y in ty * tile_h..(ty + 1) * tile_h {
                    for x in tx * tile_w..(tx + 1) * tile_w {
                        hist[source.get_pixel(x, y)[0] as usize] += 1;
                    }
                }

                if self.clip_limit > 0.0 {
                    clip_histogram(&mut hist, clip);
                }

                let base = ((ty * tiles + tx) as usize) * HIST_SIZE;
                let mut sum = 0usize;
                for (i, count) in hist.iter().enumerate() {
                    sum += count;
                    luts[base + i] = saturate_u8(sum as f32 * lut_scale);
                }
            }
        }
        luts
    }
}

/// Cap every bin at `clip` and spread the excess evenly, handing leftover
/// counts out at a fixed stride from the first bin.
fn clip_histogram(hist: &mut [usize; HIST_SIZE], clip: usize) {
    let mut clipped = 0;
    for bin in hist.iter_mut() {
        if *bin > clip {
            clipped += *bin - clip;
            *bin = clip;
        }
    }

    let batch = clipped / HIST_SIZE;
    let mut residual = clipped - batch * HIST_SIZE;
    for bin in hist.iter_mut() {
        *bin += batch;
    }

    if residual != 0 {
        let step = (HIST_SIZE / residual).max(1);
        let mut i = 0;
        while i < HIST_SIZE && residual > 0 {
            hist[i] += 1;
            i += step;
            residual -= 1;
        }
    }
}

/// Extend the image by `bottom` rows and `right` columns of mirrored content.
fn reflect_pad(src: &GrayImage, bottom: u32, right: u32) -> GrayImage {
    let (width, height) = src.dimensions();
    GrayImage::from_fn(width + right, height + bottom, |x, y| {
        *src.get_pixel(reflect_101(x, width), reflect_101(y, height))
    })
}

fn reflect_101(i: u32, len: u32) -> u32 {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let i = i % period;
    if i < len {
        i
    } else {
        period - i
    }
}

/// Round half to even and clamp into the byte range.
fn saturate_u8(v: f32) -> u8 {
    v.round_ties_even().clamp(0.0, 255.0) as u8
}
