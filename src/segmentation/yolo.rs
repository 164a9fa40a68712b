use super::preprocess::Preprocessor;
use super::types::{Mask, SegmentationModel};
use anyhow::{bail, Context, Result};
use image::RgbImage;
use ndarray::{s, Array1, Array2, ArrayView2, ArrayView3, Axis};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;

/// Post-processing thresholds for instance segmentation output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YoloConfig {
    /// Square model input edge in pixels.
    pub input_size: u32,
    /// Minimum best-class score for a detection to be kept.
    pub confidence: f32,
    /// Detections overlapping a stronger one above this IoU are dropped.
    pub iou_threshold: f32,
    /// Probability above which a mask pixel is foreground.
    pub mask_threshold: f32,
}

impl Default for YoloConfig {
    fn default() -> Self {
        Self {
            input_size: 640,
            confidence: 0.25,
            iou_threshold: 0.7,
            mask_threshold: 0.5,
        }
    }
}

/// YOLOv8-seg style instance segmenter running on ONNX Runtime.
///
/// Outputs:
/// - output0 `[1, 4 + C + P, N]`: box (cx, cy, w, h), C class scores, P mask
///   coefficients per anchor
/// - output1 `[1, P, Hp, Wp]`: mask prototypes
pub struct YoloSegmenter {
    session: Session,
    preprocessor: Preprocessor,
    config: YoloConfig,
    name: String,
}

impl YoloSegmenter {
    /// Create a new segmenter from an ONNX file using the default thresholds.
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        Self::with_config(model_path, YoloConfig::default())
    }

    pub fn with_config<P: AsRef<Path>>(model_path: P, config: YoloConfig) -> Result<Self> {
        let path = model_path.as_ref();

        tracing::info!("Loading segmentation model from {}", path.display());

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx".to_string());

        tracing::info!("Segmentation model {} loaded successfully", name);

        Ok(Self {
            session,
            preprocessor: Preprocessor::new(config.input_size, config.input_size),
            config,
            name,
        })
    }
}

impl SegmentationModel for YoloSegmenter {
    fn infer(&mut self, image: &RgbImage) -> Result<Vec<Mask>> {
        let _span = tracing::debug_span!("yolo_infer").entered();

        let input = self.preprocessor.preprocess(image)?;

        let _infer_span = tracing::debug_span!("inference").entered();
        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(&input)?])
            .context("Failed to run inference")?;
        drop(_infer_span);

        if outputs.len() < 2 {
            bail!("Expected detections and prototypes, got {} output(s)", outputs.len());
        }

        let (det_shape, det_data) = outputs[0].try_extract_tensor::<f32>()?;
        let (proto_shape, proto_data) = outputs[1].try_extract_tensor::<f32>()?;
        if det_shape.len() != 3 || proto_shape.len() != 4 {
            bail!(
                "Unexpected output shapes: detections {:?}, prototypes {:?}",
                det_shape,
                proto_shape
            );
        }

        // first batch entry only
        let (channels, anchors) = (det_shape[1] as usize, det_shape[2] as usize);
        let detections = ArrayView2::from_shape((channels, anchors), &det_data[..channels * anchors])?;

        let (p, ph, pw) = (
            proto_shape[1] as usize,
            proto_shape[2] as usize,
            proto_shape[3] as usize,
        );
        let protos = ArrayView3::from_shape((p, ph, pw), &proto_data[..p * ph * pw])?;

        let size = self.config.input_size;
        decode_instances(detections, protos, image.dimensions(), (size, size), &self.config)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn input_size(&self) -> (u32, u32) {
        (self.config.input_size, self.config.input_size)
    }
}

/// Box in model input coordinates: (x1, y1, x2, y2).
type BoxXyxy = (f32, f32, f32, f32);

struct Detection {
    bbox: BoxXyxy,
    score: f32,
    anchor: usize,
}

/// Turn raw detection and prototype tensors into image-sized masks.
///
/// `detections` is `[4 + C + P, N]`, `protos` is `[P, Hp, Wp]`. Masks come
/// back strongest detection first; masks with no foreground are dropped.
pub fn decode_instances(
    detections: ArrayView2<f32>,
    protos: ArrayView3<f32>,
    image_size: (u32, u32),
    input_size: (u32, u32),
    config: &YoloConfig,
) -> Result<Vec<Mask>> {
    let (channels, anchors) = detections.dim();
    let (p, ph, pw) = protos.dim();
    if channels < 4 + p + 1 {
        bail!("Detections carry {} channels, need at least {}", channels, 4 + p + 1);
    }
    let classes = channels - 4 - p;

    let mut candidates: Vec<Detection> = (0..anchors)
        .filter_map(|i| {
            let column = detections.index_axis(Axis(1), i);
            let score = column
                .slice(s![4..4 + classes])
                .iter()
                .copied()
                .fold(f32::NEG_INFINITY, f32::max);
            if score <= config.confidence {
                return None;
            }
            let (cx, cy, w, h) = (column[0], column[1], column[2], column[3]);
            Some(Detection {
                bbox: (cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0),
                score,
                anchor: i,
            })
        })
        .collect();

    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    let kept = non_max_suppression(&candidates, config.iou_threshold);
    tracing::debug!(
        "{} candidate(s) above confidence, {} after NMS",
        candidates.len(),
        kept.len()
    );

    let prototypes = protos.into_shape_with_order((p, ph * pw))?;
    let sx = pw as f32 / input_size.0 as f32;
    let sy = ph as f32 / input_size.1 as f32;

    let mut masks = Vec::with_capacity(kept.len());
    for det in kept.into_iter().map(|i| &candidates[i]) {
        let coeffs: Array1<f32> = detections
            .slice(s![4 + classes.., det.anchor])
            .to_owned();
        let logits = coeffs.dot(&prototypes).into_shape_with_order((ph, pw))?;

        let (x1, y1, x2, y2) = det.bbox;
        let probabilities = Array2::from_shape_fn((ph, pw), |(y, x)| {
            let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
            if px < x1 * sx || px > x2 * sx || py < y1 * sy || py > y2 * sy {
                0.0
            } else {
                sigmoid(logits[[y, x]])
            }
        });

        let mask = Preprocessor::postprocess_mask(
            probabilities.view(),
            image_size.0,
            image_size.1,
            config.mask_threshold,
        );
        if !mask.is_blank() {
            masks.push(mask);
        }
    }

    Ok(masks)
}

/// Greedy class-agnostic NMS over detections sorted by descending score.
/// Returns indices of the survivors.
fn non_max_suppression(sorted: &[Detection], iou_threshold: f32) -> Vec<usize> {
    let mut suppressed = vec![false; sorted.len()];
    let mut keep = Vec::new();

    for i in 0..sorted.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(i);
        for j in i + 1..sorted.len() {
            if !suppressed[j] && iou(sorted[i].bbox, sorted[j].bbox) > iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    keep
}

fn iou(a: BoxXyxy, b: BoxXyxy) -> f32 {
    let ix = (a.2.min(b.2) - a.0.max(b.0)).max(0.0);
    let iy = (a.3.min(b.3) - a.1.max(b.1)).max(0.0);
    let intersection = ix * iy;
    if intersection <= 0.0 {
        return 0.0;
    }

    let area_a = (a.2 - a.0) * (a.3 - a.1);
    let area_b = (b.2 - b.0) * (b.3 - b.1);
    intersection / (area_a + area_b - intersection)
}

fn sigmoid(v: f32) -> f32 {
    1.0 / (1.0 + (-v).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    const PROTOS: usize = 2;

    /// One column per detection: box, a single class score, mask coefficients.
    fn detections(rows: &[([f32; 4], f32, [f32; PROTOS])]) -> Array2<f32> {
        let mut det = Array2::<f32>::zeros((4 + 1 + PROTOS, rows.len()));
        for (i, (bbox, score, coeffs)) in rows.iter().enumerate() {
            for k in 0..4 {
                det[[k, i]] = bbox[k];
            }
            det[[4, i]] = *score;
            for k in 0..PROTOS {
                det[[5 + k, i]] = coeffs[k];
            }
        }
        det
    }

    /// Prototype 0 is uniformly positive, prototype 1 uniformly negative.
    fn protos() -> Array3<f32> {
        let mut protos = Array3::<f32>::zeros((PROTOS, 16, 16));
        protos.slice_mut(s![0, .., ..]).fill(4.0);
        protos.slice_mut(s![1, .., ..]).fill(-4.0);
        protos
    }

    #[test]
    fn mask_is_cropped_to_detection_box() {
        // box covering the left half of a 64x64 input
        let det = detections(&[([16.0, 32.0, 32.0, 64.0], 0.9, [1.0, 0.0])]);
        let masks =
            decode_instances(det.view(), protos().view(), (128, 128), (64, 64), &YoloConfig::default())
                .unwrap();

        assert_eq!(masks.len(), 1);
        assert_eq!(masks[0].dimensions(), (128, 128));
        assert!(masks[0].is_foreground(20, 64));
        assert!(!masks[0].is_foreground(110, 64));
    }

    #[test]
    fn low_scores_and_negative_logits_yield_nothing() {
        let det = detections(&[
            ([32.0, 32.0, 64.0, 64.0], 0.1, [1.0, 0.0]),
            ([32.0, 32.0, 64.0, 64.0], 0.9, [0.0, 1.0]),
        ]);
        let masks =
            decode_instances(det.view(), protos().view(), (64, 64), (64, 64), &YoloConfig::default())
                .unwrap();
        assert!(masks.is_empty());
    }

    #[test]
    fn overlapping_detections_are_suppressed() {
        let det = detections(&[
            ([32.0, 32.0, 40.0, 40.0], 0.6, [1.0, 0.0]),
            ([33.0, 32.0, 40.0, 40.0], 0.8, [1.0, 0.0]),
            ([10.0, 10.0, 8.0, 8.0], 0.7, [1.0, 0.0]),
        ]);
        let masks =
            decode_instances(det.view(), protos().view(), (64, 64), (64, 64), &YoloConfig::default())
                .unwrap();
        assert_eq!(masks.len(), 2);
    }

    #[test]
    fn rejects_tensors_without_class_scores() {
        let det = Array2::<f32>::zeros((4 + PROTOS, 3));
        let result =
            decode_instances(det.view(), protos().view(), (64, 64), (64, 64), &YoloConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn iou_of_identical_and_disjoint_boxes() {
        let a = (0.0, 0.0, 10.0, 10.0);
        assert_eq!(iou(a, a), 1.0);
        assert_eq!(iou(a, (20.0, 20.0, 30.0, 30.0)), 0.0);
    }
}
