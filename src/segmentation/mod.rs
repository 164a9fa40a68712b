mod clahe;
mod classical;
mod preprocess;
pub mod types;
mod yolo;

pub use clahe::{to_intensity, Clahe};
pub use classical::{ClassicalConfig, ClassicalExtractor};
pub use preprocess::Preprocessor;
pub use types::{Mask, SegmentationModel, Segmenter};
pub use yolo::{decode_instances, YoloConfig, YoloSegmenter};

use anyhow::Result;
use std::path::Path;

/// Create the default learned segmenter (YOLO-seg on ONNX Runtime)
pub fn create_default_model<P: AsRef<Path>>(model_path: P) -> Result<Box<dyn SegmentationModel>> {
    let model = YoloSegmenter::new(model_path)?;
    Ok(Box::new(model))
}

/// Load the model if a path is given. A model that fails to load leaves the
/// segmenter unavailable so the classical extractor takes over.
pub fn load_segmenter<P: AsRef<Path>>(model_path: Option<P>) -> Segmenter {
    let Some(path) = model_path else {
        tracing::info!("No segmentation model configured, using classical extraction");
        return Segmenter::Unavailable;
    };

    match create_default_model(path.as_ref()) {
        Ok(model) => {
            let (width, height) = model.input_size();
            tracing::debug!("{} expects {}x{} input", model.name(), width, height);
            Segmenter::Available(model)
        }
        Err(err) => {
            tracing::warn!("Failed to load segmentation model: {:#}", err);
            Segmenter::Unavailable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_file_degrades_to_unavailable() {
        let segmenter = load_segmenter(Some("/nonexistent/pavement-seg.onnx"));
        assert!(!segmenter.is_available());
    }

    #[test]
    fn no_model_path_is_unavailable() {
        assert!(!load_segmenter(None::<&str>).is_available());
    }
}
