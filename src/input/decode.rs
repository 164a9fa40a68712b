use super::ImageSource;
use crate::error::PipelineError;
use image::RgbImage;
use std::path::{Path, PathBuf};

/// Decode any format the `image` crate understands into 8-bit RGB.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyImage);
    }

    let decoded = image::load_from_memory(bytes)?.to_rgb8();
    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(PipelineError::EmptyImage);
    }

    tracing::debug!("Decoded {}x{} image", decoded.width(), decoded.height());
    Ok(decoded)
}

/// An image file on disk
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ImageSource for FileSource {
    fn load(&mut self) -> Result<RgbImage, PipelineError> {
        tracing::info!("Reading image from {}", self.path.display());

        let bytes = std::fs::read(&self.path).map_err(|source| PipelineError::ReadImage {
            path: self.path.clone(),
            source,
        })?;
        decode_image(&bytes)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Encoded image bytes already in memory, e.g. a request payload
pub struct BytesSource {
    bytes: Vec<u8>,
}

impl BytesSource {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl ImageSource for BytesSource {
    fn load(&mut self) -> Result<RgbImage, PipelineError> {
        decode_image(&self.bytes)
    }

    fn describe(&self) -> String {
        format!("{} in-memory bytes", self.bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use image::{ImageFormat, Rgb};
    use std::io::Cursor;

    fn png_bytes(image: &RgbImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn decodes_png_payload() {
        let original = RgbImage::from_pixel(12, 7, Rgb([10, 20, 30]));
        let mut source = BytesSource::new(png_bytes(&original));
        assert_eq!(source.load().unwrap(), original);
    }

    #[test]
    fn empty_payload_is_an_input_error() {
        let err = BytesSource::new(Vec::new()).load().unwrap_err();
        assert!(matches!(err, PipelineError::EmptyImage));
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn garbage_payload_fails_to_decode() {
        let err = BytesSource::new(b"definitely not an image".to_vec()).load().unwrap_err();
        assert!(matches!(err, PipelineError::ImageDecode(_)));
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn missing_file_is_an_input_error() {
        let err = FileSource::new("/nonexistent/lot.png").load().unwrap_err();
        assert!(matches!(err, PipelineError::ReadImage { .. }));
        assert_eq!(err.kind(), ErrorKind::Input);
    }
}
