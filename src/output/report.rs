use super::ResultSink;
use crate::pipeline::PipelineResult;
use anyhow::{Context, Result};
use image::RgbImage;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Pretty-printed JSON report written to any byte sink
pub struct JsonReport<W: Write> {
    writer: W,
}

impl<W: Write> JsonReport<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonReport<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create report at {}", path.display()))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> ResultSink for JsonReport<W> {
    fn write_result(&mut self, _image: &RgbImage, result: &PipelineResult) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, result)
            .context("Failed to serialize measurement result")?;
        writeln!(self.writer)?;
        self.writer.flush().context("Failed to flush report")?;
        Ok(())
    }
}
