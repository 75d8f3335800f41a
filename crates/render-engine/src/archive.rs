//! Zip archive of extracted frame images.

use std::io::{Cursor, Write};
use std::path::Path;
use std::str::FromStr;

use image::{ImageEncoder, RgbaImage};
use serde::{Deserialize, Serialize};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::ExportError;

/// Image format of exported frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    #[default]
    Png,
    Jpeg,
}

impl FrameFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            FrameFormat::Png => "png",
            FrameFormat::Jpeg => "jpg",
        }
    }

    /// Encode one frame. JPEG drops alpha; `jpeg_quality` is ignored for PNG.
    pub fn encode(&self, frame: &RgbaImage, jpeg_quality: u8) -> Result<Vec<u8>, image::ImageError> {
        let mut out = Vec::new();
        match self {
            FrameFormat::Png => {
                image::codecs::png::PngEncoder::new(&mut out).write_image(
                    frame.as_raw(),
                    frame.width(),
                    frame.height(),
                    image::ExtendedColorType::Rgba8,
                )?;
            }
            FrameFormat::Jpeg => {
                let rgb = image::DynamicImage::ImageRgba8(frame.clone()).to_rgb8();
                image::codecs::jpeg::JpegEncoder::new_with_quality(
                    &mut out,
                    jpeg_quality.clamp(1, 100),
                )
                .write_image(
                    rgb.as_raw(),
                    rgb.width(),
                    rgb.height(),
                    image::ExtendedColorType::Rgb8,
                )?;
            }
        }
        Ok(out)
    }
}

impl FromStr for FrameFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(FrameFormat::Png),
            "jpg" | "jpeg" => Ok(FrameFormat::Jpeg),
            other => Err(format!("unknown frame format '{other}' (expected png or jpeg)")),
        }
    }
}

impl std::fmt::Display for FrameFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FrameFormat::Png => "png",
            FrameFormat::Jpeg => "jpeg",
        })
    }
}

/// Archive entry name for frame `index`, e.g. `frame_00042.png`.
pub fn frame_name(index: u64, format: FrameFormat) -> String {
    format!("frame_{index:05}.{}", format.extension())
}

/// Builds a frame archive in memory.
pub struct ArchiveWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    format: FrameFormat,
    frames: u64,
}

impl ArchiveWriter {
    pub fn new(format: FrameFormat) -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            format,
            frames: 0,
        }
    }

    /// Append the next frame. Frames are numbered in the order they arrive.
    pub fn add_frame(&mut self, encoded: &[u8]) -> Result<(), ExportError> {
        // Image payloads are already compressed.
        let options = FileOptions::default().compression_method(CompressionMethod::Stored);
        self.zip
            .start_file(frame_name(self.frames, self.format), options)?;
        self.zip.write_all(encoded)?;
        self.frames += 1;
        Ok(())
    }

    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    pub fn finish(mut self) -> Result<FrameArchive, ExportError> {
        let bytes = self.zip.finish()?.into_inner();
        Ok(FrameArchive {
            bytes,
            frame_count: self.frames,
            format: self.format,
        })
    }
}

/// A finished export.
#[derive(Debug, Clone)]
pub struct FrameArchive {
    bytes: Vec<u8>,
    frame_count: u64,
    format: FrameFormat,
}

impl FrameArchive {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn format(&self) -> FrameFormat {
        self.format
    }

    pub fn write_to(&self, path: &Path) -> Result<(), ExportError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &self.bytes)?;
        tracing::info!(path = %path.display(), frames = self.frame_count, "Frame archive written");
        Ok(())
    }

    /// Entry names in archive order.
    pub fn entry_names(&self) -> Result<Vec<String>, ExportError> {
        let mut zip = ZipArchive::new(Cursor::new(self.bytes.as_slice()))?;
        let mut names = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            names.push(zip.by_index(i)?.name().to_string());
        }
        Ok(names)
    }

    /// Raw bytes of one entry.
    pub fn entry(&self, name: &str) -> Result<Vec<u8>, ExportError> {
        let mut zip = ZipArchive::new(Cursor::new(self.bytes.as_slice()))?;
        let mut file = zip.by_name(name)?;
        let mut out = Vec::with_capacity(file.size() as usize);
        std::io::copy(&mut file, &mut out)?;
        Ok(out)
    }
}
