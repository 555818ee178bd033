//! Image recompression.
//!
//! Re-encodes a directory tree of images into the output directory,
//! preserving relative paths. JPEGs are re-encoded at the configured quality
//! and PNGs at the configured compression effort; formats the encoder stack
//! has no lossy path for (GIF, WebP) are copied through byte-for-byte.
//! Files on the skip list (`Thumbs.db`, `.DS_Store`) are ignored entirely.
//!
//! Images are processed in parallel with rayon; outputs are disjoint files,
//! so the only ordering requirement is that the whole step finishes before
//! the site generator runs.

use crate::config::ImagesConfig;
use crate::sources;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use rayon::prelude::*;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to process {path}: {source}")]
    Encode {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// How one file was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageAction {
    Reencoded,
    Copied,
}

/// Per-file processing record, in source-set order.
#[derive(Debug)]
pub struct ProcessedImage {
    pub relative: PathBuf,
    pub action: ImageAction,
}

/// Recompress everything under `source_root`/`config.dir` into
/// `output_root`/`config.output`.
pub fn optimize(
    source_root: &Path,
    output_root: &Path,
    config: &ImagesConfig,
) -> Result<Vec<ProcessedImage>, ImageError> {
    let input_dir = source_root.join(&config.dir);
    let output_dir = output_root.join(&config.output);
    let files = sources::collect(&input_dir, IMAGE_EXTENSIONS, &config.skip);

    files
        .par_iter()
        .map(|file| {
            let relative = sources::relative_to(file, &input_dir);
            let target = output_dir.join(&relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let action = recompress(file, &target, config)?;
            Ok(ProcessedImage { relative, action })
        })
        .collect()
}

/// Re-encode a single image, or copy it through when the format has no
/// lossy encoder.
fn recompress(input: &Path, output: &Path, config: &ImagesConfig) -> Result<ImageAction, ImageError> {
    let ext = input
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => {
            // jpeg has no alpha channel, so encode from rgb8
            let img = decode(input)?.to_rgb8();
            let writer = BufWriter::new(fs::File::create(output)?);
            let mut encoder = JpegEncoder::new_with_quality(writer, config.quality);
            encoder.encode_image(&img).map_err(|source| ImageError::Encode {
                path: input.to_path_buf(),
                source,
            })?;
            Ok(ImageAction::Reencoded)
        }
        "png" => {
            let img = decode(input)?;
            let writer = BufWriter::new(fs::File::create(output)?);
            let encoder = PngEncoder::new_with_quality(
                writer,
                compression_for(config.optimization_level),
                FilterType::Adaptive,
            );
            img.write_with_encoder(encoder)
                .map_err(|source| ImageError::Encode {
                    path: input.to_path_buf(),
                    source,
                })?;
            Ok(ImageAction::Reencoded)
        }
        _ => {
            fs::copy(input, output)?;
            Ok(ImageAction::Copied)
        }
    }
}

fn decode(path: &Path) -> Result<image::DynamicImage, ImageError> {
    image::open(path).map_err(|source| ImageError::Encode {
        path: path.to_path_buf(),
        source,
    })
}

/// Map the 0-9 effort knob onto the png encoder's three compression tiers.
fn compression_for(level: u8) -> CompressionType {
    match level {
        0..=3 => CompressionType::Fast,
        4..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use tempfile::TempDir;

    fn images_config() -> ImagesConfig {
        ImagesConfig::default()
    }

    fn write_png(path: &Path, w: u32, h: u32) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let img = ImageBuffer::from_fn(w, h, |x, y| Rgb([x as u8, y as u8, 128u8]));
        img.save(path).unwrap();
    }

    #[test]
    fn preserves_relative_paths() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("_assets");
        let output = tmp.path().join("assets");
        write_png(&source.join("img/icons/dot.png"), 4, 4);
        write_png(&source.join("img/logo.png"), 8, 8);

        let processed = optimize(&source, &output, &images_config()).unwrap();
        assert_eq!(processed.len(), 2);
        assert!(output.join("img/icons/dot.png").is_file());
        assert!(output.join("img/logo.png").is_file());
    }

    #[test]
    fn reencodes_png_to_valid_image() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("_assets");
        let output = tmp.path().join("assets");
        write_png(&source.join("img/logo.png"), 16, 16);

        let processed = optimize(&source, &output, &images_config()).unwrap();
        assert_eq!(processed[0].action, ImageAction::Reencoded);
        let img = image::open(output.join("img/logo.png")).unwrap();
        assert_eq!((img.width(), img.height()), (16, 16));
    }

    #[test]
    fn skips_skip_list_entries() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("_assets");
        let output = tmp.path().join("assets");
        write_png(&source.join("img/logo.png"), 4, 4);
        fs::write(source.join("img/Thumbs.db"), b"junk").unwrap();

        let processed = optimize(&source, &output, &images_config()).unwrap();
        assert_eq!(processed.len(), 1);
        assert!(!output.join("img/Thumbs.db").exists());
    }

    #[test]
    fn unsupported_lossy_formats_copy_through() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("_assets");
        let output = tmp.path().join("assets");
        fs::create_dir_all(source.join("img")).unwrap();
        fs::write(source.join("img/anim.gif"), b"GIF89a-bytes").unwrap();

        let processed = optimize(&source, &output, &images_config()).unwrap();
        assert_eq!(processed[0].action, ImageAction::Copied);
        assert_eq!(fs::read(output.join("img/anim.gif")).unwrap(), b"GIF89a-bytes");
    }

    #[test]
    fn missing_source_dir_is_empty_run() {
        let tmp = TempDir::new().unwrap();
        let processed = optimize(tmp.path(), tmp.path(), &images_config()).unwrap();
        assert!(processed.is_empty());
    }

    #[test]
    fn corrupt_image_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("_assets");
        fs::create_dir_all(source.join("img")).unwrap();
        fs::write(source.join("img/bad.png"), b"not a png").unwrap();

        let err = optimize(&source, tmp.path(), &images_config()).unwrap_err();
        assert!(matches!(err, ImageError::Encode { .. }));
    }

    #[test]
    fn compression_tiers() {
        assert!(matches!(compression_for(0), CompressionType::Fast));
        assert!(matches!(compression_for(5), CompressionType::Default));
        assert!(matches!(compression_for(7), CompressionType::Best));
        assert!(matches!(compression_for(9), CompressionType::Best));
    }
}
