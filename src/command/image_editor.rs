//! Default [`CommandExecutor`]: crops the original with the `image` crate,
//! renders it through the image definition and stores the result under
//! `img/<definition directory>/` on the media filesystem.
//!
//! | Mode | Behavior |
//! |------|----------|
//! | `fit` | scale to fit inside the box, missing dimension unconstrained |
//! | `fitCrop` | fill the box and center-crop to the exact size |
//! | `canvas` | fit inside, then center on a transparent canvas of the box size |
//! | `canvasFitCrop` | `fitCrop` when the image covers the box, otherwise `canvas` |
//!
//! Without `upscale`, images are never enlarged. Media whose MIME type has
//! no enabled decoder is rejected up front.

use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, RgbaImage};
use thiserror::Error;
use tracing::{info, warn};

use super::{CommandExecutor, CommandResult, EditorCommand};
use crate::filesystem::FilesystemError;
use crate::image_definition::{ImageDefinition, ImageDefinitionMode};
use crate::media::Media;

pub const RENDERED_IMAGE_ROOT: &str = "img";

#[derive(Debug, Default, Clone)]
pub struct ImageEditorExecutor;

impl ImageEditorExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for ImageEditorExecutor {
    fn execute(&self, command: &EditorCommand) -> CommandResult {
        match run_editor_command(command) {
            Ok(output) => {
                info!(
                    media_id = %command.media.id,
                    image_definition = %command.image_definition.name,
                    output = %output.display(),
                    "image definition rendered"
                );
                CommandResult::success()
            }
            Err(error) => {
                warn!(
                    media_id = %command.media.id,
                    image_definition = %command.image_definition.name,
                    error = %error,
                    "image edit failed"
                );
                CommandResult::failure(vec![error.to_string()])
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ImageEditorError {
    #[error("file type '{mime_type}' is not supported by the image editor")]
    FileTypeNotSupported { mime_type: String },
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
    #[error("source image '{path}' does not exist")]
    SourceMissing { path: String },
    #[error("failed to decode source image '{path}': {message}")]
    Decode { path: String, message: String },
    #[error("crop area lies outside of the {width}x{height} source image")]
    EmptyCrop { width: u32, height: u32 },
    #[error("failed to write '{path}': {message}")]
    Write { path: String, message: String },
}

pub fn output_relative_path(definition: &ImageDefinition, media: &Media) -> PathBuf {
    PathBuf::from(RENDERED_IMAGE_ROOT)
        .join(definition.directory.as_str())
        .join(media.relative_path())
}

/// Runs the command and returns the absolute path of the written file.
pub fn run_editor_command(command: &EditorCommand) -> Result<PathBuf, ImageEditorError> {
    ensure_supported_file_type(&command.media)?;
    let source = command.filesystem.resolve(command.media.relative_path())?;
    let target = command.filesystem.resolve(output_relative_path(
        command.image_definition.as_ref(),
        &command.media,
    ))?;

    if !source.is_file() {
        return Err(ImageEditorError::SourceMissing {
            path: source.display().to_string(),
        });
    }
    let original = image::open(source.as_path()).map_err(|error| ImageEditorError::Decode {
        path: source.display().to_string(),
        message: error.to_string(),
    })?;

    let (width, height) = original.dimensions();
    let rect = command
        .crop
        .to_pixel_rect(width, height)
        .ok_or(ImageEditorError::EmptyCrop { width, height })?;
    let cropped = original.crop_imm(rect.x, rect.y, rect.width, rect.height);
    let rendered = render_image_definition(cropped, command.image_definition.as_ref());

    write_image(&rendered, target.as_path())?;
    Ok(target)
}

/// Only media whose MIME type maps to a format with an enabled decoder can
/// be edited.
pub fn ensure_supported_file_type(media: &Media) -> Result<ImageFormat, ImageEditorError> {
    ImageFormat::from_mime_type(media.mime_type.trim())
        .filter(|format| format.reading_enabled())
        .ok_or_else(|| ImageEditorError::FileTypeNotSupported {
            mime_type: media.mime_type.clone(),
        })
}

pub fn render_image_definition(img: DynamicImage, definition: &ImageDefinition) -> DynamicImage {
    match (definition.mode, definition.width, definition.height) {
        (ImageDefinitionMode::FitCrop, Some(w), Some(h)) => fit_crop(img, w, h, definition.upscale),
        (ImageDefinitionMode::Canvas, Some(w), Some(h)) => canvas(img, w, h, definition.upscale),
        (ImageDefinitionMode::CanvasFitCrop, Some(w), Some(h)) => {
            let (iw, ih) = img.dimensions();
            if definition.upscale || (iw >= w && ih >= h) {
                img.resize_to_fill(w, h, FilterType::Lanczos3)
            } else {
                canvas(img, w, h, false)
            }
        }
        _ => fit(img, definition.width, definition.height, definition.upscale),
    }
}

fn fit(img: DynamicImage, width: Option<u32>, height: Option<u32>, upscale: bool) -> DynamicImage {
    let (iw, ih) = img.dimensions();
    let (tw, th) = fitted_dimensions(iw, ih, width, height, upscale);
    if (tw, th) == (iw, ih) {
        return img;
    }
    img.resize_exact(tw, th, FilterType::Lanczos3)
}

fn fit_crop(img: DynamicImage, width: u32, height: u32, upscale: bool) -> DynamicImage {
    let (iw, ih) = img.dimensions();
    if upscale || (iw >= width && ih >= height) {
        return img.resize_to_fill(width, height, FilterType::Lanczos3);
    }
    // Too small to fill the box: keep the pixels we have, trimmed to the box.
    let cw = iw.min(width);
    let ch = ih.min(height);
    img.crop_imm((iw - cw) / 2, (ih - ch) / 2, cw, ch)
}

fn canvas(img: DynamicImage, width: u32, height: u32, upscale: bool) -> DynamicImage {
    let fitted = fit(img, Some(width), Some(height), upscale);
    let (fw, fh) = fitted.dimensions();
    let mut base = RgbaImage::new(width, height);
    image::imageops::overlay(
        &mut base,
        &fitted.to_rgba8(),
        i64::from(width.saturating_sub(fw) / 2),
        i64::from(height.saturating_sub(fh) / 2),
    );
    DynamicImage::ImageRgba8(base)
}

fn fitted_dimensions(
    iw: u32,
    ih: u32,
    width: Option<u32>,
    height: Option<u32>,
    upscale: bool,
) -> (u32, u32) {
    let scale_x = width.map(|w| f64::from(w) / f64::from(iw));
    let scale_y = height.map(|h| f64::from(h) / f64::from(ih));
    let mut scale = match (scale_x, scale_y) {
        (Some(sx), Some(sy)) => sx.min(sy),
        (Some(sx), None) => sx,
        (None, Some(sy)) => sy,
        (None, None) => 1.0,
    };
    if !upscale {
        scale = scale.min(1.0);
    }
    let scaled = |value: u32| ((f64::from(value) * scale).round() as u32).max(1);
    (scaled(iw), scaled(ih))
}

fn write_image(img: &DynamicImage, path: &Path) -> Result<(), ImageEditorError> {
    let write_error = |message: String| ImageEditorError::Write {
        path: path.display().to_string(),
        message,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|error| write_error(error.to_string()))?;
    }

    let is_jpeg = path
        .extension()
        .and_then(|v| v.to_str())
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "jpg" | "jpeg"))
        .unwrap_or(false);
    let result = if is_jpeg {
        DynamicImage::ImageRgb8(img.to_rgb8()).save(path)
    } else {
        img.save(path)
    };
    result.map_err(|error| write_error(error.to_string()))
}
