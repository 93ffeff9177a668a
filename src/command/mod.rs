pub mod image_editor;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::filesystem::Filesystem;
use crate::image_definition::ImageDefinition;
use crate::media::Media;

pub use image_editor::ImageEditorExecutor;

/// Crop rectangle in source-image pixels, as sent by the editor widget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropParameter {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropParameter {
    /// Rounds to whole pixels and clamps to the image bounds. Returns `None`
    /// when nothing of the image remains.
    pub fn to_pixel_rect(&self, image_width: u32, image_height: u32) -> Option<PixelRect> {
        let clamp = |value: f64, max: u32| -> u32 {
            if value.is_nan() {
                return 0;
            }
            value.round().clamp(0.0, f64::from(max)) as u32
        };
        let x0 = clamp(self.x, image_width);
        let y0 = clamp(self.y, image_height);
        let x1 = clamp(self.x + self.width, image_width);
        let y1 = clamp(self.y + self.height, image_height);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(PixelRect {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }
}

#[derive(Debug, Clone)]
pub struct EditorCommand {
    pub media: Media,
    pub image_definition: Arc<ImageDefinition>,
    pub crop: CropParameter,
    pub filesystem: Filesystem,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandResult {
    pub successful: bool,
    pub messages: Vec<String>,
}

impl CommandResult {
    pub fn success() -> Self {
        Self {
            successful: true,
            messages: Vec::new(),
        }
    }

    pub fn failure(messages: Vec<String>) -> Self {
        Self {
            successful: false,
            messages,
        }
    }
}

pub trait CommandExecutor: Send + Sync + 'static {
    fn execute(&self, command: &EditorCommand) -> CommandResult;
}

pub type SharedCommandExecutor = Arc<dyn CommandExecutor>;
