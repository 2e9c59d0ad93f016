pub mod gemini;

use std::io::Cursor;

use anyhow::Result;
use async_trait::async_trait;
use base64::Engine;
use image::{DynamicImage, ImageFormat};

use crate::core::error::MeterError;

/// Image payload in the form multimodal APIs accept inline.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub mime_type: &'static str,
    /// Base64 (standard alphabet) of the encoded image bytes
    pub data: String,
}

impl InlineImage {
    /// Convert to 3-channel RGB and PNG-encode, whatever the source colour space.
    /// Encoding trouble is a problem with the image, not with the service.
    pub fn from_image(image: &DynamicImage) -> Result<Self, MeterError> {
        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        let mut buf = Vec::new();
        rgb.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| MeterError::DecodeFailed(format!("Failed to encode image as PNG: {}", e)))?;
        Ok(Self {
            mime_type: "image/png",
            data: base64::engine::general_purpose::STANDARD.encode(&buf),
        })
    }
}

/// A multimodal text-generation model.
///
/// Built once at startup and shared; implementations must not hold per-call state.
#[async_trait]
pub trait VisionClient: Send + Sync {
    /// Send `prompt` and `image` in a single call. `Ok(None)` means the model
    /// answered but produced no text.
    async fn generate(&self, prompt: &str, image: &InlineImage) -> Result<Option<String>>;
}
