use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::RgbaImage;
use image::imageops::FilterType;

use super::{CANVAS_HEIGHT, CANVAS_WIDTH};

pub const PNG_MIME: &str = "image/png";
pub const JPEG_MIME: &str = "image/jpeg";

/// A `data:<mime>;base64,<payload>` image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl DataUri {
    /// Labels the bytes with their sniffed image type, or `fallback_mime`
    /// when the content is not recognised as an image.
    pub fn from_bytes(bytes: Vec<u8>, fallback_mime: &str) -> Self {
        let mime = sniff_image_mime(&bytes).unwrap_or(fallback_mime).to_string();
        Self { mime, bytes }
    }

    pub fn parse(uri: &str) -> Result<Self> {
        let rest = uri
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| anyhow!("not a data URI"))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| anyhow!("data URI has no payload"))?;
        let mut params = header.split(';');
        let mime = params.next().unwrap_or_default().trim().to_lowercase();
        if !params.any(|param| param.trim().eq_ignore_ascii_case("base64")) {
            return Err(anyhow!("only base64 data URIs are supported"));
        }
        let bytes = BASE64
            .decode(payload.trim())
            .with_context(|| "failed to decode data URI payload")?;
        Ok(Self { mime, bytes })
    }

    pub fn encode(&self) -> String {
        format!("data:{};base64,{}", self.mime, BASE64.encode(&self.bytes))
    }
}

pub fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    let kind = infer::get(bytes)?;
    let mime = kind.mime_type();
    mime.starts_with("image/").then_some(mime)
}

/// Decodes a background and stretches it to exactly fill the canvas.
pub(crate) fn decode_background(uri: &str) -> Result<RgbaImage> {
    let data = DataUri::parse(uri)?;
    let decoded = image::load_from_memory(&data.bytes)
        .with_context(|| format!("failed to decode {} background", data.mime))?
        .to_rgba8();
    if decoded.width() == CANVAS_WIDTH && decoded.height() == CANVAS_HEIGHT {
        return Ok(decoded);
    }
    Ok(image::imageops::resize(
        &decoded,
        CANVAS_WIDTH,
        CANVAS_HEIGHT,
        FilterType::Triangle,
    ))
}
