use std::fmt;

use crate::state::{FontFamily, MAX_FONT_SIZE, MIN_FONT_SIZE};

pub const MAX_TOPIC_CHARS: usize = 500;
pub const MAX_TEXT_CHARS: usize = 200;
pub const MIN_API_KEY_CHARS: usize = 10;
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;
pub const UPLOAD_MIMES: [&str; 3] = ["image/png", "image/jpeg", "image/jpg"];

/// Input rejected before any side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl ValidationError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ValidationError {}

/// Returns the trimmed topic.
pub fn validate_topic(topic: &str) -> Result<String, ValidationError> {
    let trimmed = topic.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("Topic cannot be empty"));
    }
    if trimmed.chars().count() > MAX_TOPIC_CHARS {
        return Err(ValidationError::new(
            "Topic must be less than 500 characters",
        ));
    }
    Ok(trimmed.to_string())
}

pub fn validate_text(text: &str) -> Result<String, ValidationError> {
    if text.chars().count() > MAX_TEXT_CHARS {
        return Err(ValidationError::new("Text must be less than 200 characters"));
    }
    Ok(text.to_string())
}

/// Returns the trimmed key.
pub fn validate_api_key(key: &str) -> Result<String, ValidationError> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("API key cannot be empty"));
    }
    if trimmed.chars().count() < MIN_API_KEY_CHARS {
        return Err(ValidationError::new("API key appears to be invalid"));
    }
    Ok(trimmed.to_string())
}

pub fn validate_image_upload(mime: &str, size: u64) -> Result<(), ValidationError> {
    let mime = mime.trim().to_ascii_lowercase();
    if !UPLOAD_MIMES.contains(&mime.as_str()) {
        return Err(ValidationError::new(
            "Only PNG and JPEG images are supported",
        ));
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(ValidationError::new("Image must be less than 5MB"));
    }
    Ok(())
}

pub fn validate_font_size(size: u32) -> Result<u32, ValidationError> {
    if !(MIN_FONT_SIZE..=MAX_FONT_SIZE).contains(&size) {
        return Err(ValidationError::new("Font size must be between 20 and 200"));
    }
    Ok(size)
}

pub fn validate_font_family(name: &str) -> Result<FontFamily, ValidationError> {
    FontFamily::parse(name).ok_or_else(|| {
        let names = FontFamily::ALL
            .iter()
            .map(FontFamily::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        ValidationError::new(format!("Font family must be one of: {}", names))
    })
}

/// Accepts partial hex colours (`#` plus up to six hex digits) the way the
/// hex input field does while the user is typing.
pub fn validate_color_input(value: &str) -> Result<String, ValidationError> {
    let digits = value.strip_prefix('#').unwrap_or_default();
    let valid = value.starts_with('#')
        && digits.len() <= 6
        && digits.chars().all(|ch| ch.is_ascii_hexdigit());
    if !valid {
        return Err(ValidationError::new(
            "Color must be a hex value like #FFFFFF",
        ));
    }
    Ok(value.to_string())
}
