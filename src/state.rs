use serde::{Deserialize, Serialize};
use std::fmt;

use crate::providers::ServiceKind;

pub const DEFAULT_FONT_SIZE: u32 = 64;
pub const MIN_FONT_SIZE: u32 = 20;
pub const MAX_FONT_SIZE: u32 = 200;
pub const DEFAULT_TEXT_COLOR: &str = "#FFFFFF";
pub const DEFAULT_POSITION: f32 = 50.0;
pub const TITLE_COUNT: usize = 10;

pub const QUICK_COLORS: [&str; 12] = [
    "#FFFFFF", "#000000", "#FF0000", "#00FF00", "#0000FF", "#FFFF00", "#FF00FF", "#00FFFF",
    "#FFA500", "#800080", "#FFC0CB", "#A52A2A",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FontFamily {
    #[default]
    Impact,
    Arial,
    Georgia,
    Verdana,
    #[serde(rename = "Comic Sans MS")]
    ComicSansMs,
}

impl FontFamily {
    pub const ALL: [FontFamily; 5] = [
        FontFamily::Impact,
        FontFamily::Arial,
        FontFamily::Georgia,
        FontFamily::Verdana,
        FontFamily::ComicSansMs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FontFamily::Impact => "Impact",
            FontFamily::Arial => "Arial",
            FontFamily::Georgia => "Georgia",
            FontFamily::Verdana => "Verdana",
            FontFamily::ComicSansMs => "Comic Sans MS",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|family| family.as_str().eq_ignore_ascii_case(name))
    }

    /// Georgia is the only serif face in the list.
    pub fn is_serif(&self) -> bool {
        matches!(self, FontFamily::Georgia)
    }
}

impl fmt::Display for FontFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextOverlay {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size: u32,
    pub font_family: FontFamily,
    pub color: String,
}

impl Default for TextOverlay {
    fn default() -> Self {
        Self {
            text: String::new(),
            x: DEFAULT_POSITION,
            y: DEFAULT_POSITION,
            font_size: DEFAULT_FONT_SIZE,
            font_family: FontFamily::default(),
            color: DEFAULT_TEXT_COLOR.to_string(),
        }
    }
}

/// Partial overlay change; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayUpdate {
    pub text: Option<String>,
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub font_size: Option<u32>,
    pub font_family: Option<FontFamily>,
    pub color: Option<String>,
}

impl OverlayUpdate {
    pub fn position(x: f32, y: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }
}

impl TextOverlay {
    pub fn apply(&self, update: OverlayUpdate) -> Self {
        Self {
            text: update.text.unwrap_or_else(|| self.text.clone()),
            x: update.x.unwrap_or(self.x),
            y: update.y.unwrap_or(self.y),
            font_size: update.font_size.unwrap_or(self.font_size),
            font_family: update.font_family.unwrap_or(self.font_family),
            color: update.color.unwrap_or_else(|| self.color.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThumbnailState {
    /// Background as a self-contained data URI.
    pub background_image: Option<String>,
    pub text_overlay: TextOverlay,
    pub is_dragging: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiKeys {
    pub gemini: String,
    pub together: String,
}

impl ApiKeys {
    pub fn get(&self, service: ServiceKind) -> &str {
        match service {
            ServiceKind::Gemini => &self.gemini,
            ServiceKind::Together => &self.together,
        }
    }

    pub fn set(&mut self, service: ServiceKind, key: String) {
        match service {
            ServiceKind::Gemini => self.gemini = key,
            ServiceKind::Together => self.together = key,
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.gemini.is_empty() && !self.together.is_empty()
    }
}

/// One session snapshot. Every transformation returns a new snapshot and
/// leaves `self` untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub api_keys: ApiKeys,
    pub topic: String,
    pub titles: Vec<String>,
    pub selected_title: String,
    pub thumbnail: ThumbnailState,
    pub is_generating_titles: bool,
    pub is_generating_image: bool,
}

impl AppState {
    pub fn with_api_keys(&self, api_keys: ApiKeys) -> Self {
        Self {
            api_keys,
            ..self.clone()
        }
    }

    pub fn with_topic(&self, topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..self.clone()
        }
    }

    /// Replaces the title list. A selection that is not part of the new list
    /// is cleared.
    pub fn with_titles(&self, titles: Vec<String>) -> Self {
        let selected_title = if titles.contains(&self.selected_title) {
            self.selected_title.clone()
        } else {
            String::new()
        };
        Self {
            titles,
            selected_title,
            ..self.clone()
        }
    }

    pub fn with_selected_title(&self, title: impl Into<String>) -> Self {
        Self {
            selected_title: title.into(),
            ..self.clone()
        }
    }

    pub fn with_background_image(&self, image: Option<String>) -> Self {
        self.with_thumbnail(ThumbnailState {
            background_image: image,
            ..self.thumbnail.clone()
        })
    }

    pub fn with_overlay(&self, update: OverlayUpdate) -> Self {
        self.with_thumbnail(ThumbnailState {
            text_overlay: self.thumbnail.text_overlay.apply(update),
            ..self.thumbnail.clone()
        })
    }

    pub fn with_dragging(&self, is_dragging: bool) -> Self {
        self.with_thumbnail(ThumbnailState {
            is_dragging,
            ..self.thumbnail.clone()
        })
    }

    pub fn with_generating_titles(&self, is_generating_titles: bool) -> Self {
        Self {
            is_generating_titles,
            ..self.clone()
        }
    }

    pub fn with_generating_image(&self, is_generating_image: bool) -> Self {
        Self {
            is_generating_image,
            ..self.clone()
        }
    }

    fn with_thumbnail(&self, thumbnail: ThumbnailState) -> Self {
        Self {
            thumbnail,
            ..self.clone()
        }
    }

    pub fn overlay(&self) -> &TextOverlay {
        &self.thumbnail.text_overlay
    }
}
