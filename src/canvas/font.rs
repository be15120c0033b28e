use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};
use ttf_parser::Face;
use usvg::fontdb;

use super::geometry::{TextExtent, TextMeasure};
use crate::state::FontFamily;

/// The face picked for one overlay family. `family` is the name the face
/// itself carries, so the SVG renderer resolves to the same face.
#[derive(Debug, Clone)]
pub struct ResolvedFace {
    id: fontdb::ID,
    family: String,
}

impl ResolvedFace {
    pub fn family(&self) -> &str {
        &self.family
    }
}

/// Font database shared by measurement and rendering.
#[derive(Clone)]
pub struct FontBook {
    db: Arc<fontdb::Database>,
    faces: HashMap<FontFamily, ResolvedFace>,
}

impl FontBook {
    pub fn system<P: AsRef<Path>>(extra_paths: &[P]) -> Result<Self> {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        for path in extra_paths {
            let path = path.as_ref();
            db.load_font_file(path)
                .with_context(|| format!("failed to load font: {}", path.display()))?;
        }
        debug!("font database holds {} faces", db.len());
        Ok(Self::from_database(db))
    }

    /// No faces at all. Measurement falls back to per-character estimates
    /// and text is not drawn.
    pub fn empty() -> Self {
        Self::from_database(fontdb::Database::new())
    }

    pub fn from_database(mut db: fontdb::Database) -> Self {
        assign_generic_families(&mut db);
        let mut faces = HashMap::new();
        for family in FontFamily::ALL {
            match resolve_face(&db, family) {
                Some(face) => {
                    debug!("{} resolved to {}", family, face.family);
                    faces.insert(family, face);
                }
                None => warn!("no font face available for {}", family),
            }
        }
        Self {
            db: Arc::new(db),
            faces,
        }
    }

    pub fn database(&self) -> Arc<fontdb::Database> {
        self.db.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    pub fn face(&self, family: FontFamily) -> Option<&ResolvedFace> {
        self.faces.get(&family)
    }

    /// Distance from the top of the em box to the baseline.
    pub(crate) fn ascent_px(&self, family: FontFamily, font_size: f32) -> f32 {
        self.face(family)
            .and_then(|face| {
                self.db.with_face_data(face.id, |data, index| {
                    let face = Face::parse(data, index).ok()?;
                    let units = face.units_per_em().max(1) as f32;
                    Some(face.ascender() as f32 * font_size / units)
                })
            })
            .flatten()
            .unwrap_or(font_size * 0.8)
    }

    fn text_width_px(&self, text: &str, font_size: f32, family: FontFamily) -> f32 {
        self.face(family)
            .and_then(|face| {
                self.db.with_face_data(face.id, |data, index| {
                    let face = Face::parse(data, index).ok()?;
                    Some(advance_width_px(&face, text, font_size))
                })
            })
            .flatten()
            .unwrap_or_else(|| estimate_text_width_units(text) * font_size)
    }
}

impl TextMeasure for FontBook {
    fn measure(&self, text: &str, font_size: f32, family: FontFamily) -> TextExtent {
        TextExtent {
            width: self.text_width_px(text, font_size, family),
            height: font_size,
        }
    }
}

fn resolve_face(db: &fontdb::Database, family: FontFamily) -> Option<ResolvedFace> {
    let generic = if family.is_serif() {
        fontdb::Family::Serif
    } else {
        fontdb::Family::SansSerif
    };
    let families = [fontdb::Family::Name(family.as_str()), generic];
    let query = fontdb::Query {
        families: &families,
        ..Default::default()
    };
    let id = db
        .query(&query)
        .or_else(|| db.faces().find(|info| is_text_face(info)).map(|info| info.id))
        .or_else(|| db.faces().next().map(|info| info.id))?;
    let info = db.face(id)?;
    let name = info
        .families
        .first()
        .map(|(name, _)| name.clone())
        .unwrap_or_else(|| family.as_str().to_string());
    Some(ResolvedFace { id, family: name })
}

/// Regular upright face meant for running text (not math or monospace).
fn is_text_face(info: &fontdb::FaceInfo) -> bool {
    info.style == fontdb::Style::Normal
        && info.weight == fontdb::Weight::NORMAL
        && !info.monospaced
        && info
            .families
            .first()
            .is_some_and(|(name, _)| !name.contains("Math"))
}

/// Picks an installed family for a generic slot: one whose name carries
/// `marker` when possible, else the first candidate.
fn pick_generic(candidates: &[String], marker: &str, exclude: Option<&str>) -> Option<String> {
    candidates
        .iter()
        .find(|name| name.contains(marker) && exclude.is_none_or(|other| !name.contains(other)))
        .or_else(|| candidates.first())
        .cloned()
}

/// fontdb defaults the generic families to Arial and Times New Roman. When
/// those are not installed, point them at installed text faces instead.
fn assign_generic_families(db: &mut fontdb::Database) {
    let mut candidates: Vec<String> = db
        .faces()
        .filter(|info| is_text_face(info))
        .filter_map(|info| info.families.first().map(|(name, _)| name.clone()))
        .collect();
    candidates.dedup();
    let installed = |db: &fontdb::Database, generic: fontdb::Family<'_>| {
        db.query(&fontdb::Query {
            families: &[generic],
            ..Default::default()
        })
        .is_some()
    };
    if !installed(db, fontdb::Family::SansSerif)
        && let Some(name) = pick_generic(&candidates, "Sans", None)
    {
        debug!("sans-serif resolves to {}", name);
        db.set_sans_serif_family(name);
    }
    if !installed(db, fontdb::Family::Serif)
        && let Some(name) = pick_generic(&candidates, "Serif", Some("Sans"))
    {
        debug!("serif resolves to {}", name);
        db.set_serif_family(name);
    }
}

fn advance_width_px(face: &Face<'_>, text: &str, font_size: f32) -> f32 {
    let units_per_em = face.units_per_em().max(1);
    let space_advance = face
        .glyph_index(' ')
        .and_then(|id| face.glyph_hor_advance(id))
        .unwrap_or(units_per_em / 2);
    let mut advance = 0u32;
    for ch in text.chars() {
        let glyph_advance = face
            .glyph_index(ch)
            .and_then(|glyph| face.glyph_hor_advance(glyph))
            .unwrap_or(space_advance);
        advance = advance.saturating_add(glyph_advance as u32);
    }
    advance as f32 * (font_size / units_per_em as f32)
}

fn estimate_char_units(ch: char) -> f32 {
    if ch.is_whitespace() {
        0.25
    } else if ch.is_ascii_alphanumeric() {
        0.55
    } else if ch.is_ascii() {
        0.35
    } else if matches!(
        ch as u32,
        0x4E00..=0x9FFF | 0x3040..=0x30FF | 0x31F0..=0x31FF
    ) {
        1.0
    } else {
        0.9
    }
}

fn estimate_text_width_units(text: &str) -> f32 {
    text.chars().map(estimate_char_units).sum()
}
