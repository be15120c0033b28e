use crate::canvas::{CANVAS_HEIGHT, CANVAS_WIDTH};
use crate::state::FontFamily;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextExtent {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

/// Text measurement backend. The compositor's `FontBook` is the production
/// implementation so clamping and drawing agree on extents.
pub trait TextMeasure {
    /// Height is the font size, not the glyph ascent plus descent.
    fn measure(&self, text: &str, font_size: f32, family: FontFamily) -> TextExtent;
}

pub fn measure<M: TextMeasure + ?Sized>(
    measurer: &M,
    text: &str,
    font_size: f32,
    family: FontFamily,
) -> TextExtent {
    measurer.measure(text, font_size, family)
}

pub fn clamp<M: TextMeasure + ?Sized>(
    measurer: &M,
    x: f32,
    y: f32,
    text: &str,
    font_size: f32,
    family: FontFamily,
) -> Position {
    let extent = measurer.measure(text, font_size, family);
    clamp_to_canvas(x, y, extent)
}

/// `max(0, min(v, limit - extent))` per axis. An extent larger than the
/// canvas pins the coordinate at 0.
pub fn clamp_to_canvas(x: f32, y: f32, extent: TextExtent) -> Position {
    Position {
        x: x.min(CANVAS_WIDTH as f32 - extent.width).max(0.0),
        y: y.min(CANVAS_HEIGHT as f32 - extent.height).max(0.0),
    }
}
