use anyhow::{Context, Result};
use resvg::render;
use std::sync::Arc;
use tiny_skia::{ColorU8, Pixmap, PixmapPaint, Transform};
use usvg::{Options, Tree, fontdb};

use super::color::HexColor;
use super::font::FontBook;
use super::{CANVAS_HEIGHT, CANVAS_WIDTH, FALLBACK_COLOR};
use crate::state::TextOverlay;

pub(crate) const SHADOW_OPACITY: f32 = 0.8;
pub(crate) const SHADOW_BLUR: f32 = 10.0;
pub(crate) const SHADOW_OFFSET: f32 = 3.0;

pub(crate) fn draw_background(pixmap: &mut Pixmap, background: &image::RgbaImage) -> Result<()> {
    let mut layer = Pixmap::new(background.width(), background.height())
        .context("background has no pixels")?;
    for (dst, src) in layer.pixels_mut().iter_mut().zip(background.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    pixmap.draw_pixmap(
        0,
        0,
        layer.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );
    Ok(())
}

/// Builds the overlay layer as a transparent canvas-sized SVG. The text is
/// placed with its em-box top at `(x, y)` and carries a drop shadow.
pub(crate) fn text_layer_svg(overlay: &TextOverlay, family: &str, ascent: f32) -> String {
    let fill = HexColor::parse(&overlay.color).unwrap_or(FALLBACK_COLOR);
    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = CANVAS_WIDTH,
        h = CANVAS_HEIGHT
    ));
    svg.push_str(&format!(
        r##"<defs><filter id="shadow" filterUnits="userSpaceOnUse" x="0" y="0" width="{w}" height="{h}" color-interpolation-filters="sRGB"><feDropShadow dx="{dx}" dy="{dy}" stdDeviation="{blur}" flood-color="#000000" flood-opacity="{opacity}"/></filter></defs>"##,
        w = CANVAS_WIDTH,
        h = CANVAS_HEIGHT,
        dx = SHADOW_OFFSET,
        dy = SHADOW_OFFSET,
        blur = SHADOW_BLUR / 2.0,
        opacity = SHADOW_OPACITY
    ));
    svg.push_str(&format!(
        r#"<text x="{x}" y="{y}" font-family="'{family}'" font-size="{size}" fill="{fill}" fill-opacity="{fill_opacity}" filter="url(#shadow)" xml:space="preserve">{text}</text>"#,
        x = overlay.x,
        y = overlay.y + ascent,
        family = escape_xml(family),
        size = overlay.font_size,
        fill = fill.to_css(),
        fill_opacity = fill.opacity(),
        text = escape_xml(&overlay.text)
    ));
    svg.push_str("</svg>");
    svg
}

pub(crate) fn draw_svg(pixmap: &mut Pixmap, svg: &str, db: Arc<fontdb::Database>) -> Result<()> {
    let options = Options {
        fontdb: db,
        ..Options::default()
    };
    let tree = Tree::from_str(svg, &options).with_context(|| "failed to parse text layer")?;
    let mut pixmap_mut = pixmap.as_mut();
    render(&tree, Transform::identity(), &mut pixmap_mut);
    Ok(())
}

/// Draws the overlay text when a face is available. Returns whether
/// anything was drawn.
pub(crate) fn draw_text(pixmap: &mut Pixmap, fonts: &FontBook, overlay: &TextOverlay) -> Result<bool> {
    if overlay.text.is_empty() {
        return Ok(false);
    }
    let Some(face) = fonts.face(overlay.font_family) else {
        return Ok(false);
    };
    let ascent = fonts.ascent_px(overlay.font_family, overlay.font_size as f32);
    let svg = text_layer_svg(overlay, face.family(), ascent);
    draw_svg(pixmap, &svg, fonts.database())?;
    Ok(true)
}

/// Escapes markup and drops the control characters XML 1.0 cannot carry.
fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(ch),
            ch if (ch as u32) < 0x20 => {}
            '\u{FFFE}' | '\u{FFFF}' => {}
            ch => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FontFamily;

    fn overlay(text: &str, color: &str) -> TextOverlay {
        TextOverlay {
            text: text.to_string(),
            color: color.to_string(),
            font_family: FontFamily::Verdana,
            ..TextOverlay::default()
        }
    }

    #[test]
    fn svg_places_text_from_em_box_top() {
        let svg = text_layer_svg(&overlay("Hi", "#FF0000"), "DejaVu Sans", 50.0);
        assert!(svg.contains(r#"x="50" y="100""#));
        assert!(svg.contains(r##"fill="#ff0000""##));
        assert!(svg.contains(r#"font-size="64""#));
        assert!(svg.contains(r#"stdDeviation="5""#));
        assert!(svg.contains(r#"dx="3" dy="3""#));
        assert!(svg.contains(">Hi</text>"));
    }

    #[test]
    fn partial_color_falls_back_to_previous_fill() {
        let svg = text_layer_svg(&overlay("Hi", "#12"), "DejaVu Sans", 50.0);
        assert!(svg.contains(r##"fill="#1a1a1a""##));
    }

    #[test]
    fn text_is_escaped() {
        let svg = text_layer_svg(&overlay("Tom & <Jerry>", "#FFFFFF"), "A'B", 50.0);
        assert!(svg.contains("Tom &amp; &lt;Jerry&gt;"));
        assert!(svg.contains("font-family=\"'A&apos;B'\""));
    }

    #[test]
    fn control_characters_are_dropped() {
        let svg = text_layer_svg(&overlay("Tab\u{1}bed\u{1f}\tok", "#FFFFFF"), "A", 50.0);
        assert!(svg.contains(">Tabbed\tok</text>"));
        let options = Options::default();
        assert!(Tree::from_str(&svg, &options).is_ok());
    }

    #[test]
    fn empty_text_draws_nothing() {
        let mut pixmap = Pixmap::new(CANVAS_WIDTH, CANVAS_HEIGHT).expect("pixmap");
        let drawn = draw_text(&mut pixmap, &FontBook::empty(), &overlay("", "#FFFFFF"))
            .expect("draw");
        assert!(!drawn);
        assert!(pixmap.data().iter().all(|byte| *byte == 0));
    }
}
