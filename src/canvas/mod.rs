use anyhow::{Context, Result, anyhow};
use ::image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;
use std::path::Path;
use tiny_skia::Pixmap;
use tracing::{debug, warn};

pub mod color;
pub mod font;
pub mod geometry;
pub mod image;
mod render;

use self::color::HexColor;
use self::font::FontBook;
use crate::state::TextOverlay;

pub const CANVAS_WIDTH: u32 = 1280;
pub const CANVAS_HEIGHT: u32 = 720;
/// Fill shown when there is no background, and the text fill used when the
/// overlay colour is not a complete hex value.
pub const FALLBACK_COLOR: HexColor = HexColor::rgb(0x1a, 0x1a, 0x1a);

const EXPORT_TITLE_CHARS: usize = 30;
const EXPORT_DEFAULT_NAME: &str = "thumbnail.png";

/// The 1280x720 drawing surface.
pub struct Surface {
    pixmap: Pixmap,
}

impl Surface {
    pub fn new() -> Result<Self> {
        let mut pixmap = Pixmap::new(CANVAS_WIDTH, CANVAS_HEIGHT)
            .ok_or_else(|| anyhow!("failed to allocate canvas"))?;
        pixmap.fill(FALLBACK_COLOR.to_skia());
        Ok(Self { pixmap })
    }

    /// Restores the fixed size and clears to the fallback fill.
    pub fn reset(&mut self) -> Result<()> {
        if self.pixmap.width() != CANVAS_WIDTH || self.pixmap.height() != CANVAS_HEIGHT {
            self.pixmap = Pixmap::new(CANVAS_WIDTH, CANVAS_HEIGHT)
                .ok_or_else(|| anyhow!("failed to allocate canvas"))?;
        }
        self.pixmap.fill(FALLBACK_COLOR.to_skia());
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Straight (non-premultiplied) RGBA of one pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let color = self.pixmap.pixel(x, y)?.demultiply();
        Some([color.red(), color.green(), color.blue(), color.alpha()])
    }

    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut raw = Vec::with_capacity(self.pixmap.data().len());
        for pixel in self.pixmap.pixels() {
            let color = pixel.demultiply();
            raw.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
        }
        let img = RgbaImage::from_raw(self.width(), self.height(), raw)
            .ok_or_else(|| anyhow!("failed to build PNG buffer"))?;
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .with_context(|| "failed to encode PNG")?;
        Ok(bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundStatus {
    Fallback,
    Image,
    /// The background could not be decoded; the fallback fill was drawn.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutcome {
    pub background: BackgroundStatus,
    pub text_drawn: bool,
}

/// Redraws the surface from a thumbnail description.
#[derive(Clone)]
pub struct Compositor {
    fonts: FontBook,
}

impl Compositor {
    pub fn new(fonts: FontBook) -> Self {
        Self { fonts }
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    /// Clears the surface, draws the background (or the fallback fill) and
    /// then the overlay text. The background is decoded before the surface is
    /// touched, so text is always drawn after the background in one pass.
    pub async fn render(
        &self,
        surface: &mut Surface,
        background: Option<&str>,
        overlay: &TextOverlay,
    ) -> Result<RenderOutcome> {
        let decoded = match background {
            Some(uri) => {
                let uri = uri.to_string();
                let result = tokio::task::spawn_blocking(move || crate::canvas::image::decode_background(&uri))
                    .await
                    .with_context(|| "background decode task failed")?;
                Some(result)
            }
            None => None,
        };

        surface.reset()?;
        let background = match decoded {
            None => BackgroundStatus::Fallback,
            Some(Ok(img)) => {
                render::draw_background(&mut surface.pixmap, &img)?;
                BackgroundStatus::Image
            }
            Some(Err(err)) => {
                warn!("background decode failed: {:#}", err);
                BackgroundStatus::Failed(err.to_string())
            }
        };
        let text_drawn = render::draw_text(&mut surface.pixmap, &self.fonts, overlay)?;
        debug!(
            "rendered thumbnail (background: {:?}, text drawn: {})",
            background, text_drawn
        );
        Ok(RenderOutcome {
            background,
            text_drawn,
        })
    }
}

/// Writes the surface as a PNG at `path`.
pub fn export(surface: &Surface, path: &Path) -> Result<()> {
    let bytes = surface.encode_png()?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, bytes)
        .with_context(|| format!("failed to write thumbnail: {}", path.display()))?;
    Ok(())
}

/// First 30 characters of the selected title with everything outside
/// ASCII letters and digits replaced by `-`.
pub fn export_filename(selected_title: &str) -> String {
    if selected_title.is_empty() {
        return EXPORT_DEFAULT_NAME.to_string();
    }
    let stem: String = selected_title
        .chars()
        .take(EXPORT_TITLE_CHARS)
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '-' })
        .collect();
    format!("{}.png", stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::image::tests::png_bytes;
    use crate::canvas::geometry::TextMeasure;
    use crate::canvas::image::{DataUri, PNG_MIME};

    const FALLBACK_RGBA: [u8; 4] = [0x1a, 0x1a, 0x1a, 255];

    fn compositor() -> Compositor {
        Compositor::new(FontBook::empty())
    }

    #[tokio::test]
    async fn no_background_and_no_text_is_fallback_fill() {
        let mut surface = Surface::new().expect("surface");
        let outcome = compositor()
            .render(&mut surface, None, &TextOverlay::default())
            .await
            .expect("render");
        assert_eq!(outcome.background, BackgroundStatus::Fallback);
        assert!(!outcome.text_drawn);
        assert_eq!((surface.width(), surface.height()), (1280, 720));
        for (x, y) in [(0, 0), (640, 360), (1279, 719)] {
            assert_eq!(surface.pixel(x, y), Some(FALLBACK_RGBA));
        }
        assert!(
            surface
                .data()
                .chunks_exact(4)
                .all(|px| px == FALLBACK_RGBA)
        );
    }

    #[tokio::test]
    async fn rendering_twice_is_identical() {
        let overlay = TextOverlay {
            text: "Remote work".to_string(),
            ..TextOverlay::default()
        };
        let comp = Compositor::new(FontBook::system::<&Path>(&[]).expect("fonts"));
        let mut first = Surface::new().expect("surface");
        let mut second = Surface::new().expect("surface");
        comp.render(&mut first, None, &overlay).await.expect("first");
        comp.render(&mut second, None, &overlay).await.expect("second");
        comp.render(&mut second, None, &overlay).await.expect("again");
        assert_eq!(first.data(), second.data());
    }

    #[tokio::test]
    async fn background_is_stretched_over_whole_canvas() {
        let uri = DataUri::from_bytes(png_bytes(4, 4, |_, _| [0, 200, 0, 255]), PNG_MIME).encode();
        let mut surface = Surface::new().expect("surface");
        let outcome = compositor()
            .render(&mut surface, Some(&uri), &TextOverlay::default())
            .await
            .expect("render");
        assert_eq!(outcome.background, BackgroundStatus::Image);
        for (x, y) in [(0, 0), (1279, 0), (0, 719), (1279, 719)] {
            assert_eq!(surface.pixel(x, y), Some([0, 200, 0, 255]));
        }
    }

    #[tokio::test]
    async fn undecodable_background_keeps_fallback() {
        let uri = DataUri {
            mime: PNG_MIME.to_string(),
            bytes: b"not an image".to_vec(),
        }
        .encode();
        let mut surface = Surface::new().expect("surface");
        let outcome = compositor()
            .render(&mut surface, Some(&uri), &TextOverlay::default())
            .await
            .expect("render");
        assert!(matches!(outcome.background, BackgroundStatus::Failed(_)));
        assert_eq!(surface.pixel(640, 360), Some(FALLBACK_RGBA));
    }

    #[tokio::test]
    async fn text_is_the_only_mark_on_fallback() {
        let fonts = FontBook::system::<&Path>(&[]).expect("fonts");
        let overlay = TextOverlay {
            text: "Hello".to_string(),
            x: 200.0,
            y: 300.0,
            ..TextOverlay::default()
        };
        let width = fonts
            .measure(&overlay.text, overlay.font_size as f32, overlay.font_family)
            .width;
        let comp = Compositor::new(fonts);
        let mut surface = Surface::new().expect("surface");
        let outcome = comp.render(&mut surface, None, &overlay).await.expect("render");
        assert_eq!(outcome.background, BackgroundStatus::Fallback);
        assert!(outcome.text_drawn);

        let size = overlay.font_size as f32;
        let inside = |x: u32, y: u32| {
            let (x, y) = (x as f32, y as f32);
            x >= overlay.x && x < overlay.x + width && y >= overlay.y && y < overlay.y + size
        };
        // Shadow offset plus blur spread around the text box.
        let margin = 30.0;
        let near = |x: u32, y: u32| {
            let (x, y) = (x as f32, y as f32);
            x >= overlay.x - margin
                && x < overlay.x + width + margin
                && y >= overlay.y - margin
                && y < overlay.y + size + margin
        };
        let mut glyph_pixels = 0;
        for y in 0..surface.height() {
            for x in 0..surface.width() {
                let pixel = surface.pixel(x, y);
                if inside(x, y) && pixel == Some([255, 255, 255, 255]) {
                    glyph_pixels += 1;
                }
                if !near(x, y) {
                    assert_eq!(pixel, Some(FALLBACK_RGBA), "mark at ({x}, {y})");
                }
            }
        }
        assert!(glyph_pixels > 0);
    }

    #[tokio::test]
    async fn undecodable_background_still_draws_text() {
        let uri = DataUri {
            mime: PNG_MIME.to_string(),
            bytes: b"not an image".to_vec(),
        }
        .encode();
        let overlay = TextOverlay {
            text: "Remote work".to_string(),
            ..TextOverlay::default()
        };
        let comp = Compositor::new(FontBook::system::<&Path>(&[]).expect("fonts"));
        let mut surface = Surface::new().expect("surface");
        let outcome = comp
            .render(&mut surface, Some(&uri), &overlay)
            .await
            .expect("render");
        assert!(matches!(outcome.background, BackgroundStatus::Failed(_)));
        assert!(outcome.text_drawn);
        assert_eq!(surface.pixel(1200, 700), Some(FALLBACK_RGBA));
    }

    #[test]
    fn export_writes_canvas_sized_png() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out").join("thumb.png");
        let surface = Surface::new().expect("surface");
        export(&surface, &path).expect("export");
        let bytes = std::fs::read(&path).expect("read");
        let decoded = ::image::load_from_memory(&bytes).expect("decode");
        assert_eq!((decoded.width(), decoded.height()), (1280, 720));
    }

    #[test]
    fn export_filename_from_title() {
        assert_eq!(export_filename(""), "thumbnail.png");
        assert_eq!(
            export_filename("10 Tips: Remote Work!"),
            "10-Tips--Remote-Work-.png"
        );
        assert_eq!(
            export_filename("The Ultimate Guide to Working From Home"),
            "The-Ultimate-Guide-to-Working-.png"
        );
        assert_eq!(export_filename("Café"), "Caf-.png");
    }
}
