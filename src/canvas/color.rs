/// A complete CSS hex colour (`#RGB`, `#RGBA` or `#RRGGBB`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl HexColor {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// `None` for partial input such as `#12`, which a 2D canvas would
    /// ignore as a fill style.
    pub fn parse(value: &str) -> Option<Self> {
        let digits = value.trim().strip_prefix('#')?;
        if !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return None;
        }
        let nibble = |idx: usize| u8::from_str_radix(&digits[idx..idx + 1], 16).ok();
        let byte = |idx: usize| u8::from_str_radix(&digits[idx..idx + 2], 16).ok();
        match digits.len() {
            3 | 4 => {
                let r = nibble(0)? * 17;
                let g = nibble(1)? * 17;
                let b = nibble(2)? * 17;
                let a = if digits.len() == 4 { nibble(3)? * 17 } else { 255 };
                Some(Self { r, g, b, a })
            }
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            _ => None,
        }
    }

    pub fn to_css(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn opacity(&self) -> f32 {
        self.a as f32 / 255.0
    }

    pub(crate) fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.r, self.g, self.b, self.a)
    }
}
