//! Font tables in the Adafruit GFX layout.
//!
//! Custom glyph bitmaps are one continuous row-major, MSB-first bit stream per
//! glyph starting at `bitmap_offset`; rows are not byte aligned.

use super::font5x7;

/// Per-glyph metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GfxGlyph {
    /// Index of the glyph's first byte in [`GfxFont::bitmap`]
    pub bitmap_offset: u16,
    pub width: u8,
    pub height: u8,
    /// Cursor advance after this glyph
    pub x_advance: u8,
    /// Offset from the cursor (on the baseline) to the glyph's top-left corner
    pub x_offset: i8,
    pub y_offset: i8,
}

/// A proportional (or fixed-cell) bitmap font
#[derive(Debug, Clone, Copy)]
pub struct GfxFont {
    pub bitmap: &'static [u8],
    /// Metrics shared by every code point, for fixed-width fonts
    pub fixed_glyph: Option<GfxGlyph>,
    /// Glyphs for `first..=last`, ignored when `fixed_glyph` is set
    pub glyphs: &'static [GfxGlyph],
    pub first: u8,
    pub last: u8,
    /// Line height
    pub y_advance: u8,
}

impl GfxFont {
    pub fn glyph(&self, c: u8) -> Option<GfxGlyph> {
        if c < self.first || c > self.last {
            return None;
        }
        match self.fixed_glyph {
            Some(glyph) => Some(glyph),
            None => self.glyphs.get(usize::from(c - self.first)).copied(),
        }
    }

    /// Read bit `index` of the stream starting at `offset`, MSB first
    pub(crate) fn bit(&self, offset: usize, index: usize) -> bool {
        self.bitmap
            .get(offset + index / 8)
            .map_or(false, |byte| byte & (0x80 >> (index % 8)) != 0)
    }
}

/// Metrics the text layer needs from either font kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphMetrics {
    pub width: i32,
    pub height: i32,
    pub x_offset: i32,
    pub y_offset: i32,
    pub x_advance: i32,
}

impl From<GfxGlyph> for GlyphMetrics {
    fn from(glyph: GfxGlyph) -> Self {
        Self {
            width: i32::from(glyph.width),
            height: i32::from(glyph.height),
            x_offset: i32::from(glyph.x_offset),
            y_offset: i32::from(glyph.y_offset),
            x_advance: i32::from(glyph.x_advance),
        }
    }
}

/// The built-in font draws every byte into a 6x8 cell
pub const BUILTIN_METRICS: GlyphMetrics = GlyphMetrics {
    width: font5x7::CELL_WIDTH,
    height: font5x7::CELL_HEIGHT,
    x_offset: 0,
    y_offset: 0,
    x_advance: font5x7::CELL_WIDTH,
};

/// Resolve metrics for `c` in the active font (`None` means built-in)
pub fn metrics(font: Option<&GfxFont>, c: u8) -> Option<GlyphMetrics> {
    match font {
        None => Some(BUILTIN_METRICS),
        Some(font) => font.glyph(c).map(GlyphMetrics::from),
    }
}

/// Line height of the active font
pub fn line_height(font: Option<&GfxFont>) -> i32 {
    match font {
        None => font5x7::CELL_HEIGHT,
        Some(font) => i32::from(font.y_advance),
    }
}
