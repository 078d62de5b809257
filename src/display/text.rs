// Text rendering: cursor handling, word wrap, glyph drawing and bounds

use std::fmt;

use super::engine::GfxDisplay;
use super::font::{self, GfxFont, GlyphMetrics};
use super::font5x7;
use super::transport::DisplayTransport;
use super::Color;
use crate::error::Result;

/// Box covering every glyph cell a string touches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextBounds {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

/// Custom fonts draw from the baseline, the built-in one from the top-left
const BASELINE_SHIFT: i32 = 6;

impl<T: DisplayTransport> GfxDisplay<T> {
    /// Switch fonts (`None` selects the built-in one), keeping the text on
    /// the same visual line
    pub fn set_font(&mut self, font: Option<&'static GfxFont>) {
        match (font.is_some(), self.state.font.is_some()) {
            (true, false) => self.state.cursor_y = self.state.cursor_y.saturating_add(BASELINE_SHIFT),
            (false, true) => self.state.cursor_y = self.state.cursor_y.saturating_sub(BASELINE_SHIFT),
            _ => {}
        }
        self.state.font = font;
    }

    /// Render one byte at the cursor and advance it
    pub fn write_byte(&mut self, c: u8) -> Result<()> {
        let size = i32::from(self.state.text_size);
        let line_height = font::line_height(self.state.font);

        match c {
            b'\n' => {
                self.state.cursor_x = 0;
                self.state.cursor_y = self.state.cursor_y.saturating_add(size * line_height);
            }
            b'\r' => {}
            _ => {
                let Some(metrics) = font::metrics(self.state.font, c) else {
                    return Ok(());
                };
                if metrics.width > 0 && metrics.height > 0 {
                    if self.wraps(self.state.cursor_x, &metrics, size) {
                        self.state.cursor_x = 0;
                        self.state.cursor_y = self.state.cursor_y.saturating_add(size * line_height);
                    }
                    let (color, background) = (self.state.text_color, self.state.text_bg);
                    self.draw_char(
                        self.state.cursor_x,
                        self.state.cursor_y,
                        c,
                        color,
                        background,
                        self.state.text_size,
                    )?;
                }
                self.state.cursor_x = self.state.cursor_x.saturating_add(metrics.x_advance * size);
            }
        }
        Ok(())
    }

    fn wraps(&self, x: i32, metrics: &GlyphMetrics, size: i32) -> bool {
        self.state.wrap
            && i64::from(x) + i64::from(size * (metrics.x_offset + metrics.width))
                >= i64::from(self.state.width)
    }

    pub fn print(&mut self, text: &str) -> Result<()> {
        text.bytes().try_for_each(|c| self.write_byte(c))
    }

    /// Draw one glyph with its cell's top-left (built-in font) or baseline
    /// origin (custom font) at (x, y).
    ///
    /// `background` is painted only for the built-in font and only when it
    /// differs from `color`.
    pub fn draw_char(
        &mut self,
        x: i32,
        y: i32,
        c: u8,
        color: Color,
        background: Color,
        size: u8,
    ) -> Result<()> {
        let size = i32::from(size.max(1));
        match self.state.font {
            None => self.draw_builtin_char(x, y, c, color, background, size),
            Some(font) => self.draw_custom_char(font, x, y, c, color, size),
        }
    }

    fn draw_builtin_char(
        &mut self,
        x: i32,
        y: i32,
        c: u8,
        color: Color,
        background: Color,
        size: i32,
    ) -> Result<()> {
        if x >= self.state.width
            || y >= self.state.height
            || x + font5x7::CELL_WIDTH * size - 1 < 0
            || y + font5x7::CELL_HEIGHT * size - 1 < 0
        {
            return Ok(());
        }

        // the classic table skips one slot from 0xB0 up
        let c = if !self.state.cp437 && c >= 176 {
            c.wrapping_add(1)
        } else {
            c
        };

        let columns = font5x7::get_char_data(c);
        for (i, &column) in (0i32..).zip(columns.iter()) {
            let mut bits = column;
            for j in 0..font5x7::CELL_HEIGHT {
                let paint = if bits & 0x01 != 0 {
                    Some(color)
                } else if background != color {
                    Some(background)
                } else {
                    None
                };
                if let Some(paint) = paint {
                    self.glyph_dot(x, y, i, j, size, paint)?;
                }
                bits >>= 1;
            }
        }

        if background != color {
            let gap = font5x7::FONT_WIDTH as i32;
            if size == 1 {
                self.fast_vline(x + gap, y, font5x7::CELL_HEIGHT, background)?;
            } else {
                self.fill_rect(x + gap * size, y, size, font5x7::CELL_HEIGHT * size, background)?;
            }
        }
        Ok(())
    }

    fn draw_custom_char(
        &mut self,
        font: &GfxFont,
        x: i32,
        y: i32,
        c: u8,
        color: Color,
        size: i32,
    ) -> Result<()> {
        let Some(glyph) = font.glyph(c) else {
            return Ok(());
        };
        let offset = usize::from(glyph.bitmap_offset);
        let (w, h) = (i32::from(glyph.width), i32::from(glyph.height));
        let (xo, yo) = (i32::from(glyph.x_offset), i32::from(glyph.y_offset));

        let mut bit = 0;
        for yy in 0..h {
            for xx in 0..w {
                if font.bit(offset, bit) {
                    self.glyph_dot(x, y, xo + xx, yo + yy, size, color)?;
                }
                bit += 1;
            }
        }
        Ok(())
    }

    /// One font dot at cell position (i, j), scaled to a `size` square
    fn glyph_dot(&mut self, x: i32, y: i32, i: i32, j: i32, size: i32, color: Color) -> Result<()> {
        let (x, y, size) = (i64::from(x), i64::from(y), i64::from(size));
        let (i, j) = (i64::from(i), i64::from(j));
        if size == 1 {
            self.plot(x + i, y + j, color)
        } else {
            self.fill_area(x + i * size, y + j * size, size, size, color)
        }
    }

    /// Box `text` would cover if printed with the cursor at (x, y).
    ///
    /// Follows the same newline and wrap rules as `print` without drawing.
    /// Glyphs with no width or height advance the cursor but add nothing to
    /// the box; some Adafruit-GFX C ports fold that empty cell into the
    /// extent instead. A string with no visible glyphs yields an empty box at
    /// (x, y). Extents past the `i32`/`u32` range saturate.
    pub fn get_text_bounds(&self, text: &str, x: i32, y: i32) -> TextBounds {
        let size = i32::from(self.state.text_size);
        let line_height = font::line_height(self.state.font);
        let (mut cx, mut cy) = (x, y);
        let mut extent: Option<(i64, i64, i64, i64)> = None;

        for c in text.bytes() {
            match c {
                b'\n' => {
                    cx = 0;
                    cy = cy.saturating_add(size * line_height);
                }
                b'\r' => {}
                _ => {
                    let Some(metrics) = font::metrics(self.state.font, c) else {
                        continue;
                    };
                    if metrics.width > 0 && metrics.height > 0 {
                        if self.wraps(cx, &metrics, size) {
                            cx = 0;
                            cy = cy.saturating_add(size * line_height);
                        }
                        let x1 = i64::from(cx) + i64::from(metrics.x_offset * size);
                        let y1 = i64::from(cy) + i64::from(metrics.y_offset * size);
                        let x2 = x1 + i64::from(metrics.width * size) - 1;
                        let y2 = y1 + i64::from(metrics.height * size) - 1;
                        extent = Some(match extent {
                            None => (x1, y1, x2, y2),
                            Some((min_x, min_y, max_x, max_y)) => {
                                (min_x.min(x1), min_y.min(y1), max_x.max(x2), max_y.max(y2))
                            }
                        });
                    }
                    cx = cx.saturating_add(metrics.x_advance * size);
                }
            }
        }

        let clamp_i32 = |v: i64| v.clamp(i32::MIN.into(), i32::MAX.into()) as i32;
        let clamp_u32 = |v: i64| v.clamp(0, u32::MAX.into()) as u32;
        match extent {
            None => TextBounds { x, y, w: 0, h: 0 },
            Some((min_x, min_y, max_x, max_y)) => TextBounds {
                x: clamp_i32(min_x),
                y: clamp_i32(min_y),
                w: clamp_u32(max_x - min_x + 1),
                h: clamp_u32(max_y - min_y + 1),
            },
        }
    }
}

impl<T: DisplayTransport> fmt::Write for GfxDisplay<T> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.print(s).map_err(|err| {
            log::warn!("text write failed: {}", err);
            fmt::Error
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Write;

    use super::*;
    use crate::config::DisplayConfig;
    use crate::display::engine::{default_splash, Backing};
    use crate::display::font::GfxGlyph;
    use crate::display::transport::MemoryTransport;

    fn display() -> GfxDisplay<MemoryTransport> {
        GfxDisplay::new(
            MemoryTransport::new(),
            &DisplayConfig::default(),
            Backing::Direct,
            default_splash(128, 64),
        )
        .unwrap()
    }

    static BAR_BITMAP: [u8; 1] = [0b1110_0000];
    static BAR_GLYPHS: [GfxGlyph; 1] = [GfxGlyph {
        bitmap_offset: 0,
        width: 1,
        height: 3,
        x_advance: 3,
        x_offset: 0,
        y_offset: -3,
    }];
    static BAR_FONT: GfxFont = GfxFont {
        bitmap: &BAR_BITMAP,
        fixed_glyph: None,
        glyphs: &BAR_GLYPHS,
        first: b'|',
        last: b'|',
        y_advance: 4,
    };

    #[test]
    fn test_newline_returns_to_column_zero() {
        let mut display = display();
        display.print("Hi\n!").unwrap();
        assert_eq!(display.cursor(), (6, 8));

        let bounds = display.get_text_bounds("Hi\n!", 0, 0);
        assert_eq!(bounds, TextBounds { x: 0, y: 0, w: 12, h: 16 });
    }

    #[test]
    fn test_builtin_glyph_pixels() {
        let mut display = display();
        display.write_byte(b'!').unwrap();
        for y in 0..7 {
            assert_eq!(display.read_pixel(2, y).unwrap(), y != 5, "row {}", y);
        }
        assert!(!display.read_pixel(1, 0).unwrap());
    }

    #[test]
    fn test_carriage_return_ignored() {
        let mut display = display();
        display.print("a\rb").unwrap();
        assert_eq!(display.cursor(), (12, 0));
    }

    #[test]
    fn test_background_fills_spacing_column() {
        let mut display = display();
        display.set_text_color_bg(Color::Off, Color::On);
        display.write_byte(b' ').unwrap();
        for y in 0..8 {
            for x in 0..6 {
                assert!(display.read_pixel(x, y).unwrap());
            }
        }
    }

    #[test]
    fn test_text_size_scales_cells() {
        let mut display = display();
        display.set_text_size(2);
        display.write_byte(b'!').unwrap();
        assert_eq!(display.cursor(), (12, 0));
        assert!(display.read_pixel(4, 0).unwrap());
        assert!(display.read_pixel(5, 1).unwrap());

        display.set_text_size(0);
        assert_eq!(display.state().text_size(), 1);
    }

    #[test]
    fn test_wrap_moves_to_next_line() {
        let mut display = display();
        display.set_cursor(121, 0);
        display.write_byte(b'A').unwrap();
        assert_eq!(display.cursor(), (127, 0));

        display.set_cursor(122, 0);
        display.write_byte(b'A').unwrap();
        assert_eq!(display.cursor(), (6, 8));

        display.set_text_wrap(false);
        display.set_cursor(122, 0);
        display.write_byte(b'A').unwrap();
        assert_eq!(display.cursor(), (128, 0));
    }

    #[test]
    fn test_cp437_shift() {
        let mut shifted = display();
        let mut exact = display();
        exact.cp437(true);
        shifted.write_byte(0xB0).unwrap();
        exact.write_byte(0xB1).unwrap();
        for y in 0..8 {
            for x in 0..6 {
                assert_eq!(shifted.read_pixel(x, y).unwrap(), exact.read_pixel(x, y).unwrap());
            }
        }
    }

    static GAP_GLYPHS: [GfxGlyph; 2] = [
        GfxGlyph {
            bitmap_offset: 0,
            width: 0,
            height: 0,
            x_advance: 4,
            x_offset: 0,
            y_offset: 0,
        },
        BAR_GLYPHS[0],
    ];
    static GAP_FONT: GfxFont = GfxFont {
        bitmap: &BAR_BITMAP,
        fixed_glyph: None,
        glyphs: &GAP_GLYPHS,
        first: b'{',
        last: b'|',
        y_advance: 4,
    };

    #[test]
    fn test_custom_font_draws_from_baseline() {
        let mut display = display();
        display.set_cursor(10, 10);
        display.set_font(Some(&BAR_FONT));
        assert_eq!(display.cursor(), (10, 16));

        display.write_byte(b'|').unwrap();
        assert_eq!(display.cursor(), (13, 16));
        assert!(display.read_pixel(10, 13).unwrap());
        assert!(display.read_pixel(10, 15).unwrap());
        assert!(!display.read_pixel(10, 16).unwrap());

        // glyphs outside the font are skipped without moving the cursor
        display.write_byte(b'x').unwrap();
        assert_eq!(display.cursor(), (13, 16));

        display.write_byte(b'\n').unwrap();
        assert_eq!(display.cursor(), (0, 20));

        display.set_font(None);
        assert_eq!(display.cursor(), (0, 14));
    }

    #[test]
    fn test_custom_font_bounds() {
        let mut display = display();
        display.set_font(Some(&BAR_FONT));
        let bounds = display.get_text_bounds("||", 0, 10);
        assert_eq!(bounds, TextBounds { x: 0, y: 7, w: 4, h: 3 });
    }

    #[test]
    fn test_blank_glyphs_only_advance_bounds() {
        let mut display = display();
        display.set_font(Some(&GAP_FONT));
        let bounds = display.get_text_bounds("{|", 0, 10);
        assert_eq!(bounds, TextBounds { x: 4, y: 7, w: 1, h: 3 });
        assert_eq!(
            display.get_text_bounds("{{", 2, 10),
            TextBounds { x: 2, y: 10, w: 0, h: 0 }
        );
    }

    #[test]
    fn test_extreme_cursor_saturates() {
        let mut display = display();
        display.set_text_wrap(false);
        display.set_cursor(i32::MAX - 2, i32::MIN);
        display.print("AB\n").unwrap();
        assert_eq!(display.cursor(), (0, i32::MIN + 8));

        display.set_cursor(i32::MAX - 2, 0);
        display.print("AB").unwrap();
        assert_eq!(display.cursor(), (i32::MAX, 0));
        assert_eq!(
            display.get_text_bounds("AB", i32::MAX - 2, 0),
            TextBounds { x: i32::MAX - 2, y: 0, w: 8, h: 8 }
        );

        display.set_cursor(i32::MIN, i32::MAX);
        display.set_font(Some(&BAR_FONT));
        assert_eq!(display.cursor(), (i32::MIN, i32::MAX));
        display.print("||").unwrap();
        display.draw_char(i32::MAX, i32::MIN, b'|', Color::On, Color::Off, 255).unwrap();
        display.set_font(None);
        display.draw_char(i32::MIN, i32::MAX, b'A', Color::On, Color::Off, 255).unwrap();

        let (w, h) = (display.width(), display.height());
        for y in 0..h {
            for x in 0..w {
                assert!(!display.read_pixel(x, y).unwrap(), "({}, {}) lit", x, y);
            }
        }
    }

    #[test]
    fn test_empty_bounds() {
        let display = display();
        assert_eq!(
            display.get_text_bounds("\r", 5, 7),
            TextBounds { x: 5, y: 7, w: 0, h: 0 }
        );
    }

    #[test]
    fn test_fmt_write_renders() {
        let mut display = display();
        write!(display, "{}", 42).unwrap();
        assert_eq!(display.cursor(), (12, 0));
        assert!(display.read_pixel(0, 3).unwrap() || display.read_pixel(1, 3).unwrap());
    }
}
