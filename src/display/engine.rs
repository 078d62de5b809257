// Display engine: owns the frame cache, the draw state and the transport

use std::borrow::Cow;

use log::{debug, info, warn};

use super::address::{self, logical_size};
use super::cache::{CacheStats, FrameCache, Source, SourceId};
use super::commands;
use super::font::GfxFont;
use super::medium::StorageMedium;
use super::transport::DisplayTransport;
use super::{Color, Rotation};
use crate::config::DisplayConfig;
use crate::error::{GfxError, Result};

/// Where the editable framebuffer lives
pub enum Backing {
    /// Plain in-memory buffer, addressed without line staging
    Direct,
    /// External medium; the draw source sits at `DisplayConfig::draw_offset`
    External(Box<dyn StorageMedium>),
}

/// Cursor, rotation and text settings of one display
#[derive(Debug, Clone)]
pub struct DrawState {
    pub(crate) cursor_x: i32,
    pub(crate) cursor_y: i32,
    pub(crate) rotation: Rotation,
    pub(crate) raw_width: i32,
    pub(crate) raw_height: i32,
    pub(crate) width: i32,
    pub(crate) height: i32,
    pub(crate) text_color: Color,
    pub(crate) text_bg: Color,
    pub(crate) text_size: u8,
    pub(crate) wrap: bool,
    pub(crate) cp437: bool,
    pub(crate) font: Option<&'static GfxFont>,
}

impl DrawState {
    fn new(config: &DisplayConfig) -> Self {
        let raw_width = i32::from(config.width);
        let raw_height = i32::from(config.height);
        let rotation = Rotation::from_index(config.rotation);
        let (width, height) = logical_size(rotation, raw_width, raw_height);
        Self {
            cursor_x: 0,
            cursor_y: 0,
            rotation,
            raw_width,
            raw_height,
            width,
            height,
            text_color: Color::On,
            text_bg: Color::On,
            text_size: config.text_size.max(1),
            wrap: config.text_wrap,
            cp437: config.cp437,
            font: None,
        }
    }

    pub fn cursor(&self) -> (i32, i32) {
        (self.cursor_x, self.cursor_y)
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn text_size(&self) -> u8 {
        self.text_size
    }

    pub fn text_colors(&self) -> (Color, Color) {
        (self.text_color, self.text_bg)
    }

    pub fn wrap(&self) -> bool {
        self.wrap
    }

    pub fn cp437(&self) -> bool {
        self.cp437
    }

    pub fn font(&self) -> Option<&'static GfxFont> {
        self.font
    }

    /// True when (x, y) lies inside the logical frame
    pub(crate) fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }
}

/// Splash image used when the caller has no logo: a one-pixel frame
pub fn default_splash(width: usize, height: usize) -> Vec<u8> {
    let mut bytes = vec![0; address::buffer_size(width, height)];
    if width == 0 || height == 0 {
        return bytes;
    }

    let mut plot = |x: usize, y: usize| {
        let (offset, mask) = address::pixel_address(x, y, width);
        bytes[offset] |= mask;
    };
    for x in 0..width {
        plot(x, 0);
        plot(x, height - 1);
    }
    for y in 0..height {
        plot(0, y);
        plot(width - 1, y);
    }
    bytes
}

pub struct GfxDisplay<T: DisplayTransport> {
    transport: T,
    pub(crate) cache: FrameCache,
    pub(crate) state: DrawState,
    show_splash: bool,
    external_vcc: bool,
}

impl<T: DisplayTransport> GfxDisplay<T> {
    /// Build the engine, register both sources and arm the splash.
    ///
    /// `splash` must be exactly one framebuffer (`width * height / 8` bytes).
    pub fn new(
        transport: T,
        config: &DisplayConfig,
        backing: Backing,
        splash: impl Into<Cow<'static, [u8]>>,
    ) -> Result<Self> {
        config.validate()?;

        let raw_width = usize::from(config.width);
        let raw_height = usize::from(config.height);
        let size = address::buffer_size(raw_width, raw_height);

        let (medium, draw) = match backing {
            Backing::Direct => (None, Source::buffer(SourceId::Draw, size)),
            Backing::External(medium) => (
                Some(medium),
                Source::external(SourceId::Draw, config.draw_offset),
            ),
        };
        let external = medium.is_some();

        let mut cache = FrameCache::new(medium, raw_width, raw_height, config.cache_line_size)?;
        cache.register_source(draw)?;
        cache.register_source(Source::constant(SourceId::Splash, splash))?;

        let mut display = Self {
            transport,
            cache,
            state: DrawState::new(config),
            show_splash: false,
            external_vcc: config.external_vcc,
        };
        display.reset()?;

        info!(
            "display {}x{} ready ({} bytes, {}-byte lines, {})",
            raw_width,
            raw_height,
            size,
            config.cache_line_size,
            if external { "external medium" } else { "direct buffer" }
        );
        Ok(display)
    }

    /// Blank the draw buffer and show the splash on the next `display()`
    pub fn reset(&mut self) -> Result<()> {
        self.clear_display()?;
        self.show_splash = true;
        Ok(())
    }

    /// Zero the draw buffer and cancel a pending splash
    pub fn clear_display(&mut self) -> Result<()> {
        self.show_splash = false;
        self.cache.select_source(SourceId::Draw)?;
        self.cache.clear_all()
    }

    /// Push one full frame to the controller.
    ///
    /// The first call after `reset()` sends the splash image and then clears
    /// the draw buffer. A failed burst aborts the rest of the frame.
    pub fn display(&mut self) -> Result<()> {
        let result = self.stream_frame();
        if let Err(err) = &result {
            warn!("frame transfer aborted: {}", err);
        }
        result?;

        if self.show_splash {
            info!("splash shown, clearing draw buffer");
            self.clear_display()?;
        }
        Ok(())
    }

    fn stream_frame(&mut self) -> Result<()> {
        let raw_width = self.raw_width();
        let raw_height = self.raw_height();
        let window = commands::frame_window(raw_width, raw_height)?;
        self.transport
            .send_bytes(&window)
            .map_err(GfxError::TransportIo)?;

        let source = if self.show_splash {
            SourceId::Splash
        } else {
            SourceId::Draw
        };
        self.cache.select_source(source)?;

        let line_size = self.cache.line_size();
        let mut bursts = 0;
        for offset in (0..self.cache.buffer_size()).step_by(line_size) {
            let bytes = self.cache.line_bytes(offset)?;
            self.transport
                .send_bitmap_range(bytes)
                .map_err(GfxError::TransportIo)?;
            bursts += 1;
        }
        debug!("sent {:?} frame in {} bursts", source, bursts);
        Ok(())
    }

    /// Write back a pending dirty line
    pub fn flush(&mut self) -> Result<()> {
        self.cache.flush_line()
    }

    /// Route drawing to the editable buffer
    pub(crate) fn select_draw(&mut self) -> Result<()> {
        self.cache.select_source(SourceId::Draw)
    }

    fn command(&mut self, byte: u8) -> Result<()> {
        self.transport
            .send_control_byte(byte)
            .map_err(GfxError::TransportIo)
    }

    fn command_burst(&mut self, bytes: &[u8]) -> Result<()> {
        self.transport.send_bytes(bytes).map_err(GfxError::TransportIo)
    }

    pub fn display_on(&mut self) -> Result<()> {
        self.command(commands::CMD_DISPLAYON)
    }

    pub fn display_off(&mut self) -> Result<()> {
        self.command(commands::CMD_DISPLAYOFF)
    }

    pub fn invert_display(&mut self, invert: bool) -> Result<()> {
        self.command(if invert {
            commands::CMD_INVERTDISPLAY
        } else {
            commands::CMD_NORMALDISPLAY
        })
    }

    /// Drop contrast to the minimum, or restore the level for the supply mode
    pub fn dim(&mut self, dim: bool) -> Result<()> {
        self.command(commands::CMD_SETCONTRAST)?;
        self.command(commands::contrast(dim, self.external_vcc))
    }

    pub fn start_scroll_right(&mut self, start: u8, stop: u8) -> Result<()> {
        let burst = commands::horizontal_scroll(false, start, stop)?;
        self.command_burst(&burst)
    }

    pub fn start_scroll_left(&mut self, start: u8, stop: u8) -> Result<()> {
        let burst = commands::horizontal_scroll(true, start, stop)?;
        self.command_burst(&burst)
    }

    pub fn start_scroll_diag_right(&mut self, start: u8, stop: u8) -> Result<()> {
        let burst = commands::diagonal_scroll(false, start, stop, self.scroll_rows()?)?;
        self.command_burst(&burst)
    }

    pub fn start_scroll_diag_left(&mut self, start: u8, stop: u8) -> Result<()> {
        let burst = commands::diagonal_scroll(true, start, stop, self.scroll_rows()?)?;
        self.command_burst(&burst)
    }

    pub fn stop_scroll(&mut self) -> Result<()> {
        self.command(commands::CMD_DEACTIVATE_SCROLL)
    }

    fn scroll_rows(&self) -> Result<u8> {
        u8::try_from(self.state.raw_height)
            .map_err(|_| GfxError::InvalidArgument("panel too tall for vertical scroll area"))
    }

    pub fn set_rotation(&mut self, rotation: Rotation) {
        let (width, height) = logical_size(rotation, self.state.raw_width, self.state.raw_height);
        self.state.rotation = rotation;
        self.state.width = width;
        self.state.height = height;
    }

    pub fn set_cursor(&mut self, x: i32, y: i32) {
        self.state.cursor_x = x;
        self.state.cursor_y = y;
    }

    /// Foreground only; the background matches it, so text is transparent
    pub fn set_text_color(&mut self, color: Color) {
        self.state.text_color = color;
        self.state.text_bg = color;
    }

    pub fn set_text_color_bg(&mut self, color: Color, background: Color) {
        self.state.text_color = color;
        self.state.text_bg = background;
    }

    pub fn set_text_size(&mut self, size: u8) {
        self.state.text_size = size.max(1);
    }

    pub fn set_text_wrap(&mut self, wrap: bool) {
        self.state.wrap = wrap;
    }

    /// `false` keeps the historical glyph index shift above 0xAF
    pub fn cp437(&mut self, enabled: bool) {
        self.state.cp437 = enabled;
    }

    /// Logical width under the current rotation
    pub fn width(&self) -> i32 {
        self.state.width
    }

    pub fn height(&self) -> i32 {
        self.state.height
    }

    pub fn raw_width(&self) -> usize {
        self.state.raw_width as usize
    }

    pub fn raw_height(&self) -> usize {
        self.state.raw_height as usize
    }

    pub fn rotation(&self) -> Rotation {
        self.state.rotation
    }

    pub fn cursor(&self) -> (i32, i32) {
        self.state.cursor()
    }

    pub fn state(&self) -> &DrawState {
        &self.state
    }

    pub fn splash_pending(&self) -> bool {
        self.show_splash
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Logical pixel state in the draw buffer; outside the frame reads as off
    pub fn read_pixel(&mut self, x: i32, y: i32) -> Result<bool> {
        if !self.state.contains(x, y) {
            return Ok(false);
        }
        let (rx, ry) = address::rotate(
            x,
            y,
            self.state.rotation,
            self.state.raw_width,
            self.state.raw_height,
        );
        self.select_draw()?;
        let (rx, ry) = (rx as usize, ry as usize);
        let byte = self.cache.pixel_byte(rx, ry)?;
        Ok(byte & address::pixel_mask(ry) != 0)
    }

    /// Raw draw-buffer byte at `offset` in the packed layout
    pub fn frame_byte(&mut self, offset: usize) -> Result<u8> {
        if offset >= self.cache.buffer_size() {
            return Err(GfxError::InvalidArgument("address outside framebuffer"));
        }
        let raw_width = self.raw_width();
        self.select_draw()?;
        self.cache
            .pixel_byte(offset % raw_width, (offset / raw_width) * 8)
    }
}
