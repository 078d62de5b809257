// Cross-module tests: rendering properties, cache round trips, full-frame scenarios

mod cache_properties;

use crate::config::DisplayConfig;
use crate::display::{default_splash, Backing, GfxDisplay, MemoryTransport, RamMedium};

pub(crate) const WIDTH: i32 = 128;
pub(crate) const HEIGHT: i32 = 64;

/// 128x64 panel over a plain buffer, splash already consumed
pub(crate) fn direct_display() -> GfxDisplay<MemoryTransport> {
    let config = DisplayConfig::default();
    let mut display = GfxDisplay::new(
        MemoryTransport::new(),
        &config,
        Backing::Direct,
        default_splash(128, 64),
    )
    .unwrap();
    display.clear_display().unwrap();
    display
}

/// 128x64 panel paged through 32-byte lines of external RAM
pub(crate) fn paged_display() -> GfxDisplay<MemoryTransport> {
    let config = DisplayConfig {
        cache_line_size: 32,
        draw_offset: 16,
        ..DisplayConfig::default()
    };
    let medium = RamMedium::new(16 + config.buffer_size());
    let mut display = GfxDisplay::new(
        MemoryTransport::new(),
        &config,
        Backing::External(Box::new(medium)),
        default_splash(128, 64),
    )
    .unwrap();
    display.clear_display().unwrap();
    display
}

/// Every byte of the draw buffer
pub(crate) fn snapshot(display: &mut GfxDisplay<MemoryTransport>) -> Vec<u8> {
    let size = display.raw_width() * display.raw_height() / 8;
    (0..size).map(|offset| display.frame_byte(offset).unwrap()).collect()
}
