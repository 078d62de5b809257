// SSD1306 command set used by the engine

use heapless::Vec;

use crate::error::{GfxError, Result};

pub const CMD_SETCONTRAST: u8 = 0x81;
pub const CMD_NORMALDISPLAY: u8 = 0xA6;
pub const CMD_INVERTDISPLAY: u8 = 0xA7;
pub const CMD_DISPLAYOFF: u8 = 0xAE;
pub const CMD_DISPLAYON: u8 = 0xAF;
pub const CMD_COLUMNADDR: u8 = 0x21;
pub const CMD_PAGEADDR: u8 = 0x22;

pub const CMD_ACTIVATE_SCROLL: u8 = 0x2F;
pub const CMD_DEACTIVATE_SCROLL: u8 = 0x2E;
pub const CMD_SET_VERTICAL_SCROLL_AREA: u8 = 0xA3;
pub const CMD_RIGHT_HORIZONTAL_SCROLL: u8 = 0x26;
pub const CMD_LEFT_HORIZONTAL_SCROLL: u8 = 0x27;
pub const CMD_VERTICAL_AND_RIGHT_HORIZONTAL_SCROLL: u8 = 0x29;
pub const CMD_VERTICAL_AND_LEFT_HORIZONTAL_SCROLL: u8 = 0x2A;

pub const CONTRAST_DIMMED: u8 = 0x00;
pub const CONTRAST_EXTERNAL_VCC: u8 = 0x9F;
pub const CONTRAST_SWITCHCAP_VCC: u8 = 0xCF;

/// Command bursts never exceed this many bytes
pub const COMMAND_BUFFER_SIZE: usize = 16;

pub type CommandBuffer = Vec<u8, COMMAND_BUFFER_SIZE>;

fn burst(bytes: &[u8]) -> Result<CommandBuffer> {
    Vec::from_slice(bytes).map_err(|_| GfxError::InvalidArgument("command burst too long"))
}

/// Column/page window covering the whole panel, sent before each frame
pub fn frame_window(raw_width: usize, raw_height: usize) -> Result<CommandBuffer> {
    let last_column = u8::try_from(raw_width - 1)
        .map_err(|_| GfxError::InvalidArgument("panel too wide for column addressing"))?;
    let last_page = u8::try_from(raw_height / 8 - 1)
        .map_err(|_| GfxError::InvalidArgument("panel too tall for page addressing"))?;
    burst(&[CMD_COLUMNADDR, 0, last_column, CMD_PAGEADDR, 0, last_page])
}

/// Continuous horizontal scroll of pages `start..=stop`
pub fn horizontal_scroll(left: bool, start: u8, stop: u8) -> Result<CommandBuffer> {
    let direction = if left {
        CMD_LEFT_HORIZONTAL_SCROLL
    } else {
        CMD_RIGHT_HORIZONTAL_SCROLL
    };
    burst(&[direction, 0x00, start, 0x00, stop, 0x00, 0xFF, CMD_ACTIVATE_SCROLL])
}

/// Diagonal scroll: vertical area spans the whole panel, one row offset per step
pub fn diagonal_scroll(left: bool, start: u8, stop: u8, raw_height: u8) -> Result<CommandBuffer> {
    let direction = if left {
        CMD_VERTICAL_AND_LEFT_HORIZONTAL_SCROLL
    } else {
        CMD_VERTICAL_AND_RIGHT_HORIZONTAL_SCROLL
    };
    burst(&[
        CMD_SET_VERTICAL_SCROLL_AREA,
        0x00,
        raw_height,
        direction,
        0x00,
        start,
        0x00,
        stop,
        0x01,
        CMD_ACTIVATE_SCROLL,
    ])
}

pub fn contrast(dim: bool, external_vcc: bool) -> u8 {
    match (dim, external_vcc) {
        (true, _) => CONTRAST_DIMMED,
        (false, true) => CONTRAST_EXTERNAL_VCC,
        (false, false) => CONTRAST_SWITCHCAP_VCC,
    }
}
