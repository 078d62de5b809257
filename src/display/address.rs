//! Framebuffer address math for the page-packed 1bpp layout.
//!
//! Eight vertically consecutive pixels of one column share a byte, LSB on top.
//! Everything here is pure; callers clip before asking for an address.
use super::Rotation;

/// High `n` bits of a byte, used for the partial top byte of a vertical run
pub const PREMASK: [u8; 8] = [0x00, 0x80, 0xC0, 0xE0, 0xF0, 0xF8, 0xFC, 0xFE];

/// Low `n` bits of a byte, used for the partial bottom byte of a vertical run
pub const POSTMASK: [u8; 8] = [0x00, 0x01, 0x03, 0x07, 0x0F, 0x1F, 0x3F, 0x7F];

/// Bytes needed to mirror a `width x height` panel
pub const fn buffer_size(width: usize, height: usize) -> usize {
    width * height / 8
}

/// Byte offset of raw pixel (x, y)
#[inline]
pub const fn pixel_offset(x: usize, y: usize, raw_width: usize) -> usize {
    x + (y >> 3) * raw_width
}

/// Bit selecting raw row `y` inside its page byte
#[inline]
pub const fn pixel_mask(y: usize) -> u8 {
    1 << (y & 0x07)
}

pub fn pixel_address(x: usize, y: usize, raw_width: usize) -> (usize, u8) {
    (pixel_offset(x, y, raw_width), pixel_mask(y))
}

/// Start of the cache line holding `offset`
#[inline]
pub const fn line_base(offset: usize, line_size: usize) -> usize {
    offset - offset % line_size
}

/// Map a logical point into raw panel coordinates
pub fn rotate(x: i32, y: i32, rotation: Rotation, raw_width: i32, raw_height: i32) -> (i32, i32) {
    match rotation {
        Rotation::Deg0 => (x, y),
        Rotation::Deg90 => (raw_width - y - 1, x),
        Rotation::Deg180 => (raw_width - x - 1, raw_height - y - 1),
        Rotation::Deg270 => (y, raw_height - x - 1),
    }
}

/// Logical (width, height) seen by callers under `rotation`
pub fn logical_size(rotation: Rotation, raw_width: i32, raw_height: i32) -> (i32, i32) {
    if rotation.is_transposed() {
        (raw_height, raw_width)
    } else {
        (raw_width, raw_height)
    }
}
