pub mod address;
pub mod cache;
pub mod commands;
pub mod draw_target;
pub mod engine;
pub mod font;
pub mod font5x7;
pub mod medium;
pub mod primitives;
pub mod text;
pub mod transport;

use embedded_graphics_core::pixelcolor::BinaryColor;

use crate::error::GfxError;

pub use cache::{CacheStats, FrameCache, Source, SourceId};
pub use engine::{default_splash, Backing, DrawState, GfxDisplay};
pub use font::{GfxFont, GfxGlyph};
pub use medium::{RamMedium, RamMediumHandle, StorageMedium};
pub use text::TextBounds;
pub use transport::{DisplayTransport, InterfaceTransport, MemoryTransport};

/// Pixel value on a 1bpp panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Off,
    On,
    Invert,
}

impl Color {
    /// Read-modify-write operation that applies this color
    pub fn bit_op(self) -> BitOp {
        match self {
            Color::Off => BitOp::Clear,
            Color::On => BitOp::Set,
            Color::Invert => BitOp::Toggle,
        }
    }
}

impl TryFrom<u8> for Color {
    type Error = GfxError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Color::Off),
            1 => Ok(Color::On),
            2 => Ok(Color::Invert),
            _ => Err(GfxError::InvalidArgument("color must be 0 (off), 1 (on) or 2 (invert)")),
        }
    }
}

impl From<BinaryColor> for Color {
    fn from(color: BinaryColor) -> Self {
        match color {
            BinaryColor::Off => Color::Off,
            BinaryColor::On => Color::On,
        }
    }
}

/// Display rotation, clockwise in 90 degree steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [Rotation::Deg0, Rotation::Deg90, Rotation::Deg180, Rotation::Deg270];

    /// Rotation from a quarter-turn count; only the low two bits matter
    pub fn from_index(index: u8) -> Self {
        match index & 0x03 {
            0 => Rotation::Deg0,
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            _ => Rotation::Deg270,
        }
    }

    pub fn index(self) -> u8 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 1,
            Rotation::Deg180 => 2,
            Rotation::Deg270 => 3,
        }
    }

    /// 90 and 270 swap the logical axes
    pub fn is_transposed(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

/// Bitwise update applied to one framebuffer byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOp {
    Set,
    Clear,
    Toggle,
}

impl BitOp {
    #[inline]
    pub fn apply(self, byte: u8, mask: u8) -> u8 {
        match self {
            BitOp::Set => byte | mask,
            BitOp::Clear => byte & !mask,
            BitOp::Toggle => byte ^ mask,
        }
    }
}
