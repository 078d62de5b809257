//! Cached 1bpp framebuffer and drawing engine for SSD1306-class displays.
//!
//! The framebuffer can live in slow external memory; drawing goes through a
//! single write-back cache line. Rendering, text and the frame push are all
//! host-testable against in-memory collaborators.

pub mod config;
pub mod display;
pub mod error;
pub mod logging;

#[cfg(test)]
mod tests;

pub use config::DisplayConfig;
pub use display::{
    default_splash, Backing, Color, DisplayTransport, GfxDisplay, GfxFont, GfxGlyph, Rotation,
    StorageMedium,
};
pub use error::{GfxError, Result};
