use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::display::address::buffer_size;
use crate::error::GfxError;

/// Panel geometry, cache sizing and initial text settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Raw panel width in pixels
    pub width: u16,
    /// Raw panel height in pixels, a multiple of 8
    pub height: u16,
    /// Bytes per cache line; must divide the framebuffer size
    pub cache_line_size: usize,
    /// Byte offset of the draw buffer inside an external medium
    pub draw_offset: usize,
    /// Quarter turns clockwise, 0..=3
    pub rotation: u8,
    pub text_size: u8,
    pub text_wrap: bool,
    pub cp437: bool,
    /// Panel runs from an external supply instead of the charge pump
    pub external_vcc: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 128,
            height: 64,
            cache_line_size: 64,
            draw_offset: 0,
            rotation: 0,
            text_size: 1,
            text_wrap: true,
            cp437: false,
            external_vcc: false,
        }
    }
}

impl DisplayConfig {
    pub fn buffer_size(&self) -> usize {
        buffer_size(usize::from(self.width), usize::from(self.height))
    }

    pub fn validate(&self) -> Result<(), GfxError> {
        if self.width == 0 || self.height == 0 {
            return Err(GfxError::InvalidArgument("panel dimensions must be non-zero"));
        }
        if self.height % 8 != 0 {
            return Err(GfxError::InvalidArgument("panel height must be a multiple of 8"));
        }
        // Column and page addresses are single command bytes
        if self.width > 256 {
            return Err(GfxError::InvalidArgument("panel too wide for column addressing"));
        }
        if self.height / 8 > 256 {
            return Err(GfxError::InvalidArgument("panel too tall for page addressing"));
        }
        if self.cache_line_size == 0 || self.buffer_size() % self.cache_line_size != 0 {
            return Err(GfxError::InvalidArgument("cache line size must divide the framebuffer size"));
        }
        if self.rotation > 3 {
            return Err(GfxError::InvalidArgument("rotation must be 0..=3"));
        }
        if self.text_size == 0 {
            return Err(GfxError::InvalidArgument("text size must be at least 1"));
        }
        Ok(())
    }
}

/// Load a JSON config from `path`, or fall back to defaults when there is none
pub fn load_or_default(path: Option<&Path>) -> Result<DisplayConfig> {
    let config = match path {
        Some(path) if path.exists() => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let config: DisplayConfig = serde_json::from_str(&json)
                .with_context(|| format!("parsing {}", path.display()))?;
            log::info!("Loaded display configuration from {}", path.display());
            config
        }
        Some(path) => {
            log::warn!("{} not found, using default display configuration", path.display());
            DisplayConfig::default()
        }
        None => DisplayConfig::default(),
    };

    config.validate().context("invalid display configuration")?;
    Ok(config)
}
