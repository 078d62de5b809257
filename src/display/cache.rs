// Write-back line cache in front of the framebuffer sources
// The full mirror may live in slow external memory; only one line is staged here

use std::borrow::Cow;

use log::{debug, trace};

use super::address::{self, line_base};
use super::medium::StorageMedium;
use super::BitOp;
use crate::error::{GfxError, Result};

/// The framebuffer sources sharing one cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceId {
    /// Editable drawing buffer
    Draw,
    /// Read-only splash image
    Splash,
}

impl SourceId {
    const COUNT: usize = 2;

    fn index(self) -> usize {
        match self {
            SourceId::Draw => 0,
            SourceId::Splash => 1,
        }
    }
}

enum Storage {
    /// Lives in the external medium at this byte offset, reached through the line
    Medium { offset: usize },
    /// Directly addressable writable buffer, no line staging
    Buffer(Box<[u8]>),
    /// Directly addressable constant bitmap
    Constant(Cow<'static, [u8]>),
}

/// A named backing store for one full framebuffer mirror
pub struct Source {
    id: SourceId,
    storage: Storage,
}

impl Source {
    pub fn external(id: SourceId, offset: usize) -> Self {
        Self {
            id,
            storage: Storage::Medium { offset },
        }
    }

    pub fn buffer(id: SourceId, size: usize) -> Self {
        Self {
            id,
            storage: Storage::Buffer(vec![0; size].into_boxed_slice()),
        }
    }

    pub fn constant(id: SourceId, bytes: impl Into<Cow<'static, [u8]>>) -> Self {
        Self {
            id,
            storage: Storage::Constant(bytes.into()),
        }
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self.storage, Storage::Constant(_))
    }

    /// True when accesses go through the cache line rather than straight to memory
    pub fn is_cached(&self) -> bool {
        matches!(self.storage, Storage::Medium { .. })
    }

    fn medium_offset(&self) -> Option<usize> {
        match self.storage {
            Storage::Medium { offset } => Some(offset),
            _ => None,
        }
    }
}

/// One staged window of a medium-backed source
#[derive(Debug)]
pub struct CacheLine {
    bytes: Box<[u8]>,
    base: usize,
    dirty: bool,
    initialized: bool,
}

impl CacheLine {
    fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size].into_boxed_slice(),
            base: 0,
            dirty: false,
            initialized: false,
        }
    }

    fn contains(&self, offset: usize) -> bool {
        self.initialized && offset >= self.base && offset - self.base < self.bytes.len()
    }

    fn invalidate(&mut self) {
        self.initialized = false;
        self.dirty = false;
    }

    pub fn base(&self) -> usize {
        self.base
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

/// Line traffic counters, handy for checking that hits stay off the bus
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub loads: u32,
    pub flushes: u32,
    pub source_switches: u32,
}

pub struct FrameCache {
    medium: Option<Box<dyn StorageMedium>>,
    line: CacheLine,
    sources: [Option<Source>; SourceId::COUNT],
    active: Option<SourceId>,
    raw_width: usize,
    buffer_size: usize,
    stats: CacheStats,
}

impl FrameCache {
    /// Build a cache for a `raw_width x raw_height` panel.
    ///
    /// `medium` is the external memory medium-backed sources page through; pass
    /// `None` when every source is a directly addressable buffer.
    pub fn new(
        medium: Option<Box<dyn StorageMedium>>,
        raw_width: usize,
        raw_height: usize,
        line_size: usize,
    ) -> Result<Self> {
        if raw_width == 0 || raw_height == 0 || raw_height % 8 != 0 {
            return Err(GfxError::InvalidArgument("panel height must be a non-zero multiple of 8"));
        }
        let buffer_size = address::buffer_size(raw_width, raw_height);
        if line_size == 0 || line_size > buffer_size || buffer_size % line_size != 0 {
            return Err(GfxError::InvalidArgument("cache line size must divide the framebuffer size"));
        }

        Ok(Self {
            medium,
            line: CacheLine::new(line_size),
            sources: [None, None],
            active: None,
            raw_width,
            buffer_size,
            stats: CacheStats::default(),
        })
    }

    /// Install a source, checking that it can hold a full framebuffer.
    ///
    /// Replacing the active source writes its dirty line back to the old
    /// storage first, then deactivates it.
    pub fn register_source(&mut self, source: Source) -> Result<()> {
        match &source.storage {
            Storage::Medium { offset } => {
                let medium = self
                    .medium
                    .as_ref()
                    .ok_or(GfxError::InvalidArgument("external source without a storage medium"))?;
                let fits = offset
                    .checked_add(self.buffer_size)
                    .map_or(false, |end| end <= medium.capacity());
                if !fits {
                    return Err(GfxError::InvalidArgument("framebuffer does not fit in medium at offset"));
                }
            }
            Storage::Buffer(bytes) if bytes.len() != self.buffer_size => {
                return Err(GfxError::InvalidArgument("buffer source has the wrong size"));
            }
            Storage::Constant(bytes) if bytes.len() != self.buffer_size => {
                return Err(GfxError::InvalidArgument("constant source has the wrong size"));
            }
            _ => {}
        }

        let id = source.id;
        if self.active == Some(id) {
            self.flush_line()?;
            self.line.invalidate();
            self.active = None;
        }
        self.sources[id.index()] = Some(source);
        Ok(())
    }

    pub fn line_size(&self) -> usize {
        self.line.bytes.len()
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn line(&self) -> &CacheLine {
        &self.line
    }

    pub fn active_source(&self) -> Option<SourceId> {
        self.active
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    fn source(&self, id: SourceId) -> Result<&Source> {
        self.sources[id.index()]
            .as_ref()
            .ok_or(GfxError::InvalidArgument("source not initialized"))
    }

    fn active(&self) -> Result<&Source> {
        let id = self.active.ok_or(GfxError::InvalidArgument("no active source"))?;
        self.source(id)
    }

    /// Make `id` the active source, writing back the outgoing line first.
    ///
    /// Re-selecting the active source keeps the line as is. Any real switch
    /// drops the line, so the next access always reloads.
    pub fn select_source(&mut self, id: SourceId) -> Result<()> {
        self.source(id)?;
        if self.active == Some(id) {
            return Ok(());
        }

        if self.active.is_some() && self.line.initialized && self.line.dirty {
            self.flush_line()?;
        }

        debug!("cache source {:?} -> {:?}", self.active, id);
        self.active = Some(id);
        self.line.invalidate();
        self.stats.source_switches += 1;
        Ok(())
    }

    /// Stage the line holding byte `offset`, returning the index of that byte
    /// inside the line (or inside the buffer for direct sources)
    pub fn load_line(&mut self, offset: usize) -> Result<usize> {
        if offset >= self.buffer_size {
            return Err(GfxError::InvalidArgument("address outside framebuffer"));
        }

        let medium_offset = match self.active()?.medium_offset() {
            Some(medium_offset) => medium_offset,
            None => return Ok(offset),
        };

        if self.line.contains(offset) {
            self.stats.hits += 1;
            return Ok(offset - self.line.base);
        }

        if self.line.initialized && self.line.dirty {
            self.flush_line()?;
        }

        let base = line_base(offset, self.line.bytes.len());
        let medium = self
            .medium
            .as_mut()
            .ok_or(GfxError::InvalidArgument("external source without a storage medium"))?;

        self.line.invalidate();
        medium
            .read(medium_offset + base, &mut self.line.bytes)
            .map_err(|e| GfxError::storage(medium_offset + base, e))?;
        self.line.base = base;
        self.line.initialized = true;
        self.stats.loads += 1;
        trace!("cache line loaded at 0x{:04x}", base);

        Ok(offset - base)
    }

    /// `load_line` for raw pixel (x, y)
    pub fn load_pixel_line(&mut self, x: usize, y: usize) -> Result<usize> {
        self.load_line(address::pixel_offset(x, y, self.raw_width))
    }

    fn slot_mut(&mut self, index: usize) -> Result<(&mut u8, bool)> {
        let id = self.active.ok_or(GfxError::InvalidArgument("no active source"))?;
        let source = self.sources[id.index()]
            .as_mut()
            .ok_or(GfxError::InvalidArgument("source not initialized"))?;
        match &mut source.storage {
            Storage::Medium { .. } => Ok((&mut self.line.bytes[index], true)),
            Storage::Buffer(bytes) => Ok((&mut bytes[index], false)),
            Storage::Constant(_) => Err(GfxError::InvalidArgument("source is read-only")),
        }
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.active()?.is_read_only() {
            return Err(GfxError::InvalidArgument("source is read-only"));
        }
        Ok(())
    }

    /// Current value of the byte holding raw pixel (x, y)
    pub fn pixel_byte(&mut self, x: usize, y: usize) -> Result<u8> {
        let index = self.load_pixel_line(x, y)?;
        let source = self.active()?;
        Ok(match &source.storage {
            Storage::Medium { .. } => self.line.bytes[index],
            Storage::Buffer(bytes) => bytes[index],
            Storage::Constant(bytes) => bytes[index],
        })
    }

    /// Direct access to the byte holding raw pixel (x, y).
    ///
    /// Handing out the reference counts as a write: a cached line is marked dirty.
    pub fn pixel_byte_mut(&mut self, x: usize, y: usize) -> Result<&mut u8> {
        self.ensure_writable()?;
        let index = self.load_pixel_line(x, y)?;
        let cached = self.active()?.is_cached();
        if cached {
            self.line.dirty = true;
        }
        let (slot, _) = self.slot_mut(index)?;
        Ok(slot)
    }

    /// Apply `op` with `mask` to the byte holding raw pixel (x, y).
    /// The line only turns dirty when the byte really changes.
    pub fn bit_operation(&mut self, x: usize, y: usize, op: BitOp, mask: u8) -> Result<()> {
        self.ensure_writable()?;
        let index = self.load_pixel_line(x, y)?;
        let (slot, cached) = self.slot_mut(index)?;

        let old = *slot;
        let new = op.apply(old, mask);
        if new == old {
            return Ok(());
        }
        *slot = new;
        if cached {
            self.line.dirty = true;
        }
        Ok(())
    }

    /// Bytes of the line starting at line-aligned `offset`, for streaming out
    pub fn line_bytes(&mut self, offset: usize) -> Result<&[u8]> {
        let line_size = self.line.bytes.len();
        let index = self.load_line(line_base(offset, line_size))?;
        let source = self.active()?;
        Ok(match &source.storage {
            Storage::Medium { .. } => &self.line.bytes[index..],
            Storage::Buffer(bytes) => &bytes[index..index + line_size],
            Storage::Constant(bytes) => &bytes[index..index + line_size],
        })
    }

    /// Write the staged line back to its source if it holds unsaved changes
    pub fn flush_line(&mut self) -> Result<()> {
        if !(self.line.initialized && self.line.dirty) {
            return Ok(());
        }

        let medium_offset = match self.active.and_then(|id| self.sources[id.index()].as_ref()) {
            Some(source) => source.medium_offset(),
            None => None,
        };
        let Some(medium_offset) = medium_offset else {
            self.line.dirty = false;
            return Ok(());
        };

        let medium = self
            .medium
            .as_mut()
            .ok_or(GfxError::InvalidArgument("external source without a storage medium"))?;
        let at = medium_offset + self.line.base;
        medium
            .write(at, &self.line.bytes)
            .map_err(|e| GfxError::storage(at, e))?;

        self.line.dirty = false;
        self.stats.flushes += 1;
        trace!("cache line flushed at 0x{:04x}", self.line.base);
        Ok(())
    }

    /// Zero the whole active source
    pub fn clear_all(&mut self) -> Result<()> {
        self.ensure_writable()?;
        let id = self.active.ok_or(GfxError::InvalidArgument("no active source"))?;

        let source = self.sources[id.index()]
            .as_mut()
            .ok_or(GfxError::InvalidArgument("source not initialized"))?;
        if let Storage::Buffer(bytes) = &mut source.storage {
            bytes.fill(0);
            return Ok(());
        }

        self.line.bytes.fill(0);
        let line_size = self.line.bytes.len();
        for base in (0..self.buffer_size).step_by(line_size) {
            self.line.base = base;
            self.line.initialized = true;
            self.line.dirty = true;
            self.flush_line()?;
        }
        debug!("cleared {} bytes of {:?}", self.buffer_size, id);
        Ok(())
    }
}
