// External framebuffer storage (SPI SRAM/FRAM or anything byte addressable)

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

/// Byte-addressable memory the frame cache can page lines in and out of
pub trait StorageMedium {
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> io::Result<()>;
    fn write(&mut self, offset: usize, buf: &[u8]) -> io::Result<()>;
    fn capacity(&self) -> usize;
}

/// I/O counters kept by [`RamMedium`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediumStats {
    pub reads: u32,
    pub writes: u32,
    pub bytes_read: usize,
    pub bytes_written: usize,
}

#[derive(Debug)]
struct RamState {
    bytes: Vec<u8>,
    stats: MediumStats,
    fail_reads: bool,
    fail_writes: bool,
}

/// Host RAM standing in for an external memory part.
///
/// The medium is handed to the cache by value; keep a [`RamMediumHandle`]
/// to inspect contents, watch the I/O counters or inject faults.
#[derive(Debug)]
pub struct RamMedium {
    state: Rc<RefCell<RamState>>,
}

#[derive(Debug, Clone)]
pub struct RamMediumHandle {
    state: Rc<RefCell<RamState>>,
}

impl RamMedium {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Rc::new(RefCell::new(RamState {
                bytes: vec![0; capacity],
                stats: MediumStats::default(),
                fail_reads: false,
                fail_writes: false,
            })),
        }
    }

    pub fn handle(&self) -> RamMediumHandle {
        RamMediumHandle {
            state: Rc::clone(&self.state),
        }
    }
}

fn check_range(offset: usize, len: usize, capacity: usize) -> io::Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= capacity => Ok(()),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("range {}+{} exceeds medium capacity {}", offset, len, capacity),
        )),
    }
}

impl StorageMedium for RamMedium {
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_reads {
            return Err(io::Error::new(io::ErrorKind::Other, "injected read fault"));
        }
        check_range(offset, buf.len(), state.bytes.len())?;
        buf.copy_from_slice(&state.bytes[offset..offset + buf.len()]);
        state.stats.reads += 1;
        state.stats.bytes_read += buf.len();
        Ok(())
    }

    fn write(&mut self, offset: usize, buf: &[u8]) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_writes {
            return Err(io::Error::new(io::ErrorKind::Other, "injected write fault"));
        }
        check_range(offset, buf.len(), state.bytes.len())?;
        state.bytes[offset..offset + buf.len()].copy_from_slice(buf);
        state.stats.writes += 1;
        state.stats.bytes_written += buf.len();
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.state.borrow().bytes.len()
    }
}

impl RamMediumHandle {
    pub fn stats(&self) -> MediumStats {
        self.state.borrow().stats
    }

    pub fn reset_stats(&self) {
        self.state.borrow_mut().stats = MediumStats::default();
    }

    /// Copy of `len` bytes starting at `offset`
    pub fn snapshot(&self, offset: usize, len: usize) -> Vec<u8> {
        self.state.borrow().bytes[offset..offset + len].to_vec()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.borrow_mut().fail_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.borrow_mut().fail_writes = fail;
    }
}
