//! Controller-side collaborator: whatever bus carries commands and pixels

use std::io;

use display_interface::{DataFormat, WriteOnlyDataCommand};

pub trait DisplayTransport {
    /// Send a single controller command byte
    fn send_control_byte(&mut self, byte: u8) -> io::Result<()>;

    /// Send a burst of command bytes (addressing, scroll setup)
    fn send_bytes(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Send one chunk of framebuffer data while streaming a frame
    fn send_bitmap_range(&mut self, bytes: &[u8]) -> io::Result<()>;
}

impl<T: DisplayTransport + ?Sized> DisplayTransport for &mut T {
    fn send_control_byte(&mut self, byte: u8) -> io::Result<()> {
        (**self).send_control_byte(byte)
    }

    fn send_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).send_bytes(bytes)
    }

    fn send_bitmap_range(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).send_bitmap_range(bytes)
    }
}

/// Adapter for `display-interface` buses (I2C/SPI interface crates)
pub struct InterfaceTransport<DI> {
    interface: DI,
}

impl<DI: WriteOnlyDataCommand> InterfaceTransport<DI> {
    pub fn new(interface: DI) -> Self {
        Self { interface }
    }

    pub fn release(self) -> DI {
        self.interface
    }
}

fn interface_error(err: display_interface::DisplayError) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("display interface: {:?}", err))
}

impl<DI: WriteOnlyDataCommand> DisplayTransport for InterfaceTransport<DI> {
    fn send_control_byte(&mut self, byte: u8) -> io::Result<()> {
        self.interface
            .send_commands(DataFormat::U8(&[byte]))
            .map_err(interface_error)
    }

    fn send_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.interface
            .send_commands(DataFormat::U8(bytes))
            .map_err(interface_error)
    }

    fn send_bitmap_range(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.interface
            .send_data(DataFormat::U8(bytes))
            .map_err(interface_error)
    }
}

/// One recorded transport call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Control(u8),
    Commands(Vec<u8>),
    Bitmap(Vec<u8>),
}

/// Records everything sent, for host tests and the demo.
/// Can be told to fail after a number of successful calls.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    events: Vec<TransportEvent>,
    fail_after: Option<usize>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call once `calls` more calls have succeeded
    pub fn fail_after(&mut self, calls: usize) {
        self.fail_after = Some(self.events.len() + calls);
    }

    pub fn heal(&mut self) {
        self.fail_after = None;
    }

    pub fn events(&self) -> &[TransportEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.fail_after = None;
    }

    /// Bitmap bytes of every burst so far, concatenated
    pub fn bitmap_bytes(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|event| match event {
                TransportEvent::Bitmap(bytes) => Some(bytes.as_slice()),
                _ => None,
            })
            .flatten()
            .copied()
            .collect()
    }

    /// Bitmap bytes of the most recent full frame of `frame_size` bytes
    pub fn last_frame(&self, frame_size: usize) -> Option<Vec<u8>> {
        let bytes = self.bitmap_bytes();
        if frame_size == 0 || bytes.len() < frame_size {
            return None;
        }
        let frames = bytes.len() / frame_size;
        Some(bytes[(frames - 1) * frame_size..frames * frame_size].to_vec())
    }

    pub fn bitmap_burst_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, TransportEvent::Bitmap(_)))
            .count()
    }

    fn record(&mut self, event: TransportEvent) -> io::Result<()> {
        if let Some(limit) = self.fail_after {
            if self.events.len() >= limit {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "injected transport fault"));
            }
        }
        self.events.push(event);
        Ok(())
    }
}

impl DisplayTransport for MemoryTransport {
    fn send_control_byte(&mut self, byte: u8) -> io::Result<()> {
        self.record(TransportEvent::Control(byte))
    }

    fn send_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.record(TransportEvent::Commands(bytes.to_vec()))
    }

    fn send_bitmap_range(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.record(TransportEvent::Bitmap(bytes.to_vec()))
    }
}
