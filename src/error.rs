use std::fmt;
use std::io;

/// Errors surfaced by the frame cache, the drawing engine and its collaborators
#[derive(Debug)]
pub enum GfxError {
    /// Bad color value, read-only or missing source, invalid geometry
    InvalidArgument(&'static str),
    /// Backing medium read/write failed at the given medium offset
    StorageIo { offset: usize, source: io::Error },
    /// Sending commands or bitmap data to the controller failed
    TransportIo(io::Error),
}

impl GfxError {
    pub fn storage(offset: usize, source: io::Error) -> Self {
        GfxError::StorageIo { offset, source }
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, GfxError::StorageIo { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, GfxError::TransportIo(_))
    }
}

impl fmt::Display for GfxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GfxError::InvalidArgument(what) => write!(f, "invalid argument: {}", what),
            GfxError::StorageIo { offset, source } => {
                write!(f, "storage I/O failed at offset 0x{:04x}: {}", offset, source)
            }
            GfxError::TransportIo(source) => write!(f, "transport I/O failed: {}", source),
        }
    }
}

impl std::error::Error for GfxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GfxError::InvalidArgument(_) => None,
            GfxError::StorageIo { source, .. } => Some(source),
            GfxError::TransportIo(source) => Some(source),
        }
    }
}

pub type Result<T> = core::result::Result<T, GfxError>;
