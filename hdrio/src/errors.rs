// SPDX-License-Identifier: MIT

use core::fmt;

pub type BlockIOResult<T = ()> = core::result::Result<T, BlockIOError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockIOError {
    Other(&'static str),
    /// Byte range past the end of the storage.
    OutOfBounds,
    Unsupported,
    /// Sector transfers take buffers of exactly one sector.
    BadBufferLength { expected: usize, got: usize },
    SectorOutOfRange { sector: u32, count: u32 },
    /// Storage cannot hold the requested sector layout.
    DeviceTooSmall { needed: u64, available: u64 },
}

impl BlockIOError {
    pub fn msg(&self) -> &'static str {
        match self {
            BlockIOError::Other(msg) => msg,
            BlockIOError::OutOfBounds => "Out of bounds",
            BlockIOError::Unsupported => "Unsupported operation",
            BlockIOError::BadBufferLength { .. } => "Buffer is not one sector long",
            BlockIOError::SectorOutOfRange { .. } => "Sector out of range",
            BlockIOError::DeviceTooSmall { .. } => "Device too small",
        }
    }
}

impl From<&'static str> for BlockIOError {
    #[inline]
    fn from(msg: &'static str) -> Self {
        BlockIOError::Other(msg)
    }
}

impl fmt::Display for BlockIOError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.msg())?;
        match *self {
            BlockIOError::BadBufferLength { expected, got } => {
                write!(f, " (expected {expected} bytes, got {got})")
            }
            BlockIOError::SectorOutOfRange { sector, count } => {
                write!(f, " (sector {sector}, device has {count})")
            }
            BlockIOError::DeviceTooSmall { needed, available } => {
                write!(f, " (needs {needed} bytes, has {available})")
            }
            _ => Ok(()),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BlockIOError {}
