// SPDX-License-Identifier: MIT

use core::fmt;

pub use hdrio::errors::*;

/// Errors returned by the file header manager.
///
/// A sector found free while a header still claims it is not represented
/// here: that is a consistency violation and aborts via panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    IO(BlockIOError),
    /// The free map cannot cover every data and index sector of the file.
    InsufficientSpace { needed: usize, free: usize },
    /// The file needs more sectors than the double indirect tier can address.
    FileTooLarge { sectors: usize, max: usize },
    OffsetOutOfRange { offset: u32, length: u32 },
    GeometryMismatch { expected: usize, found: usize },
    InvalidGeometry(&'static str),
    Corrupted(&'static str),
}

impl FsError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsError::IO(_) => "IO error",
            FsError::InsufficientSpace { .. } => "Not enough free sectors",
            FsError::FileTooLarge { .. } => "File too large for header",
            FsError::OffsetOutOfRange { .. } => "Offset past end of file",
            FsError::GeometryMismatch { .. } => "Device sector size does not match header geometry",
            FsError::InvalidGeometry(msg) => msg,
            FsError::Corrupted(msg) => msg,
        }
    }

    pub fn io(&self) -> Option<BlockIOError> {
        match self {
            FsError::IO(e) => Some(*e),
            _ => None,
        }
    }
}

impl From<BlockIOError> for FsError {
    fn from(e: BlockIOError) -> Self {
        FsError::IO(e)
    }
}

pub type FsResult<T = ()> = Result<T, FsError>;

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        match self {
            FsError::InsufficientSpace { needed, free } => {
                write!(f, " (needed {needed}, free {free})")?
            }
            FsError::FileTooLarge { sectors, max } => {
                write!(f, " ({sectors} sectors, max {max})")?
            }
            FsError::OffsetOutOfRange { offset, length } => {
                write!(f, " (offset {offset}, length {length})")?
            }
            FsError::GeometryMismatch { expected, found } => {
                write!(f, " (expected {expected}, found {found})")?
            }
            _ => {}
        }
        if let Some(src) = self.io() {
            write!(f, "\n  caused by: {src}")?;
        }
        Ok(())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FsError::IO(e) => Some(e),
            _ => None,
        }
    }
}
