// SPDX-License-Identifier: MIT
#![cfg_attr(not(feature = "std"), no_std)]

//! Byte- and sector-addressed storage used by the file header manager.

pub mod errors;
pub mod sector;
pub mod stats;

// Backends
#[cfg(feature = "mem")]
mod mem;

#[cfg(feature = "std")]
mod file;

pub mod prelude {
    pub use super::errors::*;
    pub use super::sector::{SectorDevice, SectorDisk};
    pub use super::stats::*;
    pub use super::{BlockIO, BlockIOSetLen};

    #[cfg(feature = "mem")]
    pub use super::mem::MemBlockIO;

    #[cfg(feature = "std")]
    pub use super::file::FileBlockIO;
}

use errors::*;

/// Byte-addressed storage: RAM, an image file, a raw device.
///
/// Offsets are absolute. A transfer either moves the whole buffer or fails.
pub trait BlockIO {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> BlockIOResult;

    fn write_at(&mut self, offset: u64, data: &[u8]) -> BlockIOResult;

    /// Pushes buffered writes to the backing store.
    fn flush(&mut self) -> BlockIOResult {
        Ok(())
    }

    /// Number of bytes currently addressable.
    fn capacity(&mut self) -> BlockIOResult<u64>;
}

/// Storage that can be resized.
pub trait BlockIOSetLen: BlockIO {
    fn set_len(&mut self, len: u64) -> BlockIOResult;
}

/// Index range of `len` bytes at `offset`, if it ends within `capacity`.
#[cfg(feature = "mem")]
pub(crate) fn checked_range(
    offset: u64,
    len: usize,
    capacity: u64,
) -> BlockIOResult<core::ops::Range<usize>> {
    let end = offset
        .checked_add(len as u64)
        .filter(|&end| end <= capacity)
        .ok_or(BlockIOError::OutOfBounds)?;
    Ok(offset as usize..end as usize)
}
