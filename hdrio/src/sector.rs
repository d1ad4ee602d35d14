// SPDX-License-Identifier: MIT

//! Synchronous sector-addressed disk.
//!
//! A [`SectorDisk`] turns any byte-addressed [`BlockIO`] into a device of
//! `sector_count` fixed-size sectors. Every transfer moves exactly one
//! sector and has completed when the call returns.

use crate::{BlockIO, BlockIOError, BlockIOResult};

/// Sector-granular device consumed by the file header manager.
pub trait SectorDevice {
    /// Size of one sector in bytes.
    fn sector_size(&self) -> usize;

    /// Number of addressable sectors.
    fn sector_count(&self) -> u32;

    /// Reads sector `sector` into `buf`, which must be one sector long.
    fn read_sector(&mut self, sector: u32, buf: &mut [u8]) -> BlockIOResult;

    /// Writes `data`, which must be one sector long, to sector `sector`.
    fn write_sector(&mut self, sector: u32, data: &[u8]) -> BlockIOResult;

    /// Flushes the backing store.
    fn sync(&mut self) -> BlockIOResult {
        Ok(())
    }
}

#[derive(Debug)]
pub struct SectorDisk<'a, IO: BlockIO + ?Sized> {
    io: &'a mut IO,
    sector_size: usize,
    sector_count: u32,
}

impl<'a, IO: BlockIO + ?Sized> SectorDisk<'a, IO> {
    /// Lays `sector_count` sectors of `sector_size` bytes over `io`,
    /// which must already be large enough to hold them all.
    pub fn new(io: &'a mut IO, sector_size: usize, sector_count: u32) -> BlockIOResult<Self> {
        if sector_size == 0 {
            return Err(BlockIOError::Other("Sector size must be non-zero"));
        }
        let needed = sector_count as u64 * sector_size as u64;
        let available = io.capacity()?;
        if available < needed {
            return Err(BlockIOError::DeviceTooSmall { needed, available });
        }
        Ok(Self {
            io,
            sector_size,
            sector_count,
        })
    }

    /// Byte offset of `sector` on the underlying IO.
    #[inline]
    pub fn sector_offset(&self, sector: u32) -> u64 {
        sector as u64 * self.sector_size as u64
    }

    pub fn into_inner(self) -> &'a mut IO {
        self.io
    }

    #[inline]
    fn check(&self, sector: u32, len: usize) -> BlockIOResult {
        if sector >= self.sector_count {
            return Err(BlockIOError::SectorOutOfRange {
                sector,
                count: self.sector_count,
            });
        }
        if len != self.sector_size {
            return Err(BlockIOError::BadBufferLength {
                expected: self.sector_size,
                got: len,
            });
        }
        Ok(())
    }
}

impl<'a, IO: BlockIO + ?Sized> SectorDevice for SectorDisk<'a, IO> {
    #[inline]
    fn sector_size(&self) -> usize {
        self.sector_size
    }

    #[inline]
    fn sector_count(&self) -> u32 {
        self.sector_count
    }

    fn read_sector(&mut self, sector: u32, buf: &mut [u8]) -> BlockIOResult {
        self.check(sector, buf.len())?;
        log::trace!("read sector {sector}");
        self.io.read_at(self.sector_offset(sector), buf)
    }

    fn write_sector(&mut self, sector: u32, data: &[u8]) -> BlockIOResult {
        self.check(sector, data.len())?;
        log::trace!("write sector {sector}");
        self.io.write_at(self.sector_offset(sector), data)
    }

    fn sync(&mut self) -> BlockIOResult {
        self.io.flush()
    }
}
