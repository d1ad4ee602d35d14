// SPDX-License-Identifier: MIT

//! Bitmap primitives and the sector free map built on them.

use alloc::{vec, vec::Vec};

use hdrio::sector::SectorDevice;

use crate::core::allocator::FreeSectorMap;
use crate::core::errors::{FsError, FsResult};
use crate::core::geometry::SectorId;

/// Bit-level access to a byte slice, least significant bit first:
/// bit 0 is the LSB of byte 0, bit 8 the LSB of byte 1.
///
/// Bits past the end of the slice read as clear and ignore writes.
pub trait BitmapOps {
    /// Sets bit `bit` to `value` and returns its previous value.
    fn set_bit(&mut self, bit: usize, value: bool) -> bool;

    fn get_bit(&self, bit: usize) -> bool;

    /// First clear bit in `start..limit`.
    fn find_first_zero(&self, start: usize, limit: usize) -> Option<usize>;

    fn count_ones(&self) -> usize;
}

impl BitmapOps for [u8] {
    #[inline]
    fn set_bit(&mut self, bit: usize, value: bool) -> bool {
        let Some(byte) = self.get_mut(bit / 8) else {
            return false;
        };
        let mask = 1u8 << (bit % 8);
        let was = *byte & mask != 0;
        if value {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
        was
    }

    #[inline]
    fn get_bit(&self, bit: usize) -> bool {
        self.get(bit / 8)
            .is_some_and(|byte| byte & (1 << (bit % 8)) != 0)
    }

    fn find_first_zero(&self, start: usize, limit: usize) -> Option<usize> {
        let limit = limit.min(self.len() * 8);
        let mut bit = start;
        while bit < limit {
            // bits below `bit` in this byte were already scanned
            let byte = self[bit / 8] | ((1u8 << (bit % 8)) - 1);
            if byte != u8::MAX {
                let found = bit / 8 * 8 + byte.trailing_ones() as usize;
                return (found < limit).then_some(found);
            }
            bit = (bit / 8 + 1) * 8;
        }
        None
    }

    fn count_ones(&self) -> usize {
        self.iter().map(|b| b.count_ones() as usize).sum()
    }
}

/// Free-sector bitmap, one bit per device sector, first-fit allocation.
///
/// The map can persist itself in consecutive sectors of the device it
/// describes (see [`FreeMap::storage_sectors`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeMap {
    bits: Vec<u8>,
    num_sectors: u32,
}

impl FreeMap {
    /// A map of `num_sectors` sectors, all free.
    pub fn new(num_sectors: u32) -> Self {
        Self {
            bits: vec![0u8; (num_sectors as usize).div_ceil(8)],
            num_sectors,
        }
    }

    #[inline]
    pub fn num_sectors(&self) -> u32 {
        self.num_sectors
    }

    #[inline]
    pub fn used_count(&self) -> usize {
        self.bits.count_ones()
    }

    /// Sectors needed to store a map of `num_sectors` bits.
    pub fn storage_sectors(num_sectors: u32, sector_size: usize) -> u32 {
        (num_sectors as usize).div_ceil(8).div_ceil(sector_size) as u32
    }

    /// Loads the map from the sectors starting at `first`.
    pub fn fetch_from<D: SectorDevice + ?Sized>(
        &mut self,
        disk: &mut D,
        first: SectorId,
    ) -> FsResult {
        let sector_size = disk.sector_size();
        let count = Self::storage_sectors(self.num_sectors, sector_size);
        let mut buf = vec![0u8; sector_size];

        for (i, chunk) in self.bits.chunks_mut(sector_size).enumerate() {
            disk.read_sector(first + i as u32, &mut buf)?;
            chunk.copy_from_slice(&buf[..chunk.len()]);
        }

        // Bits past the last sector are padding and must stay clear.
        for bit in self.num_sectors as usize..self.bits.len() * 8 {
            self.bits.set_bit(bit, false);
        }
        log::debug!(
            "free map loaded from {count} sector(s) at {first}: {} used of {}",
            self.used_count(),
            self.num_sectors
        );
        Ok(())
    }

    /// Writes the map to the sectors starting at `first`.
    pub fn write_back<D: SectorDevice + ?Sized>(&self, disk: &mut D, first: SectorId) -> FsResult {
        let sector_size = disk.sector_size();
        let end = first as u64 + Self::storage_sectors(self.num_sectors, sector_size) as u64;
        if end > disk.sector_count() as u64 {
            return Err(FsError::Corrupted("Free map does not fit on the device"));
        }

        let mut buf = vec![0u8; sector_size];
        for (i, chunk) in self.bits.chunks(sector_size).enumerate() {
            buf.fill(0);
            buf[..chunk.len()].copy_from_slice(chunk);
            disk.write_sector(first + i as u32, &buf)?;
        }
        Ok(())
    }

    #[inline]
    fn check(&self, sector: SectorId) {
        assert!(
            sector < self.num_sectors,
            "sector {sector} outside free map of {} sectors",
            self.num_sectors
        );
    }
}

impl FreeSectorMap for FreeMap {
    #[inline]
    fn free_count(&self) -> usize {
        self.num_sectors as usize - self.used_count()
    }

    fn allocate_one(&mut self) -> Option<SectorId> {
        let bit = self.bits.find_first_zero(0, self.num_sectors as usize)?;
        self.bits.set_bit(bit, true);
        Some(bit as SectorId)
    }

    fn mark_used(&mut self, sector: SectorId) {
        self.check(sector);
        self.bits.set_bit(sector as usize, true);
    }

    fn mark_free(&mut self, sector: SectorId) {
        self.check(sector);
        self.bits.set_bit(sector as usize, false);
    }

    fn is_used(&self, sector: SectorId) -> bool {
        self.check(sector);
        self.bits.get_bit(sector as usize)
    }
}
