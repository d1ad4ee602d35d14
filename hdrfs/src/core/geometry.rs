// SPDX-License-Identifier: MIT

//! Sector geometry shared by every header operation.

use crate::core::errors::{FsError, FsResult};

/// Identifier of a device sector.
pub type SectorId = u32;

/// On-disk marker for an unused slot. Never stored in memory.
pub const NO_SECTOR: u32 = u32::MAX;

pub const DEFAULT_SECTOR_SIZE: usize = 128;
pub const DEFAULT_NUM_DIRECT: usize = 10;

/// Bytes of one on-disk sector id.
pub const SECTOR_ID_SIZE: usize = core::mem::size_of::<u32>();

/// Fixed fields ahead of the direct slots in a header sector:
/// byte length, sector count, single table and double table locations.
pub const HEADER_PREFIX_SIZE: usize = 4 * SECTOR_ID_SIZE;

/// Shape of a file header for a given sector size.
///
/// `num_direct` direct slots live in the header sector itself. Every index
/// table (single, double, and each double leaf row) holds
/// `num_direct + 2` entries in one satellite sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    sector_size: usize,
    num_direct: usize,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            sector_size: DEFAULT_SECTOR_SIZE,
            num_direct: DEFAULT_NUM_DIRECT,
        }
    }
}

impl Geometry {
    pub fn new(sector_size: usize, num_direct: usize) -> FsResult<Self> {
        if num_direct < 2 {
            return Err(FsError::InvalidGeometry("At least two direct slots are required"));
        }
        let geometry = Self {
            sector_size,
            num_direct,
        };
        if geometry.header_size() > sector_size {
            return Err(FsError::InvalidGeometry("Header record does not fit in one sector"));
        }
        if geometry.index_table_size() > sector_size {
            return Err(FsError::InvalidGeometry("Index table does not fit in one sector"));
        }
        Ok(geometry)
    }

    /// Largest geometry whose header and index tables both fit `sector_size`.
    pub fn for_sector_size(sector_size: usize) -> FsResult<Self> {
        let by_header = sector_size.saturating_sub(HEADER_PREFIX_SIZE) / SECTOR_ID_SIZE;
        let by_table = (sector_size / SECTOR_ID_SIZE).saturating_sub(2);
        Self::new(sector_size, by_header.min(by_table))
    }

    #[inline]
    pub fn sector_size(&self) -> usize {
        self.sector_size
    }

    #[inline]
    pub fn num_direct(&self) -> usize {
        self.num_direct
    }

    /// Entries per index table.
    #[inline]
    pub fn index_entries(&self) -> usize {
        self.num_direct + 2
    }

    /// Highest sector count served by the single indirect tier.
    #[inline]
    pub fn max_single(&self) -> usize {
        self.num_direct + self.index_entries()
    }

    /// Highest sector count a header can address at all.
    #[inline]
    pub fn max_sectors(&self) -> usize {
        self.max_single() + self.index_entries() * self.index_entries()
    }

    #[inline]
    pub fn max_file_size(&self) -> u64 {
        self.max_sectors() as u64 * self.sector_size as u64
    }

    #[inline]
    pub fn header_size(&self) -> usize {
        HEADER_PREFIX_SIZE + self.num_direct * SECTOR_ID_SIZE
    }

    #[inline]
    pub fn index_table_size(&self) -> usize {
        self.index_entries() * SECTOR_ID_SIZE
    }

    /// Sectors needed to hold `bytes` bytes of file data.
    #[inline]
    pub fn sectors_for(&self, bytes: u32) -> usize {
        (bytes as usize).div_ceil(self.sector_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacities() {
        let geo = Geometry::default();
        assert_eq!(geo.index_entries(), 12);
        assert_eq!(geo.max_single(), 22);
        assert_eq!(geo.max_sectors(), 22 + 144);
        assert_eq!(geo.max_file_size(), 166 * 128);
        assert_eq!(geo.header_size(), 56);
        assert_eq!(geo.index_table_size(), 48);
        assert_eq!(Geometry::new(128, 10), Ok(geo));
    }

    #[test]
    fn test_sectors_for() {
        let geo = Geometry::default();
        assert_eq!(geo.sectors_for(0), 0);
        assert_eq!(geo.sectors_for(1), 1);
        assert_eq!(geo.sectors_for(128), 1);
        assert_eq!(geo.sectors_for(900), 8);
        assert_eq!(geo.sectors_for(1536), 12);
    }

    #[test]
    fn test_rejects_oversized_layouts() {
        assert!(matches!(
            Geometry::new(128, 1),
            Err(FsError::InvalidGeometry(_))
        ));
        // 16 + 4 * 29 = 132 > 128
        assert!(Geometry::new(128, 29).is_err());
        // exact fit: 16 + 4 * 4 = 32
        assert!(Geometry::new(32, 4).is_ok());
        assert!(Geometry::new(32, 5).is_err());
    }

    #[test]
    fn test_for_sector_size() {
        let geo = Geometry::for_sector_size(128).unwrap();
        assert_eq!(geo.num_direct(), 28);
        assert_eq!(geo.header_size(), 128);
        assert!(geo.index_table_size() <= 128);

        let geo = Geometry::for_sector_size(512).unwrap();
        assert_eq!(geo.num_direct(), 124);
        assert!(Geometry::for_sector_size(8).is_err());
    }
}
