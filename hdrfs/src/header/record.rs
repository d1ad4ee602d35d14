// SPDX-License-Identifier: MIT

//! On-disk layout of a header sector and of index-table satellites.
//!
//! Header sector:
//!
//! | offset | field                          |
//! |--------|--------------------------------|
//! | 0      | byte length                    |
//! | 4      | sector count                   |
//! | 8      | single index table location    |
//! | 12     | double index table location    |
//! | 16     | `num_direct` direct slots      |
//!
//! An index table is `num_direct + 2` slots at the start of its sector.
//! All integers are little-endian; unused slots hold [`NO_SECTOR`] and
//! the rest of each sector is zero.

use alloc::vec::Vec;

use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::core::errors::{FsError, FsResult};
use crate::core::geometry::*;

/// Fixed prefix of the header sector.
#[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct RawHeaderPrefix {
    pub num_bytes: U32,
    pub num_sectors: U32,
    pub single_table: U32,
    pub double_table: U32,
}

const _: () = assert!(core::mem::size_of::<RawHeaderPrefix>() == HEADER_PREFIX_SIZE);

/// Decoded header sector. Slots keep their on-disk positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRecord {
    pub num_bytes: u32,
    pub num_sectors: u32,
    pub single_table: Option<SectorId>,
    pub double_table: Option<SectorId>,
    pub direct: Vec<Option<SectorId>>,
}

#[inline]
fn to_raw(sector: Option<SectorId>) -> U32 {
    U32::new(sector.unwrap_or(NO_SECTOR))
}

#[inline]
fn from_raw(raw: U32) -> Option<SectorId> {
    match raw.get() {
        NO_SECTOR => None,
        sector => Some(sector),
    }
}

fn slots(buf: &[u8], count: usize) -> FsResult<&[U32]> {
    let bytes = buf
        .get(..count * SECTOR_ID_SIZE)
        .ok_or(FsError::Corrupted("Sector too small for slot table"))?;
    <[U32]>::ref_from_bytes(bytes).map_err(|_| FsError::Corrupted("Unreadable slot table"))
}

fn slots_mut(buf: &mut [u8], count: usize) -> FsResult<&mut [U32]> {
    let bytes = buf
        .get_mut(..count * SECTOR_ID_SIZE)
        .ok_or(FsError::Corrupted("Sector too small for slot table"))?;
    <[U32]>::mut_from_bytes(bytes).map_err(|_| FsError::Corrupted("Unwritable slot table"))
}

impl HeaderRecord {
    /// Serializes into `buf`, one full sector.
    pub fn encode(&self, geometry: &Geometry, buf: &mut [u8]) -> FsResult {
        if self.direct.len() != geometry.num_direct() {
            return Err(FsError::Corrupted("Direct slot count does not match geometry"));
        }
        buf.fill(0);

        let prefix = RawHeaderPrefix {
            num_bytes: U32::new(self.num_bytes),
            num_sectors: U32::new(self.num_sectors),
            single_table: to_raw(self.single_table),
            double_table: to_raw(self.double_table),
        };
        buf.get_mut(..HEADER_PREFIX_SIZE)
            .ok_or(FsError::Corrupted("Sector too small for header"))?
            .copy_from_slice(prefix.as_bytes());

        let direct = slots_mut(&mut buf[HEADER_PREFIX_SIZE..], geometry.num_direct())?;
        for (slot, sector) in direct.iter_mut().zip(&self.direct) {
            *slot = to_raw(*sector);
        }
        Ok(())
    }

    pub fn decode(geometry: &Geometry, buf: &[u8]) -> FsResult<Self> {
        let (prefix, rest) = RawHeaderPrefix::read_from_prefix(buf)
            .map_err(|_| FsError::Corrupted("Sector too small for header"))?;
        let direct = slots(rest, geometry.num_direct())?
            .iter()
            .map(|raw| from_raw(*raw))
            .collect();

        Ok(Self {
            num_bytes: prefix.num_bytes.get(),
            num_sectors: prefix.num_sectors.get(),
            single_table: from_raw(prefix.single_table),
            double_table: from_raw(prefix.double_table),
            direct,
        })
    }
}

/// Serializes an index table into `buf`, one full sector.
pub fn encode_table(geometry: &Geometry, entries: &[SectorId], buf: &mut [u8]) -> FsResult {
    if entries.len() > geometry.index_entries() {
        return Err(FsError::Corrupted("Index table overflow"));
    }
    buf.fill(0);

    let table = slots_mut(buf, geometry.index_entries())?;
    for (i, slot) in table.iter_mut().enumerate() {
        *slot = to_raw(entries.get(i).copied());
    }
    Ok(())
}

/// Reads the first `count` entries of an index table.
///
/// Those entries must be valid and every later slot must be empty.
pub fn decode_table(geometry: &Geometry, buf: &[u8], count: usize) -> FsResult<Vec<SectorId>> {
    let table = slots(buf, geometry.index_entries())?;
    if count > table.len() {
        return Err(FsError::Corrupted("Index table overflow"));
    }
    if table[count..].iter().any(|raw| from_raw(*raw).is_some()) {
        return Err(FsError::Corrupted("Stray entry past end of index table"));
    }
    table[..count]
        .iter()
        .map(|raw| from_raw(*raw).ok_or(FsError::Corrupted("Hole in index table")))
        .collect()
}
