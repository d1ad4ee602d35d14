// SPDX-License-Identifier: MIT

//! The file header: which sectors hold a file's bytes.

use alloc::{vec, vec::Vec};
use core::iter;

use hdrio::sector::SectorDevice;

use crate::core::allocator::FreeSectorMap;
use crate::core::errors::{FsError, FsResult};
use crate::core::geometry::{Geometry, SectorId};
use crate::header::dump::{HeaderDump, SectorContents};
use crate::header::record::{self, HeaderRecord};
use crate::header::tier::Tier;

/// An index table and the satellite sector that stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexTable {
    pub location: SectorId,
    pub entries: Vec<SectorId>,
}

/// Second-level index: a table of leaf-table locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoubleIndex {
    pub location: SectorId,
    pub rows: Vec<IndexTable>,
}

/// In-memory file header.
///
/// Lists only hold valid sectors; an empty header is the reset state.
/// The header sector itself belongs to the caller and is never
/// allocated or freed here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    geometry: Geometry,
    num_bytes: u32,
    num_sectors: u32,
    direct: Vec<SectorId>,
    single: Option<IndexTable>,
    double: Option<DoubleIndex>,
}

impl Default for FileHeader {
    fn default() -> Self {
        Self::new(Geometry::default())
    }
}

fn take_sector<M: FreeSectorMap + ?Sized>(map: &mut M) -> FsResult<SectorId> {
    let sector = map.allocate_one().ok_or(FsError::InsufficientSpace {
        needed: 1,
        free: 0,
    })?;
    log::trace!("allocated sector {sector}");
    Ok(sector)
}

impl FileHeader {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            num_bytes: 0,
            num_sectors: 0,
            direct: Vec::new(),
            single: None,
            double: None,
        }
    }

    #[inline]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Number of bytes in the file.
    #[inline]
    pub fn file_length(&self) -> u32 {
        self.num_bytes
    }

    /// Number of data sectors in the file.
    #[inline]
    pub fn num_sectors(&self) -> u32 {
        self.num_sectors
    }

    #[inline]
    pub fn tier(&self) -> Tier {
        Tier::select(&self.geometry, self.num_sectors as usize)
    }

    #[inline]
    pub fn direct_sectors(&self) -> &[SectorId] {
        &self.direct
    }

    /// Data entries of the single index table.
    pub fn indirect_sectors(&self) -> &[SectorId] {
        self.single.as_ref().map_or(&[], |t| t.entries.as_slice())
    }

    /// Satellite holding the single index table.
    pub fn single_table(&self) -> Option<SectorId> {
        self.single.as_ref().map(|t| t.location)
    }

    /// Satellite holding the double index table.
    pub fn double_table(&self) -> Option<SectorId> {
        self.double.as_ref().map(|d| d.location)
    }

    /// Leaf-table locations listed in the double index table.
    pub fn double_index(&self) -> Vec<SectorId> {
        self.double
            .iter()
            .flat_map(|d| d.rows.iter().map(|r| r.location))
            .collect()
    }

    /// Data entries of leaf row `row`; empty past the last row.
    pub fn double_leaf_sectors(&self, row: usize) -> &[SectorId] {
        self.double
            .as_ref()
            .and_then(|d| d.rows.get(row))
            .map_or(&[], |r| r.entries.as_slice())
    }

    /// Data sectors in file order.
    pub fn data_sectors(&self) -> impl Iterator<Item = SectorId> + '_ {
        let single = self.single.iter().flat_map(|t| t.entries.iter());
        let leaves = self
            .double
            .iter()
            .flat_map(|d| d.rows.iter())
            .flat_map(|r| r.entries.iter());
        self.direct.iter().chain(single).chain(leaves).copied()
    }

    /// Sectors holding index tables.
    pub fn satellite_sectors(&self) -> impl Iterator<Item = SectorId> + '_ {
        let single = self.single.iter().map(|t| t.location);
        let double = self.double.iter().flat_map(|d| {
            iter::once(d.location).chain(d.rows.iter().map(|r| r.location))
        });
        single.chain(double)
    }

    /// Every sector the free map holds on behalf of this file.
    pub fn all_sectors(&self) -> Vec<SectorId> {
        self.data_sectors().chain(self.satellite_sectors()).collect()
    }

    /// Reserves sectors for a new file of `file_size` bytes.
    ///
    /// Nothing is touched when the request cannot be met: the tier must be
    /// addressable and the free map must cover every data and index sector.
    pub fn allocate<M: FreeSectorMap + ?Sized>(&mut self, map: &mut M, file_size: u32) -> FsResult {
        let sectors = self.geometry.sectors_for(file_size);
        let tier = Tier::select(&self.geometry, sectors);

        if !tier.fits(&self.geometry) {
            log::warn!("refusing {file_size} byte file: {sectors} sectors exceed header capacity");
            return Err(FsError::FileTooLarge {
                sectors,
                max: self.geometry.max_sectors(),
            });
        }
        let needed = tier.total_sectors();
        let free = map.free_count();
        if free < needed {
            log::warn!("refusing {file_size} byte file: needs {needed} sectors, {free} free");
            return Err(FsError::InsufficientSpace { needed, free });
        }

        *self = Self::new(self.geometry);
        self.num_bytes = file_size;
        self.num_sectors = sectors as u32;
        log::debug!("allocating {file_size} bytes as {tier}");

        if let Err(e) = self.allocate_tier(map, tier) {
            // The map ran dry despite the count check; give back what was taken.
            self.release(map);
            return Err(e);
        }
        Ok(())
    }

    /// Takes sectors slot by slot, recording each one in `self` as soon as
    /// it is taken so that a failure can be rolled back.
    fn allocate_tier<M: FreeSectorMap + ?Sized>(&mut self, map: &mut M, tier: Tier) -> FsResult {
        for _ in 0..tier.direct() {
            self.direct.push(take_sector(map)?);
        }

        if let Tier::Single { indirect, .. } | Tier::Double { indirect, .. } = tier {
            let single = self.single.insert(IndexTable {
                location: take_sector(map)?,
                entries: Vec::with_capacity(indirect),
            });
            for _ in 0..indirect {
                single.entries.push(take_sector(map)?);
            }
        }

        if let Tier::Double { rows, leaves, .. } = tier {
            let per_row = self.geometry.index_entries();
            let double = self.double.insert(DoubleIndex {
                location: take_sector(map)?,
                rows: Vec::with_capacity(rows),
            });
            for _ in 0..rows {
                double.rows.push(IndexTable {
                    location: take_sector(map)?,
                    entries: Vec::with_capacity(per_row),
                });
            }
            for i in 0..leaves {
                double.rows[i / per_row].entries.push(take_sector(map)?);
            }
        }
        Ok(())
    }

    /// Frees whatever a failed allocation managed to take.
    fn release<M: FreeSectorMap + ?Sized>(&mut self, map: &mut M) {
        for sector in self.all_sectors() {
            map.mark_free(sector);
        }
        *self = Self::new(self.geometry);
    }

    /// Returns every data and index sector of the file to the free map.
    /// Returns the number of sectors freed.
    ///
    /// The slot lists are cleared but the length is kept, so the header
    /// remembers it was released until the next `allocate` or `fetch_from`.
    ///
    /// # Panics
    ///
    /// If any of those sectors is not marked used, or if the header was
    /// already released. The free map and the header disagree (double free
    /// or corruption) and nothing can be trusted past that point.
    pub fn deallocate<M: FreeSectorMap + ?Sized>(&mut self, map: &mut M) -> usize {
        let tier = self.tier();
        let sectors = self.all_sectors();
        log::debug!(
            "deallocating {} bytes ({}): {} sectors",
            self.num_bytes,
            tier.name(),
            sectors.len()
        );

        if sectors.len() != tier.total_sectors() {
            log::error!(
                "file header of {} sectors holds {} sector ids",
                self.num_sectors,
                sectors.len()
            );
            panic!("consistency violation: file header deallocated twice");
        }

        self.direct.clear();
        self.single = None;
        self.double = None;

        for &sector in &sectors {
            if !map.is_used(sector) {
                log::error!("sector {sector} of file header is already free");
                panic!("consistency violation: sector {sector} freed while not in use");
            }
            map.mark_free(sector);
        }
        sectors.len()
    }

    fn check_device<D: SectorDevice + ?Sized>(&self, disk: &D) -> FsResult {
        let found = disk.sector_size();
        if found != self.geometry.sector_size() {
            return Err(FsError::GeometryMismatch {
                expected: self.geometry.sector_size(),
                found,
            });
        }
        Ok(())
    }

    /// Loads the header stored at `sector`, including every index table.
    ///
    /// On error the in-memory header is left unchanged.
    pub fn fetch_from<D: SectorDevice + ?Sized>(
        &mut self,
        disk: &mut D,
        sector: SectorId,
    ) -> FsResult {
        self.check_device(disk)?;
        let geometry = self.geometry;
        let mut buf = vec![0u8; geometry.sector_size()];

        disk.read_sector(sector, &mut buf)?;
        let raw = HeaderRecord::decode(&geometry, &buf)?;

        let sectors = geometry.sectors_for(raw.num_bytes);
        if raw.num_sectors as usize != sectors {
            return Err(FsError::Corrupted("Sector count does not match byte length"));
        }
        let tier = Tier::select(&geometry, sectors);
        if !tier.fits(&geometry) {
            return Err(FsError::Corrupted("Sector count exceeds header capacity"));
        }

        let (used, unused) = raw.direct.split_at(tier.direct());
        if unused.iter().any(Option::is_some) {
            return Err(FsError::Corrupted("Stray direct slot past end of file"));
        }
        let direct = used
            .iter()
            .map(|s| {
                s.ok_or(FsError::Corrupted("Hole in direct slots"))
                    .and_then(|s| on_device(disk, s))
            })
            .collect::<FsResult<Vec<_>>>()?;

        let mut header = Self {
            geometry,
            num_bytes: raw.num_bytes,
            num_sectors: raw.num_sectors,
            direct,
            single: None,
            double: None,
        };

        match (tier, raw.single_table, raw.double_table) {
            (Tier::Direct { .. }, None, None) => {}
            (Tier::Single { indirect, .. }, Some(location), None) => {
                header.single = Some(read_table(disk, &geometry, &mut buf, location, indirect)?);
            }
            (Tier::Double { indirect, rows, leaves, .. }, Some(single), Some(double)) => {
                header.single = Some(read_table(disk, &geometry, &mut buf, single, indirect)?);

                let index = read_table(disk, &geometry, &mut buf, double, rows)?;
                let per_row = geometry.index_entries();
                let mut leaf_tables = Vec::with_capacity(index.entries.len());
                for (i, &location) in index.entries.iter().enumerate() {
                    let count = (leaves - i * per_row).min(per_row);
                    leaf_tables.push(read_table(disk, &geometry, &mut buf, location, count)?);
                }
                header.double = Some(DoubleIndex {
                    location: double,
                    rows: leaf_tables,
                });
            }
            _ => return Err(FsError::Corrupted("Index table slots do not match file size")),
        }

        log::debug!("fetched header at sector {sector}: {} bytes, {tier}", header.num_bytes);
        *self = header;
        Ok(())
    }

    /// Writes the header to `sector`, then every index table it owns.
    pub fn write_back<D: SectorDevice + ?Sized>(&self, disk: &mut D, sector: SectorId) -> FsResult {
        self.check_device(disk)?;
        let geometry = &self.geometry;
        let mut buf = vec![0u8; geometry.sector_size()];

        let mut direct = vec![None; geometry.num_direct()];
        for (slot, &s) in direct.iter_mut().zip(&self.direct) {
            *slot = Some(s);
        }
        let raw = HeaderRecord {
            num_bytes: self.num_bytes,
            num_sectors: self.num_sectors,
            single_table: self.single_table(),
            double_table: self.double_table(),
            direct,
        };
        raw.encode(geometry, &mut buf)?;
        disk.write_sector(sector, &buf)?;

        if let Some(single) = &self.single {
            record::encode_table(geometry, &single.entries, &mut buf)?;
            disk.write_sector(single.location, &buf)?;
        }
        if let Some(double) = &self.double {
            record::encode_table(geometry, &self.double_index(), &mut buf)?;
            disk.write_sector(double.location, &buf)?;
            for row in &double.rows {
                record::encode_table(geometry, &row.entries, &mut buf)?;
                disk.write_sector(row.location, &buf)?;
            }
        }

        log::debug!(
            "wrote header at sector {sector} with {} index sector(s)",
            self.satellite_sectors().count()
        );
        Ok(())
    }

    /// Sector holding byte `offset` of the file, in any tier.
    pub fn byte_to_sector(&self, offset: u32) -> FsResult<SectorId> {
        if offset >= self.num_bytes {
            return Err(FsError::OffsetOutOfRange {
                offset,
                length: self.num_bytes,
            });
        }
        let index = offset as usize / self.geometry.sector_size();
        self.data_sector(index)
            .ok_or(FsError::Corrupted("Header shorter than its byte length"))
    }

    /// Data sector `index` in file order.
    pub fn data_sector(&self, index: usize) -> Option<SectorId> {
        if let Some(&sector) = self.direct.get(index) {
            return Some(sector);
        }
        let index = index - self.direct.len();
        let indirect = self.indirect_sectors();
        if let Some(&sector) = indirect.get(index) {
            return Some(sector);
        }
        let index = index - indirect.len();
        let per_row = self.geometry.index_entries();
        self.double_leaf_sectors(index / per_row)
            .get(index % per_row)
            .copied()
    }

    /// Reads back every data sector for inspection.
    pub fn dump<D: SectorDevice + ?Sized>(&self, disk: &mut D) -> FsResult<HeaderDump> {
        self.check_device(disk)?;
        let sector_size = self.geometry.sector_size();
        let mut remaining = self.num_bytes as usize;
        let mut contents = Vec::with_capacity(self.num_sectors as usize);

        for sector in self.data_sectors() {
            let mut bytes = vec![0u8; sector_size];
            disk.read_sector(sector, &mut bytes)?;
            bytes.truncate(remaining.min(sector_size));
            remaining -= bytes.len();
            contents.push(SectorContents { sector, bytes });
        }

        Ok(HeaderDump {
            num_bytes: self.num_bytes,
            tier: self.tier(),
            data_sectors: self.data_sectors().collect(),
            satellite_sectors: self.satellite_sectors().collect(),
            contents,
        })
    }
}

fn read_table<D: SectorDevice + ?Sized>(
    disk: &mut D,
    geometry: &Geometry,
    buf: &mut [u8],
    location: SectorId,
    count: usize,
) -> FsResult<IndexTable> {
    on_device(disk, location)?;
    disk.read_sector(location, buf)?;
    let entries = record::decode_table(geometry, buf, count)?;
    for &entry in &entries {
        on_device(disk, entry)?;
    }
    Ok(IndexTable { location, entries })
}

/// Passes `sector` through if `disk` has it.
fn on_device<D: SectorDevice + ?Sized>(disk: &D, sector: SectorId) -> FsResult<SectorId> {
    if sector < disk.sector_count() {
        Ok(sector)
    } else {
        Err(FsError::Corrupted("Sector id past end of device"))
    }
}
