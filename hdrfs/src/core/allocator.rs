// SPDX-License-Identifier: MIT

use crate::core::geometry::SectorId;

/// Free-sector map consumed by [`crate::header::FileHeader`].
///
/// `allocate_one` marks the sector it returns as used. Callers check
/// `free_count` before a multi-sector allocation, so `None` only shows up
/// when the map is exhausted.
pub trait FreeSectorMap {
    /// Number of sectors currently free.
    fn free_count(&self) -> usize;

    /// Finds a free sector, marks it used and returns it.
    fn allocate_one(&mut self) -> Option<SectorId>;

    fn mark_used(&mut self, sector: SectorId);

    fn mark_free(&mut self, sector: SectorId);

    fn is_used(&self, sector: SectorId) -> bool;
}
