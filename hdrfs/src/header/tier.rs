// SPDX-License-Identifier: MIT

//! Capacity tier selection.

use core::fmt;

use crate::core::geometry::Geometry;

/// Addressing tier of a file header, with the exact shape it needs.
///
/// Counts are in sectors. Index-table locations live in dedicated slots
/// of the header record, so every direct slot holds file data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// `data` direct slots, nothing else.
    Direct { data: usize },
    /// All direct slots plus `indirect` entries in the single index table.
    Single { direct: usize, indirect: usize },
    /// Full direct and single tiers, plus `rows` leaf tables holding
    /// `leaves` data sectors row-major.
    Double {
        direct: usize,
        indirect: usize,
        rows: usize,
        leaves: usize,
    },
}

impl Tier {
    /// Picks the tier for a file of `sector_count` data sectors.
    ///
    /// Never fails: a count past [`Geometry::max_sectors`] yields a
    /// `Double` shape that [`Tier::fits`] rejects.
    pub fn select(geometry: &Geometry, sector_count: usize) -> Self {
        let direct = geometry.num_direct();
        let entries = geometry.index_entries();

        if sector_count <= direct {
            Tier::Direct { data: sector_count }
        } else if sector_count <= geometry.max_single() {
            Tier::Single {
                direct,
                indirect: sector_count - direct,
            }
        } else {
            let leaves = sector_count - geometry.max_single();
            Tier::Double {
                direct,
                indirect: entries,
                rows: leaves.div_ceil(entries),
                leaves,
            }
        }
    }

    /// Whether this shape is addressable with `geometry`.
    pub fn fits(&self, geometry: &Geometry) -> bool {
        match *self {
            Tier::Direct { data } => data <= geometry.num_direct(),
            Tier::Single { indirect, .. } => indirect <= geometry.index_entries(),
            Tier::Double { rows, .. } => rows <= geometry.index_entries(),
        }
    }

    /// Number of direct slots in use.
    pub fn direct(&self) -> usize {
        match *self {
            Tier::Direct { data } => data,
            Tier::Single { direct, .. } | Tier::Double { direct, .. } => direct,
        }
    }

    /// Number of single index table entries in use.
    pub fn indirect(&self) -> usize {
        match *self {
            Tier::Direct { .. } => 0,
            Tier::Single { indirect, .. } | Tier::Double { indirect, .. } => indirect,
        }
    }

    /// Sectors holding file bytes.
    pub fn data_sectors(&self) -> usize {
        match *self {
            Tier::Direct { data } => data,
            Tier::Single { direct, indirect } => direct + indirect,
            Tier::Double {
                direct,
                indirect,
                leaves,
                ..
            } => direct + indirect + leaves,
        }
    }

    /// Sectors holding index tables instead of file bytes.
    pub fn satellite_sectors(&self) -> usize {
        match *self {
            Tier::Direct { .. } => 0,
            Tier::Single { .. } => 1,
            // double index table + one table per leaf row
            Tier::Double { rows, .. } => 2 + rows,
        }
    }

    /// Everything the free map must provide for this shape.
    pub fn total_sectors(&self) -> usize {
        self.data_sectors() + self.satellite_sectors()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tier::Direct { .. } => "direct",
            Tier::Single { .. } => "single indirect",
            Tier::Double { .. } => "double indirect",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} data + {} index sectors)",
            self.name(),
            self.data_sectors(),
            self.satellite_sectors()
        )
    }
}
