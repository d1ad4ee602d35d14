// SPDX-License-Identifier: MIT

//! Diagnostic snapshot of a file header and the bytes it maps.

use alloc::vec::Vec;
use core::fmt;

use crate::core::geometry::SectorId;
use crate::header::tier::Tier;

/// File bytes read back from one data sector, clipped at end of file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorContents {
    pub sector: SectorId,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderDump {
    pub num_bytes: u32,
    pub tier: Tier,
    /// Data sectors in file order.
    pub data_sectors: Vec<SectorId>,
    /// Index-table sectors.
    pub satellite_sectors: Vec<SectorId>,
    pub contents: Vec<SectorContents>,
}

/// Writes `bytes` with printable ASCII verbatim and everything else as
/// `\` followed by lowercase hex.
pub fn write_escaped(f: &mut impl fmt::Write, bytes: &[u8]) -> fmt::Result {
    for &b in bytes {
        if (0x20..=0x7E).contains(&b) {
            f.write_char(b as char)?;
        } else {
            write!(f, "\\{b:x}")?;
        }
    }
    Ok(())
}

fn write_list(f: &mut fmt::Formatter<'_>, sectors: &[SectorId]) -> fmt::Result {
    for (i, s) in sectors.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{s}")?;
    }
    Ok(())
}

impl fmt::Display for HeaderDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "File header: {} bytes, {}", self.num_bytes, self.tier)?;
        f.write_str("Data sectors: ")?;
        write_list(f, &self.data_sectors)?;
        writeln!(f)?;
        if !self.satellite_sectors.is_empty() {
            f.write_str("Index sectors: ")?;
            write_list(f, &self.satellite_sectors)?;
            writeln!(f)?;
        }
        writeln!(f, "Contents:")?;
        for c in &self.contents {
            write_escaped(f, &c.bytes)?;
            writeln!(f)?;
        }
        Ok(())
    }
}
