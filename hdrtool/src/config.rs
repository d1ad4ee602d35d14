// SPDX-License-Identifier: MIT

use clap::Args;
use hdrfs::prelude::*;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SECTORS: u32 = 1024;

/// Shape of a sector image. Images carry no superblock, so the same
/// description must be given to every command touching an image.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiskConfig {
    pub sector_size: usize,
    pub num_direct: usize,
    pub sectors: u32,
    pub free_map_sector: SectorId,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            sector_size: DEFAULT_SECTOR_SIZE,
            num_direct: DEFAULT_NUM_DIRECT,
            sectors: DEFAULT_SECTORS,
            free_map_sector: 0,
        }
    }
}

/// Disk description flags shared by every subcommand.
#[derive(Debug, Default, Args)]
pub struct DiskArgs {
    /// TOML disk description
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Bytes per sector
    #[arg(long, global = true)]
    pub sector_size: Option<usize>,

    /// Direct slots in each file header
    #[arg(long, global = true)]
    pub num_direct: Option<usize>,

    /// Sectors on the image
    #[arg(long, global = true)]
    pub sectors: Option<u32>,

    /// First sector of the persisted free map
    #[arg(long, global = true)]
    pub free_map_sector: Option<SectorId>,
}

impl DiskConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Loads the optional config file, then applies command line overrides.
    pub fn resolve(args: &DiskArgs) -> anyhow::Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path).map_err(|e| {
                anyhow::anyhow!("Cannot load disk config '{}': {e}", path.display())
            })?,
            None => Self::default(),
        };
        if let Some(v) = args.sector_size {
            config.sector_size = v;
        }
        if let Some(v) = args.num_direct {
            config.num_direct = v;
        }
        if let Some(v) = args.sectors {
            config.sectors = v;
        }
        if let Some(v) = args.free_map_sector {
            config.free_map_sector = v;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn geometry(&self) -> FsResult<Geometry> {
        Geometry::new(self.sector_size, self.num_direct)
    }

    /// Sectors occupied by the persisted free map.
    pub fn free_map_sectors(&self) -> u32 {
        FreeMap::storage_sectors(self.sectors, self.sector_size)
    }

    pub fn image_bytes(&self) -> u64 {
        self.sectors as u64 * self.sector_size as u64
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.geometry()?;
        if self.sectors == 0 {
            anyhow::bail!("Image needs at least one sector");
        }
        let end = self.free_map_sector as u64 + self.free_map_sectors() as u64;
        if end > self.sectors as u64 {
            anyhow::bail!(
                "Free map at sector {} needs {} sector(s) but the image has {}",
                self.free_map_sector,
                self.free_map_sectors(),
                self.sectors
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = DiskConfig::parse("sectors = 64\nfree_map_sector = 3\n").unwrap();
        assert_eq!(config.sector_size, 128);
        assert_eq!(config.num_direct, 10);
        assert_eq!(config.sectors, 64);
        assert_eq!(config.free_map_sector, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(DiskConfig::parse("sector = 512").is_err());
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"sector_size = 512\nnum_direct = 100\n").unwrap();

        let args = DiskArgs {
            config: Some(file.path().to_path_buf()),
            num_direct: Some(120),
            ..Default::default()
        };
        let config = DiskConfig::resolve(&args).unwrap();
        assert_eq!(config.sector_size, 512);
        assert_eq!(config.num_direct, 120);
        assert_eq!(config.geometry().unwrap().index_entries(), 122);
    }

    #[test]
    fn test_invalid_geometry() {
        let args = DiskArgs {
            sector_size: Some(32),
            num_direct: Some(10),
            ..Default::default()
        };
        assert!(DiskConfig::resolve(&args).is_err());
    }

    #[test]
    fn test_free_map_must_fit() {
        let config = DiskConfig {
            sectors: 16,
            free_map_sector: 16,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.free_map_sectors(), 1);
        assert_eq!(config.image_bytes(), 16 * 128);
    }
}
