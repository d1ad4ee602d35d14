// SPDX-License-Identifier: MIT

use anyhow::Context;
use hdrfs::prelude::{
    FileHeader, FreeMap, FreeSectorMap, FsResult, Geometry, HeaderDump, SectorId, Tier,
};
use hdrio::prelude::{BlockIOSetLen, FileBlockIO, SectorDevice, SectorDisk};
use std::fs::{self, File};
use std::path::Path;

use crate::config::DiskConfig;

/// A raw sector image on the host file system.
pub struct Image {
    file: File,
    config: DiskConfig,
    geometry: Geometry,
}

/// Free map totals reported by `stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub sectors: u32,
    pub used: usize,
    pub free: usize,
    pub sector_size: usize,
    pub max_file_size: u64,
}

/// Outcome of `create`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    pub header_sector: SectorId,
    pub num_bytes: u32,
    pub tier: Tier,
}

impl Image {
    /// Creates (or truncates) the image and writes an empty free map.
    pub fn format(path: &Path, config: &DiskConfig) -> anyhow::Result<Self> {
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("Cannot create image '{}'", path.display()))?;
        let mut image = Self::with_file(file, config)?;
        FileBlockIO::new(&mut image.file).set_len(config.image_bytes())?;

        let mut map = FreeMap::new(config.sectors);
        for s in 0..config.free_map_sectors() {
            map.mark_used(config.free_map_sector + s);
        }
        image.store_map(&map)?;
        log::info!(
            "formatted {} sectors of {} bytes, free map at {}",
            config.sectors,
            config.sector_size,
            config.free_map_sector
        );
        Ok(image)
    }

    pub fn open(path: &Path, config: &DiskConfig) -> anyhow::Result<Self> {
        let file = File::options()
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("Cannot open image '{}'", path.display()))?;
        let len = file.metadata()?.len();
        if len < config.image_bytes() {
            anyhow::bail!(
                "Image '{}' holds {len} bytes, expected {}",
                path.display(),
                config.image_bytes()
            );
        }
        Self::with_file(file, config)
    }

    fn with_file(file: File, config: &DiskConfig) -> anyhow::Result<Self> {
        Ok(Self {
            file,
            config: config.clone(),
            geometry: config.geometry()?,
        })
    }

    /// Runs `f` against the image as a sector device and syncs afterwards.
    fn with_disk<R>(
        &mut self,
        f: impl FnOnce(&mut dyn SectorDevice) -> FsResult<R>,
    ) -> anyhow::Result<R> {
        let mut io = FileBlockIO::new(&mut self.file);
        let mut disk = SectorDisk::new(&mut io, self.config.sector_size, self.config.sectors)?;
        let out = f(&mut disk)?;
        disk.sync()?;
        Ok(out)
    }

    pub fn load_map(&mut self) -> anyhow::Result<FreeMap> {
        let first = self.config.free_map_sector;
        let mut map = FreeMap::new(self.config.sectors);
        self.with_disk(|disk| map.fetch_from(disk, first))
            .context("Cannot read free map")?;
        Ok(map)
    }

    pub fn store_map(&mut self, map: &FreeMap) -> anyhow::Result<()> {
        let first = self.config.free_map_sector;
        self.with_disk(|disk| map.write_back(disk, first))
            .context("Cannot write free map")
    }

    pub fn load_header(&mut self, sector: SectorId) -> anyhow::Result<FileHeader> {
        let mut hdr = FileHeader::new(self.geometry);
        self.with_disk(|disk| hdr.fetch_from(disk, sector))
            .with_context(|| format!("Cannot read file header at sector {sector}"))?;
        Ok(hdr)
    }

    /// Allocates a file of `size` bytes, fills it with `data` (zero padded)
    /// and persists both the header and the free map.
    pub fn create_file(
        &mut self,
        size: u32,
        header: Option<SectorId>,
        data: &[u8],
    ) -> anyhow::Result<Created> {
        if data.len() as u64 > size as u64 {
            anyhow::bail!("{} bytes of data do not fit a {size} byte file", data.len());
        }
        let mut map = self.load_map()?;
        let header_sector = match header {
            Some(s) if s >= self.config.sectors => {
                anyhow::bail!("Header sector {s} is past the end of the image")
            }
            Some(s) if map.is_used(s) => anyhow::bail!("Header sector {s} is already in use"),
            Some(s) => {
                map.mark_used(s);
                s
            }
            None => map
                .allocate_one()
                .context("No free sector left for the file header")?,
        };

        let mut hdr = FileHeader::new(self.geometry);
        hdr.allocate(&mut map, size)
            .with_context(|| format!("Cannot allocate {size} bytes"))?;

        let sector_size = self.config.sector_size;
        self.with_disk(|disk| {
            let mut buf = vec![0u8; sector_size];
            for i in 0..hdr.num_sectors() as usize {
                let start = (i * sector_size).min(data.len());
                let chunk = &data[start..(start + sector_size).min(data.len())];
                buf.fill(0);
                buf[..chunk.len()].copy_from_slice(chunk);
                disk.write_sector(hdr.byte_to_sector((i * sector_size) as u32)?, &buf)?;
            }
            hdr.write_back(disk, header_sector)
        })?;
        self.store_map(&map)?;

        Ok(Created {
            header_sector,
            num_bytes: size,
            tier: hdr.tier(),
        })
    }

    pub fn dump(&mut self, header: SectorId) -> anyhow::Result<HeaderDump> {
        let hdr = self.load_header(header)?;
        self.with_disk(|disk| hdr.dump(disk))
    }

    /// Frees the file and its header sector. Returns the sectors released.
    pub fn remove_file(&mut self, header: SectorId) -> anyhow::Result<usize> {
        let mut map = self.load_map()?;
        if header >= self.config.sectors || !map.is_used(header) {
            anyhow::bail!("Sector {header} does not hold a file header");
        }
        let mut hdr = self.load_header(header)?;
        let freed = hdr.deallocate(&mut map);
        map.mark_free(header);
        self.store_map(&map)?;
        Ok(freed + 1)
    }

    pub fn usage(&mut self) -> anyhow::Result<Usage> {
        let map = self.load_map()?;
        Ok(Usage {
            sectors: self.config.sectors,
            used: map.used_count(),
            free: map.free_count(),
            sector_size: self.config.sector_size,
            max_file_size: self.geometry.max_file_size(),
        })
    }
}

/// Reads `path` fully, refusing anything a header could never address.
pub fn read_data(path: &Path) -> anyhow::Result<Vec<u8>> {
    let data = fs::read(path).with_context(|| format!("Cannot read '{}'", path.display()))?;
    if u32::try_from(data.len()).is_err() {
        anyhow::bail!("'{}' is larger than 4 GiB", path.display());
    }
    Ok(data)
}
