// SPDX-License-Identifier: MIT

use hdrio::prelude::*;
use tempfile::tempfile;

#[test]
fn file_backed_disk_roundtrip() {
    let mut file = tempfile().unwrap();
    let mut io = FileBlockIO::new(&mut file);
    io.set_len(16 * 128).unwrap();

    let mut disk = SectorDisk::new(&mut io, 128, 16).unwrap();
    let pattern: Vec<u8> = (0..128u32).map(|i| (i * 7) as u8).collect();
    disk.write_sector(15, &pattern).unwrap();
    disk.sync().unwrap();

    let mut out = vec![0u8; 128];
    disk.read_sector(15, &mut out).unwrap();
    assert_eq!(out, pattern);

    disk.read_sector(0, &mut out).unwrap();
    assert!(out.iter().all(|&b| b == 0));
}

#[test]
fn file_backed_disk_bounds() {
    let mut file = tempfile().unwrap();
    let mut io = FileBlockIO::new(&mut file);
    io.set_len(4 * 64).unwrap();

    let mut disk = SectorDisk::new(&mut io, 64, 4).unwrap();
    let mut out = [0u8; 64];
    assert_eq!(
        disk.read_sector(4, &mut out),
        Err(BlockIOError::SectorOutOfRange { sector: 4, count: 4 })
    );
}

#[test]
fn file_backed_disk_needs_room() {
    let mut file = tempfile().unwrap();
    let mut io = FileBlockIO::new(&mut file);
    io.set_len(100).unwrap();

    assert_eq!(
        SectorDisk::new(&mut io, 64, 4).err(),
        Some(BlockIOError::DeviceTooSmall {
            needed: 256,
            available: 100
        })
    );
}
