// SPDX-License-Identifier: MIT

use hdrfs::header::record::HeaderRecord;
use hdrfs::prelude::*;

const SECTOR_SIZE: usize = 128;
const SECTORS: u32 = 256;

fn image() -> Vec<u8> {
    vec![0u8; SECTOR_SIZE * SECTORS as usize]
}

/// Reserves the header sector, allocates `size` bytes and writes the
/// header back. Returns the header sector.
fn create<D: SectorDevice>(
    disk: &mut D,
    map: &mut FreeMap,
    hdr: &mut FileHeader,
    size: u32,
) -> SectorId {
    let sector = map.allocate_one().unwrap();
    hdr.allocate(map, size).unwrap();
    hdr.write_back(disk, sector).unwrap();
    sector
}

#[test]
fn roundtrip_every_tier() {
    for size in [0, 900, 1536, 22 * 128, 35 * 128, 166 * 128] {
        let mut buf = image();
        let mut io = MemBlockIO::new(&mut buf);
        let mut disk = SectorDisk::new(&mut io, SECTOR_SIZE, SECTORS).unwrap();
        let mut map = FreeMap::new(SECTORS);

        let mut hdr = FileHeader::default();
        let sector = create(&mut disk, &mut map, &mut hdr, size);

        let mut loaded = FileHeader::default();
        loaded.fetch_from(&mut disk, sector).unwrap();
        assert_eq!(loaded, hdr, "size {size}");
        assert_eq!(loaded.tier(), hdr.tier());
        assert_eq!(map.used_count(), 1 + hdr.tier().total_sectors());
    }
}

#[test]
fn unused_direct_slots_are_empty_on_disk() {
    let mut buf = image();
    let mut io = MemBlockIO::new(&mut buf);
    let mut disk = SectorDisk::new(&mut io, SECTOR_SIZE, SECTORS).unwrap();
    let mut map = FreeMap::new(SECTORS);

    let mut hdr = FileHeader::default();
    let sector = create(&mut disk, &mut map, &mut hdr, 900);

    let mut raw = vec![0u8; SECTOR_SIZE];
    disk.read_sector(sector, &mut raw).unwrap();
    let record = HeaderRecord::decode(hdr.geometry(), &raw).unwrap();

    assert_eq!(record.num_bytes, 900);
    assert_eq!(record.num_sectors, 8);
    assert_eq!(record.single_table, None);
    assert_eq!(record.double_table, None);
    assert!(record.direct[..8].iter().all(Option::is_some));
    assert_eq!(record.direct[8..], [None, None]);
    assert_eq!(&raw[16 + 8 * 4..16 + 10 * 4], &[0xFF; 8]);
}

#[test]
fn write_back_touches_header_and_index_sectors_only() {
    let mut buf = image();
    let mut io = MemBlockIO::new(&mut buf);
    let mut counter = IOCounter::new(&mut io);
    let mut map = FreeMap::new(SECTORS);
    let mut hdr = FileHeader::default();

    {
        let mut disk = SectorDisk::new(&mut counter, SECTOR_SIZE, SECTORS).unwrap();
        // header + single table + double table + two leaf tables
        create(&mut disk, &mut map, &mut hdr, 35 * 128);
    }
    let stats = counter.snapshot();
    assert_eq!(stats.writes, 5);
    assert_eq!(stats.write_bytes, 5 * SECTOR_SIZE as u64);
    assert_eq!(stats.reads, 0);

    {
        let mut disk = SectorDisk::new(&mut counter, SECTOR_SIZE, SECTORS).unwrap();
        let mut loaded = FileHeader::default();
        loaded.fetch_from(&mut disk, 0).unwrap();
        assert_eq!(loaded, hdr);
    }
    assert_eq!(counter.snapshot().reads, 5);
}

#[test]
fn free_map_and_header_survive_reload() {
    let mut buf = image();
    let mut io = MemBlockIO::new(&mut buf);
    let mut disk = SectorDisk::new(&mut io, SECTOR_SIZE, SECTORS).unwrap();

    let mut map = FreeMap::new(SECTORS);
    let map_sectors = FreeMap::storage_sectors(SECTORS, SECTOR_SIZE);
    for s in 0..map_sectors {
        map.mark_used(s);
    }
    let mut hdr = FileHeader::default();
    let sector = create(&mut disk, &mut map, &mut hdr, 3000);
    map.write_back(&mut disk, 0).unwrap();

    let mut reloaded = FreeMap::new(SECTORS);
    reloaded.fetch_from(&mut disk, 0).unwrap();
    assert_eq!(reloaded, map);

    let mut loaded = FileHeader::default();
    loaded.fetch_from(&mut disk, sector).unwrap();
    let freed = loaded.deallocate(&mut reloaded);
    assert_eq!(freed, hdr.tier().total_sectors());
    // map storage and the header sector stay reserved
    assert_eq!(reloaded.used_count(), map_sectors as usize + 1);
    assert!(loaded.all_sectors().is_empty());
    assert_eq!(loaded.file_length(), 3000);
}

#[test]
fn dump_reads_file_bytes_in_order() {
    let mut buf = image();
    let mut io = MemBlockIO::new(&mut buf);
    let mut disk = SectorDisk::new(&mut io, SECTOR_SIZE, SECTORS).unwrap();
    let mut map = FreeMap::new(SECTORS);
    let mut hdr = FileHeader::default();

    let data: Vec<u8> = (0..1600u32).map(|i| b'a' + (i % 26) as u8).collect();
    create(&mut disk, &mut map, &mut hdr, data.len() as u32);

    let mut sector_buf = vec![0u8; SECTOR_SIZE];
    for (i, chunk) in data.chunks(SECTOR_SIZE).enumerate() {
        let sector = hdr.byte_to_sector((i * SECTOR_SIZE) as u32).unwrap();
        sector_buf.fill(0);
        sector_buf[..chunk.len()].copy_from_slice(chunk);
        disk.write_sector(sector, &sector_buf).unwrap();
    }

    let dump = hdr.dump(&mut disk).unwrap();
    assert_eq!(dump.num_bytes, 1600);
    assert_eq!(dump.contents.len(), 13);
    assert_eq!(dump.contents.last().map(|c| c.bytes.len()), Some(1600 - 12 * 128));
    let joined: Vec<u8> = dump.contents.iter().flat_map(|c| c.bytes.clone()).collect();
    assert_eq!(joined, data);
    assert_eq!(dump.satellite_sectors, vec![11]);

    let text = dump.to_string();
    assert!(text.starts_with("File header: 1600 bytes, single indirect"));
    assert!(text.contains("Index sectors: 11\n"));
    assert!(text.contains("abcdefghijklmnopqrstuvwxyz"));
}

#[test]
fn fetch_rejects_wrong_sector_size() {
    let mut buf = image();
    let mut io = MemBlockIO::new(&mut buf);
    let mut disk = SectorDisk::new(&mut io, 256, SECTORS / 2).unwrap();

    let mut hdr = FileHeader::default();
    assert_eq!(
        hdr.fetch_from(&mut disk, 0),
        Err(FsError::GeometryMismatch {
            expected: 128,
            found: 256
        })
    );
}

#[test]
fn larger_sectors_use_wider_header() {
    let geometry = Geometry::for_sector_size(512).unwrap();
    assert_eq!(geometry.num_direct(), 124);

    let mut buf = vec![0u8; 512 * 512];
    let mut io = MemBlockIO::new(&mut buf);
    let mut disk = SectorDisk::new(&mut io, 512, 512).unwrap();
    let mut map = FreeMap::new(512);

    let mut hdr = FileHeader::new(geometry);
    let sector = map.allocate_one().unwrap();
    hdr.allocate(&mut map, 130 * 512).unwrap();
    assert!(matches!(hdr.tier(), Tier::Single { direct: 124, indirect: 6 }));
    hdr.write_back(&mut disk, sector).unwrap();

    let mut loaded = FileHeader::new(geometry);
    loaded.fetch_from(&mut disk, sector).unwrap();
    assert_eq!(loaded, hdr);
    assert_eq!(loaded.byte_to_sector(129 * 512 + 7), hdr.byte_to_sector(129 * 512));
}

#[test]
fn file_backed_roundtrip() {
    let mut file = tempfile::tempfile().unwrap();
    let mut io = FileBlockIO::new(&mut file);
    io.set_len(SECTOR_SIZE as u64 * SECTORS as u64).unwrap();
    let mut disk = SectorDisk::new(&mut io, SECTOR_SIZE, SECTORS).unwrap();

    let mut map = FreeMap::new(SECTORS);
    let mut hdr = FileHeader::default();
    let sector = create(&mut disk, &mut map, &mut hdr, 40 * 128);
    disk.sync().unwrap();

    let mut loaded = FileHeader::default();
    loaded.fetch_from(&mut disk, sector).unwrap();
    assert_eq!(loaded, hdr);
    assert_eq!(loaded.data_sectors().count(), 40);
}
