// SPDX-License-Identifier: MIT

use crate::{BlockIO, BlockIOResult};

/// Transfer counters, no_std friendly.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct IoStats {
    pub reads: u64,
    pub read_bytes: u64,
    pub writes: u64,
    pub write_bytes: u64,
    pub flushes: u64,

    // Transfers that did not start and end on the `align` boundary
    pub unaligned_reads: u64,
    pub unaligned_writes: u64,
}

impl IoStats {
    #[inline]
    pub fn reset(&mut self) {
        *self = IoStats::default();
    }
}

/// Counts every transfer passing through to `inner`.
///
/// With `align` set to the sector size, `reads` and `writes` are the
/// number of sector transfers a [`crate::sector::SectorDisk`] issued.
pub struct IOCounter<'a, IO: BlockIO + ?Sized> {
    inner: &'a mut IO,
    pub stats: IoStats,
    align: u64,
}

impl<'a, IO: BlockIO + ?Sized> IOCounter<'a, IO> {
    #[inline]
    pub fn new(inner: &'a mut IO) -> Self {
        Self::with_align(inner, 1)
    }

    #[inline]
    pub fn with_align(inner: &'a mut IO, align: u64) -> Self {
        Self {
            inner,
            stats: IoStats::default(),
            align: align.max(1),
        }
    }

    #[inline]
    pub fn snapshot(&self) -> IoStats {
        self.stats
    }

    #[inline]
    pub fn into_inner(self) -> &'a mut IO {
        self.inner
    }

    #[inline]
    fn aligned(&self, offset: u64, len: usize) -> bool {
        offset % self.align == 0 && len as u64 % self.align == 0
    }
}

impl<IO: BlockIO + ?Sized> BlockIO for IOCounter<'_, IO> {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> BlockIOResult {
        self.stats.reads += 1;
        self.stats.read_bytes += buf.len() as u64;
        self.stats.unaligned_reads += u64::from(!self.aligned(offset, buf.len()));
        self.inner.read_at(offset, buf)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> BlockIOResult {
        self.stats.writes += 1;
        self.stats.write_bytes += data.len() as u64;
        self.stats.unaligned_writes += u64::from(!self.aligned(offset, data.len()));
        self.inner.write_at(offset, data)
    }

    fn flush(&mut self) -> BlockIOResult {
        self.stats.flushes += 1;
        self.inner.flush()
    }

    #[inline]
    fn capacity(&mut self) -> BlockIOResult<u64> {
        self.inner.capacity()
    }
}

#[cfg(all(test, feature = "mem"))]
mod tests {
    use super::*;
    use crate::prelude::MemBlockIO;

    #[test]
    fn test_counts_and_alignment() {
        let mut buf = [0u8; 64];
        let mut mem = MemBlockIO::new(&mut buf);
        let mut io = IOCounter::with_align(&mut mem, 16);

        io.write_at(0, &[1u8; 16]).unwrap();
        io.write_at(3, &[2u8; 4]).unwrap();
        let mut out = [0u8; 16];
        io.read_at(16, &mut out).unwrap();
        io.flush().unwrap();
        assert_eq!(io.capacity(), Ok(64));

        let stats = io.snapshot();
        assert_eq!(stats.writes, 2);
        assert_eq!(stats.write_bytes, 20);
        assert_eq!(stats.unaligned_writes, 1);
        assert_eq!(stats.reads, 1);
        assert_eq!(stats.unaligned_reads, 0);
        assert_eq!(stats.flushes, 1);

        io.stats.reset();
        assert_eq!(io.snapshot(), IoStats::default());
    }

    #[test]
    fn test_failed_transfers_still_counted() {
        let mut buf = [0u8; 8];
        let mut mem = MemBlockIO::new(&mut buf);
        let mut io = IOCounter::new(&mut mem);

        assert!(io.write_at(6, &[0u8; 4]).is_err());
        assert_eq!(io.snapshot().writes, 1);
    }
}
