// SPDX-License-Identifier: MIT

use crate::{BlockIO, BlockIOError, BlockIOResult, BlockIOSetLen, checked_range};

/// RAM-backed storage over a borrowed buffer.
///
/// `set_len` moves the visible end within the buffer; it never grows
/// past the buffer itself.
#[derive(Debug)]
pub struct MemBlockIO<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl<'a> MemBlockIO<'a> {
    #[inline]
    pub fn new(buf: &'a mut [u8]) -> Self {
        let len = buf.len();
        Self { buf, len }
    }

    /// Visible length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl BlockIO for MemBlockIO<'_> {
    #[inline]
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> BlockIOResult {
        let range = checked_range(offset, buf.len(), self.len as u64)?;
        buf.copy_from_slice(&self.buf[range]);
        Ok(())
    }

    #[inline]
    fn write_at(&mut self, offset: u64, data: &[u8]) -> BlockIOResult {
        let range = checked_range(offset, data.len(), self.len as u64)?;
        self.buf[range].copy_from_slice(data);
        Ok(())
    }

    #[inline]
    fn capacity(&mut self) -> BlockIOResult<u64> {
        Ok(self.len as u64)
    }
}

impl BlockIOSetLen for MemBlockIO<'_> {
    fn set_len(&mut self, len: u64) -> BlockIOResult {
        let available = self.buf.len() as u64;
        if len > available {
            return Err(BlockIOError::DeviceTooSmall {
                needed: len,
                available,
            });
        }
        self.len = len as usize;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rw() {
        let mut buf = [0u8; 256];
        let mut io = MemBlockIO::new(&mut buf);
        io.write_at(250, &[1, 2, 3, 4, 5, 6]).unwrap();

        let mut out = [0u8; 6];
        io.read_at(250, &mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 4, 5, 6]);
        assert_eq!(io.capacity(), Ok(256));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut buf = [0u8; 16];
        let mut io = MemBlockIO::new(&mut buf);
        assert_eq!(io.write_at(12, &[0; 8]), Err(BlockIOError::OutOfBounds));

        let mut out = [0u8; 4];
        assert_eq!(io.read_at(u64::MAX, &mut out), Err(BlockIOError::OutOfBounds));
        // empty transfers at the very end are fine
        assert_eq!(io.read_at(16, &mut []), Ok(()));
    }

    #[test]
    fn test_set_len_within_buffer() {
        let mut buf = [0u8; 512];
        let mut io = MemBlockIO::new(&mut buf);

        io.set_len(256).unwrap();
        assert_eq!(io.len(), 256);
        assert_eq!(io.write_at(300, &[1]), Err(BlockIOError::OutOfBounds));

        assert_eq!(
            io.set_len(1024),
            Err(BlockIOError::DeviceTooSmall {
                needed: 1024,
                available: 512
            })
        );
        io.set_len(0).unwrap();
        assert!(io.is_empty());
    }
}
