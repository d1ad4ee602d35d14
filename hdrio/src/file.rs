// SPDX-License-Identifier: MIT

use std::fs::File;
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};

use crate::{BlockIO, BlockIOError, BlockIOResult, BlockIOSetLen};

/// Storage over anything seekable, usually a disk image [`File`].
#[derive(Debug)]
pub struct FileBlockIO<'a, T: Read + Write + Seek> {
    io: &'a mut T,
}

impl<'a, T: Read + Write + Seek> FileBlockIO<'a, T> {
    #[inline]
    pub fn new(io: &'a mut T) -> Self {
        Self { io }
    }

    #[inline]
    pub fn into_inner(self) -> &'a mut T {
        self.io
    }
}

impl<T: Read + Write + Seek> BlockIO for FileBlockIO<'_, T> {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> BlockIOResult {
        self.io.seek(SeekFrom::Start(offset))?;
        self.io.read_exact(buf)?;
        Ok(())
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> BlockIOResult {
        self.io.seek(SeekFrom::Start(offset))?;
        self.io.write_all(data)?;
        Ok(())
    }

    fn flush(&mut self) -> BlockIOResult {
        Ok(self.io.flush()?)
    }

    fn capacity(&mut self) -> BlockIOResult<u64> {
        Ok(self.io.seek(SeekFrom::End(0))?)
    }
}

impl BlockIOSetLen for FileBlockIO<'_, File> {
    fn set_len(&mut self, len: u64) -> BlockIOResult {
        Ok(self.io.set_len(len)?)
    }
}

impl From<io::Error> for BlockIOError {
    #[cold]
    fn from(e: io::Error) -> Self {
        log::debug!("host I/O error: {e}");
        match e.kind() {
            // short read: the image ends before the requested range
            ErrorKind::UnexpectedEof => BlockIOError::OutOfBounds,
            ErrorKind::Unsupported => BlockIOError::Unsupported,
            ErrorKind::PermissionDenied => BlockIOError::Other("Image is not writable"),
            ErrorKind::StorageFull => BlockIOError::Other("Host storage is full"),
            ErrorKind::InvalidInput => BlockIOError::Other("Invalid offset or length"),
            _ => BlockIOError::Other("Host I/O error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempfile;

    #[test]
    fn test_rw_grows_file() {
        let mut file = tempfile().unwrap();
        let mut io = FileBlockIO::new(&mut file);
        assert_eq!(io.capacity(), Ok(0));

        io.write_at(100, &[7, 8, 9]).unwrap();
        assert_eq!(io.capacity(), Ok(103));

        let mut out = [0u8; 3];
        io.read_at(100, &mut out).unwrap();
        assert_eq!(out, [7, 8, 9]);
    }

    #[test]
    fn test_read_past_end() {
        let mut file = tempfile().unwrap();
        let mut io = FileBlockIO::new(&mut file);
        io.set_len(64).unwrap();

        let mut out = [0u8; 16];
        assert_eq!(io.read_at(60, &mut out), Err(BlockIOError::OutOfBounds));
        assert_eq!(io.capacity(), Ok(64));
    }

    #[test]
    fn test_any_seekable_stream() {
        let mut cursor = Cursor::new(vec![0u8; 32]);
        let mut io = FileBlockIO::new(&mut cursor);
        io.write_at(30, &[1, 2]).unwrap();
        assert_eq!(io.capacity(), Ok(32));
        assert_eq!(&io.into_inner().get_ref()[30..], &[1, 2]);
    }
}
