//! Random-access byte sources for rule matching.
//!
//! Offsets are always relative to the start of the content: the beginning of a
//! buffer, or the read position a stream had when the source was created.

use std::io::{self, Read, Seek, SeekFrom};

use tracing::warn;

pub trait ByteSource {
    /// Fill `buf` from `offset`, returning how many bytes were available.
    /// A short count means the content ended.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// Read up to `len` bytes from `offset`
    fn read_vec(&mut self, offset: u64, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0; len];
        let n = self.read_at(offset, &mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }
}

/// In-memory content; reads never move any cursor
#[derive(Debug, Clone, Copy)]
pub struct SliceSource<'a> {
    data: &'a [u8],
}

impl<'a> SliceSource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl ByteSource for SliceSource<'_> {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let Ok(start) = usize::try_from(offset) else {
            return Ok(0);
        };
        let Some(available) = self.data.get(start..) else {
            return Ok(0);
        };
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        Ok(n)
    }
}

/// Seekable stream whose position is restored when the source is dropped
pub struct SeekSource<'a, R: Read + Seek + ?Sized> {
    inner: &'a mut R,
    start: u64,
}

impl<'a, R: Read + Seek + ?Sized> SeekSource<'a, R> {
    /// Remember the current position of `inner`
    ///
    /// # Errors
    ///
    /// Returns an error if the stream position cannot be queried.
    pub fn new(inner: &'a mut R) -> io::Result<Self> {
        let start = inner.stream_position()?;
        Ok(Self { inner, start })
    }

    pub fn start(&self) -> u64 {
        self.start
    }
}

impl<R: Read + Seek + ?Sized> ByteSource for SeekSource<'_, R> {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let Some(position) = self.start.checked_add(offset) else {
            return Ok(0);
        };
        self.inner.seek(SeekFrom::Start(position))?;
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

impl<R: Read + Seek + ?Sized> Drop for SeekSource<'_, R> {
    fn drop(&mut self) {
        if let Err(e) = self.inner.seek(SeekFrom::Start(self.start)) {
            warn!(position = self.start, error = %e, "Failed to restore stream position");
        }
    }
}
