//! A back-end restricting another back-end to a sub-range.

use crate::error::{BfioError, ErrorDomain, ErrorKind, Result};
use crate::flags::{OpenFlags, Whence};

use super::Backend;

/// A back-end that exposes only `[range_start, range_start + range_size)` of
/// an inner back-end, translating every offset before delegating.
///
/// Wraps any `Box<dyn Backend>`, not only a file back-end — the multi-segment
/// back-end's sub-backends can each be a file-range back-end in turn.
#[derive(Debug)]
pub struct FileRangeBackend {
    inner: Box<dyn Backend>,
    range_start: u64,
    range_size: u64,
    offset: u64,
}

impl FileRangeBackend {
    /// Restrict `inner` to `[range_start, range_start + range_size)`.
    pub fn new(inner: Box<dyn Backend>, range_start: u64, range_size: u64) -> Self {
        Self {
            inner,
            range_start,
            range_size,
            offset: 0,
        }
    }

    /// The `(start, size)` of the exposed range.
    pub fn range(&self) -> (u64, u64) {
        (self.range_start, self.range_size)
    }
}

impl Backend for FileRangeBackend {
    fn open(&mut self, flags: OpenFlags) -> Result<()> {
        flags.validate()?;
        self.inner.open(flags)?;
        self.offset = 0;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.offset >= self.range_size {
            return Ok(0);
        }
        let remaining = (self.range_size - self.offset) as usize;
        let n = buf.len().min(remaining);
        self.inner
            .seek(self.range_start as i64 + self.offset as i64, Whence::Set)?;
        let read = self.inner.read(&mut buf[..n])?;
        self.offset += read as u64;
        Ok(read)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.offset >= self.range_size {
            return Ok(0);
        }
        let remaining = (self.range_size - self.offset) as usize;
        let n = buf.len().min(remaining);
        self.inner
            .seek(self.range_start as i64 + self.offset as i64, Whence::Set)?;
        let written = self.inner.write(&buf[..n])?;
        self.offset += written as u64;
        Ok(written)
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        let base = match whence {
            Whence::Set => 0i64,
            Whence::Cur => self.offset as i64,
            Whence::End => self.range_size as i64,
        };
        let new_offset = base.checked_add(offset).ok_or_else(|| {
            BfioError::new(ErrorDomain::Arguments, ErrorKind::InvalidValue, "seek overflow")
        })?;
        if new_offset < 0 {
            return Err(BfioError::new(
                ErrorDomain::Arguments,
                ErrorKind::InvalidValue,
                "seek before start of range",
            ));
        }
        self.offset = new_offset as u64;
        Ok(self.offset)
    }

    fn exists(&self) -> Result<bool> {
        self.inner.exists()
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn size(&self) -> Result<u64> {
        Ok(self.range_size)
    }

    fn try_clone(&self) -> Result<Box<dyn Backend>> {
        Ok(Box::new(FileRangeBackend::new(
            self.inner.try_clone()?,
            self.range_start,
            self.range_size,
        )))
    }
}
