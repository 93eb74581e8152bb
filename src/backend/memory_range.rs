//! A back-end over a caller-owned, in-memory buffer.

use crate::error::{BfioError, ErrorDomain, ErrorKind, Result};
use crate::flags::{OpenFlags, Whence};

use super::Backend;

/// A back-end over a raw `(ptr, len)` buffer the caller owns.
///
/// Never frees or reallocates the buffer: close and drop are no-ops on the
/// memory itself. Reads and writes are bounded by the buffer length — unlike
/// [`super::file::FileBackend`], a write that would run past the end of the
/// buffer is a hard, partial-write boundary rather than growing the back-end.
#[derive(Debug)]
pub struct MemoryRangeBackend {
    ptr: *mut u8,
    len: usize,
    offset: u64,
    open: bool,
}

// SAFETY: the back-end never aliases the pointer across threads implicitly;
// `Send`/`Sync` are only sound because the caller who constructed this with
// `new` already promised the buffer outlives and is exclusively owned by it.
unsafe impl Send for MemoryRangeBackend {}

impl MemoryRangeBackend {
    /// Wrap a caller-owned buffer.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads and writes of `len` bytes for as long as
    /// this back-end (and any clone of it) is alive. The caller retains
    /// ownership; this back-end never frees `ptr`.
    pub unsafe fn new(ptr: *mut u8, len: usize) -> Self {
        Self {
            ptr,
            len,
            offset: 0,
            open: false,
        }
    }

    fn slice(&self) -> &[u8] {
        // SAFETY: validity for `len` bytes was promised by the caller of `new`.
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }

    fn slice_mut(&mut self) -> &mut [u8] {
        // SAFETY: validity for `len` bytes was promised by the caller of `new`.
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) }
    }
}

impl Backend for MemoryRangeBackend {
    fn open(&mut self, flags: OpenFlags) -> Result<()> {
        flags.validate()?;
        if self.open {
            return Err(BfioError::new(
                ErrorDomain::Runtime,
                ErrorKind::OpenFailed,
                "back-end is already open",
            ));
        }
        if flags.contains(OpenFlags::RESIZE) {
            return Err(BfioError::new(
                ErrorDomain::Arguments,
                ErrorKind::InvalidValue,
                "memory-range back-end cannot be resized",
            ));
        }
        self.open = true;
        self.offset = 0;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.open {
            return Err(BfioError::new(
                ErrorDomain::Runtime,
                ErrorKind::CloseFailed,
                "back-end is already closed",
            ));
        }
        self.open = false;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.open {
            return Err(BfioError::new(ErrorDomain::Runtime, ErrorKind::ReadFailed, "back-end is not open"));
        }
        let start = self.offset as usize;
        if start >= self.len {
            return Ok(0);
        }
        let n = buf.len().min(self.len - start);
        buf[..n].copy_from_slice(&self.slice()[start..start + n]);
        self.offset += n as u64;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if !self.open {
            return Err(BfioError::new(ErrorDomain::Runtime, ErrorKind::WriteFailed, "back-end is not open"));
        }
        let start = self.offset as usize;
        if start >= self.len {
            return Err(BfioError::new(
                ErrorDomain::Io,
                ErrorKind::WriteFailed,
                "write at or past end of memory range",
            ));
        }
        let n = buf.len().min(self.len - start);
        self.slice_mut()[start..start + n].copy_from_slice(&buf[..n]);
        self.offset += n as u64;
        Ok(n)
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        let base = match whence {
            Whence::Set => 0i64,
            Whence::Cur => self.offset as i64,
            Whence::End => self.len as i64,
        };
        let new_offset = base.checked_add(offset).ok_or_else(|| {
            BfioError::new(ErrorDomain::Arguments, ErrorKind::InvalidValue, "seek overflow")
        })?;
        if new_offset < 0 {
            return Err(BfioError::new(
                ErrorDomain::Arguments,
                ErrorKind::InvalidValue,
                "seek before start of back-end",
            ));
        }
        self.offset = new_offset as u64;
        Ok(self.offset)
    }

    fn exists(&self) -> Result<bool> {
        Ok(!self.ptr.is_null())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn size(&self) -> Result<u64> {
        Ok(self.len as u64)
    }

    fn try_clone(&self) -> Result<Box<dyn Backend>> {
        Ok(Box::new(MemoryRangeBackend {
            ptr: self.ptr,
            len: self.len,
            offset: 0,
            open: false,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let mut buf = vec![0u8; 16];
        let mut backend = unsafe { MemoryRangeBackend::new(buf.as_mut_ptr(), buf.len()) };
        backend.open(OpenFlags::READ | OpenFlags::WRITE).unwrap();
        assert_eq!(backend.write(b"hello").unwrap(), 5);
        backend.seek(0, Whence::Set).unwrap();
        let mut out = [0u8; 5];
        assert_eq!(backend.read(&mut out).unwrap(), 5);
        assert_eq!(&out, b"hello");
    }

    #[test]
    fn write_is_bounded_at_buffer_end() {
        let mut buf = vec![0u8; 4];
        let mut backend = unsafe { MemoryRangeBackend::new(buf.as_mut_ptr(), buf.len()) };
        backend.open(OpenFlags::WRITE).unwrap();
        assert_eq!(backend.write(b"abcdef").unwrap(), 4);
        assert!(backend.write(b"x").is_err());
    }

    #[test]
    fn write_past_end_is_an_error() {
        let mut buf = vec![0u8; 4096];
        let mut backend = unsafe { MemoryRangeBackend::new(buf.as_mut_ptr(), buf.len()) };
        backend.open(OpenFlags::READ | OpenFlags::WRITE).unwrap();
        backend.seek(4100, Whence::Set).unwrap();
        assert!(backend.write(b"x").is_err());

        backend.seek(4090, Whence::Set).unwrap();
        assert_eq!(backend.write(&[0x55; 32]).unwrap(), 6);
    }

    #[test]
    fn resize_is_rejected() {
        let mut buf = vec![0u8; 4];
        let mut backend = unsafe { MemoryRangeBackend::new(buf.as_mut_ptr(), buf.len()) };
        assert!(backend.open(OpenFlags::WRITE | OpenFlags::RESIZE).is_err());
    }

    #[test]
    fn exists_reflects_pointer_nullness() {
        let backend = unsafe { MemoryRangeBackend::new(std::ptr::null_mut(), 0) };
        assert!(!backend.exists().unwrap());
    }
}
