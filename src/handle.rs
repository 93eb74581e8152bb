//! The public handle object: a back-end plus the bookkeeping above it.

use crate::backend::Backend;
use crate::codepage::Name;
use crate::error::{BfioError, ErrorDomain, ErrorKind, Result};
use crate::flags::{OpenFlags, Whence};
use crate::offsets_list::OffsetsList;
use crate::pool::PoolEntryId;

/// A polymorphic I/O object: a back-end plus current offset, access flags,
/// an optional name, and caller-defined sub-range bookkeeping.
///
/// A bare handle (not owned by a [`crate::pool::Pool`]) performs open, close,
/// read, write, and seek directly against its back-end. Once a handle is
/// registered with a pool (`Pool::append_handle`), pooled callers drive it
/// through `Pool` methods instead — see that module for why this handle type
/// carries no reference back to its owning pool.
#[derive(Debug)]
pub struct Handle {
    backend: Box<dyn Backend>,
    flags: Option<OpenFlags>,
    current_offset: u64,
    name: Option<Name>,
    offsets: OffsetsList<()>,
    pool_entry: Option<PoolEntryId>,
    reopen_allowed: bool,
}

impl Handle {
    /// Wrap a back-end in a new, unopened, unpooled handle.
    pub fn new(backend: Box<dyn Backend>) -> Self {
        Self {
            backend,
            flags: None,
            current_offset: 0,
            name: None,
            offsets: OffsetsList::new(),
            pool_entry: None,
            reopen_allowed: true,
        }
    }

    /// Open the wrapped back-end directly.
    pub fn open(&mut self, flags: OpenFlags) -> Result<()> {
        self.backend.open(flags)?;
        self.flags = Some(flags);
        self.current_offset = 0;
        Ok(())
    }

    /// Close the wrapped back-end directly.
    pub fn close(&mut self) -> Result<()> {
        self.backend.close()?;
        self.flags = None;
        Ok(())
    }

    /// Read directly from the wrapped back-end, advancing the logical offset.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.require_read()?;
        let n = self.backend.read(buf)?;
        self.current_offset += n as u64;
        Ok(n)
    }

    /// Write directly to the wrapped back-end, advancing the logical offset.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.require_write()?;
        let n = self.backend.write(buf)?;
        self.current_offset += n as u64;
        Ok(n)
    }

    /// Seek directly on the wrapped back-end.
    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        let pos = self.backend.seek(offset, whence)?;
        self.current_offset = pos;
        Ok(pos)
    }

    /// Whether the back-end's target currently exists.
    pub fn exists(&self) -> Result<bool> {
        self.backend.exists()
    }

    /// Current total size of the back-end.
    pub fn size(&self) -> Result<u64> {
        self.backend.size()
    }

    /// The handle's logical current offset. Preserved across pool evictions.
    pub fn tell(&self) -> u64 {
        self.current_offset
    }

    /// Whether the underlying back-end is currently physically open.
    pub fn is_open(&self) -> bool {
        self.backend.is_open()
    }

    /// The flags the handle was last opened with, if open.
    pub fn flags(&self) -> Option<OpenFlags> {
        self.flags
    }

    /// Attach a name to this handle (narrow or wide, via [`Name`]'s
    /// constructors). Overwrites any previously set name.
    pub fn set_name(&mut self, name: Name) {
        self.name = Some(name);
    }

    /// The name attached to this handle, if any.
    pub fn name(&self) -> Option<&Name> {
        self.name.as_ref()
    }

    /// The caller-defined sub-range index for this handle.
    pub fn offsets(&self) -> &OffsetsList<()> {
        &self.offsets
    }

    /// Mutably access the caller-defined sub-range index for this handle.
    pub fn offsets_mut(&mut self) -> &mut OffsetsList<()> {
        &mut self.offsets
    }

    /// Whether this handle is currently registered with a pool.
    pub fn pool_entry(&self) -> Option<PoolEntryId> {
        self.pool_entry
    }

    pub(crate) fn set_pool_entry(&mut self, id: Option<PoolEntryId>) {
        self.pool_entry = id;
    }

    /// Whether the pool is allowed to transparently close and reopen this
    /// handle to make room for another. Defaults to `true`.
    pub fn reopen_allowed(&self) -> bool {
        self.reopen_allowed
    }

    /// Set whether the pool is allowed to transparently reopen this handle.
    pub fn set_reopen_allowed(&mut self, allowed: bool) {
        self.reopen_allowed = allowed;
    }

    pub(crate) fn backend_mut(&mut self) -> &mut Box<dyn Backend> {
        &mut self.backend
    }

    /// Produce a new, independent, closed handle with an independently
    /// cloned back-end, the same name and flags, but no pool registration
    /// and no carried-over offsets index.
    pub fn try_clone(&self) -> Result<Handle> {
        Ok(Handle {
            backend: self.backend.try_clone()?,
            flags: None,
            current_offset: 0,
            name: self.name.clone(),
            offsets: OffsetsList::new(),
            pool_entry: None,
            reopen_allowed: self.reopen_allowed,
        })
    }

    fn require_read(&self) -> Result<()> {
        match self.flags {
            Some(flags) if flags.can_read() => Ok(()),
            Some(_) => Err(BfioError::new(
                ErrorDomain::Runtime,
                ErrorKind::ReadFailed,
                "handle is not open for reading",
            )),
            None => Err(BfioError::new(ErrorDomain::Runtime, ErrorKind::ReadFailed, "handle is not open")),
        }
    }

    fn require_write(&self) -> Result<()> {
        match self.flags {
            Some(flags) if flags.can_write() => Ok(()),
            Some(_) => Err(BfioError::new(
                ErrorDomain::Runtime,
                ErrorKind::WriteFailed,
                "handle is not open for writing",
            )),
            None => Err(BfioError::new(ErrorDomain::Runtime, ErrorKind::WriteFailed, "handle is not open")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory_range::MemoryRangeBackend;

    fn backend(buf: &mut [u8]) -> Box<dyn Backend> {
        Box::new(unsafe { MemoryRangeBackend::new(buf.as_mut_ptr(), buf.len()) })
    }

    #[test]
    fn offset_advances_with_read_and_write() {
        let mut buf = [0u8; 8];
        let mut handle = Handle::new(backend(&mut buf));
        handle.open(OpenFlags::READ | OpenFlags::WRITE).unwrap();
        handle.write(b"abcd").unwrap();
        assert_eq!(handle.tell(), 4);
        handle.seek(0, Whence::Set).unwrap();
        let mut out = [0u8; 4];
        handle.read(&mut out).unwrap();
        assert_eq!(handle.tell(), 4);
    }

    #[test]
    fn read_without_read_flag_is_an_error() {
        let mut buf = [0u8; 8];
        let mut handle = Handle::new(backend(&mut buf));
        handle.open(OpenFlags::WRITE).unwrap();
        let mut out = [0u8; 4];
        assert!(handle.read(&mut out).is_err());
    }

    #[test]
    fn clone_is_independent_and_unpooled() {
        let mut buf = [0u8; 8];
        let mut handle = Handle::new(backend(&mut buf));
        handle.open(OpenFlags::READ | OpenFlags::WRITE).unwrap();
        handle.write(b"abcd").unwrap();
        let clone = handle.try_clone().unwrap();
        assert_eq!(clone.tell(), 0);
        assert!(!clone.is_open());
        assert!(clone.pool_entry().is_none());
    }
}
