//! The back-end capability set and its built-in implementations.
//!
//! A back-end is a capability set, not a concrete type: callers pick a
//! concrete implementation ([`file::FileBackend`], [`memory_range::MemoryRangeBackend`],
//! [`file_range::FileRangeBackend`], [`multi_segment::MultiSegmentBackend`]) and
//! everything above this module only ever sees `Box<dyn Backend>`, matching
//! the "polymorphism without inheritance" design note — a table of function
//! pointers and a tagged variant are equivalent implementation choices for a
//! C library; in Rust the trait object *is* that vtable.

pub mod file;
pub mod file_range;
pub mod memory_range;
pub mod multi_segment;

use std::fmt;

use crate::error::Result;
use crate::flags::{OpenFlags, Whence};

/// The capability set every concrete back-end implements.
///
/// Every back-end owns its resources; `close` releases OS-level ones.
/// `close` on an already-closed back-end is an error (spec.md §9 Open
/// Question, resolved in favor of strictness — see `DESIGN.md`), in
/// contrast to `read`/`write`/`seek`, which are only valid while open.
pub trait Backend: fmt::Debug {
    /// Open the back-end for the given access mode. Fails if already open,
    /// or if `flags` is an invalid combination (validated by
    /// [`OpenFlags::validate`]). On success, the logical current offset is
    /// reset to `0`.
    fn open(&mut self, flags: OpenFlags) -> Result<()>;

    /// Close the back-end. Fails if not open. Always leaves the back-end in
    /// the closed state, whether it returns success or failure — retries
    /// are never required after a failed close.
    fn close(&mut self) -> Result<()>;

    /// Read up to `buf.len()` bytes. Returns the number of bytes actually
    /// read, which is `0` only at logical end-of-back-end — reading past
    /// the end is success with zero bytes, never an error. Partial reads
    /// (fewer bytes than requested, but more than zero) are permitted and
    /// are not themselves an error.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write up to `buf.len()` bytes. Returns the number of bytes actually
    /// written. Partial writes are permitted only when the back-end has a
    /// hard boundary (memory-range at end-of-buffer); back-ends without
    /// such a boundary write all of `buf` or fail outright.
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Reposition the current offset. Seeking before `0` is an error.
    /// Seeking past the end is permitted; the next read then returns `0`.
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64>;

    /// Whether the back-end's target is currently addressable (file present
    /// on disk, buffer non-null, every sub-back-end present).
    fn exists(&self) -> Result<bool>;

    /// Whether the back-end is currently physically open.
    fn is_open(&self) -> bool;

    /// Current total size in bytes.
    fn size(&self) -> Result<u64>;

    /// Produce a new, independent, closed back-end configured identically
    /// to this one. Never copies open OS resources — the clone always
    /// starts closed.
    fn try_clone(&self) -> Result<Box<dyn Backend>>;
}
