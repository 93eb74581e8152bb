//! The bounded LRU pool of handles.
//!
//! A pool lets a caller keep an arbitrary number of logical handles
//! registered while holding at most `capacity` of them physically open at
//! once. Pooled operations are implemented here, as `Pool` methods keyed by
//! [`PoolEntryId`], rather than as methods on [`crate::handle::Handle`] that
//! reach back into their owning pool — per the design note against a
//! back-pointer from handle to pool (an `Rc<RefCell<_>>` or unsafe weak
//! reference would be needed there instead), this keeps `Handle` and `Pool`
//! connected only by an explicit id, the same way the teacher keeps its
//! session and channel types connected by fds rather than mutual references.

use log::warn;

use crate::error::{BfioError, ErrorDomain, ErrorKind, Result};
use crate::flags::{OpenFlags, Whence};
use crate::handle::Handle;

/// Opaque identifier for an entry registered with a [`Pool`]. Never reused:
/// each call to [`Pool::append_handle`] hands out a strictly greater id than
/// any handed out before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolEntryId(u64);

struct PoolEntry {
    handle: Handle,
    is_open: bool,
    last_used: u64,
    flags: Option<OpenFlags>,
}

/// A bounded LRU manager of handles.
///
/// Invariants (spec-mandated, checked by construction of this type's
/// methods rather than at runtime): the number of entries physically open is
/// always `<= capacity`; every physically open entry's timestamp is strictly
/// less than the counter's current value; no two entries share a back-end
/// (the caller's responsibility — the pool does not deduplicate handles).
#[derive(Debug)]
pub struct Pool {
    capacity: usize,
    entries: Vec<Option<PoolEntry>>,
    counter: u64,
}

impl Pool {
    /// Create a pool that holds at most `capacity` handles physically open
    /// at once. `capacity` of `0` means no handle may ever be opened through
    /// this pool.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::new(),
            counter: 0,
        }
    }

    /// The pool's physical-open capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries currently registered (open or not).
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    /// Whether the pool has no registered entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register a handle with the pool. The handle starts unopened.
    ///
    /// The entry id is the position `entries` will grow to, not drawn from
    /// the LRU timestamp counter ([`Pool::bump`]) — those two counters must
    /// stay independent, or repeated touches of earlier entries inflate the
    /// timestamp counter ahead of `entries.len()` and hand out ids that don't
    /// match the index the entry actually lands at.
    pub fn append_handle(&mut self, mut handle: Handle) -> PoolEntryId {
        let id = PoolEntryId(self.entries.len() as u64);
        handle.set_pool_entry(Some(id));
        self.entries.push(Some(PoolEntry {
            handle,
            is_open: false,
            last_used: 0,
            flags: None,
        }));
        id
    }

    /// Replace the handle at an existing entry, closing its previous handle
    /// first if it was open. The entry id is unchanged.
    pub fn set_handle(&mut self, id: PoolEntryId, mut handle: Handle) -> Result<()> {
        let index = self.index_of(id)?;
        if let Some(entry) = self.entries[index].as_mut() {
            if entry.is_open {
                if let Err(err) = entry.handle.close() {
                    warn!("pool set_handle: outgoing handle for {id:?} failed to close: {err}");
                }
            }
            handle.set_pool_entry(Some(id));
            entry.handle = handle;
            entry.is_open = false;
            entry.flags = None;
        }
        Ok(())
    }

    /// Open the entry's handle for the given flags, evicting the
    /// least-recently-used currently-open entry first if the pool is at
    /// capacity. Bumps the entry's LRU timestamp on success.
    pub fn open(&mut self, id: PoolEntryId, flags: OpenFlags) -> Result<()> {
        let index = self.index_of(id)?;
        if self.entries[index].as_ref().unwrap().is_open {
            return Err(BfioError::new(
                ErrorDomain::Runtime,
                ErrorKind::OpenFailed,
                "pool entry is already open",
            ));
        }
        self.make_room(Some(index))?;
        self.admit(index, flags)?;
        self.bump(index);
        Ok(())
    }

    /// Open the entry and restore its previously recorded current offset
    /// (`0` the first time an entry is opened) — the back-end's own `open`
    /// always resets its offset to `0`, so the pool seeks it back afterward.
    fn admit(&mut self, index: usize, flags: OpenFlags) -> Result<()> {
        let entry = self.entries[index].as_mut().unwrap();
        let saved_offset = entry.handle.tell();
        entry.handle.open(flags)?;
        if saved_offset > 0 {
            entry.handle.seek(saved_offset as i64, Whence::Set)?;
        }
        entry.is_open = true;
        entry.flags = Some(flags);
        Ok(())
    }

    /// Close the entry's handle. Unlike eviction, this is an explicit
    /// caller-driven close: failure is reported, not swallowed.
    pub fn close(&mut self, id: PoolEntryId) -> Result<()> {
        let index = self.index_of(id)?;
        let entry = self.entries[index].as_mut().unwrap();
        entry.handle.close()?;
        entry.is_open = false;
        Ok(())
    }

    /// Read from the entry, transparently reopening it first (with its
    /// last-used open flags) if it is not currently physically open.
    pub fn read(&mut self, id: PoolEntryId, buf: &mut [u8]) -> Result<usize> {
        let index = self.ensure_open(id)?;
        let entry = self.entries[index].as_mut().unwrap();
        let result = entry.handle.read(buf);
        self.bump(index);
        result
    }

    /// Write to the entry, transparently reopening it first if needed.
    pub fn write(&mut self, id: PoolEntryId, buf: &[u8]) -> Result<usize> {
        let index = self.ensure_open(id)?;
        let entry = self.entries[index].as_mut().unwrap();
        let result = entry.handle.write(buf);
        self.bump(index);
        result
    }

    /// Seek the entry, transparently reopening it first if needed.
    pub fn seek(&mut self, id: PoolEntryId, offset: i64, whence: Whence) -> Result<u64> {
        let index = self.ensure_open(id)?;
        let entry = self.entries[index].as_mut().unwrap();
        let result = entry.handle.seek(offset, whence);
        self.bump(index);
        result
    }

    /// The entry's logical offset, preserved whether or not it is currently
    /// physically open.
    pub fn tell(&self, id: PoolEntryId) -> Result<u64> {
        let index = self.index_of(id)?;
        Ok(self.entries[index].as_ref().unwrap().handle.tell())
    }

    /// Whether the entry is currently physically open.
    pub fn is_open(&self, id: PoolEntryId) -> Result<bool> {
        let index = self.index_of(id)?;
        Ok(self.entries[index].as_ref().unwrap().is_open)
    }

    /// Detach and drop an entry from the pool without closing it first.
    /// Prefer [`Pool::free`] unless the handle is known to already be
    /// closed.
    pub fn remove(&mut self, id: PoolEntryId) -> Result<()> {
        let index = self.index_of(id)?;
        self.entries[index] = None;
        Ok(())
    }

    /// Close an entry's handle (best-effort) and remove it from the pool.
    pub fn free(&mut self, id: PoolEntryId) -> Result<()> {
        let index = self.index_of(id)?;
        if let Some(entry) = self.entries[index].as_mut() {
            if entry.is_open {
                if let Err(err) = entry.handle.close() {
                    warn!("pool free: handle for {id:?} failed to close: {err}");
                }
            }
        }
        self.entries[index] = None;
        Ok(())
    }

    /// Close every physically open entry, best-effort: a failure on one
    /// entry is logged and does not stop the rest from being closed.
    pub fn close_all(&mut self) {
        for entry in self.entries.iter_mut().flatten() {
            if entry.is_open {
                if let Err(err) = entry.handle.close() {
                    warn!("pool close_all: a handle failed to close: {err}");
                }
                entry.is_open = false;
            }
        }
    }

    fn index_of(&self, id: PoolEntryId) -> Result<usize> {
        let index = id.0 as usize;
        match self.entries.get(index) {
            Some(Some(_)) => Ok(index),
            _ => Err(BfioError::new(
                ErrorDomain::Arguments,
                ErrorKind::InvalidValue,
                "pool entry id is not registered",
            )),
        }
    }

    fn ensure_open(&mut self, id: PoolEntryId) -> Result<usize> {
        let index = self.index_of(id)?;
        if self.entries[index].as_ref().unwrap().is_open {
            return Ok(index);
        }
        // Validate before make_room: make_room can physically close an
        // unrelated LRU victim, which must not happen on a call that is
        // going to fail anyway.
        let flags = self.entries[index]
            .as_ref()
            .unwrap()
            .flags
            .ok_or_else(|| {
                BfioError::new(
                    ErrorDomain::Runtime,
                    ErrorKind::OpenFailed,
                    "pool entry has never been opened",
                )
            })?;
        self.make_room(Some(index))?;
        self.admit(index, flags)?;
        Ok(index)
    }

    /// Evict the least-recently-used open entry if admitting `for_index`
    /// would push the open count over capacity. Entries with
    /// `reopen_allowed() == false` are never chosen as eviction victims.
    fn make_room(&mut self, for_index: Option<usize>) -> Result<()> {
        let open_count = self
            .entries
            .iter()
            .flatten()
            .filter(|e| e.is_open)
            .count();
        let already_open = for_index
            .and_then(|i| self.entries[i].as_ref())
            .map(|e| e.is_open)
            .unwrap_or(false);
        let projected = if already_open { open_count } else { open_count + 1 };
        if projected <= self.capacity {
            return Ok(());
        }

        let victim = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| {
                let e = e.as_ref()?;
                if e.is_open && e.handle.reopen_allowed() {
                    Some((i, e.last_used))
                } else {
                    None
                }
            })
            .min_by_key(|&(i, ts)| (ts, i));

        let Some((victim_index, _)) = victim else {
            return Err(BfioError::new(
                ErrorDomain::Runtime,
                ErrorKind::OpenFailed,
                "pool is at capacity and no entry may be evicted",
            ));
        };

        let entry = self.entries[victim_index].as_mut().unwrap();
        if let Err(err) = entry.handle.close() {
            warn!("pool eviction: handle failed to close during eviction: {err}");
        }
        entry.is_open = false;
        Ok(())
    }

    fn bump(&mut self, index: usize) {
        let ts = self.counter;
        self.counter += 1;
        if let Some(entry) = self.entries[index].as_mut() {
            entry.last_used = ts;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory_range::MemoryRangeBackend;
    use crate::backend::Backend;

    fn handle_with(buf: &'static mut [u8]) -> Handle {
        Handle::new(Box::new(unsafe { MemoryRangeBackend::new(buf.as_mut_ptr(), buf.len()) }) as Box<dyn Backend>)
    }

    fn leaked_buf(n: usize) -> &'static mut [u8] {
        Box::leak(vec![0u8; n].into_boxed_slice())
    }

    #[test]
    fn lru_evicts_oldest_open_entry() {
        let mut pool = Pool::new(2);
        let a = pool.append_handle(handle_with(leaked_buf(8)));
        let b = pool.append_handle(handle_with(leaked_buf(8)));
        let c = pool.append_handle(handle_with(leaked_buf(8)));

        pool.open(a, OpenFlags::READ | OpenFlags::WRITE).unwrap();
        pool.open(b, OpenFlags::READ | OpenFlags::WRITE).unwrap();
        pool.open(c, OpenFlags::READ | OpenFlags::WRITE).unwrap();

        assert!(!pool.is_open(a).unwrap());
        assert!(pool.is_open(b).unwrap());
        assert!(pool.is_open(c).unwrap());
    }

    #[test]
    fn append_interleaved_with_use_keeps_ids_valid() {
        let mut pool = Pool::new(10);
        let a = pool.append_handle(handle_with(leaked_buf(8)));
        pool.open(a, OpenFlags::READ | OpenFlags::WRITE).unwrap();
        pool.write(a, b"abcd").unwrap();
        pool.seek(a, 0, Whence::Set).unwrap();
        let mut out = [0u8; 4];
        pool.read(a, &mut out).unwrap();

        let b = pool.append_handle(handle_with(leaked_buf(8)));
        pool.open(b, OpenFlags::READ | OpenFlags::WRITE).unwrap();
        pool.write(b, b"efgh").unwrap();
        assert_eq!(pool.tell(b).unwrap(), 4);
    }

    #[test]
    fn pool_invariant_open_count_never_exceeds_capacity() {
        let mut pool = Pool::new(2);
        let ids: Vec<_> = (0..5).map(|_| pool.append_handle(handle_with(leaked_buf(8)))).collect();
        for &id in &ids {
            pool.open(id, OpenFlags::READ | OpenFlags::WRITE).unwrap();
            let open_count = ids.iter().filter(|&&id| pool.is_open(id).unwrap()).count();
            assert!(open_count <= 2);
        }
    }

    #[test]
    fn reopen_preserves_logical_offset() {
        let mut pool = Pool::new(1);
        let a = pool.append_handle(handle_with(leaked_buf(16)));
        let b = pool.append_handle(handle_with(leaked_buf(16)));

        pool.open(a, OpenFlags::READ | OpenFlags::WRITE).unwrap();
        pool.write(a, b"abcdefgh").unwrap();
        assert_eq!(pool.tell(a).unwrap(), 8);

        pool.open(b, OpenFlags::READ | OpenFlags::WRITE).unwrap();
        assert!(!pool.is_open(a).unwrap());

        let mut out = [0u8; 4];
        pool.read(a, &mut out).unwrap();
        assert_eq!(pool.tell(a).unwrap(), 12);
    }

    #[test]
    fn reading_a_never_opened_entry_fails_without_evicting_a_peer() {
        let mut pool = Pool::new(1);
        let a = pool.append_handle(handle_with(leaked_buf(8)));
        let b = pool.append_handle(handle_with(leaked_buf(8)));

        pool.open(a, OpenFlags::READ | OpenFlags::WRITE).unwrap();
        assert!(pool.is_open(a).unwrap());

        let mut out = [0u8; 4];
        assert!(pool.read(b, &mut out).is_err());
        assert!(pool.is_open(a).unwrap());
    }

    #[test]
    fn pinned_entry_is_never_evicted() {
        let mut pool = Pool::new(1);
        let a = pool.append_handle(handle_with(leaked_buf(8)));
        let b = pool.append_handle(handle_with(leaked_buf(8)));

        pool.open(a, OpenFlags::READ | OpenFlags::WRITE).unwrap();
        pool.set_handle_reopen_allowed_for_test(a, false);
        assert!(pool.open(b, OpenFlags::READ | OpenFlags::WRITE).is_err());
    }

    impl Pool {
        fn set_handle_reopen_allowed_for_test(&mut self, id: PoolEntryId, allowed: bool) {
            let index = self.index_of(id).unwrap();
            self.entries[index]
                .as_mut()
                .unwrap()
                .handle
                .set_reopen_allowed(allowed);
        }
    }
}
