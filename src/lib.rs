//! Basic File I/O: a uniform, pluggable-backend byte-addressable I/O
//! abstraction with a bounded LRU handle pool.
//!
//! A [`handle::Handle`] wraps a [`backend::Backend`] trait object — a file,
//! an in-memory buffer range, a bounded window into another back-end, or a
//! concatenation of sub-back-ends — behind one polymorphic read/write/seek
//! interface. A [`pool::Pool`] lets a caller keep far more logical handles
//! registered than the process can afford to hold physically open at once,
//! transparently closing and reopening the least-recently-used one while
//! preserving every handle's logical offset.

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod backend;
pub mod codepage;
pub mod error;
pub mod flags;
pub mod handle;
pub mod offsets_list;
pub mod pool;

pub use crate::backend::Backend;
pub use crate::codepage::{AsciiTranscoder, Codepage, CodepageTranscoder, Name};
pub use crate::error::{BfioError, ErrorDomain, ErrorFrame, ErrorKind, ErrorSink, Result};
pub use crate::flags::{OpenFlags, Whence};
pub use crate::handle::Handle;
pub use crate::offsets_list::{Interval, OffsetsList};
pub use crate::pool::{Pool, PoolEntryId};
