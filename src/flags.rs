//! Open flags and seek whence values.

use bitflags::bitflags;

bitflags! {
    /// How a back-end should be opened.
    ///
    /// Combinable via bitwise OR, mirroring the C library's `LIBBFIO_OPEN_*`
    /// bit values exactly so callers porting flag constants need no lookup
    /// table.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u8 {
        /// Open for reading.
        const READ = 0x01;
        /// Open for writing.
        const WRITE = 0x02;
        /// Truncate to zero length on open. Requires [`OpenFlags::WRITE`].
        const RESIZE = 0x04;
        /// Append: writes always land at the current end of the back-end.
        const APPEND = 0x08;
    }
}

impl OpenFlags {
    /// Reject flag combinations that are invalid at open time: no bits set,
    /// or `RESIZE` without `WRITE`.
    pub(crate) fn validate(self) -> crate::error::Result<()> {
        use crate::error::{BfioError, ErrorDomain, ErrorKind};

        if self.is_empty() {
            return Err(BfioError::new(
                ErrorDomain::Arguments,
                ErrorKind::InvalidValue,
                "open flags must not be empty",
            ));
        }
        if self.contains(OpenFlags::RESIZE) && !self.contains(OpenFlags::WRITE) {
            return Err(BfioError::new(
                ErrorDomain::Arguments,
                ErrorKind::InvalidValue,
                "RESIZE requires WRITE",
            ));
        }
        Ok(())
    }

    /// Whether this combination permits reading.
    pub fn can_read(self) -> bool {
        self.contains(OpenFlags::READ)
    }

    /// Whether this combination permits writing.
    pub fn can_write(self) -> bool {
        self.contains(OpenFlags::WRITE)
    }
}

/// Seek reference point, matching the Unix `lseek` whences exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Whence {
    /// Seek relative to the start of the back-end.
    Set,
    /// Seek relative to the current offset.
    Cur,
    /// Seek relative to the end of the back-end.
    End,
}

impl Whence {
    /// Decode a raw Unix whence value (`0`, `1`, `2`). Any other value is
    /// not a valid whence.
    pub fn from_raw(value: i32) -> Option<Self> {
        match value {
            0 => Some(Whence::Set),
            1 => Some(Whence::Cur),
            2 => Some(Whence::End),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_flags() {
        assert!(OpenFlags::empty().validate().is_err());
    }

    #[test]
    fn rejects_resize_without_write() {
        assert!(OpenFlags::RESIZE.validate().is_err());
        assert!((OpenFlags::RESIZE | OpenFlags::WRITE).validate().is_ok());
    }

    #[test]
    fn whence_decodes_unix_values_only() {
        assert_eq!(Whence::from_raw(0), Some(Whence::Set));
        assert_eq!(Whence::from_raw(1), Some(Whence::Cur));
        assert_eq!(Whence::from_raw(2), Some(Whence::End));
        assert_eq!(Whence::from_raw(3), None);
        assert_eq!(Whence::from_raw(-1), None);
    }
}
