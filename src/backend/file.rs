//! A back-end over a single on-disk file, addressed by path.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::codepage::Name;
use crate::error::{BfioError, ErrorDomain, ErrorKind, Result};
use crate::flags::{OpenFlags, Whence};

use super::Backend;

/// A back-end whose target is a single file on disk, addressed by path.
///
/// Opening with [`OpenFlags::WRITE`] creates the file if it does not exist
/// (`open(2)` semantics: only the leaf file is created, never missing parent
/// directories). Opening read-only against a missing file is an open-time
/// error. [`OpenFlags::RESIZE`] truncates to zero length on open, and
/// [`OpenFlags::APPEND`] makes every write land at the current end of file.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    file: Option<File>,
}

impl FileBackend {
    /// Create a back-end targeting `path`. Does not touch the filesystem
    /// until [`Backend::open`] is called.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    /// Create a back-end targeting a codepage-tagged [`Name`], decoded with
    /// `transcoder`.
    pub fn from_name(name: &Name, transcoder: &dyn crate::codepage::CodepageTranscoder) -> Result<Self> {
        Ok(Self::new(name.decode(transcoder)?))
    }

    /// The path this back-end targets.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn require_open(&mut self) -> Result<&mut File> {
        self.file.as_mut().ok_or_else(|| {
            BfioError::new(ErrorDomain::Runtime, ErrorKind::Generic, "back-end is not open")
        })
    }
}

impl Backend for FileBackend {
    fn open(&mut self, flags: OpenFlags) -> Result<()> {
        flags.validate()?;
        if self.file.is_some() {
            return Err(BfioError::new(
                ErrorDomain::Runtime,
                ErrorKind::OpenFailed,
                "back-end is already open",
            ));
        }

        let mut options = OpenOptions::new();
        options.read(flags.can_read());
        if flags.can_write() {
            options.write(true).create(true);
        }
        options.truncate(flags.contains(OpenFlags::RESIZE));
        options.append(flags.contains(OpenFlags::APPEND));

        let file = options.open(&self.path).map_err(|err| {
            BfioError::from(err).context(
                ErrorDomain::Io,
                ErrorKind::OpenFailed,
                format!("failed to open {}", self.path.display()),
            )
        })?;
        self.file = Some(file);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.file.take().is_none() {
            return Err(BfioError::new(
                ErrorDomain::Runtime,
                ErrorKind::CloseFailed,
                "back-end is already closed",
            ));
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let file = self.require_open()?;
        file.read(buf).map_err(|err| {
            BfioError::from(err).context(ErrorDomain::Io, ErrorKind::ReadFailed, "file read failed")
        })
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let file = self.require_open()?;
        file.write(buf).map_err(|err| {
            BfioError::from(err).context(ErrorDomain::Io, ErrorKind::WriteFailed, "file write failed")
        })
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        let pos = match whence {
            Whence::Set => {
                if offset < 0 {
                    return Err(BfioError::new(
                        ErrorDomain::Arguments,
                        ErrorKind::InvalidValue,
                        "seek before start of back-end",
                    ));
                }
                SeekFrom::Start(offset as u64)
            }
            Whence::Cur => SeekFrom::Current(offset),
            Whence::End => SeekFrom::End(offset),
        };
        let file = self.require_open()?;
        file.seek(pos).map_err(|err| {
            BfioError::from(err).context(ErrorDomain::Io, ErrorKind::SeekFailed, "file seek failed")
        })
    }

    fn exists(&self) -> Result<bool> {
        match self.path.try_exists() {
            Ok(exists) => Ok(exists),
            Err(err) => Err(BfioError::from(err).context(
                ErrorDomain::Io,
                ErrorKind::GetFailed,
                format!("failed to stat {}", self.path.display()),
            )),
        }
    }

    fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn size(&self) -> Result<u64> {
        let file = self.file.as_ref().ok_or_else(|| {
            BfioError::new(ErrorDomain::Runtime, ErrorKind::Generic, "back-end is not open")
        })?;
        file.metadata()
            .map(|meta| meta.len())
            .map_err(|err| BfioError::from(err).context(ErrorDomain::Io, ErrorKind::GetFailed, "failed to stat open file"))
    }

    fn try_clone(&self) -> Result<Box<dyn Backend>> {
        Ok(Box::new(FileBackend::new(self.path.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_missing_file_read_only_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = FileBackend::new(dir.path().join("missing.bin"));
        assert!(backend.open(OpenFlags::READ).is_err());
    }

    #[test]
    fn opening_with_write_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.bin");
        let mut backend = FileBackend::new(&path);
        backend.open(OpenFlags::READ | OpenFlags::WRITE).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn resize_truncates_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shrink.bin");
        std::fs::write(&path, b"hello world").unwrap();

        let mut backend = FileBackend::new(&path);
        backend
            .open(OpenFlags::WRITE | OpenFlags::RESIZE)
            .unwrap();
        assert_eq!(backend.size().unwrap(), 0);
    }

    #[test]
    fn read_past_end_returns_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.bin");
        std::fs::write(&path, b"abc").unwrap();

        let mut backend = FileBackend::new(&path);
        backend.open(OpenFlags::READ).unwrap();
        backend.seek(0, Whence::End).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(backend.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn close_on_closed_backend_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bin");
        let mut backend = FileBackend::new(&path);
        backend.open(OpenFlags::READ | OpenFlags::WRITE).unwrap();
        backend.close().unwrap();
        assert!(backend.close().is_err());
    }

    #[test]
    fn clone_is_independent_and_closed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bin");
        let mut backend = FileBackend::new(&path);
        backend.open(OpenFlags::READ | OpenFlags::WRITE).unwrap();
        let clone = backend.try_clone().unwrap();
        assert!(!clone.is_open());
    }
}
