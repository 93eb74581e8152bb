//! A back-end that concatenates an ordered sequence of sub-back-ends into a
//! single logical address space.

use crate::error::{BfioError, ErrorDomain, ErrorKind, Result};
use crate::flags::{OpenFlags, Whence};
use crate::offsets_list::OffsetsList;

use super::Backend;

/// A back-end presenting an ordered sequence of sub-back-ends as one
/// contiguous logical range.
///
/// Opening opens every segment in order; if any segment fails to open, every
/// previously-opened segment is closed again before the error is returned
/// (open is all-or-nothing). A read or write that would need to continue
/// past a non-last segment's declared size, but that segment returns fewer
/// bytes than its declared size, is an error — only the last segment is
/// allowed to end short. Writing past the end of the last segment is always
/// an error; this back-end never grows the segment list.
#[derive(Debug)]
pub struct MultiSegmentBackend {
    segments: Vec<Box<dyn Backend>>,
    offsets: OffsetsList<usize>,
    total_size: u64,
    offset: u64,
    open: bool,
}

impl MultiSegmentBackend {
    /// Build from segments and their declared sizes, in order. `sizes[i]`
    /// must be the logical size of `segments[i]`; this is not verified
    /// against the segment's actual size until it is opened.
    pub fn new(segments: Vec<Box<dyn Backend>>, sizes: Vec<u64>) -> Result<Self> {
        if segments.len() != sizes.len() {
            return Err(BfioError::new(
                ErrorDomain::Arguments,
                ErrorKind::InvalidValue,
                "segment count does not match size count",
            ));
        }
        let mut offsets = OffsetsList::new();
        let mut cursor = 0u64;
        for (i, &size) in sizes.iter().enumerate() {
            offsets.insert(cursor, size, i)?;
            cursor += size;
        }
        Ok(Self {
            segments,
            offsets,
            total_size: cursor,
            offset: 0,
            open: false,
        })
    }

    fn segment_mut(&mut self, index: usize) -> &mut Box<dyn Backend> {
        &mut self.segments[index]
    }
}

impl Backend for MultiSegmentBackend {
    fn open(&mut self, flags: OpenFlags) -> Result<()> {
        flags.validate()?;
        if self.open {
            return Err(BfioError::new(
                ErrorDomain::Runtime,
                ErrorKind::OpenFailed,
                "back-end is already open",
            ));
        }
        for i in 0..self.segments.len() {
            if let Err(err) = self.segments[i].open(flags) {
                for segment in &mut self.segments[..i] {
                    let _ = segment.close();
                }
                return Err(err.context(
                    ErrorDomain::Runtime,
                    ErrorKind::OpenFailed,
                    format!("segment {i} failed to open"),
                ));
            }
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
        let mut first_err = None;
        for segment in &mut self.segments {
            if let Err(err) = segment.close() {
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err.context(ErrorDomain::Runtime, ErrorKind::CloseFailed, "a segment failed to close")),
            None => Ok(()),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.offset >= self.total_size {
            return Ok(0);
        }
        let mut total_read = 0usize;
        let mut offset = self.offset;
        while total_read < buf.len() && offset < self.total_size {
            let Some(index) = self.offsets.lookup_index(offset) else {
                break;
            };
            let interval = self.offsets.get(index).unwrap();
            let local_offset = offset - interval.start;
            let segment_remaining = (interval.end() - offset) as usize;
            let want = (buf.len() - total_read).min(segment_remaining);
            let is_last_segment = index + 1 == self.offsets.len();

            let segment = self.segment_mut(interval.value);
            segment.seek(local_offset as i64, Whence::Set)?;
            let got = segment.read(&mut buf[total_read..total_read + want])?;
            if got < want && !is_last_segment {
                return Err(BfioError::new(
                    ErrorDomain::Io,
                    ErrorKind::ReadFailed,
                    format!("short read from non-last segment {}", interval.value),
                ));
            }
            total_read += got;
            offset += got as u64;
            if got == 0 {
                break;
            }
        }
        self.offset = offset;
        Ok(total_read)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.offset >= self.total_size {
            if buf.is_empty() {
                return Ok(0);
            }
            return Err(BfioError::new(
                ErrorDomain::Arguments,
                ErrorKind::WriteFailed,
                "write past end of last segment",
            ));
        }
        let mut total_written = 0usize;
        let mut offset = self.offset;
        while total_written < buf.len() && offset < self.total_size {
            let Some(index) = self.offsets.lookup_index(offset) else {
                break;
            };
            let interval = self.offsets.get(index).unwrap();
            let local_offset = offset - interval.start;
            let segment_remaining = (interval.end() - offset) as usize;
            let want = (buf.len() - total_written).min(segment_remaining);
            let is_last_segment = index + 1 == self.offsets.len();

            let segment = self.segment_mut(interval.value);
            segment.seek(local_offset as i64, Whence::Set)?;
            let wrote = segment.write(&buf[total_written..total_written + want])?;
            if wrote < want && !is_last_segment {
                return Err(BfioError::new(
                    ErrorDomain::Io,
                    ErrorKind::WriteFailed,
                    format!("short write to non-last segment {}", interval.value),
                ));
            }
            total_written += wrote;
            offset += wrote as u64;
            if wrote == 0 {
                break;
            }
        }
        if total_written < buf.len() && offset >= self.total_size {
            self.offset = offset;
            return Err(BfioError::new(
                ErrorDomain::Arguments,
                ErrorKind::WriteFailed,
                "write past end of last segment",
            ));
        }
        self.offset = offset;
        Ok(total_written)
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        let base = match whence {
            Whence::Set => 0i64,
            Whence::Cur => self.offset as i64,
            Whence::End => self.total_size as i64,
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
        for segment in &self.segments {
            if !segment.exists()? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn size(&self) -> Result<u64> {
        Ok(self.total_size)
    }

    fn try_clone(&self) -> Result<Box<dyn Backend>> {
        let segments = self
            .segments
            .iter()
            .map(|segment| segment.try_clone())
            .collect::<Result<Vec<_>>>()?;
        let sizes = self.offsets.iter().map(|iv| iv.size).collect();
        Ok(Box::new(MultiSegmentBackend::new(segments, sizes)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory_range::MemoryRangeBackend;

    fn segment(bytes: &mut [u8]) -> Box<dyn Backend> {
        Box::new(unsafe { MemoryRangeBackend::new(bytes.as_mut_ptr(), bytes.len()) })
    }

    #[test]
    fn read_crosses_segment_boundary() {
        let mut a = *b"AAAA";
        let mut b = *b"BBBB";
        let segments = vec![segment(&mut a), segment(&mut b)];
        let mut backend = MultiSegmentBackend::new(segments, vec![4, 4]).unwrap();
        backend.open(OpenFlags::READ).unwrap();
        backend.seek(2, Whence::Set).unwrap();
        let mut buf = [0u8; 4];
        let n = backend.read(&mut buf).unwrap();
        assert_eq!(n, 4);
        assert_eq!(&buf, b"AABB");
    }

    #[test]
    fn write_past_last_segment_is_an_error() {
        let mut a = *b"AAAA";
        let segments = vec![segment(&mut a)];
        let mut backend = MultiSegmentBackend::new(segments, vec![4]).unwrap();
        backend.open(OpenFlags::WRITE).unwrap();
        backend.seek(2, Whence::Set).unwrap();
        assert!(backend.write(b"XXXX").is_err());
    }

    #[test]
    fn size_is_sum_of_segment_sizes() {
        let mut a = *b"AAAA";
        let mut b = *b"BB";
        let segments = vec![segment(&mut a), segment(&mut b)];
        let mut backend = MultiSegmentBackend::new(segments, vec![4, 2]).unwrap();
        backend.open(OpenFlags::READ).unwrap();
        assert_eq!(backend.size().unwrap(), 6);
    }

    #[test]
    fn open_failure_rolls_back_already_opened_segments() {
        let mut a = *b"AAAA";
        let segments: Vec<Box<dyn Backend>> = vec![
            segment(&mut a),
            Box::new(super::super::file::FileBackend::new("/nonexistent/path/should/fail")),
        ];
        let mut backend = MultiSegmentBackend::new(segments, vec![4, 4]).unwrap();
        assert!(backend.open(OpenFlags::READ).is_err());
    }
}
