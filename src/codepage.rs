//! Name storage for path-addressed back-ends, with codepage tagging.
//!
//! Actual codepage transcoding tables are explicitly out of scope for the
//! core (spec.md §1 lists "text codepage tables" among the external
//! collaborators this library touches but does not implement); this module
//! only stores the raw name bytes alongside which codepage they are in, and
//! exposes a pluggable [`CodepageTranscoder`] an embedder can supply a real
//! table for. The one transcoder built in here, [`AsciiTranscoder`], is
//! correct by construction since ASCII is a strict subset of every one of
//! the Windows-125x codepages.

use crate::error::{BfioError, ErrorDomain, ErrorKind, Result};

/// Which byte-to-character mapping a stored name's bytes are in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Codepage {
    Ascii,
    Windows1250,
    Windows1251,
    Windows1252,
    Windows1253,
    Windows1254,
    Windows1255,
    Windows1256,
    Windows1257,
    Windows1258,
}

/// A name (file path, sub-segment label, ...) stored as raw bytes tagged
/// with the codepage they were encoded in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    bytes: Vec<u8>,
    codepage: Codepage,
}

impl Name {
    /// Store a narrow (8-bit) name with an explicit codepage.
    pub fn from_narrow_bytes(bytes: impl Into<Vec<u8>>, codepage: Codepage) -> Self {
        Self {
            bytes: bytes.into(),
            codepage,
        }
    }

    /// Store a UTF-8 `str` as an ASCII-tagged name if it is pure ASCII,
    /// otherwise as UTF-8 bytes tagged `Ascii` regardless (the codepage tag
    /// only matters to a transcoder when the bytes are actually decoded).
    pub fn from_narrow_str(name: &str) -> Self {
        Self::from_narrow_bytes(name.as_bytes().to_vec(), Codepage::Ascii)
    }

    /// Store a wide (UTF-16) name, re-encoded to UTF-8 bytes internally (the
    /// single canonical in-memory form per spec.md §9).
    pub fn from_wide(wide: &[u16]) -> Self {
        let s = String::from_utf16_lossy(wide);
        Self::from_narrow_bytes(s.into_bytes(), Codepage::Ascii)
    }

    /// The codepage these bytes are tagged with.
    pub fn codepage(&self) -> Codepage {
        self.codepage
    }

    /// The raw stored bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decode via the given transcoder.
    pub fn decode(&self, transcoder: &dyn CodepageTranscoder) -> Result<String> {
        transcoder.to_utf8(&self.bytes, self.codepage)
    }

    /// Re-encode as UTF-16 code units via the given transcoder.
    pub fn to_wide(&self, transcoder: &dyn CodepageTranscoder) -> Result<Vec<u16>> {
        Ok(self.decode(transcoder)?.encode_utf16().collect())
    }
}

/// External collaborator interface: decodes codepage-tagged bytes to UTF-8.
///
/// The core ships only [`AsciiTranscoder`]; a full Windows-125x table lives
/// outside this crate's scope.
pub trait CodepageTranscoder {
    /// Decode `bytes`, which are tagged as being in `codepage`, to UTF-8.
    fn to_utf8(&self, bytes: &[u8], codepage: Codepage) -> Result<String>;
}

/// The only codepage this crate can transcode without an external table:
/// ASCII decodes trivially, and any other codepage is rejected rather than
/// silently mis-decoded.
#[derive(Debug, Default, Clone, Copy)]
pub struct AsciiTranscoder;

impl CodepageTranscoder for AsciiTranscoder {
    fn to_utf8(&self, bytes: &[u8], codepage: Codepage) -> Result<String> {
        if codepage != Codepage::Ascii {
            return Err(BfioError::new(
                ErrorDomain::Conversion,
                ErrorKind::Generic,
                format!("{codepage:?} transcoding requires an external table"),
            ));
        }
        if let Some(&bad) = bytes.iter().find(|&&b| b >= 0x80) {
            return Err(BfioError::new(
                ErrorDomain::Conversion,
                ErrorKind::Generic,
                format!("byte {bad:#04x} is not valid ASCII"),
            ));
        }
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_round_trips() {
        let name = Name::from_narrow_str("hello.txt");
        assert_eq!(name.decode(&AsciiTranscoder).unwrap(), "hello.txt");
    }

    #[test]
    fn ascii_transcoder_rejects_high_bytes() {
        let name = Name::from_narrow_bytes(vec![0xE9], Codepage::Ascii);
        assert!(name.decode(&AsciiTranscoder).is_err());
    }

    #[test]
    fn non_ascii_codepage_requires_external_table() {
        let name = Name::from_narrow_bytes(vec![b'a'], Codepage::Windows1252);
        assert!(name.decode(&AsciiTranscoder).is_err());
    }

    #[test]
    fn wide_round_trips_through_utf16() {
        let wide: Vec<u16> = "abc".encode_utf16().collect();
        let name = Name::from_wide(&wide);
        assert_eq!(name.to_wide(&AsciiTranscoder).unwrap(), wide);
    }
}
