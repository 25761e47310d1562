//! Log source handles
//!
//! A [`LogSource`] is a path to a readable access log, possibly a rotated
//! gzip archive. Opening yields a buffered reader that decompresses
//! transparently; the handle is released when the reader drops, on every
//! exit path.

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// One readable, possibly-compressed log source for a domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSource {
    path: PathBuf,
}

impl LogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        LogSource { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_gzipped(&self) -> bool {
        self.path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
    }

    /// Open the source for line-by-line reading
    ///
    /// `.gz` sources are wrapped in a streaming decoder; everything else is
    /// read as-is.
    pub fn open(&self) -> io::Result<Box<dyn BufRead>> {
        let file = File::open(&self.path)?;
        if self.is_gzipped() {
            Ok(Box::new(BufReader::new(GzDecoder::new(file))))
        } else {
            Ok(Box::new(BufReader::new(file)))
        }
    }
}

/// Read the next line, tolerating invalid UTF-8
///
/// Returns `Ok(None)` at end of input. Bytes that are not valid UTF-8 are
/// replaced rather than failing the source, matching how web servers can
/// write arbitrary client-supplied bytes into their logs.
pub fn read_lossy_line(reader: &mut dyn BufRead, buf: &mut Vec<u8>) -> io::Result<Option<String>> {
    buf.clear();
    let n = reader.read_until(b'\n', buf)?;
    if n == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(buf);
    Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_plain_source_reads_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access.log");
        std::fs::write(&path, "line one\nline two\n").unwrap();

        let source = LogSource::new(&path);
        let mut reader = source.open().unwrap();
        let mut buf = Vec::new();
        assert_eq!(
            read_lossy_line(&mut reader, &mut buf).unwrap().as_deref(),
            Some("line one")
        );
        assert_eq!(
            read_lossy_line(&mut reader, &mut buf).unwrap().as_deref(),
            Some("line two")
        );
        assert_eq!(read_lossy_line(&mut reader, &mut buf).unwrap(), None);
    }

    #[test]
    fn test_gzip_source_decompresses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access.log.1.gz");
        let file = File::create(&path).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(b"compressed line\n").unwrap();
        encoder.finish().unwrap();

        let source = LogSource::new(&path);
        let mut reader = source.open().unwrap();
        let mut buf = Vec::new();
        assert_eq!(
            read_lossy_line(&mut reader, &mut buf).unwrap().as_deref(),
            Some("compressed line")
        );
    }

    #[test]
    fn test_invalid_utf8_is_replaced_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access.log");
        std::fs::write(&path, b"ok\n\xff\xfe bad bytes\n").unwrap();

        let source = LogSource::new(&path);
        let mut reader = source.open().unwrap();
        let mut buf = Vec::new();
        assert_eq!(
            read_lossy_line(&mut reader, &mut buf).unwrap().as_deref(),
            Some("ok")
        );
        let second = read_lossy_line(&mut reader, &mut buf).unwrap().unwrap();
        assert!(second.contains("bad bytes"));
    }

    #[test]
    fn test_missing_file_is_an_open_error() {
        let source = LogSource::new("/nonexistent/access.log");
        assert!(source.open().is_err());
    }

    #[test]
    fn test_final_line_without_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access.log");
        std::fs::write(&path, "no trailing newline").unwrap();

        let source = LogSource::new(&path);
        let mut reader = source.open().unwrap();
        let mut buf = Vec::new();
        assert_eq!(
            read_lossy_line(&mut reader, &mut buf).unwrap().as_deref(),
            Some("no trailing newline")
        );
        assert_eq!(read_lossy_line(&mut reader, &mut buf).unwrap(), None);
    }
}
