//! I/O wrappers used by the extractor and the rebuilder.

use std::io::Read;
use std::io::Write;

/// Wrapper writer that tracks total bytes written.
///
/// Wrapped around the compressed output of a rebuild to report its size.
///
/// # Examples
///
/// ```
/// use reassemble_core::io::CountingWriter;
/// use std::io::Write;
///
/// let mut writer = CountingWriter::new(Vec::new());
/// writer.write_all(b"layer")?;
/// assert_eq!(writer.total_bytes(), 5);
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct CountingWriter<W> {
    inner: W,
    bytes_written: u64,
}

impl<W> CountingWriter<W> {
    /// Creates a new counting writer.
    #[must_use]
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            bytes_written: 0,
        }
    }

    /// Returns the number of bytes successfully written.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.bytes_written
    }

    /// Consumes the wrapper and returns the inner writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let bytes = self.inner.write(buf)?;
        self.bytes_written += bytes as u64;
        Ok(bytes)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Reader that enforces an exact content length.
///
/// Yields an error instead of a clean end-of-stream when the inner reader
/// runs dry before `expected` bytes, and when it produces more than
/// `expected` bytes. After a failure, [`Self::is_mismatch`] distinguishes a
/// length mismatch from an ordinary I/O error of the inner reader.
///
/// # Examples
///
/// ```
/// use reassemble_core::io::LengthCheckedReader;
/// use std::io::Read;
///
/// let mut reader = LengthCheckedReader::new(&b"abc"[..], 5);
/// let mut buf = Vec::new();
/// assert!(reader.read_to_end(&mut buf).is_err());
/// assert!(reader.is_mismatch());
/// assert_eq!(reader.bytes_read(), 3);
/// ```
pub struct LengthCheckedReader<R> {
    inner: R,
    expected: u64,
    read: u64,
    mismatch: bool,
}

impl<R> LengthCheckedReader<R> {
    /// Wraps `inner`, expecting exactly `expected` bytes.
    #[must_use]
    pub fn new(inner: R, expected: u64) -> Self {
        Self {
            inner,
            expected,
            read: 0,
            mismatch: false,
        }
    }

    /// Returns the number of bytes read so far.
    #[must_use]
    pub fn bytes_read(&self) -> u64 {
        self.read
    }

    /// Returns the expected length.
    #[must_use]
    pub fn expected(&self) -> u64 {
        self.expected
    }

    /// Returns `true` once a length mismatch has been detected.
    #[must_use]
    pub fn is_mismatch(&self) -> bool {
        self.mismatch
    }
}

impl<R: Read> Read for LengthCheckedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;

        if n == 0 && !buf.is_empty() && self.read < self.expected {
            self.mismatch = true;
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "content ended after {} of {} bytes",
                    self.read, self.expected
                ),
            ));
        }

        self.read += n as u64;
        if self.read > self.expected {
            self.mismatch = true;
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("content exceeds {} bytes", self.expected),
            ));
        }

        Ok(n)
    }
}
