//! Content-Length framing over a byte stream.
//!
//! Each message is prefixed with headers:
//! ```text
//! Content-Length: <length>\r\n
//! \r\n
//! <payload>
//! ```

use std::io::{BufRead, Write};

use crate::error::TransportError;

/// Reads and writes framed messages over an arbitrary byte stream.
///
/// Instantiated over the backend process's stdio in production and over
/// in-memory buffers in tests.
pub struct FramedTransport<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> FramedTransport<R, W> {
    /// Wraps a reader/writer pair.
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Sends one framed message.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] when the write fails.
    pub fn send(&mut self, message: &[u8]) -> Result<(), TransportError> {
        write!(self.writer, "Content-Length: {}\r\n\r\n", message.len())?;
        self.writer.write_all(message)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Receives one framed message, blocking until it is complete.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::MissingContentLength`] when the headers
    /// carry no length, [`TransportError::InvalidHeader`] when the length
    /// does not parse, and [`TransportError::Io`] for stream failures
    /// including EOF.
    pub fn receive(&mut self) -> Result<Vec<u8>, TransportError> {
        let content_length = self.read_headers()?;
        let mut content = vec![0u8; content_length];
        self.reader.read_exact(&mut content)?;
        Ok(content)
    }

    /// Consumes the header block up to and including the blank separator
    /// line, returning the declared payload length. Headers other than
    /// `Content-Length` carry nothing the bridge needs and are skipped.
    fn read_headers(&mut self) -> Result<usize, TransportError> {
        let mut declared: Option<usize> = None;
        let mut line = String::new();

        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Err(TransportError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "stream closed mid-header",
                )));
            }
            match line.trim() {
                "" => break,
                header => {
                    if let Some(value) = header.strip_prefix("Content-Length: ") {
                        declared =
                            Some(value.parse().map_err(|_| TransportError::InvalidHeader)?);
                    }
                }
            }
        }

        declared.ok_or(TransportError::MissingContentLength)
    }
}
