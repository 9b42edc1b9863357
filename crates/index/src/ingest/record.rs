//! Line-oriented record input: `<url> <key> [<key> ...]`.

use crate::ingest::error::{Error, ErrorKind, Result};
use exn::ResultExt;
use memchr::memchr;
use std::io::BufRead;

/// One input line: a URL and the keys that name it.
///
/// Fields are kept as raw bytes; they are only ever hashed, never
/// interpreted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    /// 1-based line number in the input, or `0` for records built in code.
    pub line: u64,
    pub url: Vec<u8>,
    pub keys: Vec<Vec<u8>>,
}

impl Record {
    pub fn new(url: impl Into<Vec<u8>>, keys: impl IntoIterator<Item = impl Into<Vec<u8>>>) -> Self {
        Self {
            line: 0,
            url: url.into(),
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Split one line (without its terminator) into a record.
    ///
    /// Fields are separated by spaces; runs of spaces and a trailing `\r` are
    /// tolerated. Returns `Ok(None)` for a blank line.
    pub fn parse(line: u64, bytes: &[u8]) -> Result<Option<Self>> {
        let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
        let mut fields = bytes.split(|b| *b == b' ').filter(|field| !field.is_empty());
        let Some(url) = fields.next() else {
            return Ok(None);
        };
        let keys: Vec<Vec<u8>> = fields.map(<[u8]>::to_vec).collect();
        if keys.is_empty() {
            exn::bail!(ErrorKind::MissingKeys { line });
        }
        Ok(Some(Self {
            line,
            url: url.to_vec(),
            keys,
        }))
    }
}

/// Reads [`Record`]s from a buffered byte stream with a hard per-line limit.
///
/// A line longer than `max_line_length` bytes is consumed up to its newline
/// without being buffered past the limit, and yielded as
/// [`ErrorKind::LineTooLong`]; reading continues with the next line. An I/O
/// failure is yielded once as [`ErrorKind::Input`] and ends the iterator.
pub struct RecordReader<R> {
    reader: R,
    max_line_length: usize,
    line: u64,
    buffer: Vec<u8>,
    finished: bool,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(reader: R, max_line_length: usize) -> Self {
        Self {
            reader,
            max_line_length,
            line: 0,
            buffer: Vec::with_capacity(max_line_length.min(64 * 1024)),
            finished: false,
        }
    }

    /// Fill `self.buffer` with the next line, minus its `\n` or `\r\n`
    /// terminator. Returns the length of the line without the terminator,
    /// which exceeds `max_line_length` exactly when the buffer holds only a
    /// prefix of it, or `None` at end of input.
    fn read_line(&mut self) -> Result<Option<usize>> {
        self.buffer.clear();
        // One spare byte so a `\r` ending a line at the limit is still buffered.
        let capacity = self.max_line_length.saturating_add(1);
        let mut length = 0usize;
        let mut last = None;
        loop {
            let available = self.reader.fill_buf().or_raise(|| ErrorKind::Input)?;
            if available.is_empty() {
                // A final line without a trailing newline still counts.
                return Ok(last.map(|last| self.finish_line(length, last)));
            }
            let (chunk, consumed, complete) = match memchr(b'\n', available) {
                Some(end) => (&available[..end], end + 1, true),
                None => (available, available.len(), false),
            };
            if length + chunk.len() <= capacity {
                self.buffer.extend_from_slice(chunk);
            }
            length += chunk.len();
            last = Some(chunk.last().copied().or(last.flatten()));
            self.reader.consume(consumed);
            if complete {
                return Ok(Some(self.finish_line(length, last.flatten())));
            }
        }
    }

    /// Drop a trailing `\r` from the buffered line and from its length.
    fn finish_line(&mut self, length: usize, last: Option<u8>) -> usize {
        if last != Some(b'\r') {
            return length;
        }
        if self.buffer.len() == length {
            self.buffer.pop();
        }
        length - 1
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            let length = match self.read_line() {
                Ok(Some(length)) => length,
                Ok(None) => {
                    self.finished = true;
                    return None;
                },
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                },
            };
            self.line += 1;
            if length > self.max_line_length {
                return Some(Err(Error::from(ErrorKind::LineTooLong {
                    line: self.line,
                    length,
                    limit: self.max_line_length,
                })));
            }
            match Record::parse(self.line, &self.buffer) {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}
