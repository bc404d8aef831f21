//! Line-level JSONL reading and writing.
//!
//! [`JsonlSource`] hands out raw lines, [`parse_line`] turns one into a JSON
//! object or a [`SkipReason`], and [`JsonlSink`] writes serialized records one
//! per line with an optional periodic flush.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, ToolError};
use crate::pipeline::SkipReason;

pub type JsonObject = Map<String, Value>;

/// Parse one raw line into a JSON object.
///
/// Whitespace-only lines are `Blank`; anything that is not a JSON object is
/// reported with the reason it was rejected.
pub fn parse_line(raw: &[u8]) -> std::result::Result<JsonObject, SkipReason> {
    let text = std::str::from_utf8(raw).map_err(|_| SkipReason::InvalidUtf8)?;
    let text = text.trim();
    if text.is_empty() {
        return Err(SkipReason::Blank);
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(SkipReason::NotAnObject),
        Err(_) => Err(SkipReason::MalformedJson),
    }
}

pub struct JsonlSource<R> {
    reader: R,
    path: PathBuf,
    buf: Vec<u8>,
    line_number: u64,
}

impl JsonlSource<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| ToolError::io(path, e))?;
        Ok(Self::new(BufReader::new(file), path))
    }
}

impl<R: BufRead> JsonlSource<R> {
    /// Wrap any buffered reader; `path` is only used in error messages.
    pub fn new<P: Into<PathBuf>>(reader: R, path: P) -> Self {
        Self {
            reader,
            path: path.into(),
            buf: Vec::new(),
            line_number: 0,
        }
    }

    /// Next line without its terminator, or `None` at EOF.
    pub fn next_line(&mut self) -> Result<Option<&[u8]>> {
        self.buf.clear();
        let read = self
            .reader
            .read_until(b'\n', &mut self.buf)
            .map_err(|e| ToolError::io(&self.path, e))?;
        if read == 0 {
            return Ok(None);
        }
        self.line_number += 1;
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }
        Ok(Some(&self.buf))
    }

    /// 1-based number of the line last returned by [`next_line`](Self::next_line).
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub struct JsonlSink<W: Write> {
    writer: W,
    path: PathBuf,
    flush_every: Option<u64>,
    written: u64,
}

impl JsonlSink<BufWriter<File>> {
    /// Create (or truncate) the file at `path`.
    pub fn create(path: &Path, flush_every: Option<u64>) -> Result<Self> {
        let file = File::create(path).map_err(|e| ToolError::io(path, e))?;
        Ok(Self::new(BufWriter::new(file), path, flush_every))
    }
}

impl<W: Write> JsonlSink<W> {
    pub fn new<P: Into<PathBuf>>(writer: W, path: P, flush_every: Option<u64>) -> Self {
        Self {
            writer,
            path: path.into(),
            flush_every: flush_every.filter(|n| *n > 0),
            written: 0,
        }
    }

    /// Serialize `record` as a single line. Non-ASCII text is written as-is.
    pub fn write_record<T: Serialize>(&mut self, record: &T) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record).map_err(|e| {
            if e.is_io() {
                ToolError::io(&self.path, std::io::Error::from(e))
            } else {
                ToolError::Json(e)
            }
        })?;
        self.writer
            .write_all(b"\n")
            .map_err(|e| ToolError::io(&self.path, e))?;
        self.written += 1;

        if let Some(every) = self.flush_every {
            if self.written % every == 0 {
                tracing::debug!(written = self.written, "Periodic flush");
                self.flush()?;
            }
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(|e| ToolError::io(&self.path, e))
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
