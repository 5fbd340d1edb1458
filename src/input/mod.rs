use std::io::{BufRead, BufReader, Read};
use std::path::Path;

pub const SMALL_BUFFER_SIZE: usize = 64 * 1024;
pub const MEDIUM_BUFFER_SIZE: usize = 256 * 1024;

/// Compression format of an input dump, detected from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
    Zstd,
}

impl Compression {
    /// Detect compression format from file extension
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("gz" | "gzip") => Compression::Gzip,
            Some("bz2" | "bzip2") => Compression::Bzip2,
            Some("xz" | "lzma") => Compression::Xz,
            Some("zst" | "zstd") => Compression::Zstd,
            _ => Compression::None,
        }
    }

    /// Wrap a reader with the appropriate decompressor
    pub fn wrap_reader<'a>(&self, reader: Box<dyn Read + 'a>) -> Box<dyn Read + 'a> {
        match self {
            Compression::None => reader,
            Compression::Gzip => Box::new(flate2::read::GzDecoder::new(reader)),
            Compression::Bzip2 => Box::new(bzip2::read::BzDecoder::new(reader)),
            Compression::Xz => Box::new(xz2::read::XzDecoder::new(reader)),
            Compression::Zstd => Box::new(zstd::stream::read::Decoder::new(reader).unwrap()),
        }
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Gzip => write!(f, "gzip"),
            Compression::Bzip2 => write!(f, "bzip2"),
            Compression::Xz => write!(f, "xz"),
            Compression::Zstd => write!(f, "zstd"),
        }
    }
}

/// Line feeder over a dump stream with one physical line of lookahead.
///
/// The converter classifies statements line by line; the lookahead lets it
/// settle a statement's skip verdict before the opening line has been emitted
/// (multi-line foreign-key alterations need this).
pub struct LineReader<R: Read> {
    reader: BufReader<R>,
    lookahead: Option<String>,
    line_buffer: Vec<u8>,
}

impl<R: Read> LineReader<R> {
    pub fn new(reader: R, buffer_size: usize) -> std::io::Result<Self> {
        let mut feeder = Self {
            reader: BufReader::with_capacity(buffer_size, reader),
            lookahead: None,
            line_buffer: Vec::with_capacity(4 * 1024),
        };
        feeder.lookahead = feeder.read_raw()?;
        Ok(feeder)
    }

    /// Return the next physical line, advancing the lookahead.
    pub fn next_line(&mut self) -> std::io::Result<Option<String>> {
        let current = self.lookahead.take();
        if current.is_some() {
            self.lookahead = self.read_raw()?;
        }
        Ok(current)
    }

    /// The line that `next_line` will return after the current one.
    pub fn peek(&self) -> Option<&str> {
        self.lookahead.as_deref()
    }

    fn read_raw(&mut self) -> std::io::Result<Option<String>> {
        self.line_buffer.clear();
        let n = self.reader.read_until(b'\n', &mut self.line_buffer)?;
        if n == 0 {
            return Ok(None);
        }
        while matches!(self.line_buffer.last(), Some(b'\n' | b'\r')) {
            self.line_buffer.pop();
        }
        // Dumps can carry invalid UTF-8 inside bytea literals; degrade rather than fail.
        Ok(Some(String::from_utf8_lossy(&self.line_buffer).into_owned()))
    }
}

pub fn determine_buffer_size(file_size: u64) -> usize {
    if file_size > 1024 * 1024 * 1024 {
        MEDIUM_BUFFER_SIZE
    } else {
        SMALL_BUFFER_SIZE
    }
}
