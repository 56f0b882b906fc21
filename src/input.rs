//! Input acquisition and normalization.
//!
//! Files are memory-mapped read-only; stdin and compressed files are read
//! fully into an owned buffer. Either way the rest of the pipeline sees one
//! immutable `&[u8]` that every zero-copy slice borrows from.
//!
//! Two record framings are accepted, detected by the first non-whitespace
//! byte: `[` means a top-level JSON array of objects, anything else is
//! NDJSON. Array input is rewritten up front into an owned NDJSON buffer
//! (one object per line) so the parallel engine only ever deals with lines;
//! the mmap is released as soon as the converted buffer exists.

use anyhow::{Context, Result};
use memmap2::Mmap;

use crate::decompress;

/// The backing store for the input bytes.
///
/// Parsed objects borrow from this for their whole lifetime; the store must
/// outlive every record derived from it.
pub enum InputBuffer {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl InputBuffer {
    /// The input bytes, with a UTF-8 BOM skipped if present.
    pub fn as_bytes(&self) -> &[u8] {
        let raw = match self {
            InputBuffer::Mapped(map) => &map[..],
            InputBuffer::Owned(buf) => buf.as_slice(),
        };
        raw.strip_prefix(&[0xEF, 0xBB, 0xBF][..]).unwrap_or(raw)
    }
}

/// Open an input file: mmap for plain files, full decompression for
/// `.gz`/`.zst` files, plain read for empty files (mmap rejects length 0).
pub fn read_file(path: &str) -> Result<InputBuffer> {
    if decompress::is_compressed(path) {
        return Ok(InputBuffer::Owned(decompress::decompress_file(path)?));
    }
    let file = std::fs::File::open(path).with_context(|| format!("failed to open file: {path}"))?;
    let meta = file
        .metadata()
        .with_context(|| format!("failed to stat file: {path}"))?;
    if meta.len() == 0 {
        return Ok(InputBuffer::Owned(Vec::new()));
    }
    // SAFETY: the map is read-only and njq never writes to the file while
    // it is mapped. Concurrent external truncation is undefined, as for any
    // mmap consumer.
    let map = unsafe { Mmap::map(&file) }.with_context(|| format!("failed to mmap file: {path}"))?;
    Ok(InputBuffer::Mapped(map))
}

/// Read all of stdin into an owned buffer.
pub fn read_stdin() -> Result<InputBuffer> {
    use std::io::Read;
    let mut buf = Vec::new();
    std::io::stdin()
        .read_to_end(&mut buf)
        .context("failed to read stdin")?;
    Ok(InputBuffer::Owned(buf))
}

/// Record framing of an input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Nothing but whitespace.
    Empty,
    /// One object per line.
    Ndjson,
    /// A single top-level `[ {...}, {...} ]`.
    JsonArray,
}

/// Inspect the first non-whitespace byte.
pub fn detect_format(buf: &[u8]) -> InputFormat {
    match buf.iter().find(|b| !b.is_ascii_whitespace()) {
        None => InputFormat::Empty,
        Some(b'[') => InputFormat::JsonArray,
        Some(_) => InputFormat::Ndjson,
    }
}

/// Normalize an input buffer to NDJSON.
///
/// JSON-array input is converted into an owned buffer of newline-terminated
/// objects; dropping the original releases the mmap. NDJSON input passes
/// through untouched.
pub fn normalize(input: InputBuffer) -> InputBuffer {
    match detect_format(input.as_bytes()) {
        InputFormat::JsonArray => InputBuffer::Owned(array_to_ndjson(input.as_bytes())),
        InputFormat::Ndjson | InputFormat::Empty => input,
    }
}

/// Extract every top-level `{…}` object from a JSON array and emit each one
/// followed by `\n`.
///
/// The walk tracks brace depth and string state (honoring backslash
/// escapes), so braces, brackets, and commas inside string literals never
/// confuse it. Bytes outside objects (the surrounding `[` `]`, separating
/// commas, whitespace) are dropped. An object left unterminated at end of
/// input is dropped too, in line with the skip-the-offending-record policy.
pub fn array_to_ndjson(buf: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(buf.len() + 16);
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in buf.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' if depth > 0 => in_string = true,
            b'{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            b'}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    out.extend_from_slice(&buf[start..=i]);
                    out.push(b'\n');
                }
            }
            _ => {}
        }
    }

    out
}
