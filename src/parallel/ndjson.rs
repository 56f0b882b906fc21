//! Parallel NDJSON engine.
//!
//! Partitions the (normalized) NDJSON buffer into `threads` record-aligned
//! chunks, runs parse → evaluate → serialize-or-count over each chunk on a
//! rayon worker, and merges thread-local outputs in chunk order into one
//! buffer for a single write. Fork-join with exactly one barrier: the join
//! before the merge.
//!
//! Workers share only the immutable input bytes and the immutable filter
//! tree. In count mode a single relaxed `AtomicU64` collects the per-worker
//! tallies, flushed once at worker exit and read once after the join.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use memchr::memchr_iter;
use rayon::prelude::*;

use crate::object::parse_object;
use crate::output::{self, OutputConfig, OutputFormat};
use crate::query::{self, FieldPath, Filter};
use crate::scan::find_next_newline;

/// Engine knobs beyond the output format.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Number of chunks to partition into (one worker each).
    pub threads: usize,
    /// Keep only the first N matches, in input order.
    pub limit: Option<usize>,
    /// Count matches instead of emitting them.
    pub count: bool,
}

/// Merged engine output.
#[derive(Debug)]
pub struct EngineResult {
    /// Fully framed output bytes; empty in count mode.
    pub output: Vec<u8>,
    /// Number of matching records (capped by the limit).
    pub matched: u64,
}

/// One worker's output.
struct ChunkOutput {
    buf: Vec<u8>,
    /// End offset in `buf` of each serialized record; tracked only when a
    /// limit needs record-granular truncation during the merge.
    ends: Vec<usize>,
}

/// Emitted at most once per process, no matter how many records are bad.
static PARSE_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_parse_error_once(err: crate::object::ParseError) {
    if !PARSE_WARNED.swap(true, Ordering::Relaxed) {
        eprintln!("njq: warning: skipping malformed record: {err}");
    }
}

/// Split `buf` into at most `parts` chunks of near-equal size, extending
/// each non-final chunk to the next newline so every chunk starts at a
/// record start. Chunks are disjoint and cover the buffer.
pub fn split_records(buf: &[u8], parts: usize) -> Vec<&[u8]> {
    if buf.is_empty() {
        return vec![];
    }
    let parts = parts.max(1);
    let target = (buf.len() / parts).max(1);

    let mut chunks = Vec::with_capacity(parts);
    let mut start = 0;
    while start < buf.len() {
        if chunks.len() + 1 == parts {
            chunks.push(&buf[start..]);
            break;
        }
        match find_next_newline(buf, start + target) {
            Some(nl) => {
                chunks.push(&buf[start..=nl]);
                start = nl + 1;
            }
            None => {
                chunks.push(&buf[start..]);
                break;
            }
        }
    }
    chunks
}

/// Run the full parse → filter → output pipeline over an NDJSON buffer.
///
/// `data` must already be normalized NDJSON (the caller handles JSON-array
/// conversion). The concatenated output preserves input record order for
/// any worker count.
pub fn process_ndjson(
    data: &[u8],
    filter: &Filter,
    config: &OutputConfig,
    opts: &EngineOptions,
) -> EngineResult {
    // CSV needs its column set before any worker runs.
    let columns: Vec<FieldPath> = if config.format == OutputFormat::Csv {
        match csv_columns(data, filter, config) {
            Some(cols) => cols,
            // No projection and no match: no header, no rows.
            None => {
                return EngineResult {
                    output: Vec::new(),
                    matched: 0,
                }
            }
        }
    } else {
        Vec::new()
    };

    let chunks = split_records(data, opts.threads);
    let counter = AtomicU64::new(0);
    let track_ends = opts.limit.is_some();

    let mut results: Vec<ChunkOutput> = chunks
        .par_iter()
        .map(|chunk| {
            process_chunk(
                chunk, filter, config, &columns, opts.count, track_ends, &counter,
            )
        })
        .collect();

    let mut matched = counter.load(Ordering::Relaxed);
    if let Some(limit) = opts.limit {
        matched = matched.min(limit as u64);
    }

    if opts.count {
        return EngineResult {
            output: Vec::new(),
            matched,
        };
    }

    if let Some(limit) = opts.limit {
        truncate_to_limit(&mut results, limit);
    }

    EngineResult {
        output: merge(&results, config, &columns),
        matched,
    }
}

// ---------------------------------------------------------------------------
// Workers
// ---------------------------------------------------------------------------

/// Process one chunk: iterate lines, skip blanks, parse, evaluate, and
/// either serialize into the thread-local buffer or bump the local count.
#[allow(clippy::too_many_arguments)]
fn process_chunk(
    chunk: &[u8],
    filter: &Filter,
    config: &OutputConfig,
    columns: &[FieldPath],
    count_only: bool,
    track_ends: bool,
    counter: &AtomicU64,
) -> ChunkOutput {
    let mut out = ChunkOutput {
        buf: Vec::new(),
        ends: Vec::new(),
    };
    let mut local: u64 = 0;

    let mut start = 0;
    for nl in memchr_iter(b'\n', chunk) {
        process_line(
            &chunk[start..nl],
            filter,
            config,
            columns,
            count_only,
            track_ends,
            &mut out,
            &mut local,
        );
        start = nl + 1;
    }
    // A final record without a trailing newline still counts.
    if start < chunk.len() {
        process_line(
            &chunk[start..],
            filter,
            config,
            columns,
            count_only,
            track_ends,
            &mut out,
            &mut local,
        );
    }

    // One flush per worker; correctness only needs the post-join load.
    counter.fetch_add(local, Ordering::Relaxed);
    out
}

#[allow(clippy::too_many_arguments)]
fn process_line(
    line: &[u8],
    filter: &Filter,
    config: &OutputConfig,
    columns: &[FieldPath],
    count_only: bool,
    track_ends: bool,
    out: &mut ChunkOutput,
    local: &mut u64,
) {
    let line = trim_line(line);
    if line.is_empty() {
        return;
    }
    let obj = match parse_object(line) {
        Ok(obj) => obj,
        Err(err) => {
            // Malformed records are skipped, not counted, not emitted.
            warn_parse_error_once(err);
            return;
        }
    };
    if !query::matches(&obj, filter) {
        return;
    }
    *local += 1;
    if count_only {
        return;
    }
    output::write_record(&mut out.buf, &obj, config, columns);
    if track_ends {
        out.ends.push(out.buf.len());
    }
}

/// Trim ASCII whitespace from both ends of a line (tolerates CRLF input and
/// indented records).
fn trim_line(line: &[u8]) -> &[u8] {
    let start = line
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(line.len());
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |p| p + 1);
    &line[start..end]
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Cut worker outputs down to the first `limit` records in chunk order.
fn truncate_to_limit(results: &mut [ChunkOutput], limit: usize) {
    let mut remaining = limit;
    for r in results.iter_mut() {
        let n = r.ends.len();
        if remaining == 0 {
            r.buf.clear();
            r.ends.clear();
        } else if n > remaining {
            r.buf.truncate(r.ends[remaining - 1]);
            r.ends.truncate(remaining);
            remaining = 0;
        } else {
            remaining -= n;
        }
    }
}

/// Concatenate worker buffers in chunk order into one exact-size buffer,
/// adding per-format framing (JSON array brackets, CSV header).
fn merge(results: &[ChunkOutput], config: &OutputConfig, columns: &[FieldPath]) -> Vec<u8> {
    let total: usize = results.iter().map(|r| r.buf.len()).sum();

    match config.format {
        OutputFormat::Ndjson => {
            let mut out = Vec::with_capacity(total);
            for r in results {
                out.extend_from_slice(&r.buf);
            }
            out
        }
        OutputFormat::Csv => {
            let mut header = Vec::new();
            output::write_csv_header(&mut header, columns);
            let mut out = Vec::with_capacity(total + header.len());
            out.extend_from_slice(&header);
            for r in results {
                out.extend_from_slice(&r.buf);
            }
            out
        }
        OutputFormat::Json => {
            // Workers prefixed every record with a separator; drop the first
            // one and wrap in brackets.
            let mut out = Vec::with_capacity(total + 4);
            out.push(b'[');
            let mut first = true;
            for r in results {
                if r.buf.is_empty() {
                    continue;
                }
                if first {
                    // Skip the leading ','; for pretty output the "\n  "
                    // that follows it stays.
                    out.extend_from_slice(&r.buf[1..]);
                    first = false;
                } else {
                    out.extend_from_slice(&r.buf);
                }
            }
            if config.pretty && !first {
                out.push(b'\n');
            }
            out.push(b']');
            out.push(b'\n');
            out
        }
    }
}

// ---------------------------------------------------------------------------
// CSV column resolution
// ---------------------------------------------------------------------------

/// Columns for CSV output: the projection if one was given, otherwise the
/// top-level field order of the first matching record (found by a serial
/// pre-pass). `None` means there is nothing to derive a header from.
fn csv_columns(data: &[u8], filter: &Filter, config: &OutputConfig) -> Option<Vec<FieldPath>> {
    if let Some(select) = &config.select {
        return Some(select.clone());
    }
    let mut start = 0;
    while start < data.len() {
        let end = find_next_newline(data, start).unwrap_or(data.len());
        let line = trim_line(&data[start..end]);
        start = end + 1;
        if line.is_empty() {
            continue;
        }
        let Ok(obj) = parse_object(line) else {
            continue;
        };
        if query::matches(&obj, filter) {
            // Keys with dots stay single segments: they name top-level
            // fields here, not paths.
            return Some(
                obj.fields()
                    .iter()
                    .map(|(key, _)| FieldPath::single(key))
                    .collect(),
            );
        }
    }
    None
}
