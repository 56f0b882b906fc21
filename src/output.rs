//! Record serialization: NDJSON, JSON array, and CSV, with field projection.
//!
//! Workers append serialized matches to thread-local `Vec<u8>` buffers; the
//! engine concatenates those in chunk order and writes once. Everything here
//! therefore writes into a `Vec<u8>`, never to a sink directly.
//!
//! Serialization mirrors the parser's zero-copy stance: string bytes are
//! emitted without re-escaping, numbers verbatim from the source slice,
//! keywords as canonical `true`/`false`/`null`. Field order is input order,
//! or projection order under `--select`.

use crate::object::{JsonValue, RawObject};
use crate::query::{FieldPath, resolve_path};

/// Output format selected by `--output`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Ndjson,
    Json,
    Csv,
}

/// How matched records are rendered.
#[derive(Debug, Default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Pretty-print the JSON array (one record per line, two-space indent).
    pub pretty: bool,
    /// Projection from `--select`; `None` emits all fields.
    pub select: Option<Vec<FieldPath>>,
}

/// Append one matched record in the configured format.
///
/// JSON records carry a leading separator (`,`, or `,\n  ` when pretty);
/// the merge step strips the very first one and adds the brackets. CSV rows
/// use `columns` (resolved by the engine from the projection or the first
/// match) and ignore `select`.
pub fn write_record(
    buf: &mut Vec<u8>,
    obj: &RawObject,
    config: &OutputConfig,
    columns: &[FieldPath],
) {
    match config.format {
        OutputFormat::Ndjson => {
            write_projected(buf, obj, config.select.as_deref());
            buf.push(b'\n');
        }
        OutputFormat::Json => {
            if config.pretty {
                buf.extend_from_slice(b",\n  ");
            } else {
                buf.push(b',');
            }
            write_projected(buf, obj, config.select.as_deref());
        }
        OutputFormat::Csv => write_csv_row(buf, obj, columns),
    }
}

/// Serialize a record, honoring an optional projection.
fn write_projected(buf: &mut Vec<u8>, obj: &RawObject, select: Option<&[FieldPath]>) {
    match select {
        None => write_object(buf, obj),
        Some(paths) => {
            buf.push(b'{');
            let mut first = true;
            for path in paths {
                // Missing fields are omitted rather than emitted as null.
                let Some(value) = resolve_path(obj, path) else {
                    continue;
                };
                if !first {
                    buf.push(b',');
                }
                first = false;
                buf.push(b'"');
                buf.extend_from_slice(path.raw());
                buf.extend_from_slice(b"\":");
                write_value(buf, value);
            }
            buf.push(b'}');
        }
    }
}

fn write_object(buf: &mut Vec<u8>, obj: &RawObject) {
    buf.push(b'{');
    for (i, (key, value)) in obj.fields().iter().enumerate() {
        if i > 0 {
            buf.push(b',');
        }
        buf.push(b'"');
        buf.extend_from_slice(key);
        buf.extend_from_slice(b"\":");
        write_value(buf, value);
    }
    buf.push(b'}');
}

fn write_value(buf: &mut Vec<u8>, value: &JsonValue) {
    match value {
        JsonValue::Null => buf.extend_from_slice(b"null"),
        JsonValue::Bool(true) => buf.extend_from_slice(b"true"),
        JsonValue::Bool(false) => buf.extend_from_slice(b"false"),
        JsonValue::Number(raw) => buf.extend_from_slice(raw),
        JsonValue::String(s) => {
            buf.push(b'"');
            buf.extend_from_slice(s);
            buf.push(b'"');
        }
        JsonValue::Array(elems) => {
            buf.push(b'[');
            for (i, elem) in elems.iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                write_value(buf, elem);
            }
            buf.push(b']');
        }
        JsonValue::Object(obj) => write_object(buf, obj),
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Header row for the given columns.
pub fn write_csv_header(buf: &mut Vec<u8>, columns: &[FieldPath]) {
    for (i, col) in columns.iter().enumerate() {
        if i > 0 {
            buf.push(b',');
        }
        write_csv_cell(buf, col.raw());
    }
    buf.push(b'\n');
}

/// One CSV row in column order. Null and missing values render as the empty
/// string; objects and arrays as `{}` and `[]`.
pub fn write_csv_row(buf: &mut Vec<u8>, obj: &RawObject, columns: &[FieldPath]) {
    for (i, col) in columns.iter().enumerate() {
        if i > 0 {
            buf.push(b',');
        }
        match resolve_path(obj, col) {
            None | Some(JsonValue::Null) => {}
            Some(JsonValue::Bool(true)) => buf.extend_from_slice(b"true"),
            Some(JsonValue::Bool(false)) => buf.extend_from_slice(b"false"),
            Some(JsonValue::Number(raw)) => buf.extend_from_slice(raw),
            Some(JsonValue::String(s)) => write_csv_cell(buf, s),
            Some(JsonValue::Object(_)) => buf.extend_from_slice(b"{}"),
            Some(JsonValue::Array(_)) => buf.extend_from_slice(b"[]"),
        }
    }
    buf.push(b'\n');
}

/// Quote a cell when it contains a comma, quote, or line break; embedded
/// quotes double.
fn write_csv_cell(buf: &mut Vec<u8>, cell: &[u8]) {
    let needs_quoting = cell
        .iter()
        .any(|b| matches!(b, b',' | b'"' | b'\n' | b'\r'));
    if !needs_quoting {
        buf.extend_from_slice(cell);
        return;
    }
    buf.push(b'"');
    for &b in cell {
        if b == b'"' {
            buf.push(b'"');
        }
        buf.push(b);
    }
    buf.push(b'"');
}
