//! MongoDB-style query language: filter tree, compiler, evaluator.
//!
//! A query is itself a JSON object (`{"age":{"$gt":30}}`). The compiler in
//! [`compile`] turns the query bytes into an owned [`Filter`] tree (regexes
//! compiled once, literals owned, field paths split once) and the evaluator
//! in [`eval`] matches borrowed records against it with no per-record
//! allocation.

mod compile;
mod eval;

pub use compile::{QueryError, compile};
pub use eval::{matches, resolve_path};

/// A compiled query filter node.
#[derive(Debug)]
pub enum Filter {
    /// The empty query `{}`; matches every record.
    AlwaysTrue,
    /// `$eq` / `$ne` / `$gt` / `$gte` / `$lt` / `$lte`, and bare
    /// `{"field": literal}` equality.
    Compare {
        path: FieldPath,
        op: CmpOp,
        literal: Literal,
    },
    /// `$and` / `$or` / `$not` / `$nor`.
    Logical {
        op: LogicalOp,
        operands: Vec<Filter>,
    },
    /// `$in` (negate = false) / `$nin` (negate = true).
    InSet {
        path: FieldPath,
        negate: bool,
        literals: Vec<Literal>,
    },
    /// `$exists`.
    Exists {
        path: FieldPath,
        should_exist: bool,
    },
    /// `$regex` with optional `$options`, compiled once.
    Regex {
        path: FieldPath,
        regex: regex::bytes::Regex,
        pattern: String,
        case_insensitive: bool,
    },
    /// `$size`: arrays of exactly this length.
    Size { path: FieldPath, len: usize },
    /// `$type`: dynamic kind name comparison.
    Type {
        path: FieldPath,
        type_name: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Not,
    Nor,
}

/// A query right-hand side, owned by the filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(f64),
    String(Vec<u8>),
}

/// A dotted field path, split into segments once at compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    raw: Vec<u8>,
    segments: Vec<Vec<u8>>,
}

impl FieldPath {
    /// Split `key` on `.`. A key without dots yields one segment.
    pub fn new(key: &[u8]) -> Self {
        FieldPath {
            raw: key.to_vec(),
            segments: key.split(|&b| b == b'.').map(<[u8]>::to_vec).collect(),
        }
    }

    /// A single-segment path that is never split, for keys that name a
    /// top-level field directly (CSV headers derived from a record may
    /// legitimately contain dots).
    pub fn single(key: &[u8]) -> Self {
        FieldPath {
            raw: key.to_vec(),
            segments: vec![key.to_vec()],
        }
    }

    pub fn segments(&self) -> &[Vec<u8>] {
        &self.segments
    }

    /// The original dotted key, used as the output field name under
    /// projection and as the CSV column header.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_single_segment() {
        let p = FieldPath::new(b"city");
        assert_eq!(p.segments(), &[b"city".to_vec()]);
        assert_eq!(p.raw(), b"city");
    }

    #[test]
    fn path_dotted() {
        let p = FieldPath::new(b"u.address.zip");
        assert_eq!(
            p.segments(),
            &[b"u".to_vec(), b"address".to_vec(), b"zip".to_vec()]
        );
        assert_eq!(p.raw(), b"u.address.zip");
    }
}
