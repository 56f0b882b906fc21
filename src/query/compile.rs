//! Query compiler: JSON query bytes → owned [`Filter`] tree.
//!
//! The query string is parsed with the same zero-copy object parser the
//! engine uses for records, then converted structurally: operator keys are
//! validated, literals copied out, regexes compiled exactly once. A compile
//! failure aborts the run; only record-level errors are absorbed.

use thiserror::Error;

use crate::object::{JsonValue, ParseError, RawObject, parse_object};

use super::{CmpOp, FieldPath, Filter, Literal, LogicalOp};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query is not a valid JSON object: {0}")]
    InvalidQuery(#[from] ParseError),
    #[error("invalid operator `{0}`")]
    InvalidOperator(String),
    #[error("unsupported operator `{0}`")]
    UnsupportedOperator(String),
    #[error("`{0}` expects an object")]
    ExpectedObject(String),
    #[error("`{0}` expects an array")]
    ExpectedArray(String),
    #[error("unsupported value type for `{0}`")]
    UnsupportedValueType(String),
    #[error("unsupported query structure")]
    UnsupportedQueryStructure,
    #[error("invalid regex: {0}")]
    InvalidRegex(#[from] regex::Error),
}

/// Compile a query byte string into a filter tree.
pub fn compile(query: &[u8]) -> Result<Filter, QueryError> {
    let trimmed = trim(query);
    let obj = parse_object(trimmed)?;
    build(&obj)
}

fn trim(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |p| p + 1);
    &bytes[start..end]
}

/// Convert a parsed query object into a filter.
fn build(obj: &RawObject) -> Result<Filter, QueryError> {
    if obj.is_empty() {
        return Ok(Filter::AlwaysTrue);
    }

    // Sole $-operator at the top level: logical combinators.
    if obj.len() == 1 {
        let (key, value) = &obj.fields()[0];
        if key.starts_with(b"$") {
            return match *key {
                b"$and" => logical(LogicalOp::And, "$and", value),
                b"$or" => logical(LogicalOp::Or, "$or", value),
                b"$nor" => logical(LogicalOp::Nor, "$nor", value),
                b"$not" => {
                    let JsonValue::Object(inner) = value else {
                        return Err(QueryError::ExpectedObject("$not".into()));
                    };
                    Ok(Filter::Logical {
                        op: LogicalOp::Not,
                        operands: vec![build(inner)?],
                    })
                }
                _ => Err(QueryError::InvalidOperator(key_name(key))),
            };
        }
    }

    // Multiple pairs: implicit AND of per-field filters. $-keys are only
    // meaningful in sole-key position.
    let mut operands = Vec::with_capacity(obj.len());
    for (key, value) in obj.fields() {
        if key.starts_with(b"$") {
            return Err(QueryError::UnsupportedQueryStructure);
        }
        operands.push(field_filter(key, value)?);
    }
    if operands.len() == 1 {
        Ok(operands.swap_remove(0))
    } else {
        Ok(Filter::Logical {
            op: LogicalOp::And,
            operands,
        })
    }
}

/// `$and` / `$or` / `$nor`: the value must be an array of query objects.
fn logical(op: LogicalOp, name: &str, value: &JsonValue) -> Result<Filter, QueryError> {
    let JsonValue::Array(elems) = value else {
        return Err(QueryError::ExpectedArray(name.into()));
    };
    let mut operands = Vec::with_capacity(elems.len());
    for elem in elems {
        let JsonValue::Object(inner) = elem else {
            return Err(QueryError::ExpectedObject(name.into()));
        };
        operands.push(build(inner)?);
    }
    Ok(Filter::Logical { op, operands })
}

/// One `(field, value)` query pair.
fn field_filter(key: &[u8], value: &JsonValue) -> Result<Filter, QueryError> {
    let path = FieldPath::new(key);
    match value {
        JsonValue::Object(ops) => operator_filter(path, ops),
        JsonValue::Array(_) => Err(QueryError::UnsupportedValueType(key_name(key))),
        scalar => Ok(Filter::Compare {
            path,
            op: CmpOp::Eq,
            literal: literal(scalar, key)?,
        }),
    }
}

/// An operator object like `{"$gt":30,"$lt":50}` applied to one field.
fn operator_filter(path: FieldPath, ops: &RawObject) -> Result<Filter, QueryError> {
    if ops.is_empty() {
        return Err(QueryError::UnsupportedQueryStructure);
    }

    let mut filters = Vec::new();

    // $regex and $options form a single unit.
    if let Some(pattern) = ops.get(b"$regex") {
        filters.push(regex_filter(path.clone(), pattern, ops.get(b"$options"))?);
    } else if ops.get(b"$options").is_some() {
        return Err(QueryError::UnsupportedQueryStructure);
    }

    for (key, value) in ops.fields() {
        let cmp = match *key {
            b"$regex" | b"$options" => continue,
            b"$eq" => Some(CmpOp::Eq),
            b"$ne" => Some(CmpOp::Ne),
            b"$gt" => Some(CmpOp::Gt),
            b"$gte" => Some(CmpOp::Gte),
            b"$lt" => Some(CmpOp::Lt),
            b"$lte" => Some(CmpOp::Lte),
            _ => None,
        };
        if let Some(op) = cmp {
            filters.push(Filter::Compare {
                path: path.clone(),
                op,
                literal: literal(value, key)?,
            });
            continue;
        }
        match *key {
            b"$in" => filters.push(in_set(path.clone(), value, key, false)?),
            b"$nin" => filters.push(in_set(path.clone(), value, key, true)?),
            b"$exists" => {
                let JsonValue::Bool(should_exist) = value else {
                    return Err(QueryError::UnsupportedValueType(key_name(key)));
                };
                filters.push(Filter::Exists {
                    path: path.clone(),
                    should_exist: *should_exist,
                });
            }
            b"$size" => {
                let len = value
                    .as_f64()
                    .filter(|n| *n >= 0.0 && n.fract() == 0.0)
                    .ok_or_else(|| QueryError::UnsupportedValueType(key_name(key)))?;
                filters.push(Filter::Size {
                    path: path.clone(),
                    len: len as usize,
                });
            }
            b"$type" => {
                let JsonValue::String(name) = value else {
                    return Err(QueryError::UnsupportedValueType(key_name(key)));
                };
                filters.push(Filter::Type {
                    path: path.clone(),
                    type_name: type_name(name)
                        .ok_or_else(|| QueryError::UnsupportedValueType(key_name(key)))?,
                });
            }
            b"$not" => {
                // Field-level negation: {"field":{"$not":{"$gt":5}}}
                let JsonValue::Object(inner) = value else {
                    return Err(QueryError::ExpectedObject("$not".into()));
                };
                filters.push(Filter::Logical {
                    op: LogicalOp::Not,
                    operands: vec![operator_filter(path.clone(), inner)?],
                });
            }
            k if k.starts_with(b"$") => {
                return Err(QueryError::UnsupportedOperator(key_name(key)));
            }
            _ => return Err(QueryError::InvalidOperator(key_name(key))),
        }
    }

    if filters.len() == 1 {
        Ok(filters.swap_remove(0))
    } else {
        Ok(Filter::Logical {
            op: LogicalOp::And,
            operands: filters,
        })
    }
}

/// `$in` / `$nin`: an array of scalar literals.
fn in_set(
    path: FieldPath,
    value: &JsonValue,
    key: &[u8],
    negate: bool,
) -> Result<Filter, QueryError> {
    let JsonValue::Array(elems) = value else {
        return Err(QueryError::ExpectedArray(key_name(key)));
    };
    let mut literals = Vec::with_capacity(elems.len());
    for elem in elems {
        literals.push(literal(elem, key)?);
    }
    Ok(Filter::InSet {
        path,
        negate,
        literals,
    })
}

/// Compile `$regex` (+ optional `$options`) once, up front.
fn regex_filter(
    path: FieldPath,
    pattern: &JsonValue,
    options: Option<&JsonValue>,
) -> Result<Filter, QueryError> {
    let JsonValue::String(pat) = pattern else {
        return Err(QueryError::UnsupportedValueType("$regex".into()));
    };
    let pattern = std::str::from_utf8(pat)
        .map_err(|_| QueryError::UnsupportedValueType("$regex".into()))?;

    let case_insensitive = match options {
        None => false,
        Some(JsonValue::String(opts)) => opts.contains(&b'i'),
        Some(_) => return Err(QueryError::UnsupportedValueType("$options".into())),
    };

    let mut src = String::with_capacity(pattern.len() + 4);
    if case_insensitive {
        src.push_str("(?i)");
    }
    src.push_str(pattern);
    let regex = regex::bytes::Regex::new(&src)?;

    Ok(Filter::Regex {
        path,
        regex,
        pattern: pattern.to_string(),
        case_insensitive,
    })
}

/// Convert a scalar query value into an owned literal. `key` names the
/// operator or field for diagnostics.
fn literal(value: &JsonValue, key: &[u8]) -> Result<Literal, QueryError> {
    match value {
        JsonValue::Null => Ok(Literal::Null),
        JsonValue::Bool(b) => Ok(Literal::Bool(*b)),
        JsonValue::Number(_) => value
            .as_f64()
            .map(Literal::Number)
            .ok_or_else(|| QueryError::UnsupportedValueType(key_name(key))),
        JsonValue::String(s) => Ok(Literal::String(s.to_vec())),
        JsonValue::Array(_) | JsonValue::Object(_) => {
            Err(QueryError::UnsupportedValueType(key_name(key)))
        }
    }
}

fn type_name(name: &[u8]) -> Option<&'static str> {
    match name {
        b"string" => Some("string"),
        b"number" => Some("number"),
        b"bool" => Some("bool"),
        b"null" => Some("null"),
        b"array" => Some("array"),
        b"object" => Some("object"),
        _ => None,
    }
}

fn key_name(key: &[u8]) -> String {
    String::from_utf8_lossy(key).into_owned()
}
