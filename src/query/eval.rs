//! Query evaluator: `(record, filter) → bool`.
//!
//! Pure and allocation-free on the hot path: field resolution walks
//! borrowed slices, equality compares byte slices in place, and regex
//! matching runs directly on the zero-copy field slice. Recursion depth is
//! bounded by the filter tree depth.

use std::cmp::Ordering;

use crate::object::{JsonValue, RawObject, parse_number};

use super::{CmpOp, FieldPath, Filter, Literal, LogicalOp};

/// Does `obj` satisfy `filter`?
pub fn matches(obj: &RawObject, filter: &Filter) -> bool {
    match filter {
        Filter::AlwaysTrue => true,
        Filter::Compare { path, op, literal } => match resolve_path(obj, path) {
            Some(value) => compare(value, *op, literal),
            None => false,
        },
        Filter::Logical { op, operands } => match op {
            LogicalOp::And => operands.iter().all(|f| matches(obj, f)),
            LogicalOp::Or => operands.iter().any(|f| matches(obj, f)),
            // $not carries one operand; $nor is false iff any operand matches.
            LogicalOp::Not | LogicalOp::Nor => !operands.iter().any(|f| matches(obj, f)),
        },
        Filter::InSet {
            path,
            negate,
            literals,
        } => {
            // Absent field: $in is false, $nin is true ("has none of these").
            let found = resolve_path(obj, path).is_some_and(|v| in_set(v, literals));
            found != *negate
        }
        Filter::Exists { path, should_exist } => resolve_path(obj, path).is_some() == *should_exist,
        Filter::Regex { path, regex, .. } => match resolve_path(obj, path) {
            Some(JsonValue::String(s)) => regex.is_match(s),
            _ => false,
        },
        Filter::Size { path, len } => {
            matches!(resolve_path(obj, path), Some(JsonValue::Array(a)) if a.len() == *len)
        }
        Filter::Type { path, type_name } => match resolve_path(obj, path) {
            Some(value) => value.type_name() == *type_name,
            // A missing field has type "null".
            None => *type_name == "null",
        },
    }
}

/// Walk a dotted path through nested objects. Arrays are not traversed.
///
/// Shared with the output serializers, which resolve `--select` projections
/// with the same rules the operators use.
pub fn resolve_path<'a, 'b>(obj: &'a RawObject<'b>, path: &FieldPath) -> Option<&'a JsonValue<'b>> {
    let (last, init) = path.segments().split_last()?;
    let mut cur = obj;
    for seg in init {
        match cur.get(seg) {
            Some(JsonValue::Object(inner)) => cur = inner,
            _ => return None,
        }
    }
    cur.get(last)
}

/// Variant-matched equality. `None` means the types do not line up (or a
/// number failed to parse), which callers treat as "no comparison".
fn eq_checked(value: &JsonValue, literal: &Literal) -> Option<bool> {
    match (value, literal) {
        (JsonValue::Null, Literal::Null) => Some(true),
        (JsonValue::Bool(a), Literal::Bool(b)) => Some(a == b),
        (JsonValue::Number(raw), Literal::Number(n)) => parse_number(raw).map(|x| x == *n),
        (JsonValue::String(s), Literal::String(l)) => Some(*s == &l[..]),
        _ => None,
    }
}

/// Ordering for `$gt`/`$gte`/`$lt`/`$lte`: numbers against numbers,
/// byte-lexicographic strings against strings, nothing else.
fn ord_checked(value: &JsonValue, literal: &Literal) -> Option<Ordering> {
    match (value, literal) {
        (JsonValue::Number(raw), Literal::Number(n)) => parse_number(raw)?.partial_cmp(n),
        (JsonValue::String(s), Literal::String(l)) => Some(s.cmp(&&l[..])),
        _ => None,
    }
}

fn compare(value: &JsonValue, op: CmpOp, literal: &Literal) -> bool {
    match op {
        CmpOp::Eq => eq_checked(value, literal) == Some(true),
        // Cross-type $ne is false, matching the source behavior.
        CmpOp::Ne => eq_checked(value, literal) == Some(false),
        CmpOp::Gt => ord_checked(value, literal) == Some(Ordering::Greater),
        CmpOp::Gte => matches!(
            ord_checked(value, literal),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        CmpOp::Lt => ord_checked(value, literal) == Some(Ordering::Less),
        CmpOp::Lte => matches!(
            ord_checked(value, literal),
            Some(Ordering::Less | Ordering::Equal)
        ),
    }
}

/// `$in` membership: the scalar field equals any literal, or any element of
/// an array field equals any literal.
fn in_set(value: &JsonValue, literals: &[Literal]) -> bool {
    if literals.iter().any(|l| eq_checked(value, l) == Some(true)) {
        return true;
    }
    if let JsonValue::Array(elems) = value {
        return elems
            .iter()
            .any(|e| literals.iter().any(|l| eq_checked(e, l) == Some(true)));
    }
    false
}
