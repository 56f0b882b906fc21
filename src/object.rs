//! Zero-copy JSON object parser.
//!
//! Parses a single top-level JSON object into a [`RawObject`] whose field
//! keys and scalar values are slices into the input buffer. No string
//! unescaping, no number conversion: strings are the bytes strictly between
//! the quote pair, numbers stay as their source text until an evaluator
//! asks for them via [`parse_number`].
//!
//! The parser drives a state machine over the structural token stream from
//! [`crate::scan`]. The scanner is context-free, so quote pairing happens
//! here: every token between an opening quote and its (non-escaped) closing
//! quote is consumed as string content, which keeps colons, commas, and
//! braces inside string literals from being treated as structure.
//!
//! Tuned for well-formed machine-generated records. A line that deviates
//! fails with a [`ParseError`] and the engine skips it.

use thiserror::Error;

use crate::scan::{Token, TokenKind, scan_structural};

/// Structural token capacity for a single record.
///
/// Exceeding it fails the record with [`ParseError::TokenOverflow`]; the
/// engine treats that like any other per-record parse error.
pub const OBJECT_TOKEN_CAP: usize = 4096;

/// Why a record failed to parse.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("not a JSON object")]
    InvalidJson,
    #[error("expected opening quote for object key")]
    ExpectedQuote,
    #[error("malformed object key")]
    MalformedKey,
    #[error("expected ':' after object key")]
    ExpectedColon,
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("malformed string value")]
    MalformedString,
    #[error("unexpected token")]
    UnexpectedToken,
    #[error("record exceeds the structural token capacity")]
    TokenOverflow,
}

/// A parsed JSON value. Scalar variants borrow from the input buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonValue<'a> {
    Null,
    Bool(bool),
    /// Unparsed numeric literal; converted on demand by [`parse_number`].
    Number(&'a [u8]),
    /// Bytes strictly between the quote pair. Escapes are not decoded.
    String(&'a [u8]),
    Array(Vec<JsonValue<'a>>),
    Object(RawObject<'a>),
}

impl<'a> JsonValue<'a> {
    /// Dynamic kind name as used by the `$type` operator.
    pub fn type_name(&self) -> &'static str {
        match self {
            JsonValue::Null => "null",
            JsonValue::Bool(_) => "bool",
            JsonValue::Number(_) => "number",
            JsonValue::String(_) => "string",
            JsonValue::Array(_) => "array",
            JsonValue::Object(_) => "object",
        }
    }

    /// Lazily parse a `Number` variant. Returns `None` for other variants
    /// or unparseable literals.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            JsonValue::Number(raw) => parse_number(raw),
            _ => None,
        }
    }
}

/// An ordered sequence of `(key, value)` pairs borrowed from one input
/// buffer. Lookup is linear: real records carry few enough fields that a
/// hash map costs more than it saves.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawObject<'a> {
    fields: Vec<(&'a [u8], JsonValue<'a>)>,
}

impl<'a> RawObject<'a> {
    /// First field with the given raw key, or `None`.
    pub fn get(&self, key: &[u8]) -> Option<&JsonValue<'a>> {
        self.fields.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Fields in input order.
    pub fn fields(&self) -> &[(&'a [u8], JsonValue<'a>)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Parse one JSON object starting at its `{`.
///
/// On success every key slice and every scalar value slice is a sub-slice
/// of `data`. On error nothing leaks: there is no partial object.
pub fn parse_object(data: &[u8]) -> Result<RawObject<'_>, ParseError> {
    let mut tokens = [Token::PLACEHOLDER; OBJECT_TOKEN_CAP];
    let n = scan_structural(data, &mut tokens);
    if n == OBJECT_TOKEN_CAP {
        // The buffer filled; the tail of the record was never scanned.
        return Err(ParseError::TokenOverflow);
    }
    let mut cur = Cursor {
        data,
        tokens: &tokens[..n],
        pos: 0,
    };
    let open = cur.next().ok_or(ParseError::InvalidJson)?;
    if open.kind != TokenKind::OpenBrace {
        return Err(ParseError::InvalidJson);
    }
    parse_object_body(&mut cur)
}

// ---------------------------------------------------------------------------
// Token cursor state machine
// ---------------------------------------------------------------------------

struct Cursor<'a, 't> {
    data: &'a [u8],
    tokens: &'t [Token],
    pos: usize,
}

impl<'a> Cursor<'a, '_> {
    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).copied();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    /// Consume tokens up to and including the closing quote of a string
    /// whose opening quote was already consumed. Skips quotes preceded by
    /// an odd run of backslashes (escaped), and swallows any structural
    /// bytes that happen to sit inside the string.
    fn closing_quote(&mut self) -> Option<Token> {
        while let Some(tok) = self.next() {
            if tok.kind == TokenKind::Quote && !is_escaped(self.data, tok.offset) {
                return Some(tok);
            }
        }
        None
    }
}

/// True when the byte at `offset` is preceded by an odd number of
/// backslashes.
fn is_escaped(data: &[u8], offset: usize) -> bool {
    let mut backslashes = 0;
    let mut i = offset;
    while i > 0 && data[i - 1] == b'\\' {
        backslashes += 1;
        i -= 1;
    }
    backslashes % 2 == 1
}

/// Parse object fields after the `{` has been consumed.
fn parse_object_body<'a>(cur: &mut Cursor<'a, '_>) -> Result<RawObject<'a>, ParseError> {
    let mut fields = Vec::new();

    if let Some(tok) = cur.peek()
        && tok.kind == TokenKind::CloseBrace
    {
        cur.next();
        return Ok(RawObject { fields });
    }

    loop {
        // Key: Quote … Quote
        let key_open = cur.next().ok_or(ParseError::UnexpectedEnd)?;
        if key_open.kind != TokenKind::Quote {
            return Err(ParseError::ExpectedQuote);
        }
        let key_close = cur.closing_quote().ok_or(ParseError::MalformedKey)?;
        let key = &cur.data[key_open.offset + 1..key_close.offset];

        let colon = cur.next().ok_or(ParseError::UnexpectedEnd)?;
        if colon.kind != TokenKind::Colon {
            return Err(ParseError::ExpectedColon);
        }

        let (value, sep) = parse_value(cur, colon.offset)?;
        fields.push((key, value));

        match sep.kind {
            TokenKind::Comma => continue,
            TokenKind::CloseBrace => return Ok(RawObject { fields }),
            _ => return Err(ParseError::UnexpectedToken),
        }
    }
}

/// Parse one field value. `after` is the offset of the token preceding the
/// value (the colon, or a comma/bracket in array context).
///
/// Returns the value and the separator token that follows it. For scalar
/// literals the separator is the token that delimited the literal.
fn parse_value<'a>(
    cur: &mut Cursor<'a, '_>,
    after: usize,
) -> Result<(JsonValue<'a>, Token), ParseError> {
    let tok = cur.next().ok_or(ParseError::UnexpectedEnd)?;
    match tok.kind {
        TokenKind::Quote => {
            let close = cur.closing_quote().ok_or(ParseError::MalformedString)?;
            let value = JsonValue::String(&cur.data[tok.offset + 1..close.offset]);
            let sep = cur.next().ok_or(ParseError::UnexpectedEnd)?;
            Ok((value, sep))
        }
        TokenKind::OpenBrace => {
            let obj = parse_object_body(cur)?;
            let sep = cur.next().ok_or(ParseError::UnexpectedEnd)?;
            Ok((JsonValue::Object(obj), sep))
        }
        TokenKind::OpenBracket => {
            let arr = parse_array_body(cur, tok.offset)?;
            let sep = cur.next().ok_or(ParseError::UnexpectedEnd)?;
            Ok((arr, sep))
        }
        TokenKind::Comma | TokenKind::CloseBrace | TokenKind::CloseBracket => {
            // No structural token started the value, so the bytes between
            // the preceding token and this one hold a literal.
            let raw = trim(&cur.data[after + 1..tok.offset]);
            if raw.is_empty() {
                return Err(ParseError::InvalidJson);
            }
            Ok((classify_literal(raw), tok))
        }
        TokenKind::Colon => Err(ParseError::UnexpectedToken),
    }
}

/// Parse array elements after the `[` has been consumed. `open` is the
/// offset of that `[`.
fn parse_array_body<'a>(
    cur: &mut Cursor<'a, '_>,
    open: usize,
) -> Result<JsonValue<'a>, ParseError> {
    let mut elems = Vec::new();
    // Offset of the last separator ('[' or ','), bounding the next literal.
    let mut last_sep = open;

    loop {
        let tok = cur.next().ok_or(ParseError::UnexpectedEnd)?;
        match tok.kind {
            TokenKind::CloseBracket => {
                let raw = trim(&cur.data[last_sep + 1..tok.offset]);
                if !raw.is_empty() {
                    elems.push(classify_literal(raw));
                }
                return Ok(JsonValue::Array(elems));
            }
            TokenKind::Comma => {
                let raw = trim(&cur.data[last_sep + 1..tok.offset]);
                if raw.is_empty() {
                    return Err(ParseError::UnexpectedToken);
                }
                elems.push(classify_literal(raw));
                last_sep = tok.offset;
            }
            TokenKind::Quote => {
                let close = cur.closing_quote().ok_or(ParseError::MalformedString)?;
                elems.push(JsonValue::String(&cur.data[tok.offset + 1..close.offset]));
                match array_separator(cur)? {
                    Some(comma) => last_sep = comma,
                    None => return Ok(JsonValue::Array(elems)),
                }
            }
            TokenKind::OpenBrace => {
                let obj = parse_object_body(cur)?;
                elems.push(JsonValue::Object(obj));
                match array_separator(cur)? {
                    Some(comma) => last_sep = comma,
                    None => return Ok(JsonValue::Array(elems)),
                }
            }
            TokenKind::OpenBracket => {
                // Deeper nesting than the query language addresses: keep the
                // raw span as an unparsed literal so output round-trips.
                let close = skip_balanced(cur, TokenKind::OpenBracket, TokenKind::CloseBracket)?;
                elems.push(JsonValue::Number(&cur.data[tok.offset..=close]));
                match array_separator(cur)? {
                    Some(comma) => last_sep = comma,
                    None => return Ok(JsonValue::Array(elems)),
                }
            }
            TokenKind::Colon | TokenKind::CloseBrace => return Err(ParseError::UnexpectedToken),
        }
    }
}

/// After a structural array element, consume the separator. Returns the
/// comma offset bounding the next literal, or `None` when the array closed.
fn array_separator(cur: &mut Cursor<'_, '_>) -> Result<Option<usize>, ParseError> {
    let sep = cur.next().ok_or(ParseError::UnexpectedEnd)?;
    match sep.kind {
        TokenKind::Comma => Ok(Some(sep.offset)),
        TokenKind::CloseBracket => Ok(None),
        _ => Err(ParseError::UnexpectedToken),
    }
}

/// Consume tokens until the bracket that opened before this call is
/// balanced. Returns the closing token's offset. Quote pairs are skipped so
/// brackets inside strings don't count.
fn skip_balanced(
    cur: &mut Cursor<'_, '_>,
    open: TokenKind,
    close: TokenKind,
) -> Result<usize, ParseError> {
    let mut depth = 1usize;
    while let Some(tok) = cur.next() {
        if tok.kind == TokenKind::Quote {
            if !is_escaped(cur.data, tok.offset) {
                cur.closing_quote().ok_or(ParseError::MalformedString)?;
            }
            continue;
        }
        if tok.kind == open {
            depth += 1;
        } else if tok.kind == close {
            depth -= 1;
            if depth == 0 {
                return Ok(tok.offset);
            }
        }
    }
    Err(ParseError::UnexpectedEnd)
}

// ---------------------------------------------------------------------------
// Literals
// ---------------------------------------------------------------------------

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

/// Textual classification of a structural-free literal: the keywords, or
/// else a number. `raw` must be trimmed and non-empty.
fn classify_literal(raw: &[u8]) -> JsonValue<'_> {
    match raw {
        b"null" => JsonValue::Null,
        b"true" => JsonValue::Bool(true),
        b"false" => JsonValue::Bool(false),
        _ => JsonValue::Number(raw),
    }
}

/// Parse a numeric literal to `f64`.
///
/// Integers take an explicit base-10 walk (fast path, exact up to 18
/// digits); everything else goes through the standard decimal-to-binary
/// conversion. Returns `None` for text that is not a number.
pub fn parse_number(raw: &[u8]) -> Option<f64> {
    if raw.is_empty() {
        return None;
    }
    let (neg, digits) = match raw[0] {
        b'-' => (true, &raw[1..]),
        _ => (false, raw),
    };
    if !digits.is_empty() && digits.len() <= 18 && digits.iter().all(u8::is_ascii_digit) {
        let mut n: i64 = 0;
        for &b in digits {
            n = n * 10 + i64::from(b - b'0');
        }
        return Some(if neg { -n as f64 } else { n as f64 });
    }
    std::str::from_utf8(raw).ok()?.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data: &[u8]) -> RawObject<'_> {
        parse_object(data).expect("parse failed")
    }

    // --- Basic shapes ---

    #[test]
    fn empty_object() {
        let obj = parse(b"{}");
        assert!(obj.is_empty());
    }

    #[test]
    fn single_string_field() {
        let obj = parse(br#"{"name":"alice"}"#);
        assert_eq!(obj.len(), 1);
        assert_eq!(obj.get(b"name"), Some(&JsonValue::String(b"alice")));
    }

    #[test]
    fn single_number_field() {
        let obj = parse(br#"{"age":30}"#);
        assert_eq!(obj.get(b"age"), Some(&JsonValue::Number(b"30")));
    }

    #[test]
    fn keyword_literals() {
        let obj = parse(br#"{"a":null,"b":true,"c":false}"#);
        assert_eq!(obj.get(b"a"), Some(&JsonValue::Null));
        assert_eq!(obj.get(b"b"), Some(&JsonValue::Bool(true)));
        assert_eq!(obj.get(b"c"), Some(&JsonValue::Bool(false)));
    }

    #[test]
    fn multiple_fields_preserve_order() {
        let obj = parse(br#"{"z":1,"a":2,"m":3}"#);
        let keys: Vec<&[u8]> = obj.fields().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![b"z".as_slice(), b"a".as_slice(), b"m".as_slice()]);
    }

    #[test]
    fn whitespace_tolerated() {
        let obj = parse(b"{ \"a\" : 1 , \"b\" : \"x\" }");
        assert_eq!(obj.get(b"a"), Some(&JsonValue::Number(b"1")));
        assert_eq!(obj.get(b"b"), Some(&JsonValue::String(b"x")));
    }

    #[test]
    fn negative_and_float_numbers() {
        let obj = parse(br#"{"a":-5,"b":3.25,"c":1e3}"#);
        assert_eq!(obj.get(b"a").unwrap().as_f64(), Some(-5.0));
        assert_eq!(obj.get(b"b").unwrap().as_f64(), Some(3.25));
        assert_eq!(obj.get(b"c").unwrap().as_f64(), Some(1000.0));
    }

    // --- Strings with embedded structure ---

    #[test]
    fn string_containing_structural_bytes() {
        let obj = parse(br#"{"msg":"a,b:c{d}[e]"}"#);
        assert_eq!(obj.get(b"msg"), Some(&JsonValue::String(b"a,b:c{d}[e]")));
    }

    #[test]
    fn string_with_escaped_quote() {
        // Escapes are not decoded: the slice keeps the five raw bytes.
        let obj = parse(br#"{"a":"x\"y"}"#);
        assert_eq!(obj.get(b"a"), Some(&JsonValue::String(br#"x\"y"#)));
    }

    #[test]
    fn string_ending_in_escaped_backslash() {
        // \\ then ": the quote closes the string.
        let obj = parse(br#"{"a":"x\\"}"#);
        assert_eq!(obj.get(b"a"), Some(&JsonValue::String(br#"x\\"#)));
    }

    #[test]
    fn key_with_escaped_quote() {
        let obj = parse(br#"{"k\"ey":1}"#);
        assert_eq!(obj.get(br#"k\"ey"#), Some(&JsonValue::Number(b"1")));
    }

    // --- Nesting ---

    #[test]
    fn nested_object() {
        let obj = parse(br#"{"u":{"age":40,"name":"bo"}}"#);
        let JsonValue::Object(inner) = obj.get(b"u").unwrap() else {
            panic!("expected object");
        };
        assert_eq!(inner.get(b"age"), Some(&JsonValue::Number(b"40")));
        assert_eq!(inner.get(b"name"), Some(&JsonValue::String(b"bo")));
    }

    #[test]
    fn deeply_nested_object() {
        let obj = parse(br#"{"a":{"b":{"c":"deep"}}}"#);
        let JsonValue::Object(a) = obj.get(b"a").unwrap() else {
            panic!()
        };
        let JsonValue::Object(b) = a.get(b"b").unwrap() else {
            panic!()
        };
        assert_eq!(b.get(b"c"), Some(&JsonValue::String(b"deep")));
    }

    #[test]
    fn nested_object_with_string_braces() {
        let obj = parse(br#"{"a":{"s":"}{"},"b":1}"#);
        let JsonValue::Object(a) = obj.get(b"a").unwrap() else {
            panic!()
        };
        assert_eq!(a.get(b"s"), Some(&JsonValue::String(b"}{")));
        assert_eq!(obj.get(b"b"), Some(&JsonValue::Number(b"1")));
    }

    #[test]
    fn empty_nested_object() {
        let obj = parse(br#"{"a":{},"b":2}"#);
        assert_eq!(obj.get(b"a"), Some(&JsonValue::Object(RawObject::default())));
        assert_eq!(obj.get(b"b"), Some(&JsonValue::Number(b"2")));
    }

    // --- Arrays ---

    #[test]
    fn empty_array() {
        let obj = parse(br#"{"tags":[]}"#);
        assert_eq!(obj.get(b"tags"), Some(&JsonValue::Array(vec![])));
    }

    #[test]
    fn number_array() {
        let obj = parse(br#"{"xs":[1,2,3]}"#);
        assert_eq!(
            obj.get(b"xs"),
            Some(&JsonValue::Array(vec![
                JsonValue::Number(b"1"),
                JsonValue::Number(b"2"),
                JsonValue::Number(b"3"),
            ]))
        );
    }

    #[test]
    fn string_array() {
        let obj = parse(br#"{"tags":["go","rust"]}"#);
        assert_eq!(
            obj.get(b"tags"),
            Some(&JsonValue::Array(vec![
                JsonValue::String(b"go"),
                JsonValue::String(b"rust"),
            ]))
        );
    }

    #[test]
    fn mixed_array() {
        let obj = parse(br#"{"xs":[1,"two",null,true]}"#);
        assert_eq!(
            obj.get(b"xs"),
            Some(&JsonValue::Array(vec![
                JsonValue::Number(b"1"),
                JsonValue::String(b"two"),
                JsonValue::Null,
                JsonValue::Bool(true),
            ]))
        );
    }

    #[test]
    fn array_of_objects() {
        let obj = parse(br#"{"xs":[{"a":1},{"a":2}]}"#);
        let JsonValue::Array(elems) = obj.get(b"xs").unwrap() else {
            panic!()
        };
        assert_eq!(elems.len(), 2);
        let JsonValue::Object(first) = &elems[0] else {
            panic!()
        };
        assert_eq!(first.get(b"a"), Some(&JsonValue::Number(b"1")));
    }

    #[test]
    fn array_string_with_comma() {
        let obj = parse(br#"{"xs":["a,b","c"]}"#);
        assert_eq!(
            obj.get(b"xs"),
            Some(&JsonValue::Array(vec![
                JsonValue::String(b"a,b"),
                JsonValue::String(b"c"),
            ]))
        );
    }

    #[test]
    fn array_with_whitespace() {
        let obj = parse(b"{\"xs\":[ 1 , 2 ]}");
        assert_eq!(
            obj.get(b"xs"),
            Some(&JsonValue::Array(vec![
                JsonValue::Number(b"1"),
                JsonValue::Number(b"2"),
            ]))
        );
    }

    #[test]
    fn nested_array_kept_as_raw_span() {
        let obj = parse(br#"{"m":[[1,2],3]}"#);
        let JsonValue::Array(elems) = obj.get(b"m").unwrap() else {
            panic!()
        };
        assert_eq!(elems[0], JsonValue::Number(b"[1,2]"));
        assert_eq!(elems[1], JsonValue::Number(b"3"));
    }

    #[test]
    fn field_after_array() {
        let obj = parse(br#"{"xs":[1],"y":2}"#);
        assert_eq!(obj.get(b"y"), Some(&JsonValue::Number(b"2")));
    }

    // --- Lookup ---

    #[test]
    fn get_returns_first_match() {
        let obj = parse(br#"{"a":1,"a":2}"#);
        assert_eq!(obj.get(b"a"), Some(&JsonValue::Number(b"1")));
    }

    #[test]
    fn get_missing_key() {
        let obj = parse(br#"{"a":1}"#);
        assert_eq!(obj.get(b"b"), None);
    }

    // --- Zero-copy invariant ---

    #[test]
    fn slices_point_into_input() {
        let data: &[u8] = br#"{"name":"alice","age":30}"#;
        let obj = parse(data);
        let range = data.as_ptr_range();

        let (key, _) = obj.fields()[0];
        assert!(range.contains(&key.as_ptr()));

        let JsonValue::String(name) = obj.get(b"name").unwrap() else {
            panic!()
        };
        assert!(range.contains(&name.as_ptr()));

        let JsonValue::Number(age) = obj.get(b"age").unwrap() else {
            panic!()
        };
        assert!(range.contains(&age.as_ptr()));
    }

    #[test]
    fn nested_leaves_point_into_input() {
        let data: &[u8] = br#"{"u":{"city":"NYC"},"xs":["a"]}"#;
        let obj = parse(data);
        let range = data.as_ptr_range();

        let JsonValue::Object(u) = obj.get(b"u").unwrap() else {
            panic!()
        };
        let JsonValue::String(city) = u.get(b"city").unwrap() else {
            panic!()
        };
        assert!(range.contains(&city.as_ptr()));

        let JsonValue::Array(xs) = obj.get(b"xs").unwrap() else {
            panic!()
        };
        let JsonValue::String(a) = &xs[0] else { panic!() };
        assert!(range.contains(&a.as_ptr()));
    }

    // --- Errors ---

    #[test]
    fn not_an_object() {
        assert_eq!(parse_object(b"[1,2]").unwrap_err(), ParseError::InvalidJson);
        assert_eq!(parse_object(b"42").unwrap_err(), ParseError::InvalidJson);
        assert_eq!(parse_object(b"").unwrap_err(), ParseError::InvalidJson);
    }

    #[test]
    fn missing_colon() {
        assert_eq!(
            parse_object(br#"{"a" 1}"#).unwrap_err(),
            ParseError::ExpectedColon
        );
    }

    #[test]
    fn key_not_quoted() {
        assert_eq!(
            parse_object(b"{a:1}").unwrap_err(),
            ParseError::ExpectedQuote
        );
    }

    #[test]
    fn unterminated_object() {
        assert_eq!(
            parse_object(br#"{"a":1"#).unwrap_err(),
            ParseError::UnexpectedEnd
        );
    }

    #[test]
    fn unterminated_string() {
        assert_eq!(
            parse_object(br#"{"a":"x"#).unwrap_err(),
            ParseError::MalformedString
        );
    }

    #[test]
    fn unterminated_key() {
        assert_eq!(
            parse_object(br#"{"a"#).unwrap_err(),
            ParseError::MalformedKey
        );
    }

    #[test]
    fn empty_literal_value() {
        assert_eq!(
            parse_object(br#"{"a":,"b":1}"#).unwrap_err(),
            ParseError::InvalidJson
        );
    }

    #[test]
    fn unterminated_array() {
        assert_eq!(
            parse_object(br#"{"a":[1,2"#).unwrap_err(),
            ParseError::UnexpectedEnd
        );
    }

    #[test]
    fn token_overflow() {
        // More structural bytes than the capacity allows.
        let mut data = Vec::from(&b"{\"xs\":["[..]);
        for i in 0..OBJECT_TOKEN_CAP {
            if i > 0 {
                data.push(b',');
            }
            data.push(b'1');
        }
        data.extend_from_slice(b"]}");
        assert_eq!(parse_object(&data).unwrap_err(), ParseError::TokenOverflow);
    }

    // --- Number parsing ---

    #[test]
    fn parse_number_integers() {
        assert_eq!(parse_number(b"0"), Some(0.0));
        assert_eq!(parse_number(b"42"), Some(42.0));
        assert_eq!(parse_number(b"-7"), Some(-7.0));
        assert_eq!(parse_number(b"123456789012345678"), Some(1.23456789012345678e17));
    }

    #[test]
    fn parse_number_floats() {
        assert_eq!(parse_number(b"3.5"), Some(3.5));
        assert_eq!(parse_number(b"-0.25"), Some(-0.25));
        assert_eq!(parse_number(b"1e3"), Some(1000.0));
        assert_eq!(parse_number(b"2.5E-2"), Some(0.025));
    }

    #[test]
    fn parse_number_rejects_garbage() {
        assert_eq!(parse_number(b""), None);
        assert_eq!(parse_number(b"abc"), None);
        assert_eq!(parse_number(b"1.2.3"), None);
        assert_eq!(parse_number(b"-"), None);
    }

    #[test]
    fn type_names() {
        assert_eq!(JsonValue::Null.type_name(), "null");
        assert_eq!(JsonValue::Bool(true).type_name(), "bool");
        assert_eq!(JsonValue::Number(b"1").type_name(), "number");
        assert_eq!(JsonValue::String(b"x").type_name(), "string");
        assert_eq!(JsonValue::Array(vec![]).type_name(), "array");
        assert_eq!(JsonValue::Object(RawObject::default()).type_name(), "object");
    }
}
