//! Vectorized structural-byte scanner.
//!
//! Locates the seven JSON structural bytes (`{ } [ ] " : ,`) in a byte range
//! and writes them into a caller-provided token buffer. The scan runs in
//! fixed 32-byte lanes: each lane is read as four 8-byte SWAR words, every
//! word is tested against all seven bytes at once, and the per-word hit
//! masks are OR-reduced into a single any-match predicate. Lanes with no
//! structural byte are skipped wholesale; the final partial lane falls back
//! to a scalar loop.
//!
//! The scanner is context-free: it does not know whether a byte sits inside
//! a string literal. The object parser compensates by pairing `Quote`
//! tokens before treating intermediate colons and commas as structural.

/// Kind of a structural byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    Quote,
    Colon,
    Comma,
}

/// A structural byte and its position in the scanned buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

impl Token {
    /// Filler value for initializing fixed-size token buffers.
    pub const PLACEHOLDER: Token = Token {
        kind: TokenKind::Comma,
        offset: 0,
    };
}

/// Lane width for the vectorized scan.
const LANE: usize = 32;

const SWAR_LO: u64 = 0x0101_0101_0101_0101;
const SWAR_HI: u64 = 0x8080_8080_8080_8080;

/// Per-byte equality mask: the high bit of every byte of `word` equal to
/// `needle` is set in the result.
#[inline]
fn byte_eq_mask(word: u64, needle: u8) -> u64 {
    let x = word ^ (SWAR_LO * needle as u64);
    x.wrapping_sub(SWAR_LO) & !x & SWAR_HI
}

/// OR-reduced match mask for all seven structural bytes.
#[inline]
fn structural_mask(word: u64) -> u64 {
    byte_eq_mask(word, b'{')
        | byte_eq_mask(word, b'}')
        | byte_eq_mask(word, b'[')
        | byte_eq_mask(word, b']')
        | byte_eq_mask(word, b'"')
        | byte_eq_mask(word, b':')
        | byte_eq_mask(word, b',')
}

#[inline]
fn classify(b: u8) -> Option<TokenKind> {
    match b {
        b'{' => Some(TokenKind::OpenBrace),
        b'}' => Some(TokenKind::CloseBrace),
        b'[' => Some(TokenKind::OpenBracket),
        b']' => Some(TokenKind::CloseBracket),
        b'"' => Some(TokenKind::Quote),
        b':' => Some(TokenKind::Colon),
        b',' => Some(TokenKind::Comma),
        _ => None,
    }
}

/// Scan `data` for structural bytes, writing tokens into `out` in ascending
/// offset order. Returns the number of tokens written, at most `out.len()`.
///
/// When the buffer fills, the remaining input is simply not scanned; callers
/// either size the buffer for one record or treat truncation as an error.
pub fn scan_structural(data: &[u8], out: &mut [Token]) -> usize {
    let cap = out.len();
    let mut n = 0;
    let mut i = 0;

    while i + LANE <= data.len() {
        let lane = &data[i..i + LANE];
        let mut any = 0u64;
        for word in lane.chunks_exact(8) {
            any |= structural_mask(u64::from_le_bytes(word.try_into().unwrap()));
        }
        if any != 0 {
            for (j, &b) in lane.iter().enumerate() {
                if let Some(kind) = classify(b) {
                    if n == cap {
                        return n;
                    }
                    out[n] = Token {
                        kind,
                        offset: i + j,
                    };
                    n += 1;
                }
            }
        }
        i += LANE;
    }

    // Scalar fallback for the final partial lane
    for (j, &b) in data[i..].iter().enumerate() {
        if let Some(kind) = classify(b) {
            if n == cap {
                return n;
            }
            out[n] = Token {
                kind,
                offset: i + j,
            };
            n += 1;
        }
    }

    n
}

/// Offset of the next `\n` at or after `start`, or `None`.
///
/// Shared by chunk partitioning and per-chunk record iteration.
#[inline]
pub fn find_next_newline(buf: &[u8], start: usize) -> Option<usize> {
    if start >= buf.len() {
        return None;
    }
    memchr::memchr(b'\n', &buf[start..]).map(|pos| start + pos)
}
