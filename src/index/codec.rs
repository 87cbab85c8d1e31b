//! Order-preserving text scores for prefix and suffix indexes
//!
//! The first `SCORE_BYTES` bytes of the UTF-8 text are folded into a base-258
//! number, one digit per byte with value `byte + 1`. Shorter strings are
//! left-aligned, so "a" < "a\0" < "ab". Every string starting with `p`
//! scores inside `[score(p), score_next(p)]`.
//!
//! The conversion to f64 rounds, so a range scan is a superset of the true
//! matches; callers must verify candidates against the stored text.

/// Number of leading bytes that contribute to a score
pub const SCORE_BYTES: usize = 7;

const BASE: u64 = 258;

/// Text to score mapping used by the `:pre` and `:suf` sorted sets
#[derive(Debug, Clone, Copy, Default)]
pub struct PrefixCodec;

impl PrefixCodec {
    /// Lower bound score of `text`
    pub fn score(text: &str) -> f64 {
        fold(text.as_bytes(), false) as f64
    }

    /// Upper bound score for strings starting with `text`
    pub fn score_next(text: &str) -> f64 {
        fold(text.as_bytes(), true) as f64
    }

    /// Reverses `text` by characters for suffix indexing
    pub fn reverse(text: &str) -> String {
        text.chars().rev().collect()
    }
}

fn fold(bytes: &[u8], next: bool) -> u64 {
    let mut score: u64 = 0;
    for byte in bytes.iter().take(SCORE_BYTES) {
        score = score * BASE + u64::from(*byte) + 1;
    }
    if next {
        score += 1;
    }
    let pad = SCORE_BYTES.saturating_sub(bytes.len()) as u32;
    score * BASE.pow(pad)
}
