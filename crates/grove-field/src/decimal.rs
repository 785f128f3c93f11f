//! Fixed-point decimal helpers shared by the decimal, timestamp, and
//! time-interval field types.
//!
//! Values are stored as a scaled integer: `12.34` at scale 2 is `1234`.
//! Narrowing a scale rounds half-away-from-zero, so `123.45` at scale 2
//! rendered at scale 1 gives `123.5` and `123.44` gives `123.4`.

use serde::{Deserialize, Serialize};

/// Number of fractional decimal digits a value is stored with.
pub type DecScale = u8;

/// Largest supported scale: `10^18` still fits an `i64` numerator headroom
/// when widened through `i128`.
pub const MAX_SCALE: DecScale = 18;

const POW10: [i128; MAX_SCALE as usize + 1] = [
    1,
    10,
    100,
    1_000,
    10_000,
    100_000,
    1_000_000,
    10_000_000,
    100_000_000,
    1_000_000_000,
    10_000_000_000,
    100_000_000_000,
    1_000_000_000_000,
    10_000_000_000_000,
    100_000_000_000_000,
    1_000_000_000_000_000,
    10_000_000_000_000_000,
    100_000_000_000_000_000,
    1_000_000_000_000_000_000,
];

/// Scale conversion failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum ScaleError {
    #[error("value overflow")]
    Overflow,
    #[error("value underflow")]
    Underflow,
    #[error("unsupported scale")]
    BadScale,
}

fn clamp_i128(v: i128) -> Result<i64, ScaleError> {
    if v > i64::MAX as i128 {
        Err(ScaleError::Overflow)
    } else if v < i64::MIN as i128 {
        Err(ScaleError::Underflow)
    } else {
        Ok(v as i64)
    }
}

/// Convert a scaled integer from one scale to another.
///
/// Widening multiplies exactly; narrowing divides with half-away-from-zero
/// rounding. Errors if the target scale cannot represent the value in `i64`.
pub fn scale_convert(value: i64, from: DecScale, to: DecScale) -> Result<i64, ScaleError> {
    if from > MAX_SCALE || to > MAX_SCALE {
        return Err(ScaleError::BadScale);
    }
    if from == to {
        return Ok(value);
    }
    let v = value as i128;
    if to > from {
        clamp_i128(v * POW10[(to - from) as usize])
    } else {
        let div = POW10[(from - to) as usize];
        let q = v / div;
        let r = v % div;
        let half = div / 2;
        let rounded = if r >= half {
            q + 1
        } else if r <= -half {
            q - 1
        } else {
            q
        };
        clamp_i128(rounded)
    }
}

/// Render a scaled integer as decimal text, e.g. `1234` at scale 2 ->
/// `"12.34"`. Scale 0 renders a plain integer.
pub fn render_scaled(value: i64, scale: DecScale) -> String {
    if scale == 0 {
        return value.to_string();
    }
    let div = POW10[scale.min(MAX_SCALE) as usize];
    let v = value as i128;
    let sign = if v < 0 { "-" } else { "" };
    let abs = v.unsigned_abs();
    let whole = abs / div.unsigned_abs();
    let frac = abs % div.unsigned_abs();
    format!("{sign}{whole}.{frac:0width$}", width = scale as usize)
}

/// Parse decimal text to a scaled integer at `scale`, rounding extra
/// fractional digits half-away-from-zero.
///
/// Returns `Err(Overflow/Underflow)` when the value does not fit; malformed
/// text is `Err(BadScale)`-free — the caller maps `None` to a value-format
/// outcome.
pub fn parse_scaled(text: &str, scale: DecScale) -> Option<Result<i64, ScaleError>> {
    let text = text.trim();
    let (neg, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if digits.is_empty() {
        return None;
    }
    let (whole, frac) = match digits.split_once('.') {
        Some((w, f)) => (w, f),
        None => (digits, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mut acc: i128 = 0;
    for b in whole.bytes() {
        acc = acc * 10 + (b - b'0') as i128;
        if acc > (i64::MAX as i128 + 1) * POW10[scale as usize] {
            // Far out of range already; keep the sign for the error code.
            return Some(Err(if neg { ScaleError::Underflow } else { ScaleError::Overflow }));
        }
    }
    // Fold in up to `scale` fractional digits, then round on the next one.
    let mut taken = 0usize;
    let mut frac_bytes = frac.bytes();
    for b in frac_bytes.by_ref() {
        if taken == scale as usize {
            if b >= b'5' {
                acc += 1;
            }
            break;
        }
        acc = acc * 10 + (b - b'0') as i128;
        taken += 1;
    }
    while taken < scale as usize {
        acc *= 10;
        taken += 1;
    }
    let signed = if neg { -acc } else { acc };
    Some(clamp_i128(signed))
}
