//! Repeated-decode and Unicode canonicalization.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Maximum percent-decode passes before giving up.
///
/// Bounds the cost against pathological multi-layer encodings; legitimate
/// clients never nest more than one or two layers.
pub const MAX_DECODE_PASSES: usize = 5;

/// Normalize an attacker-controlled string for pattern matching.
///
/// Each pass applies, in order:
/// 1. one percent-decoding pass
/// 2. removal of embedded NUL bytes
/// 3. Unicode canonical decomposition (NFD)
/// 4. removal of combining marks (defeats homoglyph/diacritic smuggling)
/// 5. lowercasing
///
/// Passes repeat until the string stops changing, up to
/// [`MAX_DECODE_PASSES`]; escapes still decodable after the budget are
/// dropped, since nesting that deep is never legitimate. The result is
/// idempotent: normalizing an already-normalized string returns it
/// unchanged.
#[must_use]
pub fn normalize(raw: &str) -> String {
    let mut current = normalize_pass(raw);
    for _ in 1..MAX_DECODE_PASSES {
        let next = normalize_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
    // Still changing after the budget means layered encoding residue;
    // stripping the remaining escape characters makes the output stable
    // under re-normalization.
    normalize_pass(&current.replace('%', ""))
}

fn normalize_pass(s: &str) -> String {
    let mut decoded = percent_decode_once(s);
    decoded.retain(|c| c != '\0');
    decoded
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// One percent-decoding pass over the raw bytes.
///
/// Invalid escapes are passed through untouched; the decoded byte sequence
/// is re-interpreted as UTF-8 with replacement, so a single pass can never
/// grow the input.
fn percent_decode_once(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("");
            if let Ok(byte) = u8::from_str_radix(hex, 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}
