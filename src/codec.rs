// Base64 helpers.
//
// Encoding and strict decoding go through the `base64` crate. The lenient
// decoder is table-driven and never fails: any byte outside the alphabet
// decodes as 0, so malformed input yields defined but wrong bytes. Callers
// that need validation should use `decode_strict`.

use crate::error::Result;
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Encode bytes with the standard alphabet, padded with `=`.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode standard base64, rejecting anything that is not well formed.
pub fn decode_strict(text: &str) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(text)?)
}

// Maps each input byte to its 6-bit value. `-` and `_` are accepted as the
// URL-safe spellings of 62 and 63; `,` and `.` map there as well.
const DECODE_TABLE: [u8; 256] = build_decode_table();

const fn build_decode_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 26 {
        table[b'A' as usize + i] = i as u8;
        table[b'a' as usize + i] = 26 + i as u8;
        i += 1;
    }
    let mut d = 0;
    while d < 10 {
        table[b'0' as usize + d] = 52 + d as u8;
        d += 1;
    }
    table[b'+' as usize] = 62;
    table[b',' as usize] = 63;
    table[b'-' as usize] = 62;
    table[b'.' as usize] = 62;
    table[b'/' as usize] = 63;
    table[b'_' as usize] = 63;
    table
}

/// Best-effort decode. Never fails.
///
/// Full quads produce three bytes each. A trailing partial quad (or one
/// ending in `=`) produces one byte, or two when its third character is
/// present and not `=`. Characters outside the alphabet count as 0.
pub fn decode_lenient(text: &str) -> Vec<u8> {
    let input = text.as_bytes();
    let len = input.len();
    if len == 0 {
        return Vec::new();
    }

    let sextet = |i: usize| -> u32 { input.get(i).map_or(0, |&b| DECODE_TABLE[b as usize] as u32) };

    let pad = len % 4 != 0 || input[len - 1] == b'=';
    let full = ((len + 3) / 4 - usize::from(pad)) * 4;

    let mut out = Vec::with_capacity(full / 4 * 3 + 2);
    for i in (0..full).step_by(4) {
        let n = sextet(i) << 18 | sextet(i + 1) << 12 | sextet(i + 2) << 6 | sextet(i + 3);
        out.push((n >> 16) as u8);
        out.push((n >> 8 & 0xFF) as u8);
        out.push((n & 0xFF) as u8);
    }

    if pad {
        let mut n = sextet(full) << 18 | sextet(full + 1) << 12;
        out.push((n >> 16) as u8);

        if len > full + 2 && input[full + 2] != b'=' {
            n |= sextet(full + 2) << 6;
            out.push((n >> 8 & 0xFF) as u8);
        }
    }

    out
}
