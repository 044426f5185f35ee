//! Rendering signatures into their textual encodings.
//!
//! All encodings are pure functions of the signature: no state, no I/O, and
//! formatting the same signature twice yields identical output.

use crate::model::{Signature, SignatureFormat};

/// Render `signature` in the requested encoding.
pub fn format_signature(signature: &Signature, format: SignatureFormat) -> String {
    match format {
        SignatureFormat::Ida => hex_string(signature, false),
        SignatureFormat::X64Dbg => hex_string(signature, true),
        SignatureFormat::PatternMask => pattern_mask(signature),
        SignatureFormat::ByteArrayBitmask => byte_array_bitmask(signature),
    }
}

/// Space-separated hex pairs; wildcards as `?` (or `??` for debugger-style
/// two-column output).
fn hex_string(signature: &Signature, double_wildcard: bool) -> String {
    let mut out = String::with_capacity(signature.len() * 3);
    for byte in signature.bytes() {
        if !out.is_empty() {
            out.push(' ');
        }
        if byte.wildcard {
            out.push_str(if double_wildcard { "??" } else { "?" });
        } else {
            out.push_str(&format!("{:02X}", byte.value));
        }
    }
    out
}

/// Escaped byte pattern plus a parallel mask: wildcards render as `\x00` in
/// the pattern and `?` in the mask, fixed bytes as `\xHH` and `x`.
fn pattern_mask(signature: &Signature) -> String {
    if signature.is_empty() {
        return String::new();
    }
    let mut pattern = String::with_capacity(signature.len() * 4);
    let mut mask = String::with_capacity(signature.len());
    for byte in signature.bytes() {
        let value = if byte.wildcard { 0 } else { byte.value };
        pattern.push_str(&format!("\\x{value:02X}"));
        mask.push(if byte.wildcard { '?' } else { 'x' });
    }
    format!("{pattern} {mask}")
}

/// Comma-separated `0xHH` list plus a binary bitmask literal.
///
/// The mask is written reversed relative to byte order: bit i, counting from
/// the end of the written literal, covers byte i. External tools consume
/// this convention as-is, so it must not change.
fn byte_array_bitmask(signature: &Signature) -> String {
    if signature.is_empty() {
        return String::new();
    }
    let pattern = signature
        .bytes()
        .iter()
        .map(|byte| format!("0x{:02X}", if byte.wildcard { 0 } else { byte.value }))
        .collect::<Vec<_>>()
        .join(", ");
    let mask: String =
        signature.bytes().iter().rev().map(|byte| if byte.wildcard { '0' } else { '1' }).collect();
    format!("{pattern} 0b{mask}")
}
