//! Core data model for signatures.
//!
//! A signature is an ordered run of byte positions, each either a fixed byte
//! that must match exactly or a wildcard that matches anything. Insertion
//! order is significant: entry `i` corresponds to byte offset `i` relative to
//! the anchor address the signature was grown from.

use serde::{Deserialize, Serialize};

/// One position in a signature: a fixed byte or a wildcard.
///
/// The original image byte is retained even for wildcards so formatters can
/// choose whether to show it or a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureByte {
    pub value: u8,
    pub wildcard: bool,
}

/// Ordered fixed/wildcard byte pattern identifying a location in a binary.
///
/// Successful synthesis results are non-empty and never end in a wildcard;
/// trailing wildcards match everything and carry no discriminating
/// information, so [`Signature::trim`] strips them before a signature is
/// handed out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    bytes: Vec<SignatureByte>,
}

impl Signature {
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Build an all-fixed signature from raw bytes (no wildcards).
    pub fn from_bytes(raw: &[u8]) -> Self {
        Self { bytes: raw.iter().map(|&value| SignatureByte { value, wildcard: false }).collect() }
    }

    pub fn push(&mut self, value: u8, wildcard: bool) {
        self.bytes.push(SignatureByte { value, wildcard });
    }

    pub fn bytes(&self) -> &[SignatureByte] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn wildcard_count(&self) -> usize {
        self.bytes.iter().filter(|b| b.wildcard).count()
    }

    /// Remove the trailing run of wildcards, and only that run.
    pub fn trim(&mut self) {
        while self.bytes.last().is_some_and(|b| b.wildcard) {
            self.bytes.pop();
        }
    }
}

/// Textual encodings a signature can be rendered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureFormat {
    /// Space-separated hex pairs, `?` for wildcards: `E8 ? ? ? ? 90`.
    Ida,
    /// Same, but wildcards render as `??` to keep two-column byte slots.
    X64Dbg,
    /// Escaped byte string plus a parallel `x`/`?` mask: `\xE8\x00 x?`.
    PatternMask,
    /// `0xHH` list plus a bitmask literal with reversed bit order.
    ByteArrayBitmask,
}

/// Signature generated for one reference site into a target address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XrefSignature {
    pub origin: u64,
    pub signature: Signature,
}
