//! Shortest-signature aggregation across the reference sites of a target.
//!
//! Every call/jump/data reference into a target address is an alternative
//! anchor for a signature; the shortest unique one is usually the most
//! robust against binary changes.

use crate::format::format_signature;
use crate::image::ImageBackend;
use crate::model::{SignatureFormat, XrefSignature};
use crate::services::synthesis::{self, SynthesisOptions, SynthesisOutcome};

/// Xref signatures sorted ascending by length (stable on ties, so
/// equal-length entries keep their source order).
#[derive(Debug, Clone, Default)]
pub struct XrefSignatures {
    entries: Vec<XrefSignature>,
}

impl XrefSignatures {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[XrefSignature] {
        &self.entries
    }

    /// The shortest `n` entries (fewer if not enough exist).
    pub fn top(&self, n: usize) -> &[XrefSignature] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn into_entries(self) -> Vec<XrefSignature> {
        self.entries
    }
}

/// Generate a signature for every code-located reference site into `target`.
///
/// Synthesis runs non-interactively: exceeding the growth guard is a hard
/// failure, and degraded (not proven unique) results count as "no signature
/// found". Either way the origin is skipped; one bad reference never aborts
/// the aggregation.
pub fn collect_xref_signatures(
    image: &dyn ImageBackend,
    target: u64,
    wildcard_operands: bool,
    max_length: usize,
) -> XrefSignatures {
    let options = SynthesisOptions { wildcard_operands, max_length };
    let mut entries = Vec::new();
    for xref in image.far_references_to(target) {
        // The host's xref classification is about the reference, not the
        // origin; check the origin's own flags instead.
        if !image.is_code(xref.origin) {
            continue;
        }
        match synthesis::synthesize(image, xref.origin, options, None) {
            Ok(SynthesisOutcome::Unique(signature)) => {
                entries.push(XrefSignature { origin: xref.origin, signature });
            }
            Ok(SynthesisOutcome::Partial(_)) | Err(_) => continue,
        }
    }
    entries.sort_by_key(|entry| entry.signature.len());
    XrefSignatures { entries }
}

/// Convenience for the tool surface: the `top` shortest xref signatures for
/// `target`, already rendered in the requested encoding.
pub fn shortest_xref_signatures(
    image: &dyn ImageBackend,
    target: u64,
    wildcard_operands: bool,
    max_length: usize,
    format: SignatureFormat,
    top: usize,
) -> Vec<(u64, String)> {
    collect_xref_signatures(image, target, wildcard_operands, max_length)
        .top(top)
        .iter()
        .map(|entry| (entry.origin, format_signature(&entry.signature, format)))
        .collect()
}
