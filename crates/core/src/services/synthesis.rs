//! Signature synthesis: grow a byte pattern instruction by instruction until
//! it matches the image at exactly one location.

use thiserror::Error;

use crate::image::{ImageBackend, BAD_ADDRESS};
use crate::model::Signature;
use crate::services::operands::locate_operand;

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Invalid address")]
    InvalidAddress,
    #[error("Can not create a code signature for data at {0:#X}")]
    NotCode(u64),
    #[error("Can't decode instruction at {0:#X}; is this actually code?")]
    UndecodableAtStart(u64),
    #[error("Signature exceeded the maximum length of {0} bytes")]
    TooLong(usize),
    #[error("Signature generation cancelled")]
    Cancelled,
    #[error("Selection is empty")]
    EmptySelection,
}

/// Result of a synthesis run that produced a signature.
///
/// A `Partial` signature was grown as far as the code allowed but never
/// proved unique; callers must not treat it as a verified match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisOutcome {
    Unique(Signature),
    Partial(Signature),
}

impl SynthesisOutcome {
    pub fn signature(&self) -> &Signature {
        match self {
            SynthesisOutcome::Unique(sig) | SynthesisOutcome::Partial(sig) => sig,
        }
    }

    pub fn into_signature(self) -> Signature {
        match self {
            SynthesisOutcome::Unique(sig) | SynthesisOutcome::Partial(sig) => sig,
        }
    }

    pub fn is_unique(&self) -> bool {
        matches!(self, SynthesisOutcome::Unique(_))
    }
}

/// Caller's answer when the signature outgrows the length guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthDecision {
    /// Keep growing; the guard counter resets.
    Continue,
    /// Stop and return the (non-unique) signature accumulated so far.
    Stop,
    /// Abort with [`SynthesisError::Cancelled`].
    Abort,
}

/// Strategy consulted when the accumulated bytes since the last confirmation
/// exceed the configured maximum. Interactive frontends prompt the user;
/// batch callers pass no policy at all, turning the guard into a hard
/// [`SynthesisError::TooLong`].
pub trait GrowthPolicy {
    fn on_limit(&mut self, signature_len: usize) -> GrowthDecision;
}

#[derive(Debug, Clone, Copy)]
pub struct SynthesisOptions {
    /// Replace operand bytes with wildcards so the signature survives
    /// relocations and immediate changes.
    pub wildcard_operands: bool,
    /// Growth guard: bytes the signature may grow before the policy is
    /// consulted (or the run fails).
    pub max_length: usize,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self { wildcard_operands: true, max_length: 1000 }
    }
}

/// Grow a signature starting at `anchor` until it is unique in the image.
///
/// Instructions are consumed one at a time; operand bytes are wildcarded
/// per the image's architecture policy when `wildcard_operands` is set.
/// Running out of decodable code mid-growth yields a [`SynthesisOutcome::Partial`].
pub fn synthesize(
    image: &dyn ImageBackend,
    anchor: u64,
    options: SynthesisOptions,
    mut growth: Option<&mut dyn GrowthPolicy>,
) -> Result<SynthesisOutcome, SynthesisError> {
    if anchor == BAD_ADDRESS {
        return Err(SynthesisError::InvalidAddress);
    }
    if !image.is_code(anchor) {
        return Err(SynthesisError::NotCode(anchor));
    }

    let mode = image.arch_mode();
    let mut signature = Signature::new();
    let mut part_length = 0usize;
    let mut cursor = anchor;

    loop {
        let Some(instruction) = image.decode_instruction(cursor).filter(|i| i.length > 0) else {
            if signature.is_empty() {
                return Err(SynthesisError::UndecodableAtStart(cursor));
            }
            // Ran past the end of decodable code; hand back what we have
            // without a uniqueness proof.
            signature.trim();
            return Ok(SynthesisOutcome::Partial(signature));
        };

        if part_length > options.max_length {
            match &mut growth {
                None => return Err(SynthesisError::TooLong(options.max_length)),
                Some(policy) => match policy.on_limit(signature.len()) {
                    GrowthDecision::Continue => part_length = 0,
                    GrowthDecision::Stop => {
                        signature.trim();
                        return Ok(SynthesisOutcome::Partial(signature));
                    }
                    GrowthDecision::Abort => return Err(SynthesisError::Cancelled),
                },
            }
        }
        part_length += instruction.length;

        let operand = if options.wildcard_operands {
            locate_operand(&instruction, mode).filter(|span| span.length > 0)
        } else {
            None
        };
        match operand {
            Some(span) => {
                // Fixed opcode bytes, then wildcards over the operand.
                append_bytes(image, &mut signature, cursor, span.offset, false);
                append_bytes(image, &mut signature, cursor + span.offset as u64, span.length, true);
                // An operand on the "left side" of the instruction means the
                // operator bytes follow it; keep those fixed.
                if span.offset == 0 {
                    append_bytes(
                        image,
                        &mut signature,
                        cursor + span.length as u64,
                        instruction.length.saturating_sub(span.length),
                        false,
                    );
                }
            }
            None => append_bytes(image, &mut signature, cursor, instruction.length, false),
        }

        if is_unique(image, &signature) {
            // Trailing wildcards add nothing; strip them for output.
            signature.trim();
            return Ok(SynthesisOutcome::Unique(signature));
        }
        cursor += instruction.length as u64;
    }
}

/// Does this signature occur at exactly one location in the image?
///
/// Two forward scans: find the first occurrence, then search again right
/// after it. Cheaper than counting every occurrence and sufficient to tell
/// "exactly one" from "none" and "more than one".
pub fn is_unique(image: &dyn ImageBackend, signature: &Signature) -> bool {
    if signature.is_empty() {
        return false;
    }
    let end = image.max_address();
    let Some(first) = image.search_forward(signature.bytes(), image.min_address(), end) else {
        return false;
    };
    image.search_forward(signature.bytes(), first + 1, end).is_none()
}

/// Signature over a literal byte range: every byte fixed, no instruction or
/// operand logic involved.
pub fn raw_range_signature(
    image: &dyn ImageBackend,
    start: u64,
    end: u64,
) -> Result<Signature, SynthesisError> {
    if end <= start {
        return Err(SynthesisError::EmptySelection);
    }
    let mut signature = Signature::new();
    append_bytes(image, &mut signature, start, (end - start) as usize, false);
    Ok(signature)
}

fn append_bytes(
    image: &dyn ImageBackend,
    signature: &mut Signature,
    address: u64,
    count: usize,
    wildcard: bool,
) {
    for i in 0..count as u64 {
        signature.push(image.read_byte(address + i), wildcard);
    }
}
