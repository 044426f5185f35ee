//! Abstraction over the loaded binary image and its disassembly engine.
//!
//! The synthesis loop only needs a narrow view of the host: read a byte,
//! decode one instruction, test whether an address is code, scan for a
//! pattern, and enumerate incoming far references. [`ImageBackend`] captures
//! exactly that surface; [`loaded::LoadedImage`] is the concrete
//! implementation over an in-memory byte buffer, and the `backends` module
//! holds the per-architecture instruction decoders behind it.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::SignatureByte;

pub mod backends;
pub mod loaded;

pub use loaded::LoadedImage;

/// Sentinel for an invalid address.
pub const BAD_ADDRESS: u64 = u64::MAX;

/// Architecture mode steering the operand-wildcarding policy.
///
/// Resolved once per image from the processor identification and threaded
/// explicitly through every call; there is no global mode flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchMode {
    /// x86-like: operand byte offsets come from the decoder.
    Generic,
    /// Fixed-width ARM encodings: operand length is a per-size heuristic.
    Arm,
}

impl ArchMode {
    pub fn from_processor(processor: &str) -> Self {
        let name = processor.to_ascii_lowercase();
        if name.starts_with("arm") || name.starts_with("aarch64") {
            ArchMode::Arm
        } else {
            ArchMode::Generic
        }
    }
}

/// Classification of a decoded operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    Register,
    Immediate,
    Memory,
    Displacement,
    Near,
    Far,
    Phrase,
}

impl OperandKind {
    /// Register-class operands are never wildcarded in ARM mode; everything
    /// address- or value-dependent is a candidate.
    pub fn wildcardable_on_arm(self) -> bool {
        !matches!(self, OperandKind::Register)
    }
}

/// A decoded operand: where its encoding starts inside the instruction and
/// what class it is. `offset == 0` means the decoder could not place the
/// operand bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operand {
    pub offset: u8,
    pub kind: OperandKind,
}

/// One decoded instruction, as much of it as signature synthesis needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Encoded length in bytes.
    pub length: usize,
    /// Operands in declaration order.
    pub operands: Vec<Operand>,
    /// Far call/jump/data target, if the instruction references one.
    pub ref_target: Option<u64>,
}

/// An incoming far reference to some target address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FarRef {
    pub origin: u64,
    /// Host classification of the reference itself. Callers that need to know
    /// whether the *origin* lies in code should ask the image instead.
    pub to_code: bool,
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Failed to read image file {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("Image is empty")]
    EmptyImage,
    #[error("Unknown architecture: {0}")]
    UnknownArch(String),
    #[error("No decoder available for architecture {0}; enable the matching cargo feature")]
    MissingBackend(String),
    #[error("Disassembly engine error: {0}")]
    Backend(String),
}

/// Narrow interface to the loaded binary image and its decoder.
///
/// Addresses form a half-open range `[min_address, max_address)`.
pub trait ImageBackend {
    fn min_address(&self) -> u64;
    fn max_address(&self) -> u64;

    /// Processor identification string (e.g. `x86_64`, `arm`).
    fn processor(&self) -> &str;

    fn arch_mode(&self) -> ArchMode {
        ArchMode::from_processor(self.processor())
    }

    /// Read one byte; out-of-image reads yield 0.
    fn read_byte(&self, address: u64) -> u8;

    fn is_code(&self, address: u64) -> bool;

    /// Decode the instruction at `address`, or `None` if the bytes there do
    /// not form a valid instruction.
    fn decode_instruction(&self, address: u64) -> Option<Instruction>;

    /// Wildcard-aware forward scan for `pattern` in `[from, to)`; returns the
    /// address of the first occurrence.
    fn search_forward(&self, pattern: &[SignatureByte], from: u64, to: u64) -> Option<u64>;

    /// All far references (calls, jumps, data refs) into `target`.
    fn far_references_to(&self, target: u64) -> Vec<FarRef>;
}
