//! Per-architecture instruction decoders.
//!
//! Each backend turns raw bytes at an address into an [`Instruction`] with
//! operand byte offsets and an optional far reference target. Backends are
//! selected once at image-load time from the architecture name.

use crate::image::{ImageError, Instruction};

#[cfg(feature = "arm-backend")]
pub mod arm;
#[cfg(feature = "x86-backend")]
pub mod x86;

#[cfg(feature = "arm-backend")]
pub use arm::ArmDecoder;
#[cfg(feature = "x86-backend")]
pub use x86::X86Decoder;

/// Trait implemented by instruction decoders (e.g. iced-x86, capstone).
pub trait InstructionDecoder {
    /// Decode the single instruction at the start of `bytes`.
    ///
    /// `address` is the virtual address of `bytes[0]`, needed to resolve
    /// relative reference targets.
    fn decode(&self, bytes: &[u8], address: u64) -> Option<Instruction>;

    /// Step to use when resynchronizing a linear sweep after undecodable
    /// bytes (1 for variable-width encodings, word size for fixed-width).
    fn alignment(&self) -> usize {
        1
    }
}

/// Build the decoder for an architecture name (as reported by the object
/// parser or passed as a hint).
pub fn decoder_for_arch(arch: &str) -> Result<Box<dyn InstructionDecoder>, ImageError> {
    match arch.to_ascii_lowercase().as_str() {
        "x86_64" | "amd64" => x86_decoder(64),
        "x86" | "i386" => x86_decoder(32),
        "arm" | "armv7" | "arm64" | "aarch64" => arm_decoder(arch),
        other => Err(ImageError::UnknownArch(other.to_string())),
    }
}

#[cfg(feature = "x86-backend")]
fn x86_decoder(bitness: u32) -> Result<Box<dyn InstructionDecoder>, ImageError> {
    Ok(Box::new(X86Decoder::new(bitness)))
}

#[cfg(not(feature = "x86-backend"))]
fn x86_decoder(bitness: u32) -> Result<Box<dyn InstructionDecoder>, ImageError> {
    Err(ImageError::MissingBackend(format!("x86 ({bitness}-bit)")))
}

#[cfg(feature = "arm-backend")]
fn arm_decoder(arch: &str) -> Result<Box<dyn InstructionDecoder>, ImageError> {
    Ok(Box::new(ArmDecoder::new(arch)?))
}

#[cfg(not(feature = "arm-backend"))]
fn arm_decoder(arch: &str) -> Result<Box<dyn InstructionDecoder>, ImageError> {
    Err(ImageError::MissingBackend(arch.to_string()))
}
