//! Locating the wildcardable operand range inside a decoded instruction.

use crate::image::{ArchMode, Instruction};

/// Contiguous byte range within an instruction holding operand data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperandSpan {
    /// Byte offset from the instruction start.
    pub offset: usize,
    /// Number of operand bytes.
    pub length: usize,
}

/// Find the first operand range eligible for wildcarding, per architecture
/// policy. Returns `None` when nothing in the instruction qualifies.
pub fn locate_operand(instruction: &Instruction, mode: ArchMode) -> Option<OperandSpan> {
    match mode {
        ArchMode::Generic => locate_generic(instruction),
        ArchMode::Arm => locate_arm(instruction),
    }
}

/// Generic (x86-like) policy: the first operand with a known byte offset
/// spans from that offset to the end of the instruction.
///
/// Offset 0 doubles as "decoder could not place this operand", so operands
/// genuinely located at offset 0 are skipped too. Known caveat, kept for
/// compatibility with how host disassemblers report it.
fn locate_generic(instruction: &Instruction) -> Option<OperandSpan> {
    for op in &instruction.operands {
        if op.offset == 0 {
            continue;
        }
        let offset = op.offset as usize;
        if offset >= instruction.length {
            continue;
        }
        return Some(OperandSpan { offset, length: instruction.length - offset });
    }
    None
}

/// ARM policy: only address/value-carrying operand kinds qualify, and the
/// operand length is a heuristic keyed on the total instruction size
/// (1-byte operator + 3-byte operand for 4-byte words, 7 for the 8-byte
/// ADRL-style pairs). Other sizes are left un-wildcarded.
fn locate_arm(instruction: &Instruction) -> Option<OperandSpan> {
    for op in &instruction.operands {
        if !op.kind.wildcardable_on_arm() {
            continue;
        }
        let length = match instruction.length {
            4 => 3,
            8 => 7,
            _ => return None,
        };
        return Some(OperandSpan { offset: op.offset as usize, length });
    }
    None
}
