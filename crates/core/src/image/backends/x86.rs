use iced_x86::{Decoder, DecoderOptions, FlowControl, OpKind, Register};

use crate::image::backends::InstructionDecoder;
use crate::image::{Instruction, Operand, OperandKind};

/// x86/x86_64 decoder on top of iced-x86.
///
/// iced tracks the byte offsets of displacements and immediates while
/// decoding (`ConstantOffsets`), which is exactly the per-operand placement
/// information the wildcarding policy needs.
pub struct X86Decoder {
    bitness: u32,
}

impl X86Decoder {
    /// `bitness` is 32 or 64.
    pub fn new(bitness: u32) -> Self {
        Self { bitness }
    }
}

impl InstructionDecoder for X86Decoder {
    fn decode(&self, bytes: &[u8], address: u64) -> Option<Instruction> {
        if bytes.is_empty() {
            return None;
        }

        let mut decoder = Decoder::with_ip(self.bitness, bytes, address, DecoderOptions::NONE);
        let insn = decoder.decode();
        if insn.is_invalid() {
            return None;
        }
        let offsets = decoder.get_constant_offsets(&insn);

        let disp_offset = if offsets.has_displacement() { offsets.displacement_offset() as u8 } else { 0 };

        // Immediate slots are consumed in operand order; the second immediate
        // (e.g. `enter imm16, imm8`) has its own offset.
        let imm_offsets = [
            if offsets.has_immediate() { offsets.immediate_offset() as u8 } else { 0 },
            if offsets.has_immediate2() { offsets.immediate_offset2() as u8 } else { 0 },
        ];
        let mut imm_slot = 0usize;
        let mut next_imm_offset = || {
            let offset = imm_offsets.get(imm_slot).copied().unwrap_or(0);
            imm_slot += 1;
            offset
        };

        let mut operands = Vec::with_capacity(insn.op_count() as usize);
        for i in 0..insn.op_count() {
            let operand = match insn.op_kind(i) {
                OpKind::Register => Operand { offset: 0, kind: OperandKind::Register },
                OpKind::NearBranch16 | OpKind::NearBranch32 | OpKind::NearBranch64 => {
                    // Branch targets are encoded as a trailing displacement;
                    // iced reports that slot as the immediate.
                    let offset =
                        if offsets.has_immediate() { next_imm_offset() } else { disp_offset };
                    Operand { offset, kind: OperandKind::Near }
                }
                OpKind::FarBranch16 | OpKind::FarBranch32 => {
                    let offset =
                        if offsets.has_immediate() { next_imm_offset() } else { disp_offset };
                    Operand { offset, kind: OperandKind::Far }
                }
                OpKind::Immediate8
                | OpKind::Immediate8_2nd
                | OpKind::Immediate16
                | OpKind::Immediate32
                | OpKind::Immediate64
                | OpKind::Immediate8to16
                | OpKind::Immediate8to32
                | OpKind::Immediate8to64
                | OpKind::Immediate32to64 => {
                    Operand { offset: next_imm_offset(), kind: OperandKind::Immediate }
                }
                OpKind::Memory => {
                    let has_base = insn.memory_base() != Register::None;
                    let has_index = insn.memory_index() != Register::None;
                    let kind = if !offsets.has_displacement() {
                        OperandKind::Phrase
                    } else if has_base || has_index {
                        OperandKind::Memory
                    } else {
                        OperandKind::Displacement
                    };
                    Operand { offset: disp_offset, kind }
                }
                // Implicit string-op memory (no encoded bytes to wildcard).
                _ => Operand { offset: 0, kind: OperandKind::Phrase },
            };
            operands.push(operand);
        }

        let ref_target = match insn.flow_control() {
            FlowControl::Call | FlowControl::UnconditionalBranch | FlowControl::ConditionalBranch
                if matches!(
                    insn.op0_kind(),
                    OpKind::NearBranch16 | OpKind::NearBranch32 | OpKind::NearBranch64
                ) =>
            {
                Some(insn.near_branch_target())
            }
            _ if insn.is_ip_rel_memory_operand() => Some(insn.ip_rel_memory_address()),
            _ => None,
        };

        Some(Instruction { length: insn.len(), operands, ref_target })
    }
}
