use capstone::arch::arm::ArmOperandType;
use capstone::arch::arm64::Arm64OperandType;
use capstone::arch::ArchOperand;
use capstone::{arch, prelude::*, Capstone, InsnGroupId};

use crate::image::backends::InstructionDecoder;
use crate::image::{ImageError, Instruction, Operand, OperandKind};

/// ARM/AArch64 decoder on top of capstone in detail mode.
///
/// Capstone does not report operand byte offsets; on little-endian
/// fixed-width ARM words the operand fields sit in the low bytes, so every
/// operand is reported at offset 0 and the per-size length heuristic of the
/// locator covers the rest.
pub struct ArmDecoder {
    cs: Capstone,
}

impl ArmDecoder {
    pub fn new(arch_name: &str) -> Result<Self, ImageError> {
        let cs = match arch_name.to_ascii_lowercase().as_str() {
            "arm" | "armv7" => {
                Capstone::new().arm().mode(arch::arm::ArchMode::Arm).detail(true).build()
            }
            "arm64" | "aarch64" => {
                Capstone::new().arm64().mode(arch::arm64::ArchMode::Arm).detail(true).build()
            }
            other => return Err(ImageError::UnknownArch(other.to_string())),
        }
        .map_err(|e| ImageError::Backend(format!("capstone init failed: {e}")))?;
        Ok(Self { cs })
    }
}

impl InstructionDecoder for ArmDecoder {
    fn decode(&self, bytes: &[u8], address: u64) -> Option<Instruction> {
        let insns = self.cs.disasm_count(bytes, address, 1).ok()?;
        let insn = insns.iter().next()?;
        let length = insn.bytes().len();
        let detail = self.cs.insn_detail(&insn).ok()?;

        let mut operands = Vec::new();
        let mut imm_target = None;
        for op in detail.arch_detail().operands() {
            let kind = match op {
                ArchOperand::ArmOperand(op) => match op.op_type {
                    ArmOperandType::Imm(imm) => {
                        imm_target.get_or_insert(imm as u32 as u64);
                        OperandKind::Immediate
                    }
                    ArmOperandType::Cimm(_) | ArmOperandType::Pimm(_) | ArmOperandType::Fp(_) => {
                        OperandKind::Immediate
                    }
                    ArmOperandType::Mem(_) => OperandKind::Memory,
                    _ => OperandKind::Register,
                },
                ArchOperand::Arm64Operand(op) => match op.op_type {
                    Arm64OperandType::Imm(imm) => {
                        imm_target.get_or_insert(imm as u64);
                        OperandKind::Immediate
                    }
                    Arm64OperandType::Cimm(_) | Arm64OperandType::Fp(_) => OperandKind::Immediate,
                    Arm64OperandType::Mem(_) => OperandKind::Memory,
                    _ => OperandKind::Register,
                },
                _ => OperandKind::Register,
            };
            operands.push(Operand { offset: 0, kind });
        }

        // A branch/call with an immediate operand references that target.
        let is_branch = detail.groups().iter().any(|g| {
            *g == InsnGroupId(capstone::InsnGroupType::CS_GRP_CALL as u8)
                || *g == InsnGroupId(capstone::InsnGroupType::CS_GRP_JUMP as u8)
        });
        let ref_target = if is_branch { imm_target } else { None };

        Some(Instruction { length, operands, ref_target })
    }

    fn alignment(&self) -> usize {
        4
    }
}
