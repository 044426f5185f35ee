#![cfg(feature = "arm-backend")]

use sigmaker_core::image::{ArchMode, ImageBackend, LoadedImage, OperandKind};
use sigmaker_core::services::operands::{locate_operand, OperandSpan};

const BASE: u64 = 0x1000;

#[test]
fn aarch64_bl_decodes_as_a_call_with_an_immediate_target() {
    // bl #0 branches to its own address.
    let image = LoadedImage::from_raw(vec![0x00, 0x00, 0x00, 0x94], BASE, "arm64").unwrap();
    assert_eq!(image.arch_mode(), ArchMode::Arm);

    let insn = image.decode_instruction(BASE).unwrap();
    assert_eq!(insn.length, 4);
    assert_eq!(insn.ref_target, Some(BASE));
    assert!(insn.operands.iter().any(|op| op.kind == OperandKind::Immediate));
}

#[test]
fn aarch64_register_mov_has_no_wildcardable_operands() {
    // mov x0, x1
    let image = LoadedImage::from_raw(vec![0xE0, 0x03, 0x01, 0xAA], BASE, "arm64").unwrap();
    let insn = image.decode_instruction(BASE).unwrap();
    assert_eq!(insn.length, 4);
    assert_eq!(insn.ref_target, None);
    assert!(insn.operands.iter().all(|op| op.kind == OperandKind::Register));
    assert_eq!(locate_operand(&insn, ArchMode::Arm), None);
}

#[test]
fn arm32_bl_targets_eight_bytes_past_the_instruction() {
    // ARM-mode bl with a zero offset resolves relative to pc+8.
    let image = LoadedImage::from_raw(vec![0x00, 0x00, 0x00, 0xEB], BASE, "arm").unwrap();
    let insn = image.decode_instruction(BASE).unwrap();
    assert_eq!(insn.length, 4);
    assert_eq!(insn.ref_target, Some(BASE + 8));
}

#[test]
fn word_operands_wildcard_their_low_three_bytes() {
    let image = LoadedImage::from_raw(vec![0x00, 0x00, 0x00, 0x94], BASE, "arm64").unwrap();
    let insn = image.decode_instruction(BASE).unwrap();
    assert_eq!(
        locate_operand(&insn, ArchMode::Arm),
        Some(OperandSpan { offset: 0, length: 3 })
    );
}

#[test]
fn undecodable_words_return_none() {
    // Permanently undefined encoding.
    let image = LoadedImage::from_raw(vec![0xFF, 0xFF, 0xFF, 0xFF], BASE, "arm64").unwrap();
    assert!(image.decode_instruction(BASE).is_none());
}
