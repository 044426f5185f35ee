#![cfg(feature = "x86-backend")]

mod support;

use sigmaker_core::image::{ArchMode, ImageBackend, ImageError, LoadedImage, OperandKind};
use sigmaker_core::services::operands::{locate_operand, OperandSpan};
use support::sig;

const BASE: u64 = 0x1000;

/// call +0xFB; mov eax, [rip+0x10]; ret; int3 padding.
fn x86_image() -> LoadedImage {
    let mut bytes = vec![0xE8, 0xFB, 0x00, 0x00, 0x00];
    bytes.extend_from_slice(&[0x8B, 0x05, 0x10, 0x00, 0x00, 0x00]);
    bytes.push(0xC3);
    bytes.resize(32, 0xCC);
    LoadedImage::from_raw(bytes, BASE, "x86_64").unwrap()
}

#[test]
fn raw_image_spans_the_requested_address_range() {
    let image = x86_image();
    assert_eq!(image.min_address(), BASE);
    assert_eq!(image.max_address(), BASE + 32);
    assert_eq!(image.processor(), "x86_64");
    assert_eq!(image.arch_mode(), ArchMode::Generic);
    assert!(image.is_code(BASE));
    assert!(image.is_code(BASE + 31));
    assert!(!image.is_code(BASE + 32));
}

#[test]
fn reads_outside_the_image_yield_zero() {
    let image = x86_image();
    assert_eq!(image.read_byte(BASE), 0xE8);
    assert_eq!(image.read_byte(0), 0);
    assert_eq!(image.read_byte(BASE + 1000), 0);
}

#[test]
fn call_decodes_with_its_relative_target() {
    let image = x86_image();
    let insn = image.decode_instruction(BASE).unwrap();
    assert_eq!(insn.length, 5);
    assert_eq!(insn.ref_target, Some(0x1100));
    assert_eq!(insn.operands.len(), 1);
    assert_eq!(insn.operands[0].kind, OperandKind::Near);
    assert_eq!(insn.operands[0].offset, 1);
}

#[test]
fn rip_relative_mov_reports_the_displacement_offset() {
    let image = x86_image();
    let insn = image.decode_instruction(BASE + 5).unwrap();
    assert_eq!(insn.length, 6);
    // mov eax, [rip+0x10]: next ip 0x100B plus 0x10.
    assert_eq!(insn.ref_target, Some(0x101B));

    let memory = insn
        .operands
        .iter()
        .find(|op| op.kind == OperandKind::Memory)
        .expect("memory operand");
    assert_eq!(memory.offset, 2);
    assert_eq!(
        locate_operand(&insn, ArchMode::Generic),
        Some(OperandSpan { offset: 2, length: 4 })
    );
}

#[test]
fn undecodable_bytes_return_none() {
    // A lone 0x8B at the end of the image cannot complete a modrm byte.
    let image = LoadedImage::from_raw(vec![0x8B], BASE, "x86_64").unwrap();
    assert!(image.decode_instruction(BASE).is_none());
}

#[test]
fn search_forward_finds_concrete_patterns() {
    let image = x86_image();
    let pattern = sig(&[(0x8B, false), (0x05, false)]);
    assert_eq!(image.search_forward(pattern.bytes(), BASE, image.max_address()), Some(BASE + 5));
}

#[test]
fn search_forward_anchors_past_leading_wildcards() {
    let image = x86_image();
    let pattern = sig(&[(0x00, true), (0x05, false)]);
    assert_eq!(image.search_forward(pattern.bytes(), BASE, image.max_address()), Some(BASE + 5));
}

#[test]
fn search_forward_respects_the_window() {
    let image = x86_image();
    let pattern = sig(&[(0xE8, false)]);
    assert_eq!(image.search_forward(pattern.bytes(), BASE, image.max_address()), Some(BASE));
    assert_eq!(image.search_forward(pattern.bytes(), BASE + 1, image.max_address()), None);
}

#[test]
fn all_wildcard_patterns_match_immediately() {
    let image = x86_image();
    let pattern = sig(&[(0x00, true), (0x00, true)]);
    assert_eq!(image.search_forward(pattern.bytes(), BASE + 3, image.max_address()), Some(BASE + 3));
}

#[test]
fn far_references_are_found_by_linear_sweep() {
    let image = x86_image();
    let refs = image.far_references_to(0x1100);
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].origin, BASE);

    assert!(image.far_references_to(0x2000).is_empty());
}

#[test]
fn empty_raw_images_are_rejected() {
    let err = LoadedImage::from_raw(vec![], BASE, "x86_64").unwrap_err();
    assert!(matches!(err, ImageError::EmptyImage));
}

#[test]
fn unknown_architectures_are_rejected() {
    let err = LoadedImage::from_raw(vec![0x90], BASE, "mips").unwrap_err();
    assert!(matches!(err, ImageError::UnknownArch(name) if name == "mips"));
}
