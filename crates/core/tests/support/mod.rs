//! Scripted in-memory image backend for exercising the synthesis loop
//! without a real disassembler: instruction boundaries and operands are
//! declared explicitly per address.

#![allow(dead_code)]

use std::collections::HashMap;
use std::ops::Range;

use sigmaker_core::image::{FarRef, ImageBackend, Instruction, Operand, OperandKind};
use sigmaker_core::model::{Signature, SignatureByte};

pub struct ScriptedImage {
    pub bytes: Vec<u8>,
    pub base: u64,
    pub processor: String,
    pub code: Range<u64>,
    pub instructions: HashMap<u64, Instruction>,
    pub xrefs: HashMap<u64, Vec<FarRef>>,
}

impl ScriptedImage {
    pub fn new(bytes: Vec<u8>, base: u64) -> Self {
        let end = base + bytes.len() as u64;
        Self {
            bytes,
            base,
            processor: "x86_64".into(),
            code: base..end,
            instructions: HashMap::new(),
            xrefs: HashMap::new(),
        }
    }

    pub fn arm(mut self) -> Self {
        self.processor = "arm".into();
        self
    }

    pub fn with_code(mut self, code: Range<u64>) -> Self {
        self.code = code;
        self
    }

    /// Script a plain instruction with no operands at `address`.
    pub fn insn(mut self, address: u64, length: usize) -> Self {
        self.instructions
            .insert(address, Instruction { length, operands: vec![], ref_target: None });
        self
    }

    /// Script an instruction with a single operand at `address`.
    pub fn insn_with_operand(
        mut self,
        address: u64,
        length: usize,
        offset: u8,
        kind: OperandKind,
    ) -> Self {
        self.instructions.insert(
            address,
            Instruction { length, operands: vec![Operand { offset, kind }], ref_target: None },
        );
        self
    }

    /// Register an incoming far reference from `origin` to `target`.
    pub fn xref(mut self, target: u64, origin: u64) -> Self {
        self.xrefs.entry(target).or_default().push(FarRef { origin, to_code: true });
        self
    }
}

impl ImageBackend for ScriptedImage {
    fn min_address(&self) -> u64 {
        self.base
    }

    fn max_address(&self) -> u64 {
        self.base + self.bytes.len() as u64
    }

    fn processor(&self) -> &str {
        &self.processor
    }

    fn read_byte(&self, address: u64) -> u8 {
        if address < self.base {
            return 0;
        }
        self.bytes.get((address - self.base) as usize).copied().unwrap_or(0)
    }

    fn is_code(&self, address: u64) -> bool {
        self.code.contains(&address)
    }

    fn decode_instruction(&self, address: u64) -> Option<Instruction> {
        self.instructions.get(&address).cloned()
    }

    fn search_forward(&self, pattern: &[SignatureByte], from: u64, to: u64) -> Option<u64> {
        let from = from.max(self.base);
        let to = to.min(self.max_address());
        if pattern.is_empty() || to <= from {
            return None;
        }
        let start = (from - self.base) as usize;
        let end = (to - self.base) as usize;
        if end - start < pattern.len() {
            return None;
        }
        (start..=end - pattern.len())
            .find(|&pos| {
                pattern.iter().zip(&self.bytes[pos..]).all(|(p, &b)| p.wildcard || p.value == b)
            })
            .map(|pos| self.base + pos as u64)
    }

    fn far_references_to(&self, target: u64) -> Vec<FarRef> {
        self.xrefs.get(&target).cloned().unwrap_or_default()
    }
}

/// Build a signature from `(value, wildcard)` pairs.
pub fn sig(parts: &[(u8, bool)]) -> Signature {
    let mut signature = Signature::new();
    for &(value, wildcard) in parts {
        signature.push(value, wildcard);
    }
    signature
}
