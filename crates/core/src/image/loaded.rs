//! Concrete image backend over an in-memory byte buffer.

use std::fmt;
use std::ops::Range;
#[cfg(feature = "loader")]
use std::path::Path;

use crate::image::backends::{self, InstructionDecoder};
use crate::image::{FarRef, ImageBackend, ImageError, Instruction};
use crate::model::SignatureByte;

/// Longest instruction any supported decoder will consume.
const MAX_INSTRUCTION_BYTES: usize = 16;

/// A binary image loaded into memory, together with the instruction decoder
/// matching its architecture.
///
/// Addresses form the half-open range `[base, base + len)`. For object files
/// loaded with [`LoadedImage::from_file`] the base is 0 and addresses are
/// file offsets; virtual-address mapping is out of scope.
pub struct LoadedImage {
    bytes: Vec<u8>,
    base: u64,
    code_ranges: Vec<Range<u64>>,
    processor: String,
    decoder: Box<dyn InstructionDecoder>,
}

impl fmt::Debug for LoadedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedImage")
            .field("base", &self.base)
            .field("len", &self.bytes.len())
            .field("code_ranges", &self.code_ranges)
            .field("processor", &self.processor)
            .finish_non_exhaustive()
    }
}

impl LoadedImage {
    /// Wrap a flat code image located at `base`. The whole range is treated
    /// as code.
    pub fn from_raw(bytes: Vec<u8>, base: u64, arch: &str) -> Result<Self, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::EmptyImage);
        }
        let decoder = backends::decoder_for_arch(arch)?;
        let end = base + bytes.len() as u64;
        Ok(Self {
            code_ranges: vec![base..end],
            base,
            processor: arch.to_ascii_lowercase(),
            bytes,
            decoder,
        })
    }

    /// Load an ELF/PE/Mach-O file, detecting the architecture and the
    /// executable section ranges. Falls back to a flat raw image (with
    /// `arch_hint` or x86_64) when the file is not a recognized object.
    #[cfg(feature = "loader")]
    pub fn from_file(path: &Path, arch_hint: Option<&str>) -> Result<Self, ImageError> {
        let bytes = std::fs::read(path)
            .map_err(|source| ImageError::Io { path: path.to_path_buf(), source })?;
        if bytes.is_empty() {
            return Err(ImageError::EmptyImage);
        }

        match loader::parse_object(&bytes) {
            Some(parsed) => {
                let arch = arch_hint.map(str::to_string).unwrap_or(parsed.arch);
                let decoder = backends::decoder_for_arch(&arch)?;
                let code_ranges = if parsed.code_ranges.is_empty() {
                    vec![0..bytes.len() as u64]
                } else {
                    parsed.code_ranges
                };
                Ok(Self { base: 0, code_ranges, processor: arch.to_ascii_lowercase(), bytes, decoder })
            }
            None => Self::from_raw(bytes, 0, arch_hint.unwrap_or("x86_64")),
        }
    }

    fn offset_of(&self, address: u64) -> Option<usize> {
        if address < self.base {
            return None;
        }
        let offset = (address - self.base) as usize;
        (offset < self.bytes.len()).then_some(offset)
    }
}

impl ImageBackend for LoadedImage {
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
        self.offset_of(address).map(|offset| self.bytes[offset]).unwrap_or(0)
    }

    fn is_code(&self, address: u64) -> bool {
        self.code_ranges.iter().any(|range| range.contains(&address))
    }

    fn decode_instruction(&self, address: u64) -> Option<Instruction> {
        let offset = self.offset_of(address)?;
        let end = (offset + MAX_INSTRUCTION_BYTES).min(self.bytes.len());
        self.decoder.decode(&self.bytes[offset..end], address)
    }

    fn search_forward(&self, pattern: &[SignatureByte], from: u64, to: u64) -> Option<u64> {
        if pattern.is_empty() {
            return None;
        }
        let from = from.max(self.base);
        let to = to.min(self.max_address());
        if to <= from {
            return None;
        }
        let start = (from - self.base) as usize;
        let end = (to - self.base) as usize;
        if end - start < pattern.len() {
            return None;
        }
        let last_start = end - pattern.len();

        // Anchor the scan on the first concrete pattern byte so memchr can
        // skip over leading wildcards.
        match pattern.iter().position(|b| !b.wildcard) {
            Some(anchor) => {
                let window = &self.bytes[start + anchor..=last_start + anchor];
                for found in memchr::memchr_iter(pattern[anchor].value, window) {
                    let candidate = start + found;
                    if matches_at(&self.bytes, candidate, pattern) {
                        return Some(self.base + candidate as u64);
                    }
                }
                None
            }
            // All-wildcard patterns match anywhere a full window fits.
            None => Some(from),
        }
    }

    fn far_references_to(&self, target: u64) -> Vec<FarRef> {
        let mut refs = Vec::new();
        for range in &self.code_ranges {
            let mut address = range.start;
            while address < range.end {
                match self.decode_instruction(address) {
                    Some(insn) if insn.length > 0 => {
                        if insn.ref_target == Some(target) {
                            refs.push(FarRef { origin: address, to_code: true });
                        }
                        address += insn.length as u64;
                    }
                    // Resynchronize past undecodable bytes.
                    _ => address += self.decoder.alignment() as u64,
                }
            }
        }
        refs
    }
}

fn matches_at(bytes: &[u8], offset: usize, pattern: &[SignatureByte]) -> bool {
    pattern.iter().zip(&bytes[offset..]).all(|(p, &b)| p.wildcard || p.value == b)
}

#[cfg(feature = "loader")]
mod loader {
    use std::ops::Range;

    use goblin::{elf, mach, pe, Object};

    pub struct ParsedObject {
        pub arch: String,
        /// File-offset ranges of the executable sections.
        pub code_ranges: Vec<Range<u64>>,
    }

    pub fn parse_object(bytes: &[u8]) -> Option<ParsedObject> {
        match Object::parse(bytes).ok()? {
            Object::Elf(elf) => {
                let arch = match elf.header.e_machine {
                    elf::header::EM_X86_64 => "x86_64",
                    elf::header::EM_386 => "x86",
                    elf::header::EM_AARCH64 => "arm64",
                    elf::header::EM_ARM => "arm",
                    _ => return None,
                };
                let code_ranges = elf
                    .section_headers
                    .iter()
                    .filter(|sh| {
                        sh.sh_flags & u64::from(elf::section_header::SHF_EXECINSTR) != 0
                            && sh.sh_size > 0
                    })
                    .map(|sh| sh.sh_offset..sh.sh_offset.saturating_add(sh.sh_size))
                    .collect();
                Some(ParsedObject { arch: arch.into(), code_ranges })
            }
            Object::PE(pe) => {
                let arch = match pe.header.coff_header.machine {
                    pe::header::COFF_MACHINE_X86 => "x86",
                    pe::header::COFF_MACHINE_X86_64 => "x86_64",
                    pe::header::COFF_MACHINE_ARM => "arm",
                    pe::header::COFF_MACHINE_ARM64 => "arm64",
                    _ => return None,
                };
                let code_ranges = pe
                    .sections
                    .iter()
                    .filter(|sec| {
                        sec.characteristics & pe::section_table::IMAGE_SCN_MEM_EXECUTE != 0
                            && sec.size_of_raw_data > 0
                    })
                    .map(|sec| {
                        let start = sec.pointer_to_raw_data as u64;
                        start..start + sec.size_of_raw_data as u64
                    })
                    .collect();
                Some(ParsedObject { arch: arch.into(), code_ranges })
            }
            Object::Mach(mach::Mach::Binary(bin)) => {
                let arch = match bin.header.cputype() {
                    mach::cputype::CPU_TYPE_X86 => "x86",
                    mach::cputype::CPU_TYPE_X86_64 => "x86_64",
                    mach::cputype::CPU_TYPE_ARM => "arm",
                    mach::cputype::CPU_TYPE_ARM64 => "arm64",
                    _ => return None,
                };
                let code_ranges = bin
                    .segments
                    .sections()
                    .flatten()
                    .filter_map(Result::ok)
                    .filter(|(sec, _)| sec.name().ok() == Some("__text") && sec.size > 0)
                    .map(|(sec, _)| {
                        let start = u64::from(sec.offset);
                        start..start + sec.size
                    })
                    .collect();
                Some(ParsedObject { arch: arch.into(), code_ranges })
            }
            _ => None,
        }
    }
}
