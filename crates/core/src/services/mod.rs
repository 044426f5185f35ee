pub mod operands;
pub mod synthesis;
pub mod xrefs;
