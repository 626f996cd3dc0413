//! IA-32 specifics: register numbering and disassembly.

pub mod disasm;
pub mod register;

pub use disasm::{check_fallthrough, disassemble, DecodedInstruction};
pub use register::{Register, RegisterMask};
