//! Instruction-transition tables.

pub mod code;
pub mod single_byte;
pub mod transition;

pub use code::CandidateCode;
pub use single_byte::{
    default_table, single_byte_code, single_byte_table, DEFAULT_SINGLE_BYTE_OPCODES,
};
pub use transition::{Group, StateKey, TableBuilder, TransitionTable};
