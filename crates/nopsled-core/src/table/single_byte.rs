//! Transition tables made only of one-byte instructions.
//!
//! When every candidate is a complete instruction on its own, any byte may
//! follow any other and every entry offset decodes cleanly. The register
//! masks are taken from iced-x86's instruction info rather than hand-kept
//! tables.

use iced_x86::{Decoder, DecoderOptions, FlowControl, InstructionInfoFactory, OpAccess};

use super::code::CandidateCode;
use super::transition::{TableBuilder, TransitionTable};
use crate::error::TableError;
use crate::x86::{Register, RegisterMask};

/// One-byte IA-32 instructions that fall through and touch only registers
/// and flags.
pub const DEFAULT_SINGLE_BYTE_OPCODES: &[u8] = &[
    0x90, // nop
    0x40, 0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47, // inc r32
    0x48, 0x49, 0x4a, 0x4b, 0x4c, 0x4d, 0x4e, 0x4f, // dec r32
    0x91, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, // xchg eax, r32
    0x98, // cwde
    0x99, // cdq
    0x27, // daa
    0x2f, // das
    0x37, // aaa
    0x3f, // aas
    0x9b, // fwait
    0x9e, // sahf
    0x9f, // lahf
    0xd6, // salc
    0xf5, // cmc
    0xf8, // clc
    0xf9, // stc
    0xfc, // cld
];

/// Decode `opcode` as 32-bit code and describe it as a candidate.
pub fn single_byte_code(opcode: u8) -> Result<CandidateCode, TableError> {
    let bytes = [opcode];
    let mut decoder = Decoder::new(32, &bytes, DecoderOptions::NONE);
    let instruction = decoder.decode();

    if instruction.is_invalid()
        || instruction.len() != 1
        || instruction.flow_control() != FlowControl::Next
    {
        return Err(TableError::UnsupportedOpcode(opcode));
    }

    let mut factory = InstructionInfoFactory::new();
    let info = factory.info(&instruction);
    let clobbers: RegisterMask = info
        .used_registers()
        .iter()
        .filter(|used| writes(used.access()))
        .filter_map(|used| Register::from_iced(used.register()))
        .collect();

    Ok(CandidateCode::new(opcode, 0, clobbers))
}

fn writes(access: OpAccess) -> bool {
    matches!(
        access,
        OpAccess::Write | OpAccess::CondWrite | OpAccess::ReadWrite | OpAccess::ReadCondWrite
    )
}

/// Build a table where every state offers every opcode in `opcodes`.
pub fn single_byte_table(opcodes: &[u8]) -> Result<TransitionTable, TableError> {
    let mut opcodes = opcodes.to_vec();
    opcodes.sort_unstable();
    opcodes.dedup();
    if opcodes.is_empty() {
        return Err(TableError::NoOpcodes);
    }

    let codes = opcodes
        .into_iter()
        .map(single_byte_code)
        .collect::<Result<Vec<_>, _>>()?;
    log::debug!("single-byte table with {} opcodes", codes.len());

    Ok(TableBuilder::new().group_everywhere(codes).build())
}

/// [`single_byte_table`] over [`DEFAULT_SINGLE_BYTE_OPCODES`].
pub fn default_table() -> Result<TransitionTable, TableError> {
    single_byte_table(DEFAULT_SINGLE_BYTE_OPCODES)
}
