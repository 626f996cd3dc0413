//! Decoding sleds back into IA-32 instructions.

use iced_x86::{
    Decoder, DecoderError, DecoderOptions, FlowControl, Formatter, Instruction, NasmFormatter,
};

use crate::error::FallthroughError;

/// Sleds are 32-bit code.
const BITNESS: u32 = 32;

/// One instruction decoded out of a sled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedInstruction {
    /// Offset of the first byte within the sled.
    pub offset: usize,
    pub len: usize,
    /// NASM syntax, e.g. `xchg eax,esi`.
    pub text: String,
    pub falls_through: bool,
}

/// Decode `sled` starting at `entry` until the end of the buffer.
///
/// An instruction cut off by the end of the sled is omitted; it completes in
/// whatever follows the landing point.
pub fn disassemble(sled: &[u8], entry: usize) -> Vec<DecodedInstruction> {
    let Some(code) = sled.get(entry..) else {
        return Vec::new();
    };

    let mut decoder = Decoder::with_ip(BITNESS, code, entry as u64, DecoderOptions::NONE);
    let mut formatter = NasmFormatter::new();
    let mut instruction = Instruction::default();
    let mut decoded = Vec::new();

    while decoder.can_decode() {
        decoder.decode_out(&mut instruction);
        if decoder.last_error() == DecoderError::NoMoreBytes {
            break;
        }

        let mut text = String::new();
        formatter.format(&instruction, &mut text);
        decoded.push(DecodedInstruction {
            offset: instruction.ip() as usize,
            len: instruction.len(),
            text,
            falls_through: !instruction.is_invalid()
                && instruction.flow_control() == FlowControl::Next,
        });
    }

    decoded
}

/// Check that execution entering at any offset of `sled` runs straight
/// through to its end.
pub fn check_fallthrough(sled: &[u8]) -> Result<(), FallthroughError> {
    for entry in 0..sled.len() {
        let mut decoder =
            Decoder::with_ip(BITNESS, &sled[entry..], entry as u64, DecoderOptions::NONE);
        let mut instruction = Instruction::default();

        while decoder.can_decode() {
            decoder.decode_out(&mut instruction);
            let offset = instruction.ip() as usize;
            match decoder.last_error() {
                DecoderError::NoMoreBytes => break,
                DecoderError::None => {}
                _ => return Err(FallthroughError::Invalid { entry, offset }),
            }
            if instruction.is_invalid() {
                return Err(FallthroughError::Invalid { entry, offset });
            }
            if instruction.flow_control() != FlowControl::Next {
                return Err(FallthroughError::Branch { entry, offset });
            }
        }
    }
    Ok(())
}
