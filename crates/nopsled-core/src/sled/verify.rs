//! Re-checking an existing sled against a table and constraints.

use super::constraints::SledConstraints;
use crate::error::SledViolation;
use crate::table::{StateKey, TransitionTable};

/// Check that `sled` could have been produced from `table` under
/// `constraints`.
///
/// The walk mirrors generation: it starts at the last byte (the start
/// state's successor) and moves toward offset 0, so `sled[i]` must be a
/// legal successor of `sled[i + 1]` with `len - 1 - i` bytes already in
/// place.
pub fn verify_sled(
    table: &TransitionTable,
    sled: &[u8],
    constraints: &SledConstraints,
) -> Result<(), SledViolation> {
    let mut prev = StateKey::Start;

    for (prefix_len, offset) in (0..sled.len()).rev().enumerate() {
        let byte = sled[offset];
        if constraints.forbidden.contains(byte) {
            return Err(SledViolation::ForbiddenByte { offset, byte });
        }

        let legal = table
            .candidates(prev)
            .any(|code| code.byte() == byte && constraints.admits(code, prefix_len));
        if !legal {
            return Err(SledViolation::IllegalTransition { offset, byte, prev });
        }

        prev = StateKey::Byte(byte);
    }

    Ok(())
}
