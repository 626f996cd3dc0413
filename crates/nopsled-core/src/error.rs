//! Error types for sled generation, table loading and verification.

use thiserror::Error;

use crate::table::StateKey;

/// Failure of a single generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SledError {
    /// Every candidate reachable from `prev` was excluded by the register
    /// mask, the prefix-length gate or the forbidden-byte set.
    #[error("no legal byte for sled position {position} after state {prev}")]
    Exhausted { position: usize, prev: StateKey },
}

/// Errors from building, loading or exporting a transition table.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("transition table must have {expected} states, found {found}")]
    StateCount { expected: usize, found: usize },
    #[error("malformed transition table: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read transition table: {0}")]
    Io(#[from] std::io::Error),
    #[error("opcode 0x{0:02x} is not a single-byte fall-through instruction")]
    UnsupportedOpcode(u8),
    #[error("no opcodes given for single-byte table")]
    NoOpcodes,
}

/// Register name that the resolver does not know.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("unknown register `{0}`")]
    Unknown(String),
}

/// Malformed forbidden-byte list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ByteSetError {
    #[error("invalid hex digit `{0}` in byte list")]
    InvalidDigit(char),
    #[error("byte list token `{0}` has an odd number of hex digits")]
    OddLength(String),
}

/// Failure of a textual [`crate::sled::SledRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error(transparent)]
    Register(#[from] RegisterError),
    #[error(transparent)]
    ByteSet(#[from] ByteSetError),
    #[error(transparent)]
    Sled(#[from] SledError),
}

/// First point where an existing sled breaks the table's rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SledViolation {
    #[error("forbidden byte 0x{byte:02x} at offset {offset}")]
    ForbiddenByte { offset: usize, byte: u8 },
    #[error("byte 0x{byte:02x} at offset {offset} is not a legal predecessor of state {prev}")]
    IllegalTransition {
        offset: usize,
        byte: u8,
        prev: StateKey,
    },
}

/// An entry offset whose decode does not fall through to the landing point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FallthroughError {
    #[error("entry {entry}: undecodable bytes at offset {offset}")]
    Invalid { entry: usize, offset: usize },
    #[error("entry {entry}: instruction at offset {offset} transfers control")]
    Branch { entry: usize, offset: usize },
}
