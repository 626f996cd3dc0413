//! Caller constraints on a sled: registers to preserve and bytes to avoid.

use std::fmt;

use crate::error::{ByteSetError, RegisterError};
use crate::table::CandidateCode;
use crate::x86::{Register, RegisterMask};

/// Membership set over all 256 byte values.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ByteSet([bool; 256]);

impl ByteSet {
    pub const EMPTY: ByteSet = ByteSet([false; 256]);

    pub fn from_bytes(bytes: &[u8]) -> Self {
        bytes.iter().copied().collect()
    }

    /// Parse a byte list such as `\x00\x0a\x0d`, `000a0d` or `0x00,0x0a`.
    ///
    /// Tokens are separated by commas or whitespace; each token is a run of
    /// hex digit pairs, optionally broken up by `\x` or `0x` markers in
    /// either case.
    pub fn parse(text: &str) -> Result<Self, ByteSetError> {
        let mut set = ByteSet::EMPTY;
        for token in text.split(|c: char| c == ',' || c.is_whitespace()) {
            for piece in token.split("\\x").flat_map(|piece| piece.split("\\X")) {
                let digits = strip_hex_prefix(piece);
                if digits.chars().count() % 2 != 0 {
                    return Err(ByteSetError::OddLength(token.to_string()));
                }
                let mut chars = digits.chars();
                while let (Some(hi), Some(lo)) = (chars.next(), chars.next()) {
                    set.insert(hex_value(hi)? << 4 | hex_value(lo)?);
                }
            }
        }
        Ok(set)
    }

    pub fn insert(&mut self, byte: u8) {
        self.0[byte as usize] = true;
    }

    pub fn remove(&mut self, byte: u8) {
        self.0[byte as usize] = false;
    }

    pub fn contains(&self, byte: u8) -> bool {
        self.0[byte as usize]
    }

    pub fn len(&self) -> usize {
        self.0.iter().filter(|&&member| member).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=255u8).filter(move |&b| self.contains(b))
    }
}

/// `piece` without a leading `0x` or `0X`.
pub fn strip_hex_prefix(piece: &str) -> &str {
    piece
        .strip_prefix("0x")
        .or_else(|| piece.strip_prefix("0X"))
        .unwrap_or(piece)
}

fn hex_value(c: char) -> Result<u8, ByteSetError> {
    c.to_digit(16)
        .map(|d| d as u8)
        .ok_or(ByteSetError::InvalidDigit(c))
}

impl Default for ByteSet {
    fn default() -> Self {
        ByteSet::EMPTY
    }
}

impl FromIterator<u8> for ByteSet {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut set = ByteSet::EMPTY;
        for byte in iter {
            set.insert(byte);
        }
        set
    }
}

impl fmt::Debug for ByteSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.iter().map(|b| format!("0x{b:02x}")))
            .finish()
    }
}

/// Everything a generation call must respect besides the table itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SledConstraints {
    /// Registers no sled instruction may write.
    pub preserve: RegisterMask,
    /// Byte values that may not appear in the sled.
    pub forbidden: ByteSet,
}

impl SledConstraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preserve(mut self, reg: Register) -> Self {
        self.preserve.insert(reg);
        self
    }

    /// Add registers by name (`"esp"`, `"ebp"`, ...).
    pub fn preserve_names<I, S>(mut self, names: I) -> Result<Self, RegisterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.preserve = self.preserve | RegisterMask::from_names(names)?;
        Ok(self)
    }

    pub fn forbid(mut self, bytes: &[u8]) -> Self {
        for &byte in bytes {
            self.forbidden.insert(byte);
        }
        self
    }

    /// Whether `code` may be emitted once `prefix_len` bytes exist.
    pub fn admits(&self, code: CandidateCode, prefix_len: usize) -> bool {
        !code.writes_any(self.preserve)
            && code.min_prefix() <= prefix_len
            && !self.forbidden.contains(code.byte())
    }
}
