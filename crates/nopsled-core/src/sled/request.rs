//! Untyped generation requests, as read from profiles or command lines.

use super::constraints::{ByteSet, SledConstraints};
use super::generator::{SledGenerator, TieBreaker};
use crate::error::RequestError;
use crate::table::TransitionTable;

/// Sled length, register names and forbidden bytes in their textual form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SledRequest {
    /// Requested length. Zero or negative asks for an empty sled.
    pub length: i64,
    pub save_registers: Vec<String>,
    /// Forbidden bytes in any form accepted by [`ByteSet::parse`].
    pub badchars: String,
}

impl SledRequest {
    pub fn new(length: i64) -> Self {
        SledRequest {
            length,
            ..Default::default()
        }
    }

    /// Length clamped at zero.
    pub fn normalized_length(&self) -> usize {
        usize::try_from(self.length).unwrap_or(0)
    }

    /// Resolve register names and parse the byte list.
    pub fn constraints(&self) -> Result<SledConstraints, RequestError> {
        let constraints = SledConstraints {
            forbidden: ByteSet::parse(&self.badchars)?,
            ..SledConstraints::new()
        };
        Ok(constraints.preserve_names(&self.save_registers)?)
    }

    pub fn generate<T>(
        &self,
        table: &TransitionTable,
        ties: &mut T,
    ) -> Result<Vec<u8>, RequestError>
    where
        T: TieBreaker + ?Sized,
    {
        let constraints = self.constraints()?;
        Ok(SledGenerator::new(table).generate(self.normalized_length(), &constraints, ties)?)
    }
}
