//! The instruction-transition table.
//!
//! For every previous state (a byte value, or the start of the sled) the
//! table lists groups of candidate codes for the byte that may be placed in
//! front of it. A built table is immutable; it is meant to be loaded once
//! and shared by reference between any number of generation calls.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::code::CandidateCode;
use crate::error::TableError;
use crate::x86::RegisterMask;

/// Lookup key of the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKey {
    /// Nothing emitted yet: the byte right before the landing point.
    Start,
    /// The byte most recently emitted.
    Byte(u8),
}

impl StateKey {
    /// Row of the start state in the serialized table.
    pub const START_INDEX: usize = 256;

    pub const fn index(self) -> usize {
        match self {
            StateKey::Start => Self::START_INDEX,
            StateKey::Byte(b) => b as usize,
        }
    }

    /// Every key, bytes first and the start state last.
    pub fn all() -> impl Iterator<Item = StateKey> {
        (0..=255u8).map(StateKey::Byte).chain(std::iter::once(StateKey::Start))
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateKey::Start => f.write_str("start"),
            StateKey::Byte(b) => write!(f, "0x{b:02x}"),
        }
    }
}

/// Ordered candidates sharing one table group.
pub type Group = Box<[CandidateCode]>;

/// Immutable transition table with one row per [`StateKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTable {
    rows: Box<[Box<[Group]>]>,
}

impl TransitionTable {
    /// 256 byte states plus the start state.
    pub const STATE_COUNT: usize = 257;

    /// Build from raw packed codes, indexed as `rows[state][group][code]`.
    pub fn from_raw(rows: Vec<Vec<Vec<u32>>>) -> Result<Self, TableError> {
        let rows = rows
            .into_iter()
            .map(|groups| {
                groups
                    .into_iter()
                    .map(|codes| codes.into_iter().map(CandidateCode::from_raw).collect())
                    .collect()
            })
            .collect();
        Self::from_rows(rows)
    }

    pub fn from_rows(rows: Vec<Vec<Vec<CandidateCode>>>) -> Result<Self, TableError> {
        if rows.len() != Self::STATE_COUNT {
            return Err(TableError::StateCount {
                expected: Self::STATE_COUNT,
                found: rows.len(),
            });
        }

        let rows: Box<[Box<[Group]>]> = rows
            .into_iter()
            .map(|groups| groups.into_iter().map(Vec::into_boxed_slice).collect())
            .collect();
        Ok(TransitionTable { rows })
    }

    /// Parse the JSON form: an array of 257 rows of groups of packed codes.
    pub fn from_json(text: &str) -> Result<Self, TableError> {
        Self::from_rows(serde_json::from_str(text)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        Self::from_rows(serde_json::from_reader(reader)?)
    }

    pub fn load(path: &Path) -> Result<Self, TableError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Serialize back into the JSON form accepted by [`Self::from_json`].
    pub fn to_json(&self) -> Result<String, TableError> {
        Ok(serde_json::to_string(&self.rows)?)
    }

    pub fn groups(&self, key: StateKey) -> &[Group] {
        &self.rows[key.index()]
    }

    /// All codes reachable from `key`, groups flattened in table order.
    pub fn candidates(&self, key: StateKey) -> impl Iterator<Item = CandidateCode> + '_ {
        self.groups(key).iter().flat_map(|group| group.iter().copied())
    }

    /// Whether `byte` may be emitted after `key` once `prefix_len` bytes
    /// exist, without writing any register in `preserve`.
    pub fn allows(
        &self,
        key: StateKey,
        byte: u8,
        prefix_len: usize,
        preserve: RegisterMask,
    ) -> bool {
        self.candidates(key).any(|code| {
            code.byte() == byte && code.min_prefix() <= prefix_len && !code.writes_any(preserve)
        })
    }
}

/// Incremental construction of a [`TransitionTable`].
#[derive(Debug, Clone)]
pub struct TableBuilder {
    rows: Vec<Vec<Group>>,
}

impl Default for TableBuilder {
    fn default() -> Self {
        TableBuilder {
            rows: vec![Vec::new(); TransitionTable::STATE_COUNT],
        }
    }
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a group to the row of `key`.
    pub fn group<I>(mut self, key: StateKey, codes: I) -> Self
    where
        I: IntoIterator<Item = CandidateCode>,
    {
        self.rows[key.index()].push(codes.into_iter().collect());
        self
    }

    /// Append the same group to every row.
    pub fn group_everywhere<I>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = CandidateCode>,
    {
        let group: Group = codes.into_iter().collect();
        for row in &mut self.rows {
            row.push(group.clone());
        }
        self
    }

    pub fn build(self) -> TransitionTable {
        TransitionTable {
            rows: self.rows.into_iter().map(Vec::into_boxed_slice).collect(),
        }
    }
}
