//! Greedy, diversity-balancing sled generation.
//!
//! The sled is grown backward from the landing point: the table answers
//! "which byte may sit in front of this one", so the first byte chosen is
//! the last byte of the sled. At each step every candidate of the current
//! state is filtered through the constraints, and the choice is made among
//! the legal byte values that have been used the least so far. There is no
//! backtracking; a step with no legal candidate fails the whole call.

use log::{debug, trace, warn};
use rand::Rng;

use super::constraints::SledConstraints;
use crate::error::SledError;
use crate::table::{StateKey, TransitionTable};

/// Source of tie-break decisions.
pub trait TieBreaker {
    /// Pick an index in `0..len`. `len` is never zero.
    fn pick(&mut self, len: usize) -> usize;
}

impl<R: Rng + ?Sized> TieBreaker for R {
    fn pick(&mut self, len: usize) -> usize {
        self.gen_range(0..len)
    }
}

/// Always takes the first byte of the tie set, which is the first legal
/// least-used byte in table order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstTie;

impl TieBreaker for FirstTie {
    fn pick(&mut self, _len: usize) -> usize {
        0
    }
}

/// Summary of one generated sled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SledStats {
    pub length: usize,
    /// Number of different byte values used.
    pub distinct_bytes: usize,
    /// Largest tie set any step chose from.
    pub widest_tie: usize,
    /// Fewest uses of any byte value that appears in the sled.
    pub min_usage: u32,
    pub max_usage: u32,
}

/// Generates sleds against one shared transition table.
#[derive(Debug, Clone, Copy)]
pub struct SledGenerator<'t> {
    table: &'t TransitionTable,
}

impl<'t> SledGenerator<'t> {
    pub fn new(table: &'t TransitionTable) -> Self {
        SledGenerator { table }
    }

    pub fn table(&self) -> &'t TransitionTable {
        self.table
    }

    /// Generate exactly `length` bytes, or fail with [`SledError::Exhausted`].
    pub fn generate<T>(
        &self,
        length: usize,
        constraints: &SledConstraints,
        ties: &mut T,
    ) -> Result<Vec<u8>, SledError>
    where
        T: TieBreaker + ?Sized,
    {
        self.generate_with_stats(length, constraints, ties)
            .map(|(sled, _)| sled)
    }

    pub fn generate_with_stats<T>(
        &self,
        length: usize,
        constraints: &SledConstraints,
        ties: &mut T,
    ) -> Result<(Vec<u8>, SledStats), SledError>
    where
        T: TieBreaker + ?Sized,
    {
        let mut sled = Vec::with_capacity(length);
        let mut counts = [0u32; 256];
        let mut prev = StateKey::Start;
        let mut widest_tie = 0;
        let mut lows: Vec<u8> = Vec::with_capacity(256);

        // `position` doubles as the prefix length: bytes emitted so far.
        for position in 0..length {
            let mut seen = [false; 256];
            let mut low: Option<u32> = None;
            lows.clear();

            for code in self.table.candidates(prev) {
                if !constraints.admits(code, position) {
                    continue;
                }
                let byte = code.byte();
                if std::mem::replace(&mut seen[byte as usize], true) {
                    continue;
                }

                let count = counts[byte as usize];
                match low {
                    Some(l) if count > l => {}
                    Some(l) if count == l => lows.push(byte),
                    _ => {
                        low = Some(count);
                        lows.clear();
                        lows.push(byte);
                    }
                }
            }

            if lows.is_empty() {
                warn!("sled exhausted at position {position} of {length} after state {prev}");
                return Err(SledError::Exhausted { position, prev });
            }

            let byte = lows[ties.pick(lows.len()) % lows.len()];
            trace!("position {position}: state {prev} -> 0x{byte:02x} ({} tied)", lows.len());

            widest_tie = widest_tie.max(lows.len());
            counts[byte as usize] += 1;
            sled.push(byte);
            prev = StateKey::Byte(byte);
        }

        // Emitted landing-point first; flip so the entry point leads.
        sled.reverse();

        let used = counts.iter().copied().filter(|&c| c > 0);
        let stats = SledStats {
            length,
            distinct_bytes: used.clone().count(),
            widest_tie,
            min_usage: used.clone().min().unwrap_or(0),
            max_usage: used.max().unwrap_or(0),
        };
        debug!(
            "generated {length}-byte sled: {} distinct bytes, usage {}..={}",
            stats.distinct_bytes, stats.min_usage, stats.max_usage
        );

        Ok((sled, stats))
    }
}

/// One-shot form of [`SledGenerator::generate`].
pub fn generate_sled<T>(
    length: usize,
    constraints: &SledConstraints,
    table: &TransitionTable,
    ties: &mut T,
) -> Result<Vec<u8>, SledError>
where
    T: TieBreaker + ?Sized,
{
    SledGenerator::new(table).generate(length, constraints, ties)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{CandidateCode, TableBuilder};
    use crate::x86::{Register, RegisterMask};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn code(byte: u8) -> CandidateCode {
        CandidateCode::new(byte, 0, RegisterMask::EMPTY)
    }

    fn uniform_table(bytes: &[u8]) -> TransitionTable {
        TableBuilder::new()
            .group_everywhere(bytes.iter().map(|&b| code(b)))
            .build()
    }

    /// Scripted tie breaker that records every tie-set size it was offered.
    struct Recording {
        sizes: Vec<usize>,
    }

    impl TieBreaker for Recording {
        fn pick(&mut self, len: usize) -> usize {
            self.sizes.push(len);
            len - 1
        }
    }

    #[test]
    fn test_zero_length_is_empty() {
        let table = TableBuilder::new().build();
        let sled = generate_sled(0, &SledConstraints::new(), &table, &mut FirstTie).unwrap();
        assert!(sled.is_empty());
    }

    #[test]
    fn test_exact_length() {
        let table = uniform_table(&[0x90, 0x40, 0x41]);
        let mut rng = StdRng::seed_from_u64(7);
        for length in [1, 2, 17, 300] {
            let sled = generate_sled(length, &SledConstraints::new(), &table, &mut rng).unwrap();
            assert_eq!(sled.len(), length);
        }
    }

    #[test]
    fn test_first_tie_follows_table_order() {
        let table = uniform_table(&[0x90, 0x40, 0x41]);
        let sled = generate_sled(6, &SledConstraints::new(), &table, &mut FirstTie).unwrap();
        // emitted 90 40 41 90 40 41, then reversed
        assert_eq!(sled, vec![0x41, 0x40, 0x90, 0x41, 0x40, 0x90]);
    }

    #[test]
    fn test_exhaustion_when_only_candidate_forbidden() {
        let table = TableBuilder::new().group(StateKey::Start, [code(0x00)]).build();
        let constraints = SledConstraints::new().forbid(&[0x00]);
        let err = generate_sled(1, &constraints, &table, &mut FirstTie).unwrap_err();
        assert_eq!(
            err,
            SledError::Exhausted {
                position: 0,
                prev: StateKey::Start,
            }
        );
    }

    #[test]
    fn test_exhaustion_reports_position_and_state() {
        // start -> 0x90, but nothing may precede 0x90
        let table = TableBuilder::new().group(StateKey::Start, [code(0x90)]).build();
        let err = generate_sled(3, &SledConstraints::new(), &table, &mut FirstTie).unwrap_err();
        assert_eq!(
            err,
            SledError::Exhausted {
                position: 1,
                prev: StateKey::Byte(0x90),
            }
        );
    }

    #[test]
    fn test_min_prefix_gate() {
        // 0x41 only becomes legal once two bytes exist
        let table = TableBuilder::new()
            .group_everywhere([code(0x90), CandidateCode::new(0x41, 2, RegisterMask::EMPTY)])
            .build();
        let sled = generate_sled(4, &SledConstraints::new(), &table, &mut FirstTie).unwrap();
        // positions 0 and 1 can only take 0x90; after that 0x41 is the
        // less used byte at every step
        assert_eq!(sled, vec![0x41, 0x41, 0x90, 0x90]);
    }

    #[test]
    fn test_protected_register_never_written() {
        let table = TableBuilder::new()
            .group_everywhere([
                code(0x90),
                CandidateCode::new(0x44, 0, Register::Esp.into()),
                CandidateCode::new(0x45, 0, Register::Ebp.into()),
            ])
            .build();
        let constraints = SledConstraints::new().preserve(Register::Esp);
        let mut rng = StdRng::seed_from_u64(11);
        let sled = generate_sled(500, &constraints, &table, &mut rng).unwrap();
        assert!(!sled.contains(&0x44));
        assert!(sled.contains(&0x45));
    }

    #[test]
    fn test_usage_stays_balanced() {
        let bytes = [0x90, 0x40, 0x41, 0x42, 0x43];
        let table = uniform_table(&bytes);
        let mut rng = StdRng::seed_from_u64(3);
        let (sled, stats) = SledGenerator::new(&table)
            .generate_with_stats(1003, &SledConstraints::new(), &mut rng)
            .unwrap();

        let mut counts = [0u32; 256];
        for (i, &b) in sled.iter().rev().enumerate() {
            counts[b as usize] += 1;
            let live: Vec<u32> = bytes.iter().map(|&b| counts[b as usize]).collect();
            let spread = live.iter().max().unwrap() - live.iter().min().unwrap();
            assert!(spread <= 1, "spread {spread} after {} bytes", i + 1);
        }
        assert_eq!(stats.distinct_bytes, bytes.len());
        assert_eq!(stats.max_usage - stats.min_usage, 1);
        assert_eq!(stats.widest_tie, bytes.len());
    }

    #[test]
    fn test_duplicate_codes_count_once() {
        // 0x90 listed three times across groups must not widen the tie set
        let table = TableBuilder::new()
            .group_everywhere([code(0x90), code(0x40)])
            .group_everywhere([code(0x90)])
            .group_everywhere([code(0x90), CandidateCode::new(0x90, 0, Register::Eax.into())])
            .build();
        let mut recording = Recording { sizes: Vec::new() };
        generate_sled(4, &SledConstraints::new(), &table, &mut recording).unwrap();
        assert_eq!(recording.sizes, vec![2, 1, 2, 1]);
    }

    #[test]
    fn test_duplicate_gated_code_still_admits_byte() {
        // the first 0x40 entry writes eax, the second does not
        let table = TableBuilder::new()
            .group(StateKey::Start, [CandidateCode::new(0x40, 0, Register::Eax.into())])
            .group(StateKey::Start, [code(0x40)])
            .build();
        let constraints = SledConstraints::new().preserve(Register::Eax);
        let sled = generate_sled(1, &constraints, &table, &mut FirstTie).unwrap();
        assert_eq!(sled, vec![0x40]);
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let table = uniform_table(&[0x90, 0x40, 0x41, 0x42]);
        let constraints = SledConstraints::new();
        let a = generate_sled(64, &constraints, &table, &mut StdRng::seed_from_u64(99)).unwrap();
        let b = generate_sled(64, &constraints, &table, &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(a, b);
    }
}
