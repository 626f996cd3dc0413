//! End-to-end properties of generated sleds over the default single-byte
//! table: length, forbidden bytes, preserved registers, byte balance and
//! clean decoding from every entry offset.

use std::sync::Arc;
use std::thread;

use nopsled::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Bytes of the default table that `constraints` still allows.
fn allowed_bytes(table: &TransitionTable, constraints: &SledConstraints) -> Vec<u8> {
    table
        .candidates(StateKey::Start)
        .filter(|code| constraints.admits(*code, 0))
        .map(|code| code.byte())
        .collect()
}

fn random_constraints(rng: &mut ChaCha20Rng) -> SledConstraints {
    let mut constraints = SledConstraints::new();
    for reg in Register::ALL.iter().take(8) {
        if rng.gen_bool(0.25) {
            constraints = constraints.preserve(*reg);
        }
    }
    let forbidden: Vec<u8> = (0..rng.gen_range(0..12)).map(|_| rng.gen()).collect();
    constraints.forbid(&forbidden)
}

#[test]
fn test_zero_length_always_empty() {
    let table = default_table().unwrap();
    let mut rng = ChaCha20Rng::seed_from_u64(1);
    for _ in 0..50 {
        let constraints = random_constraints(&mut rng);
        let sled = generate_sled(0, &constraints, &table, &mut rng).unwrap();
        assert!(sled.is_empty());
    }
}

#[test]
fn test_random_constraints_hold() {
    let table = default_table().unwrap();
    let mut rng = ChaCha20Rng::seed_from_u64(0xC0FFEE);

    for _ in 0..200 {
        let constraints = random_constraints(&mut rng);
        let length = rng.gen_range(1..256);
        let sled = generate_sled(length, &constraints, &table, &mut rng).unwrap();

        assert_eq!(sled.len(), length);
        assert!(sled.iter().all(|b| !constraints.forbidden.contains(*b)));
        assert_eq!(verify_sled(&table, &sled, &constraints), Ok(()));
        for byte in &sled {
            let code = table
                .candidates(StateKey::Start)
                .find(|code| code.byte() == *byte)
                .unwrap();
            assert!(!code.clobbers().intersects(constraints.preserve), "0x{byte:02x}");
        }
    }
}

#[test]
fn test_stack_registers_preserved() {
    let table = default_table().unwrap();
    let constraints = SledConstraints::new()
        .preserve_names(["esp", "ebp"])
        .unwrap();
    let mut rng = ChaCha20Rng::seed_from_u64(5);
    let sled = generate_sled(4096, &constraints, &table, &mut rng).unwrap();

    // inc/dec esp/ebp and xchg eax with esp/ebp
    for byte in [0x44, 0x45, 0x4c, 0x4d, 0x94, 0x95] {
        assert!(!sled.contains(&byte), "0x{byte:02x} writes esp or ebp");
    }
}

#[test]
fn test_every_offset_falls_through() {
    let table = default_table().unwrap();
    let constraints = SledConstraints::new().preserve(Register::Esp).forbid(&[0x00]);
    let mut rng = ChaCha20Rng::seed_from_u64(77);
    let sled = generate_sled(512, &constraints, &table, &mut rng).unwrap();

    assert_eq!(check_fallthrough(&sled), Ok(()));
    for entry in [0, 1, 255, 511] {
        let decoded = disassemble(&sled, entry);
        assert_eq!(decoded.len(), sled.len() - entry);
        assert!(decoded.iter().all(|insn| insn.falls_through));
    }
}

#[test]
fn test_first_tie_is_deterministic() {
    let table = default_table().unwrap();
    let constraints = SledConstraints::new().preserve(Register::Ebp).forbid(&[0x90]);
    let a = generate_sled(300, &constraints, &table, &mut FirstTie).unwrap();
    let b = generate_sled(300, &constraints, &table, &mut FirstTie).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_different_seeds_differ() {
    let table = default_table().unwrap();
    let constraints = SledConstraints::new();
    let a = generate_sled(64, &constraints, &table, &mut ChaCha20Rng::seed_from_u64(1)).unwrap();
    let b = generate_sled(64, &constraints, &table, &mut ChaCha20Rng::seed_from_u64(2)).unwrap();
    assert_ne!(a, b, "different seeds should produce different sleds");
}

#[test]
fn test_byte_usage_balanced() {
    let table = default_table().unwrap();
    let constraints = SledConstraints::new()
        .preserve(Register::Esp)
        .forbid(&[0x40, 0x41, 0x42]);
    let allowed = allowed_bytes(&table, &constraints);
    let mut rng = ChaCha20Rng::seed_from_u64(2024);

    let (sled, stats) = SledGenerator::new(&table)
        .generate_with_stats(1000, &constraints, &mut rng)
        .unwrap();

    let mut counts = [0u32; 256];
    for byte in &sled {
        counts[*byte as usize] += 1;
    }
    let used: Vec<u32> = allowed.iter().map(|b| counts[*b as usize]).collect();
    let spread = used.iter().max().unwrap() - used.iter().min().unwrap();
    assert!(spread <= 1, "usage spread {spread}");
    assert_eq!(stats.distinct_bytes, allowed.len());
    assert_eq!(stats.widest_tie, allowed.len());
}

#[test]
fn test_everything_forbidden_exhausts() {
    let table = default_table().unwrap();
    let everything = allowed_bytes(&table, &SledConstraints::new());
    let constraints = SledConstraints::new().forbid(&everything);
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
fn test_shared_table_across_threads() {
    let table = Arc::new(default_table().unwrap());
    let constraints = SledConstraints::new().preserve(Register::Esp).forbid(&[0x00, 0x0a]);

    thread::scope(|scope| {
        let handles: Vec<_> = (0..8u64)
            .map(|seed| {
                let table = Arc::clone(&table);
                let constraints = constraints.clone();
                scope.spawn(move || {
                    let mut rng = ChaCha20Rng::seed_from_u64(seed);
                    let sled = generate_sled(256, &constraints, &table, &mut rng).unwrap();
                    verify_sled(&table, &sled, &constraints).map(|_| sled.len())
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Ok(256));
        }
    });
}
