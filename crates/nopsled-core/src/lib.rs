//! Polymorphic x86 NOP sled generation.
//!
//! A sled is a run of bytes that decodes, from *any* entry offset, into
//! harmless instructions falling through to a landing point. Sleds are built
//! from an instruction-transition table ([`table::TransitionTable`]) under
//! two caller constraints: registers that must survive the sled, and byte
//! values that must not appear in it. Among legal choices the generator
//! always prefers the least-used byte value, so byte frequencies stay flat
//! and the output carries no fixed signature.
//!
//! ```
//! use nopsled_core::sled::{SledConstraints, SledGenerator};
//! use nopsled_core::table::default_table;
//! use nopsled_core::x86::Register;
//!
//! let table = default_table().unwrap();
//! let constraints = SledConstraints::new()
//!     .preserve(Register::Esp)
//!     .forbid(&[0x00, 0x0a]);
//! let sled = SledGenerator::new(&table)
//!     .generate(32, &constraints, &mut rand::thread_rng())
//!     .unwrap();
//! assert_eq!(sled.len(), 32);
//! ```

pub mod error;
pub mod sled;
pub mod table;
pub mod x86;

pub use error::{
    ByteSetError, FallthroughError, RegisterError, RequestError, SledError, SledViolation,
    TableError,
};
