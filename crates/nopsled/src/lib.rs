//! nopsled: polymorphic, offset-independent x86 NOP sleds.
//!
//! This crate re-exports [`nopsled_core`]. Most callers only need the
//! prelude:
//!
//! ```
//! use nopsled::prelude::*;
//!
//! let table = default_table().unwrap();
//! let constraints = SledConstraints::new().preserve(Register::Esp);
//! let sled = generate_sled(16, &constraints, &table, &mut FirstTie).unwrap();
//! assert!(verify_sled(&table, &sled, &constraints).is_ok());
//! ```

pub use nopsled_core::*;

pub mod prelude {
    pub use nopsled_core::error::{SledError, SledViolation, TableError};
    pub use nopsled_core::sled::{
        generate_sled, verify_sled, ByteSet, FirstTie, SledConstraints, SledGenerator,
        SledRequest, SledStats, TieBreaker,
    };
    pub use nopsled_core::table::{
        default_table, single_byte_table, CandidateCode, StateKey, TableBuilder, TransitionTable,
    };
    pub use nopsled_core::x86::{check_fallthrough, disassemble, Register, RegisterMask};
}
