//! Sled generation and verification.

pub mod constraints;
pub mod generator;
pub mod request;
pub mod verify;

pub use constraints::{strip_hex_prefix, ByteSet, SledConstraints};
pub use generator::{generate_sled, FirstTie, SledGenerator, SledStats, TieBreaker};
pub use request::SledRequest;
pub use verify::verify_sled;
