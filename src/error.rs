//! Error taxonomy for cartridge loading.
//!
//! Only the two fatal-to-session kinds are modeled as a propagated `Result`; the
//! remaining recovery policies (soft-NOP on unknown opcodes, dropped writes, reads
//! that return 0) are handled in place by the Bus/PPU/CPU and logged via `log`
//! rather than threaded through as errors, matching their "recovery" column.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum NesError {
    #[error("not a valid iNES image: {0}")]
    InvalidFormat(String),

    #[error("unsupported mapper {0}")]
    UnsupportedMapper(u8),
}
