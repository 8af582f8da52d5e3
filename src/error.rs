// SPDX-License-Identifier: MIT
//
// `Pool::new` is the only entry point that returns a `Result` — the
// hot-path operations (`allocate`/`release`/`resize`) keep returning raw
// pointers, failing as a null return, to stay branch-minimal and match
// the convention that allocation failure is a value, not an exception.
// System-allocator exhaustion and a foreign pointer arriving while the
// `fallback` feature is off are both reported that way, as a null return
// from the call that hit them, rather than as `PoolError` variants.

use std::fmt;

/// Errors surfaced by [`crate::Pool::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// `block_size` was not a power of two, or was smaller than a pointer.
    InvalidBlockSize { block_size: usize },
    /// The platform memory provider could not reserve the arena.
    ReservationFailed { bytes: usize },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBlockSize { block_size } => write!(
                f,
                "block size {block_size} must be a power of two no smaller than a pointer"
            ),
            Self::ReservationFailed { bytes } => {
                write!(f, "failed to reserve {bytes} bytes from the platform memory provider")
            }
        }
    }
}

impl std::error::Error for PoolError {}
