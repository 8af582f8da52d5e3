// SPDX-License-Identifier: MIT
//
// Fixed-size-block memory pool allocator for embedding scripting-runtime
// hosts. Small requests are served in constant time from a pre-reserved
// contiguous arena; anything larger than the configured block size falls
// through to the system allocator. Not thread-safe by design — see
// `Pool`'s docs for the rationale.

mod counters;
mod error;
mod fallback;
mod freelist;
mod host;
mod platform;
mod pool;
mod securezero;

pub use counters::Counters;
pub use error::PoolError;
pub use host::lua_style_alloc;
pub use pool::{Pool, PoolStatus};
