// SPDX-License-Identifier: MIT
//
// The pool engine: arena reservation, O(1) allocate/release against
// the embedded free list, the resize transition table, and the system
// fallback for anything that doesn't fit a block.
//
// `Pool` holds only `NonNull<u8>` and plain integers, so it is neither
// `Send` nor `Sync` — sharing one across threads without external
// synchronization is a compile error, not a runtime hazard.

use std::mem::size_of;
use std::ptr::NonNull;

use crate::counters::Counters;
use crate::error::PoolError;
use crate::fallback;
use crate::freelist::FreeList;
use crate::platform;

#[cfg(feature = "secure-zero")]
use crate::securezero::secure_zero;

const PTR_SIZE: usize = size_of::<*mut u8>();

/// A fixed-size-block memory pool.
///
/// Requests at or under `block_size` are served from a pre-reserved arena
/// in constant time. Larger requests, and requests made once the arena is
/// exhausted, fall through to the system allocator when the `fallback`
/// feature is enabled (the default); otherwise they fail with a null
/// pointer.
///
/// Not thread-safe: `allocate`, `release`, and `resize` all mutate the
/// free list without locking. Share a `Pool` across threads only behind
/// your own mutex.
#[derive(Debug, PartialEq)]
pub struct Pool {
    data: NonNull<u8>,
    block_size: usize,
    block_count: usize,
    total_bytes: usize,
    free: FreeList,
    free_count: usize,
    counters: Counters,
}

/// Point-in-time snapshot of a pool's occupancy and traffic.
#[derive(Debug, Clone, Copy)]
pub struct PoolStatus {
    pub block_size: usize,
    pub block_count: usize,
    pub free_blocks: usize,
    pub used_blocks: usize,
    pub total_bytes: usize,
    pub counters: Counters,
}

impl Pool {
    /// Reserve an arena of `block_count` blocks of `block_size` bytes each.
    ///
    /// `block_size` must be a power of two at least as wide as a pointer,
    /// so every block can host a free-list link word. `block_count` of
    /// zero is legal and produces a pool that always falls through to the
    /// system allocator.
    pub fn new(block_count: usize, block_size: usize) -> Result<Self, PoolError> {
        if !block_size.is_power_of_two() || block_size < PTR_SIZE {
            return Err(PoolError::InvalidBlockSize { block_size });
        }

        let total_bytes = block_size
            .checked_mul(block_count)
            .ok_or(PoolError::ReservationFailed { bytes: usize::MAX })?;

        let data = if block_count == 0 {
            NonNull::dangling()
        } else {
            let ptr = platform::reserve(total_bytes)
                .ok_or(PoolError::ReservationFailed { bytes: total_bytes })?;
            // `reserve` never returns null on success.
            unsafe { NonNull::new_unchecked(ptr) }
        };

        let mut free = FreeList::new();
        for i in (0..block_count).rev() {
            let block = unsafe { data.as_ptr().add(i * block_size) };
            let block = unsafe { NonNull::new_unchecked(block) };
            unsafe { free.push(block) };
        }

        log::debug!(
            "pool reserved: block_size={block_size} block_count={block_count} total_bytes={total_bytes}"
        );

        Ok(Self {
            data,
            block_size,
            block_count,
            total_bytes,
            free,
            free_count: block_count,
            counters: Counters::new(),
        })
    }

    /// `true` if `ptr` falls within this pool's arena.
    ///
    /// Constant time: a single contiguous-range comparison, independent
    /// of how many blocks are currently free or allocated.
    pub fn contains(&self, ptr: *const u8) -> bool {
        if self.total_bytes == 0 {
            return false;
        }
        let start = self.data.as_ptr() as usize;
        let end = start + self.total_bytes;
        let p = ptr as usize;
        p >= start && p < end
    }

    /// Serve `size` bytes, from the free list if it fits a block and one
    /// is free, otherwise from the system fallback.
    ///
    /// Returns null on failure: allocator exhaustion, an oversize request
    /// with the `fallback` feature disabled, or a fallback failure.
    pub fn allocate(&mut self, size: usize) -> *mut u8 {
        if size <= self.block_size && !self.free.is_empty() {
            let block = unsafe { self.free.pop() }.expect("checked non-empty above");
            self.free_count -= 1;
            self.counters.record_hit(size);
            return block.as_ptr();
        }

        self.counters.record_miss(size);
        self.system_alloc(size)
    }

    #[cfg(feature = "fallback")]
    fn system_alloc(&self, size: usize) -> *mut u8 {
        unsafe { fallback::alloc(size) }
    }

    #[cfg(not(feature = "fallback"))]
    fn system_alloc(&self, _size: usize) -> *mut u8 {
        std::ptr::null_mut()
    }

    /// Return a block to the pool, or to the system allocator if it was
    /// never pool-owned. A null pointer is a no-op, matching `free`.
    pub fn release(&mut self, ptr: *mut u8) {
        let Some(block) = NonNull::new(ptr) else {
            return;
        };

        if self.contains(block.as_ptr()) {
            self.counters.record_hit(self.block_size);
            self.release_owned(block);
            return;
        }

        // The byte size of a foreign allocation isn't known here — the
        // pool keeps no metadata about pointers it didn't carve — so
        // only the call count advances, not the byte volume.
        self.counters.record_miss(0);
        self.release_foreign(block);
    }

    fn release_owned(&mut self, block: NonNull<u8>) {
        #[cfg(feature = "secure-zero")]
        unsafe {
            let tail = block.as_ptr().add(PTR_SIZE);
            secure_zero(tail, self.block_size - PTR_SIZE);
        }
        unsafe { self.free.push(block) };
        self.free_count += 1;
    }

    #[cfg(feature = "fallback")]
    fn release_foreign(&mut self, block: NonNull<u8>) {
        unsafe { fallback::dealloc(block.as_ptr()) };
    }

    #[cfg(not(feature = "fallback"))]
    fn release_foreign(&mut self, _block: NonNull<u8>) {
        log::warn!("release of a foreign pointer ignored: fallback feature is disabled");
    }

    /// Grow or shrink a previously returned allocation, following the
    /// same case table as the scripting-runtime allocator convention this
    /// crate adapts to in [`crate::lua_style_alloc`]:
    ///
    /// | `ptr`    | `new_size` | behavior                                   |
    /// |----------|------------|---------------------------------------------|
    /// | null     | 0          | no-op, returns null                          |
    /// | null     | > 0        | equivalent to `allocate(new_size)`           |
    /// | non-null | 0          | equivalent to `release(ptr)`, returns null   |
    /// | pool     | ≤ block    | unchanged, same pointer returned              |
    /// | pool     | > block    | migrate to the fallback, truncate to `block_size` bytes |
    /// | foreign  | any        | delegate to the system reallocator           |
    pub fn resize(&mut self, ptr: *mut u8, old_size: usize, new_size: usize) -> *mut u8 {
        let Some(block) = NonNull::new(ptr) else {
            return if new_size == 0 {
                std::ptr::null_mut()
            } else {
                self.allocate(new_size)
            };
        };

        if new_size == 0 {
            self.release(block.as_ptr());
            return std::ptr::null_mut();
        }

        if self.contains(block.as_ptr()) {
            if new_size <= self.block_size {
                self.counters.record_hit(new_size);
                return block.as_ptr();
            }
            return self.migrate_out(block, new_size);
        }

        self.counters.record_miss(new_size);
        self.resize_foreign(block, old_size, new_size)
    }

    /// Move a block that outgrew its slot to the system allocator,
    /// copying at most `block_size` live bytes before freeing the slot.
    fn migrate_out(&mut self, block: NonNull<u8>, new_size: usize) -> *mut u8 {
        self.counters.record_miss(new_size);
        let new_ptr = self.system_alloc(new_size);
        if new_ptr.is_null() {
            return std::ptr::null_mut();
        }
        let copy_len = self.block_size.min(new_size);
        unsafe { std::ptr::copy_nonoverlapping(block.as_ptr(), new_ptr, copy_len) };
        self.release_owned(block);
        new_ptr
    }

    #[cfg(feature = "fallback")]
    fn resize_foreign(&mut self, block: NonNull<u8>, _old_size: usize, new_size: usize) -> *mut u8 {
        unsafe { fallback::realloc(block.as_ptr(), new_size) }
    }

    #[cfg(not(feature = "fallback"))]
    fn resize_foreign(&mut self, _block: NonNull<u8>, _old_size: usize, _new_size: usize) -> *mut u8 {
        log::warn!("resize of a foreign pointer rejected: fallback feature is disabled");
        std::ptr::null_mut()
    }

    /// Snapshot of occupancy and, if the `profiling` feature is enabled,
    /// traffic counters.
    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            block_size: self.block_size,
            block_count: self.block_count,
            free_blocks: self.free_count,
            used_blocks: self.block_count - self.free_count,
            total_bytes: self.total_bytes,
            counters: self.counters,
        }
    }

    /// The traffic counters alone.
    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn block_count(&self) -> usize {
        self.block_count
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        if self.total_bytes > 0 {
            unsafe { platform::release(self.data.as_ptr(), self.total_bytes) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_non_power_of_two_block_size() {
        assert_eq!(
            Pool::new(4, 24),
            Err(PoolError::InvalidBlockSize { block_size: 24 })
        );
    }

    #[test]
    fn new_rejects_block_smaller_than_pointer() {
        let tiny = PTR_SIZE / 2;
        if tiny.is_power_of_two() && tiny > 0 {
            assert_eq!(
                Pool::new(4, tiny),
                Err(PoolError::InvalidBlockSize { block_size: tiny })
            );
        }
    }

    #[test]
    fn zero_block_count_is_legal_and_always_misses() {
        let mut pool = Pool::new(0, 32).unwrap();
        assert_eq!(pool.status().free_blocks, 0);
        let p = pool.allocate(16);
        assert!(!p.is_null());
        pool.release(p);
    }

    #[test]
    fn allocate_and_release_round_trip() {
        let mut pool = Pool::new(4, 32).unwrap();
        let a = pool.allocate(32);
        assert!(!a.is_null());
        assert!(pool.contains(a));
        assert_eq!(pool.status().free_blocks, 3);
        pool.release(a);
        assert_eq!(pool.status().free_blocks, 4);
    }

    #[test]
    fn saturated_pool_falls_back() {
        let mut pool = Pool::new(1, 32).unwrap();
        let a = pool.allocate(32);
        let b = pool.allocate(32);
        assert!(!a.is_null());
        assert!(!b.is_null());
        assert!(pool.contains(a));
        assert!(!pool.contains(b));
        pool.release(a);
        pool.release(b);
    }

    #[test]
    fn resize_null_to_zero_is_noop() {
        let mut pool = Pool::new(2, 32).unwrap();
        assert!(pool.resize(std::ptr::null_mut(), 0, 0).is_null());
    }

    #[test]
    fn resize_null_to_nonzero_allocates() {
        let mut pool = Pool::new(2, 32).unwrap();
        let p = pool.resize(std::ptr::null_mut(), 0, 16);
        assert!(!p.is_null());
        pool.release(p);
    }

    #[test]
    fn resize_to_zero_releases() {
        let mut pool = Pool::new(2, 32).unwrap();
        let p = pool.allocate(32);
        assert!(pool.resize(p, 32, 0).is_null());
        assert_eq!(pool.status().free_blocks, 2);
    }

    #[test]
    fn resize_within_block_is_identity() {
        let mut pool = Pool::new(2, 32).unwrap();
        let p = pool.allocate(16);
        let q = pool.resize(p, 16, 30);
        assert_eq!(p, q);
        pool.release(q);
    }

    #[test]
    fn resize_across_boundary_migrates_and_frees_slot() {
        let mut pool = Pool::new(2, 32).unwrap();
        let p = pool.allocate(32);
        unsafe { std::ptr::write_bytes(p, 0xAB, 32) };
        let q = pool.resize(p, 32, 64);
        assert!(!q.is_null());
        assert!(!pool.contains(q));
        assert_eq!(pool.status().free_blocks, 2);
        let copied = unsafe { std::slice::from_raw_parts(q, 32) };
        assert!(copied.iter().all(|&b| b == 0xAB));
        pool.release(q);
    }

    #[test]
    fn contains_rejects_foreign_pointers() {
        let pool = Pool::new(2, 32).unwrap();
        let mut local = 0u8;
        assert!(!pool.contains(&mut local as *mut u8));
    }
}
