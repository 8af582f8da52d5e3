// SPDX-License-Identifier: MIT
//
// POSIX arena backend: one anonymous private mapping, not backed by any
// file or shared-memory name. On Linux/Android it is locked into physical
// memory when it fits inside RLIMIT_MEMLOCK; on other Unixes (including
// macOS) it is locked unconditionally on a best-effort basis, mirroring
// the platform split in the pool's original C ancestor.

use std::ptr;

#[cfg(any(target_os = "linux", target_os = "android"))]
pub(crate) fn reserve(bytes: usize) -> Option<*mut u8> {
    let mut flags = libc::MAP_PRIVATE | libc::MAP_ANON | libc::MAP_NORESERVE;

    let mut rl: libc::rlimit = unsafe { std::mem::zeroed() };
    if unsafe { libc::getrlimit(libc::RLIMIT_MEMLOCK, &mut rl) } == 0
        && (bytes as libc::rlim_t) <= rl.rlim_cur
    {
        flags |= libc::MAP_LOCKED;
    }

    let mem = unsafe {
        libc::mmap(
            ptr::null_mut(),
            bytes,
            libc::PROT_READ | libc::PROT_WRITE,
            flags,
            -1,
            0,
        )
    };
    if mem == libc::MAP_FAILED {
        return None;
    }
    Some(mem as *mut u8)
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub(crate) fn reserve(bytes: usize) -> Option<*mut u8> {
    let flags = libc::MAP_PRIVATE | libc::MAP_ANON;
    let mem = unsafe {
        libc::mmap(
            ptr::null_mut(),
            bytes,
            libc::PROT_READ | libc::PROT_WRITE,
            flags,
            -1,
            0,
        )
    };
    if mem == libc::MAP_FAILED {
        return None;
    }
    // Best-effort: a failed mlock does not fail the reservation.
    unsafe { libc::mlock(mem, bytes) };
    Some(mem as *mut u8)
}

pub(crate) unsafe fn release(ptr: *mut u8, bytes: usize) {
    unsafe { libc::munmap(ptr as *mut libc::c_void, bytes) };
}
