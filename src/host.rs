// SPDX-License-Identifier: MIT
//
// Adapter for the 4-argument `(ud, ptr, osize, nsize)` allocator callback
// convention scripting-runtime hosts expect (Lua's `lua_Alloc` is the
// namesake shape). The case table this dispatches to is exactly
// `Pool::resize`'s, so the adapter is a thin, `extern "C"`-callable shim.

use std::ffi::c_void;

use crate::pool::Pool;

/// Host-callable allocator function matching the `lua_Alloc` signature.
///
/// `ud` must point at a live [`Pool`] for the duration of the call; the
/// caller (the embedding host) is responsible for that pointer's
/// lifetime, exactly as it is for the userdata Lua passes through
/// `lua_Alloc`.
///
/// # Safety
/// `ud` must be a non-null, properly aligned `*mut Pool` that outlives
/// this call and is not concurrently accessed elsewhere — `Pool` is not
/// thread-safe.
pub unsafe extern "C" fn lua_style_alloc(
    ud: *mut c_void,
    ptr: *mut c_void,
    osize: usize,
    nsize: usize,
) -> *mut c_void {
    if ud.is_null() {
        return std::ptr::null_mut();
    }
    let pool = unsafe { &mut *(ud as *mut Pool) };
    let out = pool.resize(ptr as *mut u8, osize, nsize);
    out as *mut c_void
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_allocates_and_frees_through_a_raw_userdata_pointer() {
        let mut pool = Pool::new(2, 32).unwrap();
        let ud = &mut pool as *mut Pool as *mut c_void;

        let p = unsafe { lua_style_alloc(ud, std::ptr::null_mut(), 0, 16) };
        assert!(!p.is_null());

        let freed = unsafe { lua_style_alloc(ud, p, 16, 0) };
        assert!(freed.is_null());
    }

    #[test]
    fn adapter_rejects_null_userdata() {
        let p = unsafe { lua_style_alloc(std::ptr::null_mut(), std::ptr::null_mut(), 0, 16) };
        assert!(p.is_null());
    }
}
