// SPDX-License-Identifier: MIT
//
// System-allocator fallback for requests larger than the block
// size, or issued while the pool is saturated. Goes straight to the
// platform's native allocator — libc malloc/realloc/free on Unix, the
// default process heap on Windows — rather than Rust's `GlobalAlloc`,
// because `Pool::release`/`Pool::resize` only ever receive a pointer, no
// remembered `Layout`, and the native allocators don't need one either.

#[cfg(unix)]
mod imp {
    use std::os::raw::c_void;

    pub(crate) unsafe fn alloc(size: usize) -> *mut u8 {
        unsafe { libc::malloc(size) as *mut u8 }
    }

    pub(crate) unsafe fn dealloc(ptr: *mut u8) {
        unsafe { libc::free(ptr as *mut c_void) }
    }

    pub(crate) unsafe fn realloc(ptr: *mut u8, new_size: usize) -> *mut u8 {
        unsafe { libc::realloc(ptr as *mut c_void, new_size) as *mut u8 }
    }
}

#[cfg(windows)]
mod imp {
    use windows_sys::Win32::System::Memory::{GetProcessHeap, HeapAlloc, HeapFree, HeapReAlloc};

    pub(crate) unsafe fn alloc(size: usize) -> *mut u8 {
        unsafe {
            let heap = GetProcessHeap();
            if heap == 0 {
                return std::ptr::null_mut();
            }
            HeapAlloc(heap, 0, size) as *mut u8
        }
    }

    pub(crate) unsafe fn dealloc(ptr: *mut u8) {
        unsafe {
            let heap = GetProcessHeap();
            if heap != 0 {
                HeapFree(heap, 0, ptr as *const core::ffi::c_void);
            }
        }
    }

    pub(crate) unsafe fn realloc(ptr: *mut u8, new_size: usize) -> *mut u8 {
        unsafe {
            let heap = GetProcessHeap();
            if heap == 0 {
                return std::ptr::null_mut();
            }
            HeapReAlloc(heap, 0, ptr as *const core::ffi::c_void, new_size) as *mut u8
        }
    }
}

#[cfg(not(any(unix, windows)))]
mod imp {
    // No native malloc/free that skips size tracking is available here;
    // fall back to Rust's global allocator with a side table remembering
    // each live allocation's `Layout` so `dealloc`/`realloc` can
    // reconstruct it. Unlike the pool's own arena, this path does carry
    // per-pointer metadata — the one place in the crate that does.
    use std::alloc::{self, Layout};
    use std::cell::RefCell;
    use std::collections::HashMap;

    const ALIGN: usize = std::mem::align_of::<u128>();

    thread_local! {
        static SIZES: RefCell<HashMap<usize, usize>> = RefCell::new(HashMap::new());
    }

    fn layout_for(size: usize) -> Layout {
        Layout::from_size_align(size.max(1), ALIGN).expect("fallback allocation too large")
    }

    pub(crate) unsafe fn alloc(size: usize) -> *mut u8 {
        let ptr = unsafe { alloc::alloc(layout_for(size)) };
        if !ptr.is_null() {
            SIZES.with(|s| s.borrow_mut().insert(ptr as usize, size));
        }
        ptr
    }

    pub(crate) unsafe fn dealloc(ptr: *mut u8) {
        if let Some(size) = SIZES.with(|s| s.borrow_mut().remove(&(ptr as usize))) {
            unsafe { alloc::dealloc(ptr, layout_for(size)) };
        }
    }

    pub(crate) unsafe fn realloc(ptr: *mut u8, new_size: usize) -> *mut u8 {
        let Some(old_size) = SIZES.with(|s| s.borrow_mut().remove(&(ptr as usize))) else {
            return std::ptr::null_mut();
        };
        let new_ptr = unsafe { alloc::realloc(ptr, layout_for(old_size), new_size) };
        if !new_ptr.is_null() {
            SIZES.with(|s| s.borrow_mut().insert(new_ptr as usize, new_size));
        }
        new_ptr
    }
}

pub(crate) use imp::{alloc, dealloc, realloc};
