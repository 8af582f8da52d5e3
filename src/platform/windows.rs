// SPDX-License-Identifier: MIT
//
// Windows arena backend: commit+reserve virtual pages directly. No named
// file mapping is involved — the arena is private to this process.

use windows_sys::Win32::System::Memory::{
    VirtualAlloc, VirtualFree, MEM_COMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_READWRITE,
};

pub(crate) fn reserve(bytes: usize) -> Option<*mut u8> {
    let mem = unsafe { VirtualAlloc(std::ptr::null(), bytes, MEM_COMMIT | MEM_RESERVE, PAGE_READWRITE) };
    if mem.is_null() {
        return None;
    }
    Some(mem as *mut u8)
}

pub(crate) unsafe fn release(ptr: *mut u8, _bytes: usize) {
    unsafe { VirtualFree(ptr as *mut core::ffi::c_void, 0, MEM_RELEASE) };
}
