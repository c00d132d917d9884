// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{
    ffi::{CStr, CString},
    slice, str,
};

use nix::libc::c_char;

use crate::result::{DmError, DmResult, ErrorEnum};

/// Convert from a &[c_char] to a &[u8].
pub fn byte_slice_from_c_str(c_str: &[c_char]) -> &[u8] {
    unsafe { slice::from_raw_parts(c_str as *const _ as *const u8, c_str.len()) }
}

/// Return a &str parsed from the C string buffer up to the first \0, or None
pub fn str_from_c_str(slc: &[c_char]) -> Option<&str> {
    let slc = byte_slice_from_c_str(slc);
    slc.iter()
        .position(|c| *c == b'\0')
        .and_then(|i| str::from_utf8(&slc[..i]).ok())
}

/// Copy a NUL-terminated string owned by the native library.
/// Returns None for a NULL pointer. Invalid UTF-8 is replaced.
///
/// # Safety
///
/// `ptr` must be NULL or point to a NUL-terminated string.
pub unsafe fn string_from_ptr(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

/// Prepare a string argument for the native library. `what` names the
/// argument in the error.
pub fn to_cstring(value: &str, what: &str) -> DmResult<CString> {
    CString::new(value).map_err(|_| {
        DmError::Dm(
            ErrorEnum::Invalid,
            format!("{what} {value:?} contains a NUL byte."),
        )
    })
}
