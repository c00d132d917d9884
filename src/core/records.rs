// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Decoders for the variable-length record lists that libdevmapper returns
//! from LIST, LIST_VERSIONS and DEPS tasks. The lists live in the task's
//! ioctl buffer; every record carries the offset of its successor.

use std::{ffi::CStr, marker::PhantomData, ptr};

use nix::libc::c_char;
use semver::Version;

use devmapper_sys as dms;

use crate::core::device::Device;

/// One kind of record in a linked native list.
pub trait ChainedRecord {
    /// The decoded record.
    type Item;

    /// Decode the record at `ptr`, returning it and the offset from `ptr`
    /// to the next record.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a complete record.
    unsafe fn decode(ptr: *const u8) -> (Self::Item, u32);

    /// Whether the record at the head of a list says the list is empty.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a complete record.
    unsafe fn is_empty_head(ptr: *const u8) -> bool;
}

unsafe fn name_at(ptr: *const u8, offset: usize) -> String {
    CStr::from_ptr(ptr.add(offset) as *const c_char)
        .to_string_lossy()
        .into_owned()
}

/// A `dm_names` record: a device name and its number.
pub struct NameRecord;

impl ChainedRecord for NameRecord {
    type Item = (String, Device);

    unsafe fn decode(ptr: *const u8) -> (Self::Item, u32) {
        let head = ptr::read_unaligned(ptr as *const dms::dm_names);
        // the kernel's "huge" encoding uses only the low 32 bits
        let dev = Device::from_kdev_t(head.dev as u32);
        ((name_at(ptr, dms::DM_NAMES_NAME_OFFSET), dev), head.next)
    }

    unsafe fn is_empty_head(ptr: *const u8) -> bool {
        ptr::read_unaligned(ptr as *const dms::dm_names).dev == 0
    }
}

/// A `dm_versions` record: a target type and its version.
pub struct VersionRecord;

impl ChainedRecord for VersionRecord {
    type Item = (String, Version);

    unsafe fn decode(ptr: *const u8) -> (Self::Item, u32) {
        let head = ptr::read_unaligned(ptr as *const dms::dm_versions);
        let [major, minor, patch] = head.version;
        let version = Version::new(u64::from(major), u64::from(minor), u64::from(patch));
        ((name_at(ptr, dms::DM_VERSIONS_NAME_OFFSET), version), head.next)
    }

    unsafe fn is_empty_head(ptr: *const u8) -> bool {
        *ptr.add(dms::DM_VERSIONS_NAME_OFFSET) == 0
    }
}

/// A lazy walk over a native record list.
///
/// The walk ends when advancing by a record's offset leads back to that
/// same record, which is how the last record of every list is marked.
pub struct RecordChain<'a, R> {
    next: Option<*const u8>,
    _marker: PhantomData<(&'a u8, R)>,
}

impl<'a, R: ChainedRecord> RecordChain<'a, R> {
    /// Start a walk at `head`. A NULL head yields nothing.
    ///
    /// # Safety
    ///
    /// `head` must be NULL or the first record of a well-formed list that
    /// stays valid for `'a`.
    pub unsafe fn new(head: *const u8) -> RecordChain<'a, R> {
        let next = if head.is_null() || R::is_empty_head(head) {
            None
        } else {
            Some(head)
        };
        RecordChain {
            next,
            _marker: PhantomData,
        }
    }
}

impl<'a, R: ChainedRecord> Iterator for RecordChain<'a, R> {
    type Item = R::Item;

    fn next(&mut self) -> Option<R::Item> {
        let current = self.next?;
        let (item, offset) = unsafe { R::decode(current) };
        let successor = current.wrapping_add(offset as usize);
        self.next = if successor == current {
            None
        } else {
            Some(successor)
        };
        Some(item)
    }
}

/// Decode a `dm_deps` record into the devices it lists.
///
/// # Safety
///
/// `ptr` must be NULL or point to a complete `dm_deps` record.
pub unsafe fn decode_deps(ptr: *const u8) -> Vec<Device> {
    if ptr.is_null() {
        return Vec::new();
    }
    let head = ptr::read_unaligned(ptr as *const dms::dm_deps);
    let devices = ptr.add(dms::DM_DEPS_DEVICE_OFFSET) as *const u64;
    (0..head.count as usize)
        .map(|i| Device::from_kdev_t(ptr::read_unaligned(devices.add(i)) as u32))
        .collect()
}
