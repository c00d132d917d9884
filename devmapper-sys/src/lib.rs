// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Raw declarations for the parts of `libdevmapper` used by `devmapper`.
//!
//! The library is not linked at build time. `LibDevmapper::open` resolves
//! every entry point from the shared object with `libloading`, so a missing
//! library is an ordinary runtime error rather than a link failure.

#![allow(non_camel_case_types)]

use libloading::Library;
use nix::libc::{c_char, c_int, c_void, gid_t, mode_t, size_t, uid_t};

/// Shared object names tried, in order, when loading the library.
pub const LIBDEVMAPPER_SONAMES: &[&str] = &["libdevmapper.so.1.02", "libdevmapper.so"];

pub const DM_NAME_LEN: usize = 128;
pub const DM_UUID_LEN: usize = 129;
pub const DM_MAX_UUID_PREFIX_LEN: usize = 15;

pub const DM_DEVICE_CREATE: c_int = 0;
pub const DM_DEVICE_RELOAD: c_int = 1;
pub const DM_DEVICE_REMOVE: c_int = 2;
pub const DM_DEVICE_REMOVE_ALL: c_int = 3;
pub const DM_DEVICE_SUSPEND: c_int = 4;
pub const DM_DEVICE_RESUME: c_int = 5;
pub const DM_DEVICE_INFO: c_int = 6;
pub const DM_DEVICE_DEPS: c_int = 7;
pub const DM_DEVICE_RENAME: c_int = 8;
pub const DM_DEVICE_VERSION: c_int = 9;
pub const DM_DEVICE_STATUS: c_int = 10;
pub const DM_DEVICE_TABLE: c_int = 11;
pub const DM_DEVICE_WAITEVENT: c_int = 12;
pub const DM_DEVICE_LIST: c_int = 13;
pub const DM_DEVICE_CLEAR: c_int = 14;
pub const DM_DEVICE_MKNODES: c_int = 15;
pub const DM_DEVICE_LIST_VERSIONS: c_int = 16;
pub const DM_DEVICE_TARGET_MSG: c_int = 17;
pub const DM_DEVICE_SET_GEOMETRY: c_int = 18;

/// dm_string_mangling_t
pub const DM_STRING_MANGLING_NONE: c_int = 0;
pub const DM_STRING_MANGLING_AUTO: c_int = 1;
pub const DM_STRING_MANGLING_HEX: c_int = 2;

/// dm_add_node_t
pub const DM_ADD_NODE_ON_RESUME: c_int = 0;
pub const DM_ADD_NODE_ON_CREATE: c_int = 1;

pub const DM_READ_AHEAD_AUTO: u32 = u32::MAX;
pub const DM_READ_AHEAD_NONE: u32 = 0;
pub const DM_READ_AHEAD_MINIMUM_FLAG: u32 = 0x1;

pub const DM_UDEV_FLAGS_SHIFT: u32 = 16;
pub const DM_UDEV_FLAGS_MASK: u32 = 0xFFFF_0000;
pub const DM_UDEV_DISABLE_DM_RULES_FLAG: u16 = 0x0001;
pub const DM_UDEV_DISABLE_SUBSYSTEM_RULES_FLAG: u16 = 0x0002;
pub const DM_UDEV_DISABLE_DISK_RULES_FLAG: u16 = 0x0004;
pub const DM_UDEV_DISABLE_OTHER_RULES_FLAG: u16 = 0x0008;
pub const DM_UDEV_LOW_PRIORITY_FLAG: u16 = 0x0010;
pub const DM_UDEV_DISABLE_LIBRARY_FALLBACK: u16 = 0x0020;
pub const DM_UDEV_PRIMARY_SOURCE_FLAG: u16 = 0x0040;
pub const DM_SUBSYSTEM_UDEV_FLAG0: u16 = 0x0100;
pub const DM_SUBSYSTEM_UDEV_FLAG1: u16 = 0x0200;
pub const DM_SUBSYSTEM_UDEV_FLAG2: u16 = 0x0400;
pub const DM_SUBSYSTEM_UDEV_FLAG3: u16 = 0x0800;
pub const DM_SUBSYSTEM_UDEV_FLAG4: u16 = 0x1000;
pub const DM_SUBSYSTEM_UDEV_FLAG5: u16 = 0x2000;
pub const DM_SUBSYSTEM_UDEV_FLAG6: u16 = 0x4000;
pub const DM_SUBSYSTEM_UDEV_FLAG7: u16 = 0x8000;

pub const DM_STATS_ALL_PROGRAMS: &str = "";
pub const DM_STATS_REGIONS_ALL: u64 = u64::MAX;
pub const DM_STATS_GROUP_NOT_PRESENT: u64 = u64::MAX;
pub const DM_STATS_WALK_REGION: u64 = 0x2_0000_0000_0000;

/// dm_stats_counter_t
pub const DM_STATS_READS_COUNT: c_int = 0;
pub const DM_STATS_READS_MERGED_COUNT: c_int = 1;
pub const DM_STATS_READ_SECTORS_COUNT: c_int = 2;
pub const DM_STATS_READ_NSECS: c_int = 3;
pub const DM_STATS_WRITES_COUNT: c_int = 4;
pub const DM_STATS_WRITES_MERGED_COUNT: c_int = 5;
pub const DM_STATS_WRITE_SECTORS_COUNT: c_int = 6;
pub const DM_STATS_WRITE_NSECS: c_int = 7;
pub const DM_STATS_IO_IN_PROGRESS_COUNT: c_int = 8;
pub const DM_STATS_IO_NSECS: c_int = 9;
pub const DM_STATS_WEIGHTED_IO_NSECS: c_int = 10;
pub const DM_STATS_TOTAL_READ_NSECS: c_int = 11;
pub const DM_STATS_TOTAL_WRITE_NSECS: c_int = 12;

/// Size of the buffers handed to the version getters.
pub const DM_VERSION_BUF_LEN: usize = 64;

#[repr(C)]
pub struct dm_task {
    _private: [u8; 0],
}

#[repr(C)]
pub struct dm_stats {
    _private: [u8; 0],
}

#[repr(C)]
pub struct dm_timestamp {
    _private: [u8; 0],
}

#[repr(C)]
pub struct dm_histogram {
    _private: [u8; 0],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct dm_info {
    pub exists: c_int,
    pub suspended: c_int,
    pub live_table: c_int,
    pub inactive_table: c_int,
    pub open_count: i32,
    pub event_nr: u32,
    pub major: u32,
    pub minor: u32,
    pub read_only: c_int,
    pub target_count: i32,
    pub deferred_remove: c_int,
    pub internal_suspend: c_int,
}

/// Head of a `dm_names` record. The NUL-terminated name follows at
/// `DM_NAMES_NAME_OFFSET`; `next` is relative to the start of this record.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct dm_names {
    pub dev: u64,
    pub next: u32,
}

pub const DM_NAMES_NAME_OFFSET: usize = 12;

/// Head of a `dm_versions` record. The name follows at
/// `DM_VERSIONS_NAME_OFFSET`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct dm_versions {
    pub next: u32,
    pub version: [u32; 3],
}

pub const DM_VERSIONS_NAME_OFFSET: usize = 16;

/// Head of a `dm_deps` record. `count` packed `u64` device numbers follow
/// at `DM_DEPS_DEVICE_OFFSET`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct dm_deps {
    pub count: u32,
    pub filler: u32,
}

pub const DM_DEPS_DEVICE_OFFSET: usize = 8;

macro_rules! libdevmapper_api {
    ($(fn $name:ident($($arg:ty),* $(,)?) $(-> $ret:ty)?;)*) => {
        /// Entry points resolved from a loaded `libdevmapper`.
        ///
        /// The function pointers stay valid for as long as the value lives,
        /// because it owns the `Library` they were resolved from.
        pub struct LibDevmapper {
            _lib: Library,
            $(pub $name: unsafe extern "C" fn($($arg),*) $(-> $ret)?,)*
        }

        impl LibDevmapper {
            /// Load the shared object at `path` and resolve every entry
            /// point.
            ///
            /// # Safety
            ///
            /// Loading a shared object runs its initialisers, and the
            /// resolved signatures are trusted to match the library.
            pub unsafe fn open(path: &str) -> Result<LibDevmapper, libloading::Error> {
                let lib = Library::new(path)?;
                $(
                    let $name = *lib.get::<unsafe extern "C" fn($($arg),*) $(-> $ret)?>(
                        concat!(stringify!($name), "\0").as_bytes(),
                    )?;
                )*
                Ok(LibDevmapper { _lib: lib, $($name,)* })
            }
        }
    };
}

libdevmapper_api! {
    fn dm_get_library_version(*mut c_char, size_t) -> c_int;
    fn dm_driver_version(*mut c_char, size_t) -> c_int;
    fn dm_task_update_nodes();
    fn dm_set_name_mangling_mode(c_int) -> c_int;
    fn dm_get_name_mangling_mode() -> c_int;
    fn dm_set_dev_dir(*const c_char) -> c_int;
    fn dm_dir() -> *const c_char;
    fn dm_set_sysfs_dir(*const c_char) -> c_int;
    fn dm_sysfs_dir() -> *const c_char;
    fn dm_set_uuid_prefix(*const c_char) -> c_int;
    fn dm_uuid_prefix() -> *const c_char;
    fn dm_is_dm_major(u32) -> c_int;
    fn dm_lib_release();
    fn dm_hold_control_dev(c_int);
    fn dm_mknodes(*const c_char) -> c_int;
    fn dm_udev_set_sync_support(c_int);
    fn dm_udev_get_sync_support() -> c_int;
    fn dm_udev_set_checking(c_int);
    fn dm_udev_get_checking() -> c_int;
    fn dm_cookie_supported() -> c_int;
    fn dm_udev_create_cookie(*mut u32) -> c_int;
    fn dm_udev_complete(u32) -> c_int;
    fn dm_udev_wait(u32) -> c_int;
    fn dm_udev_wait_immediate(u32, *mut c_int) -> c_int;
    fn dm_message_supports_precise_timestamps() -> c_int;
    fn dm_stats_driver_supports_precise() -> c_int;
    fn dm_stats_driver_supports_histogram() -> c_int;

    fn dm_task_create(c_int) -> *mut dm_task;
    fn dm_task_destroy(*mut dm_task);
    fn dm_task_set_name(*mut dm_task, *const c_char) -> c_int;
    fn dm_task_set_uuid(*mut dm_task, *const c_char) -> c_int;
    fn dm_task_set_newname(*mut dm_task, *const c_char) -> c_int;
    fn dm_task_set_newuuid(*mut dm_task, *const c_char) -> c_int;
    fn dm_task_set_major(*mut dm_task, c_int) -> c_int;
    fn dm_task_set_minor(*mut dm_task, c_int) -> c_int;
    fn dm_task_set_major_minor(*mut dm_task, c_int, c_int, c_int) -> c_int;
    fn dm_task_set_uid(*mut dm_task, uid_t) -> c_int;
    fn dm_task_set_gid(*mut dm_task, gid_t) -> c_int;
    fn dm_task_set_mode(*mut dm_task, mode_t) -> c_int;
    fn dm_task_set_cookie(*mut dm_task, *mut u32, u16) -> c_int;
    fn dm_task_set_event_nr(*mut dm_task, u32) -> c_int;
    fn dm_task_set_geometry(
        *mut dm_task,
        *const c_char,
        *const c_char,
        *const c_char,
        *const c_char,
    ) -> c_int;
    fn dm_task_set_message(*mut dm_task, *const c_char) -> c_int;
    fn dm_task_set_sector(*mut dm_task, u64) -> c_int;
    fn dm_task_set_ro(*mut dm_task) -> c_int;
    fn dm_task_no_flush(*mut dm_task) -> c_int;
    fn dm_task_no_open_count(*mut dm_task) -> c_int;
    fn dm_task_skip_lockfs(*mut dm_task) -> c_int;
    fn dm_task_query_inactive_table(*mut dm_task) -> c_int;
    fn dm_task_suppress_identical_reload(*mut dm_task) -> c_int;
    fn dm_task_secure_data(*mut dm_task) -> c_int;
    fn dm_task_retry_remove(*mut dm_task) -> c_int;
    fn dm_task_deferred_remove(*mut dm_task) -> c_int;
    fn dm_task_set_record_timestamp(*mut dm_task) -> c_int;
    fn dm_task_enable_checks(*mut dm_task) -> c_int;
    fn dm_task_set_add_node(*mut dm_task, c_int) -> c_int;
    fn dm_task_set_read_ahead(*mut dm_task, u32, u32) -> c_int;
    fn dm_task_add_target(*mut dm_task, u64, u64, *const c_char, *const c_char) -> c_int;
    fn dm_task_run(*mut dm_task) -> c_int;
    fn dm_task_get_errno(*mut dm_task) -> c_int;
    fn dm_task_get_driver_version(*mut dm_task, *mut c_char, size_t) -> c_int;
    fn dm_task_get_info(*mut dm_task, *mut dm_info) -> c_int;
    fn dm_task_get_name(*const dm_task) -> *const c_char;
    fn dm_task_get_uuid(*const dm_task) -> *const c_char;
    fn dm_task_get_name_mangled(*const dm_task) -> *mut c_char;
    fn dm_task_get_name_unmangled(*const dm_task) -> *mut c_char;
    fn dm_task_get_uuid_mangled(*const dm_task) -> *mut c_char;
    fn dm_task_get_uuid_unmangled(*const dm_task) -> *mut c_char;
    fn dm_task_get_deps(*mut dm_task) -> *mut dm_deps;
    fn dm_task_get_names(*mut dm_task) -> *mut dm_names;
    fn dm_task_get_versions(*mut dm_task) -> *mut dm_versions;
    fn dm_task_get_message_response(*mut dm_task) -> *const c_char;
    fn dm_task_get_ioctl_timestamp(*mut dm_task) -> *mut dm_timestamp;
    fn dm_get_next_target(
        *mut dm_task,
        *mut c_void,
        *mut u64,
        *mut u64,
        *mut *mut c_char,
        *mut *mut c_char,
    ) -> *mut c_void;

    fn dm_timestamp_alloc() -> *mut dm_timestamp;
    fn dm_timestamp_destroy(*mut dm_timestamp);
    fn dm_timestamp_delta(*mut dm_timestamp, *mut dm_timestamp) -> u64;

    fn dm_stats_create(*const c_char) -> *mut dm_stats;
    fn dm_stats_destroy(*mut dm_stats);
    fn dm_stats_bind_devno(*mut dm_stats, c_int, c_int) -> c_int;
    fn dm_stats_bind_name(*mut dm_stats, *const c_char) -> c_int;
    fn dm_stats_bind_uuid(*mut dm_stats, *const c_char) -> c_int;
    fn dm_stats_list(*mut dm_stats, *const c_char) -> c_int;
    fn dm_stats_populate(*mut dm_stats, *const c_char, u64) -> c_int;
    fn dm_stats_set_program_id(*mut dm_stats, c_int, *const c_char) -> c_int;
    fn dm_stats_set_sampling_interval_ns(*mut dm_stats, u64);
    fn dm_stats_get_sampling_interval_ns(*const dm_stats) -> u64;
    fn dm_stats_get_nr_regions(*const dm_stats) -> u64;
    fn dm_stats_get_nr_groups(*const dm_stats) -> u64;
    fn dm_stats_get_nr_areas(*const dm_stats) -> u64;
    fn dm_stats_region_present(*const dm_stats, u64) -> c_int;
    fn dm_stats_group_present(*const dm_stats, u64) -> c_int;
    fn dm_stats_get_region_nr_areas(*const dm_stats, u64) -> u64;
    fn dm_stats_get_region_precise_timestamps(*const dm_stats, u64) -> c_int;
    fn dm_stats_get_region_start(*const dm_stats, *mut u64, u64) -> c_int;
    fn dm_stats_get_region_len(*const dm_stats, *mut u64, u64) -> c_int;
    fn dm_stats_get_region_area_len(*const dm_stats, *mut u64, u64) -> c_int;
    fn dm_stats_get_area_start(*const dm_stats, *mut u64, u64, u64) -> c_int;
    fn dm_stats_get_region_program_id(*const dm_stats, u64) -> *const c_char;
    fn dm_stats_get_region_aux_data(*const dm_stats, u64) -> *const c_char;
    fn dm_stats_get_group_id(*const dm_stats, u64) -> u64;
    fn dm_stats_get_alias(*const dm_stats, u64) -> *const c_char;
    fn dm_stats_get_counter(*const dm_stats, c_int, u64, u64) -> u64;
    fn dm_stats_get_histogram(*const dm_stats, u64, u64) -> *mut dm_histogram;
    fn dm_histogram_get_nr_bins(*const dm_histogram) -> c_int;
    fn dm_histogram_get_bin_lower(*const dm_histogram, c_int) -> u64;
    fn dm_histogram_get_bin_upper(*const dm_histogram, c_int) -> u64;
    fn dm_histogram_get_bin_count(*const dm_histogram, c_int) -> u64;
    fn dm_stats_walk_init(*mut dm_stats, u64);
    fn dm_stats_walk_start(*mut dm_stats);
    fn dm_stats_walk_next_region(*mut dm_stats);
    fn dm_stats_walk_end(*mut dm_stats) -> c_int;
    fn dm_stats_get_current_region(*const dm_stats) -> u64;
}

#[cfg(test)]
mod tests {
    use std::mem::size_of;

    use super::*;

    #[test]
    /// The record heads match the C layouts the offsets are derived from.
    fn test_record_layouts() {
        assert_eq!(size_of::<dm_info>(), 48);
        assert_eq!(size_of::<dm_versions>(), DM_VERSIONS_NAME_OFFSET);
        assert_eq!(size_of::<dm_deps>(), DM_DEPS_DEVICE_OFFSET);
        // dev (8) + next (4); the name is not padded to the struct's alignment
        assert_eq!(DM_NAMES_NAME_OFFSET, size_of::<u64>() + size_of::<u32>());
    }
}
