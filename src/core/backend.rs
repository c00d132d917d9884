// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The boundary between the safe handles and the native library.
//!
//! Every call the handles make into libdevmapper goes through one of these
//! traits. Return values keep the library's own conventions: a `bool`
//! reports the library's success flag and an `Option` is `None` where the
//! library returned NULL. Turning those into `DmError`s, and deciding
//! whether a call is allowed at all, is left to the handles.

use std::ffi::CStr;

use nix::libc::c_int;
use semver::Version;

use crate::{
    core::{
        device::Device,
        deviceinfo::DeviceInfo,
        task_type::TaskType,
        types::{AddNode, Counter, Histogram, NameMangling, NameManglingMode, TargetLine},
    },
    timestamp::Timestamp,
};

/// A flag that is set on a task before it runs and cannot be cleared.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskOption {
    /// Create or load the device read-only.
    ReadOnly,
    /// Do not flush outstanding I/O when suspending.
    NoFlush,
    /// Do not fetch the open count.
    NoOpenCount,
    /// Do not freeze filesystems when suspending.
    SkipLockfs,
    /// Query the inactive table rather than the live one.
    QueryInactiveTable,
    /// Skip a reload whose table is identical to the live one.
    SuppressIdenticalReload,
    /// Wipe ioctl buffers after use.
    SecureData,
    /// Retry a remove that fails because the device is busy.
    RetryRemove,
    /// Remove the device on last close.
    DeferredRemove,
    /// Record a timestamp when the ioctl completes.
    RecordTimestamp,
    /// Let the library check the task's arguments before it runs.
    EnableChecks,
}

/// Library-wide calls.
pub trait DmBackend {
    /// Allocate a task of the given type.
    fn task_create(&self, task_type: TaskType) -> Option<Box<dyn TaskBackend>>;
    /// Allocate a stats handle.
    fn stats_create(&self, program_id: Option<&CStr>) -> Option<Box<dyn StatsBackend>>;

    fn library_version(&self) -> Option<String>;
    fn driver_version(&self) -> Option<String>;
    fn update_nodes(&self);

    fn set_name_mangling_mode(&self, mode: NameManglingMode) -> bool;
    fn name_mangling_mode(&self) -> c_int;
    fn set_dev_dir(&self, dir: &CStr) -> bool;
    fn dev_dir(&self) -> String;
    fn set_sysfs_dir(&self, dir: &CStr) -> bool;
    fn sysfs_dir(&self) -> String;
    fn set_uuid_prefix(&self, prefix: &CStr) -> bool;
    fn uuid_prefix(&self) -> String;

    fn is_dm_major(&self, major: u32) -> bool;
    fn lib_release(&self);
    fn hold_control_dev(&self, hold: bool);
    fn mknodes(&self, name: Option<&CStr>) -> bool;

    fn udev_set_sync_support(&self, sync: bool);
    fn udev_sync_support(&self) -> bool;
    fn udev_set_checking(&self, checking: bool);
    fn udev_checking(&self) -> bool;
    fn cookie_supported(&self) -> bool;
    /// Allocate a udev cookie, returning its value.
    fn udev_create_cookie(&self) -> Option<u32>;
    fn udev_complete(&self, cookie: u32) -> bool;
    fn udev_wait(&self, cookie: u32) -> bool;
    /// Poll a cookie. Returns whether the call succeeded and, if it did,
    /// whether the cookie's events have all been processed.
    fn udev_wait_immediate(&self, cookie: u32) -> (bool, bool);

    fn message_supports_precise_timestamps(&self) -> bool;
    fn stats_driver_supports_precise(&self) -> bool;
    fn stats_driver_supports_histogram(&self) -> bool;
}

/// One allocated task.
pub trait TaskBackend {
    fn set_name(&mut self, name: &CStr) -> bool;
    fn set_uuid(&mut self, uuid: &CStr) -> bool;
    fn set_newname(&mut self, name: &CStr) -> bool;
    fn set_newuuid(&mut self, uuid: &CStr) -> bool;
    fn set_major(&mut self, major: u32) -> bool;
    fn set_minor(&mut self, minor: u32) -> bool;
    fn set_major_minor(&mut self, major: u32, minor: u32, allow_default_major: bool) -> bool;
    fn set_uid(&mut self, uid: u32) -> bool;
    fn set_gid(&mut self, gid: u32) -> bool;
    fn set_mode(&mut self, mode: u32) -> bool;
    fn set_event_nr(&mut self, event_nr: u32) -> bool;
    /// Attach a cookie. The library may rewrite `cookie`, for instance to
    /// add the flags it sets itself.
    fn set_cookie(&mut self, cookie: &mut u32, flags: u16) -> bool;
    fn set_geometry(
        &mut self,
        cylinders: &CStr,
        heads: &CStr,
        sectors: &CStr,
        start: &CStr,
    ) -> bool;
    fn set_message(&mut self, message: &CStr) -> bool;
    fn set_sector(&mut self, sector: u64) -> bool;
    fn set_option(&mut self, option: TaskOption) -> bool;
    fn set_add_node(&mut self, add_node: AddNode) -> bool;
    fn set_read_ahead(&mut self, read_ahead: u32, flags: u32) -> bool;
    fn add_target(&mut self, start: u64, length: u64, target_type: &CStr, params: &CStr) -> bool;

    /// Issue the ioctl.
    fn run(&mut self) -> bool;
    /// The errno recorded by the last run, 0 if there was none.
    fn errno(&self) -> i32;

    fn driver_version(&self) -> Option<String>;
    fn info(&self) -> Option<DeviceInfo>;
    fn name(&self, mangling: NameMangling) -> Option<String>;
    fn uuid(&self, mangling: NameMangling) -> Option<String>;
    fn deps(&self) -> Option<Vec<Device>>;
    fn names(&self) -> Option<Vec<(String, Device)>>;
    fn versions(&self) -> Option<Vec<(String, Version)>>;
    fn message_response(&self) -> Option<String>;
    /// The lines of the table or status the task returned.
    fn targets(&self) -> Vec<TargetLine>;
    fn ioctl_timestamp(&self) -> Option<Timestamp>;
}

/// One allocated stats handle.
///
/// Region and area queries are only made for ids the caller has checked
/// against `region_present` and `region_nr_areas`.
pub trait StatsBackend {
    fn bind_devno(&mut self, major: u32, minor: u32) -> bool;
    fn bind_name(&mut self, name: &CStr) -> bool;
    fn bind_uuid(&mut self, uuid: &CStr) -> bool;

    fn list(&mut self, program_id: Option<&CStr>) -> bool;
    fn populate(&mut self, program_id: Option<&CStr>, region_id: u64) -> bool;
    fn set_program_id(&mut self, allow_empty: bool, program_id: Option<&CStr>) -> bool;
    fn set_sampling_interval_ns(&mut self, interval: u64);
    fn sampling_interval_ns(&self) -> u64;

    fn nr_regions(&self) -> u64;
    fn nr_groups(&self) -> u64;
    fn nr_areas(&self) -> u64;
    fn region_present(&self, region_id: u64) -> bool;
    fn group_present(&self, group_id: u64) -> bool;
    /// The ids of the regions currently held, in increasing order.
    fn region_ids(&mut self) -> Vec<u64>;

    fn region_nr_areas(&self, region_id: u64) -> u64;
    fn region_precise_timestamps(&self, region_id: u64) -> bool;
    fn region_start(&self, region_id: u64) -> Option<u64>;
    fn region_len(&self, region_id: u64) -> Option<u64>;
    fn region_area_len(&self, region_id: u64) -> Option<u64>;
    fn region_program_id(&self, region_id: u64) -> Option<String>;
    fn region_aux_data(&self, region_id: u64) -> Option<String>;
    /// The group the region belongs to, if any.
    fn region_group_id(&self, region_id: u64) -> Option<u64>;
    fn alias(&self, group_id: u64) -> Option<String>;

    fn area_start(&self, region_id: u64, area_id: u64) -> Option<u64>;
    fn counter(&self, counter: Counter, region_id: u64, area_id: u64) -> u64;
    fn histogram(&self, region_id: u64, area_id: u64) -> Option<Histogram>;
}
