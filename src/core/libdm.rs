// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The backend that calls the loaded libdevmapper.

use std::{
    ffi::CStr,
    ptr::{self, NonNull},
};

use nix::libc::{self, c_char, c_int, c_void};
use once_cell::sync::Lazy;
use semver::Version;

use devmapper_sys::{self as dms, LibDevmapper};

use crate::{
    core::{
        backend::{DmBackend, StatsBackend, TaskBackend, TaskOption},
        device::Device,
        deviceinfo::DeviceInfo,
        errors,
        records::{decode_deps, NameRecord, RecordChain, VersionRecord},
        task_type::TaskType,
        types::{
            AddNode, Counter, Histogram, HistogramBin, NameMangling, NameManglingMode, TargetLine,
        },
        util::{str_from_c_str, string_from_ptr},
    },
    result::{DmError, DmResult},
    timestamp::Timestamp,
};

/// The library, loaded on first use and kept for the life of the process.
static LIBDEVMAPPER: Lazy<Result<LibDevmapper, String>> = Lazy::new(|| {
    let mut failures = Vec::new();
    for soname in dms::LIBDEVMAPPER_SONAMES {
        match unsafe { LibDevmapper::open(soname) } {
            Ok(lib) => {
                debug!("Loaded {}", soname);
                return Ok(lib);
            }
            Err(err) => failures.push(format!("{soname}: {err}")),
        }
    }
    Err(failures.join("; "))
});

fn as_ptr(value: Option<&CStr>) -> *const c_char {
    value.map(CStr::as_ptr).unwrap_or(ptr::null())
}

/// Copy, then free, a string the library allocated for the caller.
unsafe fn take_string(ptr: *mut c_char) -> Option<String> {
    let value = string_from_ptr(ptr);
    if !ptr.is_null() {
        libc::free(ptr as *mut c_void);
    }
    value
}

/// Read a version string the library writes into a caller's buffer.
fn version_string<F>(fill: F) -> Option<String>
where
    F: FnOnce(*mut c_char, usize) -> c_int,
{
    let mut buf = [0 as c_char; dms::DM_VERSION_BUF_LEN];
    if fill(buf.as_mut_ptr(), buf.len()) == 0 {
        return None;
    }
    str_from_c_str(&buf).map(str::to_string)
}

/// The libdevmapper backend.
#[derive(Clone, Copy)]
pub struct LibDm {
    lib: &'static LibDevmapper,
}

impl LibDm {
    /// Load libdevmapper, if that has not been done yet.
    pub fn load() -> DmResult<LibDm> {
        LIBDEVMAPPER
            .as_ref()
            .map(|lib| LibDm { lib })
            .map_err(|err| DmError::Core(errors::Error::ContextInit(err.clone())))
    }
}

impl DmBackend for LibDm {
    fn task_create(&self, task_type: TaskType) -> Option<Box<dyn TaskBackend>> {
        let task = NonNull::new(unsafe { (self.lib.dm_task_create)(task_type.to_raw()) })?;
        Some(Box::new(LibDmTask { lib: self.lib, task }))
    }

    fn stats_create(&self, program_id: Option<&CStr>) -> Option<Box<dyn StatsBackend>> {
        let stats = NonNull::new(unsafe { (self.lib.dm_stats_create)(as_ptr(program_id)) })?;
        Some(Box::new(LibDmStats {
            lib: self.lib,
            stats,
        }))
    }

    fn library_version(&self) -> Option<String> {
        version_string(|buf, len| unsafe { (self.lib.dm_get_library_version)(buf, len) })
    }

    fn driver_version(&self) -> Option<String> {
        version_string(|buf, len| unsafe { (self.lib.dm_driver_version)(buf, len) })
    }

    fn update_nodes(&self) {
        unsafe { (self.lib.dm_task_update_nodes)() }
    }

    fn set_name_mangling_mode(&self, mode: NameManglingMode) -> bool {
        unsafe { (self.lib.dm_set_name_mangling_mode)(mode.to_raw()) != 0 }
    }

    fn name_mangling_mode(&self) -> c_int {
        unsafe { (self.lib.dm_get_name_mangling_mode)() }
    }

    fn set_dev_dir(&self, dir: &CStr) -> bool {
        unsafe { (self.lib.dm_set_dev_dir)(dir.as_ptr()) != 0 }
    }

    fn dev_dir(&self) -> String {
        unsafe { string_from_ptr((self.lib.dm_dir)()) }.unwrap_or_default()
    }

    fn set_sysfs_dir(&self, dir: &CStr) -> bool {
        unsafe { (self.lib.dm_set_sysfs_dir)(dir.as_ptr()) != 0 }
    }

    fn sysfs_dir(&self) -> String {
        unsafe { string_from_ptr((self.lib.dm_sysfs_dir)()) }.unwrap_or_default()
    }

    fn set_uuid_prefix(&self, prefix: &CStr) -> bool {
        unsafe { (self.lib.dm_set_uuid_prefix)(prefix.as_ptr()) != 0 }
    }

    fn uuid_prefix(&self) -> String {
        unsafe { string_from_ptr((self.lib.dm_uuid_prefix)()) }.unwrap_or_default()
    }

    fn is_dm_major(&self, major: u32) -> bool {
        unsafe { (self.lib.dm_is_dm_major)(major) != 0 }
    }

    fn lib_release(&self) {
        unsafe { (self.lib.dm_lib_release)() }
    }

    fn hold_control_dev(&self, hold: bool) {
        unsafe { (self.lib.dm_hold_control_dev)(c_int::from(hold)) }
    }

    fn mknodes(&self, name: Option<&CStr>) -> bool {
        unsafe { (self.lib.dm_mknodes)(as_ptr(name)) != 0 }
    }

    fn udev_set_sync_support(&self, sync: bool) {
        unsafe { (self.lib.dm_udev_set_sync_support)(c_int::from(sync)) }
    }

    fn udev_sync_support(&self) -> bool {
        unsafe { (self.lib.dm_udev_get_sync_support)() != 0 }
    }

    fn udev_set_checking(&self, checking: bool) {
        unsafe { (self.lib.dm_udev_set_checking)(c_int::from(checking)) }
    }

    fn udev_checking(&self) -> bool {
        unsafe { (self.lib.dm_udev_get_checking)() != 0 }
    }

    fn cookie_supported(&self) -> bool {
        unsafe { (self.lib.dm_cookie_supported)() != 0 }
    }

    fn udev_create_cookie(&self) -> Option<u32> {
        let mut cookie = 0u32;
        if unsafe { (self.lib.dm_udev_create_cookie)(&mut cookie) } == 0 {
            None
        } else {
            Some(cookie)
        }
    }

    fn udev_complete(&self, cookie: u32) -> bool {
        unsafe { (self.lib.dm_udev_complete)(cookie) != 0 }
    }

    fn udev_wait(&self, cookie: u32) -> bool {
        unsafe { (self.lib.dm_udev_wait)(cookie) != 0 }
    }

    fn udev_wait_immediate(&self, cookie: u32) -> (bool, bool) {
        let mut ready: c_int = 0;
        let succeeded = unsafe { (self.lib.dm_udev_wait_immediate)(cookie, &mut ready) != 0 };
        (succeeded, succeeded && ready != 0)
    }

    fn message_supports_precise_timestamps(&self) -> bool {
        unsafe { (self.lib.dm_message_supports_precise_timestamps)() != 0 }
    }

    fn stats_driver_supports_precise(&self) -> bool {
        unsafe { (self.lib.dm_stats_driver_supports_precise)() != 0 }
    }

    fn stats_driver_supports_histogram(&self) -> bool {
        unsafe { (self.lib.dm_stats_driver_supports_histogram)() != 0 }
    }
}

/// An allocated `struct dm_task`, destroyed on drop.
struct LibDmTask {
    lib: &'static LibDevmapper,
    task: NonNull<dms::dm_task>,
}

impl LibDmTask {
    fn ptr(&self) -> *mut dms::dm_task {
        self.task.as_ptr()
    }
}

impl Drop for LibDmTask {
    fn drop(&mut self) {
        unsafe { (self.lib.dm_task_destroy)(self.ptr()) }
    }
}

impl TaskBackend for LibDmTask {
    fn set_name(&mut self, name: &CStr) -> bool {
        unsafe { (self.lib.dm_task_set_name)(self.ptr(), name.as_ptr()) != 0 }
    }

    fn set_uuid(&mut self, uuid: &CStr) -> bool {
        unsafe { (self.lib.dm_task_set_uuid)(self.ptr(), uuid.as_ptr()) != 0 }
    }

    fn set_newname(&mut self, name: &CStr) -> bool {
        unsafe { (self.lib.dm_task_set_newname)(self.ptr(), name.as_ptr()) != 0 }
    }

    fn set_newuuid(&mut self, uuid: &CStr) -> bool {
        unsafe { (self.lib.dm_task_set_newuuid)(self.ptr(), uuid.as_ptr()) != 0 }
    }

    fn set_major(&mut self, major: u32) -> bool {
        unsafe { (self.lib.dm_task_set_major)(self.ptr(), major as c_int) != 0 }
    }

    fn set_minor(&mut self, minor: u32) -> bool {
        unsafe { (self.lib.dm_task_set_minor)(self.ptr(), minor as c_int) != 0 }
    }

    fn set_major_minor(&mut self, major: u32, minor: u32, allow_default_major: bool) -> bool {
        unsafe {
            (self.lib.dm_task_set_major_minor)(
                self.ptr(),
                major as c_int,
                minor as c_int,
                c_int::from(allow_default_major),
            ) != 0
        }
    }

    fn set_uid(&mut self, uid: u32) -> bool {
        unsafe { (self.lib.dm_task_set_uid)(self.ptr(), uid as libc::uid_t) != 0 }
    }

    fn set_gid(&mut self, gid: u32) -> bool {
        unsafe { (self.lib.dm_task_set_gid)(self.ptr(), gid as libc::gid_t) != 0 }
    }

    fn set_mode(&mut self, mode: u32) -> bool {
        unsafe { (self.lib.dm_task_set_mode)(self.ptr(), mode as libc::mode_t) != 0 }
    }

    fn set_event_nr(&mut self, event_nr: u32) -> bool {
        unsafe { (self.lib.dm_task_set_event_nr)(self.ptr(), event_nr) != 0 }
    }

    fn set_cookie(&mut self, cookie: &mut u32, flags: u16) -> bool {
        unsafe { (self.lib.dm_task_set_cookie)(self.ptr(), cookie, flags) != 0 }
    }

    fn set_geometry(
        &mut self,
        cylinders: &CStr,
        heads: &CStr,
        sectors: &CStr,
        start: &CStr,
    ) -> bool {
        unsafe {
            (self.lib.dm_task_set_geometry)(
                self.ptr(),
                cylinders.as_ptr(),
                heads.as_ptr(),
                sectors.as_ptr(),
                start.as_ptr(),
            ) != 0
        }
    }

    fn set_message(&mut self, message: &CStr) -> bool {
        unsafe { (self.lib.dm_task_set_message)(self.ptr(), message.as_ptr()) != 0 }
    }

    fn set_sector(&mut self, sector: u64) -> bool {
        unsafe { (self.lib.dm_task_set_sector)(self.ptr(), sector) != 0 }
    }

    fn set_option(&mut self, option: TaskOption) -> bool {
        let setter = match option {
            TaskOption::ReadOnly => self.lib.dm_task_set_ro,
            TaskOption::NoFlush => self.lib.dm_task_no_flush,
            TaskOption::NoOpenCount => self.lib.dm_task_no_open_count,
            TaskOption::SkipLockfs => self.lib.dm_task_skip_lockfs,
            TaskOption::QueryInactiveTable => self.lib.dm_task_query_inactive_table,
            TaskOption::SuppressIdenticalReload => self.lib.dm_task_suppress_identical_reload,
            TaskOption::SecureData => self.lib.dm_task_secure_data,
            TaskOption::RetryRemove => self.lib.dm_task_retry_remove,
            TaskOption::DeferredRemove => self.lib.dm_task_deferred_remove,
            TaskOption::RecordTimestamp => self.lib.dm_task_set_record_timestamp,
            TaskOption::EnableChecks => self.lib.dm_task_enable_checks,
        };
        unsafe { setter(self.ptr()) != 0 }
    }

    fn set_add_node(&mut self, add_node: AddNode) -> bool {
        unsafe { (self.lib.dm_task_set_add_node)(self.ptr(), add_node.to_raw()) != 0 }
    }

    fn set_read_ahead(&mut self, read_ahead: u32, flags: u32) -> bool {
        unsafe { (self.lib.dm_task_set_read_ahead)(self.ptr(), read_ahead, flags) != 0 }
    }

    fn add_target(&mut self, start: u64, length: u64, target_type: &CStr, params: &CStr) -> bool {
        unsafe {
            (self.lib.dm_task_add_target)(
                self.ptr(),
                start,
                length,
                target_type.as_ptr(),
                params.as_ptr(),
            ) != 0
        }
    }

    fn run(&mut self) -> bool {
        unsafe { (self.lib.dm_task_run)(self.ptr()) != 0 }
    }

    fn errno(&self) -> i32 {
        unsafe { (self.lib.dm_task_get_errno)(self.ptr()) }
    }

    fn driver_version(&self) -> Option<String> {
        let task = self.ptr();
        version_string(|buf, len| unsafe { (self.lib.dm_task_get_driver_version)(task, buf, len) })
    }

    fn info(&self) -> Option<DeviceInfo> {
        let mut info = dms::dm_info::default();
        if unsafe { (self.lib.dm_task_get_info)(self.ptr(), &mut info) } == 0 {
            None
        } else {
            Some(DeviceInfo::from(info))
        }
    }

    fn name(&self, mangling: NameMangling) -> Option<String> {
        let task = self.ptr() as *const dms::dm_task;
        unsafe {
            match mangling {
                NameMangling::Default => string_from_ptr((self.lib.dm_task_get_name)(task)),
                NameMangling::Mangled => {
                    take_string((self.lib.dm_task_get_name_mangled)(task))
                }
                NameMangling::Unmangled => {
                    take_string((self.lib.dm_task_get_name_unmangled)(task))
                }
            }
        }
    }

    fn uuid(&self, mangling: NameMangling) -> Option<String> {
        let task = self.ptr() as *const dms::dm_task;
        unsafe {
            match mangling {
                NameMangling::Default => string_from_ptr((self.lib.dm_task_get_uuid)(task)),
                NameMangling::Mangled => {
                    take_string((self.lib.dm_task_get_uuid_mangled)(task))
                }
                NameMangling::Unmangled => {
                    take_string((self.lib.dm_task_get_uuid_unmangled)(task))
                }
            }
        }
    }

    fn deps(&self) -> Option<Vec<Device>> {
        let deps = unsafe { (self.lib.dm_task_get_deps)(self.ptr()) };
        if deps.is_null() {
            None
        } else {
            Some(unsafe { decode_deps(deps as *const u8) })
        }
    }

    fn names(&self) -> Option<Vec<(String, Device)>> {
        let names = unsafe { (self.lib.dm_task_get_names)(self.ptr()) };
        if names.is_null() {
            None
        } else {
            Some(unsafe { RecordChain::<NameRecord>::new(names as *const u8) }.collect())
        }
    }

    fn versions(&self) -> Option<Vec<(String, Version)>> {
        let versions = unsafe { (self.lib.dm_task_get_versions)(self.ptr()) };
        if versions.is_null() {
            None
        } else {
            Some(unsafe { RecordChain::<VersionRecord>::new(versions as *const u8) }.collect())
        }
    }

    fn message_response(&self) -> Option<String> {
        unsafe { string_from_ptr((self.lib.dm_task_get_message_response)(self.ptr())) }
    }

    fn targets(&self) -> Vec<TargetLine> {
        let mut lines = Vec::new();
        let mut next: *mut c_void = ptr::null_mut();
        loop {
            let mut start = 0u64;
            let mut length = 0u64;
            let mut target_type: *mut c_char = ptr::null_mut();
            let mut params: *mut c_char = ptr::null_mut();
            next = unsafe {
                (self.lib.dm_get_next_target)(
                    self.ptr(),
                    next,
                    &mut start,
                    &mut length,
                    &mut target_type,
                    &mut params,
                )
            };
            if let Some(target_type) = unsafe { string_from_ptr(target_type) } {
                lines.push(TargetLine {
                    start,
                    length,
                    target_type,
                    params: unsafe { string_from_ptr(params) }.unwrap_or_default(),
                });
            }
            if next.is_null() {
                break;
            }
        }
        lines
    }

    fn ioctl_timestamp(&self) -> Option<Timestamp> {
        let stamp = unsafe { (self.lib.dm_task_get_ioctl_timestamp)(self.ptr()) };
        if stamp.is_null() {
            return None;
        }
        // The library exposes timestamps only as differences; a freshly
        // allocated timestamp is zero.
        let zero = NonNull::new(unsafe { (self.lib.dm_timestamp_alloc)() })?;
        let nsecs = unsafe { (self.lib.dm_timestamp_delta)(stamp, zero.as_ptr()) };
        unsafe { (self.lib.dm_timestamp_destroy)(zero.as_ptr()) };
        Some(Timestamp::from_nsecs(nsecs))
    }
}

/// An allocated `struct dm_stats`, destroyed on drop.
struct LibDmStats {
    lib: &'static LibDevmapper,
    stats: NonNull<dms::dm_stats>,
}

impl LibDmStats {
    fn ptr(&self) -> *mut dms::dm_stats {
        self.stats.as_ptr()
    }

    fn cptr(&self) -> *const dms::dm_stats {
        self.stats.as_ptr() as *const dms::dm_stats
    }

    // libdm dereferences its region table without checking it, so every
    // region query is guarded here as well.
    fn has_region(&self, region_id: u64) -> bool {
        self.nr_areas() > 0 && self.region_present(region_id)
    }

    fn has_area(&self, region_id: u64, area_id: u64) -> bool {
        self.has_region(region_id) && area_id < self.region_nr_areas(region_id)
    }

    fn region_u64(
        &self,
        region_id: u64,
        get: unsafe extern "C" fn(*const dms::dm_stats, *mut u64, u64) -> c_int,
    ) -> Option<u64> {
        if !self.has_region(region_id) {
            return None;
        }
        let mut value = 0u64;
        if unsafe { get(self.cptr(), &mut value, region_id) } == 0 {
            None
        } else {
            Some(value)
        }
    }
}

impl Drop for LibDmStats {
    fn drop(&mut self) {
        unsafe { (self.lib.dm_stats_destroy)(self.ptr()) }
    }
}

impl StatsBackend for LibDmStats {
    fn bind_devno(&mut self, major: u32, minor: u32) -> bool {
        unsafe { (self.lib.dm_stats_bind_devno)(self.ptr(), major as c_int, minor as c_int) != 0 }
    }

    fn bind_name(&mut self, name: &CStr) -> bool {
        unsafe { (self.lib.dm_stats_bind_name)(self.ptr(), name.as_ptr()) != 0 }
    }

    fn bind_uuid(&mut self, uuid: &CStr) -> bool {
        unsafe { (self.lib.dm_stats_bind_uuid)(self.ptr(), uuid.as_ptr()) != 0 }
    }

    fn list(&mut self, program_id: Option<&CStr>) -> bool {
        unsafe { (self.lib.dm_stats_list)(self.ptr(), as_ptr(program_id)) != 0 }
    }

    fn populate(&mut self, program_id: Option<&CStr>, region_id: u64) -> bool {
        unsafe { (self.lib.dm_stats_populate)(self.ptr(), as_ptr(program_id), region_id) != 0 }
    }

    fn set_program_id(&mut self, allow_empty: bool, program_id: Option<&CStr>) -> bool {
        unsafe {
            (self.lib.dm_stats_set_program_id)(
                self.ptr(),
                c_int::from(allow_empty),
                as_ptr(program_id),
            ) != 0
        }
    }

    fn set_sampling_interval_ns(&mut self, interval: u64) {
        unsafe { (self.lib.dm_stats_set_sampling_interval_ns)(self.ptr(), interval) }
    }

    fn sampling_interval_ns(&self) -> u64 {
        unsafe { (self.lib.dm_stats_get_sampling_interval_ns)(self.cptr()) }
    }

    fn nr_regions(&self) -> u64 {
        unsafe { (self.lib.dm_stats_get_nr_regions)(self.cptr()) }
    }

    fn nr_groups(&self) -> u64 {
        unsafe { (self.lib.dm_stats_get_nr_groups)(self.cptr()) }
    }

    fn nr_areas(&self) -> u64 {
        unsafe { (self.lib.dm_stats_get_nr_areas)(self.cptr()) }
    }

    fn region_present(&self, region_id: u64) -> bool {
        unsafe { (self.lib.dm_stats_region_present)(self.cptr(), region_id) != 0 }
    }

    fn group_present(&self, group_id: u64) -> bool {
        unsafe { (self.lib.dm_stats_group_present)(self.cptr(), group_id) != 0 }
    }

    fn region_ids(&mut self) -> Vec<u64> {
        let mut ids = Vec::new();
        if self.nr_regions() == 0 {
            return ids;
        }
        let stats = self.ptr();
        unsafe {
            (self.lib.dm_stats_walk_init)(stats, dms::DM_STATS_WALK_REGION);
            (self.lib.dm_stats_walk_start)(stats);
            while (self.lib.dm_stats_walk_end)(stats) == 0 {
                ids.push((self.lib.dm_stats_get_current_region)(stats));
                (self.lib.dm_stats_walk_next_region)(stats);
            }
        }
        ids
    }

    fn region_nr_areas(&self, region_id: u64) -> u64 {
        if !self.has_region(region_id) {
            return 0;
        }
        unsafe { (self.lib.dm_stats_get_region_nr_areas)(self.cptr(), region_id) }
    }

    fn region_precise_timestamps(&self, region_id: u64) -> bool {
        self.has_region(region_id)
            && unsafe {
                (self.lib.dm_stats_get_region_precise_timestamps)(self.cptr(), region_id) != 0
            }
    }

    fn region_start(&self, region_id: u64) -> Option<u64> {
        self.region_u64(region_id, self.lib.dm_stats_get_region_start)
    }

    fn region_len(&self, region_id: u64) -> Option<u64> {
        self.region_u64(region_id, self.lib.dm_stats_get_region_len)
    }

    fn region_area_len(&self, region_id: u64) -> Option<u64> {
        self.region_u64(region_id, self.lib.dm_stats_get_region_area_len)
    }

    fn region_program_id(&self, region_id: u64) -> Option<String> {
        if !self.has_region(region_id) {
            return None;
        }
        unsafe {
            string_from_ptr((self.lib.dm_stats_get_region_program_id)(
                self.cptr(),
                region_id,
            ))
        }
    }

    fn region_aux_data(&self, region_id: u64) -> Option<String> {
        if !self.has_region(region_id) {
            return None;
        }
        unsafe { string_from_ptr((self.lib.dm_stats_get_region_aux_data)(self.cptr(), region_id)) }
    }

    fn region_group_id(&self, region_id: u64) -> Option<u64> {
        if !self.has_region(region_id) {
            return None;
        }
        match unsafe { (self.lib.dm_stats_get_group_id)(self.cptr(), region_id) } {
            dms::DM_STATS_GROUP_NOT_PRESENT => None,
            group_id => Some(group_id),
        }
    }

    fn alias(&self, group_id: u64) -> Option<String> {
        if self.nr_areas() == 0 || !self.group_present(group_id) {
            return None;
        }
        unsafe { string_from_ptr((self.lib.dm_stats_get_alias)(self.cptr(), group_id)) }
    }

    fn area_start(&self, region_id: u64, area_id: u64) -> Option<u64> {
        if !self.has_area(region_id, area_id) {
            return None;
        }
        let mut start = 0u64;
        if unsafe {
            (self.lib.dm_stats_get_area_start)(self.cptr(), &mut start, region_id, area_id)
        } == 0
        {
            None
        } else {
            Some(start)
        }
    }

    fn counter(&self, counter: Counter, region_id: u64, area_id: u64) -> u64 {
        if !self.has_area(region_id, area_id) {
            return 0;
        }
        unsafe {
            (self.lib.dm_stats_get_counter)(self.cptr(), counter.to_raw(), region_id, area_id)
        }
    }

    fn histogram(&self, region_id: u64, area_id: u64) -> Option<Histogram> {
        if !self.has_area(region_id, area_id) {
            return None;
        }
        let histogram = unsafe { (self.lib.dm_stats_get_histogram)(self.cptr(), region_id, area_id) };
        if histogram.is_null() {
            return None;
        }
        let histogram = histogram as *const dms::dm_histogram;
        let nr_bins = unsafe { (self.lib.dm_histogram_get_nr_bins)(histogram) };
        let bins = (0..nr_bins)
            .map(|bin| unsafe {
                HistogramBin {
                    lower: (self.lib.dm_histogram_get_bin_lower)(histogram, bin),
                    upper: (self.lib.dm_histogram_get_bin_upper)(histogram, bin),
                    count: (self.lib.dm_histogram_get_bin_count)(histogram, bin),
                }
            })
            .collect();
        Some(Histogram { bins })
    }
}
