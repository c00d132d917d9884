// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! An in-memory backend that stands in for libdevmapper in unit tests.
//!
//! All handles made by one `MockBackend` share its `MockState`, so a test
//! can inject failures and inspect what was destroyed.

use std::{
    cell::{RefCell, RefMut},
    collections::{BTreeMap, BTreeSet, HashSet},
    ffi::CStr,
    rc::Rc,
};

use nix::libc::c_int;
use rand::Rng;
use semver::Version;

use devmapper_sys as dms;

use crate::{
    core::{
        backend::{DmBackend, StatsBackend, TaskBackend, TaskOption},
        task_type::TaskType,
        types::{AddNode, NameMangling, NameManglingMode, TargetLine},
        Counter, Device, DeviceInfo, Histogram, HistogramBin,
    },
    timestamp::Timestamp,
};

const DEFAULT_PROGRAM_ID: &str = "dmstats";

fn lossy(value: &CStr) -> String {
    value.to_string_lossy().into_owned()
}

/// A stats region on a mock device.
#[derive(Clone, Debug)]
pub struct MockRegion {
    pub start: u64,
    pub len: u64,
    pub area_len: u64,
    pub program_id: String,
    pub aux_data: String,
    pub group_id: Option<u64>,
    pub precise: bool,
    /// Histogram bin boundaries; empty for no histogram.
    pub histogram_bounds: Vec<u64>,
}

impl MockRegion {
    fn nr_areas(&self) -> u64 {
        self.len.div_ceil(self.area_len)
    }
}

/// A device known to the mock.
#[derive(Clone, Debug)]
pub struct MockDevice {
    pub name: String,
    pub uuid: String,
    pub dev: Device,
    pub table: Vec<TargetLine>,
    pub deps: Vec<Device>,
    pub regions: BTreeMap<u64, MockRegion>,
    pub aliases: BTreeMap<u64, String>,
}

/// State shared by a `MockBackend` and every handle it made.
#[derive(Debug)]
pub struct MockState {
    pub devices: Vec<MockDevice>,
    pub targets: Vec<(String, Version)>,
    pub library_version: Option<String>,
    pub driver_version: Option<String>,
    pub mangling_mode: c_int,
    pub dev_dir: String,
    pub sysfs_dir: String,
    pub uuid_prefix: String,
    pub sync_support: bool,
    pub checking: bool,
    pub control_held: bool,

    /// Bases of the cookies that have been created and not yet waited on.
    pub cookies: HashSet<u32>,
    pub cookies_ready: bool,
    pub fail_cookie_create: bool,

    pub fail_task_create: bool,
    pub fail_run_errno: Option<i32>,
    /// Make the dependency, name and version lists come back NULL.
    pub null_lists: bool,
    pub reject_setters: bool,
    pub rejected_calls: usize,
    pub tasks_destroyed: usize,

    pub fail_stats_create: bool,
    pub fail_list: bool,
    pub fail_populate: bool,
    pub stats_created: usize,
    pub stats_destroyed: usize,
}

impl Default for MockState {
    fn default() -> MockState {
        let mut regions = BTreeMap::new();
        regions.insert(
            0,
            MockRegion {
                start: 0,
                len: 2048,
                area_len: 1024,
                program_id: DEFAULT_PROGRAM_ID.to_string(),
                aux_data: String::new(),
                group_id: None,
                precise: false,
                histogram_bounds: Vec::new(),
            },
        );
        regions.insert(
            2,
            MockRegion {
                start: 2048,
                len: 2048,
                area_len: 2048,
                program_id: DEFAULT_PROGRAM_ID.to_string(),
                aux_data: "web".to_string(),
                group_id: Some(0),
                precise: true,
                histogram_bounds: vec![1_000_000, 5_000_000],
            },
        );
        regions.insert(
            4,
            MockRegion {
                start: 4096,
                len: 512,
                area_len: 512,
                program_id: "other".to_string(),
                aux_data: String::new(),
                group_id: None,
                precise: false,
                histogram_bounds: Vec::new(),
            },
        );

        let device = MockDevice {
            name: "mock-dev".to_string(),
            uuid: "MOCK-0001".to_string(),
            dev: Device::new(253, 0),
            table: vec![TargetLine {
                start: 0,
                length: 4096,
                target_type: "linear".to_string(),
                params: "8:16 0".to_string(),
            }],
            deps: vec![Device::new(8, 16)],
            regions,
            aliases: [(0, "mock-group".to_string())].into_iter().collect(),
        };

        MockState {
            devices: vec![device],
            targets: vec![
                ("linear".to_string(), Version::new(1, 4, 0)),
                ("striped".to_string(), Version::new(1, 6, 0)),
                ("zero".to_string(), Version::new(1, 1, 0)),
            ],
            library_version: Some("1.02.197 (2023-11-21)".to_string()),
            driver_version: Some("4.48.0".to_string()),
            mangling_mode: dms::DM_STRING_MANGLING_AUTO,
            dev_dir: "/dev".to_string(),
            sysfs_dir: "/sys".to_string(),
            uuid_prefix: String::new(),
            sync_support: true,
            checking: true,
            control_held: false,
            cookies: HashSet::new(),
            cookies_ready: true,
            fail_cookie_create: false,
            fail_task_create: false,
            fail_run_errno: None,
            null_lists: false,
            reject_setters: false,
            rejected_calls: 0,
            tasks_destroyed: 0,
            fail_stats_create: false,
            fail_list: false,
            fail_populate: false,
            stats_created: 0,
            stats_destroyed: 0,
        }
    }
}

impl MockState {
    fn new_cookie_base(&mut self) -> u32 {
        let mut rng = rand::rng();
        loop {
            let base = rng.random_range(1..=0xFFFFu32);
            if self.cookies.insert(base) {
                return base;
            }
        }
    }
}

fn cookie_base(cookie: u32) -> u32 {
    cookie & !dms::DM_UDEV_FLAGS_MASK
}

/// The mock backend.
#[derive(Debug, Default)]
pub struct MockBackend {
    state: Rc<RefCell<MockState>>,
}

impl MockBackend {
    /// Borrow the shared state, e.g. to set a failure toggle.
    pub fn state(&self) -> RefMut<'_, MockState> {
        self.state.borrow_mut()
    }
}

impl DmBackend for MockBackend {
    fn task_create(&self, task_type: TaskType) -> Option<Box<dyn TaskBackend>> {
        if self.state().fail_task_create {
            return None;
        }
        Some(Box::new(MockTask {
            state: Rc::clone(&self.state),
            task_type,
            name: None,
            uuid: None,
            message: None,
            record_timestamp: false,
            timestamp: None,
            errno: 0,
        }))
    }

    fn stats_create(&self, program_id: Option<&CStr>) -> Option<Box<dyn StatsBackend>> {
        let mut state = self.state();
        if state.fail_stats_create {
            return None;
        }
        state.stats_created += 1;
        Some(Box::new(MockStats {
            state: Rc::clone(&self.state),
            program_id: program_id.map_or(DEFAULT_PROGRAM_ID.to_string(), lossy),
            bound: None,
            tree: BTreeMap::new(),
            aliases: BTreeMap::new(),
            interval_ns: 0,
        }))
    }

    fn library_version(&self) -> Option<String> {
        self.state().library_version.clone()
    }

    fn driver_version(&self) -> Option<String> {
        self.state().driver_version.clone()
    }

    fn update_nodes(&self) {}

    fn set_name_mangling_mode(&self, mode: NameManglingMode) -> bool {
        self.state().mangling_mode = mode.to_raw();
        true
    }

    fn name_mangling_mode(&self) -> c_int {
        self.state().mangling_mode
    }

    fn set_dev_dir(&self, dir: &CStr) -> bool {
        self.state().dev_dir = lossy(dir);
        true
    }

    fn dev_dir(&self) -> String {
        format!("{}/mapper", self.state().dev_dir)
    }

    fn set_sysfs_dir(&self, dir: &CStr) -> bool {
        self.state().sysfs_dir = lossy(dir);
        true
    }

    fn sysfs_dir(&self) -> String {
        self.state().sysfs_dir.clone()
    }

    fn set_uuid_prefix(&self, prefix: &CStr) -> bool {
        self.state().uuid_prefix = lossy(prefix);
        true
    }

    fn uuid_prefix(&self) -> String {
        self.state().uuid_prefix.clone()
    }

    fn is_dm_major(&self, major: u32) -> bool {
        self.state().devices.iter().any(|d| d.dev.major == major)
    }

    fn lib_release(&self) {
        self.state().control_held = false;
    }

    fn hold_control_dev(&self, hold: bool) {
        self.state().control_held = hold;
    }

    fn mknodes(&self, _name: Option<&CStr>) -> bool {
        true
    }

    fn udev_set_sync_support(&self, sync: bool) {
        self.state().sync_support = sync;
    }

    fn udev_sync_support(&self) -> bool {
        self.state().sync_support
    }

    fn udev_set_checking(&self, checking: bool) {
        self.state().checking = checking;
    }

    fn udev_checking(&self) -> bool {
        self.state().checking
    }

    fn cookie_supported(&self) -> bool {
        true
    }

    fn udev_create_cookie(&self) -> Option<u32> {
        let mut state = self.state();
        if state.fail_cookie_create {
            return None;
        }
        Some(state.new_cookie_base())
    }

    fn udev_complete(&self, cookie: u32) -> bool {
        self.state().cookies.contains(&cookie_base(cookie))
    }

    fn udev_wait(&self, cookie: u32) -> bool {
        self.state().cookies.remove(&cookie_base(cookie))
    }

    fn udev_wait_immediate(&self, cookie: u32) -> (bool, bool) {
        let mut state = self.state();
        let base = cookie_base(cookie);
        if !state.cookies.contains(&base) {
            return (false, false);
        }
        if state.cookies_ready {
            state.cookies.remove(&base);
            (true, true)
        } else {
            (true, false)
        }
    }

    fn message_supports_precise_timestamps(&self) -> bool {
        true
    }

    fn stats_driver_supports_precise(&self) -> bool {
        true
    }

    fn stats_driver_supports_histogram(&self) -> bool {
        true
    }
}

struct MockTask {
    state: Rc<RefCell<MockState>>,
    task_type: TaskType,
    name: Option<String>,
    uuid: Option<String>,
    message: Option<String>,
    record_timestamp: bool,
    timestamp: Option<Timestamp>,
    errno: i32,
}

impl MockTask {
    /// Whether the mock accepts a setter call.
    fn accept(&self) -> bool {
        let mut state = self.state.borrow_mut();
        if state.reject_setters {
            state.rejected_calls += 1;
            false
        } else {
            true
        }
    }

    fn device(&self) -> Option<MockDevice> {
        self.state
            .borrow()
            .devices
            .iter()
            .find(|d| self.name.as_ref() == Some(&d.name) || self.uuid.as_ref() == Some(&d.uuid))
            .cloned()
    }
}

impl Drop for MockTask {
    fn drop(&mut self) {
        self.state.borrow_mut().tasks_destroyed += 1;
    }
}

impl TaskBackend for MockTask {
    fn set_name(&mut self, name: &CStr) -> bool {
        if !self.accept() {
            return false;
        }
        self.name = Some(lossy(name));
        true
    }

    fn set_uuid(&mut self, uuid: &CStr) -> bool {
        if !self.accept() {
            return false;
        }
        self.uuid = Some(lossy(uuid));
        true
    }

    fn set_newname(&mut self, _name: &CStr) -> bool {
        self.accept()
    }

    fn set_newuuid(&mut self, _uuid: &CStr) -> bool {
        self.accept()
    }

    fn set_major(&mut self, _major: u32) -> bool {
        self.accept()
    }

    fn set_minor(&mut self, _minor: u32) -> bool {
        self.accept()
    }

    fn set_major_minor(&mut self, _major: u32, _minor: u32, _allow_default_major: bool) -> bool {
        self.accept()
    }

    fn set_uid(&mut self, _uid: u32) -> bool {
        self.accept()
    }

    fn set_gid(&mut self, _gid: u32) -> bool {
        self.accept()
    }

    fn set_mode(&mut self, _mode: u32) -> bool {
        self.accept()
    }

    fn set_event_nr(&mut self, _event_nr: u32) -> bool {
        self.accept()
    }

    fn set_cookie(&mut self, cookie: &mut u32, flags: u16) -> bool {
        if !self.accept() {
            return false;
        }
        let mut state = self.state.borrow_mut();
        let base = match cookie_base(*cookie) {
            0 => state.new_cookie_base(),
            base => base,
        };
        *cookie = (u32::from(flags) << dms::DM_UDEV_FLAGS_SHIFT) | base;
        true
    }

    fn set_geometry(
        &mut self,
        _cylinders: &CStr,
        _heads: &CStr,
        _sectors: &CStr,
        _start: &CStr,
    ) -> bool {
        self.accept()
    }

    fn set_message(&mut self, message: &CStr) -> bool {
        if !self.accept() {
            return false;
        }
        self.message = Some(lossy(message));
        true
    }

    fn set_sector(&mut self, _sector: u64) -> bool {
        self.accept()
    }

    fn set_option(&mut self, option: TaskOption) -> bool {
        if !self.accept() {
            return false;
        }
        if option == TaskOption::RecordTimestamp {
            self.record_timestamp = true;
        }
        true
    }

    fn set_add_node(&mut self, _add_node: AddNode) -> bool {
        self.accept()
    }

    fn set_read_ahead(&mut self, _read_ahead: u32, _flags: u32) -> bool {
        self.accept()
    }

    fn add_target(
        &mut self,
        _start: u64,
        _length: u64,
        _target_type: &CStr,
        _params: &CStr,
    ) -> bool {
        self.accept()
    }

    fn run(&mut self) -> bool {
        if let Some(errno) = self.state.borrow().fail_run_errno {
            self.errno = errno;
            return false;
        }
        if self.record_timestamp {
            self.timestamp = Timestamp::now().ok();
        }
        true
    }

    fn errno(&self) -> i32 {
        self.errno
    }

    fn driver_version(&self) -> Option<String> {
        self.state.borrow().driver_version.clone()
    }

    fn info(&self) -> Option<DeviceInfo> {
        let raw = match self.device() {
            Some(device) => dms::dm_info {
                exists: 1,
                live_table: 1,
                major: device.dev.major,
                minor: device.dev.minor,
                target_count: device.table.len() as i32,
                ..Default::default()
            },
            None => dms::dm_info::default(),
        };
        Some(DeviceInfo::from(raw))
    }

    fn name(&self, _mangling: NameMangling) -> Option<String> {
        self.device()
            .map(|d| d.name)
            .or_else(|| self.name.clone())
            .or_else(|| Some(String::new()))
    }

    fn uuid(&self, _mangling: NameMangling) -> Option<String> {
        Some(self.device().map(|d| d.uuid).unwrap_or_default())
    }

    // A device without dependencies gets a zero-count record, as from
    // libdevmapper; only `null_lists` produces NULL.
    fn deps(&self) -> Option<Vec<Device>> {
        if self.state.borrow().null_lists {
            return None;
        }
        Some(self.device().map(|d| d.deps).unwrap_or_default())
    }

    fn names(&self) -> Option<Vec<(String, Device)>> {
        let state = self.state.borrow();
        if state.null_lists {
            return None;
        }
        Some(
            state
                .devices
                .iter()
                .map(|d| (d.name.clone(), d.dev))
                .collect(),
        )
    }

    fn versions(&self) -> Option<Vec<(String, Version)>> {
        let state = self.state.borrow();
        if state.null_lists {
            return None;
        }
        Some(state.targets.clone())
    }

    fn message_response(&self) -> Option<String> {
        self.message.clone()
    }

    fn targets(&self) -> Vec<TargetLine> {
        let table = self.device().map(|d| d.table).unwrap_or_default();
        if self.task_type == TaskType::Status {
            table
                .into_iter()
                .map(|line| TargetLine {
                    params: String::new(),
                    ..line
                })
                .collect()
        } else {
            table
        }
    }

    fn ioctl_timestamp(&self) -> Option<Timestamp> {
        self.timestamp
    }
}

struct MockStats {
    state: Rc<RefCell<MockState>>,
    program_id: String,
    bound: Option<usize>,
    tree: BTreeMap<u64, MockRegion>,
    aliases: BTreeMap<u64, String>,
    interval_ns: u64,
}

impl MockStats {
    fn bind<F>(&mut self, matches: F) -> bool
    where
        F: Fn(&MockDevice) -> bool,
    {
        self.tree.clear();
        self.bound = self.state.borrow().devices.iter().position(matches);
        self.bound.is_some()
    }

    fn load(&mut self, program_id: Option<&CStr>, fail: bool) -> bool {
        self.tree.clear();
        let device = match self.bound {
            Some(index) if !fail => self.state.borrow().devices[index].clone(),
            _ => return false,
        };
        let program_id = program_id.map_or_else(|| self.program_id.clone(), lossy);
        self.tree = device
            .regions
            .into_iter()
            .filter(|(_, r)| program_id.is_empty() || r.program_id == program_id)
            .collect();
        self.aliases = device.aliases;
        true
    }

    fn area(&self, region_id: u64, area_id: u64) -> Option<&MockRegion> {
        self.tree
            .get(&region_id)
            .filter(|region| area_id < region.nr_areas())
    }
}

impl Drop for MockStats {
    fn drop(&mut self) {
        self.state.borrow_mut().stats_destroyed += 1;
    }
}

impl StatsBackend for MockStats {
    fn bind_devno(&mut self, major: u32, minor: u32) -> bool {
        self.bind(|d| d.dev == Device::new(major, minor))
    }

    fn bind_name(&mut self, name: &CStr) -> bool {
        let name = lossy(name);
        self.bind(|d| d.name == name)
    }

    fn bind_uuid(&mut self, uuid: &CStr) -> bool {
        let uuid = lossy(uuid);
        self.bind(|d| d.uuid == uuid)
    }

    fn list(&mut self, program_id: Option<&CStr>) -> bool {
        let fail = self.state.borrow().fail_list;
        self.load(program_id, fail)
    }

    fn populate(&mut self, program_id: Option<&CStr>, _region_id: u64) -> bool {
        let fail = self.state.borrow().fail_populate;
        self.load(program_id, fail)
    }

    fn set_program_id(&mut self, allow_empty: bool, program_id: Option<&CStr>) -> bool {
        let id = program_id.map(lossy).unwrap_or_default();
        if id.is_empty() && !allow_empty {
            return false;
        }
        self.program_id = id;
        true
    }

    fn set_sampling_interval_ns(&mut self, interval: u64) {
        self.interval_ns = interval;
    }

    fn sampling_interval_ns(&self) -> u64 {
        self.interval_ns
    }

    fn nr_regions(&self) -> u64 {
        self.tree.len() as u64
    }

    fn nr_groups(&self) -> u64 {
        self.tree
            .values()
            .filter_map(|r| r.group_id)
            .collect::<BTreeSet<_>>()
            .len() as u64
    }

    fn nr_areas(&self) -> u64 {
        self.tree.values().map(MockRegion::nr_areas).sum()
    }

    fn region_present(&self, region_id: u64) -> bool {
        self.tree.contains_key(&region_id)
    }

    fn group_present(&self, group_id: u64) -> bool {
        self.tree.values().any(|r| r.group_id == Some(group_id))
    }

    fn region_ids(&mut self) -> Vec<u64> {
        self.tree.keys().copied().collect()
    }

    fn region_nr_areas(&self, region_id: u64) -> u64 {
        self.tree.get(&region_id).map_or(0, MockRegion::nr_areas)
    }

    fn region_precise_timestamps(&self, region_id: u64) -> bool {
        self.tree.get(&region_id).is_some_and(|r| r.precise)
    }

    fn region_start(&self, region_id: u64) -> Option<u64> {
        self.tree.get(&region_id).map(|r| r.start)
    }

    fn region_len(&self, region_id: u64) -> Option<u64> {
        self.tree.get(&region_id).map(|r| r.len)
    }

    fn region_area_len(&self, region_id: u64) -> Option<u64> {
        self.tree.get(&region_id).map(|r| r.area_len)
    }

    fn region_program_id(&self, region_id: u64) -> Option<String> {
        self.tree.get(&region_id).map(|r| r.program_id.clone())
    }

    fn region_aux_data(&self, region_id: u64) -> Option<String> {
        self.tree.get(&region_id).map(|r| r.aux_data.clone())
    }

    fn region_group_id(&self, region_id: u64) -> Option<u64> {
        self.tree.get(&region_id).and_then(|r| r.group_id)
    }

    fn alias(&self, group_id: u64) -> Option<String> {
        if self.group_present(group_id) {
            self.aliases.get(&group_id).cloned()
        } else {
            None
        }
    }

    fn area_start(&self, region_id: u64, area_id: u64) -> Option<u64> {
        self.area(region_id, area_id)
            .map(|r| r.start + area_id * r.area_len)
    }

    // Distinct, predictable values: the region, area and counter can be
    // read back from the decimal digits.
    fn counter(&self, counter: Counter, region_id: u64, area_id: u64) -> u64 {
        match self.area(region_id, area_id) {
            Some(_) => (region_id + 1) * 1000 + area_id * 100 + counter.to_raw() as u64,
            None => 0,
        }
    }

    fn histogram(&self, region_id: u64, area_id: u64) -> Option<Histogram> {
        let region = self.area(region_id, area_id)?;
        if region.histogram_bounds.is_empty() {
            return None;
        }
        let base = (region_id + 1) * 1000 + area_id * 100;
        let mut lower = 0;
        let mut bins = Vec::new();
        for (i, upper) in region
            .histogram_bounds
            .iter()
            .copied()
            .chain(Some(u64::MAX))
            .enumerate()
        {
            bins.push(HistogramBin {
                lower,
                upper,
                count: base + i as u64,
            });
            lower = upper;
        }
        Some(Histogram { bins })
    }
}
