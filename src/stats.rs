// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! dm-stats handles.
//!
//! A `DmStats` owns one native stats handle, bound to one device. Listing
//! or populating the handle builds a tree of regions, each divided into
//! areas. The tree is read through `DmStatsRegion` and `DmStatsArea` views,
//! which hold the native handle alive but own no data themselves.
//!
//! Every rebind, list or populate replaces the native tree. A sequence
//! number is bumped each time; a view made before the bump refuses all
//! further reads with `ErrorEnum::Stale`.

use std::{
    cell::{Cell, Ref, RefCell},
    fmt,
    rc::Rc,
};

use devmapper_sys as dms;

use crate::{
    cache::WeakCache,
    core::{backend::StatsBackend, errors, util::to_cstring, DmName, DmUuid},
    dm::DM,
    region::DmStatsRegion,
    result::{DmError, DmResult, ErrorEnum},
};

const NSEC_PER_SEC: f64 = 1_000_000_000.0;

/// Which regions the last populate read counters for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Populated {
    Nothing,
    All,
    Region(u64),
}

impl Populated {
    fn covers(self, region_id: u64) -> bool {
        match self {
            Populated::Nothing => false,
            Populated::All => true,
            Populated::Region(id) => id == region_id,
        }
    }
}

fn native_failure(msg: String) -> DmError {
    DmError::Core(errors::Error::Native(msg))
}

/// The state a `DmStats` shares with its views.
pub(crate) struct StatsShared {
    handle: RefCell<Box<dyn StatsBackend>>,
    sequence: Cell<u64>,
    regions: RefCell<WeakCache<DmStatsRegion>>,
    populated: Cell<Populated>,
}

impl StatsShared {
    /// Borrow the native handle, first checking that a view made at
    /// `sequence` is still current.
    pub(crate) fn handle(&self, sequence: u64) -> DmResult<Ref<'_, Box<dyn StatsBackend>>> {
        if sequence != self.sequence.get() {
            return Err(DmError::Dm(
                ErrorEnum::Stale,
                "attempted to access data in a changed DmStats".to_string(),
            ));
        }
        Ok(self.handle.borrow())
    }

    pub(crate) fn sequence(&self) -> u64 {
        self.sequence.get()
    }

    /// Fail unless counters were read for `region_id`.
    pub(crate) fn require_populated(&self, region_id: u64, area_id: u64) -> DmResult<()> {
        if self.populated.get().covers(region_id) {
            Ok(())
        } else {
            Err(DmError::Dm(
                ErrorEnum::Gated,
                format!(
                    "DmStatsArea({region_id}, {area_id}) requires populated counter data."
                ),
            ))
        }
    }

    /// Forget the current tree, ahead of the native call that replaces it.
    fn discard_tree(&self) {
        let live = self.regions.borrow_mut().take_live();
        for region in live {
            region.discard_areas();
        }
        self.populated.set(Populated::Nothing);
    }

    fn bump_sequence(&self) {
        let sequence = self.sequence.get() + 1;
        self.sequence.set(sequence);
        debug!("DmStats sequence now {}", sequence);
    }

    /// Size the region cache for the tree the native handle now holds.
    fn rebuild(&self) {
        let len = {
            let mut handle = self.handle.borrow_mut();
            if handle.nr_areas() == 0 {
                0
            } else {
                handle
                    .region_ids()
                    .into_iter()
                    .max()
                    .map_or(0, |id| id as usize + 1)
            }
        };
        debug!("DmStats region cache resized to {}", len);
        self.regions.borrow_mut().reset(len);
    }
}

/// A dm-stats handle bound to one device.
pub struct DmStats {
    shared: Rc<StatsShared>,
}

impl DmStats {
    /// Start building a handle. Exactly one of a name, a UUID, or a major
    /// and minor pair must be given.
    pub fn builder(dm: &DM) -> DmStatsBuilder<'_> {
        DmStatsBuilder {
            dm,
            program_id: None,
            name: None,
            uuid: None,
            major: None,
            minor: None,
        }
    }

    fn from_handle(handle: Box<dyn StatsBackend>) -> DmStats {
        DmStats {
            shared: Rc::new(StatsShared {
                handle: RefCell::new(handle),
                sequence: Cell::new(0),
                regions: RefCell::new(WeakCache::new("Region")),
                populated: Cell::new(Populated::Nothing),
            }),
        }
    }

    fn rebind<F>(&self, what: &str, bind: F) -> DmResult<()>
    where
        F: FnOnce(&mut dyn StatsBackend) -> bool,
    {
        self.shared.discard_tree();
        let bound = {
            let mut handle = self.shared.handle.borrow_mut();
            bind(&mut **handle)
        };
        self.shared.bump_sequence();
        if bound {
            debug!("DmStats bound to {}", what);
            Ok(())
        } else {
            Err(native_failure(format!("Failed to bind DmStats to {what}")))
        }
    }

    /// Bind to the device with this name.
    pub fn bind_name(&self, name: &str) -> DmResult<()> {
        let name = DmName::new(name)?;
        let cname = name.to_cstring();
        self.rebind(&format!("name {name}"), |handle| handle.bind_name(&cname))
    }

    /// Bind to the device with this UUID.
    pub fn bind_uuid(&self, uuid: &str) -> DmResult<()> {
        let uuid = DmUuid::new(uuid)?;
        let cuuid = uuid.to_cstring();
        self.rebind(&format!("UUID {uuid}"), |handle| handle.bind_uuid(&cuuid))
    }

    /// Bind to the device with these numbers.
    pub fn bind_devno(&self, major: u32, minor: u32) -> DmResult<()> {
        self.rebind(&format!("device {major}:{minor}"), |handle| {
            handle.bind_devno(major, minor)
        })
    }

    /// Read the regions of the bound device, without counters.
    ///
    /// With no `program_id`, only the handle's own regions are read;
    /// `DM_STATS_ALL_PROGRAMS` reads every region.
    pub fn list(&self, program_id: Option<&str>) -> DmResult<()> {
        let program_id = program_id
            .map(|id| to_cstring(id, "Program id"))
            .transpose()?;
        self.shared.discard_tree();
        let listed = self
            .shared
            .handle
            .borrow_mut()
            .list(program_id.as_deref());
        self.shared.bump_sequence();
        if !listed {
            return Err(native_failure("Failed to list DmStats regions".to_string()));
        }
        self.shared.rebuild();
        Ok(())
    }

    /// Read the regions of the bound device and their counters. `region_id`
    /// restricts the counters to one region.
    pub fn populate(&self, program_id: Option<&str>, region_id: Option<u64>) -> DmResult<()> {
        let program_id = program_id
            .map(|id| to_cstring(id, "Program id"))
            .transpose()?;
        self.shared.discard_tree();
        let populated = self.shared.handle.borrow_mut().populate(
            program_id.as_deref(),
            region_id.unwrap_or(dms::DM_STATS_REGIONS_ALL),
        );
        self.shared.bump_sequence();
        if !populated {
            return Err(native_failure(
                "Failed to populate DmStats regions".to_string(),
            ));
        }
        self.shared.rebuild();
        self.shared.populated.set(match region_id {
            Some(id) => Populated::Region(id),
            None => Populated::All,
        });
        Ok(())
    }

    /// The view of one region.
    ///
    /// Returns `Ok(None)` if the tree has no region with this id, and an
    /// `ErrorEnum::OutOfRange` error if the id is past the highest one.
    pub fn region(&self, region_id: u64) -> DmResult<Option<Rc<DmStatsRegion>>> {
        let shared = &self.shared;
        let mut regions = shared.regions.borrow_mut();
        regions.lookup(
            region_id,
            || shared.handle.borrow().region_present(region_id),
            |id| Rc::new(DmStatsRegion::new(Rc::clone(shared), id)),
        )
    }

    /// Views of every region in the tree, in id order.
    pub fn regions(&self) -> DmResult<Vec<Rc<DmStatsRegion>>> {
        let mut regions = Vec::new();
        for id in 0..self.len() as u64 {
            if let Some(region) = self.region(id)? {
                regions.push(region);
            }
        }
        Ok(regions)
    }

    /// One more than the highest region id in the tree.
    pub fn len(&self) -> usize {
        self.shared.regions.borrow().len()
    }

    /// True if the tree has no regions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The number of times the tree has been replaced.
    pub fn sequence(&self) -> u64 {
        self.shared.sequence()
    }

    /// Number of regions present in the tree.
    pub fn nr_regions(&self) -> u64 {
        self.shared.handle.borrow().nr_regions()
    }

    /// Number of groups present in the tree.
    pub fn nr_groups(&self) -> u64 {
        self.shared.handle.borrow().nr_groups()
    }

    /// The number of areas across all regions.
    pub fn nr_areas(&self) -> u64 {
        self.shared.handle.borrow().nr_areas()
    }

    /// Whether `region_id` names a region in the tree.
    pub fn region_present(&self, region_id: u64) -> bool {
        self.shared.handle.borrow().region_present(region_id)
    }

    /// Area count of one region. Zero for an absent region.
    pub fn region_nr_areas(&self, region_id: u64) -> u64 {
        self.shared.handle.borrow().region_nr_areas(region_id)
    }

    /// Whether `group_id` names a group in the tree.
    pub fn group_present(&self, group_id: u64) -> bool {
        self.shared.handle.borrow().group_present(group_id)
    }

    /// The interval between counter reads, in seconds.
    pub fn sampling_interval(&self) -> f64 {
        self.shared.handle.borrow().sampling_interval_ns() as f64 / NSEC_PER_SEC
    }

    /// Set the interval between counter reads, in seconds.
    pub fn set_sampling_interval(&self, secs: f64) -> DmResult<()> {
        if !secs.is_finite() || secs < 0.0 {
            return Err(DmError::Dm(
                ErrorEnum::Invalid,
                format!("Sampling interval {secs} must be a non-negative number of seconds."),
            ));
        }
        self.shared
            .handle
            .borrow_mut()
            .set_sampling_interval_ns((secs * NSEC_PER_SEC) as u64);
        Ok(())
    }

    /// Override the program id the handle was created with. An empty or
    /// absent id is only accepted with `allow_empty`, and then clears the id
    /// so that `list(None)` reads the regions of every program.
    pub fn set_program_id(&self, program_id: Option<&str>, allow_empty: bool) -> DmResult<()> {
        if program_id.map_or(true, str::is_empty) && !allow_empty {
            return Err(DmError::Dm(
                ErrorEnum::Invalid,
                "Empty program_id requires allow_empty.".to_string(),
            ));
        }
        let program_id = program_id
            .map(|id| to_cstring(id, "Program id"))
            .transpose()?;
        if self
            .shared
            .handle
            .borrow_mut()
            .set_program_id(allow_empty, program_id.as_deref())
        {
            Ok(())
        } else {
            Err(native_failure("Failed to set DmStats program id".to_string()))
        }
    }
}

impl fmt::Debug for DmStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DmStats")
            .field("sequence", &self.sequence())
            .field("len", &self.len())
            .finish()
    }
}

/// Builder for `DmStats`, see `DmStats::builder`.
pub struct DmStatsBuilder<'a> {
    dm: &'a DM,
    program_id: Option<String>,
    name: Option<String>,
    uuid: Option<String>,
    major: Option<u32>,
    minor: Option<u32>,
}

impl DmStatsBuilder<'_> {
    /// The program id regions are created and listed under. Defaults to
    /// the library's choice, the program name.
    pub fn program_id(mut self, program_id: &str) -> Self {
        self.program_id = Some(program_id.to_string());
        self
    }

    /// Select the device by name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Select the device by UUID.
    pub fn uuid(mut self, uuid: &str) -> Self {
        self.uuid = Some(uuid.to_string());
        self
    }

    /// Device major number. Requires `minor`.
    pub fn major(mut self, major: u32) -> Self {
        self.major = Some(major);
        self
    }

    /// Device minor number. Requires `major`.
    pub fn minor(mut self, minor: u32) -> Self {
        self.minor = Some(minor);
        self
    }

    /// Allocate the handle and bind it.
    pub fn build(self) -> DmResult<DmStats> {
        let selector = match (self.name, self.uuid, self.major, self.minor) {
            (Some(name), None, None, None) => Selector::Name(name),
            (None, Some(uuid), None, None) => Selector::Uuid(uuid),
            (None, None, Some(major), Some(minor)) => Selector::Devno(major, minor),
            (None, None, Some(_), None) | (None, None, None, Some(_)) => {
                return Err(DmError::Dm(
                    ErrorEnum::Invalid,
                    "Both major and minor are required to bind by device number.".to_string(),
                ))
            }
            _ => {
                return Err(DmError::Dm(
                    ErrorEnum::Invalid,
                    "Please specify exactly one of name, uuid, or major and minor.".to_string(),
                ))
            }
        };

        let program_id = self
            .program_id
            .as_deref()
            .map(|id| to_cstring(id, "Program id"))
            .transpose()?;
        let handle = self
            .dm
            .backend()
            .stats_create(program_id.as_deref())
            .ok_or_else(|| native_failure("Failed to create DmStats handle".to_string()))?;
        let stats = DmStats::from_handle(handle);

        // On failure the handle is dropped with `stats`.
        match selector {
            Selector::Name(name) => stats.bind_name(&name)?,
            Selector::Uuid(uuid) => stats.bind_uuid(&uuid)?,
            Selector::Devno(major, minor) => stats.bind_devno(major, minor)?,
        }
        Ok(stats)
    }
}

enum Selector {
    Name(String),
    Uuid(String),
    Devno(u32, u32),
}
