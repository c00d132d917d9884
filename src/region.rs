// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{cell::RefCell, fmt, rc::Rc};

use serde::Serialize;

use crate::{
    cache::WeakCache,
    core::{errors, Counter, Histogram},
    result::{DmError, DmResult},
    stats::StatsShared,
};

fn missing(what: &str, region_id: u64) -> DmError {
    DmError::Core(errors::Error::Native(format!(
        "Failed to get {what} of region {region_id}"
    )))
}

/// A view of one region of a `DmStats` tree.
///
/// The view keeps the `DmStats` handle alive. It becomes stale, and every
/// method fails with `ErrorEnum::Stale`, once the tree it was made from is
/// replaced.
pub struct DmStatsRegion {
    stats: Rc<StatsShared>,
    region_id: u64,
    sequence: u64,
    areas: RefCell<WeakCache<DmStatsArea>>,
}

impl DmStatsRegion {
    pub(crate) fn new(stats: Rc<StatsShared>, region_id: u64) -> DmStatsRegion {
        let sequence = stats.sequence();
        let nr_areas = stats
            .handle(sequence)
            .map(|handle| handle.region_nr_areas(region_id))
            .unwrap_or(0);
        let mut areas = WeakCache::new("Area");
        areas.reset(nr_areas as usize);
        DmStatsRegion {
            stats,
            region_id,
            sequence,
            areas: RefCell::new(areas),
        }
    }

    pub(crate) fn discard_areas(&self) {
        self.areas.borrow_mut().reset(0);
    }

    /// The region id.
    pub fn id(&self) -> u64 {
        self.region_id
    }

    /// Number of areas the region is split into.
    pub fn nr_areas(&self) -> DmResult<u64> {
        Ok(self
            .stats
            .handle(self.sequence)?
            .region_nr_areas(self.region_id))
    }

    /// Whether the region is still in the tree.
    pub fn present(&self) -> DmResult<bool> {
        Ok(self
            .stats
            .handle(self.sequence)?
            .region_present(self.region_id))
    }

    /// Whether the region records nanosecond-precision timestamps.
    pub fn precise_timestamps(&self) -> DmResult<bool> {
        Ok(self
            .stats
            .handle(self.sequence)?
            .region_precise_timestamps(self.region_id))
    }

    /// First sector of the region.
    pub fn start(&self) -> DmResult<u64> {
        self.stats
            .handle(self.sequence)?
            .region_start(self.region_id)
            .ok_or_else(|| missing("start", self.region_id))
    }

    /// Length of the region, in sectors.
    pub fn len(&self) -> DmResult<u64> {
        self.stats
            .handle(self.sequence)?
            .region_len(self.region_id)
            .ok_or_else(|| missing("length", self.region_id))
    }

    /// Length of each area, in sectors. The last area may be shorter.
    pub fn area_len(&self) -> DmResult<u64> {
        self.stats
            .handle(self.sequence)?
            .region_area_len(self.region_id)
            .ok_or_else(|| missing("area length", self.region_id))
    }

    /// The program id the region was created under. Empty if none.
    pub fn program_id(&self) -> DmResult<String> {
        Ok(self
            .stats
            .handle(self.sequence)?
            .region_program_id(self.region_id)
            .unwrap_or_default())
    }

    /// User auxiliary data stored with the region.
    pub fn aux_data(&self) -> DmResult<String> {
        Ok(self
            .stats
            .handle(self.sequence)?
            .region_aux_data(self.region_id)
            .unwrap_or_default())
    }

    /// The group the region belongs to, if any.
    pub fn group_id(&self) -> DmResult<Option<u64>> {
        Ok(self
            .stats
            .handle(self.sequence)?
            .region_group_id(self.region_id))
    }

    /// The alias of the region's group, if it is in an aliased group.
    pub fn alias(&self) -> DmResult<Option<String>> {
        let handle = self.stats.handle(self.sequence)?;
        Ok(handle
            .region_group_id(self.region_id)
            .and_then(|group_id| handle.alias(group_id)))
    }

    /// The view of one area of the region.
    pub fn area(&self, area_id: u64) -> DmResult<Option<Rc<DmStatsArea>>> {
        let present = self
            .stats
            .handle(self.sequence)?
            .region_present(self.region_id);
        self.areas.borrow_mut().lookup(
            area_id,
            || present,
            |id| {
                Rc::new(DmStatsArea {
                    stats: Rc::clone(&self.stats),
                    region_id: self.region_id,
                    area_id: id,
                    sequence: self.sequence,
                })
            },
        )
    }

    /// Views of every area of the region, in order.
    pub fn areas(&self) -> DmResult<Vec<Rc<DmStatsArea>>> {
        let nr_areas = self.areas.borrow().len() as u64;
        let mut areas = Vec::new();
        for id in 0..nr_areas {
            areas.extend(self.area(id)?);
        }
        Ok(areas)
    }
}

impl fmt::Debug for DmStatsRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DmStatsRegion")
            .field("region_id", &self.region_id)
            .field("sequence", &self.sequence)
            .finish()
    }
}

/// The counters of one area, as read by a populate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AreaCounters {
    pub reads: u64,
    pub reads_merged: u64,
    pub read_sectors: u64,
    pub read_nsecs: u64,
    pub writes: u64,
    pub writes_merged: u64,
    pub write_sectors: u64,
    pub write_nsecs: u64,
    pub io_in_progress: u64,
    pub io_nsecs: u64,
    pub weighted_io_nsecs: u64,
    pub total_read_nsecs: u64,
    pub total_write_nsecs: u64,
}

/// A view of one area of a region.
///
/// Like `DmStatsRegion`, the view goes stale when the tree is replaced.
/// Counters and histograms are only available once a populate has read
/// them for the area's region.
pub struct DmStatsArea {
    stats: Rc<StatsShared>,
    region_id: u64,
    area_id: u64,
    sequence: u64,
}

impl DmStatsArea {
    /// Id of the region the area belongs to.
    pub fn region_id(&self) -> u64 {
        self.region_id
    }

    /// The area id, its index within the region.
    pub fn id(&self) -> u64 {
        self.area_id
    }

    /// First sector of the area.
    pub fn start(&self) -> DmResult<u64> {
        self.stats
            .handle(self.sequence)?
            .area_start(self.region_id, self.area_id)
            .ok_or_else(|| {
                DmError::Core(errors::Error::Native(format!(
                    "Failed to get start of area {} of region {}",
                    self.area_id, self.region_id
                )))
            })
    }

    /// One counter of the area, as read by the last populate.
    pub fn counter(&self, counter: Counter) -> DmResult<u64> {
        let handle = self.stats.handle(self.sequence)?;
        self.stats
            .require_populated(self.region_id, self.area_id)?;
        Ok(handle.counter(counter, self.region_id, self.area_id))
    }

    /// Every counter of the area.
    pub fn counters(&self) -> DmResult<AreaCounters> {
        let handle = self.stats.handle(self.sequence)?;
        self.stats
            .require_populated(self.region_id, self.area_id)?;
        let get = |counter| handle.counter(counter, self.region_id, self.area_id);
        Ok(AreaCounters {
            reads: get(Counter::Reads),
            reads_merged: get(Counter::ReadsMerged),
            read_sectors: get(Counter::ReadSectors),
            read_nsecs: get(Counter::ReadNsecs),
            writes: get(Counter::Writes),
            writes_merged: get(Counter::WritesMerged),
            write_sectors: get(Counter::WriteSectors),
            write_nsecs: get(Counter::WriteNsecs),
            io_in_progress: get(Counter::IoInProgress),
            io_nsecs: get(Counter::IoNsecs),
            weighted_io_nsecs: get(Counter::WeightedIoNsecs),
            total_read_nsecs: get(Counter::TotalReadNsecs),
            total_write_nsecs: get(Counter::TotalWriteNsecs),
        })
    }

    /// The latency histogram, if the region was created with one.
    pub fn histogram(&self) -> DmResult<Option<Histogram>> {
        let handle = self.stats.handle(self.sequence)?;
        self.stats
            .require_populated(self.region_id, self.area_id)?;
        Ok(handle.histogram(self.region_id, self.area_id))
    }
}

impl fmt::Debug for DmStatsArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DmStatsArea")
            .field("region_id", &self.region_id)
            .field("area_id", &self.area_id)
            .field("sequence", &self.sequence)
            .finish()
    }
}
