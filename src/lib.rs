// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Safe handles over libdevmapper tasks, dm-stats and udev cookies.
//!
//! # Overview
//!
//! libdevmapper is the userspace library that drives the kernel's
//! device-mapper. It is resolved at runtime, so a program built against
//! this crate still starts on a system without it; `DM::new()` reports
//! the missing library as an error.
//!
//! A `DM` context is the entry point. From it:
//!
//! * `DM::task()` allocates a `DmTask`, one ioctl. Configure it, `run()` it
//!   once, then read back the results that its task type produces. Reading
//!   a result the task does not produce is an error, not garbage.
//! * `DM::stats()` builds a `DmStats` handle bound to one device. `list()`
//!   reads the region tree, `populate()` also reads counters. The
//!   `DmStatsRegion` and `DmStatsArea` views it hands out are cached, and
//!   go stale when the tree they came from is replaced.
//! * `DM::udev_create_cookie()` allocates a `DmCookie`, which is attached
//!   to tasks and then waited on until udev has processed their events.
//!
//! All handles are single-threaded; they share state through `Rc`.

#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate assert_matches;

/// macros for checked name and uuid types
#[macro_use]
mod id_macros;

/// a weak-reference cache of views
mod cache;
/// udev cookies
mod cookie;
/// the low-level wrapping of libdevmapper
pub mod core;
/// the library-wide context
mod dm;
/// region and area views of a stats tree
mod region;
/// return results container
mod result;
/// stats handles and their builder
mod stats;
/// single ioctl tasks
mod task;
/// monotonic timestamps
mod timestamp;

#[cfg(test)]
mod testing;

pub use crate::{
    cookie::{CookieState, DmCookie},
    core::{
        backend::{DmBackend, StatsBackend, TaskBackend, TaskOption},
        AddNode, Counter, Device, DeviceInfo, DmName, DmNameBuf, DmUdevFlags, DmUuid, DmUuidBuf,
        Histogram, HistogramBin, NameMangling, NameManglingMode, TargetLine, TaskFlags, TaskType,
        TASK_TYPES,
    },
    dm::DM,
    region::{AreaCounters, DmStatsArea, DmStatsRegion},
    result::{DmError, DmResult, ErrorEnum},
    stats::{DmStats, DmStatsBuilder},
    task::DmTask,
    timestamp::Timestamp,
};

pub use devmapper_sys::{
    DM_READ_AHEAD_AUTO, DM_READ_AHEAD_MINIMUM_FLAG, DM_READ_AHEAD_NONE, DM_STATS_ALL_PROGRAMS,
    DM_STATS_REGIONS_ALL, DM_UDEV_FLAGS_MASK, DM_UDEV_FLAGS_SHIFT,
};
