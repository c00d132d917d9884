// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Modules that wrap libdevmapper at a low level: the backend seam, the
//! library-backed implementation of it, and the plain value types that
//! cross it.

pub mod backend;
mod device;
mod deviceinfo;
mod dm_flags;
pub mod errors;
pub(crate) mod libdm;
mod records;
pub(crate) mod task_type;
pub(crate) mod types;
pub(crate) mod util;

pub use self::{
    device::Device,
    deviceinfo::DeviceInfo,
    dm_flags::{DmUdevFlags, TaskFlags},
    task_type::{TaskType, TASK_TYPES},
    types::{
        AddNode, Counter, DmName, DmNameBuf, DmUuid, DmUuidBuf, Histogram, HistogramBin,
        NameMangling, NameManglingMode, TargetLine,
    },
};
