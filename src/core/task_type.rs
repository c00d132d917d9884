// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::fmt;

use nix::libc::c_int;

use devmapper_sys as dms;

use crate::core::dm_flags::TaskFlags;

/// The kinds of operation a `DmTask` can perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskType {
    /// Create a device.
    Create,
    /// Load a table into a device's inactive slot.
    Reload,
    /// Remove a device.
    Remove,
    /// Remove all devices.
    RemoveAll,
    /// Suspend a device.
    Suspend,
    /// Resume a device, swapping in any inactive table.
    Resume,
    /// Query device info.
    Info,
    /// Query the devices a device depends on.
    Deps,
    /// Rename a device or set its UUID.
    Rename,
    /// Query the driver version.
    Version,
    /// Query target status.
    Status,
    /// Query the device table.
    Table,
    /// Wait for a device event.
    WaitEvent,
    /// List devices.
    List,
    /// Clear a device's inactive table.
    Clear,
    /// Make or remove device nodes.
    MkNodes,
    /// List the versions of loaded targets.
    ListVersions,
    /// Send a message to a target.
    TargetMsg,
    /// Set a device's geometry.
    SetGeometry,
}

/// Every task type, in native numbering order.
pub const TASK_TYPES: [TaskType; 19] = [
    TaskType::Create,
    TaskType::Reload,
    TaskType::Remove,
    TaskType::RemoveAll,
    TaskType::Suspend,
    TaskType::Resume,
    TaskType::Info,
    TaskType::Deps,
    TaskType::Rename,
    TaskType::Version,
    TaskType::Status,
    TaskType::Table,
    TaskType::WaitEvent,
    TaskType::List,
    TaskType::Clear,
    TaskType::MkNodes,
    TaskType::ListVersions,
    TaskType::TargetMsg,
    TaskType::SetGeometry,
];

impl TaskType {
    /// The data a successful run of this task type makes available.
    pub fn data_flags(self) -> TaskFlags {
        match self {
            TaskType::Create
            | TaskType::Reload
            | TaskType::Remove
            | TaskType::Suspend
            | TaskType::Resume
            | TaskType::Rename
            | TaskType::WaitEvent
            | TaskType::Clear
            | TaskType::SetGeometry => TaskFlags::IDENTITY,
            TaskType::RemoveAll | TaskType::Version | TaskType::MkNodes => TaskFlags::empty(),
            TaskType::Info => TaskFlags::IDENTITY | TaskFlags::INFO,
            TaskType::Deps => TaskFlags::IDENTITY | TaskFlags::DEPS,
            TaskType::Status => TaskFlags::IDENTITY | TaskFlags::STATUS,
            TaskType::Table => TaskFlags::IDENTITY | TaskFlags::TABLE,
            TaskType::List => TaskFlags::NAME_LIST,
            TaskType::ListVersions => TaskFlags::TARGET_VERSIONS,
            TaskType::TargetMsg => TaskFlags::IDENTITY | TaskFlags::MESSAGE,
        }
    }

    /// The libdevmapper task number.
    pub fn to_raw(self) -> c_int {
        match self {
            TaskType::Create => dms::DM_DEVICE_CREATE,
            TaskType::Reload => dms::DM_DEVICE_RELOAD,
            TaskType::Remove => dms::DM_DEVICE_REMOVE,
            TaskType::RemoveAll => dms::DM_DEVICE_REMOVE_ALL,
            TaskType::Suspend => dms::DM_DEVICE_SUSPEND,
            TaskType::Resume => dms::DM_DEVICE_RESUME,
            TaskType::Info => dms::DM_DEVICE_INFO,
            TaskType::Deps => dms::DM_DEVICE_DEPS,
            TaskType::Rename => dms::DM_DEVICE_RENAME,
            TaskType::Version => dms::DM_DEVICE_VERSION,
            TaskType::Status => dms::DM_DEVICE_STATUS,
            TaskType::Table => dms::DM_DEVICE_TABLE,
            TaskType::WaitEvent => dms::DM_DEVICE_WAITEVENT,
            TaskType::List => dms::DM_DEVICE_LIST,
            TaskType::Clear => dms::DM_DEVICE_CLEAR,
            TaskType::MkNodes => dms::DM_DEVICE_MKNODES,
            TaskType::ListVersions => dms::DM_DEVICE_LIST_VERSIONS,
            TaskType::TargetMsg => dms::DM_DEVICE_TARGET_MSG,
            TaskType::SetGeometry => dms::DM_DEVICE_SET_GEOMETRY,
        }
    }

    /// The task type for a libdevmapper task number, if there is one.
    pub fn from_raw(raw: c_int) -> Option<TaskType> {
        usize::try_from(raw)
            .ok()
            .and_then(|index| TASK_TYPES.get(index))
            .copied()
    }

    /// The libdevmapper name of the task type.
    pub fn name(self) -> &'static str {
        match self {
            TaskType::Create => "DM_DEVICE_CREATE",
            TaskType::Reload => "DM_DEVICE_RELOAD",
            TaskType::Remove => "DM_DEVICE_REMOVE",
            TaskType::RemoveAll => "DM_DEVICE_REMOVE_ALL",
            TaskType::Suspend => "DM_DEVICE_SUSPEND",
            TaskType::Resume => "DM_DEVICE_RESUME",
            TaskType::Info => "DM_DEVICE_INFO",
            TaskType::Deps => "DM_DEVICE_DEPS",
            TaskType::Rename => "DM_DEVICE_RENAME",
            TaskType::Version => "DM_DEVICE_VERSION",
            TaskType::Status => "DM_DEVICE_STATUS",
            TaskType::Table => "DM_DEVICE_TABLE",
            TaskType::WaitEvent => "DM_DEVICE_WAITEVENT",
            TaskType::List => "DM_DEVICE_LIST",
            TaskType::Clear => "DM_DEVICE_CLEAR",
            TaskType::MkNodes => "DM_DEVICE_MKNODES",
            TaskType::ListVersions => "DM_DEVICE_LIST_VERSIONS",
            TaskType::TargetMsg => "DM_DEVICE_TARGET_MSG",
            TaskType::SetGeometry => "DM_DEVICE_SET_GEOMETRY",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
