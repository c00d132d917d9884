// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use serde::Serialize;

use devmapper_sys as dms;

use crate::core::device::Device;

/// Contains information about the device, as reported by a
/// `DM_DEVICE_INFO` task.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    exists: bool,
    suspended: bool,
    live_table: bool,
    inactive_table: bool,
    open_count: i32,
    event_nr: u32,
    dev: Device,
    read_only: bool,
    target_count: i32,
    deferred_remove: bool,
    internal_suspend: bool,
}

impl From<dms::dm_info> for DeviceInfo {
    fn from(info: dms::dm_info) -> DeviceInfo {
        DeviceInfo {
            exists: info.exists != 0,
            suspended: info.suspended != 0,
            live_table: info.live_table != 0,
            inactive_table: info.inactive_table != 0,
            open_count: info.open_count,
            event_nr: info.event_nr,
            dev: Device::new(info.major, info.minor),
            read_only: info.read_only != 0,
            target_count: info.target_count,
            deferred_remove: info.deferred_remove != 0,
            internal_suspend: info.internal_suspend != 0,
        }
    }
}

impl DeviceInfo {
    /// Whether the device exists. The other fields are meaningless if not.
    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Whether the device is suspended.
    pub fn suspended(&self) -> bool {
        self.suspended
    }

    /// Whether the device has a live table.
    pub fn live_table(&self) -> bool {
        self.live_table
    }

    /// Whether the device has an inactive table loaded.
    pub fn inactive_table(&self) -> bool {
        self.inactive_table
    }

    /// The number of times the device is currently open.
    pub fn open_count(&self) -> i32 {
        self.open_count
    }

    /// The last event number for the device.
    pub fn event_nr(&self) -> u32 {
        self.event_nr
    }

    /// The device's major and minor device numbers, as a Device.
    pub fn device(&self) -> Device {
        self.dev
    }

    /// Whether the device is read-only.
    pub fn read_only(&self) -> bool {
        self.read_only
    }

    /// The number of targets in the live table.
    pub fn target_count(&self) -> i32 {
        self.target_count
    }

    /// Whether the device is scheduled for removal on last close.
    pub fn deferred_remove(&self) -> bool {
        self.deferred_remove
    }

    /// Whether the device is suspended internally.
    pub fn internal_suspend(&self) -> bool {
        self.internal_suspend
    }
}
