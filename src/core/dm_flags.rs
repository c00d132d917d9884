// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use devmapper_sys as dms;

bitflags! {
    /// State and result flags tracked by a `DmTask`.
    ///
    /// `DID_IOCTL` and `DID_ERROR` record what `run()` did. Every other
    /// flag marks one category of result data as valid to read.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct TaskFlags: u32 {
        /// The task has been run.
        const DID_IOCTL           = 0x0000_0001;
        /// The run failed.
        const DID_ERROR           = 0x0000_0002;
        /// An info record is available.
        const INFO                = 0x0000_0010;
        /// The device name is available.
        const NAME                = 0x0000_0020;
        /// The device UUID is available.
        const UUID                = 0x0000_0040;
        /// A dependency list is available.
        const DEPS                = 0x0000_0080;
        /// A device name list is available.
        const NAME_LIST           = 0x0000_0100;
        /// The ioctl timestamp is available.
        const TIMESTAMP           = 0x0000_0200;
        /// A target message response is available.
        const MESSAGE             = 0x0000_0400;
        /// The device table is available.
        const TABLE               = 0x0000_0800;
        /// Target status is available.
        const STATUS              = 0x0000_1000;
        /// The list of loaded target versions is available.
        const TARGET_VERSIONS     = 0x0000_2000;

        /// Name and UUID.
        const IDENTITY = Self::NAME.bits() | Self::UUID.bits();
    }
}

/// The name used for each result category in diagnostics.
const DATA_NAMES: &[(TaskFlags, &str)] = &[
    (TaskFlags::DID_IOCTL, "ioctl"),
    (TaskFlags::DID_ERROR, "error"),
    (TaskFlags::INFO, "info"),
    (TaskFlags::NAME, "name"),
    (TaskFlags::UUID, "UUID"),
    (TaskFlags::DEPS, "dependencies"),
    (TaskFlags::NAME_LIST, "name list"),
    (TaskFlags::TIMESTAMP, "timestamp"),
    (TaskFlags::MESSAGE, "message response"),
    (TaskFlags::TABLE, "table"),
    (TaskFlags::STATUS, "status"),
    (TaskFlags::TARGET_VERSIONS, "target versions"),
];

impl TaskFlags {
    /// The diagnostic name of the lowest category set in `self`.
    pub fn describe(self) -> &'static str {
        DATA_NAMES
            .iter()
            .find(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .unwrap_or("unknown")
    }
}

bitflags! {
    /// Flags passed with a udev cookie, see:
    /// https://sourceware.org/git/?p=lvm2.git;a=blob;f=libdm/libdevmapper.h
    /// for complete information about the meaning of the flags.
    ///
    /// They travel in the upper 16 bits of the cookie value, see
    /// `DM_UDEV_FLAGS_SHIFT`.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct DmUdevFlags: u16 {
        /// Disables basic device-mapper udev rules that create symlinks in /dev/<DM_DIR>
        /// directory.
        const DM_UDEV_DISABLE_DM_RULES_FLAG = dms::DM_UDEV_DISABLE_DM_RULES_FLAG;
        /// Disable subsystem udev rules, but allow general DM udev rules to run.
        const DM_UDEV_DISABLE_SUBSYSTEM_RULES_FLAG = dms::DM_UDEV_DISABLE_SUBSYSTEM_RULES_FLAG;
        /// Disable dm udev rules which create symlinks in /dev/disk/* directory.
        const DM_UDEV_DISABLE_DISK_RULES_FLAG = dms::DM_UDEV_DISABLE_DISK_RULES_FLAG;
        /// Disable all rules that are not general dm nor subsystem related.
        const DM_UDEV_DISABLE_OTHER_RULES_FLAG = dms::DM_UDEV_DISABLE_OTHER_RULES_FLAG;
        /// Instruct udev rules to give lower priority to the device.
        const DM_UDEV_LOW_PRIORITY_FLAG = dms::DM_UDEV_LOW_PRIORITY_FLAG;
        /// Disable libdevmapper's node management.
        const DM_UDEV_DISABLE_LIBRARY_FALLBACK = dms::DM_UDEV_DISABLE_LIBRARY_FALLBACK;
        /// Automatically appended to all IOCTL calls issues by libdevmapper for generating
        /// udev uevents.
        const DM_UDEV_PRIMARY_SOURCE_FLAG = dms::DM_UDEV_PRIMARY_SOURCE_FLAG;
        /// Reserved for use by the subsystem owning the device.
        const DM_SUBSYSTEM_UDEV_FLAG0 = dms::DM_SUBSYSTEM_UDEV_FLAG0;
        /// Reserved for use by the subsystem owning the device.
        const DM_SUBSYSTEM_UDEV_FLAG1 = dms::DM_SUBSYSTEM_UDEV_FLAG1;
        /// Reserved for use by the subsystem owning the device.
        const DM_SUBSYSTEM_UDEV_FLAG2 = dms::DM_SUBSYSTEM_UDEV_FLAG2;
        /// Reserved for use by the subsystem owning the device.
        const DM_SUBSYSTEM_UDEV_FLAG3 = dms::DM_SUBSYSTEM_UDEV_FLAG3;
        /// Reserved for use by the subsystem owning the device.
        const DM_SUBSYSTEM_UDEV_FLAG4 = dms::DM_SUBSYSTEM_UDEV_FLAG4;
        /// Reserved for use by the subsystem owning the device.
        const DM_SUBSYSTEM_UDEV_FLAG5 = dms::DM_SUBSYSTEM_UDEV_FLAG5;
        /// Reserved for use by the subsystem owning the device.
        const DM_SUBSYSTEM_UDEV_FLAG6 = dms::DM_SUBSYSTEM_UDEV_FLAG6;
        /// Reserved for use by the subsystem owning the device.
        const DM_SUBSYSTEM_UDEV_FLAG7 = dms::DM_SUBSYSTEM_UDEV_FLAG7;
    }
}
