// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::rc::Rc;

use semver::Version;

use devmapper_sys as dms;

use crate::{
    core::{
        backend::DmBackend, errors, libdm::LibDm, task_type::TaskType, types::NameManglingMode,
        util::to_cstring, DmName,
    },
    cookie::DmCookie,
    result::{DmError, DmResult, ErrorEnum},
    stats::{DmStats, DmStatsBuilder},
    task::DmTask,
};

/// Context for calls into libdevmapper.
///
/// Holds the backend that tasks, stats handles and cookies are made from.
/// The library-wide settings exposed here are process-global in
/// libdevmapper, whichever `DM` they are changed through.
#[derive(Clone)]
pub struct DM {
    backend: Rc<dyn DmBackend>,
}

fn check_dir(dir: &str) -> DmResult<()> {
    if dir.starts_with('/') {
        Ok(())
    } else {
        Err(DmError::Dm(
            ErrorEnum::Invalid,
            format!("Invalid directory value, {dir}: not an absolute name."),
        ))
    }
}

fn native_failure(what: &str) -> DmError {
    DmError::Core(errors::Error::Native(what.to_string()))
}

impl DM {
    /// Create a new context, loading libdevmapper on first use.
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> DmResult<DM> {
        Ok(DM::with_backend(Rc::new(LibDm::load()?)))
    }

    /// Create a context over an arbitrary backend.
    pub fn with_backend(backend: Rc<dyn DmBackend>) -> DM {
        DM { backend }
    }

    pub(crate) fn backend(&self) -> &Rc<dyn DmBackend> {
        &self.backend
    }

    /// Allocate a task of the given type.
    pub fn task(&self, task_type: TaskType) -> DmResult<DmTask> {
        DmTask::new(self, task_type)
    }

    /// Start building a stats handle.
    pub fn stats(&self) -> DmStatsBuilder<'_> {
        DmStats::builder(self)
    }

    /// Allocate a udev cookie from the library's semaphore pool.
    pub fn udev_create_cookie(&self) -> DmResult<DmCookie> {
        match self.backend.udev_create_cookie() {
            Some(value) => {
                debug!("Created udev cookie {:#x}", value);
                Ok(DmCookie::from_native(self, value))
            }
            None => Err(DmError::Core(errors::Error::Os(
                "Failed to create udev cookie".to_string(),
                nix::Error::last(),
            ))),
        }
    }

    /// The libdevmapper version string, e.g. "1.02.197 (2023-11-21)".
    pub fn library_version(&self) -> DmResult<String> {
        self.backend
            .library_version()
            .ok_or_else(|| native_failure("Failed to get library version"))
    }

    /// The kernel driver version.
    pub fn driver_version(&self) -> DmResult<Version> {
        let version = self
            .backend
            .driver_version()
            .ok_or_else(|| native_failure("Failed to get driver version"))?;
        Version::parse(version.trim()).map_err(|err| {
            DmError::Dm(
                ErrorEnum::Error,
                format!("Driver version {version:?} is malformed: {err}"),
            )
        })
    }

    /// Wait for pending device node operations to complete.
    pub fn update_nodes(&self) {
        self.backend.update_nodes()
    }

    /// Set the name mangling mode used for all later tasks.
    pub fn set_name_mangling_mode(&self, mode: NameManglingMode) -> DmResult<()> {
        if self.backend.set_name_mangling_mode(mode) {
            Ok(())
        } else {
            Err(native_failure("Failed to set name mangling mode"))
        }
    }

    pub fn name_mangling_mode(&self) -> DmResult<NameManglingMode> {
        NameManglingMode::try_from(self.backend.name_mangling_mode())
    }

    /// Set the directory device nodes are created under, e.g. "/dev".
    pub fn set_dev_dir(&self, dir: &str) -> DmResult<()> {
        check_dir(dir)?;
        if self.backend.set_dev_dir(&to_cstring(dir, "Directory")?) {
            Ok(())
        } else {
            Err(native_failure("Failed to set device directory"))
        }
    }

    /// The device-mapper directory, e.g. "/dev/mapper".
    pub fn dev_dir(&self) -> String {
        self.backend.dev_dir()
    }

    /// Set the sysfs mount point, e.g. "/sys".
    pub fn set_sysfs_dir(&self, dir: &str) -> DmResult<()> {
        check_dir(dir)?;
        if self.backend.set_sysfs_dir(&to_cstring(dir, "Directory")?) {
            Ok(())
        } else {
            Err(native_failure("Failed to set sysfs directory"))
        }
    }

    pub fn sysfs_dir(&self) -> String {
        self.backend.sysfs_dir()
    }

    /// Set the prefix libdevmapper expects on the UUIDs of the devices it
    /// manages, e.g. "LVM-".
    pub fn set_uuid_prefix(&self, prefix: &str) -> DmResult<()> {
        if prefix.is_empty() || prefix.len() > dms::DM_MAX_UUID_PREFIX_LEN {
            return Err(DmError::Dm(
                ErrorEnum::Invalid,
                format!(
                    "UUID prefix {prefix:?} must have between 1 and {} bytes.",
                    dms::DM_MAX_UUID_PREFIX_LEN
                ),
            ));
        }
        if self.backend.set_uuid_prefix(&to_cstring(prefix, "UUID prefix")?) {
            Ok(())
        } else {
            Err(native_failure("Failed to set UUID prefix"))
        }
    }

    pub fn uuid_prefix(&self) -> String {
        self.backend.uuid_prefix()
    }

    /// Whether `major` is a device-mapper major number.
    pub fn is_dm_major(&self, major: u32) -> bool {
        self.backend.is_dm_major(major)
    }

    /// Release the library's cached resources, including the control
    /// device.
    pub fn lib_release(&self) {
        self.backend.lib_release()
    }

    /// Keep the control device open between tasks.
    pub fn hold_control_dev(&self, hold: bool) {
        self.backend.hold_control_dev(hold)
    }

    /// Create, or remove, device nodes to match the kernel's devices. With
    /// a name, only that device's node is checked.
    pub fn mknodes(&self, name: Option<&DmName>) -> DmResult<()> {
        let name = name.map(DmName::to_cstring);
        if self.backend.mknodes(name.as_deref()) {
            Ok(())
        } else {
            Err(DmError::Core(errors::Error::Os(
                "Failed to make device nodes".to_string(),
                nix::Error::last(),
            )))
        }
    }

    pub fn udev_set_sync_support(&self, sync: bool) {
        self.backend.udev_set_sync_support(sync)
    }

    /// Whether udev synchronisation is enabled and usable.
    pub fn udev_sync_support(&self) -> bool {
        self.backend.udev_sync_support()
    }

    pub fn udev_set_checking(&self, checking: bool) {
        self.backend.udev_set_checking(checking)
    }

    pub fn udev_checking(&self) -> bool {
        self.backend.udev_checking()
    }

    /// Whether the running kernel accepts udev cookies.
    pub fn cookie_supported(&self) -> bool {
        self.backend.cookie_supported()
    }

    pub fn message_supports_precise_timestamps(&self) -> bool {
        self.backend.message_supports_precise_timestamps()
    }

    pub fn stats_driver_supports_precise(&self) -> bool {
        self.backend.stats_driver_supports_precise()
    }

    pub fn stats_driver_supports_histogram(&self) -> bool {
        self.backend.stats_driver_supports_histogram()
    }
}
