// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{collections::BTreeMap, fmt, rc::Rc};

use nix::errno::Errno;
use semver::Version;

use crate::{
    core::{
        backend::{TaskBackend, TaskOption},
        errors,
        task_type::TaskType,
        types::{AddNode, NameMangling, TargetLine},
        util::to_cstring,
        Device, DeviceInfo, DmName, DmUdevFlags, DmUuid, TaskFlags,
    },
    cookie::DmCookie,
    dm::DM,
    result::{DmError, DmResult, ErrorEnum},
    timestamp::Timestamp,
};

/// One libdevmapper task.
///
/// A task is configured with the `set_*` methods, run once, and then
/// queried. Each getter is only allowed when the run produced the data it
/// reads; otherwise it fails with `ErrorEnum::Gated` rather than reading
/// whatever the native task happens to hold.
pub struct DmTask {
    handle: Box<dyn TaskBackend>,
    task_type: TaskType,
    flags: TaskFlags,
    record_timestamp: bool,
    cookie: Option<Rc<DmCookie>>,
}

impl DmTask {
    /// Allocate a task of the given type.
    pub fn new(dm: &DM, task_type: TaskType) -> DmResult<DmTask> {
        let handle = dm.backend().task_create(task_type).ok_or_else(|| {
            DmError::Core(errors::Error::Native(format!(
                "Failed to create {task_type} task"
            )))
        })?;
        let mut task = DmTask {
            handle,
            task_type,
            flags: TaskFlags::empty(),
            record_timestamp: false,
            cookie: None,
        };
        task.enable_checks()?;
        Ok(task)
    }

    pub fn task_type(&self) -> TaskType {
        self.task_type
    }

    /// The state and data flags set so far.
    pub fn flags(&self) -> TaskFlags {
        self.flags
    }

    /// The cookie attached with `set_cookie`, if any.
    pub fn cookie(&self) -> Option<&Rc<DmCookie>> {
        self.cookie.as_ref()
    }

    fn check(&self, accepted: bool, method: &str) -> DmResult<()> {
        if accepted {
            Ok(())
        } else {
            Err(DmError::Core(errors::Error::Native(format!(
                "DmTask({}).{} failed.",
                self.task_type, method
            ))))
        }
    }

    fn option(&mut self, option: TaskOption, method: &str) -> DmResult<()> {
        let accepted = self.handle.set_option(option);
        self.check(accepted, method)
    }

    /// Fail unless the task ran and produced `category`.
    fn require(&self, method: &str, category: TaskFlags) -> DmResult<()> {
        if !self.flags.contains(TaskFlags::DID_IOCTL) {
            return Err(DmError::Dm(
                ErrorEnum::Gated,
                format!("DmTask({}).{} requires ioctl data.", self.task_type, method),
            ));
        }
        if !self.flags.contains(category) {
            return Err(DmError::Dm(
                ErrorEnum::Gated,
                format!(
                    "DmTask({}) does not provide {} data.",
                    self.task_type,
                    category.describe()
                ),
            ));
        }
        Ok(())
    }

    pub fn set_name(&mut self, name: &str) -> DmResult<()> {
        let accepted = self.handle.set_name(&to_cstring(name, "Name")?);
        self.check(accepted, "set_name")
    }

    pub fn set_uuid(&mut self, uuid: &str) -> DmResult<()> {
        let accepted = self.handle.set_uuid(&to_cstring(uuid, "UUID")?);
        self.check(accepted, "set_uuid")
    }

    /// Set the new name for a RENAME task.
    pub fn set_newname(&mut self, name: &str) -> DmResult<()> {
        let name = DmName::new(name)?.to_cstring();
        let accepted = self.handle.set_newname(&name);
        self.check(accepted, "set_newname")
    }

    /// Set the UUID for a RENAME task, for a device that has none.
    pub fn set_newuuid(&mut self, uuid: &str) -> DmResult<()> {
        let uuid = DmUuid::new(uuid)?.to_cstring();
        let accepted = self.handle.set_newuuid(&uuid);
        self.check(accepted, "set_newuuid")
    }

    pub fn set_major(&mut self, major: u32) -> DmResult<()> {
        let accepted = self.handle.set_major(major);
        self.check(accepted, "set_major")
    }

    pub fn set_minor(&mut self, minor: u32) -> DmResult<()> {
        let accepted = self.handle.set_minor(minor);
        self.check(accepted, "set_minor")
    }

    /// Set both device numbers. With `allow_default_major`, the library
    /// may substitute its own major.
    pub fn set_major_minor(
        &mut self,
        major: u32,
        minor: u32,
        allow_default_major: bool,
    ) -> DmResult<()> {
        let accepted = self
            .handle
            .set_major_minor(major, minor, allow_default_major);
        self.check(accepted, "set_major_minor")
    }

    pub fn set_uid(&mut self, uid: u32) -> DmResult<()> {
        let accepted = self.handle.set_uid(uid);
        self.check(accepted, "set_uid")
    }

    pub fn set_gid(&mut self, gid: u32) -> DmResult<()> {
        let accepted = self.handle.set_gid(gid);
        self.check(accepted, "set_gid")
    }

    pub fn set_mode(&mut self, mode: u32) -> DmResult<()> {
        let accepted = self.handle.set_mode(mode);
        self.check(accepted, "set_mode")
    }

    /// Set the event number a WAITEVENT task waits past.
    pub fn set_event_nr(&mut self, event_nr: u32) -> DmResult<()> {
        let accepted = self.handle.set_event_nr(event_nr);
        self.check(accepted, "set_event_nr")
    }

    /// Attach a udev cookie. The task keeps the cookie alive until it is
    /// dropped. The library may rewrite the cookie's value.
    ///
    /// If the library refuses the cookie, the task holds no cookie
    /// afterwards.
    pub fn set_cookie(&mut self, cookie: Rc<DmCookie>, flags: DmUdevFlags) -> DmResult<()> {
        let mut value = cookie.value();
        if !self.handle.set_cookie(&mut value, flags.bits()) {
            self.cookie = None;
            return self.check(false, "set_cookie");
        }
        cookie.set_value(u64::from(value))?;
        debug!(
            "Attached udev cookie {:#x} to {} task",
            value, self.task_type
        );
        self.cookie = Some(cookie);
        Ok(())
    }

    /// Set the geometry for a SET_GEOMETRY task.
    pub fn set_geometry(
        &mut self,
        cylinders: &str,
        heads: &str,
        sectors: &str,
        start: &str,
    ) -> DmResult<()> {
        let cylinders = to_cstring(cylinders, "Cylinders")?;
        let heads = to_cstring(heads, "Heads")?;
        let sectors = to_cstring(sectors, "Sectors")?;
        let start = to_cstring(start, "Start")?;
        let accepted = self
            .handle
            .set_geometry(&cylinders, &heads, &sectors, &start);
        self.check(accepted, "set_geometry")
    }

    /// Set the message for a TARGET_MSG task.
    pub fn set_message(&mut self, message: &str) -> DmResult<()> {
        let accepted = self.handle.set_message(&to_cstring(message, "Message")?);
        self.check(accepted, "set_message")
    }

    /// Set the sector of the target a TARGET_MSG task is sent to.
    pub fn set_sector(&mut self, sector: u64) -> DmResult<()> {
        let accepted = self.handle.set_sector(sector);
        self.check(accepted, "set_sector")
    }

    pub fn set_ro(&mut self) -> DmResult<()> {
        self.option(TaskOption::ReadOnly, "set_ro")
    }

    pub fn no_flush(&mut self) -> DmResult<()> {
        self.option(TaskOption::NoFlush, "no_flush")
    }

    pub fn no_open_count(&mut self) -> DmResult<()> {
        self.option(TaskOption::NoOpenCount, "no_open_count")
    }

    pub fn skip_lockfs(&mut self) -> DmResult<()> {
        self.option(TaskOption::SkipLockfs, "skip_lockfs")
    }

    pub fn query_inactive_table(&mut self) -> DmResult<()> {
        self.option(TaskOption::QueryInactiveTable, "query_inactive_table")
    }

    pub fn suppress_identical_reload(&mut self) -> DmResult<()> {
        self.option(
            TaskOption::SuppressIdenticalReload,
            "suppress_identical_reload",
        )
    }

    pub fn secure_data(&mut self) -> DmResult<()> {
        self.option(TaskOption::SecureData, "secure_data")
    }

    pub fn retry_remove(&mut self) -> DmResult<()> {
        self.option(TaskOption::RetryRemove, "retry_remove")
    }

    pub fn deferred_remove(&mut self) -> DmResult<()> {
        self.option(TaskOption::DeferredRemove, "deferred_remove")
    }

    /// Ask for the ioctl's completion time to be recorded, see
    /// `ioctl_timestamp`.
    pub fn set_record_timestamp(&mut self) -> DmResult<()> {
        self.option(TaskOption::RecordTimestamp, "set_record_timestamp")?;
        self.record_timestamp = true;
        Ok(())
    }

    pub fn enable_checks(&mut self) -> DmResult<()> {
        self.option(TaskOption::EnableChecks, "enable_checks")
    }

    pub fn set_add_node(&mut self, add_node: AddNode) -> DmResult<()> {
        let accepted = self.handle.set_add_node(add_node);
        self.check(accepted, "set_add_node")
    }

    /// Set the read-ahead, in sectors, or one of `DM_READ_AHEAD_AUTO` and
    /// `DM_READ_AHEAD_NONE`.
    pub fn set_read_ahead(&mut self, read_ahead: u32, flags: u32) -> DmResult<()> {
        let accepted = self.handle.set_read_ahead(read_ahead, flags);
        self.check(accepted, "set_read_ahead")
    }

    /// Append a line to the table a CREATE or RELOAD task loads.
    pub fn add_target(
        &mut self,
        start: u64,
        length: u64,
        target_type: &str,
        params: &str,
    ) -> DmResult<()> {
        let target_type = to_cstring(target_type, "Target type")?;
        let params = to_cstring(params, "Target parameters")?;
        let accepted = self
            .handle
            .add_target(start, length, &target_type, &params);
        self.check(accepted, "add_target")
    }

    /// Run the task.
    ///
    /// A task runs at most once. Afterwards the getters for the data the
    /// task type provides are available, or, if the run failed, only
    /// `errno` and `driver_version`.
    pub fn run(&mut self) -> DmResult<()> {
        if self.flags.contains(TaskFlags::DID_IOCTL) {
            return Err(DmError::Dm(
                ErrorEnum::State,
                format!("DmTask({}) has already been run.", self.task_type),
            ));
        }

        self.flags |= TaskFlags::DID_IOCTL;
        debug!("Running {} task", self.task_type);
        if !self.handle.run() {
            self.flags |= TaskFlags::DID_ERROR;
            let errno = Errno::from_raw(self.handle.errno());
            debug!("{} task failed: {}", self.task_type, errno);
            return Err(DmError::Core(errors::Error::Ioctl(self.task_type, errno)));
        }

        self.flags |= self.task_type.data_flags();
        if self.record_timestamp {
            self.flags |= TaskFlags::TIMESTAMP;
        }
        Ok(())
    }

    /// The errno the run left, if it failed.
    pub fn errno(&self) -> DmResult<Option<Errno>> {
        self.require("errno", TaskFlags::DID_IOCTL)?;
        Ok(match self.handle.errno() {
            0 => None,
            errno => Some(Errno::from_raw(errno)),
        })
    }

    /// The driver version the ioctl reported.
    pub fn driver_version(&self) -> DmResult<Version> {
        self.require("driver_version", TaskFlags::DID_IOCTL)?;
        let version = self.handle.driver_version().ok_or_else(|| {
            DmError::Core(errors::Error::Native(
                "Failed to get driver version".to_string(),
            ))
        })?;
        Version::parse(version.trim()).map_err(|err| {
            DmError::Dm(
                ErrorEnum::Error,
                format!("Driver version {version:?} is malformed: {err}"),
            )
        })
    }

    /// The info record of the device the task addressed.
    pub fn info(&self) -> DmResult<DeviceInfo> {
        self.require("info", TaskFlags::INFO)?;
        self.handle.info().ok_or_else(|| {
            DmError::Core(errors::Error::Native(format!(
                "Failed to get info from {} task",
                self.task_type
            )))
        })
    }

    /// The name of the device the task addressed.
    pub fn name(&self, mangling: NameMangling) -> DmResult<String> {
        self.require("name", TaskFlags::NAME)?;
        self.handle.name(mangling).ok_or_else(|| {
            DmError::Core(errors::Error::Native(format!(
                "Failed to get name from {} task",
                self.task_type
            )))
        })
    }

    /// The UUID of the device the task addressed. Empty if it has none.
    pub fn uuid(&self, mangling: NameMangling) -> DmResult<String> {
        self.require("uuid", TaskFlags::UUID)?;
        self.handle.uuid(mangling).ok_or_else(|| {
            DmError::Core(errors::Error::Native(format!(
                "Failed to get UUID from {} task",
                self.task_type
            )))
        })
    }

    fn native_list<T>(&self, what: &str, list: Option<T>) -> DmResult<T> {
        list.ok_or_else(|| {
            DmError::Core(errors::Error::Native(format!(
                "Failed to get {what} from {} task",
                self.task_type
            )))
        })
    }

    /// The devices the addressed device's table refers to. Empty for a
    /// device without dependencies.
    pub fn deps(&self) -> DmResult<Vec<Device>> {
        self.require("deps", TaskFlags::DEPS)?;
        self.native_list("dependencies", self.handle.deps())
    }

    /// The names and numbers of all devices.
    pub fn names(&self) -> DmResult<Vec<(String, Device)>> {
        self.require("names", TaskFlags::NAME_LIST)?;
        self.native_list("name list", self.handle.names())
    }

    /// The loaded target types and their versions.
    pub fn versions(&self) -> DmResult<BTreeMap<String, Version>> {
        self.require("versions", TaskFlags::TARGET_VERSIONS)?;
        Ok(self
            .native_list("target versions", self.handle.versions())?
            .into_iter()
            .collect())
    }

    /// The target's reply to a message, if it sent one.
    pub fn message_response(&self) -> DmResult<Option<String>> {
        self.require("message_response", TaskFlags::MESSAGE)?;
        Ok(self.handle.message_response())
    }

    /// Table lines, one per target.
    pub fn table(&self) -> DmResult<Vec<TargetLine>> {
        self.require("table", TaskFlags::TABLE)?;
        Ok(self.handle.targets())
    }

    /// Status lines, one per target; `params` holds the status text.
    pub fn status(&self) -> DmResult<Vec<TargetLine>> {
        self.require("status", TaskFlags::STATUS)?;
        Ok(self.handle.targets())
    }

    /// When the ioctl completed, on the monotonic clock.
    pub fn ioctl_timestamp(&self) -> DmResult<Timestamp> {
        self.require("ioctl_timestamp", TaskFlags::TIMESTAMP)?;
        self.handle.ioctl_timestamp().ok_or_else(|| {
            DmError::Core(errors::Error::Native(
                "Failed to get ioctl timestamp".to_string(),
            ))
        })
    }
}

impl fmt::Debug for DmTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DmTask")
            .field("task_type", &self.task_type)
            .field("flags", &self.flags)
            .field("cookie", &self.cookie)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        core::task_type::TASK_TYPES,
        testing::{init_logger, test_name, test_uuid, MockBackend},
    };

    use super::*;

    fn mock_dm() -> (Rc<MockBackend>, DM) {
        init_logger();
        let backend = Rc::new(MockBackend::default());
        let dm = DM::with_backend(backend.clone());
        (backend, dm)
    }

    #[test]
    /// Before a run, every getter is refused with the same message.
    fn test_gate_before_run() {
        let (_, dm) = mock_dm();
        let task = dm.task(TaskType::Info).expect("allocated");
        assert_matches!(
            task.info(),
            Err(DmError::Dm(ErrorEnum::Gated, msg))
                if msg == "DmTask(DM_DEVICE_INFO).info requires ioctl data."
        );
        assert_matches!(task.errno(), Err(DmError::Dm(ErrorEnum::Gated, _)));
        assert_matches!(
            task.name(NameMangling::Default),
            Err(DmError::Dm(ErrorEnum::Gated, _))
        );
        assert_eq!(task.flags(), TaskFlags::empty());
    }

    #[test]
    /// A failed run sets only the state flags and keeps errno readable.
    fn test_failed_run() {
        let (backend, dm) = mock_dm();
        backend.state().fail_run_errno = Some(nix::libc::ENXIO);
        let mut task = dm.task(TaskType::Info).expect("allocated");
        task.set_name("missing").expect("accepted");

        assert_matches!(
            task.run(),
            Err(DmError::Core(errors::Error::Ioctl(TaskType::Info, Errno::ENXIO)))
        );
        assert_eq!(task.flags(), TaskFlags::DID_IOCTL | TaskFlags::DID_ERROR);
        assert_matches!(
            task.info(),
            Err(DmError::Dm(ErrorEnum::Gated, msg))
                if msg == "DmTask(DM_DEVICE_INFO) does not provide info data."
        );
        assert_matches!(task.errno(), Ok(Some(Errno::ENXIO)));
    }

    #[test]
    /// A successful run opens exactly the categories of its task type.
    fn test_run_sets_data_flags() {
        let (_, dm) = mock_dm();
        for task_type in TASK_TYPES {
            let mut task = dm.task(task_type).expect("allocated");
            task.set_name("mock-dev").expect("accepted");
            task.run().expect("mock run succeeds");
            assert_eq!(
                task.flags(),
                TaskFlags::DID_IOCTL | task_type.data_flags(),
                "{task_type}"
            );
            assert!(!task.flags().contains(TaskFlags::TIMESTAMP));
        }
    }

    #[test]
    /// A task runs once.
    fn test_run_once() {
        let (_, dm) = mock_dm();
        let mut task = dm.task(TaskType::Version).expect("allocated");
        task.run().expect("mock run succeeds");
        assert_matches!(task.run(), Err(DmError::Dm(ErrorEnum::State, _)));
        assert_eq!(task.driver_version().expect("ran"), Version::new(4, 48, 0));
        assert_matches!(task.errno(), Ok(None));
    }

    #[test]
    /// An INFO task yields info, name and UUID, and nothing else.
    fn test_info() {
        let (_, dm) = mock_dm();
        let mut task = dm.task(TaskType::Info).expect("allocated");
        task.set_name("mock-dev").expect("accepted");
        task.run().expect("mock run succeeds");

        let info = task.info().expect("INFO data");
        assert!(info.exists());
        assert_eq!(info.device(), Device::new(253, 0));
        assert_eq!(task.name(NameMangling::Default).expect("NAME data"), "mock-dev");
        assert_eq!(
            task.uuid(NameMangling::Unmangled).expect("UUID data"),
            "MOCK-0001"
        );
        assert_matches!(task.deps(), Err(DmError::Dm(ErrorEnum::Gated, _)));
        assert_matches!(
            task.ioctl_timestamp(),
            Err(DmError::Dm(ErrorEnum::Gated, msg)) if msg.contains("timestamp")
        );
    }

    #[test]
    /// A LIST task yields names with device numbers but no info.
    fn test_list() {
        let (_, dm) = mock_dm();
        let mut task = dm.task(TaskType::List).expect("allocated");
        task.run().expect("mock run succeeds");
        assert_eq!(
            task.names().expect("NAME_LIST data"),
            vec![("mock-dev".to_string(), Device::new(253, 0))]
        );
        assert_matches!(
            task.info(),
            Err(DmError::Dm(ErrorEnum::Gated, msg))
                if msg == "DmTask(DM_DEVICE_LIST) does not provide info data."
        );
    }

    #[test]
    /// Table, status, deps and target versions come from their own tasks.
    fn test_query_tasks() {
        let (_, dm) = mock_dm();

        let mut table = dm.task(TaskType::Table).expect("allocated");
        table.set_name("mock-dev").expect("accepted");
        table.run().expect("mock run succeeds");
        let lines = table.table().expect("TABLE data");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].target_type, "linear");
        assert_eq!(lines[0].params, "8:16 0");
        assert_matches!(table.status(), Err(DmError::Dm(ErrorEnum::Gated, _)));

        let mut status = dm.task(TaskType::Status).expect("allocated");
        status.set_name("mock-dev").expect("accepted");
        status.run().expect("mock run succeeds");
        assert_eq!(status.status().expect("STATUS data")[0].length, 4096);

        let mut deps = dm.task(TaskType::Deps).expect("allocated");
        deps.set_name("mock-dev").expect("accepted");
        deps.run().expect("mock run succeeds");
        assert_eq!(deps.deps().expect("DEPS data"), vec![Device::new(8, 16)]);

        let mut versions = dm.task(TaskType::ListVersions).expect("allocated");
        versions.run().expect("mock run succeeds");
        let versions = versions.versions().expect("TARGET_VERSIONS data");
        assert_eq!(versions.get("linear"), Some(&Version::new(1, 4, 0)));
    }

    #[test]
    /// A device without dependencies reports an empty list.
    fn test_empty_deps() {
        let (backend, dm) = mock_dm();
        backend.state().devices[0].deps.clear();
        let mut task = dm.task(TaskType::Deps).expect("allocated");
        task.set_name("mock-dev").expect("accepted");
        task.run().expect("mock run succeeds");
        assert_eq!(task.deps().expect("DEPS data"), Vec::new());
    }

    #[test]
    /// A missing native list is an error, not an empty result.
    fn test_missing_lists() {
        let (backend, dm) = mock_dm();
        let mut deps = dm.task(TaskType::Deps).expect("allocated");
        deps.set_name("mock-dev").expect("accepted");
        deps.run().expect("mock run succeeds");

        let mut names = dm.task(TaskType::List).expect("allocated");
        names.run().expect("mock run succeeds");

        let mut versions = dm.task(TaskType::ListVersions).expect("allocated");
        versions.run().expect("mock run succeeds");

        backend.state().null_lists = true;
        assert_matches!(deps.deps(), Err(DmError::Core(errors::Error::Native(_))));
        assert_matches!(names.names(), Err(DmError::Core(errors::Error::Native(_))));
        assert_matches!(
            versions.versions(),
            Err(DmError::Core(errors::Error::Native(_)))
        );
    }

    #[test]
    /// The timestamp category is opened only when it was requested.
    fn test_record_timestamp() {
        let (_, dm) = mock_dm();
        let mut task = dm.task(TaskType::Info).expect("allocated");
        task.set_name("mock-dev").expect("accepted");
        task.set_record_timestamp().expect("accepted");
        task.run().expect("mock run succeeds");
        assert!(task.flags().contains(TaskFlags::TIMESTAMP));
        let stamp = task.ioctl_timestamp().expect("TIMESTAMP data");
        assert!(stamp <= Timestamp::now().expect("monotonic clock is readable"));
    }

    #[test]
    /// A target message and its response.
    fn test_message() {
        let (_, dm) = mock_dm();
        let mut task = dm.task(TaskType::TargetMsg).expect("allocated");
        task.set_name("mock-dev").expect("accepted");
        task.set_sector(0).expect("accepted");
        task.set_message("@stats_list").expect("accepted");
        task.run().expect("mock run succeeds");
        assert_eq!(
            task.message_response().expect("MESSAGE data"),
            Some("@stats_list".to_string())
        );
    }

    #[test]
    /// New names and UUIDs are checked before the library sees them.
    fn test_rename_checks() {
        let (backend, dm) = mock_dm();
        let mut task = dm.task(TaskType::Rename).expect("allocated");
        assert_matches!(
            task.set_newname("a/b"),
            Err(DmError::Core(errors::Error::InvalidArgument(_)))
        );
        assert_matches!(
            task.set_newname(""),
            Err(DmError::Core(errors::Error::InvalidArgument(_)))
        );
        assert_matches!(
            task.set_newname(&"n".repeat(128)),
            Err(DmError::Core(errors::Error::InvalidArgument(_)))
        );
        assert_matches!(
            task.set_newuuid(&"u".repeat(129)),
            Err(DmError::Core(errors::Error::InvalidArgument(_)))
        );
        assert_matches!(
            task.set_name("nul\0name"),
            Err(DmError::Dm(ErrorEnum::Invalid, _))
        );
        assert_eq!(backend.state().rejected_calls, 0);

        task.set_newname(&"n".repeat(127)).expect("fits");
        task.set_newuuid(&"u".repeat(128)).expect("fits");
    }

    #[test]
    /// A setter the library refuses is a native error.
    fn test_setter_rejected() {
        let (backend, dm) = mock_dm();
        let mut task = dm.task(TaskType::Create).expect("allocated");
        backend.state().reject_setters = true;
        assert_matches!(
            task.add_target(0, 2048, "linear", "8:16 0"),
            Err(DmError::Core(errors::Error::Native(_)))
        );
        assert_matches!(
            task.no_open_count(),
            Err(DmError::Core(errors::Error::Native(_)))
        );
        assert_eq!(backend.state().rejected_calls, 2);
    }

    #[test]
    /// An attached cookie is kept alive by the task and may be rewritten.
    fn test_set_cookie() {
        let (backend, dm) = mock_dm();
        let cookie = Rc::new(DmCookie::new(&dm));
        let mut task = dm.task(TaskType::Resume).expect("allocated");
        task.set_cookie(Rc::clone(&cookie), DmUdevFlags::DM_UDEV_DISABLE_OTHER_RULES_FLAG)
            .expect("accepted");
        assert_eq!(Rc::strong_count(&cookie), 2);
        assert_ne!(cookie.base(), 0);
        assert_eq!(
            cookie.flags(),
            DmUdevFlags::DM_UDEV_DISABLE_OTHER_RULES_FLAG
        );

        backend.state().reject_setters = true;
        assert_matches!(
            task.set_cookie(Rc::clone(&cookie), DmUdevFlags::empty()),
            Err(DmError::Core(errors::Error::Native(_)))
        );
        assert!(task.cookie().is_none());
        assert_eq!(Rc::strong_count(&cookie), 1);
    }

    #[test]
    /// Dropping a task releases the native task.
    fn test_drop_destroys() {
        let (backend, dm) = mock_dm();
        let task = dm.task(TaskType::Info).expect("allocated");
        assert_eq!(backend.state().tasks_destroyed, 0);
        drop(task);
        assert_eq!(backend.state().tasks_destroyed, 1);

        backend.state().fail_task_create = true;
        assert_matches!(
            dm.task(TaskType::Info),
            Err(DmError::Core(errors::Error::Native(_)))
        );
    }

    #[test]
    #[ignore]
    /// Create a device with a zero target, read it back, and remove it.
    fn sudo_test_create_info_remove() {
        init_logger();
        let dm = DM::new().expect("libdevmapper is installed");
        let id = uuid::Uuid::new_v4().simple().to_string();
        let name = test_name(&format!("create-{}", &id[..8])).expect("valid name");
        let uuid = test_uuid(&id).expect("valid uuid");

        let mut create = dm.task(TaskType::Create).expect("allocated");
        create.set_name(name.as_str()).expect("accepted");
        create.set_uuid(uuid.as_str()).expect("accepted");
        create.add_target(0, 2048, "zero", "").expect("accepted");
        let cookie = Rc::new(DmCookie::new(&dm));
        create
            .set_cookie(Rc::clone(&cookie), DmUdevFlags::empty())
            .expect("accepted");
        create.run().expect("device created");
        assert_matches!(cookie.udev_wait(false), Ok(true));

        let mut info = dm.task(TaskType::Info).expect("allocated");
        info.set_name(name.as_str()).expect("accepted");
        info.run().expect("device exists");
        assert!(info.info().expect("INFO data").exists());
        assert_eq!(info.uuid(NameMangling::Default).expect("UUID data"), uuid.as_str());

        let mut remove = dm.task(TaskType::Remove).expect("allocated");
        remove.set_name(name.as_str()).expect("accepted");
        remove.run().expect("device removed");
    }
}
