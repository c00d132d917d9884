// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::fmt;

use nix::time::{clock_gettime, ClockId};

use crate::{
    core::errors,
    result::{DmError, DmResult},
};

const NSEC_PER_SEC: u64 = 1_000_000_000;

/// A point on the monotonic clock, with nanosecond resolution.
///
/// libdevmapper stamps ioctls with the same clock, so a task's ioctl
/// timestamp can be compared with `Timestamp::now()`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    nsecs: u64,
}

impl Timestamp {
    /// A timestamp `nsecs` nanoseconds after the clock's origin.
    pub fn from_nsecs(nsecs: u64) -> Timestamp {
        Timestamp { nsecs }
    }

    /// The current monotonic time.
    pub fn now() -> DmResult<Timestamp> {
        let now = clock_gettime(ClockId::CLOCK_MONOTONIC).map_err(|err| {
            DmError::Core(errors::Error::Os(
                "Failed to read the monotonic clock".to_string(),
                err,
            ))
        })?;
        let secs = u64::try_from(now.tv_sec()).unwrap_or(0);
        let nsecs = u64::try_from(now.tv_nsec()).unwrap_or(0);
        Ok(Timestamp::from_nsecs(
            secs.saturating_mul(NSEC_PER_SEC).saturating_add(nsecs),
        ))
    }

    /// Nanoseconds since the clock's origin.
    pub fn nsecs(&self) -> u64 {
        self.nsecs
    }

    /// The absolute difference between two timestamps, in nanoseconds.
    pub fn delta(&self, other: &Timestamp) -> u64 {
        self.nsecs.abs_diff(other.nsecs)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:09}",
            self.nsecs / NSEC_PER_SEC,
            self.nsecs % NSEC_PER_SEC
        )
    }
}
