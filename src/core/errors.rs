// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*! Definition for low level error class for core methods !*/

use crate::core::task_type::TaskType;

#[derive(Clone, Debug)]
/// Internal error for calls into the native device-mapper library
pub enum Error {
    /// An error returned on failure to load libdevmapper
    ContextInit(String),

    /// This is a generic error that can be returned when a method
    /// receives an invalid argument. Ideally, the argument should be
    /// invalid in itself, i.e., it should not be made invalid by some
    /// part of the program state or the environment.
    InvalidArgument(String),

    /// Running a task failed. Carries the task type and the errno the
    /// library recorded for the ioctl.
    Ioctl(TaskType, nix::Error),

    /// The library rejected a call without reporting a cause.
    Native(String),

    /// The library rejected a call and left the cause in errno.
    Os(String, nix::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::ContextInit(err) => {
                write!(f, "libdevmapper could not be loaded: {err}")
            }
            Error::InvalidArgument(err) => write!(f, "invalid argument: {err}"),
            Error::Ioctl(task_type, err) => {
                write!(f, "device-mapper ioctl failed for {task_type}: {err}")
            }
            Error::Native(err) => write!(f, "device-mapper call failed: {err}"),
            Error::Os(msg, err) => write!(f, "{msg}: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Ioctl(_, err) | Error::Os(_, err) => Some(err),
            _ => None,
        }
    }
}
