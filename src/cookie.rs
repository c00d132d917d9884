// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! udev cookies: the values that tie a task's uevents to a wait for their
//! processing.

use std::{cell::Cell, fmt, rc::Rc};

use devmapper_sys as dms;

use crate::{
    core::{backend::DmBackend, DmUdevFlags},
    dm::DM,
    result::{DmError, DmResult, ErrorEnum},
};

const BASE_MASK: u32 = 0xFFFF;

/// Where a cookie is in its life.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CookieState {
    /// Not yet waited on.
    Pending,
    /// udev has processed every event for the cookie.
    Ready,
    /// A wait failed and the native semaphore is gone.
    Released,
}

/// A udev cookie.
///
/// The upper 16 bits of the value, the prefix, carry `DmUdevFlags`. The
/// lower 16 bits, the base, identify the semaphore libdevmapper allocated.
pub struct DmCookie {
    backend: Rc<dyn DmBackend>,
    value: Cell<u32>,
    state: Cell<CookieState>,
}

fn check_half(what: &str, value: u32) -> DmResult<u16> {
    u16::try_from(value).map_err(|_| {
        DmError::Dm(
            ErrorEnum::OutOfRange,
            format!("Cookie {what} {value:#x} does not fit in 16 bits."),
        )
    })
}

impl DmCookie {
    /// A cookie with value 0, which lets the library allocate one when it
    /// is attached to a task.
    pub fn new(dm: &DM) -> DmCookie {
        DmCookie::from_native(dm, 0)
    }

    /// A cookie with a known value.
    pub fn with_value(dm: &DM, value: u64) -> DmResult<DmCookie> {
        let cookie = DmCookie::new(dm);
        cookie.set_value(value)?;
        Ok(cookie)
    }

    pub(crate) fn from_native(dm: &DM, value: u32) -> DmCookie {
        DmCookie {
            backend: Rc::clone(dm.backend()),
            value: Cell::new(value),
            state: Cell::new(CookieState::Pending),
        }
    }

    pub fn value(&self) -> u32 {
        self.value.get()
    }

    /// Replace the whole value.
    pub fn set_value(&self, value: u64) -> DmResult<()> {
        let value = u32::try_from(value).map_err(|_| {
            DmError::Dm(
                ErrorEnum::OutOfRange,
                format!("Cookie value {value:#x} does not fit in 32 bits."),
            )
        })?;
        self.value.set(value);
        Ok(())
    }

    /// The upper 16 bits of the value.
    pub fn prefix(&self) -> u32 {
        self.value.get() >> dms::DM_UDEV_FLAGS_SHIFT
    }

    pub fn set_prefix(&self, prefix: u32) -> DmResult<()> {
        let prefix = u32::from(check_half("prefix", prefix)?);
        self.value
            .set((prefix << dms::DM_UDEV_FLAGS_SHIFT) | self.base());
        Ok(())
    }

    /// The lower 16 bits of the value.
    pub fn base(&self) -> u32 {
        self.value.get() & BASE_MASK
    }

    pub fn set_base(&self, base: u32) -> DmResult<()> {
        let base = u32::from(check_half("base", base)?);
        self.value.set((self.value.get() & dms::DM_UDEV_FLAGS_MASK) | base);
        Ok(())
    }

    /// The udev flags carried in the prefix.
    pub fn flags(&self) -> DmUdevFlags {
        DmUdevFlags::from_bits_truncate(self.prefix() as u16)
    }

    pub fn state(&self) -> CookieState {
        self.state.get()
    }

    /// Whether a wait has seen every event processed.
    pub fn ready(&self) -> bool {
        self.state.get() == CookieState::Ready
    }

    /// Signal that the events for this cookie have been processed. Used
    /// when udev is not doing so itself.
    pub fn udev_complete(&self) -> bool {
        let completed = self.backend.udev_complete(self.value());
        if !completed {
            warn!("Failed to complete udev cookie {:#x}", self.value());
        }
        completed
    }

    /// Wait for udev to process the cookie's events. With `immediate`, poll
    /// once instead of blocking.
    ///
    /// Returns whether the native wait succeeded; `ready()` tells whether
    /// the events are done.
    pub fn udev_wait(&self, immediate: bool) -> DmResult<bool> {
        if self.state.get() != CookieState::Pending {
            return Err(DmError::Dm(
                ErrorEnum::State,
                format!(
                    "Cookie {:#x} has already been waited on ({:?}).",
                    self.value(),
                    self.state.get()
                ),
            ));
        }

        if immediate {
            let (succeeded, ready) = self.backend.udev_wait_immediate(self.value());
            if !succeeded {
                warn!("Failed to poll udev cookie {:#x}", self.value());
            } else if ready {
                self.state.set(CookieState::Ready);
            }
            Ok(succeeded)
        } else {
            let succeeded = self.backend.udev_wait(self.value());
            if succeeded {
                self.state.set(CookieState::Ready);
            } else {
                warn!("Failed to wait on udev cookie {:#x}", self.value());
                self.state.set(CookieState::Released);
            }
            Ok(succeeded)
        }
    }
}

impl fmt::Debug for DmCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DmCookie")
            .field("value", &format_args!("{:#x}", self.value()))
            .field("state", &self.state())
            .finish()
    }
}
