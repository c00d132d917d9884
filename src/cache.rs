// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::rc::{Rc, Weak};

use crate::result::{DmError, DmResult, ErrorEnum};

/// A fixed-size table of weakly held views, indexed by native id.
///
/// A slot hands out the same view for as long as some caller keeps it
/// alive, and builds a fresh one otherwise.
#[derive(Debug)]
pub struct WeakCache<T> {
    what: &'static str,
    slots: Vec<Option<Weak<T>>>,
}

impl<T> WeakCache<T> {
    /// An empty cache. `what` names the entries in errors.
    pub fn new(what: &'static str) -> WeakCache<T> {
        WeakCache {
            what,
            slots: Vec::new(),
        }
    }

    /// The number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Drop every entry and resize to `len` empty slots.
    pub fn reset(&mut self, len: usize) {
        self.slots.clear();
        self.slots.resize_with(len, || None);
    }

    /// Empty the cache, returning the entries that are still alive.
    pub fn take_live(&mut self) -> Vec<Rc<T>> {
        self.slots
            .drain(..)
            .flatten()
            .filter_map(|weak| weak.upgrade())
            .collect()
    }

    /// Look up the entry for `index`.
    ///
    /// An index past the end of the table is an error. `present` is asked
    /// next; if it says the id does not exist the result is `None`. Only
    /// then is a live entry reused or a new one made with `create`.
    pub fn lookup<P, C>(&mut self, index: u64, present: P, create: C) -> DmResult<Option<Rc<T>>>
    where
        P: FnOnce() -> bool,
        C: FnOnce(u64) -> Rc<T>,
    {
        let len = self.slots.len();
        let slot = usize::try_from(index)
            .ok()
            .and_then(|i| self.slots.get_mut(i))
            .ok_or_else(|| {
                DmError::Dm(
                    ErrorEnum::OutOfRange,
                    format!("{} index {} out of range (0..{})", self.what, index, len),
                )
            })?;

        if !present() {
            return Ok(None);
        }

        if let Some(entry) = slot.as_ref().and_then(Weak::upgrade) {
            trace!("{} {} found in cache", self.what, index);
            return Ok(Some(entry));
        }

        trace!("{} {} not cached, creating", self.what, index);
        let entry = create(index);
        *slot = Some(Rc::downgrade(&entry));
        Ok(Some(entry))
    }
}
