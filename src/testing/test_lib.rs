// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::{
    core::{DmNameBuf, DmUuidBuf},
    result::DmResult,
};

/// String that is to be concatenated with test supplied name, so that
/// devices left behind by a failed test can be identified and removed.
static DM_TEST_ID: &str = "_dm-rs_test_delme";

/// Generate the test name given the test supplied name.
pub fn test_name(name: &str) -> DmResult<DmNameBuf> {
    let mut namestr = String::from(name);
    namestr.push_str(DM_TEST_ID);
    DmNameBuf::new(namestr)
}

/// Generate the test uuid given the test supplied name.
pub fn test_uuid(name: &str) -> DmResult<DmUuidBuf> {
    let mut namestr = String::from(name);
    namestr.push_str(DM_TEST_ID);
    DmUuidBuf::new(namestr)
}
