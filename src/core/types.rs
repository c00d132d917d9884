// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use nix::libc::c_int;
use serde::Serialize;

use devmapper_sys as dms;

use crate::{
    core::errors,
    result::{DmError, DmResult, ErrorEnum},
};

/// An error function to construct an error when creating a new string id.
fn err_func(err_msg: &str) -> DmError {
    DmError::Core(errors::Error::InvalidArgument(err_msg.into()))
}

// A devicemapper name. Names become entries under the device-mapper
// directory, so they may not contain a path separator.
str_id!(DmName, DmNameBuf, dms::DM_NAME_LEN, &['/'], err_func);

// A devicemapper uuid. A devicemapper uuid has a devicemapper-specific
// format.
str_id!(DmUuid, DmUuidBuf, dms::DM_UUID_LEN, &[], err_func);

/// Which form of a device name or UUID to return.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NameMangling {
    /// As stored by the library, which follows the global mangling mode.
    #[default]
    Default,
    /// Mangled for use in the device-mapper directory.
    Mangled,
    /// With any mangling reversed.
    Unmangled,
}

/// How libdevmapper mangles characters that are not allowed in names and
/// UUIDs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameManglingMode {
    /// Do not mangle.
    None,
    /// Mangle only names that need it.
    Auto,
    /// Mangle every name.
    Hex,
}

impl NameManglingMode {
    pub(crate) fn to_raw(self) -> c_int {
        match self {
            NameManglingMode::None => dms::DM_STRING_MANGLING_NONE,
            NameManglingMode::Auto => dms::DM_STRING_MANGLING_AUTO,
            NameManglingMode::Hex => dms::DM_STRING_MANGLING_HEX,
        }
    }
}

impl TryFrom<c_int> for NameManglingMode {
    type Error = DmError;

    fn try_from(raw: c_int) -> DmResult<NameManglingMode> {
        match raw {
            dms::DM_STRING_MANGLING_NONE => Ok(NameManglingMode::None),
            dms::DM_STRING_MANGLING_AUTO => Ok(NameManglingMode::Auto),
            dms::DM_STRING_MANGLING_HEX => Ok(NameManglingMode::Hex),
            other => Err(DmError::Dm(
                ErrorEnum::Invalid,
                format!("Name mangling mode value {other} out of range."),
            )),
        }
    }
}

/// When the device node of a new device is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddNode {
    /// After the device is resumed.
    OnResume,
    /// As soon as the device is created.
    OnCreate,
}

impl AddNode {
    pub(crate) fn to_raw(self) -> c_int {
        match self {
            AddNode::OnResume => dms::DM_ADD_NODE_ON_RESUME,
            AddNode::OnCreate => dms::DM_ADD_NODE_ON_CREATE,
        }
    }
}

/// One line of a device table or of its target status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TargetLine {
    /// First sector covered by the target.
    pub start: u64,
    /// Number of sectors covered.
    pub length: u64,
    /// The target type, e.g. "linear".
    pub target_type: String,
    /// Target parameters, or status text for a status query.
    pub params: String,
}

/// The per-area counters kept by the kernel's dm-stats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Counter {
    /// Reads completed.
    Reads,
    /// Adjacent reads merged.
    ReadsMerged,
    /// Sectors read.
    ReadSectors,
    /// Time spent reading, in ns.
    ReadNsecs,
    /// Writes completed.
    Writes,
    /// Adjacent writes merged.
    WritesMerged,
    /// Sectors written.
    WriteSectors,
    /// Time spent writing, in ns.
    WriteNsecs,
    /// I/Os currently in flight.
    IoInProgress,
    /// Time spent doing I/O, in ns.
    IoNsecs,
    /// Weighted time spent doing I/O, in ns.
    WeightedIoNsecs,
    /// Total time reads were in flight, in ns.
    TotalReadNsecs,
    /// Total time writes were in flight, in ns.
    TotalWriteNsecs,
}

impl Counter {
    pub(crate) fn to_raw(self) -> c_int {
        match self {
            Counter::Reads => dms::DM_STATS_READS_COUNT,
            Counter::ReadsMerged => dms::DM_STATS_READS_MERGED_COUNT,
            Counter::ReadSectors => dms::DM_STATS_READ_SECTORS_COUNT,
            Counter::ReadNsecs => dms::DM_STATS_READ_NSECS,
            Counter::Writes => dms::DM_STATS_WRITES_COUNT,
            Counter::WritesMerged => dms::DM_STATS_WRITES_MERGED_COUNT,
            Counter::WriteSectors => dms::DM_STATS_WRITE_SECTORS_COUNT,
            Counter::WriteNsecs => dms::DM_STATS_WRITE_NSECS,
            Counter::IoInProgress => dms::DM_STATS_IO_IN_PROGRESS_COUNT,
            Counter::IoNsecs => dms::DM_STATS_IO_NSECS,
            Counter::WeightedIoNsecs => dms::DM_STATS_WEIGHTED_IO_NSECS,
            Counter::TotalReadNsecs => dms::DM_STATS_TOTAL_READ_NSECS,
            Counter::TotalWriteNsecs => dms::DM_STATS_TOTAL_WRITE_NSECS,
        }
    }
}

/// One bin of a latency histogram.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct HistogramBin {
    /// Lower bound of the bin, in ns.
    pub lower: u64,
    /// Upper bound of the bin, in ns.
    pub upper: u64,
    /// I/Os that completed within the bounds.
    pub count: u64,
}

/// A latency histogram for one area.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Histogram {
    /// The bins, in increasing order of bound.
    pub bins: Vec<HistogramBin>,
}

impl Histogram {
    /// The number of I/Os counted across all bins.
    pub fn sum(&self) -> u64 {
        self.bins.iter().map(|bin| bin.count).sum()
    }
}
