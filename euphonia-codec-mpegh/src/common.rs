// Euphonia
// Copyright (c) 2026 The Project Euphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `common` module provides window sequence types and scalefactor band tables shared by the
//! spectral engines.

/// The number of spectral lines in a long window.
pub const LONG_WINDOW_LEN: usize = 1024;

/// The number of spectral lines in a short window.
pub const SHORT_WINDOW_LEN: usize = 128;

/// The maximum number of short windows per frame.
pub const MAX_WINDOWS: usize = 8;

/// A Linear Congruential Generator (LCG) pseudo-random number generator from Numerical Recipes.
#[derive(Clone, Debug)]
pub struct Lcg {
    state: u32,
}

impl Lcg {
    pub fn new(state: u32) -> Self {
        Lcg { state }
    }

    #[inline(always)]
    pub fn next(&mut self) -> i32 {
        // Numerical Recipes LCG parameters.
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state as i32
    }
}

/// The window sequence of a frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WindowSequence {
    /// A single 1024-line window.
    Long,
    /// Eight 128-line windows.
    EightShort,
}

/// Window grouping of a short-window frame.
///
/// Consecutive short windows sharing scalefactor data form a group. A long-window frame is a
/// single group of one window.
#[derive(Copy, Clone, Debug)]
pub struct WindowGrouping {
    pub num_groups: usize,
    /// The number of windows in each group. Only the first `num_groups` entries are meaningful.
    pub group_len: [usize; MAX_WINDOWS],
}

impl WindowGrouping {
    /// Grouping of a long-window frame.
    pub fn long() -> Self {
        WindowGrouping { num_groups: 1, group_len: [1, 0, 0, 0, 0, 0, 0, 0] }
    }

    /// Grouping of a short-window frame from the per-window grouping flags, where a set flag
    /// means the window joins the previous window's group.
    pub fn from_grouping_flags(flags: &[bool; MAX_WINDOWS - 1]) -> Self {
        let mut grouping = WindowGrouping { num_groups: 1, group_len: [0; MAX_WINDOWS] };
        grouping.group_len[0] = 1;

        for &joins in flags.iter() {
            if joins {
                grouping.group_len[grouping.num_groups - 1] += 1;
            }
            else {
                grouping.group_len[grouping.num_groups] = 1;
                grouping.num_groups += 1;
            }
        }
        grouping
    }

    /// The index of the first window of group `group`.
    pub fn group_start(&self, group: usize) -> usize {
        self.group_len[..group].iter().sum()
    }
}

const SFB_OFFSET_48K_LONG: [usize; 49 + 1] = [
    0, 4, 8, 12, 16, 20, 24, 28, 32, 36, 40, 48, 56, 64, 72, 80, 88, 96, 108, 120, 132, 144, 160,
    176, 196, 216, 240, 264, 292, 320, 352, 384, 416, 448, 480, 512, 544, 576, 608, 640, 672, 704,
    736, 768, 800, 832, 864, 896, 928, 1024,
];

const SFB_OFFSET_48K_SHORT: [usize; 14 + 1] =
    [0, 4, 8, 12, 16, 20, 28, 36, 44, 56, 68, 80, 96, 112, 128];

const SFB_OFFSET_32K_LONG: [usize; 51 + 1] = [
    0, 4, 8, 12, 16, 20, 24, 28, 32, 36, 40, 48, 56, 64, 72, 80, 88, 96, 108, 120, 132, 144, 160,
    176, 196, 216, 240, 264, 292, 320, 352, 384, 416, 448, 480, 512, 544, 576, 608, 640, 672, 704,
    736, 768, 800, 832, 864, 896, 928, 960, 992, 1024,
];

/// Scalefactor band offset tables for one sampling rate family.
#[derive(Copy, Clone, Debug)]
pub struct SubbandInfo {
    pub min_srate: u32,
    pub long_bands: &'static [usize],
    pub short_bands: &'static [usize],
}

impl SubbandInfo {
    /// Find the subband tables applicable to the given sample rate.
    pub fn find(srate: u32) -> SubbandInfo {
        for sbi in MPEGH_SUBBAND_INFO.iter() {
            if srate >= sbi.min_srate {
                return *sbi;
            }
        }
        unreachable!()
    }
}

const MPEGH_SUBBAND_INFO: [SubbandInfo; 3] = [
    SubbandInfo {
        min_srate: 46009,
        long_bands: &SFB_OFFSET_48K_LONG,
        short_bands: &SFB_OFFSET_48K_SHORT,
    }, //48K
    SubbandInfo {
        min_srate: 37566,
        long_bands: &SFB_OFFSET_48K_LONG,
        short_bands: &SFB_OFFSET_48K_SHORT,
    }, //44.1K
    SubbandInfo {
        min_srate: 0,
        long_bands: &SFB_OFFSET_32K_LONG,
        short_bands: &SFB_OFFSET_48K_SHORT,
    }, //32K
];

#[cfg(test)]
mod tests {
    use super::{SubbandInfo, WindowGrouping};

    #[test]
    fn verify_window_grouping() {
        // Windows 0-1 grouped, 2 alone, 3-7 grouped.
        let flags = [true, false, false, true, true, true, true];
        let grouping = WindowGrouping::from_grouping_flags(&flags);

        assert_eq!(grouping.num_groups, 3);
        assert_eq!(&grouping.group_len[..3], &[2, 1, 5]);
        assert_eq!(grouping.group_start(0), 0);
        assert_eq!(grouping.group_start(1), 2);
        assert_eq!(grouping.group_start(2), 3);
    }

    #[test]
    fn verify_subband_lookup() {
        assert_eq!(SubbandInfo::find(48_000).long_bands.len(), 50);
        assert_eq!(SubbandInfo::find(44_100).long_bands.len(), 50);
        assert_eq!(SubbandInfo::find(32_000).long_bands.len(), 52);
    }
}
