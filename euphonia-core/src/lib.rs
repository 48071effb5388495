// Euphonia
// Copyright (c) 2026 The Project Euphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Project Euphonia shared structs, traits, and features.
//!
//! `euphonia-core` contains the building blocks every other Euphonia crate depends on: the common
//! error type, nanosecond time units, the bounded queues used by the decoder session, the
//! elementary decoder seam, and checksums.

pub mod checksum;
pub mod drc;
pub mod elementary;
pub mod errors;
pub mod queue;
pub mod units;
