// Euphonia
// Copyright (c) 2026 The Project Euphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The MPEG-H 3D Audio decoder session.
//!
//! [`MpeghDecoder`] turns a sequence of compressed audio units with presentation timestamps into
//! fixed-duration PCM output frames. The session drives an elementary decoder through the
//! [`ElementaryDecoder`](euphonia_core::elementary::ElementaryDecoder) seam, reconciles the
//! decoder's variable internal frame size against the externally requested framing, and overlays
//! half-cosine fades wherever the signal is spliced.
//!
//! The session is pull-based and single-threaded: the caller feeds compressed bytes with
//! [`MpeghDecoder::process`] and drains PCM with [`MpeghDecoder::get_samples`] until it reports
//! [`Outcome::NeedMoreData`].

pub mod fade;

mod session;

pub use session::{MpeghDecoder, Outcome, OutputInfo, MAX_FRAMES_PER_CALL};
