// Euphonia
// Copyright (c) 2026 The Project Euphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MPEG-H 3D Audio spectral reconstruction and postfilter engines.
//!
//! This crate implements the two algorithmically dense per-frame stages of the MPEG-H decoding
//! pipeline that operate between entropy decoding and output rendering:
//!
//! - Intelligent Gap Filling ([`igf`]): reconstruction of encoder-zeroed high-frequency spectral
//!   lines from lower-frequency tiles, with energy matching, whitening, and optional Temporal
//!   Noise Flattening.
//! - The Long-Term Prediction postfilter ([`ltp`]): a pitch-harmonic time-domain filter with
//!   smooth parameter transitions across frame boundaries.

pub mod common;
pub mod igf;
pub mod lpc;
pub mod ltp;
