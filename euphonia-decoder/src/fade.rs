// Euphonia
// Copyright (c) 2026 The Project Euphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Half-cosine fade ramps.
//!
//! The session multiplies a fade ramp into queued output samples in place wherever the signal is
//! spliced: duration trims and pads, and transitions between concealed and decoded signal. The
//! ramp spans [`FADE_LEN_FRAMES`] frames of multi-channel audio, all channels of a frame sharing
//! one factor.

use std::f64::consts::PI;

use lazy_static::lazy_static;

/// The length of a fade ramp in frames (samples per channel).
pub const FADE_LEN_FRAMES: usize = 128;

lazy_static! {
    /// Fade-in factors: `(1 - cos(pi * i / N)) / 2`.
    static ref FADE_IN_TABLE: [f32; FADE_LEN_FRAMES] = {
        let mut table = [0.0; FADE_LEN_FRAMES];
        for (i, factor) in table.iter_mut().enumerate() {
            *factor = (0.5 * (1.0 - (PI * i as f64 / FADE_LEN_FRAMES as f64).cos())) as f32;
        }
        table
    };

    /// Fade-out factors: `(1 + cos(pi * (i + 1) / N)) / 2`. The final factor is exactly 0 so a
    /// fade-out always lands on silence.
    static ref FADE_OUT_TABLE: [f32; FADE_LEN_FRAMES] = {
        let mut table = [0.0; FADE_LEN_FRAMES];
        for (i, factor) in table.iter_mut().enumerate() {
            *factor =
                (0.5 * (1.0 + (PI * (i + 1) as f64 / FADE_LEN_FRAMES as f64).cos())) as f32;
        }
        table
    };
}

/// Multiply a fade-in ramp into `FADE_LEN_FRAMES * num_channels` interleaved samples.
pub fn fade_in<'a, I>(samples: I, num_channels: usize)
where
    I: Iterator<Item = &'a mut f32>,
{
    for (i, sample) in samples.enumerate() {
        *sample *= FADE_IN_TABLE[(i / num_channels).min(FADE_LEN_FRAMES - 1)];
    }
}

/// Multiply a fade-out ramp into `FADE_LEN_FRAMES * num_channels` interleaved samples.
pub fn fade_out<'a, I>(samples: I, num_channels: usize)
where
    I: Iterator<Item = &'a mut f32>,
{
    for (i, sample) in samples.enumerate() {
        *sample *= FADE_OUT_TABLE[(i / num_channels).min(FADE_LEN_FRAMES - 1)];
    }
}

#[cfg(test)]
mod tests {
    use super::{fade_in, fade_out, FADE_IN_TABLE, FADE_LEN_FRAMES, FADE_OUT_TABLE};

    #[test]
    fn verify_ramp_endpoints() {
        assert_eq!(FADE_IN_TABLE[0], 0.0);
        assert!(FADE_IN_TABLE[FADE_LEN_FRAMES - 1] < 1.0);
        // The fade-out ramp ends exactly at silence.
        assert_eq!(FADE_OUT_TABLE[FADE_LEN_FRAMES - 1], 0.0);
        assert!(FADE_OUT_TABLE[0] < 1.0);
    }

    #[test]
    fn verify_ramps_monotonic() {
        for i in 1..FADE_LEN_FRAMES {
            assert!(FADE_IN_TABLE[i] >= FADE_IN_TABLE[i - 1]);
            assert!(FADE_OUT_TABLE[i] <= FADE_OUT_TABLE[i - 1]);
        }
    }

    #[test]
    fn verify_channels_share_factor() {
        let mut samples = vec![1.0f32; 2 * FADE_LEN_FRAMES];
        fade_out(samples.iter_mut(), 2);

        for frame in samples.chunks_exact(2) {
            assert_eq!(frame[0], frame[1]);
        }

        // Monotonic attenuation toward, but never below, silence.
        for pair in samples.chunks_exact(2).collect::<Vec<_>>().windows(2) {
            assert!(pair[1][0] <= pair[0][0]);
            assert!(pair[1][0] >= 0.0);
        }
    }

    #[test]
    fn verify_fade_in_complements_fade_out() {
        let mut rise = vec![1.0f32; FADE_LEN_FRAMES];
        let mut fall = vec![1.0f32; FADE_LEN_FRAMES];
        fade_in(rise.iter_mut(), 1);
        fade_out(fall.iter_mut(), 1);

        // A fade-out is the mirror of a fade-in shifted by one position, so a crossfade of equal
        // signals sums close to unity.
        for i in 0..FADE_LEN_FRAMES - 1 {
            let sum = rise[i + 1] + fall[i];
            assert!((sum - 1.0).abs() < 1.0e-6, "crossfade sum {} at {}", sum, i);
        }
    }
}
