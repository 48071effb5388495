// Euphonia
// Copyright (c) 2026 The Project Euphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `units` module provides definitions for common units.

/// A `TimeStamp` is an instant in time since the start of a stream, in nanoseconds.
pub type TimeStamp = u64;

/// A `Duration` is a positive span of time, in nanoseconds.
pub type Duration = u64;

const NANOSECONDS_PER_SECOND: u64 = 1_000_000_000;

/// Converts a duration in nanoseconds into a number of audio frames (samples per channel) at the
/// given sample rate, rounding to the nearest frame.
///
/// The dividend requires up-to 96 bits (64-bit duration * 32-bit sample rate), so the
/// intermediate arithmetic is performed in 128 bits.
pub fn duration_to_frames(ns: Duration, sample_rate: u32) -> u64 {
    let dividend = u128::from(ns) * u128::from(sample_rate);
    ((dividend + u128::from(NANOSECONDS_PER_SECOND / 2)) / u128::from(NANOSECONDS_PER_SECOND))
        as u64
}

/// Converts a number of audio frames (samples per channel) at the given sample rate into a
/// duration in nanoseconds, rounding to the nearest nanosecond.
pub fn frames_to_duration(frames: u64, sample_rate: u32) -> Duration {
    assert!(sample_rate > 0, "sample rate must be non-zero");

    let dividend = u128::from(frames) * u128::from(NANOSECONDS_PER_SECOND);
    ((dividend + u128::from(sample_rate / 2)) / u128::from(sample_rate)) as u64
}

#[cfg(test)]
mod tests {
    use super::{duration_to_frames, frames_to_duration};

    #[test]
    fn verify_duration_to_frames() {
        // One AU of 1024 frames at 48 kHz spans 21333333.3... ns. The external framing rhythm
        // rounds this to whole nanoseconds, and the conversion back must land on 1024 frames.
        assert_eq!(duration_to_frames(21_333_333, 48_000), 1024);
        assert_eq!(duration_to_frames(0, 48_000), 0);

        // 20833333 ns at 48 kHz is 999.999984 frames, which rounds to 1000.
        assert_eq!(duration_to_frames(20_833_333, 48_000), 1000);

        // Long streams must not overflow: 24 hours of 96 kHz audio.
        let day_ns = 24 * 60 * 60 * 1_000_000_000u64;
        assert_eq!(duration_to_frames(day_ns, 96_000), 24 * 60 * 60 * 96_000);
    }

    #[test]
    fn verify_frames_to_duration() {
        assert_eq!(frames_to_duration(1024, 48_000), 21_333_333);
        assert_eq!(frames_to_duration(0, 48_000), 0);
        assert_eq!(frames_to_duration(48_000, 48_000), 1_000_000_000);
    }

    #[test]
    fn verify_round_trip_rhythm() {
        // Feeding AUs on a 1024 @ 48 kHz rhythm, consecutive timestamp differences must convert
        // to the AU size within the reconciliation tolerance used by the decoder session.
        let mut prev = 0u64;
        for i in 1..32u64 {
            let ts = i * 1_000_000_000 * 1024 / 48_000;
            let frames = duration_to_frames(ts - prev, 48_000);
            assert!((frames as i64 - 1024).abs() <= 1);
            prev = ts;
        }
    }
}
