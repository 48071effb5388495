// Euphonia
// Copyright (c) 2026 The Project Euphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tile whitening.
//!
//! Mid-level whitening flattens a tile by dividing each line by a local energy estimate, keeping
//! the fine sign/shape structure while removing the source band's spectral tilt. Strong
//! whitening discards the source structure entirely and injects unit-magnitude random-sign
//! values into the lines that will be gap-filled.

use crate::common::{Lcg, LONG_WINDOW_LEN};

/// Half-width of the sliding energy estimation window (7 lines total).
const FLATTEN_HALF_WIN: usize = 3;

/// Local energies below this are left unscaled rather than amplified into noise.
const FLATTEN_MIN_ENERGY: f64 = 1.0e-12;

/// Flatten `buf` with a sliding 7-line energy window.
pub fn flatten(buf: &mut [f32]) {
    let n = buf.len();
    if n == 0 {
        return;
    }

    let mut scratch = [0.0f32; LONG_WINDOW_LEN];

    for i in 0..n {
        let lo = i.saturating_sub(FLATTEN_HALF_WIN);
        let hi = (i + FLATTEN_HALF_WIN).min(n - 1);

        let mut energy = 0.0f64;
        for &x in buf[lo..=hi].iter() {
            energy += f64::from(x) * f64::from(x);
        }
        energy /= (hi - lo + 1) as f64;

        scratch[i] = if energy > FLATTEN_MIN_ENERGY {
            (f64::from(buf[i]) / energy.sqrt()) as f32
        }
        else {
            buf[i]
        };
    }

    buf.copy_from_slice(&scratch[..n]);
}

/// Replace the lines marked in `was_zero` with unit-magnitude random-sign values.
pub fn random_signs(lcg: &mut Lcg, buf: &mut [f32], was_zero: &[bool]) {
    for (x, &zero) in buf.iter_mut().zip(was_zero.iter()) {
        if zero {
            *x = if lcg.next() >= 0 { 1.0 } else { -1.0 };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{flatten, random_signs};
    use crate::common::Lcg;

    #[test]
    fn verify_flatten_removes_tilt() {
        // A strongly tilted buffer: loud head, quiet tail.
        let mut buf: Vec<f32> = (0..64).map(|i| if i < 32 { 8.0 } else { 0.125 }).collect();
        flatten(&mut buf);

        // Away from the transition both halves approach unit magnitude.
        assert!((buf[8].abs() - 1.0).abs() < 0.1);
        assert!((buf[56].abs() - 1.0).abs() < 0.1);
    }

    #[test]
    fn verify_flatten_preserves_sign() {
        let mut buf = vec![2.0f32, -4.0, 2.0, -4.0, 2.0, -4.0, 2.0, -4.0];
        flatten(&mut buf);
        for (i, &x) in buf.iter().enumerate() {
            assert_eq!(x.is_sign_negative(), i % 2 == 1);
        }
    }

    #[test]
    fn verify_random_signs_only_marked_lines() {
        let mut lcg = Lcg::new(7);
        let mut buf = vec![0.25f32; 8];
        let was_zero = [true, false, true, false, true, false, true, false];

        random_signs(&mut lcg, &mut buf, &was_zero);

        for (i, &x) in buf.iter().enumerate() {
            if was_zero[i] {
                assert_eq!(x.abs(), 1.0);
            }
            else {
                assert_eq!(x, 0.25);
            }
        }
    }
}
