// Euphonia
// Copyright (c) 2026 The Project Euphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Temporal Noise Flattening.
//!
//! Gap-filled lines can sound temporally smeared next to genuinely coded neighbors. TNF
//! estimates a short all-pole model over the fully-tiled "virtual" spectrum and, if a stable
//! model is found, applies the corresponding prediction-error filter to the gap-filled lines,
//! flattening the fill's temporal envelope. Coded lines are never touched.

use log::trace;

use crate::lpc;

use super::grid::GridInfo;

/// The maximum TNF filter order.
pub const TNF_MAX_ORDER: usize = 8;

/// The number of frequency subdivisions the autocorrelation is estimated over.
const TNF_SUBDIVISIONS: usize = 3;

/// A subdivision with less energy than this contributes nothing usable to the estimate; the
/// whole frame's TNF is skipped.
const MIN_SUBDIVISION_ENERGY: f64 = 1.0e-9;

/// Estimate and apply the flattening filter for one long-window frame.
///
/// `virt` is the fully-tiled virtual spectrum (scaled tile data everywhere in the gap-filled
/// region, including under coded lines); `was_zero` marks the lines that were actually
/// gap-filled in `spectrum`.
pub fn apply(grid: &GridInfo, virt: &[f32], was_zero: &[bool], spectrum: &mut [f32]) {
    let start = grid.start_line;
    let stop = grid.stop_line;
    let len = stop - start;

    if len < TNF_SUBDIVISIONS * TNF_MAX_ORDER {
        return;
    }

    // Accumulate energy-normalized autocorrelation lags across the subdivisions. Normalizing
    // per subdivision keeps a loud subdivision from dominating the estimate.
    let mut lags = [0.0f64; TNF_MAX_ORDER + 1];

    for s in 0..TNF_SUBDIVISIONS {
        let a = start + s * len / TNF_SUBDIVISIONS;
        let b = start + (s + 1) * len / TNF_SUBDIVISIONS;
        let sub = &virt[a..b];

        let mut energy = 0.0f64;
        for &x in sub {
            energy += f64::from(x) * f64::from(x);
        }

        if energy < MIN_SUBDIVISION_ENERGY {
            // Not enough signal to estimate anything; skip the enhancement for this frame.
            trace!("tnf: subdivision {} below energy threshold, skipping", s);
            return;
        }

        for (k, lag) in lags.iter_mut().enumerate() {
            let mut acc = 0.0f64;
            for i in k..sub.len() {
                acc += f64::from(sub[i]) * f64::from(sub[i - k]);
            }
            *lag += acc / energy;
        }
    }

    let mut coefs = [0.0f64; TNF_MAX_ORDER];
    let order = lpc::levinson(&lags, TNF_MAX_ORDER, &mut coefs);

    if order == 0 {
        return;
    }

    // Run the prediction-error filter over the virtual spectrum and take its output only at the
    // gap-filled lines.
    for i in start..stop {
        if !was_zero[i] {
            continue;
        }

        let mut acc = f64::from(virt[i]);
        for (j, &c) in coefs[..order].iter().enumerate() {
            if i >= start + j + 1 {
                acc -= c * f64::from(virt[i - j - 1]);
            }
        }
        spectrum[i] = acc as f32;
    }
}

#[cfg(test)]
mod tests {
    use super::apply;
    use crate::common::WindowSequence;
    use crate::igf::{GridInfo, IgfConfig};

    fn test_grid() -> GridInfo {
        let config = IgfConfig::new(48_000, 32, 44, true).unwrap();
        GridInfo::build(&config, WindowSequence::Long, 2, &[0, 1, 0, 0])
    }

    #[test]
    fn verify_tnf_skips_silent_frames() {
        let grid = test_grid();
        let virt = vec![0.0f32; 1024];
        let was_zero = vec![true; 1024];
        let mut spectrum = vec![0.0f32; 1024];

        apply(&grid, &virt, &was_zero, &mut spectrum);

        assert!(spectrum.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn verify_tnf_rewrites_only_gap_lines() {
        let grid = test_grid();

        let mut virt = vec![0.0f32; 1024];
        for (i, x) in virt[grid.start_line..grid.stop_line].iter_mut().enumerate() {
            // A strongly correlated fill so levinson finds a nonzero stable order.
            *x = (0.9f32).powi((i % 32) as i32);
        }

        let mut was_zero = vec![false; 1024];
        let mut spectrum = vec![0.0f32; 1024];
        for i in grid.start_line..grid.stop_line {
            if i % 3 == 0 {
                spectrum[i] = 1.5;
            }
            else {
                was_zero[i] = true;
                spectrum[i] = virt[i];
            }
        }
        let before = spectrum.clone();

        apply(&grid, &virt, &was_zero, &mut spectrum);

        let mut changed = 0;
        for i in 0..1024 {
            if !was_zero[i] {
                assert_eq!(before[i], spectrum[i], "coded line {} modified", i);
            }
            else if before[i] != spectrum[i] {
                changed += 1;
            }
        }
        assert!(changed > 0);
    }
}
