// Euphonia
// Copyright (c) 2026 The Project Euphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `lpc` module provides the autocorrelation and Levinson-Durbin routines shared by the TNF
//! filter estimator and the LTP zero-input-response bridge.

/// The maximum LPC order supported by [`levinson`].
pub const MAX_LPC_ORDER: usize = 16;

/// Computes autocorrelation lags `0..=order` of `signal` into `lags`.
///
/// Accumulation is performed in f64. The recursions consuming these lags are sensitive to
/// relative precision, and the signal may span several thousand lines.
pub fn autocorrelate(signal: &[f32], order: usize, lags: &mut [f64]) {
    assert!(lags.len() > order);

    for (k, lag) in lags[..=order].iter_mut().enumerate() {
        let mut acc = 0.0f64;
        for i in k..signal.len() {
            acc += f64::from(signal[i]) * f64::from(signal[i - k]);
        }
        *lag = acc;
    }
}

/// Fits an all-pole model of up-to `order` coefficients to the autocorrelation `lags` using the
/// Levinson-Durbin recursion.
///
/// Writes the direct-form coefficients into `coefs` and returns the largest stable order
/// achieved. The recursion stops early when a reflection coefficient reaches or exceeds unit
/// magnitude, since continuing would produce an unstable synthesis filter; the coefficients of
/// the last stable iteration are kept.
pub fn levinson(lags: &[f64], order: usize, coefs: &mut [f64]) -> usize {
    assert!(order <= MAX_LPC_ORDER);
    assert!(lags.len() > order && coefs.len() >= order);

    if lags[0] <= 0.0 {
        return 0;
    }

    let mut err = lags[0];
    let mut tmp = [0.0f64; MAX_LPC_ORDER];
    let mut stable_order = 0;

    for m in 0..order {
        let mut acc = lags[m + 1];
        for i in 0..m {
            acc -= coefs[i] * lags[m - i];
        }

        let k = acc / err;
        if k.abs() >= 1.0 {
            break;
        }

        tmp[..m].copy_from_slice(&coefs[..m]);
        for i in 0..m {
            coefs[i] = tmp[i] - k * tmp[m - 1 - i];
        }
        coefs[m] = k;

        err *= 1.0 - k * k;
        stable_order = m + 1;

        if err <= 0.0 {
            break;
        }
    }

    stable_order
}
