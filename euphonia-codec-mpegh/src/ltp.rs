// Euphonia
// Copyright (c) 2026 The Project Euphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The long-term prediction postfilter.
//!
//! When the bitstream signals a nonzero LTP gain, a pitch-harmonic comb filter is synthesized
//! into the decoded time-domain signal. The filter is recursive across frame boundaries, so each
//! channel carries persistent input/output history, and a change of pitch or gain between frames
//! is bridged with a zero-input-response correction cross-faded over a transition region instead
//! of switching filters abruptly.
//!
//! The filter runs on f32 samples but accumulates in f64: the recursion compounds rounding error
//! frame-to-frame, so single-precision accumulation would drift audibly over long streams.

use log::trace;

use crate::lpc;

/// The number of samples per frame the postfilter operates on.
pub const LTP_FRAME_LEN: usize = 1024;

/// The smallest decodable pitch lag in samples.
pub const LTP_MIN_LAG: usize = 34;

/// The largest decodable pitch lag in samples.
pub const LTP_MAX_LAG: usize = 231;

/// Input/output history carried between frames. Covers the largest pitch lag plus the
/// interpolation filter margin.
const LTP_HISTORY: usize = 256;

/// The transition region bridging a parameter change, in samples.
const TRANSITION_LEN: usize = LTP_FRAME_LEN / 8;

/// The region still governed by the previous frame's parameters: half the codec delay.
const PREV_PART_LEN: usize = LTP_FRAME_LEN / 4;

/// The LPC order of the zero-input-response bridge.
const ZIR_ORDER: usize = 8;

/// The input window the ZIR bridge model is fitted over.
const ZIR_FIT_LEN: usize = 64;

/// Pitch lag region boundaries of the non-uniform quantizer. Lags up-to [`PITCH_RES4_MAX`] are
/// coded at 1/4-sample resolution, up-to [`PITCH_RES2_MAX`] at 1/2-sample resolution, and the
/// remainder at integer resolution.
const PITCH_RES4_MAX: usize = 80;
const PITCH_RES2_MAX: usize = 160;

const PITCH_RES4_INDICES: u16 = ((PITCH_RES4_MAX - LTP_MIN_LAG) * 4) as u16;
const PITCH_RES2_INDICES: u16 = ((PITCH_RES2_MAX - PITCH_RES4_MAX) * 2) as u16;

/// One past the largest valid pitch index.
pub const LTP_PITCH_INDICES: u16 =
    PITCH_RES4_INDICES + PITCH_RES2_INDICES + (LTP_MAX_LAG - PITCH_RES2_MAX) as u16 + 1;

/// The 2-bit gain quantization table. Each entry is an exact 14-bit binary fraction
/// (0x1000, 0x1400, 0x1800, 0x1c00 of 0x4000).
const GAIN_TABLE: [f32; 4] = [0.25, 0.3125, 0.375, 0.4375];

/// 4-phase, 4-tap fractional-delay interpolation filter (Catmull-Rom weights at quarter-sample
/// positions). Taps apply to `y[n - lag - 1 ..= n - lag + 2]`.
const INTERP_TABLE: [[f32; 4]; 4] = [
    [0.0, 1.0, 0.0, 0.0],
    [-0.0703125, 0.8671875, 0.2265625, -0.0234375],
    [-0.0625, 0.5625, 0.5625, -0.0625],
    [-0.0234375, 0.2265625, 0.8671875, -0.0703125],
];

/// 3-tap causal input smoother of the pole-zero harmonic filter.
const SMOOTH_TAPS: [f32; 3] = [0.25, 0.5, 0.25];

/// Transmitted LTP parameters of one frame.
#[derive(Copy, Clone, Debug, Default)]
pub struct LtpData {
    /// The postfilter is active this frame.
    pub active: bool,
    /// Quantized pitch lag. Valid range: `0..LTP_PITCH_INDICES`.
    pub pitch_index: u16,
    /// Quantized gain. Valid range: `0..4`.
    pub gain_index: u8,
}

/// Decode a quantized pitch lag into integer samples and quarter-sample fraction.
pub fn decode_pitch(index: u16) -> (usize, usize) {
    let index = index.min(LTP_PITCH_INDICES - 1);

    if index < PITCH_RES4_INDICES {
        let i = usize::from(index);
        (LTP_MIN_LAG + i / 4, i % 4)
    }
    else if index < PITCH_RES4_INDICES + PITCH_RES2_INDICES {
        let i = usize::from(index - PITCH_RES4_INDICES);
        (PITCH_RES4_MAX + i / 2, 2 * (i % 2))
    }
    else {
        let i = usize::from(index - PITCH_RES4_INDICES - PITCH_RES2_INDICES);
        (PITCH_RES2_MAX + i, 0)
    }
}

/// Persistent per-channel postfilter state.
#[derive(Clone)]
pub struct LtpState {
    pitch_int_past: usize,
    pitch_fr_past: usize,
    gain_past: f32,
    gain_idx_past: usize,
    mem_in: [f32; LTP_HISTORY],
    mem_out: [f32; LTP_HISTORY],
}

impl Default for LtpState {
    fn default() -> Self {
        Self::new()
    }
}

impl LtpState {
    pub fn new() -> Self {
        LtpState {
            pitch_int_past: LTP_MIN_LAG,
            pitch_fr_past: 0,
            gain_past: 0.0,
            gain_idx_past: 0,
            mem_in: [0.0; LTP_HISTORY],
            mem_out: [0.0; LTP_HISTORY],
        }
    }

    /// Reset the filter history and parameters, as after a seek.
    pub fn reset(&mut self) {
        *self = LtpState::new();
    }

    /// The carried input history (most recent sample last). Exposed for state verification.
    pub fn mem_in(&self) -> &[f32] {
        &self.mem_in
    }

    /// The carried output history (most recent sample last). Exposed for state verification.
    pub fn mem_out(&self) -> &[f32] {
        &self.mem_out
    }

    /// Run the postfilter over one frame in place.
    ///
    /// `data` carries this frame's transmitted parameters; `None` means no LTP data was present
    /// (equivalent to an inactive frame).
    pub fn ltp_post(&mut self, data: Option<&LtpData>, frame: &mut [f32]) {
        assert_eq!(frame.len(), LTP_FRAME_LEN);

        let (pitch_int, pitch_fr, gain, gain_idx) = match data {
            Some(d) if d.active => {
                let (p, f) = decode_pitch(d.pitch_index);
                let idx = usize::from(d.gain_index & 3);
                (p, f, GAIN_TABLE[idx], idx)
            }
            _ => (self.pitch_int_past, self.pitch_fr_past, 0.0, 0),
        };

        // Fast path: no filtering this frame or last. The histories must still be refreshed to
        // the tail of the current frame, or the next frame's transition logic sees stale state.
        if gain == 0.0 && self.gain_past == 0.0 {
            self.mem_in.copy_from_slice(&frame[LTP_FRAME_LEN - LTP_HISTORY..]);
            self.mem_out.copy_from_slice(&frame[LTP_FRAME_LEN - LTP_HISTORY..]);
            self.pitch_int_past = pitch_int;
            self.pitch_fr_past = pitch_fr;
            self.gain_past = gain;
            self.gain_idx_past = gain_idx;
            return;
        }

        // Extended buffers: history followed by the current frame.
        let mut x = [0.0f32; LTP_HISTORY + LTP_FRAME_LEN];
        let mut y = [0.0f32; LTP_HISTORY + LTP_FRAME_LEN];
        x[..LTP_HISTORY].copy_from_slice(&self.mem_in);
        x[LTP_HISTORY..].copy_from_slice(frame);
        y[..LTP_HISTORY].copy_from_slice(&self.mem_out);

        let (p_old, f_old, g_old) = (self.pitch_int_past, self.pitch_fr_past, self.gain_past);

        // Previous-frame part: the old parameters still govern half the codec delay.
        for n in 0..PREV_PART_LEN {
            let c = correction(&x, &y, LTP_HISTORY + n, p_old, f_old, g_old);
            y[LTP_HISTORY + n] = (f64::from(x[LTP_HISTORY + n]) + c) as f32;
        }

        // Transition part.
        let same_params = pitch_int == p_old && pitch_fr == f_old && gain == g_old;

        if gain == 0.0 && g_old == 0.0 {
            for n in PREV_PART_LEN..PREV_PART_LEN + TRANSITION_LEN {
                y[LTP_HISTORY + n] = x[LTP_HISTORY + n];
            }
        }
        else if g_old == 0.0 {
            // Fade the new filter in.
            for (j, n) in (PREV_PART_LEN..PREV_PART_LEN + TRANSITION_LEN).enumerate() {
                let w = (j as f64 + 0.5) / TRANSITION_LEN as f64;
                let c = correction(&x, &y, LTP_HISTORY + n, pitch_int, pitch_fr, gain);
                y[LTP_HISTORY + n] = (f64::from(x[LTP_HISTORY + n]) + w * c) as f32;
            }
        }
        else if gain == 0.0 {
            // Fade the old filter out.
            for (j, n) in (PREV_PART_LEN..PREV_PART_LEN + TRANSITION_LEN).enumerate() {
                let w = 1.0 - (j as f64 + 0.5) / TRANSITION_LEN as f64;
                let c = correction(&x, &y, LTP_HISTORY + n, p_old, f_old, g_old);
                y[LTP_HISTORY + n] = (f64::from(x[LTP_HISTORY + n]) + w * c) as f32;
            }
        }
        else if same_params {
            // Continuous parameters: no bridge needed.
            for n in PREV_PART_LEN..PREV_PART_LEN + TRANSITION_LEN {
                let c = correction(&x, &y, LTP_HISTORY + n, pitch_int, pitch_fr, gain);
                y[LTP_HISTORY + n] = (f64::from(x[LTP_HISTORY + n]) + c) as f32;
            }
        }
        else {
            self.transition_with_zir(&mut x, &mut y, pitch_int, pitch_fr, gain);
        }

        // Current-frame part: the new filter, unmodified.
        for n in PREV_PART_LEN + TRANSITION_LEN..LTP_FRAME_LEN {
            let c = correction(&x, &y, LTP_HISTORY + n, pitch_int, pitch_fr, gain);
            y[LTP_HISTORY + n] = (f64::from(x[LTP_HISTORY + n]) + c) as f32;
        }

        frame.copy_from_slice(&y[LTP_HISTORY..]);

        self.mem_in.copy_from_slice(&x[LTP_FRAME_LEN..]);
        self.mem_out.copy_from_slice(&y[LTP_FRAME_LEN..]);
        self.pitch_int_past = pitch_int;
        self.pitch_fr_past = pitch_fr;
        self.gain_past = gain;
        self.gain_idx_past = gain_idx;
    }

    /// Transition with a genuine parameter change: bridge the filter-state mismatch with a
    /// cross-faded zero-input response.
    fn transition_with_zir(
        &mut self,
        x: &mut [f32; LTP_HISTORY + LTP_FRAME_LEN],
        y: &mut [f32; LTP_HISTORY + LTP_FRAME_LEN],
        pitch_int: usize,
        pitch_fr: usize,
        gain: f32,
    ) {
        let (p_old, f_old, g_old) = (self.pitch_int_past, self.pitch_fr_past, self.gain_past);

        // Fit a short all-pole model over the input leading into the transition.
        let fit_end = LTP_HISTORY + PREV_PART_LEN;
        let fit = &x[fit_end - ZIR_FIT_LEN..fit_end];

        let mut lags = [0.0f64; ZIR_ORDER + 1];
        lpc::autocorrelate(fit, ZIR_ORDER, &mut lags);

        let mut coefs = [0.0f64; ZIR_ORDER];
        let order = lpc::levinson(&lags, ZIR_ORDER, &mut coefs);

        // The state mismatch: over the last `order` output samples, the difference between what
        // the old filter produced and what the new filter would have produced on the same
        // history.
        let mut zir = [0.0f64; ZIR_ORDER + TRANSITION_LEN];
        for k in 0..order {
            let n = LTP_HISTORY + PREV_PART_LEN - 1 - k;
            let with_new = f64::from(x[n]) + correction(x, y, n, pitch_int, pitch_fr, gain);
            zir[order - 1 - k] = f64::from(y[n]) - with_new;
        }

        if order == 0 {
            trace!("ltp: no stable zir model, switching filters without bridge");
        }

        // Run the model with zero input to extrapolate the mismatch, and fade it out of the new
        // filter's output across the transition.
        for (j, n) in (PREV_PART_LEN..PREV_PART_LEN + TRANSITION_LEN).enumerate() {
            let mut z = 0.0f64;
            for (k, &c) in coefs[..order].iter().enumerate() {
                z += c * zir[order + j - 1 - k];
            }
            zir[order + j] = z;

            let w = 1.0 - (j as f64 + 0.5) / TRANSITION_LEN as f64;
            let c = correction(x, y, LTP_HISTORY + n, pitch_int, pitch_fr, gain);
            y[LTP_HISTORY + n] = (f64::from(x[LTP_HISTORY + n]) + c - w * z) as f32;
        }
    }
}

/// The harmonic correction term of the pole-zero postfilter at extended index `n`:
/// `-gain * smooth(x)[n] + gain * interp(y)[n - lag]`. Accumulated in f64.
#[inline]
fn correction(x: &[f32], y: &[f32], n: usize, pitch_int: usize, pitch_fr: usize, gain: f32) -> f64 {
    if gain == 0.0 {
        return 0.0;
    }

    let mut smooth = 0.0f64;
    for (k, &tap) in SMOOTH_TAPS.iter().enumerate() {
        smooth += f64::from(tap) * f64::from(x[n - k]);
    }

    let taps = &INTERP_TABLE[pitch_fr];
    let base = n - pitch_int - 1;
    let mut pred = 0.0f64;
    for (k, &tap) in taps.iter().enumerate() {
        pred += f64::from(tap) * f64::from(y[base + k]);
    }

    f64::from(gain) * (pred - smooth)
}
