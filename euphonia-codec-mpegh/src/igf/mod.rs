// Euphonia
// Copyright (c) 2026 The Project Euphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Intelligent Gap Filling.
//!
//! The encoder zeroes high-frequency spectral lines to save bits and transmits, per tile, a
//! source index and whitening level, plus per-band destination energies. This module
//! reconstructs the zeroed region by copying lower-band tiles, optionally whitening them, and
//! scaling them so each destination band reaches its transmitted energy. Lines the encoder
//! actually coded are never overwritten.

mod grid;
mod tnf;
mod whiten;

pub use grid::{GridInfo, TileMap};

use log::debug;

use euphonia_core::errors::{unsupported_param_error, Result};

use crate::common::{Lcg, SubbandInfo, WindowGrouping, WindowSequence, LONG_WINDOW_LEN};

/// The maximum number of tiles the gap-filled region splits into.
pub const MAX_TILES: usize = 4;

/// The maximum number of scalefactor bands inside the gap-filled region.
pub const MAX_IGF_SFBS: usize = 16;

/// The maximum number of window groups per frame.
pub const MAX_GROUPS: usize = 8;

/// Residual values below this magnitude in the gap-filled region are treated as exact zeros, so
/// that coded-vs-filled detection is unambiguous.
const ZERO_CLEAN_THRESHOLD: f32 = 1.0e-6;

/// The upper clamp on a per-band tile gain.
const MAX_TILE_GAIN: f32 = 10.0;

/// The tile whitening level.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum WhiteningLevel {
    /// Use the tile spectrum as-is.
    #[default]
    Off,
    /// Flatten the tile spectrum with a sliding-window energy estimate.
    Mid,
    /// Replace gap-filled lines with unit-magnitude random-sign values.
    Strong,
}

/// Static gap-filling configuration, fixed for the lifetime of a stream.
#[derive(Clone, Debug)]
pub struct IgfConfig {
    /// First gap-filled scalefactor band of a long window.
    pub start_sfb: usize,
    /// One past the last gap-filled scalefactor band of a long window.
    pub stop_sfb: usize,
    /// First gap-filled scalefactor band of a short window, derived from the long-window range.
    pub start_sfb_short: usize,
    /// One past the last gap-filled scalefactor band of a short window.
    pub stop_sfb_short: usize,
    /// High-resolution mode: one transmitted energy per band rather than per band pair.
    pub use_high_res: bool,
    sbinfo: SubbandInfo,
}

impl IgfConfig {
    /// Build a configuration for the given sample rate and long-window band range.
    pub fn new(
        sample_rate: u32,
        start_sfb: usize,
        stop_sfb: usize,
        use_high_res: bool,
    ) -> Result<IgfConfig> {
        let sbinfo = SubbandInfo::find(sample_rate);

        if start_sfb >= stop_sfb || stop_sfb >= sbinfo.long_bands.len() {
            return unsupported_param_error("igf: invalid scalefactor band range");
        }
        if stop_sfb - start_sfb > MAX_IGF_SFBS {
            return unsupported_param_error("igf: scalefactor band range too wide");
        }
        // Tiles copy from below the region, so the region cannot start at the bottom of the
        // spectrum.
        if sbinfo.long_bands[start_sfb] < 2 * sbinfo.long_bands[1] {
            return unsupported_param_error("igf: region start too low");
        }

        let start_line = sbinfo.long_bands[start_sfb];
        let stop_line = sbinfo.long_bands[stop_sfb];

        // A short window covers one eighth of the spectral lines. Map the long-window region
        // onto the short-window band grid: the start floors, the stop ceils.
        let start_sfb_short = Self::floor_band(sbinfo.short_bands, start_line / 8);
        let stop_sfb_short = Self::ceil_band(sbinfo.short_bands, stop_line / 8)
            .max(start_sfb_short + 1);

        Ok(IgfConfig { start_sfb, stop_sfb, start_sfb_short, stop_sfb_short, use_high_res, sbinfo })
    }

    fn floor_band(offsets: &[usize], line: usize) -> usize {
        let mut band = 0;
        while band + 2 < offsets.len() && offsets[band + 1] <= line {
            band += 1;
        }
        // Tiles copy from below the gap-fill start, so the short-window region must not map to
        // band 0: clamping to the second boundary keeps at least `offsets[1]` source lines
        // (one full band, the short-window minimum source width) below it.
        band.max(1)
    }

    fn ceil_band(offsets: &[usize], line: usize) -> usize {
        let mut band = 0;
        while band + 1 < offsets.len() && offsets[band] < line {
            band += 1;
        }
        band
    }

    pub fn long_bands(&self) -> &'static [usize] {
        self.sbinfo.long_bands
    }

    pub fn short_bands(&self) -> &'static [usize] {
        self.sbinfo.short_bands
    }
}

/// Per-frame transmitted gap-filling parameters.
#[derive(Clone, Debug)]
pub struct IgfFrameData {
    pub num_tiles: usize,
    /// The transmitted source index per tile.
    pub tile_idx: [u8; MAX_TILES],
    /// The transmitted whitening level per tile.
    pub whitening: [WhiteningLevel; MAX_TILES],
    /// Quantized destination energies, per window group and band (or band pair when
    /// high-resolution mode is off), in steps of 2^0.25.
    pub energies: [[u8; MAX_IGF_SFBS]; MAX_GROUPS],
    /// Temporal noise flattening is signaled for this frame.
    pub tnf: bool,
}

impl IgfFrameData {
    pub fn new(num_tiles: usize) -> Self {
        IgfFrameData {
            num_tiles,
            tile_idx: [0; MAX_TILES],
            whitening: [WhiteningLevel::Off; MAX_TILES],
            energies: [[0; MAX_IGF_SFBS]; MAX_GROUPS],
            tnf: false,
        }
    }
}

/// Dequantize a transmitted destination energy. Quantization is in steps of 2^0.25, offset so
/// that the usable amplitude range brackets unity.
#[inline(always)]
fn dequant_energy(e: u8) -> f32 {
    2.0f32.powf(0.25 * (f32::from(e) - 56.0))
}

/// Average an energy accumulated over a window group.
///
/// Power-of-two group lengths normalize by exponent shift, the remaining lengths divide
/// explicitly. The two paths are deliberately kept separate; the per-length behavior is part of
/// the decoder contract.
#[inline(always)]
fn group_mean(sum: f32, len: usize) -> f32 {
    match len {
        1 => sum,
        2 => 0.5 * sum,
        4 => 0.25 * sum,
        8 => 0.125 * sum,
        _ => sum / (len as f32),
    }
}

/// The gap-filling engine for one channel element.
pub struct IgfEngine {
    config: IgfConfig,
    grid_long: Option<GridInfo>,
    grid_short: Option<GridInfo>,
    tile_buf: [[f32; LONG_WINDOW_LEN]; MAX_TILES],
    virt: [f32; LONG_WINDOW_LEN],
    was_zero: [bool; LONG_WINDOW_LEN],
    src_cached: bool,
    lcg: Lcg,
    grid_rebuilds: usize,
}

impl IgfEngine {
    pub fn new(config: IgfConfig) -> Self {
        IgfEngine {
            config,
            grid_long: None,
            grid_short: None,
            tile_buf: [[0.0; LONG_WINDOW_LEN]; MAX_TILES],
            virt: [0.0; LONG_WINDOW_LEN],
            was_zero: [false; LONG_WINDOW_LEN],
            src_cached: false,
            lcg: Lcg::new(0x1f2e3d4c),
            grid_rebuilds: 0,
        }
    }

    /// Reset all cached per-stream state.
    pub fn reset(&mut self) {
        self.grid_long = None;
        self.grid_short = None;
        self.src_cached = false;
        self.lcg = Lcg::new(0x1f2e3d4c);
    }

    /// The number of grid rebuilds performed so far. Stable bitstream conditions must not grow
    /// this per-frame.
    pub fn grid_rebuilds(&self) -> usize {
        self.grid_rebuilds
    }

    /// Copy the base spectrum into the per-tile source buffers ahead of [`apply`](Self::apply).
    ///
    /// A stage that runs between entropy decoding and gap filling (for example joint-stereo
    /// processing) may call this to capture the source region before it mutates the spectrum;
    /// the next `apply` call then skips its own injection.
    pub fn inject_source(
        &mut self,
        data: &IgfFrameData,
        window: WindowSequence,
        spectrum: &[f32],
    ) {
        let grid = self.grid_for(window, data).clone();
        self.inject(&grid, window, spectrum);
        self.src_cached = true;
    }

    /// Gap-fill one channel's spectrum in place.
    ///
    /// `spectrum` holds 1024 lines: one long window, or eight consecutive short windows of 128
    /// lines. Lines that are nonzero on entry are never modified.
    pub fn apply(
        &mut self,
        data: &IgfFrameData,
        window: WindowSequence,
        grouping: &WindowGrouping,
        spectrum: &mut [f32],
    ) -> Result<()> {
        assert_eq!(spectrum.len(), LONG_WINDOW_LEN);

        let grid = self.grid_for(window, data).clone();

        let (num_windows, win_len) = match window {
            WindowSequence::Long => (1, LONG_WINDOW_LEN),
            WindowSequence::EightShort => (8, LONG_WINDOW_LEN / 8),
        };

        // Clean near-threshold residuals so a line is either coded (nonzero) or a gap (zero).
        for w in 0..num_windows {
            let base = w * win_len;
            for i in grid.start_line..grid.stop_line {
                let x = &mut spectrum[base + i];
                if x.abs() < ZERO_CLEAN_THRESHOLD {
                    *x = 0.0;
                }
                self.was_zero[base + i] = *x == 0.0;
            }
        }

        // Capture the tile sources, unless an earlier stage already did.
        if self.src_cached {
            self.src_cached = false;
        }
        else {
            self.inject(&grid, window, spectrum);
        }

        // Whitening applies to long windows only.
        if window == WindowSequence::Long {
            for t in 0..grid.num_tiles {
                let tile = &grid.tiles[t];
                let buf = &mut self.tile_buf[t][tile.dst_start..tile.dst_stop];
                match data.whitening[t] {
                    WhiteningLevel::Off => (),
                    WhiteningLevel::Mid => whiten::flatten(buf),
                    WhiteningLevel::Strong => {
                        let zero = &self.was_zero[tile.dst_start..tile.dst_stop];
                        whiten::random_signs(&mut self.lcg, buf, zero);
                    }
                }
            }
        }

        // Per window group and destination band: match the transmitted energy and fill the gaps.
        for g in 0..grouping.num_groups {
            let w_start = grouping.group_start(g);
            let g_len = grouping.group_len[g];

            for sfb in grid.start_sfb..grid.stop_sfb {
                let band_start = grid.sfb_offsets[sfb];
                let band_stop = grid.sfb_offsets[sfb + 1];
                let t = grid.tile_for_sfb(sfb);

                // Survived energy comes from lines the encoder coded; tile energy from the
                // candidate fill of the gap lines.
                let mut survived = 0.0f32;
                let mut tile_energy = 0.0f32;

                for w in w_start..w_start + g_len {
                    let base = w * win_len;
                    for i in band_start..band_stop {
                        let x = spectrum[base + i];
                        if x != 0.0 {
                            survived += x * x;
                        }
                        else {
                            let y = self.tile_buf[t][base + i];
                            tile_energy += y * y;
                        }
                    }
                }

                let survived = group_mean(survived, g_len);
                let tile_energy = group_mean(tile_energy, g_len);

                // When high-resolution mode is off, band pairs share one transmitted energy.
                let eidx = if self.config.use_high_res {
                    sfb - grid.start_sfb
                }
                else {
                    (sfb - grid.start_sfb) / 2
                };

                let target = dequant_energy(data.energies[g][eidx]);
                let width = (band_stop - band_start) as f32;

                let gain = if tile_energy > 0.0 {
                    ((target * target * width - survived).max(0.0) / tile_energy)
                        .sqrt()
                        .min(MAX_TILE_GAIN)
                }
                else {
                    0.0
                };

                // Fill only the gap lines of the real spectrum; the virtual spectrum receives
                // the scaled tile everywhere for TNF.
                for w in w_start..w_start + g_len {
                    let base = w * win_len;
                    for i in band_start..band_stop {
                        let idx = base + i;
                        let fill = gain * self.tile_buf[t][idx];
                        self.virt[idx] = fill;
                        if self.was_zero[idx] {
                            spectrum[idx] = fill;
                        }
                    }
                }
            }
        }

        if data.tnf && window == WindowSequence::Long {
            tnf::apply(&grid, &self.virt, &self.was_zero, spectrum);
        }

        Ok(())
    }

    /// Gap-fill both channels of a channel pair.
    ///
    /// When the pair signals identical tile sets and whitening, random-sign whitening reuses the
    /// same generator sequence on both channels so the injected noise stays phase-coherent
    /// across the pair.
    pub fn apply_pair(
        &mut self,
        data_l: &IgfFrameData,
        data_r: &IgfFrameData,
        window: WindowSequence,
        grouping: &WindowGrouping,
        spec_l: &mut [f32],
        spec_r: &mut [f32],
    ) -> Result<()> {
        let coherent = data_l.num_tiles == data_r.num_tiles
            && data_l.tile_idx == data_r.tile_idx
            && data_l.whitening == data_r.whitening;

        let saved = self.lcg.clone();
        self.apply(data_l, window, grouping, spec_l)?;

        if coherent {
            self.lcg = saved;
        }
        self.apply(data_r, window, grouping, spec_r)
    }

    /// Return the cached grid for `window`, rebuilding it only when the transmitted tile-index
    /// set changed.
    fn grid_for(&mut self, window: WindowSequence, data: &IgfFrameData) -> &GridInfo {
        let slot = match window {
            WindowSequence::Long => &mut self.grid_long,
            WindowSequence::EightShort => &mut self.grid_short,
        };

        let fresh = slot.as_ref().map_or(false, |grid| grid.matches(data.num_tiles, &data.tile_idx));

        if !fresh {
            debug!("rebuilding igf grid for {:?} window", window);
            *slot = None;
            self.grid_rebuilds += 1;
        }

        slot.get_or_insert_with(|| {
            GridInfo::build(&self.config, window, data.num_tiles, &data.tile_idx)
        })
    }

    fn inject(&mut self, grid: &GridInfo, window: WindowSequence, spectrum: &[f32]) {
        let (num_windows, win_len) = match window {
            WindowSequence::Long => (1, LONG_WINDOW_LEN),
            WindowSequence::EightShort => (8, LONG_WINDOW_LEN / 8),
        };

        for t in 0..grid.num_tiles {
            let tile = &grid.tiles[t];
            for w in 0..num_windows {
                let base = w * win_len;
                for i in 0..tile.width() {
                    self.tile_buf[t][base + tile.dst_start + i] =
                        spectrum[base + tile.src_start + i];
                }
            }
        }
    }
}
