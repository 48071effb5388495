// Euphonia
// Copyright (c) 2026 The Project Euphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IGF grid and tile mapping.
//!
//! The grid maps the transmitted tile-index set onto concrete spectral line ranges: the
//! destination range of each tile inside the gap-filled region, and the source range below it
//! that the tile copies from. Building the grid walks the scalefactor band tables, so the engine
//! caches one grid per window type and rebuilds it only when the transmitted tile-index set
//! changes.

use crate::common::WindowSequence;

use super::{IgfConfig, MAX_TILES};

/// The lowest spectral line a long-window tile may copy from.
const MIN_SOURCE_LINE_LONG: usize = 32;

/// The lowest spectral line a short-window tile may copy from.
const MIN_SOURCE_LINE_SHORT: usize = 4;

/// The mapping of one tile.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TileMap {
    /// First scalefactor band (absolute index) covered by this tile.
    pub sfb_start: usize,
    /// One past the last scalefactor band covered by this tile.
    pub sfb_stop: usize,
    /// First destination spectral line, relative to the window start.
    pub dst_start: usize,
    /// One past the last destination spectral line, relative to the window start.
    pub dst_stop: usize,
    /// First source spectral line, relative to the window start.
    pub src_start: usize,
}

impl TileMap {
    /// The number of spectral lines the tile fills.
    pub fn width(&self) -> usize {
        self.dst_stop - self.dst_start
    }
}

/// The per-window-type IGF grid.
#[derive(Clone, Debug)]
pub struct GridInfo {
    /// First spectral line of the gap-filled region, relative to the window start.
    pub start_line: usize,
    /// One past the last spectral line of the gap-filled region, relative to the window start.
    pub stop_line: usize,
    /// First scalefactor band of the gap-filled region.
    pub start_sfb: usize,
    /// One past the last scalefactor band of the gap-filled region.
    pub stop_sfb: usize,
    /// The scalefactor band offsets of the window type this grid was built for.
    pub sfb_offsets: &'static [usize],
    pub num_tiles: usize,
    pub tiles: [TileMap; MAX_TILES],
    /// The transmitted tile-index set this grid was built for.
    tile_idx: [u8; MAX_TILES],
}

impl GridInfo {
    /// Build the grid for `window` from the transmitted tile-index set.
    pub fn build(
        config: &IgfConfig,
        window: WindowSequence,
        num_tiles: usize,
        tile_idx: &[u8; MAX_TILES],
    ) -> GridInfo {
        let (sfb_offsets, start_sfb, stop_sfb, min_src) = match window {
            WindowSequence::Long => (
                config.long_bands(),
                config.start_sfb,
                config.stop_sfb,
                MIN_SOURCE_LINE_LONG,
            ),
            WindowSequence::EightShort => (
                config.short_bands(),
                config.start_sfb_short,
                config.stop_sfb_short,
                MIN_SOURCE_LINE_SHORT,
            ),
        };

        let start_line = sfb_offsets[start_sfb];
        let stop_line = sfb_offsets[stop_sfb];

        // Split the gap-filled bands into near-equal runs, one per tile, the remainder going to
        // the lowest tiles.
        let num_bands = stop_sfb - start_sfb;
        let num_tiles = num_tiles.clamp(1, MAX_TILES.min(num_bands));
        let run = num_bands / num_tiles;
        let rem = num_bands % num_tiles;

        let mut tiles = [TileMap::default(); MAX_TILES];
        let mut sfb = start_sfb;

        for (t, tile) in tiles[..num_tiles].iter_mut().enumerate() {
            let len = run + usize::from(t < rem);

            tile.sfb_start = sfb;
            tile.sfb_stop = sfb + len;
            tile.dst_start = sfb_offsets[tile.sfb_start];
            tile.dst_stop = sfb_offsets[tile.sfb_stop];

            // The transmitted tile index selects how far below the gap-filled region the source
            // patch sits. The source must lie entirely below the region start and above the
            // minimum source line.
            let width = tile.width();
            let max_src = start_line.saturating_sub(width);
            let src = start_line.saturating_sub((usize::from(tile_idx[t]) + 1) * width);
            tile.src_start = src.max(min_src).min(max_src);

            sfb += len;
        }

        GridInfo {
            start_line,
            stop_line,
            start_sfb,
            stop_sfb,
            sfb_offsets,
            num_tiles,
            tiles,
            tile_idx: *tile_idx,
        }
    }

    /// True if this grid was built for the given transmitted tile-index set.
    pub fn matches(&self, num_tiles: usize, tile_idx: &[u8; MAX_TILES]) -> bool {
        let num_tiles = num_tiles.clamp(1, MAX_TILES.min(self.stop_sfb - self.start_sfb));
        self.num_tiles == num_tiles && self.tile_idx[..num_tiles] == tile_idx[..num_tiles]
    }

    /// The index of the tile covering the scalefactor band `sfb`.
    pub fn tile_for_sfb(&self, sfb: usize) -> usize {
        for (t, tile) in self.tiles[..self.num_tiles].iter().enumerate() {
            if sfb >= tile.sfb_start && sfb < tile.sfb_stop {
                return t;
            }
        }
        // Callers only pass bands inside the gap-filled region.
        self.num_tiles - 1
    }
}

#[cfg(test)]
mod tests {
    use super::GridInfo;
    use crate::common::WindowSequence;
    use crate::igf::IgfConfig;

    #[test]
    fn verify_grid_tile_split() {
        // 48 kHz long windows: bands 32..44 span lines 416..832.
        let config = IgfConfig::new(48_000, 32, 44, true).unwrap();
        let grid = GridInfo::build(&config, WindowSequence::Long, 3, &[0, 1, 2, 0]);

        assert_eq!(grid.start_line, 416);
        assert_eq!(grid.stop_line, 832);
        assert_eq!(grid.num_tiles, 3);

        // 12 bands split 4/4/4, contiguous coverage.
        assert_eq!(grid.tiles[0].sfb_start, 32);
        assert_eq!(grid.tiles[0].sfb_stop, 36);
        assert_eq!(grid.tiles[1].sfb_start, 36);
        assert_eq!(grid.tiles[2].sfb_stop, 44);
        assert_eq!(grid.tiles[0].dst_start, 416);
        assert_eq!(grid.tiles[2].dst_stop, 832);
    }

    #[test]
    fn verify_grid_source_below_region() {
        let config = IgfConfig::new(48_000, 32, 44, true).unwrap();
        let grid = GridInfo::build(&config, WindowSequence::Long, 4, &[0, 1, 2, 3]);

        for tile in &grid.tiles[..grid.num_tiles] {
            assert!(tile.src_start + tile.width() <= grid.start_line);
            assert!(tile.src_start >= 32);
        }
    }

    #[test]
    fn verify_grid_matches() {
        let config = IgfConfig::new(48_000, 32, 44, true).unwrap();
        let grid = GridInfo::build(&config, WindowSequence::Long, 2, &[1, 3, 0, 0]);

        assert!(grid.matches(2, &[1, 3, 0, 0]));
        // Unused tile slots must not affect the comparison.
        assert!(grid.matches(2, &[1, 3, 7, 7]));
        assert!(!grid.matches(2, &[1, 2, 0, 0]));
        assert!(!grid.matches(3, &[1, 3, 0, 0]));
    }
}
