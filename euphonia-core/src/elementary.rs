// Euphonia
// Copyright (c) 2026 The Project Euphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `elementary` module provides the seam between the decoder session and the underlying
//! elementary bitstream decoder.
//!
//! The elementary decoder consumes MHAS-packetized compressed bytes and produces blocks of
//! interleaved PCM together with per-AU stream information. Euphonia drives it exclusively through
//! the [`ElementaryDecoder`] trait; the entropy decoding itself is an external collaborator.

use crate::drc::DrcParams;
use crate::errors::Result;

/// Stream information reported by the elementary decoder alongside a decoded frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamInfo {
    /// The sample rate of the decoded audio in Hz.
    pub sample_rate: u32,
    /// The number of audio channels after rendering to the target layout.
    pub num_channels: usize,
    /// The size of the decoded AU in samples per channel. An AU size of 0 indicates a frame that
    /// produced no renderable output (for example, a pre-roll frame).
    pub au_size: usize,
    /// The loudness of the output in steps of -0.25 LU. -1 if the stream carries no loudness
    /// metadata.
    pub output_loudness: i32,
    /// The frame was concealed rather than decoded from valid bitstream data.
    pub is_concealed: bool,
}

/// The outcome of a single elementary decode step.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DecodeStep {
    /// A frame was decoded. The PCM and stream information are available from the decoder until
    /// the next call to `decode_frame`.
    Frame,
    /// The internal buffer does not hold enough bits for a complete AU.
    NeedMoreData,
    /// The decoder lost synchronization with the packet stream.
    SyncLost,
}

/// An `ElementaryDecoder` decodes MHAS-packetized AUs into interleaved PCM blocks.
///
/// Implementations are driven frame-by-frame by the decoder session: bytes are pushed with
/// [`fill`](ElementaryDecoder::fill), then [`decode_frame`](ElementaryDecoder::decode_frame) is
/// called in a loop until it reports [`DecodeStep::NeedMoreData`].
pub trait ElementaryDecoder: Send {
    /// Push compressed bytes into the decoder's internal buffer.
    fn fill(&mut self, buf: &[u8]) -> Result<()>;

    /// Attempt to decode one AU. If `conceal` is set, the decoder must produce a concealed frame
    /// even if the buffered bitstream is incomplete or corrupt.
    fn decode_frame(&mut self, conceal: bool) -> Result<DecodeStep>;

    /// The interleaved PCM of the last decoded frame. Empty if no frame was decoded yet.
    fn pcm(&self) -> &[f32];

    /// The stream information of the last decoded frame. `None` if no frame was decoded yet.
    fn stream_info(&self) -> Option<&StreamInfo>;

    /// Select the CICP index of the loudspeaker layout the decoder renders to.
    fn set_target_layout(&mut self, cicp: u8) -> Result<()>;

    /// Apply a set of DRC parameters. Parameters left unset keep the decoder defaults.
    fn apply_drc(&mut self, params: &DrcParams) -> Result<()>;

    /// Discard all buffered input and decoder state, and reopen the decoder. If `config` holds an
    /// out-of-band MHA configuration record the decoder reopens in raw-config mode, otherwise it
    /// expects the configuration in-band in the MHAS stream.
    fn reset(&mut self, config: Option<&[u8]>) -> Result<()>;

    /// Release internal lookahead: after this call, `decode_frame` drains frames still held for
    /// lookahead before reporting [`DecodeStep::NeedMoreData`].
    fn flush(&mut self);
}
