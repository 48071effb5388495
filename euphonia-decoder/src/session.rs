// Euphonia
// Copyright (c) 2026 The Project Euphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use log::{debug, info, warn};

use euphonia_core::drc::{DrcParam, DrcParams};
use euphonia_core::elementary::{DecodeStep, ElementaryDecoder};
use euphonia_core::errors::{buffer_error, process_error, restart_error, Result};
use euphonia_core::queue::{BoundedQueue, SampleQueue};
use euphonia_core::units::{duration_to_frames, frames_to_duration, Duration, TimeStamp};

use crate::fade::{self, FADE_LEN_FRAMES};

/// An input timestamp gap larger than this indicates a stream discontinuity (a seek or dropped
/// packets); the session restarts itself rather than resynchronize slowly.
const MAX_INPUT_GAP_NS: Duration = 200_000_000;

/// Tolerated difference between an AU's reported duration and the externally requested duration,
/// in frames. Differences within the tolerance pass through unreconciled.
const DURATION_TOLERANCE: u64 = 5;

/// The largest AU the elementary decoder can emit, in frames (samples per channel). Output frames
/// larger than this are split across `get_samples` calls.
pub const MAX_FRAMES_PER_CALL: usize = 3072;

/// The largest channel count of a target layout.
const MAX_CHANNELS: usize = 24;

/// Capacity of the timestamp and AU/output record queues.
const RECORD_QUEUE_CAPACITY: usize = 24;

/// Capacity of the fade event queues.
const FADE_QUEUE_CAPACITY: usize = 32;

/// Capacity of the decoded and output sample queues, in interleaved samples. Covers two AUs of
/// the worst-case size, or a comfortable run of typical ones.
const SAMPLE_QUEUE_CAPACITY: usize = 2 * MAX_FRAMES_PER_CALL * MAX_CHANNELS;

/// A decoded AU awaiting promotion to the output queue.
#[derive(Copy, Clone, Debug)]
struct AuInfo {
    /// AU size in frames (samples per channel).
    au_size: usize,
    concealed: bool,
    loudness: i32,
}

/// A reconciled output frame awaiting delivery.
#[derive(Copy, Clone, Debug)]
struct PendingOutput {
    /// Frame size in interleaved samples (all channels).
    size: usize,
    concealed: bool,
    loudness: i32,
}

/// Information describing one block of samples returned by [`MpeghDecoder::get_samples`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OutputInfo {
    /// The number of delivered frames (samples per channel).
    pub num_samples_per_channel: usize,
    /// The number of interleaved channels.
    pub num_channels: usize,
    /// The sample rate in Hz.
    pub sample_rate: u32,
    /// The presentation timestamp of the first delivered frame, in nanoseconds.
    pub pts: TimeStamp,
    /// The loudness of the output in steps of -0.25 LU. -1 if the stream carries no loudness
    /// metadata.
    pub loudness: i32,
    /// The delivered samples were concealed rather than decoded from valid bitstream data.
    pub is_concealed: bool,
}

/// The outcome of a pull operation on the session.
#[derive(Debug)]
pub enum Outcome {
    /// Samples were written to the output buffer.
    Ready(OutputInfo),
    /// Not enough data is buffered to produce output. Feed more compressed data with
    /// [`MpeghDecoder::process`]. This is the normal idle signal of the pull loop, not an error.
    NeedMoreData,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum SessionState {
    /// No frame was decoded yet; the stream's sample rate and channel count are unknown.
    Unconfigured,
    /// The stream configuration is locked. Any drift moves the session to `NeedsRestart`.
    Active { sample_rate: u32, num_channels: usize },
    /// The stream configuration changed mid-session. Every operation except `flush` is rejected
    /// until the caller restarts the session.
    NeedsRestart,
}

/// An MPEG-H 3D Audio decoder session.
///
/// The session owns an elementary decoder and all buffering between it and the caller: input
/// timestamps, per-AU records, decoded PCM, reconciled output PCM and scheduled fade events. It
/// is single-threaded and non-reentrant; one logical thread drives it through the pull loop.
pub struct MpeghDecoder {
    dec: Box<dyn ElementaryDecoder>,
    state: SessionState,
    /// The CICP index of the target loudspeaker layout, fixed at construction.
    cicp: u8,
    /// Out-of-band MHA configuration record, if the session was constructed with one. Selects
    /// raw-config mode when the elementary decoder is reopened.
    mha_config: Option<Box<[u8]>>,
    drc_desired: DrcParams,
    drc_applied: DrcParams,
    drc_dirty: bool,
    timestamp_in: BoundedQueue<TimeStamp>,
    timestamp_out: BoundedQueue<TimeStamp>,
    au_info: BoundedQueue<AuInfo>,
    decoded: SampleQueue,
    output_info: BoundedQueue<PendingOutput>,
    output: SampleQueue,
    /// Fade event positions in interleaved samples, relative to the front of the output queue.
    /// Delivery decrements them; an event that went negative was already served.
    fade_in_idx: BoundedQueue<i64>,
    fade_out_idx: BoundedQueue<i64>,
    /// Duration of the most recently decoded AU. Used to extrapolate trailing timestamps when
    /// draining at end of stream.
    last_au_duration: Option<Duration>,
    /// Whether the most recently promoted AU was concealed. Transitions schedule fades.
    prev_concealed: bool,
}

impl MpeghDecoder {
    /// Instantiate a session rendering to the layout given by `cicp`. The stream configuration is
    /// expected in-band in the MHAS stream.
    pub fn new(dec: Box<dyn ElementaryDecoder>, cicp: u8) -> Result<MpeghDecoder> {
        MpeghDecoder::init(dec, cicp, None)
    }

    /// Instantiate a session with an out-of-band MHA configuration record.
    pub fn new_with_config(
        dec: Box<dyn ElementaryDecoder>,
        cicp: u8,
        config: &[u8],
    ) -> Result<MpeghDecoder> {
        MpeghDecoder::init(dec, cicp, Some(config.into()))
    }

    fn init(
        mut dec: Box<dyn ElementaryDecoder>,
        cicp: u8,
        mha_config: Option<Box<[u8]>>,
    ) -> Result<MpeghDecoder> {
        dec.reset(mha_config.as_deref())?;
        dec.set_target_layout(cicp)?;

        Ok(MpeghDecoder {
            dec,
            state: SessionState::Unconfigured,
            cicp,
            mha_config,
            drc_desired: DrcParams::new(),
            drc_applied: DrcParams::new(),
            drc_dirty: false,
            timestamp_in: BoundedQueue::new(RECORD_QUEUE_CAPACITY),
            timestamp_out: BoundedQueue::new(RECORD_QUEUE_CAPACITY),
            au_info: BoundedQueue::new(RECORD_QUEUE_CAPACITY),
            decoded: SampleQueue::new(SAMPLE_QUEUE_CAPACITY),
            output_info: BoundedQueue::new(RECORD_QUEUE_CAPACITY),
            output: SampleQueue::new(SAMPLE_QUEUE_CAPACITY),
            fade_in_idx: BoundedQueue::new(FADE_QUEUE_CAPACITY),
            fade_out_idx: BoundedQueue::new(FADE_QUEUE_CAPACITY),
            last_au_duration: None,
            prev_concealed: false,
        })
    }

    /// The locked sample rate, or `None` before the first successful decode.
    pub fn sample_rate(&self) -> Option<u32> {
        match self.state {
            SessionState::Active { sample_rate, .. } => Some(sample_rate),
            _ => None,
        }
    }

    /// The locked channel count, or `None` before the first successful decode.
    pub fn num_channels(&self) -> Option<usize> {
        match self.state {
            SessionState::Active { num_channels, .. } => Some(num_channels),
            _ => None,
        }
    }

    /// Feed one compressed AU with its presentation timestamp and decode as far as the buffered
    /// bitstream allows.
    pub fn process(&mut self, buf: &[u8], ts: TimeStamp) -> Result<()> {
        if self.state == SessionState::NeedsRestart {
            return restart_error();
        }

        // A large jump in input timestamps means the caller seeked or the stream dropped.
        // Restarting immediately bounds the resynchronization latency.
        if let Some(&last) = self.timestamp_in.back() {
            let gap = ts.saturating_sub(last);
            if gap > MAX_INPUT_GAP_NS {
                info!("input gap of {} ns exceeds {} ns, restarting", gap, MAX_INPUT_GAP_NS);
                self.restart()?;
            }
        }

        if self.timestamp_in.is_full() {
            return buffer_error("decoder (session): timestamp queue full");
        }

        // Parameter changes are deferred to AU boundaries so a frame is never decoded with a
        // half-applied DRC set.
        if self.drc_dirty {
            self.dec.apply_drc(&self.drc_desired)?;
            self.drc_applied = self.drc_desired.clone();
            self.drc_dirty = false;
        }

        self.dec.fill(buf)?;

        self.timestamp_in.push_back(ts)?;

        let result = self.decode_buffered();

        if result.is_err() {
            // The fed AU failed; its timestamp must not outlive it, or every later
            // timestamp/AU pair would be skewed by one frame duration.
            self.timestamp_in.pop_back();
        }

        result
    }

    /// Decode as many complete AUs as the buffered bitstream allows.
    fn decode_buffered(&mut self) -> Result<()> {
        let mut decoded_frames = 0usize;

        loop {
            match self.dec.decode_frame(false)? {
                DecodeStep::Frame => {
                    self.accept_frame()?;
                    decoded_frames += 1;
                }
                DecodeStep::NeedMoreData | DecodeStep::SyncLost => {
                    if decoded_frames > 0 {
                        // All complete AUs were consumed; a normal end of this call.
                        break;
                    }

                    if self.state == SessionState::Unconfigured {
                        // Nothing decodable and the stream is still unknown. Drop the queued
                        // timestamp so the queue stays consistent with the decoded AUs.
                        self.timestamp_in.pop_back();
                        break;
                    }

                    // A configured stream under-ran. Force one concealed frame before giving up
                    // so the output rhythm is maintained.
                    debug!("decode under-run on a configured stream, forcing concealment");

                    match self.dec.decode_frame(true)? {
                        DecodeStep::Frame => self.accept_frame()?,
                        _ => return process_error("decoder (session): concealment failed"),
                    }
                    break;
                }
            }
        }

        Ok(())
    }

    /// Pull decoded samples into `out`.
    ///
    /// Writes at most one logical output frame, capped at [`MAX_FRAMES_PER_CALL`] frames and the
    /// capacity of `out`; a frame larger than either cap is continued by the next call.
    pub fn get_samples(&mut self, out: &mut [f32]) -> Result<Outcome> {
        if self.state == SessionState::NeedsRestart {
            return restart_error();
        }
        if out.is_empty() {
            return process_error("decoder (session): zero-length output buffer");
        }

        let (sample_rate, num_channels) = match self.state {
            SessionState::Active { sample_rate, num_channels } => (sample_rate, num_channels),
            _ => return Ok(Outcome::NeedMoreData),
        };

        // Promote every AU whose decoded PCM and framing duration are available.
        while self.promote(sample_rate, num_channels)? {}

        self.apply_ready_fades(num_channels);

        let pending = match self.output_info.front() {
            Some(pending) => *pending,
            None => return Ok(Outcome::NeedMoreData),
        };

        let want = pending.size.min(out.len()).min(MAX_FRAMES_PER_CALL * num_channels);
        // Only whole frames are delivered.
        let want = (want / num_channels) * num_channels;

        if want == 0 || self.output.len() < want {
            return Ok(Outcome::NeedMoreData);
        }

        let pts = self.timestamp_out.front().copied().unwrap_or(0);
        let written = self.output.pop_into(&mut out[..want]);

        if written == pending.size {
            self.output_info.pop_front();
            self.timestamp_out.pop_front();
        }
        else {
            // The logical frame is split across calls: shrink the head record in place and
            // advance its timestamp by the delivered duration.
            if let Some(head) = self.output_info.front_mut() {
                head.size -= written;
            }
            if let Some(ts) = self.timestamp_out.front_mut() {
                *ts += frames_to_duration((written / num_channels) as u64, sample_rate);
            }
        }

        self.retire_fades(written as i64);

        Ok(Outcome::Ready(OutputInfo {
            num_samples_per_channel: written / num_channels,
            num_channels,
            sample_rate,
            pts,
            loudness: pending.loudness,
            is_concealed: pending.concealed,
        }))
    }

    /// Full restart: discard all pending state and reopen the elementary decoder. Used for seek
    /// operations.
    ///
    /// The target layout and any previously applied DRC parameters are reapplied; the sample rate
    /// and channel count are unknown again until the next successful decode.
    pub fn flush(&mut self) -> Result<()> {
        self.restart()
    }

    /// Drain the elementary decoder's internal lookahead at end of stream without discarding
    /// session queues.
    ///
    /// A trailing timestamp is synthesized by extrapolating the last input timestamp by the last
    /// AU's duration, so a subsequent [`get_samples`](MpeghDecoder::get_samples) call can still
    /// reconcile the final AU.
    pub fn drain(&mut self) -> Result<()> {
        if self.state == SessionState::NeedsRestart {
            return restart_error();
        }

        self.dec.flush();

        loop {
            match self.dec.decode_frame(false)? {
                DecodeStep::Frame => self.accept_frame()?,
                DecodeStep::NeedMoreData | DecodeStep::SyncLost => break,
            }
        }

        // Reconciling an AU needs a bounding timestamp pair. Frames released from the lookahead
        // have no successor timestamp, so extrapolate from the last known one by the last frame
        // duration until every queued AU is bounded.
        if let Some(dur) = self.last_au_duration {
            while self.timestamp_in.len() < self.au_info.len() + 1 {
                let last = match self.timestamp_in.back() {
                    Some(&last) => last,
                    None => break,
                };
                if self.timestamp_in.is_full() {
                    break;
                }
                self.timestamp_in.push_back(last + dur)?;
            }
        }

        Ok(())
    }

    /// Request a DRC parameter change. The value is validated immediately, but pushed to the
    /// elementary decoder on the next [`process`](MpeghDecoder::process) call so a frame is never
    /// decoded mid-parameter-change.
    pub fn set_param(&mut self, param: DrcParam, value: i32) -> Result<()> {
        self.drc_desired.set(param, value)?;
        self.drc_dirty = true;
        Ok(())
    }

    fn restart(&mut self) -> Result<()> {
        self.dec.reset(self.mha_config.as_deref())?;
        self.dec.set_target_layout(self.cicp)?;

        if !self.drc_applied.is_empty() {
            self.dec.apply_drc(&self.drc_applied)?;
        }

        self.timestamp_in.clear();
        self.timestamp_out.clear();
        self.au_info.clear();
        self.decoded.clear();
        self.output_info.clear();
        self.output.clear();
        self.fade_in_idx.clear();
        self.fade_out_idx.clear();

        self.state = SessionState::Unconfigured;
        self.last_au_duration = None;
        self.prev_concealed = false;

        Ok(())
    }

    /// Capture one decoded frame from the elementary decoder into the session queues.
    fn accept_frame(&mut self) -> Result<()> {
        let info = match self.dec.stream_info() {
            Some(info) => info.clone(),
            None => return process_error("decoder (session): decoded frame without stream info"),
        };

        match self.state {
            SessionState::Unconfigured => {
                info!(
                    "stream locked to {} Hz, {} channels",
                    info.sample_rate, info.num_channels
                );
                self.state = SessionState::Active {
                    sample_rate: info.sample_rate,
                    num_channels: info.num_channels,
                };
            }
            SessionState::Active { sample_rate, num_channels } => {
                if sample_rate != info.sample_rate || num_channels != info.num_channels {
                    warn!(
                        "stream configuration changed mid-session: {} Hz/{} ch to {} Hz/{} ch",
                        sample_rate, num_channels, info.sample_rate, info.num_channels
                    );
                    self.state = SessionState::NeedsRestart;
                    return restart_error();
                }
            }
            SessionState::NeedsRestart => return restart_error(),
        }

        // An AU size of 0 is a frame without renderable output (a pre-roll frame); it configures
        // the stream but queues nothing.
        if info.au_size == 0 {
            return Ok(());
        }

        if self.au_info.is_full() {
            return buffer_error("decoder (session): au info queue full");
        }

        // The frame's PCM only exists until the elementary decoder's next decode, so the room
        // check must precede acceptance; a partial accept would leave the queues skewed.
        if self.decoded.len() + info.au_size * info.num_channels > self.decoded.capacity() {
            return buffer_error("decoder (session): decoded sample queue full");
        }

        self.decoded.push_slice(self.dec.pcm())?;
        self.au_info.push_back(AuInfo {
            au_size: info.au_size,
            concealed: info.is_concealed,
            loudness: info.output_loudness,
        })?;

        self.last_au_duration =
            Some(frames_to_duration(info.au_size as u64, info.sample_rate));

        Ok(())
    }

    /// Promote the oldest AU to the output queue, reconciling its duration against the externally
    /// requested framing. Returns `true` if an AU was promoted.
    fn promote(&mut self, sample_rate: u32, num_channels: usize) -> Result<bool> {
        // Two queued timestamps are required: their difference is the requested duration.
        if self.timestamp_in.len() < 2 {
            return Ok(false);
        }

        let au = match self.au_info.front() {
            Some(au) => *au,
            None => return Ok(false),
        };

        // The AU's full decoded PCM must be present before it can be promoted.
        let needed = au.au_size * num_channels;
        if self.decoded.len() < needed {
            return Ok(false);
        }

        let ts0 = match self.timestamp_in.at(0) {
            Some(&ts) => ts,
            None => return Ok(false),
        };
        let ts1 = match self.timestamp_in.at(1) {
            Some(&ts) => ts,
            None => return Ok(false),
        };

        let target = duration_to_frames(ts1.saturating_sub(ts0), sample_rate) as usize;
        let diff = au.au_size as i64 - target as i64;
        let out_frames =
            if diff.unsigned_abs() <= DURATION_TOLERANCE { au.au_size } else { target };

        // A timestamp pair may span less than half a frame, rounding the requested duration to
        // zero. Nothing can be delivered for such an AU; consume it outright rather than queue an
        // empty output record that delivery could never pop.
        if out_frames == 0 {
            debug!("timestamp pair spans zero frames, discarding AU of {} frames", au.au_size);
            self.decoded.discard(needed);
            self.timestamp_in.pop_front();
            self.au_info.pop_front();
            return Ok(true);
        }

        if self.output_info.is_full() || self.timestamp_out.is_full() {
            return Ok(false);
        }
        if self.output.len() + out_frames * num_channels > self.output.capacity() {
            return Ok(false);
        }

        let base = self.output.len() as i64;
        let fade_len = (FADE_LEN_FRAMES * num_channels) as i64;

        // Fade across transitions between decoded and concealed signal.
        if au.concealed && !self.prev_concealed && base > 0 {
            self.schedule_fade(false, base - fade_len);
        }
        else if !au.concealed && self.prev_concealed {
            self.schedule_fade(true, base);
        }

        if diff.unsigned_abs() <= DURATION_TOLERANCE {
            self.transfer(needed)?;
        }
        else if au.au_size > target {
            debug!("trimming AU of {} frames to the requested {} frames", au.au_size, target);

            let kept = target * num_channels;
            self.transfer(kept)?;
            self.decoded.discard(needed - kept);

            // Ramp out into the cut and back in where the next frame begins.
            self.schedule_fade(false, base + kept as i64 - fade_len);
            self.schedule_fade(true, base + kept as i64);
        }
        else {
            debug!("padding AU of {} frames to the requested {} frames", au.au_size, target);

            self.transfer(needed)?;
            self.output.push_zeros((target - au.au_size) * num_channels)?;

            // Ramp out into the injected silence and back in where the next frame begins.
            self.schedule_fade(false, base + needed as i64 - fade_len);
            self.schedule_fade(true, base + (target * num_channels) as i64);
        }

        self.timestamp_in.pop_front();
        self.timestamp_out.push_back(ts0)?;
        self.output_info.push_back(PendingOutput {
            size: out_frames * num_channels,
            concealed: au.concealed,
            loudness: au.loudness,
        })?;
        self.au_info.pop_front();

        self.prev_concealed = au.concealed;

        Ok(true)
    }

    /// Move `count` samples from the decoded queue to the output queue.
    fn transfer(&mut self, count: usize) -> Result<()> {
        let mut chunk = [0.0f32; 512];
        let mut left = count;

        while left > 0 {
            let n = left.min(chunk.len());
            let got = self.decoded.pop_into(&mut chunk[..n]);
            if got == 0 {
                return buffer_error("decoder (session): decoded sample queue under-ran");
            }
            self.output.push_slice(&chunk[..got])?;
            left -= got;
        }

        Ok(())
    }

    /// Schedule a fade event at `idx` interleaved samples from the front of the output queue.
    fn schedule_fade(&mut self, fade_in: bool, idx: i64) {
        // A negative index reaches into samples already delivered; the event cannot be served.
        if idx < 0 {
            return;
        }

        let queue = if fade_in { &mut self.fade_in_idx } else { &mut self.fade_out_idx };
        if queue.push_back(idx).is_err() {
            warn!("fade queue full, dropping a fade event");
        }
    }

    /// Apply every scheduled fade whose full ramp is present in the output queue.
    fn apply_ready_fades(&mut self, num_channels: usize) {
        let fade_len = FADE_LEN_FRAMES * num_channels;

        while let Some(&idx) = self.fade_in_idx.front() {
            if idx < 0 {
                self.fade_in_idx.pop_front();
                continue;
            }
            if idx as usize + fade_len > self.output.len() {
                break;
            }
            fade::fade_in(self.output.range_mut(idx as usize, fade_len), num_channels);
            self.fade_in_idx.pop_front();
        }

        while let Some(&idx) = self.fade_out_idx.front() {
            if idx < 0 {
                self.fade_out_idx.pop_front();
                continue;
            }
            if idx as usize + fade_len > self.output.len() {
                break;
            }
            fade::fade_out(self.output.range_mut(idx as usize, fade_len), num_channels);
            self.fade_out_idx.pop_front();
        }
    }

    /// Shift all pending fade events down by the number of delivered samples, dropping events
    /// that fell behind the delivery point.
    fn retire_fades(&mut self, delivered: i64) {
        for idx in self.fade_in_idx.iter_mut() {
            *idx -= delivered;
        }
        for idx in self.fade_out_idx.iter_mut() {
            *idx -= delivered;
        }

        while matches!(self.fade_in_idx.front(), Some(&idx) if idx < 0) {
            self.fade_in_idx.pop_front();
        }
        while matches!(self.fade_out_idx.front(), Some(&idx) if idx < 0) {
            self.fade_out_idx.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use euphonia_core::drc::{DrcParam, DrcParams};
    use euphonia_core::elementary::{DecodeStep, ElementaryDecoder, StreamInfo};
    use euphonia_core::errors::{Error, Result};

    use super::{MpeghDecoder, Outcome};

    #[derive(Clone)]
    struct MockFrame {
        au_size: usize,
        sample_rate: u32,
        num_channels: usize,
        concealed: bool,
        value: f32,
    }

    fn frame(value: f32) -> MockFrame {
        MockFrame { au_size: 1024, sample_rate: 48_000, num_channels: 2, concealed: false, value }
    }

    #[derive(Default)]
    struct MockInner {
        /// Frames decodable right away.
        pending: VecDeque<MockFrame>,
        /// Frames held as lookahead until `flush`.
        lookahead: VecDeque<MockFrame>,
        applied_drc: Option<DrcParams>,
        resets: usize,
        layout: Option<u8>,
    }

    struct MockDecoder {
        inner: Arc<Mutex<MockInner>>,
        pcm: Vec<f32>,
        info: Option<StreamInfo>,
        last: Option<MockFrame>,
    }

    impl ElementaryDecoder for MockDecoder {
        fn fill(&mut self, _buf: &[u8]) -> Result<()> {
            Ok(())
        }

        fn decode_frame(&mut self, conceal: bool) -> Result<DecodeStep> {
            let next = self.inner.lock().unwrap().pending.pop_front();

            let frame = match next {
                Some(frame) => frame,
                None if conceal => match &self.last {
                    Some(last) => {
                        let mut frame = last.clone();
                        frame.concealed = true;
                        frame.value = 0.0;
                        frame
                    }
                    None => return Ok(DecodeStep::NeedMoreData),
                },
                None => return Ok(DecodeStep::NeedMoreData),
            };

            self.pcm = vec![frame.value; frame.au_size * frame.num_channels];
            self.info = Some(StreamInfo {
                sample_rate: frame.sample_rate,
                num_channels: frame.num_channels,
                au_size: frame.au_size,
                output_loudness: -1,
                is_concealed: frame.concealed,
            });
            self.last = Some(frame);

            Ok(DecodeStep::Frame)
        }

        fn pcm(&self) -> &[f32] {
            &self.pcm
        }

        fn stream_info(&self) -> Option<&StreamInfo> {
            self.info.as_ref()
        }

        fn set_target_layout(&mut self, cicp: u8) -> Result<()> {
            self.inner.lock().unwrap().layout = Some(cicp);
            Ok(())
        }

        fn apply_drc(&mut self, params: &DrcParams) -> Result<()> {
            self.inner.lock().unwrap().applied_drc = Some(params.clone());
            Ok(())
        }

        fn reset(&mut self, _config: Option<&[u8]>) -> Result<()> {
            let mut inner = self.inner.lock().unwrap();
            inner.pending.clear();
            inner.lookahead.clear();
            inner.resets += 1;
            drop(inner);

            self.pcm.clear();
            self.info = None;
            self.last = None;
            Ok(())
        }

        fn flush(&mut self) {
            let mut inner = self.inner.lock().unwrap();
            while let Some(frame) = inner.lookahead.pop_front() {
                inner.pending.push_back(frame);
            }
        }
    }

    fn new_session() -> (MpeghDecoder, Arc<Mutex<MockInner>>) {
        let inner = Arc::new(Mutex::new(MockInner::default()));
        let dec = Box::new(MockDecoder {
            inner: inner.clone(),
            pcm: Vec::new(),
            info: None,
            last: None,
        });
        (MpeghDecoder::new(dec, 6).unwrap(), inner)
    }

    fn queue_frame(inner: &Arc<Mutex<MockInner>>, frame: MockFrame) {
        inner.lock().unwrap().pending.push_back(frame);
    }

    /// Timestamp of the i-th AU on a 1024-frame 48 kHz rhythm.
    fn rhythm_ts(i: u64) -> u64 {
        i * 1_000_000_000 * 1024 / 48_000
    }

    #[test]
    fn verify_steady_rhythm_yields_full_frames() {
        let (mut session, inner) = new_session();

        for i in 0..3 {
            queue_frame(&inner, frame(0.5));
            session.process(&[0u8; 16], rhythm_ts(i)).unwrap();
        }

        let mut out = vec![0.0f32; 2048];

        // Two AUs have both bounding timestamps; the third needs the drain extrapolation.
        for i in 0..2 {
            match session.get_samples(&mut out).unwrap() {
                Outcome::Ready(info) => {
                    assert_eq!(info.num_samples_per_channel, 1024);
                    assert_eq!(info.num_channels, 2);
                    assert_eq!(info.sample_rate, 48_000);
                    assert_eq!(info.pts, rhythm_ts(i));
                    assert!(!info.is_concealed);
                }
                Outcome::NeedMoreData => panic!("expected samples for AU {}", i),
            }
            // No fade was scheduled, so every sample is untouched.
            assert!(out.iter().all(|&x| x == 0.5));
        }

        assert!(matches!(session.get_samples(&mut out).unwrap(), Outcome::NeedMoreData));

        session.drain().unwrap();
        match session.get_samples(&mut out).unwrap() {
            Outcome::Ready(info) => {
                assert_eq!(info.num_samples_per_channel, 1024);
                assert_eq!(info.pts, rhythm_ts(2));
            }
            Outcome::NeedMoreData => panic!("expected the drained trailing AU"),
        }
    }

    #[test]
    fn verify_input_gap_restarts_session() {
        let (mut session, inner) = new_session();

        queue_frame(&inner, frame(0.5));
        session.process(&[0u8; 16], 0).unwrap();
        assert_eq!(session.sample_rate(), Some(48_000));
        assert_eq!(session.num_channels(), Some(2));

        // The second AU arrives 300 ms later: past the 200 ms gap threshold. The restart drops
        // the elementary decoder's buffered data, so nothing decodes and the session is
        // unconfigured again.
        let resets_before = inner.lock().unwrap().resets;
        queue_frame(&inner, frame(0.5));
        session.process(&[0u8; 16], 300_000_000).unwrap();

        assert_eq!(inner.lock().unwrap().resets, resets_before + 1);
        assert_eq!(session.sample_rate(), None);
        assert_eq!(session.num_channels(), None);
    }

    #[test]
    fn verify_small_gap_does_not_restart() {
        let (mut session, inner) = new_session();

        queue_frame(&inner, frame(0.5));
        session.process(&[0u8; 16], 0).unwrap();

        let resets_before = inner.lock().unwrap().resets;
        queue_frame(&inner, frame(0.5));
        session.process(&[0u8; 16], 150_000_000).unwrap();

        assert_eq!(inner.lock().unwrap().resets, resets_before);
        assert_eq!(session.sample_rate(), Some(48_000));
    }

    #[test]
    fn verify_long_au_is_trimmed_with_fade() {
        let (mut session, inner) = new_session();

        // The decoder reports 1024-frame AUs but the external rhythm requests 1000 frames
        // (20833333 ns at 48 kHz): outside the tolerance, so the tail is trimmed and a fade-out
        // covers the cut.
        queue_frame(&inner, frame(0.5));
        session.process(&[0u8; 16], 0).unwrap();
        queue_frame(&inner, frame(0.5));
        session.process(&[0u8; 16], 20_833_333).unwrap();

        let mut out = vec![0.0f32; 2048];
        match session.get_samples(&mut out).unwrap() {
            Outcome::Ready(info) => {
                assert_eq!(info.num_samples_per_channel, 1000);

                // The head of the frame is untouched; the splice is faded to silence.
                assert_eq!(out[0], 0.5);
                assert_eq!(out[1999], 0.0);
                assert!(out[1990] < 0.5);
            }
            Outcome::NeedMoreData => panic!("expected a trimmed frame"),
        }
    }

    #[test]
    fn verify_short_au_is_padded_with_fade() {
        let (mut session, inner) = new_session();

        let mut short = frame(0.5);
        short.au_size = 990;

        queue_frame(&inner, short.clone());
        session.process(&[0u8; 16], 0).unwrap();
        queue_frame(&inner, short);
        session.process(&[0u8; 16], 20_833_333).unwrap();

        let mut out = vec![0.0f32; 2048];
        match session.get_samples(&mut out).unwrap() {
            Outcome::Ready(info) => {
                assert_eq!(info.num_samples_per_channel, 1000);

                // The padding is silence and the real signal fades into it.
                assert_eq!(out[0], 0.5);
                assert_eq!(out[1999], 0.0);
                assert_eq!(out[1979], 0.0);
            }
            Outcome::NeedMoreData => panic!("expected a padded frame"),
        }
    }

    #[test]
    fn verify_configuration_drift_needs_restart() {
        let (mut session, inner) = new_session();

        queue_frame(&inner, frame(0.5));
        let mut drifted = frame(0.5);
        drifted.sample_rate = 44_100;
        queue_frame(&inner, drifted);

        match session.process(&[0u8; 16], 0) {
            Err(Error::NeedsRestart) => (),
            other => panic!("expected NeedsRestart, got {:?}", other.map(|_| ())),
        }

        // Every operation except flush is rejected until the session is restarted.
        assert!(matches!(session.process(&[0u8; 16], rhythm_ts(1)), Err(Error::NeedsRestart)));
        let mut out = vec![0.0f32; 64];
        assert!(matches!(session.get_samples(&mut out), Err(Error::NeedsRestart)));

        session.flush().unwrap();
        assert_eq!(session.sample_rate(), None);
    }

    #[test]
    fn verify_flush_is_idempotent() {
        let (mut session, inner) = new_session();

        queue_frame(&inner, frame(0.5));
        session.process(&[0u8; 16], 0).unwrap();

        session.flush().unwrap();
        session.flush().unwrap();

        assert_eq!(session.sample_rate(), None);
        assert_eq!(session.num_channels(), None);

        let mut out = vec![0.0f32; 64];
        assert!(matches!(session.get_samples(&mut out).unwrap(), Outcome::NeedMoreData));
    }

    #[test]
    fn verify_rejected_param_keeps_previous_value() {
        let (mut session, inner) = new_session();

        session.set_param(DrcParam::TargetReferenceLevel, 100).unwrap();

        // 39 is below the valid range; the stored 100 must survive.
        assert!(matches!(
            session.set_param(DrcParam::TargetReferenceLevel, 39),
            Err(Error::UnsupportedParam(_))
        ));

        queue_frame(&inner, frame(0.5));
        session.process(&[0u8; 16], 0).unwrap();

        let applied = inner.lock().unwrap().applied_drc.clone().unwrap();
        assert_eq!(applied.target_reference_level, Some(100));
    }

    #[test]
    fn verify_drc_reapplied_after_restart() {
        let (mut session, inner) = new_session();

        session.set_param(DrcParam::BoostFactor, 64).unwrap();
        queue_frame(&inner, frame(0.5));
        session.process(&[0u8; 16], 0).unwrap();

        inner.lock().unwrap().applied_drc = None;
        session.flush().unwrap();

        let applied = inner.lock().unwrap().applied_drc.clone().unwrap();
        assert_eq!(applied.boost_factor, Some(64));
    }

    #[test]
    fn verify_large_frame_splits_across_calls() {
        let (mut session, inner) = new_session();

        queue_frame(&inner, frame(0.5));
        session.process(&[0u8; 16], 0).unwrap();
        queue_frame(&inner, frame(0.5));
        session.process(&[0u8; 16], rhythm_ts(1)).unwrap();

        // An output buffer of 500 frames forces the 1024-frame logical frame to split.
        let mut out = vec![0.0f32; 1000];
        match session.get_samples(&mut out).unwrap() {
            Outcome::Ready(info) => {
                assert_eq!(info.num_samples_per_channel, 500);
                assert_eq!(info.pts, 0);
            }
            Outcome::NeedMoreData => panic!("expected the frame head"),
        }

        // The continuation carries the advanced timestamp.
        let mut out = vec![0.0f32; 4096];
        match session.get_samples(&mut out).unwrap() {
            Outcome::Ready(info) => {
                assert_eq!(info.num_samples_per_channel, 524);
                // 500 frames at 48 kHz, rounded to the nearest nanosecond.
                assert_eq!(info.pts, 10_416_667);
            }
            Outcome::NeedMoreData => panic!("expected the frame tail"),
        }
    }

    #[test]
    fn verify_lookahead_drained_at_end_of_stream() {
        let (mut session, inner) = new_session();

        queue_frame(&inner, frame(0.5));
        session.process(&[0u8; 16], 0).unwrap();
        queue_frame(&inner, frame(0.5));
        session.process(&[0u8; 16], rhythm_ts(1)).unwrap();

        // One more AU is stuck in the decoder's lookahead.
        inner.lock().unwrap().lookahead.push_back(frame(0.25));
        session.drain().unwrap();

        let mut out = vec![0.0f32; 2048];
        let mut delivered = 0;
        while let Outcome::Ready(info) = session.get_samples(&mut out).unwrap() {
            delivered += info.num_samples_per_channel;
        }

        assert_eq!(delivered, 3 * 1024);
    }

    #[test]
    fn verify_zero_duration_pair_is_skipped() {
        let (mut session, inner) = new_session();

        // Two timestamps only 100 ns apart: the requested duration rounds to zero frames, so
        // the AU they bound has no deliverable output. It must be consumed, not left wedged at
        // the head of the output queue.
        queue_frame(&inner, frame(0.25));
        session.process(&[0u8; 16], 0).unwrap();
        queue_frame(&inner, frame(0.5));
        session.process(&[0u8; 16], 100).unwrap();
        queue_frame(&inner, frame(0.5));
        session.process(&[0u8; 16], 100 + 21_333_333).unwrap();

        let mut out = vec![0.0f32; 2048];
        match session.get_samples(&mut out).unwrap() {
            Outcome::Ready(info) => {
                // The zero-duration AU was discarded; delivery resumes with the next one.
                assert_eq!(info.num_samples_per_channel, 1024);
                assert_eq!(info.pts, 100);
                assert!(out.iter().all(|&x| x == 0.5));
            }
            Outcome::NeedMoreData => panic!("session wedged behind a zero-duration AU"),
        }

        session.drain().unwrap();
        assert!(matches!(session.get_samples(&mut out).unwrap(), Outcome::Ready(_)));
    }

    #[test]
    fn verify_decoded_queue_overflow_is_recoverable() {
        let (mut session, inner) = new_session();

        let big = MockFrame {
            au_size: 3072,
            sample_rate: 48_000,
            num_channels: 24,
            concealed: false,
            value: 0.5,
        };
        // 3072 frames at 48 kHz.
        let dur = 64_000_000u64;

        queue_frame(&inner, big.clone());
        session.process(&[0u8; 16], 0).unwrap();
        queue_frame(&inner, big.clone());
        session.process(&[0u8; 16], dur).unwrap();

        // The decoded queue holds exactly two AUs of this size; a third must be rejected.
        queue_frame(&inner, big.clone());
        match session.process(&[0u8; 16], 2 * dur) {
            Err(Error::BufferError(_)) => (),
            other => panic!("expected BufferError, got {:?}", other.map(|_| ())),
        }

        // The rejected AU's timestamp was dropped with it, so the pairing is intact: delivering
        // one AU frees room and the retried AU reconciles to a full frame.
        let mut out = vec![0.0f32; 3072 * 24];
        match session.get_samples(&mut out).unwrap() {
            Outcome::Ready(info) => {
                assert_eq!(info.num_samples_per_channel, 3072);
                assert_eq!(info.pts, 0);
            }
            Outcome::NeedMoreData => panic!("expected the first AU"),
        }

        queue_frame(&inner, big);
        session.process(&[0u8; 16], 2 * dur).unwrap();
        session.drain().unwrap();

        match session.get_samples(&mut out).unwrap() {
            Outcome::Ready(info) => {
                assert_eq!(info.num_samples_per_channel, 3072);
                assert_eq!(info.pts, dur);
            }
            Outcome::NeedMoreData => panic!("expected the second AU"),
        }
    }
}
