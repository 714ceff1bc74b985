//! One sample-playback voice.
//!
//! A voice reads its zone with linear interpolation at a pitch-dependent
//! increment, shapes it with the amplitude envelope, optionally runs it
//! through a low-pass whose cutoff follows the filter envelope, and
//! accumulates the result into the sampler's chunk buffers.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle → Attack → Decay → Sustain → Release → Idle
//!            \________________________/
//!                 declick fade → Idle (immediate stop)
//!                 declick fade → pending note starts (steal / retrigger)
//! ```
//!
//! The voice reports the amplitude envelope's stage. The filter envelope
//! receives the same events and is reset whenever the amplitude envelope
//! goes idle, so the two are never out of step on Idle.

use strata_dsp::{LinearRamp, StateVariableFilter, flush_denormal, lerp};

use crate::CHUNK_SIZE;
use crate::bank::{SampleZone, ZoneId};
use crate::envelope::{AdsrEnvelope, AdsrParams, EnvelopeState};

/// Lowest cutoff the voice filter is driven to.
pub const MIN_CUTOFF_HZ: f32 = 20.0;

/// Largest base playback increment, in zone frames per output sample.
const MAX_INCREMENT: f64 = 1024.0;

/// Per-chunk values shared by every voice in one render call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ChunkContext<'a> {
    pub amp_params: &'a AdsrParams,
    pub filter_params: &'a AdsrParams,
    /// Vibrato and transpose combined into one frequency ratio.
    pub pitch_ratio: f64,
    pub master_volume: f32,
    pub filter_enabled: bool,
    pub cutoff_multiple: f32,
    pub cutoff_envelope_strength: f32,
    pub damping: f32,
    pub max_cutoff: f32,
}

/// Note waiting for the declick fade to finish before it starts.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PendingNote {
    pub note: u8,
    pub velocity: u8,
    pub frequency: f32,
    pub zone: ZoneId,
    /// Note-off arrived before the note started.
    pub released: bool,
}

/// A single voice of the sampler's fixed pool.
#[derive(Debug, Clone)]
pub struct SamplerVoice {
    note: u8,
    velocity: u8,
    frequency: f32,
    zone: Option<ZoneId>,

    // Playback, in frames of the zone
    position: f64,
    base_increment: f64,
    looping: bool,
    loop_start: f64,
    loop_end: f64,
    end_frame: f64,
    stereo: bool,

    amp_env: AdsrEnvelope,
    filter_env: AdsrEnvelope,
    filter_left: StateVariableFilter,
    filter_right: StateVariableFilter,

    declick: LinearRamp,
    stopping: bool,
    pending: Option<PendingNote>,

    trigger_order: u64,
    sustained: bool,
    output_sample_rate: f32,
}

impl SamplerVoice {
    /// Create an idle voice.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            note: 0,
            velocity: 0,
            frequency: 0.0,
            zone: None,
            position: 0.0,
            base_increment: 1.0,
            looping: false,
            loop_start: 0.0,
            loop_end: 0.0,
            end_frame: 0.0,
            stereo: false,
            amp_env: AdsrEnvelope::new(),
            filter_env: AdsrEnvelope::new(),
            filter_left: StateVariableFilter::new(sample_rate),
            filter_right: StateVariableFilter::new(sample_rate),
            declick: LinearRamp::new(LinearRamp::length_for(5.0, sample_rate)),
            stopping: false,
            pending: None,
            trigger_order: 0,
            sustained: false,
            output_sample_rate: sample_rate,
        }
    }

    /// Note number the voice is bound to. Meaningless while inactive.
    pub fn note(&self) -> u8 {
        self.note
    }

    /// Velocity of the bound note.
    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    /// Amplitude envelope stage.
    pub fn state(&self) -> EnvelopeState {
        self.amp_env.state()
    }

    /// Amplitude envelope level.
    pub fn amp_level(&self) -> f32 {
        self.amp_env.level()
    }

    /// Filter envelope stage.
    pub fn filter_state(&self) -> EnvelopeState {
        self.filter_env.state()
    }

    /// Playback position in zone frames.
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Trigger stamp of the bound note; larger is newer.
    pub fn trigger_order(&self) -> u64 {
        self.trigger_order
    }

    /// Whether the note was released while the pedal was down.
    pub fn is_sustained(&self) -> bool {
        self.sustained
    }

    /// Whether a declick fade is running.
    pub fn is_stopping(&self) -> bool {
        self.stopping
    }

    /// Whether playback currently wraps at the loop end.
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Whether the voice sounds or is about to.
    pub fn is_active(&self) -> bool {
        self.amp_env.is_active() || self.stopping || self.pending.is_some()
    }

    /// Bound to a note whose key is still down: neither released, sustained
    /// nor fading out.
    pub fn is_held(&self) -> bool {
        if self.sustained {
            return false;
        }
        match &self.pending {
            Some(pending) => !pending.released,
            None => {
                !self.stopping
                    && self.amp_env.is_active()
                    && self.amp_env.state() != EnvelopeState::Release
            }
        }
    }

    /// On its way out: in Release or fading without a note to follow.
    pub fn is_releasing(&self) -> bool {
        self.pending.is_none()
            && (self.stopping || self.amp_env.state() == EnvelopeState::Release)
    }

    /// Loudness used to pick the quietest releasing voice.
    pub(crate) fn steal_level(&self) -> f32 {
        self.amp_env.level() * self.declick.get()
    }

    pub(crate) fn zone_id(&self) -> Option<ZoneId> {
        self.zone
    }

    pub(crate) fn set_sustained(&mut self, sustained: bool) {
        self.sustained = sustained;
    }

    pub(crate) fn set_sample_rate(&mut self, sample_rate: f32) {
        self.output_sample_rate = sample_rate;
        self.filter_left.set_sample_rate(sample_rate);
        self.filter_right.set_sample_rate(sample_rate);
    }

    pub(crate) fn set_declick_length(&mut self, samples: u32) {
        self.declick.set_length(samples);
    }

    /// Begin a note now, from silence.
    pub(crate) fn start(
        &mut self,
        pending: PendingNote,
        zone: &SampleZone,
        trigger_order: u64,
        loop_thru_release: bool,
    ) {
        self.note = pending.note;
        self.velocity = pending.velocity;
        self.frequency = if pending.frequency.is_nan() {
            zone.root_frequency()
        } else {
            pending.frequency
        };
        self.zone = Some(pending.zone);
        self.trigger_order = trigger_order;
        self.stopping = false;
        self.pending = None;
        self.declick.set_immediate(1.0);

        self.position = 0.0;
        self.base_increment = playback_increment(pending.frequency, zone, self.output_sample_rate);
        self.stereo = zone.channel_count() == 2;
        self.looping = zone.is_looping();
        self.loop_start = zone.loop_start() as f64;
        self.loop_end = zone.loop_end() as f64;
        self.end_frame = zone.frame_count() as f64;

        self.filter_left.reset();
        self.filter_right.reset();
        self.amp_env.reset();
        self.filter_env.reset();
        self.amp_env.start();
        self.filter_env.start();

        if pending.released {
            self.release(loop_thru_release);
        }
    }

    /// Fade out whatever is sounding, then start `pending`.
    ///
    /// The voice is bound to the new note immediately.
    pub(crate) fn restart(&mut self, pending: PendingNote, trigger_order: u64) {
        self.note = pending.note;
        self.velocity = pending.velocity;
        self.trigger_order = trigger_order;
        self.sustained = false;
        self.pending = Some(pending);
        self.begin_fade();
    }

    /// Note-off: both envelopes enter Release.
    ///
    /// A looping voice stops looping unless `loop_thru_release` is set and
    /// then ends on reaching the loop end.
    pub(crate) fn release(&mut self, loop_thru_release: bool) {
        if let Some(pending) = &mut self.pending {
            pending.released = true;
            return;
        }
        self.amp_env.release();
        self.filter_env.release();
        if self.looping && !loop_thru_release {
            self.looping = false;
            self.end_frame = self.loop_end;
        }
    }

    /// Silence through the declick fade, dropping any pending note.
    pub(crate) fn stop_immediately(&mut self) {
        if !self.is_active() {
            return;
        }
        self.pending = None;
        self.sustained = false;
        if self.amp_env.is_active() {
            self.begin_fade();
        } else {
            self.finish();
        }
    }

    /// Hard reset to Idle without fading. Reads no sample data.
    pub(crate) fn kill(&mut self) {
        self.pending = None;
        self.finish();
        self.position = 0.0;
        self.filter_left.reset();
        self.filter_right.reset();
    }

    /// Pending note whose fade has finished and which can start now.
    pub(crate) fn take_ready_pending(&mut self) -> Option<PendingNote> {
        if self.amp_env.is_active() || self.stopping {
            return None;
        }
        self.pending.take()
    }

    fn begin_fade(&mut self) {
        if !self.amp_env.is_active() {
            // Nothing audible to fade
            self.stopping = false;
            self.declick.set_immediate(1.0);
            return;
        }
        if !self.stopping {
            self.stopping = true;
            self.declick.start(self.declick.get(), 0.0);
        }
    }

    fn finish(&mut self) {
        self.amp_env.reset();
        self.filter_env.reset();
        self.zone = None;
        self.stopping = false;
        if self.pending.is_none() {
            self.sustained = false;
        }
        self.looping = false;
        self.declick.set_immediate(1.0);
    }

    /// Render up to [`CHUNK_SIZE`] frames, adding into `left`/`right`.
    ///
    /// Cutoff and pitch are fixed for the chunk. A voice that finishes
    /// partway through contributes nothing for the rest of the chunk.
    pub(crate) fn render_chunk(
        &mut self,
        zone: Option<&SampleZone>,
        ctx: &ChunkContext<'_>,
        left: &mut [f32; CHUNK_SIZE],
        right: &mut [f32; CHUNK_SIZE],
        frames: usize,
    ) {
        if !self.amp_env.is_active() {
            return;
        }
        let Some(zone) = zone else {
            self.finish();
            return;
        };

        let increment = self.base_increment * ctx.pitch_ratio;

        if ctx.filter_enabled {
            let env = self.filter_env.level();
            let cutoff = self.frequency
                * ctx.cutoff_multiple
                * (1.0 + ctx.cutoff_envelope_strength * env);
            let cutoff = cutoff.clamp(MIN_CUTOFF_HZ, ctx.max_cutoff.max(MIN_CUTOFF_HZ));
            self.filter_left.set_params(cutoff, ctx.damping);
            self.filter_right.set_params(cutoff, ctx.damping);
        }

        let gain = f32::from(self.velocity) / 127.0 * ctx.master_volume;
        let loop_len = self.loop_end - self.loop_start;

        for i in 0..frames.min(CHUNK_SIZE) {
            let amp = self.amp_env.next_sample(ctx.amp_params);
            self.filter_env.next_sample(ctx.filter_params);
            let declick = self.declick.advance();

            let (mut l, mut r) = self.read_frame(zone);
            if ctx.filter_enabled {
                l = flush_denormal(self.filter_left.process(l));
                r = if self.stereo {
                    flush_denormal(self.filter_right.process(r))
                } else {
                    l
                };
            }

            let g = gain * amp * declick;
            left[i] += l * g;
            right[i] += r * g;

            self.position += increment;
            if self.looping {
                if self.position >= self.loop_end {
                    self.position = self.loop_start + (self.position - self.loop_start) % loop_len;
                }
            } else if self.position >= self.end_frame {
                self.position = self.end_frame;
                self.finish();
                return;
            }

            if !self.amp_env.is_active() {
                self.finish();
                return;
            }
            if self.stopping && self.declick.is_settled() {
                self.finish();
                return;
            }
        }
    }

    #[inline]
    fn read_frame(&self, zone: &SampleZone) -> (f32, f32) {
        let index = self.position as usize;
        let frac = (self.position - index as f64) as f32;
        let mut next = index + 1;
        if self.looping && next as f64 >= self.loop_end {
            next = self.loop_start as usize;
        }
        let (l0, r0) = zone.frame(index);
        let (l1, r1) = zone.frame(next);
        (lerp(l0, l1, frac), lerp(r0, r1, frac))
    }
}

/// Frames advanced per output sample before vibrato and transpose, capped at
/// [`MAX_INCREMENT`].
fn playback_increment(frequency: f32, zone: &SampleZone, output_sample_rate: f32) -> f64 {
    let pitch = if zone.root_frequency() > 0.0 && frequency > 0.0 {
        f64::from(frequency) / f64::from(zone.root_frequency())
    } else {
        1.0
    };
    let rate = if zone.sample_rate() > 0.0 && output_sample_rate > 0.0 {
        f64::from(zone.sample_rate()) / f64::from(output_sample_rate)
    } else {
        1.0
    };
    (pitch * rate).min(MAX_INCREMENT)
}
