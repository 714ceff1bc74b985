//! Polyphonic sampler: voice pool, allocation and rendering.
//!
//! [`Sampler`] owns a fixed array of [`SamplerVoice`]s, one vibrato LFO and
//! one [`SustainPedalLogic`]. The render thread owns the sampler itself;
//! other threads talk to it through a [`SamplerHandle`].
//!
//! ## Voice allocation
//!
//! A note-on picks its voice in this order:
//!
//! 1. A voice already holding the same note with its key down (retrigger).
//! 2. A voice releasing the same note.
//! 3. The first idle voice.
//! 4. The quietest voice in Release (older trigger wins ties).
//! 5. The voice with the oldest trigger.
//!
//! A voice that is still audible when it is reassigned fades out over the
//! declick ramp first; the new note starts when the fade ends.
//!
//! ## Rendering
//!
//! [`Sampler::render`] works in sub-blocks of [`CHUNK_SIZE`] samples. Per
//! sub-block it reads the vibrato LFO once, and each active voice recomputes
//! its pitch increment and filter cutoff once; envelopes, interpolation and
//! filtering run per sample.

use std::sync::Arc;

use strata_dsp::{FunctionTable, FunctionTableOscillator, LinearRamp, semitones_to_ratio};

use crate::bank::{SampleBank, ZoneMap};
use crate::config::{EnvelopeConfig, SamplerConfig};
use crate::envelope::AdsrParams;
use crate::error::SamplerError;
use crate::params::{SamplerParam, SamplerParams};
use crate::pedal::{KeyRelease, SustainPedalLogic};
use crate::shared::{NoteCommand, SamplerHandle, SharedState};
use crate::voice::{ChunkContext, PendingNote, SamplerVoice};
use crate::{CHUNK_SIZE, MAX_POLYPHONY};

/// Highest fraction of the sample rate the filter cutoff may reach.
const MAX_CUTOFF_RATIO: f32 = 0.49;

/// Vibrato LFO table length.
const VIBRATO_TABLE_SIZE: usize = 256;

/// Polyphonic sample-playback engine.
///
/// `VOICES` fixes the pool size at compile time; the pool never grows.
///
/// ```rust
/// use strata_sampler::{Sampler, SampleZone, ZoneMap};
///
/// let mut sampler: Sampler = Sampler::new(44100.0).unwrap();
/// sampler.set_bank(ZoneMap::single(SampleZone::mono(vec![0.25; 44100], 44100.0, 261.6)));
///
/// sampler.play_note(60, 100, 261.6);
/// let mut out = vec![0.0f32; 256];
/// sampler.render(&mut [&mut out[..]], 256);
/// assert!(out.iter().any(|&s| s != 0.0));
/// ```
pub struct Sampler<B: SampleBank = ZoneMap, const VOICES: usize = MAX_POLYPHONY> {
    sample_rate: f32,
    initialized: bool,
    voices: [SamplerVoice; VOICES],
    pedal: SustainPedalLogic,
    vibrato: FunctionTableOscillator,
    amp_params: AdsrParams,
    filter_params: AdsrParams,
    params: SamplerParams,
    shared: Arc<SharedState<B>>,
    trigger_counter: u64,
    seen_generation: u64,
}

impl<B: SampleBank, const VOICES: usize> Sampler<B, VOICES> {
    /// Create and initialize a sampler.
    ///
    /// # Errors
    ///
    /// Returns [`SamplerError::InvalidSampleRate`] if `sample_rate` is not a
    /// positive finite number.
    pub fn new(sample_rate: f32) -> Result<Self, SamplerError> {
        validate_sample_rate(sample_rate)?;
        let params = SamplerParams::default();
        let mut sampler = Self {
            sample_rate,
            initialized: false,
            voices: core::array::from_fn(|_| SamplerVoice::new(sample_rate)),
            pedal: SustainPedalLogic::new(),
            vibrato: FunctionTableOscillator::new(
                FunctionTable::sinusoid(VIBRATO_TABLE_SIZE),
                sample_rate / CHUNK_SIZE as f32,
                params.vibrato_rate,
            ),
            amp_params: params.amp_envelope.to_params(sample_rate),
            filter_params: params.filter_envelope.to_params(sample_rate),
            params,
            shared: Arc::new(SharedState::new()),
            trigger_counter: 0,
            seen_generation: 0,
        };
        sampler.init(sample_rate)?;
        Ok(sampler)
    }

    /// (Re)initialize at a sample rate. All voices go idle.
    ///
    /// # Errors
    ///
    /// Returns [`SamplerError::InvalidSampleRate`] if `sample_rate` is not a
    /// positive finite number; the sampler is left unchanged.
    pub fn init(&mut self, sample_rate: f32) -> Result<(), SamplerError> {
        validate_sample_rate(sample_rate)?;
        self.sample_rate = sample_rate;
        for voice in &mut self.voices {
            voice.kill();
            voice.set_sample_rate(sample_rate);
        }
        self.pedal.reset();
        self.vibrato.set_sample_rate(sample_rate / CHUNK_SIZE as f32);
        self.vibrato.reset();
        self.seen_generation = self.shared.generation();
        self.params = self.shared.params.snapshot();
        self.apply_params();
        self.initialized = true;
        tracing::info!(sample_rate, voices = VOICES, "sampler initialized");
        Ok(())
    }

    /// Silence everything and drop the sample bank. Render outputs silence
    /// until [`init`](Self::init) is called again.
    pub fn deinit(&mut self) {
        for voice in &mut self.voices {
            voice.kill();
        }
        self.pedal.reset();
        self.shared.commands.lock().clear();
        self.shared.clear_bank();
        self.initialized = false;
        tracing::info!("sampler deinitialized");
    }

    /// Control-path handle for other threads.
    pub fn handle(&self) -> SamplerHandle<B> {
        SamplerHandle::new(Arc::clone(&self.shared))
    }

    /// Output sample rate.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Whether [`init`](Self::init) has succeeded since the last
    /// [`deinit`](Self::deinit).
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    // -- Bank -----------------------------------------------------------------

    /// Publish a new sample bank.
    pub fn set_bank(&mut self, bank: B) {
        self.set_bank_arc(Arc::new(bank));
    }

    /// Publish an already shared sample bank.
    pub fn set_bank_arc(&mut self, bank: Arc<B>) {
        self.shared.set_bank(bank);
    }

    /// Drop the sample bank. Voices still referring to it go silent.
    pub fn clear_bank(&mut self) {
        self.shared.clear_bank();
    }

    /// Current sample bank.
    pub fn bank(&self) -> Option<Arc<B>> {
        self.shared.bank.load_full()
    }

    // -- Note events ------------------------------------------------------------

    /// Start a note.
    ///
    /// Silently ignored while quiescent, for notes above 127, and when the
    /// bank has no zone for the note and velocity.
    pub fn play_note(&mut self, note: u8, velocity: u8, frequency: f32) {
        if !self.initialized || self.shared.is_stopping() {
            return;
        }
        self.sync_generation();
        let shared = Arc::clone(&self.shared);
        let bank = shared.bank.load();
        self.note_on(bank.as_deref(), note, velocity, frequency);
    }

    /// Stop a note.
    ///
    /// With `immediate`, every voice bound to the note fades out over the
    /// declick ramp. Otherwise the newest held voice for the note is released,
    /// or kept sounding as sustained if the pedal is down.
    pub fn stop_note(&mut self, note: u8, immediate: bool) {
        self.sync_generation();
        self.note_off(note, immediate);
    }

    /// Sustain pedal down/up. Pedal-up releases every sustained voice.
    pub fn sustain_pedal(&mut self, down: bool) {
        self.sync_generation();
        self.pedal_event(down);
    }

    fn pedal_event(&mut self, down: bool) {
        if !self.pedal.set_pedal(down) {
            return;
        }
        let loop_thru_release = self.shared.params.loop_thru_release();
        for voice in &mut self.voices {
            if voice.is_sustained() {
                voice.set_sustained(false);
                voice.release(loop_thru_release);
            }
        }
        self.pedal.clear_sustained();
    }

    /// Replace the vibrato LFO waveform. Phase and rate carry over.
    ///
    /// The table's values are scaled by the vibrato depth, so a table
    /// spanning [-1, 1] swings the pitch by the full depth each way.
    pub fn set_vibrato_table(&mut self, table: FunctionTable) {
        self.vibrato.set_table(table);
    }

    /// Whether the sustain pedal is down.
    pub fn is_pedal_down(&self) -> bool {
        self.pedal.is_pedal_down()
    }

    // -- Quiescence -------------------------------------------------------------

    /// Force every voice idle and stop reading sample data until
    /// [`restart_voices`](Self::restart_voices).
    ///
    /// Takes `&mut self`, so no render can be running; use
    /// [`SamplerHandle::stop_all_voices`] from another thread.
    pub fn stop_all_voices(&mut self) {
        self.seen_generation = self.shared.begin_stop();
        self.kill_all();
        tracing::debug!(generation = self.seen_generation, "sampler quiescent");
    }

    /// Resume normal note handling.
    pub fn restart_voices(&mut self) {
        self.shared.end_stop();
        tracing::debug!("sampler voices restarted");
    }

    /// Whether the sampler is between `stop_all_voices` and `restart_voices`.
    pub fn is_quiescent(&self) -> bool {
        self.shared.is_stopping()
    }

    // -- Parameters -------------------------------------------------------------

    /// Set a scalar parameter (clamped to its range).
    pub fn set_param(&mut self, param: SamplerParam, value: f32) {
        self.shared.params.set(param, value);
    }

    /// Current value of a scalar parameter.
    pub fn param(&self, param: SamplerParam) -> f32 {
        self.shared.params.get(param)
    }

    /// Keep looping through the release stage. Applies to voices released
    /// from now on.
    pub fn set_loop_thru_release(&mut self, enabled: bool) {
        self.shared.params.set_loop_thru_release(enabled);
    }

    /// Whether looping continues through release.
    pub fn loop_thru_release(&self) -> bool {
        self.shared.params.loop_thru_release()
    }

    /// Enable or bypass the per-voice low-pass.
    pub fn set_filter_enabled(&mut self, enabled: bool) {
        self.shared.params.set_filter_enabled(enabled);
    }

    /// Whether the per-voice low-pass runs.
    pub fn is_filter_enabled(&self) -> bool {
        self.shared.params.filter_enabled()
    }

    /// Validate and apply a whole configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SamplerError::InvalidParameter`] if any value is out of
    /// range; nothing is applied in that case.
    pub fn apply_config(&mut self, config: &SamplerConfig) -> Result<(), SamplerError> {
        self.shared.apply_config(config)
    }

    /// Current settings as a configuration.
    pub fn config(&self) -> SamplerConfig {
        let params = self.shared.params.snapshot();
        SamplerConfig {
            master_volume: params.master_volume,
            pitch_offset: params.pitch_offset,
            vibrato_depth: params.vibrato_depth,
            vibrato_rate: params.vibrato_rate,
            filter_enabled: params.filter_enabled,
            cutoff_multiple: params.cutoff_multiple,
            cutoff_envelope_strength: params.cutoff_envelope_strength,
            resonance_db: self.shared.params.get(SamplerParam::ResonanceDb),
            loop_thru_release: params.loop_thru_release,
            declick_ms: params.declick_ms,
            amp_envelope: EnvelopeConfig::from(params.amp_envelope),
            filter_envelope: EnvelopeConfig::from(params.filter_envelope),
        }
    }

    // -- Inspection -------------------------------------------------------------

    /// Number of voices sounding or about to.
    pub fn active_voice_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    /// Voice at a pool index.
    pub fn voice(&self, index: usize) -> Option<&SamplerVoice> {
        self.voices.get(index)
    }

    /// The whole pool.
    pub fn voices(&self) -> &[SamplerVoice] {
        &self.voices
    }

    // -- Rendering --------------------------------------------------------------

    /// Render `sample_count` samples into `outputs`, overwriting them.
    ///
    /// One output is a mono mix; with two or more, channel 0 is left,
    /// channel 1 is right and the rest are zero-filled. Output buffers
    /// shorter than `sample_count` limit how much is rendered.
    ///
    /// Lock-free and allocation-free: queued note events are applied first
    /// if the queue is free, otherwise they wait for the next call.
    pub fn render(&mut self, outputs: &mut [&mut [f32]], sample_count: usize) {
        let frames = outputs
            .iter()
            .map(|buf| buf.len())
            .min()
            .map_or(0, |len| len.min(sample_count));
        for buf in outputs.iter_mut() {
            let n = buf.len().min(sample_count);
            buf[..n].fill(0.0);
        }

        let shared = Arc::clone(&self.shared);
        let silent = shared.enter_render();
        if silent {
            self.kill_all();
            self.seen_generation = shared.generation();
        }
        if silent || !self.initialized {
            shared.exit_render();
            return;
        }

        self.sync_generation();
        let generation = self.seen_generation;

        self.refresh_params();
        let guard = shared.bank.load();
        let bank = guard.as_deref();
        self.drain_commands(&shared, bank, generation);

        let mut start = 0;
        while start < frames {
            let n = (frames - start).min(CHUNK_SIZE);
            self.render_chunk(bank, outputs, start, n);
            start += n;
        }

        drop(guard);
        shared.exit_render();

        // Sustained voices can still end by running out of data
        if self.pedal.sustained_count() > 0 {
            for note in 0..=127u8 {
                if self.pedal.is_sustained(note) {
                    self.sync_sustained(note);
                }
            }
        }
    }

    fn render_chunk(
        &mut self,
        bank: Option<&B>,
        outputs: &mut [&mut [f32]],
        offset: usize,
        frames: usize,
    ) {
        let lfo = self.vibrato.next_sample();
        let semitones = self.params.pitch_offset + self.params.vibrato_depth * lfo;
        let ctx = ChunkContext {
            amp_params: &self.amp_params,
            filter_params: &self.filter_params,
            pitch_ratio: f64::from(semitones_to_ratio(semitones)),
            master_volume: self.params.master_volume,
            filter_enabled: self.params.filter_enabled,
            cutoff_multiple: self.params.cutoff_multiple,
            cutoff_envelope_strength: self.params.cutoff_envelope_strength,
            damping: self.params.damping,
            max_cutoff: self.sample_rate * MAX_CUTOFF_RATIO,
        };
        let loop_thru_release = self.params.loop_thru_release;

        let mut left = [0.0f32; CHUNK_SIZE];
        let mut right = [0.0f32; CHUNK_SIZE];

        for voice in &mut self.voices {
            if let Some(pending) = voice.take_ready_pending() {
                Self::start_pending(voice, bank, pending, loop_thru_release);
            }
            if !voice.is_active() {
                continue;
            }
            let zone = voice
                .zone_id()
                .and_then(|id| bank.and_then(|bank| bank.zone(id)));
            voice.render_chunk(zone, &ctx, &mut left, &mut right, frames);
        }

        match outputs {
            [] => {}
            [mono] => {
                for (i, out) in mono[offset..offset + frames].iter_mut().enumerate() {
                    *out = (left[i] + right[i]) * 0.5;
                }
            }
            [out_left, out_right, ..] => {
                out_left[offset..offset + frames].copy_from_slice(&left[..frames]);
                out_right[offset..offset + frames].copy_from_slice(&right[..frames]);
            }
        }
    }

    fn start_pending(
        voice: &mut SamplerVoice,
        bank: Option<&B>,
        pending: PendingNote,
        loop_thru_release: bool,
    ) {
        let zone = bank.and_then(|bank| bank.zone(pending.zone));
        if let Some(zone) = zone {
            let order = voice.trigger_order();
            voice.start(pending, zone, order, loop_thru_release);
        }
    }

    fn drain_commands(&mut self, shared: &SharedState<B>, bank: Option<&B>, generation: u64) {
        let Some(mut queue) = shared.commands.try_lock() else {
            return;
        };
        while let Some(queued) = queue.pop_front() {
            if queued.generation > generation {
                // Sent after a stop this call has not caught up with
                queue.push_front(queued);
                break;
            }
            match queued.command {
                // The pedal is physical state; a stop never cancels it
                NoteCommand::Pedal { down } => self.pedal_event(down),
                _ if queued.generation != generation => {}
                NoteCommand::NoteOn {
                    note,
                    velocity,
                    frequency,
                } => self.note_on(bank, note, velocity, frequency),
                NoteCommand::NoteOff { note, immediate } => self.note_off(note, immediate),
            }
        }
    }

    fn note_on(&mut self, bank: Option<&B>, note: u8, velocity: u8, frequency: f32) {
        if usize::from(note) >= crate::pedal::NOTE_COUNT {
            return;
        }
        let Some(bank) = bank else {
            return;
        };
        let Some(zone_id) = bank.lookup_zone(note, velocity) else {
            return;
        };
        let Some(zone) = bank.zone(zone_id) else {
            return;
        };
        let Some(index) = self.select_voice(note) else {
            return;
        };

        self.trigger_counter += 1;
        let order = self.trigger_counter;
        let pending = PendingNote {
            note,
            velocity,
            frequency,
            zone: zone_id,
            released: false,
        };
        let loop_thru_release = self.shared.params.loop_thru_release();

        let voice = &mut self.voices[index];
        let old_note = voice.note();
        let was_sustained = voice.is_sustained();
        if voice.is_active() {
            voice.restart(pending, order);
        } else {
            voice.start(pending, zone, order, loop_thru_release);
        }
        if was_sustained {
            self.sync_sustained(old_note);
        }
    }

    fn note_off(&mut self, note: u8, immediate: bool) {
        if usize::from(note) >= crate::pedal::NOTE_COUNT {
            return;
        }
        if immediate {
            for voice in &mut self.voices {
                if voice.is_active() && voice.note() == note {
                    voice.stop_immediately();
                }
            }
            self.pedal.unsustain(note);
            return;
        }

        let newest = self
            .voices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.note() == note && v.is_held())
            .max_by_key(|(_, v)| v.trigger_order())
            .map(|(i, _)| i);

        let decision = self.pedal.key_up(note);
        let Some(index) = newest else {
            if decision == KeyRelease::Sustain {
                self.sync_sustained(note);
            }
            return;
        };
        let voice = &mut self.voices[index];
        match decision {
            KeyRelease::Sustain => voice.set_sustained(true),
            KeyRelease::Release => voice.release(self.shared.params.loop_thru_release()),
        }
    }

    fn select_voice(&self, note: u8) -> Option<usize> {
        let same_note = |v: &SamplerVoice| v.is_active() && v.note() == note;

        if let Some(i) = self.voices.iter().position(|v| same_note(v) && v.is_held()) {
            return Some(i);
        }
        if let Some(i) = self
            .voices
            .iter()
            .position(|v| same_note(v) && v.is_releasing() && !v.is_sustained())
        {
            return Some(i);
        }
        if let Some(i) = self.voices.iter().position(|v| !v.is_active()) {
            return Some(i);
        }

        let quietest_releasing = self
            .voices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_releasing())
            .min_by(|(_, a), (_, b)| {
                a.steal_level()
                    .total_cmp(&b.steal_level())
                    .then(a.trigger_order().cmp(&b.trigger_order()))
            })
            .map(|(i, _)| i);
        if quietest_releasing.is_some() {
            return quietest_releasing;
        }

        self.voices
            .iter()
            .enumerate()
            .min_by_key(|(_, v)| v.trigger_order())
            .map(|(i, _)| i)
    }

    /// Drop `note` from the pedal's set once no voice holds it sustained.
    fn sync_sustained(&mut self, note: u8) {
        if !self
            .voices
            .iter()
            .any(|v| v.is_sustained() && v.note() == note)
        {
            self.pedal.unsustain(note);
        }
    }

    /// Catch up with stops issued through a handle, dropping the voices
    /// started before them.
    fn sync_generation(&mut self) {
        let generation = self.shared.generation();
        if generation != self.seen_generation {
            self.seen_generation = generation;
            self.kill_all();
        }
    }

    fn kill_all(&mut self) {
        for voice in &mut self.voices {
            voice.kill();
        }
        self.pedal.clear_sustained();
    }

    fn refresh_params(&mut self) {
        let params = self.shared.params.snapshot();
        if params != self.params {
            self.params = params;
            self.apply_params();
        }
    }

    fn apply_params(&mut self) {
        let params = self.params;
        self.amp_params = params.amp_envelope.to_params(self.sample_rate);
        self.filter_params = params.filter_envelope.to_params(self.sample_rate);
        self.vibrato.set_frequency(params.vibrato_rate);
        let declick = LinearRamp::length_for(params.declick_ms, self.sample_rate);
        for voice in &mut self.voices {
            voice.set_declick_length(declick);
        }
    }
}

impl<B: SampleBank, const VOICES: usize> std::fmt::Debug for Sampler<B, VOICES> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("sample_rate", &self.sample_rate)
            .field("voices", &VOICES)
            .field("active_voices", &self.active_voice_count())
            .field("quiescent", &self.is_quiescent())
            .finish_non_exhaustive()
    }
}

fn validate_sample_rate(sample_rate: f32) -> Result<(), SamplerError> {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        Ok(())
    } else {
        Err(SamplerError::InvalidSampleRate(sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::SampleZone;

    fn sampler() -> Sampler<ZoneMap, 4> {
        let mut sampler = Sampler::new(48000.0).unwrap();
        sampler.set_bank(ZoneMap::single(SampleZone::mono(vec![0.5; 4800], 48000.0, 440.0)));
        sampler
    }

    #[test]
    fn commands_from_a_newer_stop_wait_for_next_render() {
        let mut sampler = sampler();
        let handle = sampler.handle();
        let seen = sampler.seen_generation;
        handle.stop_all_voices();
        handle.restart_voices();
        handle.play_note(60, 100, 440.0);

        // A render that read the generation before the stop
        let shared = Arc::clone(&sampler.shared);
        let guard = shared.bank.load();
        sampler.drain_commands(&shared, guard.as_deref(), seen);
        drop(guard);
        assert_eq!(sampler.active_voice_count(), 0);
        assert_eq!(shared.commands.lock().len(), 1);

        let mut out = [0.0f32; 64];
        sampler.render(&mut [&mut out[..]], 64);
        assert_eq!(sampler.active_voice_count(), 1);
        assert!(shared.commands.lock().is_empty());
    }

    #[test]
    fn stale_note_commands_dropped_but_pedal_kept() {
        let mut sampler = sampler();
        let handle = sampler.handle();
        handle.sustain_pedal(true);
        handle.play_note(60, 100, 440.0);
        handle.stop_all_voices();
        handle.restart_voices();

        let mut out = [0.0f32; 64];
        sampler.render(&mut [&mut out[..]], 64);
        assert_eq!(sampler.active_voice_count(), 0);
        assert!(sampler.is_pedal_down());
    }

    #[test]
    fn direct_calls_catch_up_with_handle_stop() {
        let mut sampler = sampler();
        sampler.play_note(60, 100, 440.0);
        let handle = sampler.handle();
        handle.stop_all_voices();
        handle.restart_voices();

        sampler.stop_note(72, false);
        assert_eq!(sampler.seen_generation, sampler.shared.generation());
        assert_eq!(sampler.active_voice_count(), 0);
    }
}
