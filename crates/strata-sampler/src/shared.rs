//! Cross-thread bridge between control threads and the render path.
//!
//! [`SharedState`] is everything a [`SamplerHandle`] and its
//! [`Sampler`](crate::Sampler) both see:
//!
//! - **Parameters**: `AtomicU32`/`AtomicBool`, lock-free, read once per render.
//! - **Sample bank**: `ArcSwapOption`, wait-free load at the start of render.
//! - **Note events**: `Mutex<VecDeque>`, bounded. Control threads lock to
//!   push; render `try_lock`s to drain at the start of a call, so an event is
//!   applied before the first chunk of a render or deferred whole to the next.
//! - **Quiescence**: `stopping` flag, `rendering` flag, a stop generation and
//!   the last generation a silent render acknowledged. All use `SeqCst`, so
//!   after [`SamplerHandle::stop_all_voices`] returns, either no render call
//!   that could have missed `stopping` is running, or the render path has
//!   acknowledged the stop and touches no sample data.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;

use crate::bank::SampleBank;
use crate::config::SamplerConfig;
use crate::error::SamplerError;
use crate::params::{ParamStore, SamplerParam};

/// Maximum queued note events between two render calls.
pub const COMMAND_QUEUE_CAPACITY: usize = 256;

/// Note event queued by a handle for the render path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum NoteCommand {
    NoteOn {
        note: u8,
        velocity: u8,
        frequency: f32,
    },
    NoteOff {
        note: u8,
        immediate: bool,
    },
    Pedal {
        down: bool,
    },
}

/// A command stamped with the stop generation it was sent under.
#[derive(Debug, Clone, Copy)]
pub(crate) struct QueuedCommand {
    pub command: NoteCommand,
    pub generation: u64,
}

pub(crate) struct SharedState<B> {
    pub bank: ArcSwapOption<B>,
    pub commands: Mutex<VecDeque<QueuedCommand>>,
    pub params: ParamStore,
    stopping: AtomicBool,
    generation: AtomicU64,
    rendering: AtomicBool,
    acknowledged: AtomicU64,
}

impl<B: SampleBank> SharedState<B> {
    pub(crate) fn new() -> Self {
        Self {
            bank: ArcSwapOption::empty(),
            commands: Mutex::new(VecDeque::with_capacity(COMMAND_QUEUE_CAPACITY)),
            params: ParamStore::new(),
            stopping: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            rendering: AtomicBool::new(false),
            acknowledged: AtomicU64::new(0),
        }
    }

    /// Queue an event. Note events sent while quiescent are dropped; pedal
    /// events always go through.
    pub(crate) fn push(&self, command: NoteCommand) {
        // Generation first: a stop that lands in between has already set
        // `stopping`, or bumps the generation past this stamp.
        let generation = self.generation.load(Ordering::SeqCst);
        let is_note = !matches!(command, NoteCommand::Pedal { .. });
        if is_note && self.stopping.load(Ordering::SeqCst) {
            return;
        }

        let mut queue = self.commands.lock();
        if queue.len() >= COMMAND_QUEUE_CAPACITY {
            tracing::warn!("sampler command queue full, dropping {command:?}");
            return;
        }
        queue.push_back(QueuedCommand {
            command,
            generation,
        });
    }

    /// Enter quiescence. Returns the new stop generation.
    pub(crate) fn begin_stop(&self) -> u64 {
        self.stopping.store(true, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Leave quiescence.
    pub(crate) fn end_stop(&self) {
        self.stopping.store(false, Ordering::SeqCst);
    }

    pub(crate) fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Mark the render path as running. Returns whether it must stay silent.
    ///
    /// A silent call acknowledges the current stop generation.
    pub(crate) fn enter_render(&self) -> bool {
        self.rendering.store(true, Ordering::SeqCst);
        let silent = self.stopping.load(Ordering::SeqCst);
        if silent {
            let generation = self.generation.load(Ordering::SeqCst);
            self.acknowledged.fetch_max(generation, Ordering::SeqCst);
        }
        silent
    }

    pub(crate) fn exit_render(&self) {
        self.rendering.store(false, Ordering::SeqCst);
    }

    /// Block until no render call that could have missed the stop of
    /// `generation` is still running.
    ///
    /// Returns as soon as the render path is idle or a render call has gone
    /// silent for `generation`, so back-to-back renders cannot starve it.
    pub(crate) fn wait_for_render(&self, generation: u64) {
        while self.rendering.load(Ordering::SeqCst)
            && self.acknowledged.load(Ordering::SeqCst) < generation
        {
            std::hint::spin_loop();
            std::thread::yield_now();
        }
    }

    pub(crate) fn set_bank(&self, bank: Arc<B>) {
        if !self.is_stopping() {
            tracing::warn!("sample bank replaced outside a stop_all_voices/restart_voices bracket");
        }
        self.bank.store(Some(bank));
        tracing::info!("sample bank replaced");
    }

    pub(crate) fn clear_bank(&self) {
        if self.bank.swap(None).is_some() {
            tracing::debug!("sample bank cleared");
        }
    }

    pub(crate) fn apply_config(&self, config: &SamplerConfig) -> Result<(), SamplerError> {
        config.validate()?;
        for (param, value) in config.param_values() {
            self.params.set(param, value);
        }
        self.params.set_filter_enabled(config.filter_enabled);
        self.params.set_loop_thru_release(config.loop_thru_release);
        tracing::debug!("sampler config applied");
        Ok(())
    }
}

/// Cloneable control-path handle to a [`Sampler`](crate::Sampler).
///
/// Every method may be called from any thread while another thread renders.
/// Note events are queued and take effect at the start of the next render
/// call; parameter changes are heard from the next render block.
///
/// ```rust
/// use strata_sampler::{Sampler, SampleZone, ZoneMap};
///
/// let mut sampler: Sampler = Sampler::new(48000.0).unwrap();
/// let handle = sampler.handle();
/// handle.set_bank(ZoneMap::single(SampleZone::mono(vec![0.5; 4800], 48000.0, 440.0)));
///
/// handle.play_note(69, 100, 440.0);
/// let mut left = [0.0f32; 64];
/// let mut right = [0.0f32; 64];
/// sampler.render(&mut [&mut left[..], &mut right[..]], 64);
/// assert_eq!(sampler.active_voice_count(), 1);
/// ```
pub struct SamplerHandle<B> {
    shared: Arc<SharedState<B>>,
}

impl<B> Clone for SamplerHandle<B> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<B> std::fmt::Debug for SamplerHandle<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplerHandle").finish_non_exhaustive()
    }
}

impl<B: SampleBank> SamplerHandle<B> {
    pub(crate) fn new(shared: Arc<SharedState<B>>) -> Self {
        Self { shared }
    }

    /// Queue a note-on.
    pub fn play_note(&self, note: u8, velocity: u8, frequency: f32) {
        self.shared.push(NoteCommand::NoteOn {
            note,
            velocity,
            frequency,
        });
    }

    /// Queue a note-off. `immediate` fades the note out over the declick
    /// ramp instead of releasing it.
    pub fn stop_note(&self, note: u8, immediate: bool) {
        self.shared.push(NoteCommand::NoteOff { note, immediate });
    }

    /// Queue a sustain pedal change.
    pub fn sustain_pedal(&self, down: bool) {
        self.shared.push(NoteCommand::Pedal { down });
    }

    /// Set a scalar parameter (clamped to its range).
    pub fn set_param(&self, param: SamplerParam, value: f32) {
        self.shared.params.set(param, value);
    }

    /// Current value of a scalar parameter.
    pub fn param(&self, param: SamplerParam) -> f32 {
        self.shared.params.get(param)
    }

    /// Enable or bypass the per-voice low-pass.
    pub fn set_filter_enabled(&self, enabled: bool) {
        self.shared.params.set_filter_enabled(enabled);
    }

    /// Keep looping through the release stage.
    pub fn set_loop_thru_release(&self, enabled: bool) {
        self.shared.params.set_loop_thru_release(enabled);
    }

    /// Validate and apply a whole configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SamplerError::InvalidParameter`] if any value is out of
    /// range; nothing is applied in that case.
    pub fn apply_config(&self, config: &SamplerConfig) -> Result<(), SamplerError> {
        self.shared.apply_config(config)
    }

    /// Silence every voice and wait until the render path no longer reads
    /// sample data.
    ///
    /// Blocks for at most one render call. Note events sent until
    /// [`restart_voices`](Self::restart_voices) are dropped.
    pub fn stop_all_voices(&self) {
        let generation = self.shared.begin_stop();
        self.shared.wait_for_render(generation);
        tracing::debug!(generation, "sampler quiescent");
    }

    /// Leave quiescence.
    pub fn restart_voices(&self) {
        self.shared.end_stop();
        tracing::debug!("sampler voices restarted");
    }

    /// Whether the sampler is between `stop_all_voices` and `restart_voices`.
    pub fn is_quiescent(&self) -> bool {
        self.shared.is_stopping()
    }

    /// Publish a new sample bank.
    pub fn set_bank(&self, bank: B) {
        self.shared.set_bank(Arc::new(bank));
    }

    /// Publish an already shared sample bank.
    pub fn set_bank_arc(&self, bank: Arc<B>) {
        self.shared.set_bank(bank);
    }

    /// Drop the current sample bank.
    pub fn clear_bank(&self) {
        self.shared.clear_bank();
    }

    /// Currently published sample bank.
    pub fn bank(&self) -> Option<Arc<B>> {
        self.shared.bank.load_full()
    }
}
