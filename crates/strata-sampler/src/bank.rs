//! Sample zones and the bank lookup interface.
//!
//! The sampler never owns or mutates sample data. It asks a [`SampleBank`]
//! which zone answers a `(note, velocity)` pair, keeps only the returned
//! [`ZoneId`], and resolves that id back to a [`SampleZone`] once per render
//! call. Loading, keymapping and file formats belong to whoever implements
//! the trait; [`ZoneMap`] is the minimal in-memory implementation.

use core::ops::RangeInclusive;

/// Index of a zone inside its bank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoneId(pub usize);

/// Narrow lookup interface the sampler uses to find sample data.
///
/// Implementations must be immutable while shared with a sampler. Replace
/// the whole bank through `set_bank` inside a
/// `stop_all_voices` / `restart_voices` bracket instead of mutating it.
pub trait SampleBank: Send + Sync + 'static {
    /// Zone that should play for this note and velocity, if any.
    fn lookup_zone(&self, note: u8, velocity: u8) -> Option<ZoneId>;

    /// Resolve a zone id returned by [`lookup_zone`](Self::lookup_zone).
    fn zone(&self, id: ZoneId) -> Option<&SampleZone>;
}

/// One region of sample data with its playback metadata.
///
/// Data is interleaved when stereo. Loop bounds are frame indices; the loop
/// covers `loop_start..loop_end`, so playback wraps when it reaches
/// `loop_end`.
#[derive(Debug, Clone)]
pub struct SampleZone {
    data: Vec<f32>,
    channel_count: usize,
    frame_count: usize,
    sample_rate: f32,
    root_frequency: f32,
    loop_start: usize,
    loop_end: usize,
    loop_enabled: bool,
}

impl SampleZone {
    /// Mono zone, recorded at `sample_rate`, sounding `root_frequency` when
    /// played back unmodified.
    pub fn mono(data: Vec<f32>, sample_rate: f32, root_frequency: f32) -> Self {
        let frame_count = data.len();
        Self {
            data,
            channel_count: 1,
            frame_count,
            sample_rate,
            root_frequency,
            loop_start: 0,
            loop_end: frame_count,
            loop_enabled: false,
        }
    }

    /// Stereo zone from interleaved `[l, r, l, r, ...]` data.
    ///
    /// A trailing unpaired sample is ignored.
    pub fn stereo(interleaved: Vec<f32>, sample_rate: f32, root_frequency: f32) -> Self {
        let frame_count = interleaved.len() / 2;
        Self {
            data: interleaved,
            channel_count: 2,
            frame_count,
            sample_rate,
            root_frequency,
            loop_start: 0,
            loop_end: frame_count,
            loop_enabled: false,
        }
    }

    /// Enable looping over `start..end` (frames).
    ///
    /// `end` is clamped to the data length. An empty or inverted range leaves
    /// looping disabled.
    #[must_use]
    pub fn with_loop(mut self, start: usize, end: usize) -> Self {
        let end = end.min(self.frame_count);
        if start < end {
            self.loop_start = start;
            self.loop_end = end;
            self.loop_enabled = true;
        } else {
            self.loop_enabled = false;
        }
        self
    }

    /// Number of frames of audio.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// 1 for mono, 2 for stereo.
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Recording sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Pitch of the recording in Hz.
    pub fn root_frequency(&self) -> f32 {
        self.root_frequency
    }

    /// First frame of the loop.
    pub fn loop_start(&self) -> usize {
        self.loop_start
    }

    /// Frame at which playback wraps back to [`loop_start`](Self::loop_start).
    pub fn loop_end(&self) -> usize {
        self.loop_end
    }

    /// Whether the zone loops.
    pub fn is_looping(&self) -> bool {
        self.loop_enabled
    }

    /// Raw sample data (interleaved when stereo).
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Left/right pair for a frame. Mono zones return the same value twice;
    /// frames past the end read as silence.
    #[inline]
    pub fn frame(&self, index: usize) -> (f32, f32) {
        if index >= self.frame_count {
            return (0.0, 0.0);
        }
        if self.channel_count == 2 {
            let base = index * 2;
            (self.data[base], self.data[base + 1])
        } else {
            let s = self.data[index];
            (s, s)
        }
    }
}

#[derive(Debug, Clone)]
struct ZoneMapping {
    notes: RangeInclusive<u8>,
    velocities: RangeInclusive<u8>,
    zone: ZoneId,
}

/// In-memory keymap from note/velocity ranges to zones.
///
/// Mappings are searched in insertion order; the first one containing both
/// the note and the velocity wins.
///
/// ```rust
/// use strata_sampler::{SampleBank, SampleZone, ZoneMap};
///
/// let mut bank = ZoneMap::new();
/// let low = bank.add_zone(SampleZone::mono(vec![0.0; 64], 48000.0, 261.6), 0..=63, 0..=127);
/// let high = bank.add_zone(SampleZone::mono(vec![0.0; 64], 48000.0, 523.3), 64..=127, 0..=127);
///
/// assert_eq!(bank.lookup_zone(60, 100), Some(low));
/// assert_eq!(bank.lookup_zone(72, 100), Some(high));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ZoneMap {
    zones: Vec<SampleZone>,
    mappings: Vec<ZoneMapping>,
}

impl ZoneMap {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map containing one zone that answers every note and velocity.
    pub fn single(zone: SampleZone) -> Self {
        let mut map = Self::new();
        map.add_zone(zone, 0..=127, 0..=127);
        map
    }

    /// Add a zone answering the given note and velocity ranges.
    pub fn add_zone(
        &mut self,
        zone: SampleZone,
        notes: RangeInclusive<u8>,
        velocities: RangeInclusive<u8>,
    ) -> ZoneId {
        let id = ZoneId(self.zones.len());
        self.zones.push(zone);
        self.mappings.push(ZoneMapping {
            notes,
            velocities,
            zone: id,
        });
        id
    }

    /// Number of zones.
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// Whether the map holds no zones.
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

impl SampleBank for ZoneMap {
    fn lookup_zone(&self, note: u8, velocity: u8) -> Option<ZoneId> {
        self.mappings
            .iter()
            .find(|m| m.notes.contains(&note) && m.velocities.contains(&velocity))
            .map(|m| m.zone)
    }

    fn zone(&self, id: ZoneId) -> Option<&SampleZone> {
        self.zones.get(id.0)
    }
}
