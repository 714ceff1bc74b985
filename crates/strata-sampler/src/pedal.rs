//! Sustain pedal arbitration.
//!
//! Decides, for each key release, whether the note stops now or is held by
//! the pedal, and remembers which notes the pedal is holding so a pedal-up
//! can release them together. The logic tracks note numbers only; binding
//! notes to voices is the sampler's job.

/// Number of addressable note numbers.
pub const NOTE_COUNT: usize = 128;

/// What a key release should do to the sounding voice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyRelease {
    /// Pedal is up: release the voice now.
    Release,
    /// Pedal is down: keep the voice sounding, marked as sustained.
    Sustain,
}

/// Pedal position and the set of notes it is holding.
///
/// Fixed-size table indexed by note number; no allocation after
/// construction. Note numbers above 127 are ignored everywhere.
#[derive(Debug, Clone)]
pub struct SustainPedalLogic {
    pedal_down: bool,
    sustained: [bool; NOTE_COUNT],
}

impl Default for SustainPedalLogic {
    fn default() -> Self {
        Self::new()
    }
}

impl SustainPedalLogic {
    /// Pedal up, nothing sustained.
    pub fn new() -> Self {
        Self {
            pedal_down: false,
            sustained: [false; NOTE_COUNT],
        }
    }

    /// Clear all state.
    pub fn reset(&mut self) {
        self.pedal_down = false;
        self.sustained = [false; NOTE_COUNT];
    }

    /// Decide what a key release does to the voice.
    ///
    /// With the pedal down the note joins the sustained set.
    pub fn key_up(&mut self, note: u8) -> KeyRelease {
        let index = usize::from(note);
        if index >= NOTE_COUNT {
            return KeyRelease::Release;
        }
        if self.pedal_down {
            self.sustained[index] = true;
            KeyRelease::Sustain
        } else {
            KeyRelease::Release
        }
    }

    /// Update the pedal position.
    ///
    /// Returns `true` on a down-to-up transition: the caller must now release
    /// every sustained voice and then call [`clear_sustained`](Self::clear_sustained).
    pub fn set_pedal(&mut self, down: bool) -> bool {
        let released = self.pedal_down && !down;
        self.pedal_down = down;
        released
    }

    /// Whether the pedal is currently down.
    pub fn is_pedal_down(&self) -> bool {
        self.pedal_down
    }

    /// Whether `note` is sounding only because of the pedal.
    pub fn is_sustained(&self, note: u8) -> bool {
        self.sustained.get(usize::from(note)).copied().unwrap_or(false)
    }

    /// Drop `note` from the sustained set (its voice was stopped or stolen).
    pub fn unsustain(&mut self, note: u8) {
        if let Some(sustained) = self.sustained.get_mut(usize::from(note)) {
            *sustained = false;
        }
    }

    /// Empty the sustained set.
    pub fn clear_sustained(&mut self) {
        self.sustained = [false; NOTE_COUNT];
    }

    /// Number of notes currently held by the pedal.
    pub fn sustained_count(&self) -> usize {
        self.sustained.iter().filter(|&&s| s).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_without_pedal() {
        let mut pedal = SustainPedalLogic::new();
        assert_eq!(pedal.key_up(60), KeyRelease::Release);
        assert!(!pedal.is_sustained(60));
    }

    #[test]
    fn pedal_holds_released_keys() {
        let mut pedal = SustainPedalLogic::new();
        assert!(!pedal.set_pedal(true));
        assert_eq!(pedal.key_up(60), KeyRelease::Sustain);
        assert!(pedal.is_sustained(60));
        assert!(!pedal.is_sustained(64));
        assert_eq!(pedal.sustained_count(), 1);
    }

    #[test]
    fn pedal_up_reports_transition_once() {
        let mut pedal = SustainPedalLogic::new();
        pedal.set_pedal(true);
        pedal.key_up(60);
        assert!(pedal.set_pedal(false));
        pedal.clear_sustained();
        assert_eq!(pedal.sustained_count(), 0);
        // Already up
        assert!(!pedal.set_pedal(false));
    }

    #[test]
    fn pedal_down_again_keeps_sustained_set() {
        let mut pedal = SustainPedalLogic::new();
        pedal.set_pedal(true);
        assert_eq!(pedal.key_up(72), KeyRelease::Sustain);
        assert!(!pedal.set_pedal(true));
        assert!(pedal.is_sustained(72));
    }

    #[test]
    fn out_of_range_notes_ignored() {
        let mut pedal = SustainPedalLogic::new();
        pedal.set_pedal(true);
        assert_eq!(pedal.key_up(200), KeyRelease::Release);
        assert!(!pedal.is_sustained(200));
        pedal.unsustain(255);
    }

    #[test]
    fn unsustain_removes_single_note() {
        let mut pedal = SustainPedalLogic::new();
        pedal.set_pedal(true);
        pedal.key_up(60);
        pedal.key_up(62);
        pedal.unsustain(60);
        assert!(!pedal.is_sustained(60));
        assert!(pedal.is_sustained(62));
    }

    #[test]
    fn reset_clears_everything() {
        let mut pedal = SustainPedalLogic::new();
        pedal.set_pedal(true);
        pedal.key_up(1);
        pedal.reset();
        assert!(!pedal.is_pedal_down());
        assert_eq!(pedal.sustained_count(), 0);
    }
}
