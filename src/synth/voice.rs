//! Voice pool: allocation, stealing, release, and per-voice lifecycle.

/*
The pool is fixed-size. Voices are never created or destroyed after engine
startup; a "voice" is an index into parallel arrays, and starting a note
just rewrites one slot.

Allocation policy for note-on, in order:

  1. RETRIGGER  a voice already sounding the same note is reused: a held
                voice first, else a releasing one. Phase and envelopes
                restart; re-striking a decaying note never burns a second
                slot.
  2. FREE       any inactive slot.
  3. STEAL      the pool is full; prefer the *oldest releasing* voice
                (it is already on its way out), otherwise the oldest
                active voice. "Oldest" is by the monotonically increasing
                note counter stamped into `age` at allocation.

Note-off sweeps the whole pool and releases *every* voice matching the
note.

The pool owns the envelope state (amp + mod) because envelope completion
is what frees a voice; oscillator phases and filter states live with their
owners in the engine and are re-initialized through the engine's note-on
path.
*/

use crate::dsp::envelope::{AdsrParams, AdsrState};
use crate::MAX_VOICES;

/// What the engine must re-initialize after the pool assigns a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceAssignment {
    pub voice: usize,
    /// The slot was already sounding (retrigger or steal) rather than free.
    pub stolen: bool,
}

pub struct VoicePool {
    active: [bool; MAX_VOICES],
    releasing: [bool; MAX_VOICES],
    notes: [u8; MAX_VOICES],
    velocities: [u8; MAX_VOICES],
    ages: [u64; MAX_VOICES],

    /// Per-voice amplitude envelope state; reaching Idle frees the voice.
    pub amp_env: [AdsrState; MAX_VOICES],
    /// Per-voice modulation envelope state (mod source Env2).
    pub mod_env: [AdsrState; MAX_VOICES],

    note_count: u64,
}

impl VoicePool {
    pub fn new() -> Self {
        Self {
            active: [false; MAX_VOICES],
            releasing: [false; MAX_VOICES],
            notes: [0; MAX_VOICES],
            velocities: [0; MAX_VOICES],
            ages: [0; MAX_VOICES],
            amp_env: [AdsrState::default(); MAX_VOICES],
            mod_env: [AdsrState::default(); MAX_VOICES],
            note_count: 0,
        }
    }

    /// Assign a voice for a note-on and start its envelopes. Returns which
    /// slot to (re)initialize. A note of 0 is invalid and ignored.
    pub fn note_on(&mut self, note: u8, velocity: u8) -> Option<VoiceAssignment> {
        if note == 0 {
            return None;
        }

        let (voice, stolen) = match self.find_slot(note) {
            Some(found) => found,
            None => return None,
        };

        self.note_count += 1;
        self.active[voice] = true;
        self.releasing[voice] = false;
        self.notes[voice] = note;
        self.velocities[voice] = velocity;
        self.ages[voice] = self.note_count;

        self.amp_env[voice].reset();
        self.mod_env[voice].reset();
        self.amp_env[voice].note_on();
        self.mod_env[voice].note_on();

        Some(VoiceAssignment { voice, stolen })
    }

    fn find_slot(&self, note: u8) -> Option<(usize, bool)> {
        // Retrigger: same note still sounding, held first, then releasing.
        for v in 0..MAX_VOICES {
            if self.active[v] && self.notes[v] == note && !self.releasing[v] {
                return Some((v, true));
            }
        }
        for v in 0..MAX_VOICES {
            if self.active[v] && self.notes[v] == note {
                return Some((v, true));
            }
        }

        // Any free slot.
        for v in 0..MAX_VOICES {
            if !self.active[v] {
                return Some((v, false));
            }
        }

        // Steal: oldest releasing voice first, else oldest active.
        if let Some(v) = (0..MAX_VOICES)
            .filter(|&v| self.releasing[v])
            .min_by_key(|&v| self.ages[v])
        {
            return Some((v, true));
        }

        (0..MAX_VOICES).min_by_key(|&v| self.ages[v]).map(|v| (v, true))
    }

    /// Release every voice holding `note`. Multiple matches (from
    /// retriggering) are all released.
    pub fn note_off(&mut self, note: u8) {
        for v in 0..MAX_VOICES {
            if self.active[v] && self.notes[v] == note && !self.releasing[v] {
                self.releasing[v] = true;
                self.amp_env[v].note_off();
                self.mod_env[v].note_off();
            }
        }
    }

    /// Mark a voice free once its amplitude envelope has finished.
    pub fn free_voice(&mut self, voice: usize) {
        self.active[voice] = false;
        self.releasing[voice] = false;
    }

    /// Release everything at once (all-notes-off / panic).
    pub fn release_all(&mut self) {
        for v in 0..MAX_VOICES {
            if self.active[v] && !self.releasing[v] {
                self.releasing[v] = true;
                self.amp_env[v].note_off();
                self.mod_env[v].note_off();
            }
        }
    }

    #[inline]
    pub fn is_active(&self, voice: usize) -> bool {
        self.active[voice]
    }

    #[inline]
    pub fn is_releasing(&self, voice: usize) -> bool {
        self.releasing[voice]
    }

    #[inline]
    pub fn note(&self, voice: usize) -> u8 {
        self.notes[voice]
    }

    #[inline]
    pub fn velocity(&self, voice: usize) -> u8 {
        self.velocities[voice]
    }

    #[inline]
    pub fn age(&self, voice: usize) -> u64 {
        self.ages[voice]
    }

    pub fn active_count(&self) -> usize {
        self.active.iter().filter(|&&a| a).count()
    }

    /// Notes currently sounding, for tests and diagnostics.
    pub fn active_notes(&self) -> Vec<u8> {
        (0..MAX_VOICES)
            .filter(|&v| self.active[v])
            .map(|v| self.notes[v])
            .collect()
    }
}

impl Default for VoicePool {
    fn default() -> Self {
        Self::new()
    }
}
