//! Computer-keyboard note input.
//!
//! The bottom two rows of a US QWERTY layout play a chromatic scale, piano
//! style: home row as the white keys, the row above as the sharps
//! interleaved between them:
//!
//! ```text
//!    w e   t y u   o p
//!   a s d f g h j k l      → chromatic from MIDI 64 (E4)
//! ```
//!
//! `z` and `x` shift the whole map an octave down/up. ESC ends the input
//! session (handled by the capture collaborator; this module only maps).

/// Keys in chromatic order. `KEYS[i]` sounds MIDI note `BASE_NOTE + i`
/// before the octave shift.
const KEYS: [char; 16] = [
    'a', 'w', 's', 'e', 'd', 'f', 't', 'g', 'y', 'h', 'u', 'j', 'k', 'o', 'l', 'p',
];

/// MIDI note of the first key with no octave shift.
const BASE_NOTE: i16 = 64;

/// What a key press means to the input loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Play (or on key-up, release) this MIDI note.
    Note(u8),
    /// Octave shift applied; new shift value returned for display.
    OctaveChanged(i8),
    /// Key is not mapped.
    Unmapped,
}

/// Tracks the octave shift across key presses.
#[derive(Debug, Default)]
pub struct KeyboardMap {
    octave_shift: i8,
}

impl KeyboardMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interpret a pressed key. Case-insensitive.
    pub fn handle_key(&mut self, key: char) -> KeyAction {
        match key.to_ascii_lowercase() {
            'z' => {
                self.octave_shift = (self.octave_shift - 1).max(-4);
                KeyAction::OctaveChanged(self.octave_shift)
            }
            'x' => {
                self.octave_shift = (self.octave_shift + 1).min(4);
                KeyAction::OctaveChanged(self.octave_shift)
            }
            key => match self.note_for(key) {
                Some(note) => KeyAction::Note(note),
                None => KeyAction::Unmapped,
            },
        }
    }

    /// MIDI note for a key under the current octave shift, if mapped and
    /// in range.
    pub fn note_for(&self, key: char) -> Option<u8> {
        let index = KEYS.iter().position(|&k| k == key.to_ascii_lowercase())?;
        let note = BASE_NOTE + index as i16 + 12 * self.octave_shift as i16;
        u8::try_from(note).ok().filter(|&n| n <= 127)
    }

    pub fn octave_shift(&self) -> i8 {
        self.octave_shift
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_row_is_chromatic_from_64() {
        let map = KeyboardMap::new();
        assert_eq!(map.note_for('a'), Some(64));
        assert_eq!(map.note_for('w'), Some(65));
        assert_eq!(map.note_for('s'), Some(66));
        assert_eq!(map.note_for('p'), Some(79));
    }

    #[test]
    fn octave_keys_shift_the_map() {
        let mut map = KeyboardMap::new();
        assert_eq!(map.handle_key('z'), KeyAction::OctaveChanged(-1));
        assert_eq!(map.note_for('a'), Some(52));

        map.handle_key('x');
        map.handle_key('x');
        assert_eq!(map.octave_shift(), 1);
        assert_eq!(map.note_for('a'), Some(76));
    }

    #[test]
    fn shift_is_clamped() {
        let mut map = KeyboardMap::new();
        for _ in 0..20 {
            map.handle_key('z');
        }
        assert_eq!(map.octave_shift(), -4);
        // Lowest mapped note stays valid MIDI.
        assert_eq!(map.note_for('a'), Some(16));

        for _ in 0..20 {
            map.handle_key('x');
        }
        assert_eq!(map.octave_shift(), 4);
        assert_eq!(map.note_for('p'), Some(127));
    }

    #[test]
    fn unmapped_keys_do_nothing() {
        let mut map = KeyboardMap::new();
        assert_eq!(map.handle_key('q'), KeyAction::Unmapped);
        assert_eq!(map.handle_key('1'), KeyAction::Unmapped);
        assert_eq!(map.note_for(' '), None);
    }

    #[test]
    fn uppercase_maps_like_lowercase() {
        let mut map = KeyboardMap::new();
        assert_eq!(map.handle_key('A'), KeyAction::Note(64));
        assert_eq!(map.handle_key('Z'), KeyAction::OctaveChanged(-1));
    }
}
