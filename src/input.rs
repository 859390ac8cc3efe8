/*
 * This is free software, distributed under the MIT license.  A copy of the
 * license can be found in the LICENSE file in the project root, or at
 * https://opensource.org/licenses/MIT.
 */

//! Input handling for the Chip-8 interpreter.
//!
//! The machine sees a 16-key hex keypad as an array of key-down booleans.
//! The front-end is the sole writer: it presses keys on key-down events and
//! releases them on key-up events, so the interpreter itself never clears
//! key state.

use std::default::Default;

use num::traits::FromPrimitive;

/// The number of keys on the Chip-8 controller.
const N_KEYS: usize = 16;

enum_from_primitive! {
/// The keys on the Chip-8 controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    K0 = 0,
    K1,
    K2,
    K3,
    K4,
    K5,
    K6,
    K7,
    K8,
    K9,
    KA,
    KB,
    KC,
    KD,
    KE,
    KF
}
}

impl Key {
    /// Returns the key corresponding to the lowest four bits of the given
    /// byte.
    pub fn from_byte(b: u8) -> Key {
        Key::from_u8(b % N_KEYS as u8).unwrap()
    }
}

/// Represents the state of the input device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct State {
    /// The key states (`true` means "pressed").
    keys: [bool; N_KEYS],
}

impl State {
    /// Returns a new input state with all keys unpressed.
    pub fn new() -> Self {
        State::default()
    }

    /// Returns the lowest key that is currently pressed, if any.
    ///
    /// The key is not released; that remains the front-end's job.
    pub fn first_pressed(&self) -> Option<Key> {
        for (i, &key) in self.keys.iter().enumerate() {
            if key {
                return Some(Key::from_usize(i).unwrap());
            }
        }
        None
    }

    /// Returns whether the given key is pressed.
    pub fn is_pressed(&self, key: Key) -> bool {
        self.keys[key as usize]
    }

    /// Marks the given key as pressed.
    pub fn press(&mut self, key: Key) {
        self.keys[key as usize] = true;
    }

    /// Marks the given key as released.
    pub fn release(&mut self, key: Key) {
        self.keys[key as usize] = false;
    }
}

#[cfg(test)]
mod tests {
    use super::{Key, State};

    #[test]
    fn press_release() {
        let mut state = State::new();

        assert!(!state.is_pressed(Key::K7));
        state.press(Key::K7);
        assert!(state.is_pressed(Key::K7));
        state.release(Key::K7);
        assert!(!state.is_pressed(Key::K7));
    }

    #[test]
    fn first_pressed() {
        let mut state = State::new();

        assert_eq!(state.first_pressed(), None);
        state.press(Key::KB);
        state.press(Key::K4);
        assert_eq!(state.first_pressed(), Some(Key::K4));
        // Polling must not release the key.
        assert!(state.is_pressed(Key::K4));
    }

    #[test]
    fn key_from_byte() {
        assert_eq!(Key::from_byte(0x0), Key::K0);
        assert_eq!(Key::from_byte(0xF), Key::KF);
        // Only the low four bits matter.
        assert_eq!(Key::from_byte(0x13), Key::K3);
    }
}
