use super::Display;
use crate::u4;

/// Current state of the 16-key hex keypad. Polled by the interpreter, never pushed.
pub trait Keypad {
    fn is_pressed(&self, key: u4) -> bool;

    /// Lowest-indexed key currently held, if any.
    fn first_pressed(&self) -> Option<u4> {
        u4::all().find(|&key| self.is_pressed(key))
    }
}

/// Receives the pixel grid whenever it changed.
#[cfg_attr(test, mockall::automock)]
pub trait Screen {
    fn present(&mut self, pixels: &Display<bool>);
}

/// Tone output. Only ever called on transitions.
#[cfg_attr(test, mockall::automock)]
pub trait Buzzer {
    fn start_tone(&mut self);
    fn stop_tone(&mut self);
}

/// Keypad state as a plain array, fed by whatever input layer is in use.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct KeypadState {
    keys: [bool; 16],
}

impl KeypadState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the state of a key on the keypad.
    pub fn set_key(&mut self, key: u4, pressed: bool) {
        self.keys[key] = pressed;
    }

    pub fn release_all(&mut self) {
        self.keys = [false; 16];
    }

    pub fn keys(&self) -> &[bool; 16] {
        &self.keys
    }
}

impl Keypad for KeypadState {
    fn is_pressed(&self, key: u4) -> bool {
        self.keys[key]
    }
}

/// Remembers whether the tone is playing so the buzzer only hears about changes.
#[derive(Debug, Default)]
pub struct ToneLatch {
    playing: bool,
}

impl ToneLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Brings the buzzer in line with `should_play`.
    pub fn sync(&mut self, should_play: bool, buzzer: &mut dyn Buzzer) {
        if should_play == self.playing {
            return;
        }

        self.playing = should_play;
        if should_play {
            log::debug!("sound timer armed, starting tone");
            buzzer.start_tone();
        } else {
            log::debug!("sound timer expired, stopping tone");
            buzzer.stop_tone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_pressed_prefers_lowest_key() {
        let mut keypad = KeypadState::new();
        assert_eq!(keypad.first_pressed(), None);

        keypad.set_key(u4::new(0xC), true);
        keypad.set_key(u4::new(0x3), true);
        assert_eq!(keypad.first_pressed(), Some(u4::new(0x3)));

        keypad.set_key(u4::new(0x3), false);
        assert_eq!(keypad.first_pressed(), Some(u4::new(0xC)));

        keypad.release_all();
        assert_eq!(keypad.first_pressed(), None);
    }

    #[test]
    fn latch_only_reports_transitions() {
        let mut buzzer = MockBuzzer::new();
        buzzer.expect_start_tone().times(1).return_const(());
        buzzer.expect_stop_tone().times(1).return_const(());

        let mut latch = ToneLatch::new();
        latch.sync(false, &mut buzzer);
        latch.sync(true, &mut buzzer);
        latch.sync(true, &mut buzzer);
        assert!(latch.is_playing());
        latch.sync(false, &mut buzzer);
        latch.sync(false, &mut buzzer);
        assert!(!latch.is_playing());
    }
}
