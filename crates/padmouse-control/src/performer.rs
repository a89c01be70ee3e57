use enigo::{
    Coordinate,
    Direction::{Press, Release},
    Enigo, InputResult, Mouse, NewConError, Settings,
};

use crate::{KeyCombo, MouseButton};

/// Synthesizes mouse and keyboard input through the OS.
pub struct Performer {
    enigo: Enigo,
}

// SAFETY: a performer is owned by the update loop callback, which never runs
// on two threads at once. The platform event source inside `Enigo` is only
// ever touched by whichever thread currently runs that callback.
unsafe impl Send for Performer {}

impl Performer {
    /// Create a new performer.
    pub fn new() -> Result<Self, NewConError> {
        let settings = Settings::default();
        let enigo = Enigo::new(&settings)?;
        Ok(Self { enigo })
    }

    /// Press and release the keys in the key combo.
    pub fn perform(&mut self, key_combo: &KeyCombo) -> InputResult<()> {
        key_combo.perform(&mut self.enigo)
    }

    /// Press keys.
    pub fn press(&mut self, key_combo: &KeyCombo) -> InputResult<()> {
        key_combo.press(&mut self.enigo)
    }

    /// Release keys.
    pub fn release(&mut self, key_combo: &KeyCombo) -> InputResult<()> {
        key_combo.release(&mut self.enigo)
    }

    /// Move the mouse relative to its current position.
    pub fn mouse_move(&mut self, dx: i32, dy: i32) -> InputResult<()> {
        self.enigo.move_mouse(dx, dy, Coordinate::Rel)
    }

    pub fn mouse_press(&mut self, button: MouseButton) -> InputResult<()> {
        self.enigo.button(button.into(), Press)
    }

    pub fn mouse_release(&mut self, button: MouseButton) -> InputResult<()> {
        self.enigo.button(button.into(), Release)
    }
}
