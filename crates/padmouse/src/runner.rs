use colored::Colorize;
use enigo::InputResult;
use padmouse_control::Performer;

use crate::mapping::Action;
use crate::print_error;

/// Executes queued actions on the OS input system.
pub struct ActionRunner {
    performer: Performer,
}

impl ActionRunner {
    pub fn new(performer: Performer) -> Self {
        Self { performer }
    }

    /// Runs every action in order. A failing action is logged and skipped.
    pub fn run_all(&mut self, actions: impl IntoIterator<Item = Action>) {
        for action in actions {
            if let Err(e) = self.run(&action) {
                print_error!("failed to perform {action:?}: {e}");
            }
        }
    }

    pub fn run(&mut self, action: &Action) -> InputResult<()> {
        match action {
            Action::MouseMove { dx, dy } => self.performer.mouse_move(*dx, *dy),
            Action::MousePress(button) => self.performer.mouse_press(*button),
            Action::MouseRelease(button) => self.performer.mouse_release(*button),
            Action::KeyTap(combo) => self.performer.perform(combo),
            Action::KeyPress(combo) => self.performer.press(combo),
            Action::KeyRelease(combo) => self.performer.release(combo),
        }
    }
}
