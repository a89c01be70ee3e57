mod key;
mod key_combo;
mod mouse;
mod performer;

pub use key::Key;
pub use key_combo::{ComboError, KeyCombo, Modifier, Modifiers};
pub use mouse::MouseButton;
pub use performer::Performer;
