mod error;
mod events;
mod manager;
mod observer;
mod pad;
mod runtime;
mod stick;
mod types;

pub use crate::error::{Error, Result};
pub use crate::events::{ControllerEvent, EventReceiver};
pub use crate::manager::ControllerManager;
pub use crate::observer::Subscription;
pub use crate::pad::{Frame, Gamepad};
pub use crate::stick::{StickPosition, StickShape};
pub use crate::types::{Axis, Button, ButtonSet, ControllerId, ControllerInfo};
