use serde::{Deserialize, Serialize};

/// Unique identifier of a connected controller (SDL instance id).
pub type ControllerId = u32;

/// Logical controller buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    A,
    B,
    X,
    Y,
    Back,
    Guide,
    Start,
    LeftStick,
    RightStick,
    LeftShoulder,
    RightShoulder,
    LeftTrigger,
    RightTrigger,
    #[serde(rename = "dpad_up")]
    DPadUp,
    #[serde(rename = "dpad_down")]
    DPadDown,
    #[serde(rename = "dpad_left")]
    DPadLeft,
    #[serde(rename = "dpad_right")]
    DPadRight,
}

impl Button {
    pub const ALL: [Button; 17] = [
        Button::A,
        Button::B,
        Button::X,
        Button::Y,
        Button::Back,
        Button::Guide,
        Button::Start,
        Button::LeftStick,
        Button::RightStick,
        Button::LeftShoulder,
        Button::RightShoulder,
        Button::LeftTrigger,
        Button::RightTrigger,
        Button::DPadUp,
        Button::DPadDown,
        Button::DPadLeft,
        Button::DPadRight,
    ];

    #[inline]
    const fn bit(self) -> u32 {
        1 << self as u32
    }
}

/// Analog axes. Sticks report [-1.0, 1.0], triggers [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    LeftX,
    LeftY,
    RightX,
    RightY,
    LeftTrigger,
    RightTrigger,
}

impl Axis {
    #[inline]
    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

/// Controller meta information that remains stable across events.
#[derive(Debug, Clone)]
pub struct ControllerInfo {
    pub id: ControllerId,
    pub name: String,
    pub vendor_id: u16,
    pub product_id: u16,
}

/// Set of buttons, one bit per [`Button`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ButtonSet(u32);

impl ButtonSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    #[inline]
    pub fn insert(&mut self, button: Button) -> bool {
        let fresh = !self.contains(button);
        self.0 |= button.bit();
        fresh
    }

    #[inline]
    pub fn remove(&mut self, button: Button) -> bool {
        let present = self.contains(button);
        self.0 &= !button.bit();
        present
    }

    #[inline]
    pub const fn contains(&self, button: Button) -> bool {
        self.0 & button.bit() != 0
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Button> + '_ {
        Button::ALL.into_iter().filter(|b| self.contains(*b))
    }
}
