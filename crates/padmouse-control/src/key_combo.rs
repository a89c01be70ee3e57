use std::fmt;
use std::str::FromStr;

use enigo::{
    Direction::{Click, Press, Release},
    Enigo, InputResult, Keyboard,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use thiserror::Error;

use crate::key::{parse_key, Key};

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Modifier {
    Ctrl,
    Meta,
    Shift,
    Alt,
}

impl Modifier {
    /// Press order. Release goes in reverse.
    pub const ALL: [Modifier; 4] = [
        Modifier::Ctrl,
        Modifier::Meta,
        Modifier::Shift,
        Modifier::Alt,
    ];

    const fn bit(self) -> u8 {
        match self {
            Modifier::Ctrl => 1 << 0,
            Modifier::Meta => 1 << 1,
            Modifier::Shift => 1 << 2,
            Modifier::Alt => 1 << 3,
        }
    }

    const fn key(self) -> Key {
        match self {
            Modifier::Ctrl => Key::Control,
            Modifier::Meta => Key::Meta,
            Modifier::Shift => Key::Shift,
            Modifier::Alt => Key::Alt,
        }
    }

    const fn from_key(key: Key) -> Option<Self> {
        match key {
            Key::Control => Some(Modifier::Ctrl),
            Key::Meta => Some(Modifier::Meta),
            Key::Shift => Some(Modifier::Shift),
            Key::Alt => Some(Modifier::Alt),
            _ => None,
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq, Hash, Clone, Copy)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn with(self, modifier: Modifier) -> Self {
        Self(self.0 | modifier.bit())
    }

    pub fn add(&mut self, modifier: Modifier) {
        self.0 |= modifier.bit();
    }

    pub const fn contains(self, modifier: Modifier) -> bool {
        self.0 & modifier.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl DoubleEndedIterator<Item = Modifier> {
        Modifier::ALL.into_iter().filter(move |m| self.contains(*m))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ComboError {
    #[error("empty key combination")]
    Empty,
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// Modifiers plus keys, written as `"ctrl+shift+tab"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub modifiers: Modifiers,
    pub keys: SmallVec<[Key; 4]>,
}

impl KeyCombo {
    pub fn from_key(key: Key) -> Self {
        let mut combo = Self {
            modifiers: Modifiers::empty(),
            keys: SmallVec::new(),
        };
        match Modifier::from_key(key) {
            Some(m) => combo.modifiers.add(m),
            None => combo.keys.push(key),
        }
        combo
    }

    #[must_use]
    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.add(modifier);
        self
    }

    /// Press modifiers, click every key, release modifiers.
    pub fn perform(&self, enigo: &mut Enigo) -> InputResult<()> {
        self.press_modifiers(enigo)?;
        for key in &self.keys {
            enigo.key((*key).into(), Click)?;
        }
        self.release_modifiers(enigo)
    }

    pub fn press(&self, enigo: &mut Enigo) -> InputResult<()> {
        self.press_modifiers(enigo)?;
        for key in &self.keys {
            enigo.key((*key).into(), Press)?;
        }
        Ok(())
    }

    pub fn release(&self, enigo: &mut Enigo) -> InputResult<()> {
        for key in self.keys.iter().rev() {
            enigo.key((*key).into(), Release)?;
        }
        self.release_modifiers(enigo)
    }

    fn press_modifiers(&self, enigo: &mut Enigo) -> InputResult<()> {
        for m in self.modifiers.iter() {
            enigo.key(m.key().into(), Press)?;
        }
        Ok(())
    }

    fn release_modifiers(&self, enigo: &mut Enigo) -> InputResult<()> {
        for m in self.modifiers.iter().rev() {
            enigo.key(m.key().into(), Release)?;
        }
        Ok(())
    }
}

impl FromStr for KeyCombo {
    type Err = ComboError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ComboError::Empty);
        }
        let mut modifiers = Modifiers::empty();
        let mut keys: SmallVec<[Key; 4]> = SmallVec::new();
        for part in s.split('+').map(str::trim) {
            let key = parse_key(part).ok_or_else(|| ComboError::InvalidKey(part.to_string()))?;
            match Modifier::from_key(key) {
                Some(m) => modifiers.add(m),
                None => keys.push(key),
            }
        }
        Ok(KeyCombo { modifiers, keys })
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self
            .modifiers
            .iter()
            .map(Modifier::key)
            .chain(self.keys.iter().copied());
        for (i, key) in parts.enumerate() {
            if i > 0 {
                f.write_str("+")?;
            }
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

impl Serialize for KeyCombo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for KeyCombo {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
