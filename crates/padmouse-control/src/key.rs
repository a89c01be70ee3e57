use std::fmt;

use enigo::Key as EnigoKey;

/// A key that can be emulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Unicode(char),
    Control,
    Meta,
    Shift,
    Alt,
    Home,
    End,
    PageUp,
    PageDown,
    UpArrow,
    DownArrow,
    LeftArrow,
    RightArrow,
    Delete,
    Backspace,
    Escape,
    Tab,
    Space,
    Return,
    /// Function key `F1..=F12`.
    F(u8),
}

/// Named keys, first name is canonical.
const NAMED: &[(&str, Key)] = &[
    ("ctrl", Key::Control),
    ("control", Key::Control),
    ("meta", Key::Meta),
    ("cmd", Key::Meta),
    ("super", Key::Meta),
    ("win", Key::Meta),
    ("shift", Key::Shift),
    ("alt", Key::Alt),
    ("option", Key::Alt),
    ("home", Key::Home),
    ("end", Key::End),
    ("page_up", Key::PageUp),
    ("page_down", Key::PageDown),
    ("arrow_up", Key::UpArrow),
    ("up", Key::UpArrow),
    ("arrow_down", Key::DownArrow),
    ("down", Key::DownArrow),
    ("arrow_left", Key::LeftArrow),
    ("left", Key::LeftArrow),
    ("arrow_right", Key::RightArrow),
    ("right", Key::RightArrow),
    ("delete", Key::Delete),
    ("backspace", Key::Backspace),
    ("escape", Key::Escape),
    ("esc", Key::Escape),
    ("tab", Key::Tab),
    ("space", Key::Space),
    ("enter", Key::Return),
    ("return", Key::Return),
];

impl Key {
    pub const fn is_modifier(self) -> bool {
        matches!(self, Key::Control | Key::Meta | Key::Shift | Key::Alt)
    }
}

pub(crate) fn parse_key(name: &str) -> Option<Key> {
    let name = name.trim().to_ascii_lowercase();
    if let Some((_, key)) = NAMED.iter().find(|(n, _)| *n == name) {
        return Some(*key);
    }
    if let Some(num) = name.strip_prefix('f') {
        if let Ok(n @ 1..=12) = num.parse::<u8>() {
            return Some(Key::F(n));
        }
    }
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) if !ch.is_whitespace() && ch != '+' => Some(Key::Unicode(ch)),
        _ => None,
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Unicode(ch) => write!(f, "{ch}"),
            Key::F(n) => write!(f, "f{n}"),
            key => {
                let name = NAMED
                    .iter()
                    .find(|(_, k)| k == key)
                    .map_or("?", |(n, _)| *n);
                f.write_str(name)
            }
        }
    }
}

impl From<Key> for EnigoKey {
    fn from(key: Key) -> Self {
        match key {
            Key::Unicode(ch) => EnigoKey::Unicode(ch),
            Key::Control => EnigoKey::Control,
            Key::Meta => EnigoKey::Meta,
            Key::Shift => EnigoKey::Shift,
            Key::Alt => EnigoKey::Alt,
            Key::Home => EnigoKey::Home,
            Key::End => EnigoKey::End,
            Key::PageUp => EnigoKey::PageUp,
            Key::PageDown => EnigoKey::PageDown,
            Key::UpArrow => EnigoKey::UpArrow,
            Key::DownArrow => EnigoKey::DownArrow,
            Key::LeftArrow => EnigoKey::LeftArrow,
            Key::RightArrow => EnigoKey::RightArrow,
            Key::Delete => EnigoKey::Delete,
            Key::Backspace => EnigoKey::Backspace,
            Key::Escape => EnigoKey::Escape,
            Key::Tab => EnigoKey::Tab,
            Key::Space => EnigoKey::Space,
            Key::Return => EnigoKey::Return,
            Key::F(n) => function_key(n),
        }
    }
}

fn function_key(n: u8) -> EnigoKey {
    match n {
        1 => EnigoKey::F1,
        2 => EnigoKey::F2,
        3 => EnigoKey::F3,
        4 => EnigoKey::F4,
        5 => EnigoKey::F5,
        6 => EnigoKey::F6,
        7 => EnigoKey::F7,
        8 => EnigoKey::F8,
        9 => EnigoKey::F9,
        10 => EnigoKey::F10,
        11 => EnigoKey::F11,
        _ => EnigoKey::F12,
    }
}
