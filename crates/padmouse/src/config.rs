use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fmt, fs, io};

use padmouse_control::{ComboError, Key, KeyCombo, Modifier, MouseButton};
use padmouse_gamepad::{Button, StickShape};
use padmouse_loop::DEFAULT_FREQUENCY;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pointer speed at full deflection, in pixels per second.
pub const DEFAULT_POINTER_SPEED: f32 = 1200.0;
pub const DEFAULT_DEADZONE: f32 = 0.2;
/// Cubic ease-in: precise near the center, fast at the rim.
pub const DEFAULT_CURVE: f32 = 3.0;
pub const DEFAULT_REPEAT_DELAY: Duration = Duration::from_millis(350);
pub const DEFAULT_REPEAT_INTERVAL: Duration = Duration::from_millis(90);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid button: {0}")]
    InvalidButton(String),
    #[error("invalid stick side: {0}")]
    InvalidStickSide(String),
    #[error("invalid mouse button: {0}")]
    InvalidMouseButton(String),
    #[error("invalid keystroke for {button}: {source}")]
    InvalidKeystroke { button: String, source: ComboError },
    #[error("binding for {0} must set exactly one of `mouse`, `keystroke` or `hold`")]
    InvalidBinding(String),
    #[error("binding for {0}: `repeat` only applies to keystrokes")]
    MisplacedRepeat(String),
    #[error("invalid {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StickSide {
    Left,
    Right,
}

impl StickSide {
    fn as_str(self) -> &'static str {
        match self {
            StickSide::Left => "left",
            StickSide::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerConfig {
    pub stick: StickSide,
    pub shape: StickShape,
    /// Pixels per second at full deflection.
    pub speed: f32,
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            stick: StickSide::Left,
            shape: StickShape {
                inner_deadzone: DEFAULT_DEADZONE,
                curve: DEFAULT_CURVE,
            },
            speed: DEFAULT_POINTER_SPEED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatConfig {
    pub delay: Duration,
    pub interval: Duration,
}

impl Default for RepeatConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_REPEAT_DELAY,
            interval: DEFAULT_REPEAT_INTERVAL,
        }
    }
}

/// What a controller button does.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// Hold the mouse button for as long as the controller button is held.
    Mouse(MouseButton),
    /// Tap the combo on press, and keep tapping while held if `repeat` is set.
    Keystroke { combo: KeyCombo, repeat: bool },
    /// Keep the combo pressed while the controller button is held.
    Hold(KeyCombo),
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Mouse(button) => write!(f, "{} mouse button", mouse_name(*button)),
            Binding::Keystroke { combo, repeat } => {
                write!(f, "{combo}")?;
                if *repeat {
                    f.write_str(" (repeat)")?;
                }
                Ok(())
            }
            Binding::Hold(combo) => write!(f, "hold {combo}"),
        }
    }
}

/// Resolved mapping configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub frequency: u32,
    /// `None` leaves the pointer alone.
    pub pointer: Option<PointerConfig>,
    pub repeat: RepeatConfig,
    pub buttons: BTreeMap<Button, Binding>,
}

impl Default for Config {
    fn default() -> Self {
        let key = |key: Key, repeat: bool| Binding::Keystroke {
            combo: KeyCombo::from_key(key),
            repeat,
        };
        let buttons = BTreeMap::from([
            (Button::A, Binding::Mouse(MouseButton::Left)),
            (Button::X, Binding::Mouse(MouseButton::Right)),
            (Button::LeftStick, Binding::Mouse(MouseButton::Middle)),
            (Button::B, key(Key::Escape, false)),
            (
                Button::LeftShoulder,
                Binding::Keystroke {
                    combo: KeyCombo::from_key(Key::Tab).with_modifier(Modifier::Shift),
                    repeat: true,
                },
            ),
            (Button::RightShoulder, key(Key::Tab, true)),
            (Button::DPadUp, key(Key::UpArrow, true)),
            (Button::DPadDown, key(Key::DownArrow, true)),
            (Button::DPadLeft, key(Key::LeftArrow, true)),
            (Button::DPadRight, key(Key::RightArrow, true)),
        ]);
        Self {
            frequency: DEFAULT_FREQUENCY,
            pointer: Some(PointerConfig::default()),
            repeat: RepeatConfig::default(),
            buttons,
        }
    }
}

impl Config {
    /// Load from `path`, or the built-in mapping when there is none.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let input = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&input)
    }

    /// Parse yaml on top of the built-in mapping. A `buttons` table replaces
    /// the built-in bindings as a whole; other sections override field by field.
    pub fn parse(input: &str) -> Result<Self> {
        let raw: RawConfig = if input.trim().is_empty() {
            RawConfig::default()
        } else {
            serde_yaml::from_str(input)?
        };
        raw.resolve()
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&RawConfig::from(self))?)
    }

    /// Human readable lines describing every binding.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.buttons.len() + 1);
        if let Some(pointer) = &self.pointer {
            lines.push(format!("{} stick: mouse movement", pointer.stick.as_str()));
        }
        for (button, binding) in &self.buttons {
            lines.push(format!("{}: {binding}", button_name(*button)));
        }
        lines
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    frequency: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pointer: Option<RawPointer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    repeat: Option<RawRepeat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    buttons: Option<BTreeMap<String, RawBinding>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPointer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stick: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    deadzone: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    curve: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    speed: Option<f32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRepeat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    interval_ms: Option<u64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBinding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mouse: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    keystroke: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hold: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    repeat: Option<bool>,
}

impl RawConfig {
    fn resolve(self) -> Result<Config> {
        let mut config = Config::default();

        if let Some(frequency) = self.frequency {
            if frequency == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "frequency",
                    reason: "must be at least 1 Hz",
                });
            }
            config.frequency = frequency;
        }
        if let Some(pointer) = self.pointer {
            config.pointer = parse_pointer(pointer)?;
        }
        if let Some(repeat) = self.repeat {
            config.repeat = parse_repeat(repeat)?;
        }
        if let Some(buttons) = self.buttons {
            config.buttons = buttons
                .into_iter()
                .map(|(name, raw)| {
                    let button = parse_button_name(&name)?;
                    Ok((button, parse_binding(&name, raw)?))
                })
                .collect::<Result<_>>()?;
        }
        Ok(config)
    }
}

fn parse_pointer(raw: RawPointer) -> Result<Option<PointerConfig>> {
    if raw.enabled == Some(false) {
        return Ok(None);
    }
    let mut pointer = PointerConfig::default();
    if let Some(stick) = raw.stick {
        pointer.stick = parse_stick_side(&stick)?;
    }
    if let Some(deadzone) = raw.deadzone {
        if !(0.0..1.0).contains(&deadzone) {
            return Err(ConfigError::InvalidValue {
                field: "pointer.deadzone",
                reason: "must be in [0, 1)",
            });
        }
        pointer.shape.inner_deadzone = deadzone;
    }
    if let Some(curve) = raw.curve {
        if !(curve > 0.0 && curve.is_finite()) {
            return Err(ConfigError::InvalidValue {
                field: "pointer.curve",
                reason: "must be a positive number",
            });
        }
        pointer.shape.curve = curve;
    }
    if let Some(speed) = raw.speed {
        if !(speed >= 0.0 && speed.is_finite()) {
            return Err(ConfigError::InvalidValue {
                field: "pointer.speed",
                reason: "must be a non-negative number",
            });
        }
        pointer.speed = speed;
    }
    Ok(Some(pointer))
}

fn parse_repeat(raw: RawRepeat) -> Result<RepeatConfig> {
    let mut repeat = RepeatConfig::default();
    if let Some(ms) = raw.delay_ms {
        repeat.delay = Duration::from_millis(ms);
    }
    if let Some(ms) = raw.interval_ms {
        if ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "repeat.interval_ms",
                reason: "must be at least 1 ms",
            });
        }
        repeat.interval = Duration::from_millis(ms);
    }
    Ok(repeat)
}

fn parse_binding(name: &str, raw: RawBinding) -> Result<Binding> {
    let combo = |keystroke: &str| {
        keystroke
            .parse::<KeyCombo>()
            .map_err(|source| ConfigError::InvalidKeystroke {
                button: name.to_string(),
                source,
            })
    };
    if raw.repeat.is_some() && raw.keystroke.is_none() {
        return Err(ConfigError::MisplacedRepeat(name.to_string()));
    }
    match (raw.mouse, raw.keystroke, raw.hold) {
        (Some(mouse), None, None) => Ok(Binding::Mouse(parse_mouse_button(&mouse)?)),
        (None, Some(keystroke), None) => Ok(Binding::Keystroke {
            combo: combo(&keystroke)?,
            repeat: raw.repeat.unwrap_or(false),
        }),
        (None, None, Some(hold)) => Ok(Binding::Hold(combo(&hold)?)),
        _ => Err(ConfigError::InvalidBinding(name.to_string())),
    }
}

fn parse_stick_side(raw: &str) -> Result<StickSide> {
    Ok(match raw {
        "left" => StickSide::Left,
        "right" => StickSide::Right,
        other => return Err(ConfigError::InvalidStickSide(other.to_string())),
    })
}

fn parse_mouse_button(raw: &str) -> Result<MouseButton> {
    Ok(match raw {
        "left" => MouseButton::Left,
        "right" => MouseButton::Right,
        "middle" => MouseButton::Middle,
        other => return Err(ConfigError::InvalidMouseButton(other.to_string())),
    })
}

fn mouse_name(button: MouseButton) -> &'static str {
    match button {
        MouseButton::Left => "left",
        MouseButton::Right => "right",
        MouseButton::Middle => "middle",
    }
}

/// Parse a button name, accepting the usual aliases.
fn parse_button_name(name: &str) -> Result<Button> {
    Ok(match name {
        "a" => Button::A,
        "b" => Button::B,
        "x" => Button::X,
        "y" => Button::Y,

        "back" | "select" => Button::Back,
        "guide" | "home" => Button::Guide,
        "start" => Button::Start,

        "ls" | "left_stick" => Button::LeftStick,
        "rs" | "right_stick" => Button::RightStick,

        "lb" | "left_bumper" | "left_shoulder" | "l1" => Button::LeftShoulder,
        "rb" | "right_bumper" | "right_shoulder" | "r1" => Button::RightShoulder,
        "lt" | "left_trigger" | "l2" => Button::LeftTrigger,
        "rt" | "right_trigger" | "r2" => Button::RightTrigger,

        "dpad_up" => Button::DPadUp,
        "dpad_down" => Button::DPadDown,
        "dpad_left" => Button::DPadLeft,
        "dpad_right" => Button::DPadRight,

        _ => return Err(ConfigError::InvalidButton(name.to_string())),
    })
}

fn button_name(button: Button) -> &'static str {
    match button {
        Button::A => "a",
        Button::B => "b",
        Button::X => "x",
        Button::Y => "y",
        Button::Back => "back",
        Button::Guide => "guide",
        Button::Start => "start",
        Button::LeftStick => "ls",
        Button::RightStick => "rs",
        Button::LeftShoulder => "lb",
        Button::RightShoulder => "rb",
        Button::LeftTrigger => "lt",
        Button::RightTrigger => "rt",
        Button::DPadUp => "dpad_up",
        Button::DPadDown => "dpad_down",
        Button::DPadLeft => "dpad_left",
        Button::DPadRight => "dpad_right",
    }
}

impl From<&Config> for RawConfig {
    fn from(config: &Config) -> Self {
        let pointer = match &config.pointer {
            None => RawPointer {
                enabled: Some(false),
                ..RawPointer::default()
            },
            Some(p) => RawPointer {
                enabled: None,
                stick: Some(p.stick.as_str().to_string()),
                deadzone: Some(p.shape.inner_deadzone),
                curve: Some(p.shape.curve),
                speed: Some(p.speed),
            },
        };
        let buttons = config
            .buttons
            .iter()
            .map(|(button, binding)| {
                let raw = match binding {
                    Binding::Mouse(m) => RawBinding {
                        mouse: Some(mouse_name(*m).to_string()),
                        ..RawBinding::default()
                    },
                    Binding::Keystroke { combo, repeat } => RawBinding {
                        keystroke: Some(combo.to_string()),
                        repeat: repeat.then_some(true),
                        ..RawBinding::default()
                    },
                    Binding::Hold(combo) => RawBinding {
                        hold: Some(combo.to_string()),
                        ..RawBinding::default()
                    },
                };
                (button_name(*button).to_string(), raw)
            })
            .collect();
        RawConfig {
            frequency: Some(config.frequency),
            pointer: Some(pointer),
            repeat: Some(RawRepeat {
                delay_ms: Some(config.repeat.delay.as_millis() as u64),
                interval_ms: Some(config.repeat.interval.as_millis() as u64),
            }),
            buttons: Some(buttons),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_builtin_mapping() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.frequency, 60);
        assert_eq!(config.buttons.len(), 10);
        assert_eq!(
            config.buttons[&Button::LeftShoulder].to_string(),
            "shift+tab (repeat)"
        );
        assert_eq!(
            config.buttons[&Button::LeftStick],
            Binding::Mouse(MouseButton::Middle)
        );
    }

    #[test]
    fn sections_override_field_by_field() {
        let yaml = "
frequency: 120
pointer:
  speed: 800
repeat:
  interval_ms: 50
";
        let config = Config::parse(yaml).unwrap();
        assert_eq!(config.frequency, 120);
        let pointer = config.pointer.unwrap();
        assert_eq!(pointer.speed, 800.0);
        assert_eq!(pointer.shape.inner_deadzone, DEFAULT_DEADZONE);
        assert_eq!(config.repeat.delay, DEFAULT_REPEAT_DELAY);
        assert_eq!(config.repeat.interval, Duration::from_millis(50));
        assert_eq!(config.buttons, Config::default().buttons);
    }

    #[test]
    fn buttons_table_replaces_builtin_bindings() {
        let yaml = "
buttons:
  r1: { keystroke: ctrl+tab, repeat: true }
  y: { mouse: right }
  lt: { hold: ctrl+shift }
";
        let config = Config::parse(yaml).unwrap();
        assert_eq!(config.buttons.len(), 3);
        assert_eq!(
            config.buttons[&Button::LeftTrigger].to_string(),
            "hold ctrl+shift"
        );
        assert_eq!(
            config.buttons[&Button::RightShoulder].to_string(),
            "ctrl+tab (repeat)"
        );
        assert_eq!(config.buttons[&Button::Y], Binding::Mouse(MouseButton::Right));
    }

    #[test]
    fn pointer_can_be_disabled() {
        let config = Config::parse("pointer: { enabled: false }").unwrap();
        assert!(config.pointer.is_none());
        assert!(!config.describe()[0].contains("stick"));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            Config::parse("frequency: 0"),
            Err(ConfigError::InvalidValue { field: "frequency", .. })
        ));
        assert!(matches!(
            Config::parse("frequency: -1"),
            Err(ConfigError::Yaml(_))
        ));
        assert!(matches!(
            Config::parse("pointer: { deadzone: 1.5 }"),
            Err(ConfigError::InvalidValue { field: "pointer.deadzone", .. })
        ));
        assert!(matches!(
            Config::parse("pointer: { stick: middle }"),
            Err(ConfigError::InvalidStickSide(_))
        ));
        assert!(matches!(
            Config::parse("repeat: { interval_ms: 0 }"),
            Err(ConfigError::InvalidValue { field: "repeat.interval_ms", .. })
        ));
    }

    #[test]
    fn rejects_bad_bindings() {
        assert!(matches!(
            Config::parse("buttons: { turbo: { mouse: left } }"),
            Err(ConfigError::InvalidButton(name)) if name == "turbo"
        ));
        assert!(matches!(
            Config::parse("buttons: { a: { mouse: left, keystroke: tab } }"),
            Err(ConfigError::InvalidBinding(_))
        ));
        assert!(matches!(
            Config::parse("buttons: { a: { mouse: left, repeat: true } }"),
            Err(ConfigError::MisplacedRepeat(_))
        ));
        assert!(matches!(
            Config::parse("buttons: { a: { hold: shift, repeat: false } }"),
            Err(ConfigError::MisplacedRepeat(_))
        ));
        assert!(matches!(
            Config::parse("buttons: { a: { keystroke: ctrl+nope } }"),
            Err(ConfigError::InvalidKeystroke { .. })
        ));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(matches!(
            Config::parse("pointer: { sped: 10 }"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn dumped_yaml_parses_back_to_the_same_config() {
        let mut config = Config::default();
        config.frequency = 90;
        config.pointer = None;
        config
            .buttons
            .insert(Button::Start, Binding::Hold("alt".parse().unwrap()));
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("enabled: false"));
        assert_eq!(Config::parse(&yaml).unwrap(), config);
    }

    #[test]
    fn describe_lists_pointer_then_buttons() {
        let lines = Config::default().describe();
        assert_eq!(lines[0], "left stick: mouse movement");
        assert!(lines.contains(&"a: left mouse button".to_string()));
        assert!(lines.contains(&"b: escape".to_string()));
        assert!(lines.contains(&"dpad_up: arrow_up (repeat)".to_string()));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Config::load(Some(Path::new("/nonexistent/padmouse.yaml"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/padmouse.yaml"));
    }
}
