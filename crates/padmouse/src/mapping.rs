use std::time::Duration;

use padmouse_control::{KeyCombo, MouseButton};
use padmouse_gamepad::{Frame, Gamepad, StickPosition, Subscription};

use crate::config::{Binding, Config, PointerConfig, StickSide};

/// Input to synthesize, produced by gamepad observers.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    MouseMove { dx: i32, dy: i32 },
    MousePress(MouseButton),
    MouseRelease(MouseButton),
    KeyTap(KeyCombo),
    KeyPress(KeyCombo),
    KeyRelease(KeyCombo),
}

/// Actions collected during one gamepad update.
pub type ActionQueue = Vec<Action>;

/// Converts stick deflection into whole-pixel pointer steps.
///
/// Fractions of a pixel are carried over to the next frame so slow
/// movement still adds up at high update rates.
#[derive(Debug, Clone, Default)]
pub struct PointerMotion {
    speed: f32,
    remainder: (f32, f32),
}

impl PointerMotion {
    pub fn new(speed: f32) -> Self {
        Self {
            speed,
            remainder: (0.0, 0.0),
        }
    }

    /// Pixel delta for one frame. Screen Y grows downward, stick Y upward.
    pub fn step(&mut self, stick: StickPosition, frame_time: Duration) -> Option<(i32, i32)> {
        if !stick.is_pushed() {
            self.remainder = (0.0, 0.0);
            return None;
        }
        let secs = frame_time.as_secs_f32();
        let fx = stick.x * self.speed * secs + self.remainder.0;
        let fy = -stick.y * self.speed * secs + self.remainder.1;
        let (dx, dy) = (fx.trunc(), fy.trunc());
        self.remainder = (fx - dx, fy - dy);
        if dx == 0.0 && dy == 0.0 {
            None
        } else {
            Some((dx as i32, dy as i32))
        }
    }
}

/// Registers observers for every binding in `config`.
pub fn install(gamepad: &mut Gamepad<ActionQueue>, config: &Config) -> Vec<Subscription> {
    let mut subscriptions = Vec::with_capacity(config.buttons.len() * 2 + 1);

    if let Some(pointer) = config.pointer {
        subscriptions.push(install_pointer(gamepad, pointer));
    }

    for (&button, binding) in &config.buttons {
        match binding {
            Binding::Mouse(mouse) => {
                let mouse = *mouse;
                subscriptions.push(gamepad.on_pressed(button, move |queue, _| {
                    queue.push(Action::MousePress(mouse));
                }));
                subscriptions.push(gamepad.on_released(button, move |queue, _| {
                    queue.push(Action::MouseRelease(mouse));
                }));
            }
            Binding::Keystroke { combo, repeat: true } => {
                let combo = combo.clone();
                subscriptions.push(gamepad.on_repeat(
                    button,
                    config.repeat.delay,
                    config.repeat.interval,
                    move |queue, _| queue.push(Action::KeyTap(combo.clone())),
                ));
            }
            Binding::Keystroke {
                combo,
                repeat: false,
            } => {
                let combo = combo.clone();
                subscriptions.push(gamepad.on_pressed(button, move |queue, _| {
                    queue.push(Action::KeyTap(combo.clone()));
                }));
            }
            Binding::Hold(combo) => {
                let (down, up) = (combo.clone(), combo.clone());
                subscriptions.push(gamepad.on_pressed(button, move |queue, _| {
                    queue.push(Action::KeyPress(down.clone()));
                }));
                subscriptions.push(gamepad.on_released(button, move |queue, _| {
                    queue.push(Action::KeyRelease(up.clone()));
                }));
            }
        }
    }
    log::debug!("installed {} observers", subscriptions.len());
    subscriptions
}

fn install_pointer(gamepad: &mut Gamepad<ActionQueue>, pointer: PointerConfig) -> Subscription {
    match pointer.stick {
        StickSide::Left => gamepad.set_left_shape(pointer.shape),
        StickSide::Right => gamepad.set_right_shape(pointer.shape),
    }
    let mut motion = PointerMotion::new(pointer.speed);
    gamepad.on_updated(move |queue, frame: &Frame| {
        let stick = match pointer.stick {
            StickSide::Left => frame.left,
            StickSide::Right => frame.right,
        };
        if let Some((dx, dy)) = motion.step(stick, frame.frame_time) {
            queue.push(Action::MouseMove { dx, dy });
        }
    })
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use crossbeam_channel::{unbounded, Sender};
    use padmouse_control::Key;
    use padmouse_gamepad::{Axis, Button, ControllerEvent};

    use super::*;

    const PAD: u32 = 3;

    fn mapped(config: &Config) -> (Sender<ControllerEvent>, Gamepad<ActionQueue>, Vec<Subscription>) {
        let (tx, rx) = unbounded();
        let mut gamepad = Gamepad::from_events(rx, [PAD]);
        let subs = install(&mut gamepad, config);
        (tx, gamepad, subs)
    }

    fn update(gamepad: &mut Gamepad<ActionQueue>, at: Instant) -> ActionQueue {
        let mut queue = ActionQueue::new();
        gamepad.update_at(&mut queue, at);
        queue
    }

    fn button(tx: &Sender<ControllerEvent>, button: Button, pressed: bool) {
        let event = if pressed {
            ControllerEvent::ButtonPressed { id: PAD, button }
        } else {
            ControllerEvent::ButtonReleased { id: PAD, button }
        };
        tx.send(event).unwrap();
    }

    #[test]
    fn pointer_carries_sub_pixel_remainder() {
        let mut motion = PointerMotion::new(6.0);
        let stick = StickPosition { x: 0.5, y: 0.0 };
        let frame = Duration::from_millis(250);
        assert_eq!(motion.step(stick, frame), None);
        assert_eq!(motion.step(stick, frame), Some((1, 0)));
        assert_eq!(motion.step(stick, frame), Some((1, 0)));
        assert_eq!(motion.step(stick, frame), Some((1, 0)));
    }

    #[test]
    fn pointer_resets_remainder_at_rest() {
        let mut motion = PointerMotion::new(6.0);
        let frame = Duration::from_millis(250);
        assert_eq!(motion.step(StickPosition { x: 0.5, y: 0.0 }, frame), None);
        assert_eq!(motion.step(StickPosition::default(), frame), None);
        assert_eq!(motion.step(StickPosition { x: 0.5, y: 0.0 }, frame), None);
    }

    #[test]
    fn pointer_up_moves_screen_up() {
        let mut motion = PointerMotion::new(100.0);
        let step = motion.step(StickPosition { x: -0.5, y: 0.5 }, Duration::from_millis(500));
        assert_eq!(step, Some((-25, -25)));
    }

    #[test]
    fn mouse_buttons_follow_press_and_release() {
        let (tx, mut pad, _subs) = mapped(&Config::default());
        let t0 = Instant::now();
        button(&tx, Button::A, true);
        assert_eq!(update(&mut pad, t0), vec![Action::MousePress(MouseButton::Left)]);
        button(&tx, Button::A, false);
        button(&tx, Button::X, true);
        assert_eq!(
            update(&mut pad, t0 + Duration::from_millis(16)),
            vec![
                Action::MouseRelease(MouseButton::Left),
                Action::MousePress(MouseButton::Right),
            ]
        );
    }

    #[test]
    fn escape_taps_once_while_held() {
        let (tx, mut pad, _subs) = mapped(&Config::default());
        let t0 = Instant::now();
        button(&tx, Button::B, true);
        let escape = Action::KeyTap(KeyCombo::from_key(Key::Escape));
        assert_eq!(update(&mut pad, t0), vec![escape]);
        assert!(update(&mut pad, t0 + Duration::from_secs(2)).is_empty());
    }

    #[test]
    fn dpad_repeats_after_delay() {
        let (tx, mut pad, _subs) = mapped(&Config::default());
        let up = Action::KeyTap(KeyCombo::from_key(Key::UpArrow));
        let t0 = Instant::now();
        button(&tx, Button::DPadUp, true);
        assert_eq!(update(&mut pad, t0), vec![up.clone()]);
        assert!(update(&mut pad, t0 + Duration::from_millis(200)).is_empty());
        assert_eq!(update(&mut pad, t0 + Duration::from_millis(350)), vec![up.clone()]);
        assert!(update(&mut pad, t0 + Duration::from_millis(400)).is_empty());
        assert_eq!(update(&mut pad, t0 + Duration::from_millis(440)), vec![up]);
        button(&tx, Button::DPadUp, false);
        assert!(update(&mut pad, t0 + Duration::from_millis(600)).is_empty());
    }

    #[test]
    fn stick_drives_pointer_with_frame_time() {
        let mut config = Config::default();
        config.buttons.clear();
        if let Some(pointer) = config.pointer.as_mut() {
            pointer.speed = 1000.0;
        }
        let (tx, mut pad, _subs) = mapped(&config);
        tx.send(ControllerEvent::AxisMotion {
            id: PAD,
            axis: Axis::LeftX,
            value: 1.0,
        })
        .unwrap();
        let t0 = Instant::now();
        // First frame has no elapsed time yet.
        assert!(update(&mut pad, t0).is_empty());
        assert_eq!(
            update(&mut pad, t0 + Duration::from_millis(250)),
            vec![Action::MouseMove { dx: 250, dy: 0 }]
        );
    }

    #[test]
    fn disabled_pointer_ignores_stick() {
        let mut config = Config::default();
        config.pointer = None;
        let (tx, mut pad, subs) = mapped(&config);
        assert_eq!(subs.len(), 13);
        tx.send(ControllerEvent::AxisMotion {
            id: PAD,
            axis: Axis::LeftX,
            value: 1.0,
        })
        .unwrap();
        let t0 = Instant::now();
        update(&mut pad, t0);
        assert!(update(&mut pad, t0 + Duration::from_millis(100)).is_empty());
    }

    #[test]
    fn hold_binding_presses_until_release() {
        let mut config = Config::default();
        let shift: KeyCombo = "shift".parse().unwrap();
        config.buttons.insert(Button::RightTrigger, Binding::Hold(shift.clone()));
        let (tx, mut pad, _subs) = mapped(&config);
        let t0 = Instant::now();
        button(&tx, Button::RightTrigger, true);
        assert_eq!(update(&mut pad, t0), vec![Action::KeyPress(shift.clone())]);
        assert!(update(&mut pad, t0 + Duration::from_secs(1)).is_empty());
        button(&tx, Button::RightTrigger, false);
        assert_eq!(
            update(&mut pad, t0 + Duration::from_millis(1100)),
            vec![Action::KeyRelease(shift)]
        );
    }

    #[test]
    fn unsubscribed_binding_goes_quiet() {
        let mut config = Config::default();
        config.pointer = None;
        config.buttons.retain(|b, _| *b == Button::B);
        let (tx, mut pad, subs) = mapped(&config);
        assert_eq!(subs.len(), 1);
        subs[0].unsubscribe();
        button(&tx, Button::B, true);
        assert!(update(&mut pad, Instant::now()).is_empty());
    }
}
