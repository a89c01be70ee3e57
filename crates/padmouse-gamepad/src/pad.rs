use std::time::{Duration, Instant};

use crate::events::{ControllerEvent, EventReceiver};
use crate::manager::ControllerManager;
use crate::observer::{Edge, Observers, Subscription};
use crate::stick::{StickPosition, StickShape};
use crate::types::{Axis, Button, ButtonSet, ControllerId};

/// Snapshot handed to `on_updated` observers once per update.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Frame {
    pub connected: bool,
    pub left: StickPosition,
    pub right: StickPosition,
    pub left_trigger: f32,
    pub right_trigger: f32,
    /// Time since the previous update.
    pub frame_time: Duration,
}

/// Polled view of a single controller.
///
/// The gamepad is not synchronized: it is meant to be owned by one update
/// loop callback and only touched from there. Observers receive a caller
/// supplied context `C`, which is where they put their side effects.
pub struct Gamepad<C> {
    events: EventReceiver,
    known: Vec<ControllerId>,
    device: Option<ControllerId>,
    pressed: ButtonSet,
    axes: [f32; 6],
    left_shape: StickShape,
    right_shape: StickShape,
    last_update: Option<Instant>,
    frame_time: Duration,
    observers: Observers<C>,
}

impl<C> Gamepad<C> {
    /// Subscribes to `manager` and adopts the first connected controller.
    pub fn new(manager: &ControllerManager) -> Self {
        let events = manager.subscribe();
        let known = manager.controllers().into_iter().map(|info| info.id);
        Self::from_events(events, known)
    }

    /// Builds a gamepad over an event stream, with `known` controllers
    /// already connected.
    pub fn from_events(
        events: EventReceiver,
        known: impl IntoIterator<Item = ControllerId>,
    ) -> Self {
        let mut known: Vec<ControllerId> = known.into_iter().collect();
        known.sort_unstable();
        known.dedup();
        Self {
            events,
            device: known.first().copied(),
            known,
            pressed: ButtonSet::empty(),
            axes: [0.0; 6],
            left_shape: StickShape::LINEAR,
            right_shape: StickShape::LINEAR,
            last_update: None,
            frame_time: Duration::ZERO,
            observers: Observers::default(),
        }
    }

    pub fn device(&self) -> Option<ControllerId> {
        self.device
    }

    pub fn is_connected(&self) -> bool {
        self.device.is_some()
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        self.pressed.contains(button)
    }

    pub fn pressed(&self) -> ButtonSet {
        self.pressed
    }

    pub fn frame_time(&self) -> Duration {
        self.frame_time
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn set_left_shape(&mut self, shape: StickShape) {
        self.left_shape = shape;
    }

    pub fn set_right_shape(&mut self, shape: StickShape) {
        self.right_shape = shape;
    }

    /// Calls `handler` when `button` goes down.
    pub fn on_pressed<F>(&mut self, button: Button, handler: F) -> Subscription
    where
        F: FnMut(&mut C, Button) + Send + 'static,
    {
        self.observers
            .add_button(button, Edge::Pressed, Box::new(handler))
    }

    /// Calls `handler` when `button` goes up.
    pub fn on_released<F>(&mut self, button: Button, handler: F) -> Subscription
    where
        F: FnMut(&mut C, Button) + Send + 'static,
    {
        self.observers
            .add_button(button, Edge::Released, Box::new(handler))
    }

    /// Calls `handler` at the end of every update.
    pub fn on_updated<F>(&mut self, handler: F) -> Subscription
    where
        F: FnMut(&mut C, &Frame) + Send + 'static,
    {
        self.observers.add_frame(Box::new(handler))
    }

    /// Calls `handler` when `button` goes down, again after `delay` if it is
    /// still held, and then every `interval` until it is released.
    pub fn on_repeat<F>(
        &mut self,
        button: Button,
        delay: Duration,
        interval: Duration,
        handler: F,
    ) -> Subscription
    where
        F: FnMut(&mut C, Button) + Send + 'static,
    {
        self.observers
            .add_repeat(button, delay, interval, Box::new(handler))
    }

    pub fn update(&mut self, ctx: &mut C) {
        self.update_at(ctx, Instant::now());
    }

    /// Drains pending controller events and notifies observers as of `now`.
    pub fn update_at(&mut self, ctx: &mut C, now: Instant) {
        self.frame_time = self
            .last_update
            .map_or(Duration::ZERO, |last| now.saturating_duration_since(last));
        self.last_update = Some(now);
        self.observers.prune();

        while let Ok(event) = self.events.try_recv() {
            self.apply(ctx, event, now);
        }

        if self.device.is_none() {
            self.device = self.known.first().copied();
            if let Some(id) = self.device {
                log::debug!("gamepad attached to controller {id}");
            }
        }

        let frame = self.frame();
        self.observers.on_frame(ctx, &frame);
        self.observers.drive_repeats(ctx, now);
    }

    fn apply(&mut self, ctx: &mut C, event: ControllerEvent, now: Instant) {
        match event {
            ControllerEvent::Connected(info) => {
                if !self.known.contains(&info.id) {
                    self.known.push(info.id);
                }
            }
            ControllerEvent::Disconnected(id) => {
                self.known.retain(|known| *known != id);
                if self.device == Some(id) {
                    log::debug!("gamepad lost controller {id}");
                    self.release_all(ctx, now);
                    self.axes = [0.0; 6];
                    self.device = None;
                }
            }
            ControllerEvent::ButtonPressed { id, button } => {
                if self.device == Some(id) && self.pressed.insert(button) {
                    self.observers.on_edge(ctx, button, Edge::Pressed, now);
                }
            }
            ControllerEvent::ButtonReleased { id, button } => {
                if self.device == Some(id) && self.pressed.remove(button) {
                    self.observers.on_edge(ctx, button, Edge::Released, now);
                }
            }
            ControllerEvent::AxisMotion { id, axis, value } => {
                if self.device == Some(id) {
                    self.axes[axis.index()] = value;
                }
            }
        }
    }

    fn release_all(&mut self, ctx: &mut C, now: Instant) {
        let held = self.pressed;
        self.pressed = ButtonSet::empty();
        for button in held.iter() {
            self.observers.on_edge(ctx, button, Edge::Released, now);
        }
    }

    fn frame(&self) -> Frame {
        let axis = |a: Axis| self.axes[a.index()];
        // SDL reports Y growing downward.
        Frame {
            connected: self.device.is_some(),
            left: self.left_shape.apply(axis(Axis::LeftX), -axis(Axis::LeftY)),
            right: self
                .right_shape
                .apply(axis(Axis::RightX), -axis(Axis::RightY)),
            left_trigger: axis(Axis::LeftTrigger),
            right_trigger: axis(Axis::RightTrigger),
            frame_time: self.frame_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use crossbeam_channel::{unbounded, Sender};

    use super::*;
    use crate::types::ControllerInfo;

    type Log = Vec<String>;

    fn pad(known: &[ControllerId]) -> (Sender<ControllerEvent>, Gamepad<Log>) {
        let (tx, rx) = unbounded();
        (tx, Gamepad::from_events(rx, known.iter().copied()))
    }

    fn press(tx: &Sender<ControllerEvent>, id: ControllerId, button: Button) {
        tx.send(ControllerEvent::ButtonPressed { id, button }).unwrap();
    }

    fn release(tx: &Sender<ControllerEvent>, id: ControllerId, button: Button) {
        tx.send(ControllerEvent::ButtonReleased { id, button }).unwrap();
    }

    #[test]
    fn adopts_first_known_controller() {
        let (_tx, pad) = pad(&[7, 3]);
        assert_eq!(pad.device(), Some(3));
    }

    #[test]
    fn adopts_controller_connected_later() {
        let (tx, mut pad) = pad(&[]);
        let mut log = Log::new();
        pad.update(&mut log);
        assert!(!pad.is_connected());

        tx.send(ControllerEvent::Connected(ControllerInfo {
            id: 4,
            name: "pad".into(),
            vendor_id: 0,
            product_id: 0,
        }))
        .unwrap();
        pad.update(&mut log);
        assert_eq!(pad.device(), Some(4));
    }

    #[test]
    fn press_and_release_reach_observers() {
        let (tx, mut pad) = pad(&[1]);
        pad.on_pressed(Button::A, |log: &mut Log, b| log.push(format!("down {b:?}")));
        pad.on_released(Button::A, |log: &mut Log, b| log.push(format!("up {b:?}")));

        let mut log = Log::new();
        press(&tx, 1, Button::A);
        press(&tx, 1, Button::A);
        pad.update(&mut log);
        assert!(pad.is_pressed(Button::A));
        release(&tx, 1, Button::A);
        pad.update(&mut log);

        assert_eq!(log, vec!["down A", "up A"]);
    }

    #[test]
    fn events_from_other_controllers_are_ignored() {
        let (tx, mut pad) = pad(&[1, 2]);
        pad.on_pressed(Button::B, |log: &mut Log, _| log.push("b".into()));
        let mut log = Log::new();
        press(&tx, 2, Button::B);
        pad.update(&mut log);
        assert!(log.is_empty());
    }

    #[test]
    fn disconnect_releases_held_buttons_and_switches_device() {
        let (tx, mut pad) = pad(&[1, 2]);
        pad.on_released(Button::X, |log: &mut Log, _| log.push("x up".into()));
        let mut log = Log::new();
        press(&tx, 1, Button::X);
        pad.update(&mut log);

        tx.send(ControllerEvent::Disconnected(1)).unwrap();
        pad.update(&mut log);

        assert_eq!(log, vec!["x up"]);
        assert!(!pad.is_pressed(Button::X));
        assert_eq!(pad.device(), Some(2));
    }

    #[test]
    fn repeat_fires_after_delay_then_every_interval() {
        let (tx, mut pad) = pad(&[1]);
        pad.on_repeat(
            Button::DPadUp,
            Duration::from_millis(350),
            Duration::from_millis(90),
            |log: &mut Log, _| log.push("up".into()),
        );
        let start = Instant::now();
        let at = |ms: u64| start + Duration::from_millis(ms);
        let mut log = Log::new();

        press(&tx, 1, Button::DPadUp);
        pad.update_at(&mut log, at(0));
        assert_eq!(log.len(), 1);

        pad.update_at(&mut log, at(300));
        assert_eq!(log.len(), 1);
        pad.update_at(&mut log, at(350));
        assert_eq!(log.len(), 2);
        pad.update_at(&mut log, at(400));
        assert_eq!(log.len(), 2);
        pad.update_at(&mut log, at(440));
        assert_eq!(log.len(), 3);

        release(&tx, 1, Button::DPadUp);
        pad.update_at(&mut log, at(600));
        pad.update_at(&mut log, at(900));
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn unsubscribed_observer_stops_firing() {
        let (tx, mut pad) = pad(&[1]);
        let sub = pad.on_pressed(Button::Y, |log: &mut Log, _| log.push("y".into()));
        let mut log = Log::new();

        press(&tx, 1, Button::Y);
        pad.update(&mut log);
        release(&tx, 1, Button::Y);
        sub.unsubscribe();
        press(&tx, 1, Button::Y);
        pad.update(&mut log);

        assert_eq!(log, vec!["y"]);
        assert!(!sub.is_active());
        pad.update(&mut log);
        assert_eq!(pad.observer_count(), 0);
    }

    #[test]
    fn frame_reports_shaped_sticks_and_frame_time() {
        let (tx, mut pad) = pad(&[1]);
        pad.set_left_shape(StickShape {
            inner_deadzone: 0.2,
            curve: 1.0,
        });
        let frames = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let frames_c = std::sync::Arc::clone(&frames);
        pad.on_updated(move |_: &mut Log, frame| frames_c.lock().unwrap().push(*frame));

        let start = Instant::now();
        let mut log = Log::new();
        pad.update_at(&mut log, start);
        tx.send(ControllerEvent::AxisMotion { id: 1, axis: Axis::LeftY, value: -1.0 })
            .unwrap();
        tx.send(ControllerEvent::AxisMotion { id: 1, axis: Axis::LeftX, value: 0.1 })
            .unwrap();
        pad.update_at(&mut log, start + Duration::from_millis(16));

        let frames = frames.lock().unwrap();
        assert_eq!(frames.len(), 2);
        assert!(!frames[0].left.is_pushed());
        assert_eq!(frames[1].frame_time, Duration::from_millis(16));
        assert!(frames[1].left.y > 0.9);
        assert!(frames[1].connected);
    }
}
