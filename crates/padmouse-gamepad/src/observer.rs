use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::pad::Frame;
use crate::types::Button;

pub(crate) type ButtonHandler<C> = Box<dyn FnMut(&mut C, Button) + Send>;
pub(crate) type FrameHandler<C> = Box<dyn FnMut(&mut C, &Frame) + Send>;

/// Handle returned by observer registration.
///
/// Dropping the handle keeps the observer registered; call
/// [`Subscription::unsubscribe`] to remove it. Removal takes effect on the
/// next gamepad update and may be requested from any thread.
#[derive(Debug, Clone)]
pub struct Subscription {
    active: Arc<AtomicBool>,
}

impl Subscription {
    fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn unsubscribe(&self) {
        self.active.store(false, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Edge {
    Pressed,
    Released,
}

struct ButtonObserver<C> {
    sub: Subscription,
    button: Button,
    edge: Edge,
    handler: ButtonHandler<C>,
}

struct FrameObserver<C> {
    sub: Subscription,
    handler: FrameHandler<C>,
}

struct RepeatState {
    last_fire: Instant,
    delay_done: bool,
}

struct RepeatObserver<C> {
    sub: Subscription,
    button: Button,
    delay: Duration,
    interval: Duration,
    held: Option<RepeatState>,
    handler: ButtonHandler<C>,
}

/// Registered observers of a [`Gamepad`](crate::Gamepad).
pub(crate) struct Observers<C> {
    buttons: Vec<ButtonObserver<C>>,
    frames: Vec<FrameObserver<C>>,
    repeats: Vec<RepeatObserver<C>>,
}

impl<C> Default for Observers<C> {
    fn default() -> Self {
        Self {
            buttons: Vec::new(),
            frames: Vec::new(),
            repeats: Vec::new(),
        }
    }
}

impl<C> Observers<C> {
    pub(crate) fn add_button(
        &mut self,
        button: Button,
        edge: Edge,
        handler: ButtonHandler<C>,
    ) -> Subscription {
        let sub = Subscription::new();
        self.buttons.push(ButtonObserver {
            sub: sub.clone(),
            button,
            edge,
            handler,
        });
        sub
    }

    pub(crate) fn add_frame(&mut self, handler: FrameHandler<C>) -> Subscription {
        let sub = Subscription::new();
        self.frames.push(FrameObserver {
            sub: sub.clone(),
            handler,
        });
        sub
    }

    pub(crate) fn add_repeat(
        &mut self,
        button: Button,
        delay: Duration,
        interval: Duration,
        handler: ButtonHandler<C>,
    ) -> Subscription {
        let sub = Subscription::new();
        self.repeats.push(RepeatObserver {
            sub: sub.clone(),
            button,
            delay,
            interval,
            held: None,
            handler,
        });
        sub
    }

    /// Drops observers whose subscription was cancelled.
    pub(crate) fn prune(&mut self) {
        self.buttons.retain(|o| o.sub.is_active());
        self.frames.retain(|o| o.sub.is_active());
        self.repeats.retain(|o| o.sub.is_active());
    }

    pub(crate) fn len(&self) -> usize {
        self.buttons.len() + self.frames.len() + self.repeats.len()
    }

    pub(crate) fn on_edge(&mut self, ctx: &mut C, button: Button, edge: Edge, now: Instant) {
        for o in &mut self.buttons {
            if o.button == button && o.edge == edge && o.sub.is_active() {
                (o.handler)(ctx, button);
            }
        }
        for o in &mut self.repeats {
            if o.button != button || !o.sub.is_active() {
                continue;
            }
            match edge {
                Edge::Pressed => {
                    o.held = Some(RepeatState {
                        last_fire: now,
                        delay_done: false,
                    });
                    (o.handler)(ctx, button);
                }
                Edge::Released => o.held = None,
            }
        }
    }

    pub(crate) fn on_frame(&mut self, ctx: &mut C, frame: &Frame) {
        for o in &mut self.frames {
            if o.sub.is_active() {
                (o.handler)(ctx, frame);
            }
        }
    }

    /// Fires held-button repeats that are due at `now`.
    pub(crate) fn drive_repeats(&mut self, ctx: &mut C, now: Instant) {
        for o in &mut self.repeats {
            if !o.sub.is_active() {
                continue;
            }
            let Some(held) = o.held.as_mut() else {
                continue;
            };
            let due = if held.delay_done { o.interval } else { o.delay };
            if now.saturating_duration_since(held.last_fire) >= due {
                held.last_fire = now;
                held.delay_done = true;
                (o.handler)(ctx, o.button);
            }
        }
    }
}
