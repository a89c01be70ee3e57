use std::sync::Arc;
use std::thread;

use ahash::AHashMap;
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use sdl2::controller::{Axis as SdlAxis, Button as SdlButton, GameController};
use sdl2::event::Event;
use sdl2::GameControllerSubsystem;

use crate::error::{Error, Result};
use crate::events::ControllerEvent;
use crate::manager::Inner;
use crate::types::{Axis, Button, ControllerId, ControllerInfo};

/// Trigger travel past which the trigger also reports as a pressed button.
const TRIGGER_THRESHOLD: i16 = 20000;

/// Milliseconds to block on the SDL event queue per iteration.
const WAIT_MS: u32 = 10;

type Ready = Sender<std::result::Result<(), String>>;

/// Starts the SDL2-backed runtime thread that drives device discovery and events.
/// The thread exits once every sender of `stop` is gone.
pub(crate) fn start_runtime_thread(
    inner: Arc<Inner>,
    stop: Receiver<()>,
    ready: Ready,
) -> Result<()> {
    thread::Builder::new()
        .name("padmouse-sdl".into())
        .spawn(move || run(&inner, &stop, &ready))
        .map(|_| ())
        .map_err(|e| Error::BackendInit(e.to_string()))
}

fn run(inner: &Inner, stop: &Receiver<()>, ready: &Ready) {
    // SDL must live entirely within this thread
    let init = sdl2::init().and_then(|ctx| {
        let controllers = ctx.game_controller()?;
        let pump = ctx.event_pump()?;
        Ok((ctx, controllers, pump))
    });
    let (_sdl, subsystem, mut event_pump) = match init {
        Ok(parts) => parts,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    let mut devices = Devices::default();
    match subsystem.num_joysticks() {
        Ok(count) => {
            for index in 0..count {
                if subsystem.is_game_controller(index) {
                    devices.open(inner, &subsystem, index);
                }
            }
        }
        Err(e) => log::debug!("joystick enumeration failed: {e}"),
    }
    let _ = ready.send(Ok(()));

    loop {
        match stop.try_recv() {
            Err(TryRecvError::Empty) => {}
            Ok(()) | Err(TryRecvError::Disconnected) => break,
        }
        // Wait for an SDL event or timeout to reduce idle CPU usage
        if let Some(event) = event_pump.wait_event_timeout(WAIT_MS) {
            devices.handle(inner, &subsystem, event);
            for event in event_pump.poll_iter() {
                devices.handle(inner, &subsystem, event);
            }
        }
    }
    log::debug!("controller runtime stopped");
}

/// Open controllers and per-device trigger latch, owned by the runtime thread.
#[derive(Default)]
struct Devices {
    controllers: AHashMap<ControllerId, GameController>,
    triggers: AHashMap<ControllerId, (bool, bool)>,
}

impl Devices {
    fn open(&mut self, inner: &Inner, subsystem: &GameControllerSubsystem, index: u32) {
        let controller = match subsystem.open(index) {
            Ok(controller) => controller,
            Err(e) => {
                log::debug!("failed to open controller {index}: {e}");
                return;
            }
        };
        let id: ControllerId = controller.instance_id();
        if self.controllers.contains_key(&id) {
            return;
        }
        let info = ControllerInfo {
            id,
            name: controller.name(),
            vendor_id: controller.vendor_id().unwrap_or(0),
            product_id: controller.product_id().unwrap_or(0),
        };
        self.controllers.insert(id, controller);
        if let Ok(mut map) = inner.controllers.write() {
            map.insert(id, info.clone());
        }
        broadcast(inner, ControllerEvent::Connected(info));
    }

    fn close(&mut self, inner: &Inner, id: ControllerId) {
        self.controllers.remove(&id);
        self.triggers.remove(&id);
        if let Ok(mut map) = inner.controllers.write() {
            map.remove(&id);
        }
        broadcast(inner, ControllerEvent::Disconnected(id));
    }

    fn handle(&mut self, inner: &Inner, subsystem: &GameControllerSubsystem, event: Event) {
        match event {
            Event::ControllerDeviceAdded { which, .. } => self.open(inner, subsystem, which),
            Event::ControllerDeviceRemoved { which, .. } => self.close(inner, which),
            Event::ControllerButtonDown { which, button, .. } => {
                if let Some(button) = map_sdl_button(button) {
                    broadcast(inner, ControllerEvent::ButtonPressed { id: which, button });
                }
            }
            Event::ControllerButtonUp { which, button, .. } => {
                if let Some(button) = map_sdl_button(button) {
                    broadcast(inner, ControllerEvent::ButtonReleased { id: which, button });
                }
            }
            Event::ControllerAxisMotion {
                which, axis, value, ..
            } => self.axis(inner, which, axis, value),
            _ => {}
        }
    }

    fn axis(&mut self, inner: &Inner, id: ControllerId, axis: SdlAxis, value: i16) {
        let mapped = map_sdl_axis(axis);
        broadcast(
            inner,
            ControllerEvent::AxisMotion {
                id,
                axis: mapped,
                value: f32::from(value) / f32::from(i16::MAX),
            },
        );

        // Triggers double as buttons past the threshold.
        let latch = self.triggers.entry(id).or_insert((false, false));
        let (held, button) = match mapped {
            Axis::LeftTrigger => (&mut latch.0, Button::LeftTrigger),
            Axis::RightTrigger => (&mut latch.1, Button::RightTrigger),
            _ => return,
        };
        let pressed = value > TRIGGER_THRESHOLD;
        if pressed == *held {
            return;
        }
        *held = pressed;
        let event = if pressed {
            ControllerEvent::ButtonPressed { id, button }
        } else {
            ControllerEvent::ButtonReleased { id, button }
        };
        broadcast(inner, event);
    }
}

fn map_sdl_button(button: SdlButton) -> Option<Button> {
    Some(match button {
        SdlButton::A => Button::A,
        SdlButton::B => Button::B,
        SdlButton::X => Button::X,
        SdlButton::Y => Button::Y,
        SdlButton::Back => Button::Back,
        SdlButton::Guide => Button::Guide,
        SdlButton::Start => Button::Start,
        SdlButton::LeftStick => Button::LeftStick,
        SdlButton::RightStick => Button::RightStick,
        SdlButton::LeftShoulder => Button::LeftShoulder,
        SdlButton::RightShoulder => Button::RightShoulder,
        SdlButton::DPadUp => Button::DPadUp,
        SdlButton::DPadDown => Button::DPadDown,
        SdlButton::DPadLeft => Button::DPadLeft,
        SdlButton::DPadRight => Button::DPadRight,
        _ => return None,
    })
}

fn map_sdl_axis(axis: SdlAxis) -> Axis {
    match axis {
        SdlAxis::LeftX => Axis::LeftX,
        SdlAxis::LeftY => Axis::LeftY,
        SdlAxis::RightX => Axis::RightX,
        SdlAxis::RightY => Axis::RightY,
        SdlAxis::TriggerLeft => Axis::LeftTrigger,
        SdlAxis::TriggerRight => Axis::RightTrigger,
    }
}

fn broadcast(inner: &Inner, event: ControllerEvent) {
    if let Ok(mut subs) = inner.subscribers.lock() {
        subs.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
