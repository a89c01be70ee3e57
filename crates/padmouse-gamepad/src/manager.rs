use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use ahash::AHashMap;
use crossbeam_channel::{bounded, unbounded, RecvTimeoutError, Sender};

use crate::error::{Error, Result};
use crate::events::{ControllerEvent, EventReceiver};
use crate::runtime::start_runtime_thread;
use crate::types::{ControllerId, ControllerInfo};

/// Shared state used by the manager and the runtime thread.
pub(crate) struct Inner {
    pub(crate) subscribers: Mutex<Vec<Sender<ControllerEvent>>>,
    pub(crate) controllers: RwLock<AHashMap<ControllerId, ControllerInfo>>,
}

/// Manager responsible for discovering controllers and emitting events.
///
/// Clones share the same runtime thread, which stops once the last clone
/// is dropped.
#[derive(Clone)]
pub struct ControllerManager {
    inner: Arc<Inner>,
    _stop: Sender<()>,
}

impl ControllerManager {
    /// Creates a new manager and starts the background runtime thread.
    /// Blocks briefly until the initial device enumeration completes (up to 1s).
    pub fn new() -> Result<Self> {
        let inner = Arc::new(Inner {
            subscribers: Mutex::new(Vec::new()),
            controllers: RwLock::new(AHashMap::new()),
        });
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let (ready_tx, ready_rx) = bounded(1);
        start_runtime_thread(Arc::clone(&inner), stop_rx, ready_tx)?;

        match ready_rx.recv_timeout(Duration::from_secs(1)) {
            Ok(Ok(())) | Err(RecvTimeoutError::Timeout) => {}
            Ok(Err(reason)) => return Err(Error::BackendInit(reason)),
            Err(RecvTimeoutError::Disconnected) => {
                return Err(Error::BackendInit("runtime thread exited".into()));
            }
        }

        Ok(Self {
            inner,
            _stop: stop_tx,
        })
    }

    /// Subscribes to controller events. Dropped subscribers are cleaned automatically.
    pub fn subscribe(&self) -> EventReceiver {
        let (tx, rx) = unbounded();
        if let Ok(mut subs) = self.inner.subscribers.lock() {
            subs.push(tx);
        }
        rx
    }

    /// Returns a snapshot of currently known controllers, ordered by id.
    pub fn controllers(&self) -> Vec<ControllerInfo> {
        let Ok(map) = self.inner.controllers.read() else {
            return Vec::new();
        };
        let mut list: Vec<ControllerInfo> = map.values().cloned().collect();
        list.sort_by_key(|info| info.id);
        list
    }

    /// Returns the controller with the lowest id, if any is connected.
    pub fn first_connected(&self) -> Option<ControllerInfo> {
        self.controllers().into_iter().next()
    }
}
