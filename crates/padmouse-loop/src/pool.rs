use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, select, Receiver, Sender, TrySendError};

use crate::input_loop::Shared;
use crate::{Error, Result};

/// A panic raised by the update callback and caught by a tick worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickFault {
    /// Name of the worker thread that ran the failing tick.
    pub thread: String,
    /// The panic message, if it was a string.
    pub message: String,
}

impl TickFault {
    fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "update callback panicked".to_string()
        };
        let thread = thread::current().name().unwrap_or("<unnamed>").to_string();
        Self { thread, message }
    }
}

pub(crate) struct PoolConfig {
    pub(crate) name: String,
    pub(crate) period: Duration,
    pub(crate) workers: usize,
    pub(crate) faults: Option<Sender<TickFault>>,
}

/// Spawns the timer thread and the workers it feeds.
///
/// The job channel has no buffer: a tick is handed over only if some worker
/// is idle at that instant, otherwise it is dropped. Every spawned thread
/// keeps a clone of `done` until it exits.
pub(crate) fn start_pool(
    shared: &Arc<Shared>,
    config: PoolConfig,
    stop: Receiver<()>,
    done: Sender<()>,
) -> Result<()> {
    let (jobs_tx, jobs_rx) = bounded::<()>(0);

    for index in 0..config.workers {
        let shared = Arc::clone(shared);
        let jobs_rx = jobs_rx.clone();
        let faults = config.faults.clone();
        let done = done.clone();
        thread::Builder::new()
            .name(format!("{}-worker-{index}", config.name))
            .spawn(move || {
                let _done = done;
                run_worker(&shared, &jobs_rx, faults.as_ref());
            })
            .map_err(|e| Error::Spawn(e.to_string()))?;
    }

    let period = config.period;
    thread::Builder::new()
        .name(format!("{}-timer", config.name))
        .spawn(move || {
            let _done = done;
            run_timer(period, &stop, &jobs_tx);
        })
        .map_err(|e| Error::Spawn(e.to_string()))?;

    Ok(())
}

fn run_timer(period: Duration, stop: &Receiver<()>, jobs: &Sender<()>) {
    let ticker = crossbeam_channel::tick(period);
    // First tick fires right away, as soon as a worker is up.
    select! {
        recv(stop) -> _ => return,
        send(jobs, ()) -> sent => {
            if sent.is_err() {
                return;
            }
        }
    }
    loop {
        select! {
            recv(stop) -> _ => break,
            recv(ticker) -> _ => {
                if !dispatch(jobs) {
                    break;
                }
            }
        }
    }
}

fn dispatch(jobs: &Sender<()>) -> bool {
    match jobs.try_send(()) {
        Ok(()) | Err(TrySendError::Full(())) => true,
        Err(TrySendError::Disconnected(())) => false,
    }
}

fn run_worker(shared: &Shared, jobs: &Receiver<()>, faults: Option<&Sender<TickFault>>) {
    while jobs.recv().is_ok() {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| shared.tick()));
        if let Err(payload) = outcome {
            // With no fault channel the panic hook has already reported it.
            if let Some(faults) = faults {
                let _ = faults.send(TickFault::from_panic(payload.as_ref()));
            }
        }
    }
}
