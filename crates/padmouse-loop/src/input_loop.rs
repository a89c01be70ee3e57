use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::pool::{start_pool, PoolConfig, TickFault};
use crate::shutdown::Shutdown;
use crate::watch::{LoopWatch, Stopwatch};
use crate::{Error, Result, DEFAULT_FREQUENCY};

const DEFAULT_WORKERS: usize = 2;
const DEFAULT_NAME: &str = "input-loop";

/// Lifecycle of an [`InputLoop`]. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Built but not started yet.
    Idle,
    /// Timer armed, ticks are running.
    Active,
    /// Disposal has begun; no new invocation may start.
    Disposing,
    /// Terminal.
    Disposed,
}

impl LoopState {
    const IDLE: u8 = 0;
    const ACTIVE: u8 = 1;
    const DISPOSING: u8 = 2;
    const DISPOSED: u8 = 3;

    fn from_u8(value: u8) -> Self {
        match value {
            Self::IDLE => LoopState::Idle,
            Self::ACTIVE => LoopState::Active,
            Self::DISPOSING => LoopState::Disposing,
            _ => LoopState::Disposed,
        }
    }
}

/// Nominal tick period for `frequency` iterations per second.
///
/// Whole milliseconds, truncated: anything above 1000 Hz becomes a zero
/// period and the timer fires as fast as it can.
pub fn tick_period(frequency: u32) -> Duration {
    Duration::from_millis(u64::from(1000 / frequency.max(1)))
}

struct Exclusive {
    callback: Box<dyn FnMut() + Send>,
    watch: Box<dyn LoopWatch>,
}

/// State shared between the loop handle and its worker threads.
pub(crate) struct Shared {
    busy: AtomicBool,
    state: AtomicU8,
    iteration_nanos: AtomicU64,
    exclusive: UnsafeCell<Exclusive>,
}

// SAFETY: `exclusive` is only dereferenced by `Shared::tick` while the busy
// flag is held, which a single thread can own at a time. Everything else is
// atomic.
unsafe impl Sync for Shared {}

/// Releases the busy flag when dropped, including during unwinding.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Shared {
    fn accepts_ticks(&self) -> bool {
        self.state.load(Ordering::Acquire) <= LoopState::ACTIVE
    }

    /// Runs the callback unless another invocation is in flight.
    /// Returns true if the callback was invoked.
    pub(crate) fn tick(&self) -> bool {
        if !self.accepts_ticks() {
            return false;
        }
        let Some(_busy) = BusyGuard::try_acquire(&self.busy) else {
            return false;
        };
        // Disposal may have begun while we were acquiring.
        if !self.accepts_ticks() {
            return false;
        }

        // SAFETY: the busy guard is held for the rest of this scope.
        let exclusive = unsafe { &mut *self.exclusive.get() };
        let elapsed = exclusive.watch.get_time();
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.iteration_nanos.store(nanos, Ordering::Release);
        // The watch may take arbitrarily long.
        if !self.accepts_ticks() {
            return false;
        }
        (exclusive.callback)();
        true
    }
}

/// Periodic update loop that never runs its callback concurrently with itself.
///
/// The callback runs on pool threads and may land on a different thread on
/// every tick. Ticks that fire while the previous invocation is still running
/// are dropped.
pub struct InputLoop {
    shared: Arc<Shared>,
    frequency: u32,
    name: String,
    workers: usize,
    faults: Option<Sender<TickFault>>,
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
    done_rx: Receiver<()>,
    done_tx: Option<Sender<()>>,
}

impl InputLoop {
    /// Creates a loop running `callback` at the default 60 Hz and starts it.
    pub fn new<F>(callback: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        Self::builder().on_update(callback).spawn()
    }

    /// Creates a loop running `callback` `frequency` times per second and
    /// starts it.
    pub fn with_frequency<F>(callback: F, frequency: u32) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        Self::builder()
            .on_update(callback)
            .frequency(frequency)
            .spawn()
    }

    /// Starts configuring a loop that is not ticking yet.
    pub fn builder() -> InputLoopBuilder {
        InputLoopBuilder::default()
    }

    /// Arms the timer. Does nothing if the loop is already running.
    pub fn start(&mut self) -> Result<()> {
        let started = self.shared.state.compare_exchange(
            LoopState::IDLE,
            LoopState::ACTIVE,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        match started {
            Ok(_) => {}
            Err(LoopState::ACTIVE) => return Ok(()),
            Err(_) => return Err(Error::Disposed),
        }

        let Some(done_tx) = self.done_tx.take() else {
            return Ok(());
        };
        let config = PoolConfig {
            name: self.name.clone(),
            period: self.period(),
            workers: self.workers,
            faults: self.faults.clone(),
        };
        if let Err(e) = start_pool(&self.shared, config, self.stop_rx.clone(), done_tx) {
            self.dispose();
            return Err(e);
        }
        log::debug!(
            "{} started at {} Hz ({:?} period, {} workers)",
            self.name,
            self.frequency,
            self.period(),
            self.workers
        );
        Ok(())
    }

    /// Runs a single tick on the calling thread under the same rules as the
    /// timer. Returns `Ok(false)` when the tick was dropped because an
    /// invocation is in flight, and `Error::Disposed` once disposal has begun.
    /// A panic from the callback propagates after the busy flag is released.
    pub fn tick(&self) -> Result<bool> {
        if !self.shared.accepts_ticks() {
            return Err(Error::Disposed);
        }
        Ok(self.shared.tick())
    }

    /// Time elapsed between the two most recently started iterations.
    pub fn iteration_time(&self) -> Duration {
        Duration::from_nanos(self.shared.iteration_nanos.load(Ordering::Acquire))
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LoopState {
        LoopState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    /// True once disposal has completed.
    pub fn is_disposed(&self) -> bool {
        self.state() == LoopState::Disposed
    }

    /// Configured iterations per second.
    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    /// Nominal interval between ticks, see [`tick_period`].
    pub fn period(&self) -> Duration {
        tick_period(self.frequency)
    }

    /// Stops the timer without waiting for an in-flight callback.
    ///
    /// Returns true for the one call that actually performed the teardown;
    /// repeated or concurrent calls are no-ops.
    pub fn dispose(&self) -> bool {
        let began = self
            .shared
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                (state <= LoopState::ACTIVE).then_some(LoopState::DISPOSING)
            })
            .is_ok();
        if !began {
            return false;
        }
        let _ = self.stop_tx.try_send(());
        self.shared
            .state
            .store(LoopState::DISPOSED, Ordering::Release);
        log::debug!("{} disposed", self.name);
        true
    }

    /// Disposes the loop and returns a handle to await its threads.
    pub fn dispose_async(&self) -> Shutdown {
        self.dispose();
        if self.done_tx.is_some() {
            Shutdown::finished()
        } else {
            Shutdown::new(self.done_rx.clone())
        }
    }
}

impl Drop for InputLoop {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for InputLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputLoop")
            .field("name", &self.name)
            .field("frequency", &self.frequency)
            .field("state", &self.state())
            .field("iteration_time", &self.iteration_time())
            .finish_non_exhaustive()
    }
}

/// Builder for [`InputLoop`].
pub struct InputLoopBuilder {
    callback: Option<Box<dyn FnMut() + Send>>,
    frequency: u32,
    watch: Option<Box<dyn LoopWatch>>,
    workers: usize,
    faults: Option<Sender<TickFault>>,
    name: String,
}

impl Default for InputLoopBuilder {
    fn default() -> Self {
        Self {
            callback: None,
            frequency: DEFAULT_FREQUENCY,
            watch: None,
            workers: DEFAULT_WORKERS,
            faults: None,
            name: DEFAULT_NAME.to_string(),
        }
    }
}

impl InputLoopBuilder {
    /// Callback invoked on every iteration.
    pub fn on_update<F>(mut self, callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Iterations per second.
    pub fn frequency(mut self, frequency: u32) -> Self {
        self.frequency = frequency;
        self
    }

    /// Time source used to measure iteration time. Defaults to [`Stopwatch`].
    pub fn watch<W: LoopWatch + 'static>(mut self, watch: W) -> Self {
        self.watch = Some(Box::new(watch));
        self
    }

    /// Number of pool threads ticks are dispatched to (at least one).
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Channel receiving callback panics caught by the pool.
    ///
    /// Without one, a caught panic is only visible through the process panic
    /// hook (stderr by default); the worker survives and the next tick retries.
    pub fn fault_sender(mut self, faults: Sender<TickFault>) -> Self {
        self.faults = Some(faults);
        self
    }

    /// Thread name prefix.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Validates the configuration and returns a loop that is not ticking yet.
    pub fn build(self) -> Result<InputLoop> {
        let callback = self.callback.ok_or(Error::MissingCallback)?;
        if self.frequency == 0 {
            return Err(Error::InvalidFrequency(self.frequency));
        }
        let watch = self
            .watch
            .unwrap_or_else(|| Box::new(Stopwatch::new()));

        let (stop_tx, stop_rx) = bounded(1);
        let (done_tx, done_rx) = bounded(0);
        let shared = Arc::new(Shared {
            busy: AtomicBool::new(false),
            state: AtomicU8::new(LoopState::IDLE),
            iteration_nanos: AtomicU64::new(0),
            exclusive: UnsafeCell::new(Exclusive { callback, watch }),
        });

        Ok(InputLoop {
            shared,
            frequency: self.frequency,
            name: self.name,
            workers: self.workers,
            faults: self.faults,
            stop_tx,
            stop_rx,
            done_rx,
            done_tx: Some(done_tx),
        })
    }

    /// Builds the loop and starts ticking right away.
    pub fn spawn(self) -> Result<InputLoop> {
        let mut input_loop = self.build()?;
        input_loop.start()?;
        Ok(input_loop)
    }
}
