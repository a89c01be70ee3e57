//! Fixed-rate update loop that never runs its callback concurrently.
//!
//! [`InputLoop`] drives a user callback from a background timer. Ticks are
//! handed to a small worker pool, so consecutive invocations may land on
//! different threads, but a busy flag guarantees that at most one invocation
//! is in flight at a time. A tick that arrives while the callback is still
//! running is dropped, not queued.

mod error;
mod input_loop;
mod pool;
mod shutdown;
mod watch;

pub use error::{Error, Result};
pub use input_loop::{tick_period, InputLoop, InputLoopBuilder, LoopState};
pub use pool::TickFault;
pub use shutdown::Shutdown;
pub use watch::{LoopWatch, Stopwatch};

/// Default number of iterations per second.
pub const DEFAULT_FREQUENCY: u32 = 60;
