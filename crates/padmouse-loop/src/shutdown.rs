use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};

/// Handle for awaiting the full stop of a disposed [`InputLoop`].
///
/// Every loop thread holds a sender of a channel nobody ever writes to; the
/// loop is fully stopped once all of those senders are gone.
///
/// [`InputLoop`]: crate::InputLoop
#[derive(Debug, Clone)]
pub struct Shutdown {
    done: Option<Receiver<()>>,
}

impl Shutdown {
    pub(crate) fn new(done: Receiver<()>) -> Self {
        Self { done: Some(done) }
    }

    /// A loop that was never started has nothing to wait for.
    pub(crate) fn finished() -> Self {
        Self { done: None }
    }

    /// Returns true once the timer and every worker thread have exited.
    pub fn is_finished(&self) -> bool {
        match &self.done {
            Some(done) => matches!(done.try_recv(), Err(TryRecvError::Disconnected)),
            None => true,
        }
    }

    /// Blocks until the loop threads have exited.
    ///
    /// Waiting from inside the update callback never returns: the calling
    /// worker is one of the threads being waited for.
    pub fn wait(&self) {
        if let Some(done) = &self.done {
            while done.recv().is_ok() {}
        }
    }

    /// Like [`Shutdown::wait`], but gives up after `timeout`.
    /// Returns true if the loop stopped in time.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let Some(done) = &self.done else {
            return true;
        };
        let deadline = Instant::now() + timeout;
        loop {
            match done.recv_deadline(deadline) {
                Ok(()) => {}
                Err(RecvTimeoutError::Disconnected) => return true,
                Err(RecvTimeoutError::Timeout) => return false,
            }
        }
    }
}
