use std::time::{Duration, Instant};

/// Monotonic time source queried once per executed tick.
///
/// The loop only calls [`LoopWatch::get_time`] while it holds its busy flag,
/// so implementations see strictly sequential calls, although not always
/// from the same thread.
pub trait LoopWatch: Send {
    /// Returns the time elapsed since the previous call.
    fn get_time(&mut self) -> Duration;
}

impl<W: LoopWatch + ?Sized> LoopWatch for Box<W> {
    fn get_time(&mut self) -> Duration {
        (**self).get_time()
    }
}

/// Default [`LoopWatch`] backed by [`Instant`].
///
/// The baseline is the moment the stopwatch is created, so the first reading
/// is the time between building the loop and its first tick.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    last: Instant,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
        }
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopWatch for Stopwatch {
    fn get_time(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last);
        self.last = now;
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopwatch_measures_time_since_previous_query() {
        let mut watch = Stopwatch::new();
        std::thread::sleep(Duration::from_millis(5));
        let first = watch.get_time();
        assert!(first >= Duration::from_millis(5));

        let second = watch.get_time();
        assert!(second < first);
    }

    #[test]
    fn boxed_watch_forwards_to_inner() {
        let mut watch: Box<dyn LoopWatch> = Box::new(Stopwatch::new());
        std::thread::sleep(Duration::from_millis(2));
        assert!(watch.get_time() >= Duration::from_millis(2));
    }
}
