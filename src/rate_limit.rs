use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

/// Fixed-interval gate: successive `wait` calls return at least
/// `min_interval` apart.
#[derive(Debug)]
pub struct IntervalGate {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl IntervalGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    pub fn wait(&self) {
        if self.min_interval.is_zero() {
            return;
        }
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let delay = self.min_interval - elapsed;
                tracing::debug!(delay_ms = delay.as_millis() as u64, "throttling request");
                thread::sleep(delay);
            }
        }
        *last = Some(Instant::now());
    }
}
