use std::{
    thread,
    time::{Duration, Instant},
};

/// Enforces a minimum delay between the starts of consecutive requests.
#[derive(Debug)]
pub struct Throttle {
    min_delay: Duration,
    last_request: Option<Instant>,
}

impl Throttle {
    pub const fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last_request: None,
        }
    }

    /// Blocks until the next request is allowed and records its start.
    pub fn wait(&mut self) {
        if let Some(pending) = self.remaining() {
            log::debug!("Waiting {} ms before the next request", pending.as_millis());
            thread::sleep(pending);
        }
        self.last_request = Some(Instant::now());
    }

    fn remaining(&self) -> Option<Duration> {
        let elapsed = self.last_request?.elapsed();
        self.min_delay
            .checked_sub(elapsed)
            .filter(|d| !d.is_zero())
    }
}
