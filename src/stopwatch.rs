/// Timing of pipeline stages
use std::time::{Duration, Instant};

use log::info;

/// Logs the start of an operation and, on `finish`, how long it took.
#[derive(Debug)]
pub struct Stopwatch {
    operation: String,
    started: Instant,
}

impl Stopwatch {
    pub fn start(operation: impl Into<String>) -> Self {
        let operation = operation.into();
        info!("{operation} ...");
        Self {
            operation,
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Stop the watch, log the elapsed time and return it.
    pub fn finish(self) -> Duration {
        let elapsed = self.elapsed();
        info!(
            "{} done ({:.2} seconds)",
            self.operation,
            elapsed.as_secs_f64()
        );
        elapsed
    }
}
