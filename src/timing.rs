//! Stage timing utilities.

use std::time::{Duration, Instant};

/// A simple timer for measuring pipeline stage durations.
pub struct Timer {
    name: String,
    start: Instant,
}

impl Timer {
    /// Start a new timer with the given stage name.
    pub fn start(name: &str) -> Self {
        Self {
            name: name.to_string(),
            start: Instant::now(),
        }
    }

    /// Finish the timer, print the elapsed time and return it.
    pub fn finish(self) -> Duration {
        let elapsed = self.start.elapsed();
        println!("  [{}] {}", format_secs(elapsed.as_secs_f64()), self.name);
        elapsed
    }
}

/// `12.3s`, or `2.1m` past a minute.
pub fn format_secs(secs: f64) -> String {
    if secs >= 60.0 {
        format!("{:.1}m", secs / 60.0)
    } else {
        format!("{:.1}s", secs)
    }
}
