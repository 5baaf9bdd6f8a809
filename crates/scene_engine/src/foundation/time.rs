//! Frame timing utilities

use std::time::{Duration, Instant};

/// Frame timer driving the host tick loop
#[derive(Debug)]
pub struct Timer {
    last_frame: Instant,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Advance the timer by measuring wall clock time since the last call
    pub fn update(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame);
        self.advance(elapsed.as_secs_f32());
        self.last_frame = now;
    }

    /// Advance the timer by a fixed step (headless hosts and tests)
    pub fn advance(&mut self, delta_time: f32) {
        self.delta_time = delta_time;
        self.total_time += delta_time;
        self.frame_count += 1;
    }

    /// Time since the last frame in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Total elapsed time since timer creation
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Number of frames counted so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

/// Simple stopwatch for measuring elapsed time
#[derive(Debug, Default)]
pub struct Stopwatch {
    start_time: Option<Instant>,
    elapsed: Duration,
}

impl Stopwatch {
    /// Create a new stopwatch and start it immediately
    pub fn start_new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            elapsed: Duration::ZERO,
        }
    }

    /// Stop the stopwatch and accumulate elapsed time
    pub fn stop(&mut self) {
        if let Some(start) = self.start_time.take() {
            self.elapsed += start.elapsed();
        }
    }

    /// Get the elapsed time
    pub fn elapsed(&self) -> Duration {
        let running = self.start_time.map_or(Duration::ZERO, |start| start.elapsed());
        self.elapsed + running
    }

    /// Get the elapsed time in microseconds
    pub fn elapsed_micros(&self) -> u64 {
        u64::try_from(self.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_step_advance() {
        let mut timer = Timer::new();
        timer.advance(0.5);
        timer.advance(0.25);

        assert_eq!(timer.frame_count(), 2);
        assert_eq!(timer.delta_time(), 0.25);
        assert_eq!(timer.total_time(), 0.75);
    }

    #[test]
    fn test_stopwatch_stops_accumulating() {
        let mut stopwatch = Stopwatch::start_new();
        stopwatch.stop();
        let first = stopwatch.elapsed();
        assert_eq!(stopwatch.elapsed(), first);
    }
}
