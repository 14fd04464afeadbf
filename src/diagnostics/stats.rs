use serde::Serialize;
use std::time::{Duration, Instant};

/// Counters for capture requests handled by one pipeline.
pub struct CaptureStats {
    capture_count: u64,
    failure_count: u64,
    total_bytes: u64,
    start_time: Instant,
    last_capture_time: Option<Instant>,
    last_latency: Duration,
    last_error: Option<String>,
}

/// Snapshot of capture stats for serialisation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureSnapshot {
    pub capture_count: u64,
    pub failure_count: u64,
    pub failure_rate: f64,
    pub average_bytes: u64,
    pub last_latency_ms: f64,
    /// Milliseconds since the last successful capture.
    pub last_capture_age_ms: Option<f64>,
    pub uptime_secs: f64,
    pub last_error: Option<String>,
}

impl CaptureStats {
    /// Create new stats with zeroed counters.
    pub fn new() -> Self {
        Self {
            capture_count: 0,
            failure_count: 0,
            total_bytes: 0,
            start_time: Instant::now(),
            last_capture_time: None,
            last_latency: Duration::ZERO,
            last_error: None,
        }
    }

    /// Record a delivered image of `bytes` length that took `latency` end to end.
    pub fn record_success(&mut self, bytes: usize, latency: Duration) {
        self.capture_count += 1;
        self.total_bytes += bytes as u64;
        self.last_capture_time = Some(Instant::now());
        self.last_latency = latency;
    }

    /// Record a failed capture.
    pub fn record_failure(&mut self, error: &str) {
        self.failure_count += 1;
        self.last_error = Some(error.to_string());
    }

    /// Failures as a percentage of all attempts (0.0 - 100.0).
    pub fn failure_rate(&self) -> f64 {
        let total = self.capture_count + self.failure_count;
        if total == 0 {
            return 0.0;
        }
        (self.failure_count as f64 / total as f64) * 100.0
    }

    /// Mean encoded payload size over successful captures.
    pub fn average_bytes(&self) -> u64 {
        if self.capture_count == 0 {
            return 0;
        }
        self.total_bytes / self.capture_count
    }

    /// Time since the last successful capture, if any.
    pub fn since_last_capture(&self) -> Option<Duration> {
        self.last_capture_time.map(|t| t.elapsed())
    }

    /// Take a serialisable snapshot.
    pub fn snapshot(&self) -> CaptureSnapshot {
        CaptureSnapshot {
            capture_count: self.capture_count,
            failure_count: self.failure_count,
            failure_rate: self.failure_rate(),
            average_bytes: self.average_bytes(),
            last_latency_ms: self.last_latency.as_secs_f64() * 1000.0,
            last_capture_age_ms: self
                .since_last_capture()
                .map(|age| age.as_secs_f64() * 1000.0),
            uptime_secs: self.start_time.elapsed().as_secs_f64(),
            last_error: self.last_error.clone(),
        }
    }
}

impl Default for CaptureStats {
    fn default() -> Self {
        Self::new()
    }
}
