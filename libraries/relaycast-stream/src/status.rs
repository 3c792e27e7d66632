//! Realtime status line
//!
//! `  [   3/12  ]  [ 0h01m05s]  [  128.01 kbps]`

use std::time::{Duration, Instant};

/// Throughput meter for the track on air
#[derive(Debug, Clone)]
pub struct StatusLine {
    started: Instant,
    window_start: Instant,
    window_bytes: u64,
    kbps: Option<f64>,
}

impl StatusLine {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            window_start: now,
            window_bytes: 0,
            kbps: None,
        }
    }

    /// Account for `bytes` sent just now.
    pub fn record(&mut self, bytes: usize) {
        self.record_at(bytes, Instant::now());
    }

    fn record_at(&mut self, bytes: usize, now: Instant) {
        self.window_bytes += bytes as u64;
        let window = now.saturating_duration_since(self.window_start);
        if window >= Duration::from_secs(1) {
            self.kbps = Some(self.window_bytes as f64 * 8.0 / window.as_secs_f64() / 1000.0);
            self.window_start = now;
            self.window_bytes = 0;
        }
    }

    /// Render with playlist position `(current, total)` when known.
    pub fn render(&self, position: Option<(usize, usize)>) -> String {
        render(position, self.started.elapsed(), self.kbps)
    }
}

impl Default for StatusLine {
    fn default() -> Self {
        Self::new()
    }
}

fn render(position: Option<(usize, usize)>, elapsed: Duration, kbps: Option<f64>) -> String {
    let mut line = String::new();
    if let Some((pos, num)) = position {
        line.push_str(&format!("  [{:4}/{:<4}]", pos, num));
    }
    let secs = elapsed.as_secs();
    line.push_str(&format!(
        "  [{:2}h{:02}m{:02}s]",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    ));
    match kbps {
        Some(kbps) => line.push_str(&format!("  [{:8.2} kbps]", kbps)),
        None => line.push_str(&" ".repeat(17)),
    }
    line.push_str("  \r");
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_all_columns() {
        let line = render(Some((3, 12)), Duration::from_secs(3_725), Some(128.0));
        assert_eq!(line, "  [   3/12  ]  [ 1h02m05s]  [  128.00 kbps]  \r");
    }

    #[test]
    fn pads_until_rate_is_known() {
        let line = render(None, Duration::from_secs(5), None);
        assert_eq!(line, format!("  [ 0h00m05s]{}  \r", " ".repeat(17)));
    }

    #[test]
    fn rate_updates_once_per_second() {
        let mut status = StatusLine::new();
        let t0 = status.window_start;
        status.record_at(8_000, t0 + Duration::from_millis(500));
        assert_eq!(status.kbps, None);
        status.record_at(8_000, t0 + Duration::from_secs(1));
        assert_eq!(status.kbps, Some(128.0));
        assert_eq!(status.window_bytes, 0);
    }
}
