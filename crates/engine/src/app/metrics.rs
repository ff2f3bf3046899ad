use std::time::{Duration, Instant};

/// One reporting window of the main loop.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct LoopStats {
    pub fps: f32,
    pub tps: f32,
    pub avg_frame_ms: f32,
    pub worst_frame_ms: f32,
    pub backlog_drops: u32,
}

#[derive(Debug)]
pub(crate) struct LoopStatsWindow {
    opened_at: Instant,
    length: Duration,
    frames: u32,
    ticks: u32,
    frame_total: Duration,
    worst_frame: Duration,
    backlog_drops: u32,
}

impl LoopStatsWindow {
    pub(crate) fn new(length: Duration) -> Self {
        Self::opened_at(Instant::now(), length)
    }

    fn opened_at(opened_at: Instant, length: Duration) -> Self {
        Self {
            opened_at,
            length,
            frames: 0,
            ticks: 0,
            frame_total: Duration::ZERO,
            worst_frame: Duration::ZERO,
            backlog_drops: 0,
        }
    }

    pub(crate) fn frame(&mut self, frame_dt: Duration) {
        self.frames = self.frames.saturating_add(1);
        self.frame_total = self.frame_total.saturating_add(frame_dt);
        self.worst_frame = self.worst_frame.max(frame_dt);
    }

    pub(crate) fn ticks(&mut self, count: u32) {
        self.ticks = self.ticks.saturating_add(count);
    }

    pub(crate) fn backlog_dropped(&mut self) {
        self.backlog_drops = self.backlog_drops.saturating_add(1);
    }

    /// Closes the window once its length has passed and starts the next one
    /// at `now`.
    pub(crate) fn close_if_due(&mut self, now: Instant) -> Option<LoopStats> {
        let elapsed = now.saturating_duration_since(self.opened_at);
        if elapsed < self.length {
            return None;
        }
        let seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let avg_frame_ms = match self.frames {
            0 => 0.0,
            frames => self.frame_total.as_secs_f32() * 1000.0 / frames as f32,
        };
        let stats = LoopStats {
            fps: self.frames as f32 / seconds,
            tps: self.ticks as f32 / seconds,
            avg_frame_ms,
            worst_frame_ms: self.worst_frame.as_secs_f32() * 1000.0,
            backlog_drops: self.backlog_drops,
        };
        *self = Self::opened_at(now, self.length);
        Some(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_reports_rates_and_worst_frame() {
        let start = Instant::now();
        let mut window = LoopStatsWindow::opened_at(start, Duration::from_secs(2));
        window.frame(Duration::from_millis(10));
        window.frame(Duration::from_millis(30));
        window.ticks(3);
        window.ticks(5);
        window.backlog_dropped();

        assert_eq!(window.close_if_due(start + Duration::from_secs(1)), None);
        let stats = window
            .close_if_due(start + Duration::from_secs(2))
            .expect("window closed");
        assert!((stats.fps - 1.0).abs() < 0.01);
        assert!((stats.tps - 4.0).abs() < 0.01);
        assert!((stats.avg_frame_ms - 20.0).abs() < 0.01);
        assert!((stats.worst_frame_ms - 30.0).abs() < 0.01);
        assert_eq!(stats.backlog_drops, 1);
    }

    #[test]
    fn next_window_starts_empty() {
        let start = Instant::now();
        let mut window = LoopStatsWindow::opened_at(start, Duration::from_secs(1));
        window.frame(Duration::from_millis(16));
        window.close_if_due(start + Duration::from_secs(1));

        let next = window
            .close_if_due(start + Duration::from_secs(2))
            .expect("second window");
        assert_eq!(next.fps, 0.0);
        assert_eq!(next.worst_frame_ms, 0.0);
        assert_eq!(next.backlog_drops, 0);
    }
}
