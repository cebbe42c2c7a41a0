use std::time::Instant;

/// Turns a monotonic clock into per-tick deltas for [`timeline::PlaybackCursor`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaybackClock {
    anchor: Option<Instant>,
}

impl PlaybackClock {
    pub fn start(&mut self, now: Instant) { self.anchor = Some(now); }

    pub fn stop(&mut self) { self.anchor = None; }

    pub fn is_running(&self) -> bool { self.anchor.is_some() }

    /// Milliseconds since the previous call (or `start`); 0 while stopped.
    pub fn delta_ms(&mut self, now: Instant) -> f64 {
        match self.anchor.replace(now) {
            Some(prev) => now.saturating_duration_since(prev).as_secs_f64() * 1000.0,
            None => {
                self.anchor = None;
                0.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn measures_between_ticks() {
        let t0 = Instant::now();
        let mut clock = PlaybackClock::default();
        assert_eq!(clock.delta_ms(t0), 0.0);
        assert!(!clock.is_running());

        clock.start(t0);
        assert_eq!(clock.delta_ms(t0 + Duration::from_millis(16)), 16.0);
        assert_eq!(clock.delta_ms(t0 + Duration::from_millis(40)), 24.0);
        // non-monotonic input never goes negative
        assert_eq!(clock.delta_ms(t0), 0.0);
    }
}
