use crate::{sanitize_ms, Millis, Timeline, TimelineError, Transform};

/// Playhead over a [`Timeline`]. Pure clock math: the caller supplies elapsed
/// time from whatever monotonic source drives the editor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlaybackCursor {
    pub elapsed_ms: f64,
    pub is_playing: bool,
    pub cycle_length_ms: Millis,
    pub completed_cycles: u32,
}

impl PlaybackCursor {
    pub fn new(timeline: &Timeline) -> Self {
        Self { cycle_length_ms: timeline.cycle_length_ms(), ..Self::default() }
    }

    /// Starts playback. Rewinds first when a finite run already finished; a
    /// playhead scrubbed past the cycle end starts a fresh run from its
    /// position within the cycle.
    pub fn play(&mut self, timeline: &Timeline) -> Result<(), TimelineError> {
        self.sync(timeline);
        if !timeline.is_playable() { return Err(TimelineError::NotPlayable); }
        let cycle = self.cycle_length_ms as f64;
        if self.is_finished(timeline.iterations()) {
            self.elapsed_ms = 0.0;
            self.completed_cycles = 0;
        } else if self.elapsed_ms >= cycle {
            self.elapsed_ms %= cycle;
            self.completed_cycles = 0;
        }
        self.is_playing = true;
        Ok(())
    }

    pub fn pause(&mut self) { self.is_playing = false; }

    /// Moves the playhead and stops playback. Positions past the cycle end are
    /// allowed so keyframes can be placed beyond the current last one.
    pub fn scrub(&mut self, elapsed_ms: f64) {
        self.is_playing = false;
        self.completed_cycles = 0;
        self.elapsed_ms = sanitize_ms(elapsed_ms);
    }

    /// Advances by `delta_ms`, wrapping at the cycle end. With a finite
    /// `iterations` count playback halts on the last frame of the final cycle.
    pub fn advance(&mut self, delta_ms: f64, iterations: u32) {
        if !self.is_playing || self.cycle_length_ms == 0 { return; }
        let cycle = self.cycle_length_ms as f64;
        self.elapsed_ms += sanitize_ms(delta_ms);
        if self.elapsed_ms < cycle { return; }

        let wraps = (self.elapsed_ms / cycle).floor();
        let done = self.completed_cycles as f64 + wraps;
        if iterations != 0 && done >= iterations as f64 {
            self.completed_cycles = iterations;
            self.elapsed_ms = cycle;
            self.is_playing = false;
            return;
        }
        self.completed_cycles = done.min(u32::MAX as f64) as u32;
        self.elapsed_ms %= cycle;
    }

    /// Re-derives the cycle length after the timeline was edited.
    pub fn sync(&mut self, timeline: &Timeline) {
        self.cycle_length_ms = timeline.cycle_length_ms();
        if !timeline.is_playable() {
            self.is_playing = false;
            return;
        }
        if self.is_playing && self.elapsed_ms > self.cycle_length_ms as f64 {
            self.elapsed_ms %= self.cycle_length_ms as f64;
        }
    }

    pub fn is_finished(&self, iterations: u32) -> bool {
        iterations != 0 && self.completed_cycles >= iterations
    }

    pub fn transform(&self, timeline: &Timeline) -> Transform { timeline.interpolate(self.elapsed_ms) }
}
