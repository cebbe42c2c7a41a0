use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod playback;

pub use playback::PlaybackCursor;

/// Smallest scale a keyframe or interpolated transform may carry.
pub const MIN_SCALE: f64 = 0.01;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimelineError {
    #[error("cannot remove the only keyframe")]
    LastKeyframe,
    #[error("keyframe index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("timeline needs at least 2 keyframes to play")]
    NotPlayable,
}

pub type Millis = u64;

/// Position and scale of content on the display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
}

impl Transform {
    pub const IDENTITY: Transform = Transform { x: 0.0, y: 0.0, scale: 1.0 };

    pub const fn new(x: f64, y: f64, scale: f64) -> Self { Self { x, y, scale } }

    /// Replaces non-finite coordinates with 0 and pulls scale into `[MIN_SCALE, 1]`.
    pub fn sanitized(self) -> Self {
        let finite_or_zero = |v: f64| if v.is_finite() { v } else { 0.0 };
        let scale = if self.scale.is_finite() { self.scale.clamp(MIN_SCALE, 1.0) } else { 1.0 };
        Self { x: finite_or_zero(self.x), y: finite_or_zero(self.y), scale }
    }
}

impl Default for Transform {
    fn default() -> Self { Self::IDENTITY }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keyframe {
    pub timestamp_ms: Millis,
    pub x: f64,
    pub y: f64,
    pub scale: f64,
}

impl Keyframe {
    pub fn new(timestamp_ms: Millis, transform: Transform) -> Self {
        let t = transform.sanitized();
        Self { timestamp_ms, x: t.x, y: t.y, scale: t.scale }
    }

    pub fn transform(&self) -> Transform { Transform { x: self.x, y: self.y, scale: self.scale } }
}

/// Clamps a caller-supplied time to the nearest usable millisecond offset:
/// NaN and anything at or below zero become 0, `+inf` becomes `f64::MAX`.
pub fn sanitize_ms(ms: f64) -> f64 {
    if ms == f64::INFINITY { return f64::MAX; }
    if ms.is_finite() && ms > 0.0 { ms } else { 0.0 }
}

/// One animation cycle: keyframes sorted by timestamp (unique) and an
/// iteration count where 0 means loop forever.
///
/// The keyframe list is never empty. Deserialized timelines are normalized,
/// so any value of this type upholds the ordering invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawTimeline")]
pub struct Timeline {
    keyframes: Vec<Keyframe>,
    iterations: u32,
}

#[derive(Deserialize)]
struct RawTimeline {
    #[serde(default)]
    keyframes: Vec<Keyframe>,
    #[serde(default = "default_iterations")]
    iterations: u32,
}

fn default_iterations() -> u32 { 1 }

impl From<RawTimeline> for Timeline {
    fn from(raw: RawTimeline) -> Self {
        let mut keyframes: Vec<Keyframe> = Vec::with_capacity(raw.keyframes.len());
        for k in raw.keyframes {
            let k = Keyframe::new(k.timestamp_ms, k.transform());
            // stable sort below keeps input order, so a later duplicate replaces an earlier one
            match keyframes.iter_mut().find(|e| e.timestamp_ms == k.timestamp_ms) {
                Some(existing) => *existing = k,
                None => keyframes.push(k),
            }
        }
        keyframes.sort_by_key(|k| k.timestamp_ms);
        if keyframes.is_empty() { keyframes.push(Keyframe::new(0, Transform::IDENTITY)); }
        Self { keyframes, iterations: raw.iterations }
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self { keyframes: vec![Keyframe::new(0, Transform::IDENTITY)], iterations: default_iterations() }
    }
}

impl Timeline {
    /// Builds a timeline from arbitrary keyframes, normalizing order and duplicates.
    pub fn from_keyframes(keyframes: impl IntoIterator<Item = Keyframe>, iterations: u32) -> Self {
        RawTimeline { keyframes: keyframes.into_iter().collect(), iterations }.into()
    }

    pub fn keyframes(&self) -> &[Keyframe] { &self.keyframes }

    pub fn len(&self) -> usize { self.keyframes.len() }

    pub fn is_empty(&self) -> bool { self.keyframes.is_empty() }

    pub fn iterations(&self) -> u32 { self.iterations }

    #[must_use]
    pub fn with_iterations(&self, iterations: u32) -> Self {
        Self { keyframes: self.keyframes.clone(), iterations }
    }

    pub fn is_playable(&self) -> bool { self.keyframes.len() >= 2 }

    /// Length of one cycle, or 0 when the timeline cannot be played.
    pub fn cycle_length_ms(&self) -> Millis {
        if !self.is_playable() { return 0; }
        self.last().timestamp_ms
    }

    fn last(&self) -> &Keyframe {
        // non-empty by construction
        &self.keyframes[self.keyframes.len() - 1]
    }

    /// Transform at `elapsed_ms`. Clamps to the first keyframe before it and
    /// holds the last keyframe at or after it; no extrapolation.
    pub fn interpolate(&self, elapsed_ms: f64) -> Transform {
        let elapsed = sanitize_ms(elapsed_ms);
        let first = &self.keyframes[0];
        if elapsed <= first.timestamp_ms as f64 { return first.transform(); }
        let last = self.last();
        if elapsed >= last.timestamp_ms as f64 { return last.transform(); }

        // index of the first keyframe strictly after `elapsed`; always in 1..len here
        let hi = self.keyframes.partition_point(|k| k.timestamp_ms as f64 <= elapsed);
        let (k0, k1) = (&self.keyframes[hi - 1], &self.keyframes[hi]);
        if elapsed == k0.timestamp_ms as f64 { return k0.transform(); }

        let span = (k1.timestamp_ms - k0.timestamp_ms) as f64;
        let t = ((elapsed - k0.timestamp_ms as f64) / span).clamp(0.0, 1.0);
        let lerp = |a: f64, b: f64| a + (b - a) * t;
        Transform {
            x: lerp(k0.x, k1.x),
            y: lerp(k0.y, k1.y),
            scale: lerp(k0.scale, k1.scale).max(MIN_SCALE),
        }
    }

    /// Extends the timeline to `target_ms` with a hold of the last keyframe.
    ///
    /// Returns `Cow::Borrowed(self)` when `target_ms` does not reach past the
    /// last keyframe, so callers can skip redundant writes by checking the
    /// variant. The original is never modified.
    pub fn with_virtual_endpoint(&self, target_ms: Millis) -> Cow<'_, Timeline> {
        let last = *self.last();
        if target_ms <= last.timestamp_ms { return Cow::Borrowed(self); }
        let mut extended = self.clone();
        extended.keyframes.push(Keyframe { timestamp_ms: target_ms, ..last });
        Cow::Owned(extended)
    }

    /// Writes a keyframe at `timestamp_ms`, replacing one already there.
    #[must_use]
    pub fn upsert_keyframe(&self, timestamp_ms: Millis, transform: Transform) -> Self {
        let keyframe = Keyframe::new(timestamp_ms, transform);
        let mut keyframes = self.keyframes.clone();
        match keyframes.binary_search_by_key(&timestamp_ms, |k| k.timestamp_ms) {
            Ok(i) => keyframes[i] = keyframe,
            Err(i) => keyframes.insert(i, keyframe),
        }
        Self { keyframes, iterations: self.iterations }
    }

    /// Like [`Timeline::upsert_keyframe`] but takes a possibly fractional,
    /// possibly invalid playhead position.
    #[must_use]
    pub fn upsert_keyframe_at(&self, playhead_ms: f64, transform: Transform) -> Self {
        self.upsert_keyframe(sanitize_ms(playhead_ms).round() as Millis, transform)
    }

    /// Removes the keyframe at `index`. Refuses to empty the timeline; callers
    /// fall back to [`Timeline::default`] in that case.
    pub fn remove_keyframe(&self, index: usize) -> Result<Self, TimelineError> {
        let len = self.keyframes.len();
        if index >= len { return Err(TimelineError::IndexOutOfRange { index, len }); }
        if len == 1 { return Err(TimelineError::LastKeyframe); }
        let mut keyframes = self.keyframes.clone();
        keyframes.remove(index);
        Ok(Self { keyframes, iterations: self.iterations })
    }
}
