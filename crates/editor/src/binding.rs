use std::borrow::Cow;
use std::time::Instant;

use content::{build, Content, EditorState, PreviewPayload};
use crossbeam_channel::Receiver;
use session::{HostVisibility, PreviewSessionCoordinator, PreviewTransport, SessionError, SessionEvent};
use timeline::{sanitize_ms, PlaybackCursor, Timeline, TimelineError, Transform};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{EditorChange, EditorError, PlaybackClock};

pub const MSG_IN_USE: &str = "Preview already active elsewhere.";
pub const MSG_EXPIRED: &str = "Preview session expired. Reconnect to keep previewing.";
pub const MSG_NOT_PLAYABLE: &str = "Add at least two keyframes to play the animation.";

/// Connects one editor's form state to the shared preview session and to
/// keyframe playback.
///
/// Dropping a binding leaves the session running, since other editors may
/// share it; [`EditorPreviewBinding::leave`] ends it on back/save.
pub struct EditorPreviewBinding<T: PreviewTransport> {
    id: Uuid,
    coordinator: PreviewSessionCoordinator<T>,
    events: Receiver<SessionEvent>,
    state: EditorState,
    cursor: PlaybackCursor,
    clock: PlaybackClock,
    manipulating: bool,
    needs_reacquire: bool,
    status: Option<String>,
}

impl<T: PreviewTransport> EditorPreviewBinding<T> {
    pub fn new(coordinator: PreviewSessionCoordinator<T>, state: EditorState) -> Self {
        let events = coordinator.subscribe();
        let cursor = state.image_timeline().map(PlaybackCursor::new).unwrap_or_default();
        Self {
            id: Uuid::new_v4(),
            coordinator,
            events,
            state,
            cursor,
            clock: PlaybackClock::default(),
            manipulating: false,
            needs_reacquire: false,
            status: None,
        }
    }

    pub fn id(&self) -> Uuid { self.id }

    pub fn state(&self) -> &EditorState { &self.state }

    pub fn cursor(&self) -> &PlaybackCursor { &self.cursor }

    pub fn status(&self) -> Option<&str> { self.status.as_deref() }

    pub fn needs_reacquire(&self) -> bool { self.needs_reacquire }

    pub fn is_manipulating(&self) -> bool { self.manipulating }

    /// Joins (or opens) the live preview with the current form state.
    pub async fn mount(&mut self) -> Result<(), EditorError> {
        let payload = self.preview_payload();
        let result = self.coordinator.ensure_started(&payload).await;
        self.record(&result);
        if result.is_ok() { info!(editor = %self.id, "editor attached to preview"); }
        Ok(result?)
    }

    pub async fn reacquire(&mut self) -> Result<(), EditorError> {
        self.needs_reacquire = false;
        self.mount().await
    }

    /// Payload for the live display. While paused, scrubbing or dragging, an
    /// animated image is sent as the single frame under the playhead; the
    /// timeline itself goes out only during playback.
    pub fn preview_payload(&self) -> PreviewPayload { build(&self.preview_state()) }

    /// Payload to persist: always carries the full timeline.
    pub fn save_payload(&self) -> PreviewPayload { build(&self.state) }

    fn preview_state(&self) -> Cow<'_, EditorState> {
        let Some(timeline) = self.state.image_timeline() else { return Cow::Borrowed(&self.state) };
        if self.cursor.is_playing && !self.manipulating { return Cow::Borrowed(&self.state); }
        let frame = self.cursor.transform(timeline);
        let mut state = self.state.clone();
        if let Some(image) = state.image_mut() {
            image.transform = frame;
            image.timeline = None;
        }
        Cow::Owned(state)
    }

    /// Transform shown on the editor canvas.
    pub fn current_transform(&self) -> Option<Transform> {
        match &self.state.content {
            Content::Image(image) => Some(match &image.timeline {
                Some(timeline) => self.cursor.transform(timeline),
                None => image.transform,
            }),
            _ => None,
        }
    }

    pub async fn apply(&mut self, change: EditorChange) -> Result<(), EditorError> {
        let discrete = change.is_discrete();
        if !change.clone().apply_to(&mut self.state) {
            debug!(editor = %self.id, ?change, "edit does not apply to current content");
            return Err(EditorError::NotApplicable);
        }
        self.sync_cursor();
        if discrete { self.push_now().await } else { self.push_debounced(); Ok(()) }
    }

    fn sync_cursor(&mut self) {
        match self.state.image_timeline() {
            Some(timeline) => self.cursor.sync(timeline),
            None => self.cursor = PlaybackCursor::default(),
        }
        if !self.cursor.is_playing { self.clock.stop(); }
    }

    pub async fn set_animation_enabled(&mut self, enabled: bool) -> Result<(), EditorError> {
        let image = self.state.image_mut().ok_or(EditorError::NotAnImage)?;
        image.timeline = if enabled {
            Some(Timeline::default().upsert_keyframe(0, image.transform))
        } else {
            None
        };
        self.cursor = self.state.image_timeline().map(PlaybackCursor::new).unwrap_or_default();
        self.clock.stop();
        self.push_now().await
    }

    pub fn begin_manipulation(&mut self) {
        self.manipulating = true;
        self.cursor.pause();
        self.clock.stop();
    }

    /// Drag on the canvas. With animation on, the keyframe under the
    /// playhead follows the drag and the playhead snaps onto that keyframe.
    pub fn drag_image(&mut self, transform: Transform) -> Result<(), EditorError> {
        let playhead = self.cursor.elapsed_ms;
        let image = self.state.image_mut().ok_or(EditorError::NotAnImage)?;
        match &image.timeline {
            Some(timeline) => {
                let keyframe_ms = sanitize_ms(playhead).round();
                image.timeline = Some(timeline.upsert_keyframe_at(keyframe_ms, transform));
                self.cursor.elapsed_ms = keyframe_ms;
            }
            None => image.transform = transform.sanitized(),
        }
        self.sync_cursor();
        self.push_debounced();
        Ok(())
    }

    pub async fn end_manipulation(&mut self) -> Result<(), EditorError> {
        self.manipulating = false;
        self.push_now().await
    }

    /// Records the current canvas transform as a keyframe at the playhead,
    /// turning animation on when it was off.
    pub async fn add_keyframe_at_playhead(&mut self) -> Result<(), EditorError> {
        let transform = self.current_transform().ok_or(EditorError::NotAnImage)?;
        let playhead = self.cursor.elapsed_ms;
        let image = self.state.image_mut().ok_or(EditorError::NotAnImage)?;
        let base = image.timeline.take().unwrap_or_default();
        image.timeline = Some(base.upsert_keyframe_at(playhead, transform));
        self.sync_cursor();
        self.push_now().await
    }

    pub async fn remove_keyframe(&mut self, index: usize) -> Result<(), EditorError> {
        let image = self.state.image_mut().ok_or(EditorError::NotAnImage)?;
        let Some(timeline) = &image.timeline else { return Err(EditorError::AnimationDisabled) };
        image.timeline = Some(match timeline.remove_keyframe(index) {
            Ok(timeline) => timeline,
            Err(TimelineError::LastKeyframe) => {
                debug!(editor = %self.id, "last keyframe removed, resetting animation");
                Timeline::default()
            }
            Err(err) => {
                self.status = Some(err.to_string());
                return Err(err.into());
            }
        });
        self.sync_cursor();
        self.push_now().await
    }

    /// Starts playback. Rejected locally when the timeline cannot play.
    pub async fn play(&mut self, now: Instant) -> Result<(), EditorError> {
        let timeline = self.state.image_timeline().ok_or(EditorError::AnimationDisabled)?;
        if let Err(err) = self.cursor.play(timeline) {
            self.status = Some(MSG_NOT_PLAYABLE.to_string());
            return Err(err.into());
        }
        self.manipulating = false;
        self.clock.start(now);
        self.push_now().await
    }

    pub async fn pause(&mut self) -> Result<(), EditorError> {
        self.cursor.pause();
        self.clock.stop();
        self.push_now().await
    }

    pub fn scrub(&mut self, elapsed_ms: f64) {
        self.cursor.scrub(elapsed_ms);
        self.clock.stop();
        self.push_debounced();
    }

    /// Advances playback from the host's frame clock and returns the canvas
    /// transform. When a finite run ends the display gets the final frame.
    pub fn tick(&mut self, now: Instant) -> Option<Transform> {
        if self.cursor.is_playing {
            let delta = self.clock.delta_ms(now);
            let iterations = self.state.image_timeline().map_or(0, Timeline::iterations);
            self.cursor.advance(delta, iterations);
            if !self.cursor.is_playing {
                self.clock.stop();
                self.push_debounced();
            }
        }
        self.current_transform()
    }

    /// Drains session events, flagging the editor when the session expired.
    pub fn poll_events(&mut self) -> Vec<SessionEvent> {
        let events: Vec<SessionEvent> = self.events.try_iter().collect();
        for event in &events {
            match event {
                SessionEvent::Expired { .. } => {
                    self.needs_reacquire = true;
                    self.status = Some(MSG_EXPIRED.to_string());
                }
                SessionEvent::Started { .. } => {
                    self.needs_reacquire = false;
                    self.status = None;
                }
                SessionEvent::Stopped => {}
            }
        }
        events
    }

    pub async fn on_visibility(&mut self, visibility: HostVisibility) {
        self.coordinator.on_visibility_change(visibility).await;
        self.poll_events();
    }

    /// Back/save: ends the shared session for every editor.
    pub fn leave(self) -> Option<JoinHandle<()>> {
        info!(editor = %self.id, "leaving editor, stopping preview");
        self.coordinator.stop()
    }

    async fn push_now(&mut self) -> Result<(), EditorError> {
        let result = self.coordinator.update(&self.preview_payload()).await;
        self.record(&result);
        Ok(result?)
    }

    fn push_debounced(&self) { self.coordinator.debounced_update(self.preview_payload()); }

    fn record(&mut self, result: &Result<(), SessionError>) {
        match result {
            Ok(()) => {}
            Err(SessionError::InUseElsewhere) => self.status = Some(MSG_IN_USE.to_string()),
            Err(SessionError::SessionLost) => {
                self.needs_reacquire = true;
                self.status = Some(MSG_EXPIRED.to_string());
            }
            Err(err) => {
                warn!(editor = %self.id, error = %err, "preview request failed");
                self.status = Some(err.to_string());
            }
        }
    }
}
