use timeline::{Millis, Timeline};

use crate::payload::{BorderEffect, Content, ImageContent, PlaylistItem, PreviewPayload, Timing};

pub const DEFAULT_DURATION_SECS: u32 = 10;
pub const DEFAULT_REPEAT_COUNT: u32 = 1;

/// Form state of one editor. Keeps both timing fields around so switching
/// content type back and forth does not lose what the user typed.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorState {
    pub border_effect: BorderEffect,
    pub content: Content,
    pub duration_secs: Option<u32>,
    pub repeat_count: Option<u32>,
    /// Playlist-level length of an image animation; may exceed the authored motion.
    pub timeline_length_ms: Option<Millis>,
}

impl EditorState {
    pub fn new(content: Content) -> Self {
        Self { border_effect: BorderEffect::None, content, duration_secs: None, repeat_count: None, timeline_length_ms: None }
    }

    pub fn from_item(item: &PlaylistItem) -> Self {
        Self {
            border_effect: item.border_effect.clone(),
            content: item.content.clone(),
            duration_secs: item.duration,
            repeat_count: item.repeat_count,
            timeline_length_ms: image_timeline(&item.content).map(Timeline::cycle_length_ms).filter(|len| *len > 0),
        }
    }

    pub fn from_payload(payload: &PreviewPayload) -> Self { Self::from_item(&PlaylistItem::from(payload.clone())) }

    pub fn image_timeline(&self) -> Option<&Timeline> { image_timeline(&self.content) }

    /// Replaces the image timeline. Returns false when the content is not an image.
    pub fn set_image_timeline(&mut self, timeline: Option<Timeline>) -> bool {
        match &mut self.content {
            Content::Image(image) => { image.timeline = timeline; true }
            _ => false,
        }
    }

    pub fn image_mut(&mut self) -> Option<&mut ImageContent> {
        match &mut self.content {
            Content::Image(image) => Some(image),
            _ => None,
        }
    }
}

fn image_timeline(content: &Content) -> Option<&Timeline> {
    match content {
        Content::Image(image) => image.timeline.as_ref(),
        _ => None,
    }
}

/// Maps editor form state to the wire payload.
///
/// | content                      | timing                            |
/// |------------------------------|-----------------------------------|
/// | text, not scrolling          | duration                          |
/// | text, scrolling              | repeatCount                       |
/// | image, >= 2 keyframes        | repeatCount (timeline iterations) |
/// | image, otherwise             | duration, timeline dropped        |
/// | clock / animation preset     | duration                          |
pub fn build(state: &EditorState) -> PreviewPayload {
    let duration = Timing::Duration(state.duration_secs.unwrap_or(DEFAULT_DURATION_SECS).max(1));
    let repeat = Timing::RepeatCount(state.repeat_count.unwrap_or(DEFAULT_REPEAT_COUNT));

    let (content, timing) = match &state.content {
        Content::Text(text) => {
            let timing = if text.scroll { repeat } else { duration };
            (Content::Text(text.clone()), timing)
        }
        Content::Image(image) => match image.timeline.as_ref().filter(|t| t.is_playable()) {
            Some(timeline) => {
                let timeline = match state.timeline_length_ms {
                    Some(len) => timeline.with_virtual_endpoint(len).into_owned(),
                    None => timeline.clone(),
                };
                let timing = Timing::RepeatCount(timeline.iterations());
                (Content::Image(ImageContent { timeline: Some(timeline), ..image.clone() }), timing)
            }
            None => (Content::Image(ImageContent { timeline: None, ..image.clone() }), duration),
        },
        Content::Clock(clock) => (Content::Clock(clock.clone()), duration),
        Content::Animation(animation) => (Content::Animation(animation.clone()), duration),
    };

    PreviewPayload { border_effect: state.border_effect.clone(), content, timing }
}
