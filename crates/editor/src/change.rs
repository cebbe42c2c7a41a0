use content::{BorderEffect, Content, EditorState};
use timeline::Millis;

/// One form edit. High-frequency edits (typing, sliders, color drags) are
/// debounced; discrete edits (toggles, preset or type switches) go out at once.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorChange {
    Text(String),
    TextColor(String),
    Scroll(bool),
    ScrollSpeed(u32),
    BorderEffect(BorderEffect),
    Content(Content),
    Duration(u32),
    RepeatCount(u32),
    TimelineLength(Millis),
    Iterations(u32),
}

impl EditorChange {
    pub fn is_discrete(&self) -> bool {
        matches!(
            self,
            EditorChange::Scroll(_) | EditorChange::BorderEffect(_) | EditorChange::Content(_) | EditorChange::Iterations(_)
        )
    }

    /// Applies the edit. Returns false when it does not fit the current content type.
    pub(crate) fn apply_to(self, state: &mut EditorState) -> bool {
        match self {
            EditorChange::BorderEffect(effect) => state.border_effect = effect,
            EditorChange::Content(content) => state.content = content,
            EditorChange::Duration(secs) => state.duration_secs = Some(secs),
            EditorChange::RepeatCount(n) => state.repeat_count = Some(n),
            EditorChange::TimelineLength(ms) => state.timeline_length_ms = Some(ms),
            EditorChange::Iterations(n) => match state.image_mut().and_then(|image| image.timeline.as_mut()) {
                Some(timeline) => *timeline = timeline.with_iterations(n),
                None => return false,
            },
            text_edit => {
                let Content::Text(text) = &mut state.content else { return false };
                match text_edit {
                    EditorChange::Text(value) => text.text = value,
                    EditorChange::TextColor(color) => text.color = color,
                    EditorChange::Scroll(scroll) => text.scroll = scroll,
                    EditorChange::ScrollSpeed(speed) => text.scroll_speed = speed,
                    _ => return false,
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use content::{ClockContent, ClockFormat, ImageContent, TextContent};
    use timeline::Timeline;

    #[test]
    fn classifies_edits() {
        assert!(!EditorChange::Text("a".into()).is_discrete());
        assert!(!EditorChange::Duration(3).is_discrete());
        assert!(EditorChange::Scroll(true).is_discrete());
        assert!(EditorChange::BorderEffect(BorderEffect::Rainbow).is_discrete());
    }

    #[test]
    fn rejects_edits_for_other_content() {
        let clock = Content::Clock(ClockContent { format: ClockFormat::H24, show_seconds: false, color: "#fff".into() });
        let mut state = EditorState::new(clock.clone());
        assert!(!EditorChange::Text("x".into()).apply_to(&mut state));
        assert_eq!(state.content, clock);

        let mut image = EditorState::new(Content::Image(ImageContent::new("i")));
        assert!(!EditorChange::Iterations(2).apply_to(&mut image));
        image.set_image_timeline(Some(Timeline::default()));
        assert!(EditorChange::Iterations(2).apply_to(&mut image));
        assert_eq!(image.image_timeline().unwrap().iterations(), 2);
    }

    #[test]
    fn applies_text_edits() {
        let mut state = EditorState::new(Content::Text(TextContent::new("", "#fff")));
        assert!(EditorChange::Text("OPEN".into()).apply_to(&mut state));
        assert!(EditorChange::Scroll(true).apply_to(&mut state));
        let Content::Text(text) = &state.content else { unreachable!() };
        assert_eq!(text.text, "OPEN");
        assert!(text.scroll);
    }
}
