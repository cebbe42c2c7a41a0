use serde::{Deserialize, Serialize};
use timeline::{Timeline, Transform};

use crate::ContentError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type")]
pub enum BorderEffect {
    #[default]
    #[serde(rename = "none")]
    None,

    #[serde(rename = "rainbow")]
    Rainbow,

    #[serde(rename = "pulse")]
    Pulse { colors: Vec<String> },

    #[serde(rename = "sparkle")]
    Sparkle { colors: Vec<String> },

    #[serde(rename = "gradient")]
    Gradient { colors: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextContent {
    pub text: String,
    pub color: String,
    #[serde(default)]
    pub scroll: bool,
    #[serde(default = "default_scroll_speed")]
    pub scroll_speed: u32,
}

fn default_scroll_speed() -> u32 { 50 }

impl TextContent {
    pub fn new(text: impl Into<String>, color: impl Into<String>) -> Self {
        Self { text: text.into(), color: color.into(), scroll: false, scroll_speed: default_scroll_speed() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageContent {
    pub image_id: String,
    #[serde(default)]
    pub transform: Transform,
    /// Present only while animation is enabled for the image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Timeline>,
}

impl ImageContent {
    pub fn new(image_id: impl Into<String>) -> Self {
        Self { image_id: image_id.into(), transform: Transform::IDENTITY, timeline: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ClockFormat {
    #[serde(rename = "12h")]
    H12,
    #[default]
    #[serde(rename = "24h")]
    H24,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockContent {
    #[serde(default)]
    pub format: ClockFormat,
    #[serde(default)]
    pub show_seconds: bool,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationContent {
    pub preset: String,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default = "default_animation_speed")]
    pub speed: u32,
}

fn default_animation_speed() -> u32 { 5 }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Content {
    #[serde(rename = "text")]
    Text(TextContent),

    #[serde(rename = "image")]
    Image(ImageContent),

    #[serde(rename = "clock")]
    Clock(ClockContent),

    #[serde(rename = "animation")]
    Animation(AnimationContent),
}

/// How long the item stays on the display: a time in seconds or a number of
/// passes. Flattened into the payload as either `duration` or `repeatCount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Timing {
    Duration(u32),
    RepeatCount(u32),
}

/// What the display is asked to show, both for live preview and for saving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewPayload {
    #[serde(default)]
    pub border_effect: BorderEffect,
    pub content: Content,
    #[serde(flatten)]
    pub timing: Timing,
}

impl PreviewPayload {
    pub fn to_json(&self) -> Result<String, ContentError> { Ok(serde_json::to_string(self)?) }
}

/// A saved playlist entry as loaded from the server. Older items may carry
/// both timing fields; only the one matching the content survives `build`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub border_effect: BorderEffect,
    pub content: Content,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_count: Option<u32>,
}

impl PlaylistItem {
    pub fn from_json(json: &str) -> Result<Self, ContentError> { Ok(serde_json::from_str(json)?) }
}

impl From<PreviewPayload> for PlaylistItem {
    fn from(payload: PreviewPayload) -> Self {
        let (duration, repeat_count) = match payload.timing {
            Timing::Duration(d) => (Some(d), None),
            Timing::RepeatCount(n) => (None, Some(n)),
        };
        Self { id: None, border_effect: payload.border_effect, content: payload.content, duration, repeat_count }
    }
}
