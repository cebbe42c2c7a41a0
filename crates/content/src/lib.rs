//! Wire payload for the LED sign preview and the mapping from editor form
//! state onto it.

use thiserror::Error;

mod builder;
mod payload;

pub use builder::{build, EditorState, DEFAULT_DURATION_SECS, DEFAULT_REPEAT_COUNT};
pub use payload::{
    AnimationContent, BorderEffect, ClockContent, ClockFormat, Content, ImageContent, PlaylistItem, PreviewPayload,
    TextContent, Timing,
};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("invalid payload: {0}")]
    Json(#[from] serde_json::Error),
}
