//! Per-editor glue between form state, keyframe playback and the shared
//! preview session.

use session::SessionError;
use thiserror::Error;
use timeline::TimelineError;

mod binding;
mod change;
mod clock;

pub use binding::{EditorPreviewBinding, MSG_EXPIRED, MSG_IN_USE, MSG_NOT_PLAYABLE};
pub use change::EditorChange;
pub use clock::PlaybackClock;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Timeline(#[from] TimelineError),
    #[error("content is not an image")]
    NotAnImage,
    #[error("animation is not enabled")]
    AnimationDisabled,
    #[error("edit does not apply to the current content")]
    NotApplicable,
}
