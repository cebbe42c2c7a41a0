//! Live preview session for the LED sign.
//!
//! Only one client may drive the physical display at a time. The server
//! arbitrates ownership; this crate acquires it, keeps it alive, pushes
//! payload updates (immediate or debounced), re-checks ownership when the
//! host returns to the foreground, and releases it on teardown.

mod config;
mod coordinator;
mod error;
mod transport;

pub use config::{PreviewConfig, DEBOUNCE_RANGE_MS};
pub use coordinator::{HostVisibility, PreviewSessionCoordinator, SessionEvent, SessionState};
pub use error::{ConfigError, SessionError, TransportError};
pub use transport::{HttpTransport, OwnershipResponse, PreviewTransport, StartResponse, UpdateResponse};
