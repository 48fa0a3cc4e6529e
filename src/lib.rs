//! Live "now playing" widget pipeline.
//!
//! A [`connection::ConnectionManager`] keeps one WebSocket open to the state
//! source and forwards parsed [`types::PlaybackState`] snapshots. The
//! [`reconciler::Reconciler`] applies each snapshot to a
//! [`surface::DisplaySurface`], touching only what changed, and the
//! [`animation::AnimationDriver`] animates the surface every frame from the
//! reconciled state. Both live inside one [`state::WidgetSession`].

pub mod animation;
pub mod artwork;
pub mod compositor;
pub mod config;
pub mod connection;
pub mod error;
pub mod format;
pub mod reconciler;
pub mod seed;
pub mod state;
pub mod surface;
pub mod types;

pub use config::{DisplayPolicy, WidgetConfig, WidgetVariant};
pub use error::{WidgetError, WidgetResult};
pub use state::{create_session, SharedSession, WidgetSession};
pub use surface::{DisplaySurface, FrameSurface};
pub use types::{ConnectionStatus, DisplayMode, PlaybackState, RenderState};
