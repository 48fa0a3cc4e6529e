use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::animation::AnimationDriver;
use crate::config::WidgetConfig;
use crate::reconciler::Reconciler;
use crate::surface::DisplaySurface;
use crate::types::{PlaybackState, RenderState};

pub type SharedSession<S> = Arc<Mutex<WidgetSession<S>>>;

/// All mutable state of one widget: the render memo, the spin accumulator
/// and the surface they draw on. One per widget, never shared between them.
pub struct WidgetSession<S> {
    render: RenderState,
    reconciler: Reconciler,
    animation: AnimationDriver,
    surface: S,
}

impl<S: DisplaySurface> WidgetSession<S> {
    pub fn new(config: &WidgetConfig, mut surface: S) -> Self {
        // No artwork token has been seen yet, which shows as the placeholder
        surface.clear_artwork(config.display.artwork_placeholder.as_deref());
        Self {
            render: RenderState::default(),
            reconciler: Reconciler::new(config.display.clone(), config.connection.artwork_url()),
            animation: AnimationDriver::new(&config.animation, config.display.ring),
            surface,
        }
    }

    /// Reconcile one snapshot against what is already shown
    pub fn apply(&mut self, state: &PlaybackState, now: Instant) {
        self.reconciler
            .apply(&mut self.render, state, &mut self.surface, now);
    }

    pub fn advance_frame(&mut self, now: Instant, wall_clock_secs: f64) {
        self.animation
            .frame(&self.render, &mut self.surface, now, wall_clock_secs);
    }

    pub fn render_state(&self) -> &RenderState {
        &self.render
    }

    pub fn animation(&self) -> &AnimationDriver {
        &self.animation
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}

pub fn create_session<S: DisplaySurface>(config: &WidgetConfig, surface: S) -> SharedSession<S> {
    Arc::new(Mutex::new(WidgetSession::new(config, surface)))
}

/// Feed parsed snapshots into the session until the sender goes away.
pub async fn run_updates<S: DisplaySurface>(
    session: SharedSession<S>,
    mut updates: mpsc::UnboundedReceiver<PlaybackState>,
) {
    while let Some(state) = updates.recv().await {
        session.lock().apply(&state, Instant::now());
    }

    log::warn!("State update channel closed");
}
