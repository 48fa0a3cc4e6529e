//! Frame-driven motion: the eased platter spin and the procedural ring.
//!
//! Everything here advances once per display frame, independently of how
//! often playback state arrives.

use std::f64::consts::TAU;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::time::MissedTickBehavior;

use crate::config::AnimationConfig;
use crate::state::SharedSession;
use crate::surface::DisplaySurface;
use crate::types::RenderState;

/// Angular samples around the ring
pub const RING_BANDS: usize = 72;
/// Radius of the ring's centre line, in pixels
pub const RING_RADIUS: f64 = 170.0;
/// Time units for one full turn of the ring
pub const RING_PERIOD: f64 = 30.0;

const BAR_BASE: f64 = 8.0;
const BAR_RANGE: f64 = 28.0;

/// One radial bar of the ring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingSample {
    /// Absolute angle in radians, ring rotation included
    pub angle: f64,
    pub inner: f64,
    pub outer: f64,
}

/// Compute the ring for a moment in time.
///
/// Pure in `(time, seed)`: nothing is carried between frames, so the same
/// track at the same position always draws the same ring.
pub fn ring_samples(time: f64, seed: u32) -> Vec<RingSample> {
    let seed = f64::from(seed);
    let rotation = time.rem_euclid(RING_PERIOD) / RING_PERIOD * TAU;

    (0..RING_BANDS)
        .map(|i| {
            let a = i as f64 / RING_BANDS as f64 * TAU;
            let noise = ((a * 12.0 + seed * 0.0003 + time * 0.6).sin()
                + (a * 7.0 + time * 0.9 * seed * 0.0001).cos())
                / 2.0;
            let half = BAR_BASE + noise.abs() * BAR_RANGE;
            RingSample {
                angle: a + rotation,
                inner: RING_RADIUS - half,
                outer: RING_RADIUS + half,
            }
        })
        .collect()
}

/// Speed after `frames` steps of easing from rest toward `target`.
pub fn eased_speed(target: f64, easing: f64, frames: u32) -> f64 {
    let frames = i32::try_from(frames).unwrap_or(i32::MAX);
    target * (1.0 - (1.0 - easing).powi(frames))
}

/// Platter rotation with eased spin-up and spin-down.
#[derive(Debug, Clone)]
pub struct Spin {
    top_speed: f64,
    easing: f64,
    current_speed: f64,
    target_speed: f64,
    /// Accumulated rotation in turns, kept in `[0, 1)`
    rotation: f64,
}

impl Spin {
    pub fn new(config: &AnimationConfig) -> Self {
        Self {
            top_speed: config.spin_speed,
            easing: config.easing,
            current_speed: 0.0,
            target_speed: 0.0,
            rotation: 0.0,
        }
    }

    /// Advance one frame and return the rotation to apply.
    pub fn step(&mut self, playing: bool) -> f64 {
        self.target_speed = if playing { self.top_speed } else { 0.0 };
        self.current_speed += (self.target_speed - self.current_speed) * self.easing;
        self.rotation = (self.rotation + self.current_speed).rem_euclid(1.0);
        self.rotation
    }

    pub fn current_speed(&self) -> f64 {
        self.current_speed
    }

    pub fn target_speed(&self) -> f64 {
        self.target_speed
    }
}

/// Drives per-frame visuals from the reconciled render state.
#[derive(Debug, Clone)]
pub struct AnimationDriver {
    spin: Spin,
    ring: bool,
}

impl AnimationDriver {
    pub fn new(config: &AnimationConfig, ring: bool) -> Self {
        Self {
            spin: Spin::new(config),
            ring,
        }
    }

    pub fn spin(&self) -> &Spin {
        &self.spin
    }

    /// Render one frame. Only `is_playing`, the cached seed and the
    /// position anchor are read from the render state.
    pub fn frame<S>(&mut self, render: &RenderState, surface: &mut S, now: Instant, wall_clock_secs: f64)
    where
        S: DisplaySurface + ?Sized,
    {
        let rotation = self.spin.step(render.is_playing);
        surface.set_rotation(rotation);

        if self.ring {
            let time = render.time_base(now, wall_clock_secs);
            surface.draw_ring(&ring_samples(time, render.last_seed));
        }
    }
}

/// Seconds since the Unix epoch
pub fn wall_clock_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or(0.0)
}

/// Run the frame clock for the life of the session.
///
/// Each tick takes the session lock once, so a frame never observes a
/// half-applied state update.
pub async fn run_frames<S: DisplaySurface>(session: SharedSession<S>, frame_interval: Duration) {
    let mut ticker = tokio::time::interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    log::info!("Frame clock started ({:?} per frame)", frame_interval);

    loop {
        ticker.tick().await;
        session.lock().advance_frame(Instant::now(), wall_clock_secs());
    }
}
