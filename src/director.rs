//! Interaction director.
//!
//! Each frame decides whether real input or a phantom swipe feeds the fluid
//! lead, smooths the lead and its trail toward that target, drives opacity
//! ramps and decay, and writes the result into [`ShaderParams`].

use lyon::math::{point, vector, Point, Vector};
use std::f32::consts::TAU;
use std::time::Duration;

use crate::fluid::{ambient_blobs, REVEAL_RADIUS};
use crate::noise::noise_offset;
use crate::params::{ShaderParams, TrailSlot, INACTIVE_POSITION, TRAIL_LENGTH};
use crate::phantom::{PhantomGenerator, PhantomSwipe, TimedEventPool};
use crate::snapshot::InteractionSnapshot;
use crate::util::{smooth, smooth_scalar};

/// Real input younger than this makes the user the motion source.
pub const ACTIVE_WINDOW: Duration = Duration::from_millis(500);
/// Real input younger than this is reported as active to the host.
pub const SNAPSHOT_WINDOW: Duration = Duration::from_millis(2000);
pub const PHANTOM_INTERVAL: Duration = Duration::from_millis(2000);
pub const MAX_PHANTOM_SWIPES: usize = 3;
/// Opacity starts decaying this long after the target last moved.
pub const FADE_DELAY: Duration = Duration::from_millis(1000);
/// Opacity is forced to zero this long after the target last moved.
pub const FADE_OUT: Duration = Duration::from_millis(2500);

pub const LEAD_LAG: f32 = 0.12;
pub const TRAIL_LAG: [f32; TRAIL_LENGTH] = [0.08, 0.06, 0.04, 0.025];
pub const LEAD_DECAY: f32 = 0.92;
pub const TRAIL_DECAY: [f32; TRAIL_LENGTH] = [0.93, 0.94, 0.95, 0.96];
/// Opacity gained per frame while motion is fresh.
pub const LEAD_RAMP: f32 = 0.15;
pub const TRAIL_RAMP: [f32; TRAIL_LENGTH] = [0.12, 0.1, 0.08, 0.06];

/// Per-frame lead displacement that maps to full speed.
pub const SPEED_NORMALIZER: f32 = 0.02;
pub const SPEED_SMOOTHING: f32 = 0.2;
/// Target displacement below which the target counts as unchanged.
const TARGET_EPSILON: f32 = 1e-4;

pub const XRAY_LAG: f32 = 0.08;
/// Idle easing of the parallax pointer back to the centre.
pub const POINTER_RETURN_LAG: f32 = 0.03;
/// Noise time advances at this fraction of wall time.
pub const NOISE_TIME_SCALE: f32 = 0.35;

#[derive(Debug, Clone, PartialEq)]
pub struct DirectorConfig {
    pub active_window: Duration,
    pub snapshot_window: Duration,
    pub phantom_interval: Duration,
    pub max_phantom_swipes: usize,
    pub fade_delay: Duration,
    pub fade_out: Duration,
    pub lead_lag: f32,
    pub trail_lag: [f32; TRAIL_LENGTH],
    pub lead_decay: f32,
    pub trail_decay: [f32; TRAIL_LENGTH],
    pub reveal_radius: f32,
    /// Phantom swipes still move the lead but render no lead or trail.
    pub suppress_phantom_visuals: bool,
    /// Seed for the phantom generator; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            active_window: ACTIVE_WINDOW,
            snapshot_window: SNAPSHOT_WINDOW,
            phantom_interval: PHANTOM_INTERVAL,
            max_phantom_swipes: MAX_PHANTOM_SWIPES,
            fade_delay: FADE_DELAY,
            fade_out: FADE_OUT,
            lead_lag: LEAD_LAG,
            trail_lag: TRAIL_LAG,
            lead_decay: LEAD_DECAY,
            trail_decay: TRAIL_DECAY,
            reveal_radius: REVEAL_RADIUS,
            suppress_phantom_visuals: false,
            seed: None,
        }
    }
}

/// Which position feeds the mask this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionSource {
    Idle,
    UserActive,
    PhantomActive,
}

/// Lagged positions following the lead, each chasing the one before it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrailHistory {
    pub slots: [TrailSlot; TRAIL_LENGTH],
}

impl TrailHistory {
    fn snap_to(&mut self, position: Point) {
        for slot in &mut self.slots {
            slot.position = position;
        }
    }

    fn follow(&mut self, lead: Point, lags: &[f32; TRAIL_LENGTH]) {
        let mut leader = lead;
        for (slot, lag) in self.slots.iter_mut().zip(lags) {
            slot.position = smooth(slot.position, leader, *lag);
            leader = slot.position;
        }
    }
}

#[derive(Debug)]
pub struct InteractionDirector {
    config: DirectorConfig,
    generator: PhantomGenerator,
    swipes: TimedEventPool<PhantomSwipe>,
    last_input_at: Option<Duration>,
    user_target: Option<Point>,
    target: Option<Point>,
    last_target_change: Duration,
    lead: Option<Point>,
    lead_opacity: f32,
    direction: Vector,
    speed: f32,
    trail: TrailHistory,
    pointer: Point,
    xray_center: Point,
    source: MotionSource,
}

impl InteractionDirector {
    pub fn new(config: DirectorConfig) -> Self {
        let generator = PhantomGenerator::new(config.seed);
        let swipes = TimedEventPool::new(
            config.phantom_interval,
            config.max_phantom_swipes,
            config.active_window + config.phantom_interval,
        );
        Self {
            config,
            generator,
            swipes,
            last_input_at: None,
            user_target: None,
            target: None,
            last_target_change: Duration::ZERO,
            lead: None,
            lead_opacity: 0.0,
            direction: vector(0.0, 0.0),
            speed: 0.0,
            trail: TrailHistory::default(),
            pointer: point(0.5, 0.5),
            xray_center: point(0.5, 0.5),
            source: MotionSource::Idle,
        }
    }

    pub fn config(&self) -> &DirectorConfig {
        &self.config
    }

    /// Records real pointer or touch input at `uv` (element UV space).
    pub fn pointer_moved(&mut self, now: Duration, uv: Point) {
        self.last_input_at = Some(now);
        self.user_target = Some(uv);
        self.swipes.defer_until(now + self.config.active_window + self.config.phantom_interval);
    }

    fn input_age(&self, now: Duration) -> Option<Duration> {
        self.last_input_at.map(|at| now.saturating_sub(at))
    }

    pub fn is_user_active(&self, now: Duration) -> bool {
        self.input_age(now)
            .is_some_and(|age| age <= self.config.active_window)
    }

    pub fn motion_source(&self) -> MotionSource {
        self.source
    }

    pub fn active_swipe_count(&self) -> usize {
        self.swipes.len()
    }

    pub fn lead(&self) -> Option<Point> {
        self.lead
    }

    pub fn lead_opacity(&self) -> f32 {
        self.lead_opacity
    }

    pub fn trail(&self) -> &TrailHistory {
        &self.trail
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn direction(&self) -> Vector {
        self.direction
    }

    fn update_phantoms(&mut self, now: Duration, user_active: bool) -> Option<Point> {
        self.swipes.retire_finished(now);
        if !user_active && self.swipes.is_due(now) {
            let swipe = self.generator.next_swipe(now, self.lead);
            self.swipes.push(now, swipe);
        }
        self.swipes.latest().map(|swipe| swipe.position(now))
    }

    fn update_opacity(&mut self, now: Duration) {
        let since_change = now.saturating_sub(self.last_target_change);
        if self.lead.is_none() || since_change >= self.config.fade_out {
            self.lead_opacity = 0.0;
            for slot in &mut self.trail.slots {
                slot.opacity = 0.0;
            }
        } else if since_change >= self.config.fade_delay {
            self.lead_opacity *= self.config.lead_decay;
            for (slot, decay) in self.trail.slots.iter_mut().zip(self.config.trail_decay) {
                slot.opacity *= decay;
            }
        } else {
            self.lead_opacity = (self.lead_opacity + LEAD_RAMP).min(1.0);
            for (slot, ramp) in self.trail.slots.iter_mut().zip(TRAIL_RAMP) {
                slot.opacity = (slot.opacity + ramp).min(1.0);
            }
        }
    }

    /// Lissajous path followed by the x-ray spotlight when nobody is pointing.
    fn idle_xray_target(time: f32) -> Point {
        let jitter = noise_offset(31.0, time * 0.1) * 0.03;
        point(
            0.5 + 0.22 * (time * 0.07 * TAU).sin(),
            0.45 + 0.18 * (time * 0.11 * TAU + 1.1).sin(),
        ) + jitter
    }

    /// Advances one frame and writes the result into `params`.
    pub fn update(&mut self, now: Duration, params: &mut ShaderParams) -> InteractionSnapshot {
        let user_active = self.is_user_active(now);
        let phantom_target = self.update_phantoms(now, user_active);

        let (target, source) = match (user_active, self.user_target, phantom_target) {
            (true, Some(user), _) => (Some(user), MotionSource::UserActive),
            (false, _, Some(phantom)) => (Some(phantom), MotionSource::PhantomActive),
            _ => (self.target, MotionSource::Idle),
        };
        self.source = source;

        if let Some(target) = target {
            let moved = self
                .target
                .map_or(true, |previous| previous.distance_to(target) > TARGET_EPSILON);
            if moved {
                self.last_target_change = now;
            }
            self.target = Some(target);

            match self.lead {
                None => {
                    self.lead = Some(target);
                    self.trail.snap_to(target);
                }
                Some(lead) => {
                    let next = smooth(lead, target, self.config.lead_lag);
                    let displacement = next - lead;
                    let length = displacement.length();
                    if length > 1e-6 {
                        self.direction = displacement / length;
                    }
                    let raw_speed = (length / SPEED_NORMALIZER).min(1.0);
                    self.speed = smooth_scalar(self.speed, raw_speed, SPEED_SMOOTHING).clamp(0.0, 1.0);
                    self.lead = Some(next);
                    self.trail.follow(next, &self.config.trail_lag);
                }
            }
        } else {
            self.speed = smooth_scalar(self.speed, 0.0, SPEED_SMOOTHING);
        }

        self.update_opacity(now);

        let time = now.as_secs_f32();
        let (pointer_target, pointer_lag) = match (user_active, self.user_target) {
            (true, Some(user)) => (user, self.config.lead_lag),
            _ => (point(0.5, 0.5), POINTER_RETURN_LAG),
        };
        self.pointer = smooth(self.pointer, pointer_target, pointer_lag);
        let xray_target = match (user_active, self.user_target) {
            (true, Some(user)) => user,
            _ => Self::idle_xray_target(time),
        };
        self.xray_center = smooth(self.xray_center, xray_target, XRAY_LAG);

        self.write_params(time, params);
        self.snapshot(now)
    }

    fn write_params(&self, time: f32, params: &mut ShaderParams) {
        params.time = time;
        params.noise_time = time * NOISE_TIME_SCALE;
        params.gloss_phase = time;
        params.pointer = self.pointer;
        params.lead = self.lead.unwrap_or(INACTIVE_POSITION);
        params.lead_opacity = self.lead_opacity;
        params.direction = self.direction;
        params.speed = self.speed;
        params.reveal_radius = self.config.reveal_radius;
        params.trail = self.trail.slots;
        params.ambient = ambient_blobs(params.noise_time);
        params.phantom_mode = self.source == MotionSource::PhantomActive;
        params.suppress_phantom_visuals = self.config.suppress_phantom_visuals;
        params.xray_center = self.xray_center;
        params.enforce_ranges();
    }

    /// Host-facing state. Phantom motion never makes it active.
    pub fn snapshot(&self, now: Duration) -> InteractionSnapshot {
        let is_active = self
            .input_age(now)
            .is_some_and(|age| age <= self.config.snapshot_window);
        InteractionSnapshot {
            is_active,
            intensity: if is_active { self.lead_opacity } else { 0.0 },
            position: self
                .user_target
                .filter(|_| is_active)
                .or(self.lead)
                .unwrap_or(point(0.5, 0.5)),
        }
    }
}
