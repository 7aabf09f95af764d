//! Per-frame shader parameters.
//!
//! [`ShaderParams`] is written once per frame by the interaction director and
//! read by the compositor, either on the CPU or after being packed into
//! [`CompositorUniforms`] for the GPU.

use lyon::math::{point, vector, Point, Vector};

use crate::fluid::{AmbientBlob, AMBIENT_BLOB_COUNT, REVEAL_RADIUS};
use crate::texture_set::LayerPresence;
use crate::util::clamp01;

/// Number of lagged positions following the lead.
pub const TRAIL_LENGTH: usize = 4;

/// Position written for an inactive lead or trail slot.
pub const INACTIVE_POSITION: Point = Point::new(-1.0, -1.0);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailSlot {
    pub position: Point,
    pub opacity: f32,
}

impl Default for TrailSlot {
    fn default() -> Self {
        Self {
            position: INACTIVE_POSITION,
            opacity: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShaderParams {
    /// Seconds since mount.
    pub time: f32,
    /// Time base of the flow noise; slower than wall time.
    pub noise_time: f32,
    /// Continuously increasing phase of the gloss sweep.
    pub gloss_phase: f32,
    /// Surface size in physical pixels.
    pub width: u32,
    pub height: u32,
    pub parallax_strength: f32,
    /// Pointer used for parallax and shadow tint; eases back to the centre when idle.
    pub pointer: Point,
    /// Lead of the fluid reveal, or [`INACTIVE_POSITION`].
    pub lead: Point,
    pub lead_opacity: f32,
    /// Unit direction of travel of the lead.
    pub direction: Vector,
    /// Normalized speed in `[0, 1]`.
    pub speed: f32,
    pub reveal_radius: f32,
    pub trail: [TrailSlot; TRAIL_LENGTH],
    pub ambient: [AmbientBlob; AMBIENT_BLOB_COUNT],
    /// A phantom swipe drives the lead this frame.
    pub phantom_mode: bool,
    /// Zero lead and trail visuals while `phantom_mode` is set.
    pub suppress_phantom_visuals: bool,
    pub xray_center: Point,
    pub xray_radius: f32,
    pub xray_strength: f32,
    pub presence: LayerPresence,
}

impl ShaderParams {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            time: 0.0,
            noise_time: 0.0,
            gloss_phase: 0.0,
            width: width.max(1),
            height: height.max(1),
            parallax_strength: 0.16,
            pointer: point(0.5, 0.5),
            lead: INACTIVE_POSITION,
            lead_opacity: 0.0,
            direction: vector(0.0, 0.0),
            speed: 0.0,
            reveal_radius: REVEAL_RADIUS,
            trail: [TrailSlot::default(); TRAIL_LENGTH],
            ambient: [AmbientBlob::default(); AMBIENT_BLOB_COUNT],
            phantom_mode: false,
            suppress_phantom_visuals: false,
            xray_center: point(0.5, 0.5),
            xray_radius: 0.16,
            xray_strength: 1.0,
            presence: LayerPresence::default(),
        }
    }

    /// Width over height.
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn set_resolution(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    /// The lead position, unless it carries the inactive sentinel.
    pub fn active_lead(&self) -> Option<Point> {
        is_active_position(self.lead).then_some(self.lead)
    }

    /// Clamps every opacity into `[0, 1]` and every active position into UV space.
    pub fn enforce_ranges(&mut self) {
        self.lead_opacity = clamp01(self.lead_opacity);
        self.speed = clamp01(self.speed);
        self.xray_strength = clamp01(self.xray_strength);
        self.lead = clamp_position(self.lead);
        self.pointer = clamp_position(self.pointer);
        self.xray_center = clamp_position(self.xray_center);
        for slot in &mut self.trail {
            slot.opacity = clamp01(slot.opacity);
            slot.position = clamp_position(slot.position);
        }
        for blob in &mut self.ambient {
            blob.opacity = clamp01(blob.opacity);
        }
    }

    pub fn to_uniforms(&self) -> CompositorUniforms {
        let flag = |present: bool| if present { 1.0 } else { 0.0 };
        let presence = self.presence;

        let mut trail = [[0.0; 4]; TRAIL_LENGTH];
        for (packed, slot) in trail.iter_mut().zip(&self.trail) {
            *packed = [slot.position.x, slot.position.y, slot.opacity, 0.0];
        }
        let mut ambient = [[0.0; 4]; AMBIENT_BLOB_COUNT];
        for (packed, blob) in ambient.iter_mut().zip(&self.ambient) {
            *packed = [blob.center.x, blob.center.y, blob.opacity, blob.radius];
        }

        CompositorUniforms {
            time_params: [
                self.time,
                self.noise_time,
                self.gloss_phase,
                self.parallax_strength,
            ],
            resolution: [
                self.width as f32,
                self.height as f32,
                self.aspect(),
                self.reveal_radius,
            ],
            lead: [self.lead.x, self.lead.y, self.lead_opacity, self.speed],
            velocity: [
                self.direction.x,
                self.direction.y,
                flag(self.phantom_mode),
                flag(self.suppress_phantom_visuals),
            ],
            pointer: [
                self.pointer.x,
                self.pointer.y,
                self.xray_center.x,
                self.xray_center.y,
            ],
            xray: [self.xray_radius, self.xray_strength, 0.0, 0.0],
            flags_a: [
                flag(presence.depth),
                flag(presence.depth_lighten),
                flag(presence.depth_darken),
                flag(presence.shadow),
            ],
            flags_b: [
                flag(presence.kit),
                flag(presence.kit_depth),
                flag(presence.gloss),
                flag(presence.marble),
            ],
            trail,
            ambient,
        }
    }
}

pub fn is_active_position(position: Point) -> bool {
    position.x >= 0.0 && position.y >= 0.0
}

fn clamp_position(position: Point) -> Point {
    if is_active_position(position) {
        point(clamp01(position.x), clamp01(position.y))
    } else {
        INACTIVE_POSITION
    }
}

/// Uniform block of the compositor shader. Every member is a `vec4<f32>`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CompositorUniforms {
    /// time, noise time, gloss phase, parallax strength
    pub time_params: [f32; 4],
    /// width, height, aspect, reveal radius
    pub resolution: [f32; 4],
    /// x, y, opacity, speed
    pub lead: [f32; 4],
    /// direction x, direction y, phantom mode, suppress phantom visuals
    pub velocity: [f32; 4],
    /// parallax pointer x, y, x-ray centre x, y
    pub pointer: [f32; 4],
    /// radius, strength
    pub xray: [f32; 4],
    /// has depth, depth lighten, depth darken, shadow
    pub flags_a: [f32; 4],
    /// has kit, kit depth, gloss, marble
    pub flags_b: [f32; 4],
    pub trail: [[f32; 4]; TRAIL_LENGTH],
    pub ambient: [[f32; 4]; AMBIENT_BLOB_COUNT],
}
