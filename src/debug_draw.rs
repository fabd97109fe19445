// src/debug_draw.rs
//! Debug renderable: line and triangle lists describing the simulation, rebuilt
//! after every step and replayed into whatever the host draws with.
//!
//! Colours are packed `0xRRGGBB`, the form a host's hex-colour call takes.

use bytemuck::{Pod, Zeroable};
use glam::{Quat, Vec3};
use rapier3d::dynamics::RigidBodySet;
use rapier3d::geometry::{Collider, ColliderSet, NarrowPhase};
use rapier3d::parry::shape::ShapeType;
use serde::{Deserialize, Serialize};

use crate::convert::{point_from_sim, quat_from_sim, vector_from_sim};
use crate::scale::WorldScale;
use crate::{Error, Result};

pub const COLOR_RED: u32 = 0xFF0000;
pub const COLOR_GREEN: u32 = 0x00FF00;
pub const COLOR_BLUE: u32 = 0x0000FF;
pub const COLOR_STATIC: u32 = 0x808080;
pub const COLOR_AWAKE: u32 = 0xFFFFFF;
pub const COLOR_SLEEPING: u32 = 0x8080FF;
pub const COLOR_CONTACT: u32 = 0xFFFF00;
pub const COLOR_LINEAR_VELOCITY: u32 = 0x00FFFF;
pub const COLOR_ANGULAR_VELOCITY: u32 = 0xFF00FF;

/// Immediate-mode drawing provided by the host.
pub trait DebugDrawer {
    fn line(&mut self, from: Vec3, to: Vec3, color: u32);
    fn triangle(&mut self, a: Vec3, b: Vec3, c: Vec3, color: u32);
}

/// What gets visualised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugRenderConfig {
    pub enabled: bool,
    pub collision_shapes: bool,
    pub actor_axes: bool,
    /// One line per active contact point, along the contact normal.
    pub contact_normals: bool,
    /// Linear and angular velocity of moving dynamic bodies.
    pub velocities: bool,
    /// Axis length as a multiple of a tenth of the world scale.
    pub axes_factor: f32,
    /// Velocity line length per unit of speed, as a multiple of a tenth of the world scale.
    pub velocity_factor: f32,
    /// Segments per circle for spheres and capsules.
    pub circle_segments: u32,
    /// Half-width of the patch drawn for planes, as a multiple of the world scale.
    pub plane_extent: f32,
}

impl Default for DebugRenderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            collision_shapes: true,
            actor_axes: true,
            contact_normals: true,
            velocities: true,
            axes_factor: 3.0,
            velocity_factor: 0.01,
            circle_segments: 16,
            plane_extent: 1.0,
        }
    }
}

impl DebugRenderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.circle_segments < 3 {
            return Err(Error::Config(format!(
                "debug.circle_segments must be >= 3, got {}",
                self.circle_segments
            )));
        }
        if !self.axes_factor.is_finite() || self.axes_factor < 0.0 {
            return Err(Error::Config("debug.axes_factor must be finite and >= 0".into()));
        }
        if !self.velocity_factor.is_finite() || self.velocity_factor < 0.0 {
            return Err(Error::Config("debug.velocity_factor must be finite and >= 0".into()));
        }
        if !self.plane_extent.is_finite() || self.plane_extent < 0.0 {
            return Err(Error::Config("debug.plane_extent must be finite and >= 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugLine {
    pub pos0: Vec3,
    pub pos1: Vec3,
    pub color: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugTriangle {
    pub pos0: Vec3,
    pub pos1: Vec3,
    pub pos2: Vec3,
    pub color: u32,
}

/// GPU-ready vertex: position plus packed colour.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DebugVertex {
    pub position: [f32; 3],
    pub color: u32,
}

impl DebugVertex {
    #[inline]
    fn new(position: Vec3, color: u32) -> Self {
        Self { position: position.to_array(), color }
    }
}

#[derive(Debug, Default, Clone)]
pub struct DebugRenderBuffer {
    pub lines: Vec<DebugLine>,
    pub triangles: Vec<DebugTriangle>,
}

impl DebugRenderBuffer {
    pub fn new() -> Self {
        Self {
            lines: Vec::with_capacity(4096),
            triangles: Vec::with_capacity(256),
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.triangles.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.triangles.is_empty()
    }

    #[inline]
    pub fn line(&mut self, pos0: Vec3, pos1: Vec3, color: u32) {
        self.lines.push(DebugLine { pos0, pos1, color });
    }

    #[inline]
    pub fn triangle(&mut self, pos0: Vec3, pos1: Vec3, pos2: Vec3, color: u32) {
        self.triangles.push(DebugTriangle { pos0, pos1, pos2, color });
    }

    /// Two vertices per line, in order.
    pub fn line_vertices(&self) -> Vec<DebugVertex> {
        self.lines
            .iter()
            .flat_map(|l| [DebugVertex::new(l.pos0, l.color), DebugVertex::new(l.pos1, l.color)])
            .collect()
    }

    /// Three vertices per triangle, in order.
    pub fn triangle_vertices(&self) -> Vec<DebugVertex> {
        self.triangles
            .iter()
            .flat_map(|t| {
                [
                    DebugVertex::new(t.pos0, t.color),
                    DebugVertex::new(t.pos1, t.color),
                    DebugVertex::new(t.pos2, t.color),
                ]
            })
            .collect()
    }

    /// Feed every primitive to the host, lines first.
    pub fn replay<D: DebugDrawer + ?Sized>(&self, drawer: &mut D) {
        for l in &self.lines {
            drawer.line(l.pos0, l.pos1, l.color);
        }
        for t in &self.triangles {
            drawer.triangle(t.pos0, t.pos1, t.pos2, t.color);
        }
    }

    /// Regenerate from the current state of the engine.
    pub fn rebuild(
        &mut self,
        bodies: &RigidBodySet,
        colliders: &ColliderSet,
        narrow_phase: &NarrowPhase,
        config: &DebugRenderConfig,
        scale: &WorldScale,
    ) {
        self.clear();
        if !config.enabled {
            return;
        }

        if config.collision_shapes {
            for (_, collider) in colliders.iter() {
                let color = collider
                    .parent()
                    .and_then(|h| bodies.get(h))
                    .map_or(COLOR_STATIC, |b| {
                        if b.is_fixed() {
                            COLOR_STATIC
                        } else if b.is_sleeping() {
                            COLOR_SLEEPING
                        } else {
                            COLOR_AWAKE
                        }
                    });
                self.draw_collider(collider, color, config, scale);
            }
        }

        let unit = scale.world_scale() * 0.1;

        if config.contact_normals {
            for pair in narrow_phase.contact_pairs() {
                // Pairs of removed colliders linger until the next step.
                if !pair.has_any_active_contact
                    || colliders.get(pair.collider1).is_none()
                    || colliders.get(pair.collider2).is_none()
                {
                    continue;
                }
                for manifold in &pair.manifolds {
                    let normal = vector_from_sim(&manifold.data.normal);
                    for contact in &manifold.data.solver_contacts {
                        let p = point_from_sim(&contact.point);
                        self.line(p, p + normal * unit, COLOR_CONTACT);
                    }
                }
            }
        }

        if config.velocities {
            let factor = unit * config.velocity_factor;
            for (_, body) in bodies.iter() {
                if !body.is_dynamic() {
                    continue;
                }
                let origin = vector_from_sim(body.translation());
                let linvel = vector_from_sim(body.linvel());
                let angvel = vector_from_sim(body.angvel());
                if linvel != Vec3::ZERO {
                    self.line(origin, origin + linvel * factor, COLOR_LINEAR_VELOCITY);
                }
                if angvel != Vec3::ZERO {
                    self.line(origin, origin + angvel * factor, COLOR_ANGULAR_VELOCITY);
                }
            }
        }

        if config.actor_axes {
            let length = unit * config.axes_factor;
            for (_, body) in bodies.iter() {
                let origin = vector_from_sim(body.translation());
                let rot = quat_from_sim(body.rotation());
                self.line(origin, origin + rot * Vec3::X * length, COLOR_RED);
                self.line(origin, origin + rot * Vec3::Y * length, COLOR_GREEN);
                self.line(origin, origin + rot * Vec3::Z * length, COLOR_BLUE);
            }
        }
    }

    fn draw_collider(
        &mut self,
        collider: &Collider,
        color: u32,
        config: &DebugRenderConfig,
        scale: &WorldScale,
    ) {
        let iso = collider.position();
        let pos = vector_from_sim(&iso.translation.vector);
        let rot = quat_from_sim(&iso.rotation);
        let shape = collider.shape();
        let segments = config.circle_segments;

        match shape.shape_type() {
            ShapeType::Cuboid => {
                if let Some(c) = shape.as_cuboid() {
                    self.draw_box(pos, rot, vector_from_sim(&c.half_extents), color);
                }
            }
            ShapeType::Ball => {
                if let Some(b) = shape.as_ball() {
                    for (u, v) in [(Vec3::X, Vec3::Y), (Vec3::Y, Vec3::Z), (Vec3::Z, Vec3::X)] {
                        self.draw_circle(pos, rot * u, rot * v, b.radius, segments, color);
                    }
                }
            }
            ShapeType::Capsule => {
                if let Some(c) = shape.as_capsule() {
                    let a = pos + rot * point_from_sim(&c.segment.a);
                    let b = pos + rot * point_from_sim(&c.segment.b);
                    let axis = (b - a).normalize_or_zero();
                    let (u, v) = if axis == Vec3::ZERO {
                        (rot * Vec3::X, rot * Vec3::Z)
                    } else {
                        axis.any_orthonormal_pair()
                    };
                    self.draw_circle(a, u, v, c.radius, segments, color);
                    self.draw_circle(b, u, v, c.radius, segments, color);
                    for side in [u, -u, v, -v] {
                        self.line(a + side * c.radius, b + side * c.radius, color);
                    }
                }
            }
            ShapeType::HalfSpace => {
                if let Some(h) = shape.as_halfspace() {
                    let normal = rot * vector_from_sim(&h.normal);
                    let (u, v) = normal.any_orthonormal_pair();
                    let extent = scale.world_scale() * config.plane_extent;
                    let (u, v) = (u * extent, v * extent);
                    self.line(pos - u, pos + u, color);
                    self.line(pos - v, pos + v, color);
                    self.line(pos, pos + normal * extent * 0.25, color);
                    let corners = [pos - u - v, pos + u - v, pos + u + v, pos - u + v];
                    self.triangle(corners[0], corners[1], corners[2], color);
                    self.triangle(corners[0], corners[2], corners[3], color);
                }
            }
            _ => {
                let aabb = collider.compute_aabb();
                let min = point_from_sim(&aabb.mins);
                let max = point_from_sim(&aabb.maxs);
                self.draw_box((min + max) * 0.5, Quat::IDENTITY, (max - min) * 0.5, color);
            }
        }
    }

    fn draw_box(&mut self, center: Vec3, rot: Quat, half: Vec3, color: u32) {
        let corners: [Vec3; 8] = std::array::from_fn(|i| {
            let sign = Vec3::new(
                if i & 1 == 0 { -1.0 } else { 1.0 },
                if i & 2 == 0 { -1.0 } else { 1.0 },
                if i & 4 == 0 { -1.0 } else { 1.0 },
            );
            center + rot * (half * sign)
        });

        // Corners differing in exactly one bit share an edge.
        for a in 0..8usize {
            for bit in [1usize, 2, 4] {
                let b = a | bit;
                if b != a {
                    self.line(corners[a], corners[b], color);
                }
            }
        }
    }

    fn draw_circle(&mut self, center: Vec3, u: Vec3, v: Vec3, radius: f32, segments: u32, color: u32) {
        let step = std::f32::consts::TAU / segments as f32;
        let point = |i: u32| {
            let (s, c) = (i as f32 * step).sin_cos();
            center + (u * c + v * s) * radius
        };
        for i in 0..segments {
            self.line(point(i), point(i + 1), color);
        }
    }
}
