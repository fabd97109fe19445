// src/world.rs
//!
//! The simulation world: owns the Rapier pipeline and every body in it.
//!
//! ## Usage
//! ```no_run
//! use glam::{Quat, Vec3};
//! use rigid_bridge::{World, WorldConfig};
//!
//! let mut world = World::new();
//! world.setup(WorldConfig::default())?;
//!
//! let ball = world.add_sphere(4.0, Vec3::new(0.0, 50.0, 0.0), Quat::IDENTITY, 1000.0)?;
//! let handle = ball.as_dynamic()?;
//!
//! world.update(1.0 / 60.0);
//! handle.apply_impulse_force(&mut world, Vec3::Y * 10.0, false);
//! println!("ball at {}", handle.position(&world));
//! # Ok::<(), rigid_bridge::Error>(())
//! ```
//!
//! Densities passed to the factories are per cubic metre and converted with the
//! world's [`WorldScale`]; positions, sizes, forces and torques are in world
//! units and go to the engine unchanged.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::{Quat, Vec3};
use rapier3d::dynamics::{
    CCDSolver, ImpulseJointSet, IntegrationParameters, IslandManager, MultibodyJointSet,
    RigidBody, RigidBodyBuilder, RigidBodyHandle, RigidBodySet,
};
use rapier3d::geometry::{BroadPhase, Collider, ColliderBuilder, ColliderHandle, ColliderSet, NarrowPhase};
use rapier3d::math::{Isometry, Real, Vector};
use rapier3d::parry::shape::SharedShape;
use rapier3d::pipeline::{PhysicsPipeline, QueryPipeline};

use crate::actor::{Actor, ActorKind};
use crate::config::{WorldConfig, FALLBACK_DT};
use crate::convert::{isometry_from_parts, vector_from_sim, vector_to_sim};
use crate::debug_draw::{DebugDrawer, DebugRenderBuffer};
use crate::scale::WorldScale;
use crate::shape::ShapeGeometry;
use crate::time::FrameClock;
use crate::{Error, Result};

/* -------------------------------------------------------------------------- */
/*                                  Scene                                     */
/* -------------------------------------------------------------------------- */

/// Engine-side state. Exists only between a successful `setup` and `clear`.
struct Scene {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
}

impl Scene {
    fn new(config: &WorldConfig) -> Self {
        let scale = config.world_scale;
        let mut params = IntegrationParameters::default();
        params.dt = FALLBACK_DT;
        // Tolerances are tuned for metres; keep them the same physical size.
        params.allowed_linear_error = scale.length_to_sim(params.allowed_linear_error);
        params.prediction_distance = scale.length_to_sim(params.prediction_distance);

        Self {
            gravity: vector_to_sim(config.gravity()),
            integration_parameters: params,
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );

        // Continuous forces last for a single step.
        for (_, body) in self.bodies.iter_mut() {
            if body.is_dynamic() {
                body.reset_forces(false);
                body.reset_torques(false);
            }
        }
    }

    fn create_rigid(&mut self, pos: Vec3, rot: Quat, kind: ActorKind, config: &WorldConfig) -> RigidBodyHandle {
        let iso = isometry_from_parts(pos, rot);
        let body = match kind {
            ActorKind::Dynamic => RigidBodyBuilder::dynamic()
                .position(iso)
                .linear_damping(config.linear_damping)
                .angular_damping(config.angular_damping),
            ActorKind::Static => RigidBodyBuilder::fixed().position(iso),
        };
        self.bodies.insert(body.build())
    }

    fn attach(
        &mut self,
        body: RigidBodyHandle,
        shape: SharedShape,
        local: Isometry<Real>,
        density: f32,
        config: &WorldConfig,
    ) -> ColliderHandle {
        let collider = ColliderBuilder::new(shape)
            .position(local)
            .density(density)
            .friction(config.friction)
            .restitution(config.restitution)
            .build();
        self.colliders.insert_with_parent(collider, body, &mut self.bodies)
    }

    fn remove(&mut self, handle: RigidBodyHandle) -> bool {
        self.bodies
            .remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }
}

/* -------------------------------------------------------------------------- */
/*                                  World                                     */
/* -------------------------------------------------------------------------- */

pub struct World {
    scene: Option<Scene>,
    config: WorldConfig,
    debug: DebugRenderBuffer,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// An empty world. Nothing works until [`setup`](Self::setup) succeeds.
    pub fn new() -> Self {
        Self {
            scene: None,
            config: WorldConfig::default(),
            debug: DebugRenderBuffer::new(),
        }
    }

    /// Build the engine from `config`, replacing any previous scene.
    ///
    /// The config is validated before anything is built, and the new scene is
    /// only installed once it is complete, so a failed setup leaves the world
    /// torn down rather than half-built.
    pub fn setup(&mut self, config: WorldConfig) -> Result<()> {
        self.clear();

        if let Err(err) = config.validate() {
            log::error!("world setup failed: {err}");
            return Err(err.context("world setup"));
        }

        let scene = Scene::new(&config);
        log::info!(
            "world set up: scale {}, gravity {}",
            config.world_scale.world_scale(),
            config.gravity()
        );
        self.scene = Some(scene);
        self.config = config;
        Ok(())
    }

    #[inline]
    pub fn is_setup(&self) -> bool {
        self.scene.is_some()
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    #[inline]
    pub fn scale(&self) -> WorldScale {
        self.config.world_scale
    }

    /// Release every actor and the scene itself.
    pub fn clear(&mut self) {
        if let Some(scene) = self.scene.take() {
            log::debug!("world cleared, released {} actors", scene.bodies.len());
        }
        self.debug.clear();
    }

    /// Remove every actor but keep the scene.
    pub fn remove_all_actors(&mut self) {
        let Some(scene) = self.scene.as_mut() else { return };
        let handles: Vec<RigidBodyHandle> = scene.bodies.iter().map(|(h, _)| h).collect();
        for handle in handles {
            scene.remove(handle);
        }
        self.refresh_debug();
    }

    /// Advance the simulation by `frame_time` seconds. A non-positive (or NaN)
    /// frame time steps by 1/60 s instead.
    pub fn update(&mut self, frame_time: f32) {
        let Some(scene) = self.scene.as_mut() else {
            log::error!("update: call setup first");
            return;
        };

        let dt = if frame_time > 0.0 { frame_time } else { FALLBACK_DT };
        scene.step(dt);
        self.debug.rebuild(
            &scene.bodies,
            &scene.colliders,
            &scene.narrow_phase,
            &self.config.debug,
            &self.config.world_scale,
        );
    }

    /// Drop removed bodies from a buffer that is already showing something.
    fn refresh_debug(&mut self) {
        if self.debug.is_empty() {
            return;
        }
        match self.scene.as_ref() {
            Some(scene) => self.debug.rebuild(
                &scene.bodies,
                &scene.colliders,
                &scene.narrow_phase,
                &self.config.debug,
                &self.config.world_scale,
            ),
            None => self.debug.clear(),
        }
    }

    /// [`update`](Self::update) with the time measured by `clock`.
    pub fn update_with_clock(&mut self, clock: &mut FrameClock) {
        let dt = clock.tick();
        self.update(dt);
    }

    /// Replay the debug renderable produced by the last update.
    pub fn draw<D: DebugDrawer + ?Sized>(&self, drawer: &mut D) {
        if self.scene.is_none() {
            log::error!("draw: call setup first");
            return;
        }
        self.debug.replay(drawer);
    }

    pub fn debug_buffer(&self) -> &DebugRenderBuffer {
        &self.debug
    }

    pub fn set_gravity(&mut self, gravity: Vec3) -> Result<()> {
        if !gravity.is_finite() {
            return Err(Error::invalid_argument("gravity", format!("must be finite, got {gravity}")));
        }
        let (scene, _) = self.scene_and_config()?;
        scene.gravity = vector_to_sim(gravity);
        for (_, body) in scene.bodies.iter_mut() {
            if body.is_dynamic() {
                body.wake_up(true);
            }
        }
        Ok(())
    }

    pub fn gravity(&self) -> Option<Vec3> {
        self.scene.as_ref().map(|s| vector_from_sim(&s.gravity))
    }

    /* ------------------------------ factories ----------------------------- */

    /// Box from its half extents. `density > 0` makes it dynamic.
    pub fn add_box(&mut self, half_extents: Vec3, pos: Vec3, rot: Quat, density: f32) -> Result<Actor> {
        self.add_shape(ShapeGeometry::Box { half_extents }, pos, rot, density)
    }

    pub fn add_sphere(&mut self, radius: f32, pos: Vec3, rot: Quat, density: f32) -> Result<Actor> {
        self.add_shape(ShapeGeometry::Sphere { radius }, pos, rot, density)
    }

    /// Y-aligned capsule.
    pub fn add_capsule(&mut self, radius: f32, half_height: f32, pos: Vec3, rot: Quat, density: f32) -> Result<Actor> {
        self.add_shape(ShapeGeometry::Capsule { radius, half_height }, pos, rot, density)
    }

    /// Infinite plane through `pos` with normal `rot * +Y`. Planes are always static.
    pub fn add_plane(&mut self, pos: Vec3, rot: Quat, density: f32) -> Result<Actor> {
        if density > 0.0 {
            log::warn!("add_plane: planes are static, ignoring density {density}");
        }
        let local = isometry_from_parts(Vec3::ZERO, Quat::from_rotation_z(FRAC_PI_2));
        let (scene, config) = self.scene_and_config()?;
        let handle = scene.create_rigid(pos, rot, ActorKind::Static, config);
        scene.attach(handle, SharedShape::halfspace(Vector::x_axis()), local, 1.0, config);
        Ok(Actor::new(handle, ActorKind::Static))
    }

    /// One static actor with six inward-facing planes bounding the given corners.
    pub fn add_world_box(&mut self, left_bottom_far: Vec3, right_top_near: Vec3) -> Result<Actor> {
        if !left_bottom_far.cmplt(right_top_near).all() {
            return Err(Error::invalid_argument(
                "left_bottom_far",
                format!("must be below {right_top_near} on every axis, got {left_bottom_far}"),
            ));
        }
        let (lbf, rtn) = (left_bottom_far, right_top_near);
        let walls = [
            (Vec3::new(lbf.x, 0.0, 0.0), Quat::IDENTITY),
            (Vec3::new(rtn.x, 0.0, 0.0), Quat::from_axis_angle(Vec3::NEG_Z, PI)),
            (Vec3::new(0.0, lbf.y, 0.0), Quat::from_axis_angle(Vec3::Z, FRAC_PI_2)),
            (Vec3::new(0.0, rtn.y, 0.0), Quat::from_axis_angle(Vec3::NEG_Z, FRAC_PI_2)),
            (Vec3::new(0.0, 0.0, lbf.z), Quat::from_axis_angle(Vec3::NEG_Y, FRAC_PI_2)),
            (Vec3::new(0.0, 0.0, rtn.z), Quat::from_axis_angle(Vec3::Y, FRAC_PI_2)),
        ];

        let (scene, config) = self.scene_and_config()?;
        let handle = scene.create_rigid(Vec3::ZERO, Quat::IDENTITY, ActorKind::Static, config);
        for (pos, rot) in walls {
            let plane = SharedShape::halfspace(Vector::x_axis());
            scene.attach(handle, plane, isometry_from_parts(pos, rot), 1.0, config);
        }
        Ok(Actor::new(handle, ActorKind::Static))
    }

    /// Create an actor with a single shape of any supported geometry. Every
    /// field the shape uses must be finite and positive.
    pub fn add_shape(&mut self, geometry: ShapeGeometry, pos: Vec3, rot: Quat, density: f32) -> Result<Actor> {
        if geometry == ShapeGeometry::Plane {
            return self.add_plane(pos, rot, density);
        }
        if geometry.has_size() {
            geometry.check_size(geometry.size())?;
        }
        let Some(shape) = geometry.to_shared_shape() else {
            return Err(Error::invalid_argument("geometry", "unsupported shape type"));
        };
        if !density.is_finite() {
            return Err(Error::invalid_argument("density", format!("must be finite, got {density}")));
        }

        let kind = if density > 0.0 { ActorKind::Dynamic } else { ActorKind::Static };
        let sim_density = if density > 0.0 { self.scale().density_to_sim(density) } else { 1.0 };
        let (scene, config) = self.scene_and_config()?;
        let handle = scene.create_rigid(pos, rot, kind, config);
        scene.attach(handle, shape, Isometry::identity(), sim_density, config);
        log::debug!("added {kind} {:?} at {pos}", geometry.kind());
        Ok(Actor::new(handle, kind))
    }

    /// Remove and release an actor. Returns whether it was present.
    pub fn remove_actor(&mut self, handle: RigidBodyHandle) -> bool {
        let removed = self.scene.as_mut().map_or(false, |s| s.remove(handle));
        if removed {
            self.refresh_debug();
        }
        removed
    }

    /* ------------------------------ queries ------------------------------- */

    pub fn actor_count(&self) -> usize {
        self.scene.as_ref().map_or(0, |s| s.bodies.len())
    }

    pub fn contains(&self, handle: RigidBodyHandle) -> bool {
        self.rigid_body(handle).is_some()
    }

    pub fn actors(&self) -> impl Iterator<Item = (RigidBodyHandle, ActorKind)> + '_ {
        self.scene
            .iter()
            .flat_map(|s| s.bodies.iter().map(|(h, b)| (h, ActorKind::of(b))))
    }

    pub(crate) fn rigid_body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.scene.as_ref()?.bodies.get(handle)
    }

    pub(crate) fn rigid_body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.scene.as_mut()?.bodies.get_mut(handle)
    }

    pub(crate) fn collider(&self, handle: ColliderHandle) -> Option<&Collider> {
        self.scene.as_ref()?.colliders.get(handle)
    }

    pub(crate) fn collider_mut(&mut self, handle: ColliderHandle) -> Option<&mut Collider> {
        self.scene.as_mut()?.colliders.get_mut(handle)
    }

    fn scene_and_config(&mut self) -> Result<(&mut Scene, &WorldConfig)> {
        match self.scene.as_mut() {
            Some(scene) => Ok((scene, &self.config)),
            None => {
                log::error!("call setup first");
                Err(Error::NotSetUp)
            }
        }
    }
}
