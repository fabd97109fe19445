// src/actor.rs
//! Actor handles.
//!
//! Every factory on [`World`] hands back exactly one [`Actor`], the owning token
//! for the body it created. From it (or from a raw `RigidBodyHandle`) any number
//! of lightweight [`ActorHandle`]s can be made. Handles are `Copy` and do not
//! own anything: the world owns the body.
//!
//! A handle moves through `Empty -> Bound -> Disposed`. Physical operations on
//! a handle that is not bound, or whose body was removed through another alias,
//! are programmer errors and panic. Engine handles are generational, so a stale
//! alias is always detected rather than reading some other body.

use std::fmt;
use std::marker::PhantomData;

use glam::{EulerRot, Mat4, Quat, Vec3};
use rapier3d::dynamics::{RigidBody, RigidBodyHandle};
use serde::{Deserialize, Serialize};

use crate::convert::{quat_from_sim, vector_from_sim, vector_to_sim, ToHost};
use crate::shape;
use crate::world::World;
use crate::{Error, Result};

/// Whether an actor moves under simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorKind {
    Static,
    Dynamic,
}

impl ActorKind {
    /// Kind of an engine body. Kinematic bodies count as dynamic.
    pub fn of(body: &RigidBody) -> Self {
        if body.is_fixed() {
            ActorKind::Static
        } else {
            ActorKind::Dynamic
        }
    }
}

impl fmt::Display for ActorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorKind::Static => f.write_str("static"),
            ActorKind::Dynamic => f.write_str("dynamic"),
        }
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Type-level actor kind used to parameterise [`ActorHandle`].
pub trait KindMarker: sealed::Sealed + 'static {
    const KIND: ActorKind;
}

/// Marker for fixed bodies.
#[derive(Debug, Clone, Copy)]
pub enum Static {}

/// Marker for dynamic bodies.
#[derive(Debug, Clone, Copy)]
pub enum Dynamic {}

impl sealed::Sealed for Static {}
impl sealed::Sealed for Dynamic {}

impl KindMarker for Static {
    const KIND: ActorKind = ActorKind::Static;
}

impl KindMarker for Dynamic {
    const KIND: ActorKind = ActorKind::Dynamic;
}

pub type StaticHandle = ActorHandle<Static>;
pub type DynamicHandle = ActorHandle<Dynamic>;

/* -------------------------------------------------------------------------- */
/*                               Owning token                                 */
/* -------------------------------------------------------------------------- */

/// The one owning reference to a body created by a [`World`] factory.
///
/// Not `Clone`: disposing consumes it, so the owner cannot use it afterwards.
/// Aliases made with [`as_static`](Self::as_static) / [`as_dynamic`](Self::as_dynamic)
/// are invalidated by the disposal and panic if used.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "dropping an Actor leaks nothing but loses the only owning reference"]
pub struct Actor {
    handle: RigidBodyHandle,
    kind: ActorKind,
}

impl Actor {
    pub(crate) fn new(handle: RigidBodyHandle, kind: ActorKind) -> Self {
        Self { handle, kind }
    }

    #[inline]
    pub fn kind(&self) -> ActorKind {
        self.kind
    }

    #[inline]
    pub fn handle(&self) -> RigidBodyHandle {
        self.handle
    }

    pub fn as_static(&self) -> Result<StaticHandle> {
        ActorHandle::cast(self.handle, self.kind)
    }

    pub fn as_dynamic(&self) -> Result<DynamicHandle> {
        ActorHandle::cast(self.handle, self.kind)
    }

    /// Remove the body from its world and release it.
    pub fn dispose(self, world: &mut World) {
        world.remove_actor(self.handle);
    }
}

/* -------------------------------------------------------------------------- */
/*                               Weak handles                                 */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandleState {
    Empty,
    Bound(RigidBodyHandle),
    Disposed,
}

/// Non-owning, copyable handle to a body of kind `K`.
pub struct ActorHandle<K: KindMarker> {
    state: HandleState,
    _kind: PhantomData<fn() -> K>,
}

impl<K: KindMarker> Clone for ActorHandle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: KindMarker> Copy for ActorHandle<K> {}

impl<K: KindMarker> PartialEq for ActorHandle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.state == other.state
    }
}

impl<K: KindMarker> Eq for ActorHandle<K> {}

impl<K: KindMarker> Default for ActorHandle<K> {
    fn default() -> Self {
        Self::with_state(HandleState::Empty)
    }
}

impl<K: KindMarker> fmt::Debug for ActorHandle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorHandle")
            .field("kind", &K::KIND)
            .field("state", &self.state)
            .finish()
    }
}

impl<K: KindMarker> ActorHandle<K> {
    fn with_state(state: HandleState) -> Self {
        Self { state, _kind: PhantomData }
    }

    /// A handle bound to nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap a raw engine handle, checking the body's kind.
    ///
    /// Fails with [`Error::UnknownActor`] when the world holds no such body and
    /// with [`Error::ActorCast`] when the body is of the other kind.
    pub fn from_handle(world: &World, handle: RigidBodyHandle) -> Result<Self> {
        let Some(body) = world.rigid_body(handle) else {
            log::error!("cannot wrap {handle:?}: no such actor in the world");
            return Err(Error::UnknownActor);
        };
        Self::cast(handle, ActorKind::of(body))
    }

    fn cast(handle: RigidBodyHandle, found: ActorKind) -> Result<Self> {
        if found != K::KIND {
            log::error!("invalid cast: {handle:?} is {found}, wanted {}", K::KIND);
            return Err(Error::ActorCast { expected: K::KIND, found });
        }
        Ok(Self::with_state(HandleState::Bound(handle)))
    }

    #[inline]
    pub fn kind(&self) -> ActorKind {
        K::KIND
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        matches!(self.state, HandleState::Bound(_))
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.state == HandleState::Disposed
    }

    /// The engine handle while bound.
    #[inline]
    pub fn handle(&self) -> Option<RigidBodyHandle> {
        match self.state {
            HandleState::Bound(h) => Some(h),
            _ => None,
        }
    }

    fn bound(&self) -> RigidBodyHandle {
        match self.state {
            HandleState::Bound(h) => h,
            HandleState::Empty => panic!("{} actor handle is empty", K::KIND),
            HandleState::Disposed => panic!("{} actor handle was disposed", K::KIND),
        }
    }

    fn body<'w>(&self, world: &'w World) -> &'w RigidBody {
        let handle = self.bound();
        world
            .rigid_body(handle)
            .unwrap_or_else(|| panic!("{handle:?} is no longer in the world"))
    }

    fn body_mut<'w>(&self, world: &'w mut World) -> &'w mut RigidBody {
        let handle = self.bound();
        world
            .rigid_body_mut(handle)
            .unwrap_or_else(|| panic!("{handle:?} is no longer in the world"))
    }

    pub fn transform(&self, world: &World) -> Mat4 {
        self.body(world).position().to_host()
    }

    pub fn position(&self, world: &World) -> Vec3 {
        vector_from_sim(self.body(world).translation())
    }

    pub fn rotate(&self, world: &World) -> Quat {
        quat_from_sim(self.body(world).rotation())
    }

    /// Orientation as XYZ Euler angles, in radians.
    pub fn rotate_euler(&self, world: &World) -> Vec3 {
        let (x, y, z) = self.rotate(world).to_euler(EulerRot::XYZ);
        Vec3::new(x, y, z)
    }

    /// Semantic size of the actor's only shape, see [`shape`](crate::shape).
    ///
    /// Panics if the actor does not have exactly one shape.
    pub fn size(&self, world: &World) -> Vec3 {
        let collider = self.single_collider(world);
        let collider = world
            .collider(collider)
            .unwrap_or_else(|| panic!("{collider:?} is no longer in the world"));
        shape::read_size(collider)
    }

    /// Resize the actor's only shape, keeping its kind.
    ///
    /// Fails with [`Error::InvalidArgument`] if a field the shape uses is not
    /// finite and positive; the shape is then left unchanged. Panics if the
    /// actor does not have exactly one shape.
    pub fn set_size(&self, world: &mut World, size: Vec3) -> Result<&Self> {
        let collider = self.single_collider(world);
        let collider = world
            .collider_mut(collider)
            .unwrap_or_else(|| panic!("{collider:?} is no longer in the world"));
        shape::write_size(collider, size)?;
        Ok(self)
    }

    fn single_collider(&self, world: &World) -> rapier3d::geometry::ColliderHandle {
        let colliders = self.body(world).colliders();
        assert_eq!(
            colliders.len(),
            1,
            "size is only defined for actors with exactly one shape"
        );
        colliders[0]
    }

    /// Remove the body from its world and release it.
    ///
    /// Other handles aliasing the same body become stale. Calling this on an
    /// empty or already disposed handle does nothing.
    pub fn dispose(&mut self, world: &mut World) {
        if let HandleState::Bound(handle) = self.state {
            world.remove_actor(handle);
            self.state = HandleState::Disposed;
        }
    }
}

/* -------------------------------------------------------------------------- */
/*                            Dynamic-only API                                */
/* -------------------------------------------------------------------------- */

impl ActorHandle<Dynamic> {
    pub fn set_damping(&self, world: &mut World, linear: f32, angular: f32) -> &Self {
        let body = self.body_mut(world);
        body.set_linear_damping(linear);
        body.set_angular_damping(angular);
        self
    }

    /// Set the total mass, spread evenly over the actor's shapes.
    pub fn set_mass(&self, world: &mut World, mass: f32) -> &Self {
        let handle = self.bound();
        let colliders = self.body(world).colliders().to_vec();
        let share = mass / colliders.len().max(1) as f32;
        for ch in colliders {
            if let Some(collider) = world.collider_mut(ch) {
                collider.set_mass(share);
            }
        }
        if let Some(body) = world.rigid_body_mut(handle) {
            body.wake_up(true);
        }
        self
    }

    pub fn mass(&self, world: &World) -> f32 {
        self.body(world).mass()
    }

    /// Wake the body up.
    pub fn activate(&self, world: &mut World) -> &Self {
        self.body_mut(world).wake_up(true);
        self
    }

    pub fn linear_velocity(&self, world: &World) -> Vec3 {
        vector_from_sim(self.body(world).linvel())
    }

    pub fn angular_velocity(&self, world: &World) -> Vec3 {
        vector_from_sim(self.body(world).angvel())
    }

    /// Continuous force, integrated over the next step. With `is_local` the
    /// vector is taken in the body's frame.
    pub fn apply_force(&self, world: &mut World, force: Vec3, is_local: bool) -> &Self {
        let body = self.body_mut(world);
        let f = to_world_frame(body, force, is_local);
        body.add_force(f, true);
        self
    }

    /// Instantaneous change of momentum.
    pub fn apply_impulse_force(&self, world: &mut World, impulse: Vec3, is_local: bool) -> &Self {
        let body = self.body_mut(world);
        let f = to_world_frame(body, impulse, is_local);
        body.apply_impulse(f, true);
        self
    }

    pub fn apply_torque(&self, world: &mut World, torque: Vec3, is_local: bool) -> &Self {
        let body = self.body_mut(world);
        let t = to_world_frame(body, torque, is_local);
        body.add_torque(t, true);
        self
    }

    pub fn apply_impulse_torque(&self, world: &mut World, torque: Vec3, is_local: bool) -> &Self {
        let body = self.body_mut(world);
        let t = to_world_frame(body, torque, is_local);
        body.apply_torque_impulse(t, true);
        self
    }

    /// Drop continuous forces accumulated since the last step.
    pub fn clear_force(&self, world: &mut World) -> &Self {
        self.body_mut(world).reset_forces(false);
        self
    }

    /// Drop continuous torques accumulated since the last step.
    pub fn clear_torque(&self, world: &mut World) -> &Self {
        self.body_mut(world).reset_torques(false);
        self
    }
}

fn to_world_frame(
    body: &RigidBody,
    v: Vec3,
    is_local: bool,
) -> nalgebra::Vector3<f32> {
    let v = vector_to_sim(v);
    if is_local {
        body.rotation() * v
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;

    fn world() -> World {
        let mut world = World::new();
        world
            .setup(WorldConfig { gravity: Some([0.0, 0.0, 0.0]), ..WorldConfig::default() })
            .unwrap();
        world
    }

    #[test]
    fn factory_kinds() {
        let mut world = world();
        let ball = world.add_sphere(4.0, Vec3::ZERO, Quat::IDENTITY, 1000.0).unwrap();
        let ground = world.add_box(Vec3::splat(10.0), Vec3::ZERO, Quat::IDENTITY, 0.0).unwrap();
        assert_eq!(ball.kind(), ActorKind::Dynamic);
        assert_eq!(ground.kind(), ActorKind::Static);
        assert!(ball.as_dynamic().unwrap().is_bound());
        assert!(ground.as_static().unwrap().is_bound());
    }

    #[test]
    fn wrong_kind_is_an_error() {
        let mut world = world();
        let ball = world.add_sphere(4.0, Vec3::ZERO, Quat::IDENTITY, 1000.0).unwrap();

        let err = StaticHandle::from_handle(&world, ball.handle()).unwrap_err();
        assert_eq!(err, Error::ActorCast { expected: ActorKind::Static, found: ActorKind::Dynamic });
        assert!(ball.as_static().unwrap_err().is_actor_cast());
        assert!(DynamicHandle::from_handle(&world, ball.handle()).is_ok());
    }

    #[test]
    #[should_panic(expected = "empty")]
    fn failed_cast_then_use_panics() {
        let mut world = world();
        let ball = world.add_sphere(4.0, Vec3::ZERO, Quat::IDENTITY, 1000.0).unwrap();
        let handle = StaticHandle::from_handle(&world, ball.handle()).unwrap_or_default();
        assert!(!handle.is_bound());
        handle.position(&world);
    }

    #[test]
    fn unknown_actor() {
        let mut world = world();
        let ball = world.add_sphere(1.0, Vec3::ZERO, Quat::IDENTITY, 1000.0).unwrap();
        let raw = ball.handle();
        ball.dispose(&mut world);
        assert_eq!(DynamicHandle::from_handle(&world, raw).unwrap_err(), Error::UnknownActor);
    }

    #[test]
    fn reads_pose() {
        let mut world = world();
        let rot = Quat::from_rotation_y(0.5);
        let pos = Vec3::new(1.0, 2.0, 3.0);
        let ball = world.add_sphere(1.0, pos, rot, 1000.0).unwrap();
        let h = ball.as_dynamic().unwrap();

        assert_eq!(h.position(&world), pos);
        assert!(h.rotate(&world).abs_diff_eq(rot, 1e-6));
        assert!(h.transform(&world).abs_diff_eq(Mat4::from_rotation_translation(rot, pos), 1e-5));
        assert!(h.rotate_euler(&world).abs_diff_eq(Vec3::new(0.0, 0.5, 0.0), 1e-5));
    }

    #[test]
    fn sizes_through_handles() {
        let mut world = world();
        let cube = world.add_box(Vec3::splat(10.0), Vec3::ZERO, Quat::IDENTITY, 0.0).unwrap();
        let h = cube.as_static().unwrap();
        assert_eq!(h.size(&world), Vec3::splat(10.0));
        h.set_size(&mut world, Vec3::splat(5.0)).unwrap();
        assert_eq!(h.size(&world), Vec3::splat(5.0));

        let pill = world.add_capsule(1.0, 3.0, Vec3::ZERO, Quat::IDENTITY, 1000.0).unwrap();
        let p = pill.as_dynamic().unwrap();
        assert!(p.size(&world).abs_diff_eq(Vec3::new(1.0, 3.0, 0.0), 1e-6));

        let plane = world.add_plane(Vec3::ZERO, Quat::IDENTITY, 0.0).unwrap();
        assert_eq!(plane.as_static().unwrap().size(&world), Vec3::ZERO);
    }

    #[test]
    #[should_panic(expected = "exactly one shape")]
    fn size_of_world_box_panics() {
        let mut world = world();
        let bounds = world.add_world_box(Vec3::splat(-10.0), Vec3::splat(10.0)).unwrap();
        bounds.as_static().unwrap().size(&world);
    }

    #[test]
    fn dispose_is_idempotent() {
        let mut world = world();
        let ball = world.add_sphere(1.0, Vec3::ZERO, Quat::IDENTITY, 1000.0).unwrap();
        let mut h = ball.as_dynamic().unwrap();
        assert_eq!(world.actor_count(), 1);

        h.dispose(&mut world);
        assert!(h.is_disposed());
        assert!(!h.is_bound());
        assert_eq!(world.actor_count(), 0);

        h.dispose(&mut world);
        assert!(h.is_disposed());

        let mut empty = DynamicHandle::empty();
        empty.dispose(&mut world);
        assert!(!empty.is_disposed());
    }

    #[test]
    #[should_panic(expected = "no longer in the world")]
    fn stale_alias_panics() {
        let mut world = world();
        let ball = world.add_sphere(1.0, Vec3::ZERO, Quat::IDENTITY, 1000.0).unwrap();
        let mut a = ball.as_dynamic().unwrap();
        let b = a;
        a.dispose(&mut world);
        b.position(&world);
    }

    #[test]
    #[should_panic(expected = "disposed")]
    fn disposed_handle_panics() {
        let mut world = world();
        let ball = world.add_sphere(1.0, Vec3::ZERO, Quat::IDENTITY, 1000.0).unwrap();
        let mut h = ball.as_dynamic().unwrap();
        h.dispose(&mut world);
        h.apply_force(&mut world, Vec3::X, false);
    }

    #[test]
    fn impulse_moves_the_body() {
        let mut world = world();
        let ball = world.add_sphere(1.0, Vec3::ZERO, Quat::IDENTITY, 1000.0).unwrap();
        let h = ball.as_dynamic().unwrap();
        h.apply_impulse_force(&mut world, Vec3::new(0.0, 0.0, 5.0), false);
        world.update(1.0 / 60.0);
        let v = h.linear_velocity(&world);
        assert!(h.position(&world).z > 0.0);
        assert!(v.z > 0.0);
        assert_eq!(v.x, 0.0);
    }

    #[test]
    fn local_force_follows_orientation() {
        let mut world = world();
        // Rotated a quarter turn about Y: local +X points along world -Z.
        let rot = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let ball = world.add_sphere(1.0, Vec3::ZERO, rot, 1000.0).unwrap();
        let h = ball.as_dynamic().unwrap();

        h.apply_impulse_force(&mut world, Vec3::X, true);
        world.update(1.0 / 60.0);
        let v = h.linear_velocity(&world);
        assert!(v.z < 0.0);
        assert!(v.x.abs() < v.z.abs() * 1e-4);
    }

    #[test]
    fn force_is_spent_by_one_step() {
        let mut world = world();
        let ball = world.add_sphere(1.0, Vec3::ZERO, Quat::IDENTITY, 1000.0).unwrap();
        let h = ball.as_dynamic().unwrap();

        h.apply_force(&mut world, Vec3::new(100.0, 0.0, 0.0), false);
        world.update(1.0 / 60.0);
        let after_push = h.linear_velocity(&world).x;
        assert!(after_push > 0.0);

        world.update(1.0 / 60.0);
        let coasting = h.linear_velocity(&world).x;
        assert!(coasting <= after_push);
    }

    #[test]
    fn cleared_force_does_nothing() {
        let mut world = world();
        let ball = world.add_sphere(1.0, Vec3::ZERO, Quat::IDENTITY, 1000.0).unwrap();
        let h = ball.as_dynamic().unwrap();

        h.apply_force(&mut world, Vec3::new(100.0, 0.0, 0.0), false)
            .apply_torque(&mut world, Vec3::new(0.0, 100.0, 0.0), false);
        h.clear_force(&mut world).clear_torque(&mut world);
        world.update(1.0 / 60.0);
        assert_eq!(h.linear_velocity(&world), Vec3::ZERO);
        assert_eq!(h.angular_velocity(&world), Vec3::ZERO);
    }

    #[test]
    fn torque_impulse_spins() {
        let mut world = world();
        let ball = world.add_box(Vec3::ONE, Vec3::ZERO, Quat::IDENTITY, 1000.0).unwrap();
        let h = ball.as_dynamic().unwrap();
        h.apply_impulse_torque(&mut world, Vec3::new(0.0, 1.0, 0.0), false);
        world.update(1.0 / 60.0);
        assert!(h.angular_velocity(&world).y > 0.0);
    }

    #[test]
    fn set_mass_after_step() {
        let mut world = world();
        let ball = world.add_sphere(1.0, Vec3::ZERO, Quat::IDENTITY, 1000.0).unwrap();
        let h = ball.as_dynamic().unwrap();
        h.set_mass(&mut world, 3.0).set_damping(&mut world, 0.0, 0.0).activate(&mut world);
        world.update(1.0 / 60.0);
        assert!((h.mass(&world) - 3.0).abs() < 1e-4);
    }

    #[test]
    fn bad_size_is_rejected_and_world_stays_sane() {
        let mut world = world();
        let ball = world.add_sphere(10.0, Vec3::ZERO, Quat::IDENTITY, 1000.0).unwrap();
        let h = ball.as_dynamic().unwrap();

        assert!(h.set_size(&mut world, Vec3::new(-5.0, 0.0, 0.0)).unwrap_err().is_invalid_argument());
        assert!(h.set_size(&mut world, Vec3::new(f32::NAN, 0.0, 0.0)).is_err());
        assert_eq!(h.size(&world), Vec3::new(10.0, 0.0, 0.0));

        h.apply_impulse_force(&mut world, Vec3::X, false);
        for _ in 0..3 {
            world.update(1.0 / 60.0);
        }
        assert!(h.mass(&world) > 0.0);
        assert!(h.position(&world).is_finite());
    }

    #[test]
    fn local_torque_impulse_follows_orientation() {
        let mut world = world();
        // A quarter turn about Z takes local +Y to world -X.
        let rot = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let cube = world.add_box(Vec3::ONE, Vec3::ZERO, rot, 1000.0).unwrap();
        let h = cube.as_dynamic().unwrap();

        h.apply_impulse_torque(&mut world, Vec3::new(0.0, 0.01, 0.0), true);
        world.update(1.0 / 60.0);
        let w = h.angular_velocity(&world);
        assert!(w.x < 0.0, "spin axis {w}");
        assert!(w.y.abs() < w.x.abs() * 1e-3);
        assert!(w.z.abs() < w.x.abs() * 1e-3);
    }

    #[test]
    fn local_torque_follows_orientation() {
        let mut world = world();
        // A quarter turn about Y takes local +X to world -Z.
        let rot = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let cube = world.add_box(Vec3::ONE, Vec3::ZERO, rot, 1000.0).unwrap();
        let h = cube.as_dynamic().unwrap();

        h.apply_torque(&mut world, Vec3::new(0.5, 0.0, 0.0), true);
        world.update(1.0 / 60.0);
        let w = h.angular_velocity(&world);
        assert!(w.z < 0.0, "spin axis {w}");
        assert!(w.x.abs() < w.z.abs() * 1e-3);
        assert!(w.y.abs() < w.z.abs() * 1e-3);
    }
}
