// src/lib.rs
//! Rigid-body physics for a glam-based host, backed by Rapier.
//!
//! The host works in its own units (centimetres by default) and its own math
//! types. [`World`] owns the simulation, [`Actor`] owns one body in it, and
//! [`ActorHandle`] is the cheap typed view used to move, size and push that body.
//!
//! ```no_run
//! use glam::{Quat, Vec3};
//! use rigid_bridge::{World, WorldConfig};
//!
//! let mut world = World::new();
//! world.setup(WorldConfig::default())?;
//! let _bounds = world.add_world_box(Vec3::splat(-500.0), Vec3::splat(500.0))?;
//! let ball = world.add_sphere(4.0, Vec3::ZERO, Quat::IDENTITY, 1000.0)?;
//!
//! loop {
//!     world.update(1.0 / 60.0);
//!     let _pos = ball.as_dynamic()?.position(&world);
//! #   break;
//! }
//! # Ok::<(), rigid_bridge::Error>(())
//! ```

pub mod actor;
pub mod config;
pub mod convert;
pub mod debug_draw;
pub mod error;
pub mod scale;
pub mod shape;
pub mod time;
pub mod world;

pub use actor::{Actor, ActorHandle, ActorKind, Dynamic, DynamicHandle, KindMarker, Static, StaticHandle};
pub use config::WorldConfig;
pub use convert::{ToHost, ToSim};
pub use debug_draw::{DebugDrawer, DebugRenderBuffer, DebugRenderConfig, DebugVertex};
pub use error::{Error, Result};
pub use scale::{WorldScale, DEFAULT_WORLD_SCALE};
pub use shape::{ShapeGeometry, ShapeKind};
pub use time::FrameClock;
pub use world::World;

/// The handful of names almost every caller needs.
pub mod prelude {
    pub use crate::actor::{Actor, ActorKind, DynamicHandle, StaticHandle};
    pub use crate::config::WorldConfig;
    pub use crate::debug_draw::DebugDrawer;
    pub use crate::error::{Error, Result};
    pub use crate::world::World;
    pub use glam::{Quat, Vec3};
}
