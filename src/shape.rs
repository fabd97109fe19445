// src/shape.rs
//! Shape geometry as a semantic "size".
//!
//! An actor's size is read and written through [`ShapeGeometry`], a small
//! closed set of the shapes the bridge understands:
//!
//! | shape   | size                       |
//! |---------|----------------------------|
//! | sphere  | `(radius, 0, 0)`           |
//! | capsule | `(radius, half_height, 0)` |
//! | box     | `half_extents`             |
//!
//! Anything else degrades to a zero size plus a warning. Writing a size never
//! changes which kind of shape it is, and the fields a shape uses must be
//! finite and positive.

use glam::Vec3;
use rapier3d::geometry::Collider;
use rapier3d::math::Vector;
use rapier3d::parry::shape::{Shape, ShapeType, SharedShape};

use crate::convert::{vector_from_sim, ToSim};
use crate::{Error, Result};

/// Discriminant of a [`ShapeGeometry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Sphere,
    Capsule,
    Box,
    Plane,
    Unsupported,
}

/// Geometry of a single collision shape. Capsules are Y-aligned and centred;
/// any other capsule reads as [`ShapeGeometry::Unsupported`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeGeometry {
    Sphere { radius: f32 },
    Capsule { radius: f32, half_height: f32 },
    Box { half_extents: Vec3 },
    /// Infinite plane; the engine's half-space with local +X normal.
    Plane,
    /// Any engine shape outside the set above.
    Unsupported,
}

impl ShapeGeometry {
    #[inline]
    pub fn kind(&self) -> ShapeKind {
        match self {
            ShapeGeometry::Sphere { .. } => ShapeKind::Sphere,
            ShapeGeometry::Capsule { .. } => ShapeKind::Capsule,
            ShapeGeometry::Box { .. } => ShapeKind::Box,
            ShapeGeometry::Plane => ShapeKind::Plane,
            ShapeGeometry::Unsupported => ShapeKind::Unsupported,
        }
    }

    /// Whether [`size`](Self::size) and [`set_size`](Self::set_size) mean anything for this shape.
    #[inline]
    pub fn has_size(&self) -> bool {
        matches!(
            self,
            ShapeGeometry::Sphere { .. } | ShapeGeometry::Capsule { .. } | ShapeGeometry::Box { .. }
        )
    }

    pub fn size(&self) -> Vec3 {
        match *self {
            ShapeGeometry::Sphere { radius } => Vec3::new(radius, 0.0, 0.0),
            ShapeGeometry::Capsule { radius, half_height } => Vec3::new(radius, half_height, 0.0),
            ShapeGeometry::Box { half_extents } => half_extents,
            ShapeGeometry::Plane | ShapeGeometry::Unsupported => {
                log::warn!("size: unimplemented shape type {:?}", self.kind());
                Vec3::ZERO
            }
        }
    }

    /// Rebuild the parameters from `size`, keeping the variant.
    pub fn set_size(&mut self, size: Vec3) {
        match self {
            ShapeGeometry::Sphere { radius } => *radius = size.x,
            ShapeGeometry::Capsule { radius, half_height } => {
                *radius = size.x;
                *half_height = size.y;
            }
            ShapeGeometry::Box { half_extents } => *half_extents = size,
            ShapeGeometry::Plane | ShapeGeometry::Unsupported => {
                log::warn!("set_size: unimplemented shape type {:?}", self.kind());
            }
        }
    }

    /// Check `size` against the fields this shape uses. Unsized shapes accept anything.
    pub fn check_size(&self, size: Vec3) -> Result<()> {
        match self {
            ShapeGeometry::Sphere { .. } => positive("radius", size.x),
            ShapeGeometry::Capsule { .. } => {
                positive("radius", size.x)?;
                positive("half_height", size.y)
            }
            ShapeGeometry::Box { .. } => {
                positive("half_extents.x", size.x)?;
                positive("half_extents.y", size.y)?;
                positive("half_extents.z", size.z)
            }
            ShapeGeometry::Plane | ShapeGeometry::Unsupported => Ok(()),
        }
    }

    /// Read the geometry of an engine shape.
    pub fn from_shape(shape: &dyn Shape) -> Self {
        match shape.shape_type() {
            ShapeType::Ball => shape
                .as_ball()
                .map_or(ShapeGeometry::Unsupported, |b| ShapeGeometry::Sphere { radius: b.radius }),
            ShapeType::Capsule => match shape.as_capsule() {
                Some(c) if is_upright(c.segment.a.coords, c.segment.b.coords) => {
                    ShapeGeometry::Capsule { radius: c.radius, half_height: c.half_height() }
                }
                _ => ShapeGeometry::Unsupported,
            },
            ShapeType::Cuboid => shape.as_cuboid().map_or(ShapeGeometry::Unsupported, |c| {
                ShapeGeometry::Box { half_extents: vector_from_sim(&c.half_extents) }
            }),
            ShapeType::HalfSpace => ShapeGeometry::Plane,
            _ => ShapeGeometry::Unsupported,
        }
    }

    /// Build the engine shape. `None` for [`ShapeGeometry::Unsupported`].
    pub fn to_shared_shape(&self) -> Option<SharedShape> {
        match *self {
            ShapeGeometry::Sphere { radius } => Some(SharedShape::ball(radius)),
            ShapeGeometry::Capsule { radius, half_height } => {
                Some(SharedShape::capsule_y(half_height, radius))
            }
            ShapeGeometry::Box { half_extents } => {
                let h = half_extents.to_sim();
                Some(SharedShape::cuboid(h.x, h.y, h.z))
            }
            ShapeGeometry::Plane => Some(SharedShape::halfspace(Vector::x_axis())),
            ShapeGeometry::Unsupported => None,
        }
    }
}

/// Segment on the local Y axis, centred on the origin (what `capsule_y` builds).
fn is_upright(a: Vector<f32>, b: Vector<f32>) -> bool {
    let eps = 1e-6 * a.norm().max(b.norm()).max(1.0);
    a.x.abs() <= eps && a.z.abs() <= eps && b.x.abs() <= eps && b.z.abs() <= eps && (a.y + b.y).abs() <= eps
}

pub(crate) fn positive(name: &'static str, value: f32) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::invalid_argument(name, format!("must be finite and > 0, got {value}")));
    }
    Ok(())
}

/// Size of a live collider.
pub fn read_size(collider: &Collider) -> Vec3 {
    ShapeGeometry::from_shape(collider.shape()).size()
}

/// Resize a live collider in place. Unsized shapes are left untouched; a
/// rejected size leaves the collider as it was.
pub fn write_size(collider: &mut Collider, size: Vec3) -> Result<()> {
    let mut geometry = ShapeGeometry::from_shape(collider.shape());
    if !geometry.has_size() {
        log::warn!("set_size: unimplemented shape type {:?}", geometry.kind());
        return Ok(());
    }
    geometry.check_size(size)?;
    geometry.set_size(size);
    if let Some(shape) = geometry.to_shared_shape() {
        collider.set_shape(shape);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapier3d::geometry::ColliderBuilder;

    #[test]
    fn sizes_per_kind() {
        assert_eq!(ShapeGeometry::Sphere { radius: 2.0 }.size(), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(
            ShapeGeometry::Capsule { radius: 1.0, half_height: 3.0 }.size(),
            Vec3::new(1.0, 3.0, 0.0)
        );
        assert_eq!(
            ShapeGeometry::Box { half_extents: Vec3::new(1.0, 2.0, 3.0) }.size(),
            Vec3::new(1.0, 2.0, 3.0)
        );
    }

    #[test]
    fn unsupported_shapes_degrade_to_zero() {
        assert_eq!(ShapeGeometry::Plane.size(), Vec3::ZERO);
        assert_eq!(ShapeGeometry::Unsupported.size(), Vec3::ZERO);

        let mut plane = ShapeGeometry::Plane;
        plane.set_size(Vec3::ONE);
        assert_eq!(plane, ShapeGeometry::Plane);
    }

    #[test]
    fn set_size_of_own_size_is_identity() {
        for shape in [
            ShapeGeometry::Sphere { radius: 4.0 },
            ShapeGeometry::Capsule { radius: 0.5, half_height: 2.0 },
            ShapeGeometry::Box { half_extents: Vec3::new(10.0, 1.0, 0.25) },
        ] {
            let mut copy = shape;
            copy.set_size(shape.size());
            assert_eq!(copy, shape);
            assert_eq!(copy.size(), shape.size());
        }
    }

    #[test]
    fn set_size_never_changes_kind() {
        let mut shape = ShapeGeometry::Box { half_extents: Vec3::splat(10.0) };
        assert_eq!(shape.size(), Vec3::splat(10.0));
        shape.set_size(Vec3::splat(5.0));
        assert_eq!(shape.size(), Vec3::splat(5.0));
        assert_eq!(shape.kind(), ShapeKind::Box);

        let mut sphere = ShapeGeometry::Sphere { radius: 1.0 };
        sphere.set_size(Vec3::new(3.0, 7.0, 9.0));
        assert_eq!(sphere, ShapeGeometry::Sphere { radius: 3.0 });
    }

    #[test]
    fn reads_engine_shapes() {
        assert_eq!(
            ShapeGeometry::from_shape(&*SharedShape::ball(2.5)),
            ShapeGeometry::Sphere { radius: 2.5 }
        );
        assert_eq!(
            ShapeGeometry::from_shape(&*SharedShape::cuboid(1.0, 2.0, 3.0)),
            ShapeGeometry::Box { half_extents: Vec3::new(1.0, 2.0, 3.0) }
        );
        let capsule = ShapeGeometry::from_shape(&*SharedShape::capsule_y(2.0, 0.5));
        assert_eq!(capsule.kind(), ShapeKind::Capsule);
        assert!(capsule.size().abs_diff_eq(Vec3::new(0.5, 2.0, 0.0), 1e-6));
        assert_eq!(
            ShapeGeometry::from_shape(&*SharedShape::halfspace(Vector::x_axis())),
            ShapeGeometry::Plane
        );
        assert_eq!(
            ShapeGeometry::from_shape(&*SharedShape::cylinder(1.0, 1.0)),
            ShapeGeometry::Unsupported
        );
    }

    #[test]
    fn engine_shape_round_trip() {
        for shape in [
            ShapeGeometry::Sphere { radius: 4.0 },
            ShapeGeometry::Box { half_extents: Vec3::new(1.0, 2.0, 3.0) },
            ShapeGeometry::Plane,
        ] {
            let built = shape.to_shared_shape().unwrap();
            assert_eq!(ShapeGeometry::from_shape(&*built), shape);
        }
        assert!(ShapeGeometry::Unsupported.to_shared_shape().is_none());
    }

    #[test]
    fn live_collider_resize() {
        let mut collider = ColliderBuilder::cuboid(10.0, 10.0, 10.0).build();
        assert_eq!(read_size(&collider), Vec3::splat(10.0));

        write_size(&mut collider, Vec3::splat(5.0)).unwrap();
        assert_eq!(read_size(&collider), Vec3::splat(5.0));
        assert_eq!(collider.shape().shape_type(), ShapeType::Cuboid);
    }

    #[test]
    fn live_plane_is_left_alone() {
        let mut collider = ColliderBuilder::halfspace(Vector::x_axis()).build();
        write_size(&mut collider, Vec3::ONE).unwrap();
        assert_eq!(collider.shape().shape_type(), ShapeType::HalfSpace);
        assert_eq!(read_size(&collider), Vec3::ZERO);
    }

    #[test]
    fn rejects_bad_sizes_and_keeps_the_collider() {
        let mut ball = ColliderBuilder::ball(10.0).build();
        let err = write_size(&mut ball, Vec3::new(-5.0, 0.0, 0.0)).unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(read_size(&ball), Vec3::new(10.0, 0.0, 0.0));

        let mut cube = ColliderBuilder::cuboid(1.0, 1.0, 1.0).build();
        assert!(write_size(&mut cube, Vec3::new(f32::NAN, 1.0, 1.0)).is_err());
        assert!(write_size(&mut cube, Vec3::new(1.0, 0.0, 1.0)).is_err());
        assert_eq!(read_size(&cube), Vec3::ONE);

        let mut pill = ColliderBuilder::capsule_y(2.0, 0.5).build();
        assert!(write_size(&mut pill, Vec3::new(0.5, -1.0, 0.0)).is_err());
        assert!(read_size(&pill).abs_diff_eq(Vec3::new(0.5, 2.0, 0.0), 1e-6));

        // Only the fields a shape uses are checked.
        assert!(ShapeGeometry::Sphere { radius: 1.0 }.check_size(Vec3::new(2.0, -1.0, f32::NAN)).is_ok());
        assert!(ShapeGeometry::Plane.check_size(Vec3::NAN).is_ok());
    }

    #[test]
    fn only_upright_capsules_have_a_size() {
        assert_eq!(
            ShapeGeometry::from_shape(&*SharedShape::capsule_x(2.0, 0.5)),
            ShapeGeometry::Unsupported
        );
        assert_eq!(
            ShapeGeometry::from_shape(&*SharedShape::capsule_z(2.0, 0.5)),
            ShapeGeometry::Unsupported
        );

        let mut tilted = ColliderBuilder::capsule_z(2.0, 0.5).build();
        write_size(&mut tilted, Vec3::new(1.0, 1.0, 0.0)).unwrap();
        let c = tilted.shape().as_capsule().unwrap();
        assert_eq!(c.radius, 0.5);
        assert!((c.segment.b.z - 2.0).abs() < 1e-6);
    }
}
