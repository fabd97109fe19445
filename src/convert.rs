// src/convert.rs
//! Conversions between host math (`glam`) and engine math (`nalgebra`, as used by Rapier).
//!
//! Every conversion is a plain component copy. Axes are not remapped and no
//! world scale is applied; both spaces use the same units and handedness.
//! Scaling is the business of [`WorldScale`](crate::scale::WorldScale) and is
//! applied by the world where it matters (densities, tolerances), never here.

use glam::{Mat4, Quat, Vec3};
use nalgebra::{Isometry3, Matrix4, Point3, Quaternion, Translation3, UnitQuaternion, Vector3};

/// Host → engine.
pub trait ToSim {
    type Output;
    fn to_sim(&self) -> Self::Output;
}

/// Engine → host.
pub trait ToHost {
    type Output;
    fn to_host(&self) -> Self::Output;
}

// Vec3

#[inline]
pub fn vector_to_sim(v: Vec3) -> Vector3<f32> {
    Vector3::new(v.x, v.y, v.z)
}

#[inline]
pub fn vector_from_sim(v: &Vector3<f32>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

#[inline]
pub fn point_to_sim(v: Vec3) -> Point3<f32> {
    Point3::new(v.x, v.y, v.z)
}

#[inline]
pub fn point_from_sim(p: &Point3<f32>) -> Vec3 {
    Vec3::new(p.x, p.y, p.z)
}

// Quat

/// Copies (x, y, z, w) as-is. The quaternion is not renormalised, so an
/// already-unit host quaternion survives the trip bit for bit.
#[inline]
pub fn quat_to_sim(q: Quat) -> UnitQuaternion<f32> {
    UnitQuaternion::new_unchecked(Quaternion::new(q.w, q.x, q.y, q.z))
}

#[inline]
pub fn quat_from_sim(q: &UnitQuaternion<f32>) -> Quat {
    Quat::from_xyzw(q.i, q.j, q.k, q.w)
}

// Transform

/// Splits a host matrix into translation and rotation. Any scale or shear in
/// the matrix is dropped. A singular matrix has no rotation to recover and
/// yields the identity rotation.
pub fn transform_to_sim(m: &Mat4) -> Isometry3<f32> {
    let (_scale, rotation, translation) = m.to_scale_rotation_translation();
    let rotation = if m.determinant() == 0.0 || !rotation.is_finite() {
        Quat::IDENTITY
    } else {
        rotation
    };
    isometry_from_parts(translation, rotation)
}

pub fn transform_from_sim(iso: &Isometry3<f32>) -> Mat4 {
    Mat4::from_rotation_translation(quat_from_sim(&iso.rotation), vector_from_sim(&iso.translation.vector))
}

#[inline]
pub fn isometry_from_parts(position: Vec3, rotation: Quat) -> Isometry3<f32> {
    Isometry3::from_parts(Translation3::from(vector_to_sim(position)), quat_to_sim(rotation))
}

// Matrix

/// Direct copy of all sixteen floats in storage order, no transpose. Both
/// libraries store column-major, so the mathematical matrix is unchanged.
pub fn matrix_to_sim(m: &Mat4) -> Matrix4<f32> {
    Matrix4::from_column_slice(&m.to_cols_array())
}

pub fn matrix_from_sim(m: &Matrix4<f32>) -> Mat4 {
    Mat4::from_cols_slice(m.as_slice())
}

// Trait forms

impl ToSim for Vec3 {
    type Output = Vector3<f32>;
    fn to_sim(&self) -> Self::Output {
        vector_to_sim(*self)
    }
}

impl ToHost for Vector3<f32> {
    type Output = Vec3;
    fn to_host(&self) -> Self::Output {
        vector_from_sim(self)
    }
}

impl ToHost for Point3<f32> {
    type Output = Vec3;
    fn to_host(&self) -> Self::Output {
        point_from_sim(self)
    }
}

impl ToSim for Quat {
    type Output = UnitQuaternion<f32>;
    fn to_sim(&self) -> Self::Output {
        quat_to_sim(*self)
    }
}

impl ToHost for UnitQuaternion<f32> {
    type Output = Quat;
    fn to_host(&self) -> Self::Output {
        quat_from_sim(self)
    }
}

impl ToHost for Isometry3<f32> {
    type Output = Mat4;
    fn to_host(&self) -> Self::Output {
        transform_from_sim(self)
    }
}

impl ToSim for Mat4 {
    type Output = Matrix4<f32>;
    fn to_sim(&self) -> Self::Output {
        matrix_to_sim(self)
    }
}

impl ToHost for Matrix4<f32> {
    type Output = Mat4;
    fn to_host(&self) -> Self::Output {
        matrix_from_sim(self)
    }
}
