// src/scale.rs
//! World-unit scaling.
//!
//! The engine is happiest when bodies are about one unit across. `WorldScale`
//! records how many world units make one metre and derives the factors needed
//! to move torques (length²) and densities (length³) between the two.
//!
//! There is no global instance: every `World` owns its own `WorldScale`, and
//! anything else that needs one takes it by value.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// World units per metre used when nothing else is configured.
pub const DEFAULT_WORLD_SCALE: f32 = 100.0;

/// A world scale together with its derived factors.
///
/// The derived fields are recomputed together on every change, so they always
/// agree with `world_scale`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct WorldScale {
    world_scale: f32,
    inv_world_scale: f32,
    torque_scale: f32,
    inv_torque_scale: f32,
    density_scale: f32,
    inv_density_scale: f32,
}

impl Default for WorldScale {
    fn default() -> Self {
        Self::derive(DEFAULT_WORLD_SCALE)
    }
}

impl WorldScale {
    /// Build a scale, rejecting anything that is not finite and positive.
    pub fn new(scale: f32) -> Result<Self> {
        validate(scale)?;
        Ok(Self::derive(scale))
    }

    /// Replace the world scale. On error the current state is kept.
    pub fn set_world_scale(&mut self, scale: f32) -> Result<()> {
        *self = Self::new(scale)?;
        log::debug!(
            "world scale set to {} (torque {}, density {})",
            self.world_scale,
            self.torque_scale,
            self.density_scale
        );
        Ok(())
    }

    fn derive(scale: f32) -> Self {
        let torque = scale.powi(2);
        let density = scale.powi(3);
        Self {
            world_scale: scale,
            inv_world_scale: 1.0 / scale,
            torque_scale: torque,
            inv_torque_scale: 1.0 / torque,
            density_scale: density,
            inv_density_scale: 1.0 / density,
        }
    }

    #[inline]
    pub fn world_scale(&self) -> f32 {
        self.world_scale
    }

    #[inline]
    pub fn inv_world_scale(&self) -> f32 {
        self.inv_world_scale
    }

    #[inline]
    pub fn torque_scale(&self) -> f32 {
        self.torque_scale
    }

    #[inline]
    pub fn inv_torque_scale(&self) -> f32 {
        self.inv_torque_scale
    }

    #[inline]
    pub fn density_scale(&self) -> f32 {
        self.density_scale
    }

    #[inline]
    pub fn inv_density_scale(&self) -> f32 {
        self.inv_density_scale
    }

    /// A length in metres expressed in world units.
    #[inline]
    pub fn length_to_sim(&self, metres: f32) -> f32 {
        metres * self.world_scale
    }

    /// A torque in metre units (N·m) expressed in world units.
    #[inline]
    pub fn torque_to_sim(&self, torque: f32) -> f32 {
        torque * self.torque_scale
    }

    /// A density per cubic metre expressed per cubic world unit, so a body keeps
    /// the same mass whatever the scale.
    #[inline]
    pub fn density_to_sim(&self, density: f32) -> f32 {
        density * self.inv_density_scale
    }
}

fn validate(scale: f32) -> Result<()> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(Error::invalid_argument(
            "world_scale",
            format!("must be finite and > 0, got {scale}"),
        ));
    }
    Ok(())
}

impl TryFrom<f32> for WorldScale {
    type Error = Error;

    fn try_from(scale: f32) -> Result<Self> {
        Self::new(scale)
    }
}

impl From<WorldScale> for f32 {
    fn from(scale: WorldScale) -> f32 {
        scale.world_scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() <= b.abs() * 1e-6
    }

    #[test]
    fn default_is_one_hundred() {
        let s = WorldScale::default();
        assert_eq!(s.world_scale(), 100.0);
        assert_eq!(s.torque_scale(), 10_000.0);
        assert_eq!(s.density_scale(), 1_000_000.0);
        assert!(close(s.inv_world_scale(), 0.01));
        assert!(close(s.inv_torque_scale(), 1e-4));
        assert!(close(s.inv_density_scale(), 1e-6));
    }

    #[test]
    fn set_world_scale_recomputes_everything() {
        let mut s = WorldScale::default();
        s.set_world_scale(10.0).unwrap();
        assert_eq!(s.world_scale(), 10.0);
        assert_eq!(s.torque_scale(), 100.0);
        assert_eq!(s.density_scale(), 1000.0);
        assert!(close(s.inv_density_scale(), 1e-3));
    }

    #[test]
    fn scale_law_holds_for_many_values() {
        for &v in &[0.001f32, 0.5, 1.0, 3.0, 42.0, 100.0, 2500.0] {
            let s = WorldScale::new(v).unwrap();
            assert!(close(s.torque_scale(), v * v));
            assert!(close(s.density_scale(), v * v * v));
            assert!(close(s.inv_world_scale() * s.world_scale(), 1.0));
            assert!(close(s.inv_torque_scale() * s.torque_scale(), 1.0));
            assert!(close(s.inv_density_scale() * s.density_scale(), 1.0));
        }
    }

    #[test]
    fn result_does_not_depend_on_history() {
        let mut a = WorldScale::default();
        a.set_world_scale(7.0).unwrap();
        a.set_world_scale(3.0).unwrap();
        assert_eq!(a, WorldScale::new(3.0).unwrap());
    }

    #[test]
    fn rejects_bad_scales_and_keeps_state() {
        let mut s = WorldScale::new(5.0).unwrap();
        for bad in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let err = s.set_world_scale(bad).unwrap_err();
            assert!(err.is_invalid_argument());
        }
        assert_eq!(s.world_scale(), 5.0);
        assert_eq!(s.torque_scale(), 25.0);
    }

    #[test]
    fn density_round_trip_keeps_mass() {
        // A 1 m cube at 1000 kg/m³ is 100³ world units³ at scale 100.
        let s = WorldScale::default();
        let volume = s.length_to_sim(1.0).powi(3);
        let mass = s.density_to_sim(1000.0) * volume;
        assert!(close(mass, 1000.0));
        assert!(close(s.torque_to_sim(2.0), 20_000.0));
    }

    #[test]
    fn serde_uses_the_bare_number() {
        let s: WorldScale = serde_json::from_str("10.0").unwrap();
        assert_eq!(s.density_scale(), 1000.0);
        assert_eq!(serde_json::to_string(&s).unwrap(), "10.0");
        assert!(serde_json::from_str::<WorldScale>("-2.0").is_err());
    }
}
