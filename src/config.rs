// src/config.rs
//! World configuration.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::debug_draw::DebugRenderConfig;
use crate::scale::WorldScale;
use crate::{Error, Result};

/// Standard gravity in metres per second squared.
pub const STANDARD_GRAVITY: f32 = 9.8;

/// Step used when the measured frame time is not positive.
pub const FALLBACK_DT: f32 = 1.0 / 60.0;

/// Everything `World::setup` needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Gravity in world units. `None` means standard gravity scaled by `world_scale`.
    pub gravity: Option<[f32; 3]>,
    /// World units per metre.
    pub world_scale: WorldScale,
    /// Default material friction.
    pub friction: f32,
    /// Default material restitution (bounciness), 0..=1.
    pub restitution: f32,
    /// Damping given to every new dynamic body.
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub debug: DebugRenderConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: None,
            world_scale: WorldScale::default(),
            friction: 0.5,
            restitution: 0.5,
            linear_damping: 0.25,
            angular_damping: 0.25,
            debug: DebugRenderConfig::default(),
        }
    }
}

impl WorldConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: WorldConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Effective gravity: the explicit value, or (0, -9.8 × world scale, 0).
    pub fn gravity(&self) -> Vec3 {
        match self.gravity {
            Some(g) => Vec3::from_array(g),
            None => Vec3::new(0.0, -self.world_scale.length_to_sim(STANDARD_GRAVITY), 0.0),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(g) = self.gravity {
            if g.iter().any(|c| !c.is_finite()) {
                return Err(Error::Config(format!("gravity must be finite, got {g:?}")));
            }
        }
        non_negative("friction", self.friction)?;
        non_negative("linear_damping", self.linear_damping)?;
        non_negative("angular_damping", self.angular_damping)?;
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(Error::Config(format!(
                "restitution must be within 0..=1, got {}",
                self.restitution
            )));
        }
        self.debug.validate()
    }
}

fn non_negative(name: &str, value: f32) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::Config(format!("{name} must be finite and >= 0, got {value}")));
    }
    Ok(())
}
