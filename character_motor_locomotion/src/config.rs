use rapier3d::math::Vector;
use rapier3d::prelude::Real;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// How a landing edge treats an existing bunny-hop chain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandingChainReset {
    /// Compare against the landing just recorded; the reset never fires.
    #[default]
    AsRecorded,
    /// Compare against the previous landing.
    PreviousLanding,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionConfig {
    pub move_speed: Real,
    /// Jump apex height in meters before chaining.
    pub jump_force: Real,
    /// Downward acceleration magnitude.
    pub gravity: Real,
    /// Vertical velocity held while grounded.
    pub ground_clamp_velocity: Real,
    pub dash_speed: Real,
    /// Dash length in seconds.
    pub dash_time: Real,
    pub dash_cooldown: Real,
    /// Seconds after landing during which a jump extends the chain.
    pub landing_grace_window: Real,
    pub landing_chain_reset: LandingChainReset,
    pub crouch_slide_speed: Real,
    pub crouch_down_force: Real,
    pub slide_duration: Real,
    /// Horizontal speed above which crouching starts a slide.
    pub slide_speed_threshold: Real,
    pub crouch_move_speed: Real,
    pub crouch_scale: [Real; 3],
    /// Unscaled actor height, used to keep the feet planted on stance changes.
    /// A player controller replaces it with its collision capsule height.
    pub standing_height: Real,
    pub flip_duration: Real,
    /// Flip pitch sweep in radians.
    pub flip_angle: Real,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            move_speed: 6.0,
            jump_force: 3.0,
            gravity: 20.0,
            ground_clamp_velocity: -2.0,
            dash_speed: 50.0,
            dash_time: 0.2,
            dash_cooldown: 1.0,
            landing_grace_window: 0.5,
            landing_chain_reset: LandingChainReset::AsRecorded,
            crouch_slide_speed: 20.0,
            crouch_down_force: -5.0,
            slide_duration: 3.0,
            slide_speed_threshold: 2.0,
            crouch_move_speed: 3.0,
            crouch_scale: [1.0, 0.5, 1.0],
            standing_height: 2.0,
            flip_duration: 0.5,
            flip_angle: 360.0_f32.to_radians(),
        }
    }
}

impl LocomotionConfig {
    pub fn parse_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    pub fn crouch_scale(&self) -> Vector<Real> {
        Vector::new(
            self.crouch_scale[0],
            self.crouch_scale[1],
            self.crouch_scale[2],
        )
    }

    /// Pivot drop that keeps the feet in place when shrinking from `standing_scale`.
    pub fn crouch_pivot_drop(&self, standing_scale: Vector<Real>) -> Real {
        0.5 * self.standing_height * (standing_scale.y - self.crouch_scale[1])
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = [
            ("move_speed", self.move_speed),
            ("jump_force", self.jump_force),
            ("gravity", self.gravity),
            ("dash_speed", self.dash_speed),
            ("dash_time", self.dash_time),
            ("dash_cooldown", self.dash_cooldown),
            ("landing_grace_window", self.landing_grace_window),
            ("crouch_slide_speed", self.crouch_slide_speed),
            ("slide_duration", self.slide_duration),
            ("slide_speed_threshold", self.slide_speed_threshold),
            ("crouch_move_speed", self.crouch_move_speed),
            ("standing_height", self.standing_height),
            ("flip_duration", self.flip_duration),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{} must be finite and >= 0", value),
                });
            }
        }
        if !self.ground_clamp_velocity.is_finite() || self.ground_clamp_velocity > 0.0 {
            return Err(ConfigError::Invalid {
                field: "ground_clamp_velocity",
                reason: "must be finite and <= 0".to_string(),
            });
        }
        if !self.crouch_down_force.is_finite() {
            return Err(ConfigError::Invalid {
                field: "crouch_down_force",
                reason: "must be finite".to_string(),
            });
        }
        if !self.flip_angle.is_finite() {
            return Err(ConfigError::Invalid {
                field: "flip_angle",
                reason: "must be finite".to_string(),
            });
        }
        if self.crouch_scale.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(ConfigError::Invalid {
                field: "crouch_scale",
                reason: "components must be finite and > 0".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = LocomotionConfig::parse_toml("move_speed = 8.0\n").unwrap();
        assert_eq!(config.move_speed, 8.0);
        assert_eq!(config.jump_force, 3.0);
        assert_eq!(config.landing_chain_reset, LandingChainReset::AsRecorded);
    }

    #[test]
    fn round_trips_through_toml() {
        let config = LocomotionConfig {
            dash_cooldown: 2.5,
            landing_chain_reset: LandingChainReset::PreviousLanding,
            ..Default::default()
        };
        let text = config.to_toml().unwrap();
        assert!(text.contains("previous_landing"));
        let parsed = LocomotionConfig::parse_toml(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn rejects_negative_gravity() {
        let err = LocomotionConfig::parse_toml("gravity = -20.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "gravity", .. }));
    }

    #[test]
    fn non_finite_values_name_their_field() {
        let config = LocomotionConfig {
            flip_angle: Real::NAN,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "flip_angle", .. }));

        let config = LocomotionConfig {
            crouch_down_force: Real::INFINITY,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "crouch_down_force",
                ..
            }
        ));
    }

    #[test]
    fn default_pivot_drop_is_half_a_meter() {
        let config = LocomotionConfig::default();
        let drop = config.crouch_pivot_drop(Vector::new(1.0, 1.0, 1.0));
        assert!((drop - 0.5).abs() < 1.0e-6);
    }
}
