use std::path::{Path, PathBuf};

use character_collision::{CollisionProfile, SensorConfig};
use character_motor_locomotion::{ConfigError, LocomotionConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("missing required collaborator: {0}")]
    MissingCollaborator(&'static str),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Every tunable of one controller, loadable from a single TOML document.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub locomotion: LocomotionConfig,
    pub sensor: SensorConfig,
    pub collision: CollisionProfile,
}

impl ControllerConfig {
    pub fn parse_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, ControllerError> {
        let text = std::fs::read_to_string(path).map_err(|source| ControllerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse_toml(&text)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.locomotion.validate()?;
        let sensor = &self.sensor;
        for (field, value) in [
            ("sensor.ground_distance", sensor.ground_distance),
            ("sensor.max_step_height", sensor.max_step_height),
            ("sensor.stairs_ray_length", sensor.stairs_ray_length),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{} must be finite and >= 0", value),
                });
            }
        }
        if sensor
            .ground_check_offset
            .iter()
            .chain(&sensor.stairs_ray_offset)
            .chain(&sensor.stairs_check_offset)
            .any(|v| !v.is_finite())
        {
            return Err(ConfigError::Invalid {
                field: "sensor offsets",
                reason: "must be finite".to_string(),
            });
        }
        let collision = &self.collision;
        if !collision.capsule_radius.is_finite() || collision.capsule_radius <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "collision.capsule_radius",
                reason: "must be finite and > 0".to_string(),
            });
        }
        if !collision.capsule_height.is_finite() || collision.capsule_height < 0.0 {
            return Err(ConfigError::Invalid {
                field: "collision.capsule_height",
                reason: "must be finite and >= 0".to_string(),
            });
        }
        Ok(())
    }
}
