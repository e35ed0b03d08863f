//! Ground overlap and step-ahead probes.

use rapier3d::math::{Isometry, Point, Vector};
use rapier3d::prelude::{Group, Real};
use serde::{Deserialize, Serialize};

use crate::CollisionWorld;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Radius of the ground overlap sphere.
    pub ground_distance: Real,
    /// Actor-local center of the ground sphere.
    pub ground_check_offset: [Real; 3],
    /// Collision layer bits counted as ground.
    pub ground_layers: u32,
    /// Tallest ledge the step snap will climb.
    pub max_step_height: Real,
    /// Length of the forward step ray.
    pub stairs_ray_length: Real,
    /// Actor-local origin of the forward step ray.
    pub stairs_ray_offset: [Real; 3],
    /// Actor-local reference point step heights are measured from.
    pub stairs_check_offset: [Real; 3],
    /// Collision layer bits counted as stairs.
    pub stairs_layers: u32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            ground_distance: 0.4,
            ground_check_offset: [0.0, -1.0, 0.0],
            ground_layers: physics_rapier::layers::GROUND.bits(),
            max_step_height: 1.0,
            stairs_ray_length: 0.1,
            stairs_ray_offset: [0.0, -0.6, 0.5],
            stairs_check_offset: [0.0, -1.0, 0.5],
            stairs_layers: physics_rapier::layers::STAIRS.bits(),
        }
    }
}

impl SensorConfig {
    pub fn ground_mask(&self) -> Group {
        Group::from_bits_truncate(self.ground_layers)
    }

    pub fn stairs_mask(&self) -> Group {
        Group::from_bits_truncate(self.stairs_layers)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SensorReading {
    pub grounded: bool,
    pub stairs_ahead: bool,
    /// Height of the last step hit; 0 when nothing was hit.
    pub step_height: Real,
}

impl SensorReading {
    /// Vertical snap owed this tick.
    pub fn step_up(&self) -> Real {
        if self.stairs_ahead {
            self.step_height
        } else {
            0.0
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct GroundStepSensor {
    config: SensorConfig,
}

impl GroundStepSensor {
    pub fn new(config: SensorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    pub fn sense<W: CollisionWorld + ?Sized>(
        &self,
        world: &W,
        position: &Isometry<Real>,
        yaw: Real,
        scale: Vector<Real>,
    ) -> SensorReading {
        let grounded = world.sphere_overlap(
            self.local_point(position, yaw, scale, self.config.ground_check_offset),
            self.config.ground_distance,
            self.config.ground_mask(),
        );
        let mut reading = SensorReading {
            grounded,
            ..Default::default()
        };

        let origin = self.local_point(position, yaw, scale, self.config.stairs_ray_offset);
        let forward = Vector::new(yaw.sin(), 0.0, yaw.cos());
        if let Some(hit) = world.raycast(
            origin,
            forward,
            self.config.stairs_ray_length,
            self.config.stairs_mask(),
        ) {
            let check = self.local_point(position, yaw, scale, self.config.stairs_check_offset);
            reading.step_height = hit.y - check.y;
            reading.stairs_ahead = reading.step_height <= self.config.max_step_height;
        }
        reading
    }

    fn local_point(
        &self,
        position: &Isometry<Real>,
        yaw: Real,
        scale: Vector<Real>,
        offset: [Real; 3],
    ) -> Point<Real> {
        let forward = Vector::new(yaw.sin(), 0.0, yaw.cos());
        let right = Vector::new(yaw.cos(), 0.0, -yaw.sin());
        let local = Vector::new(offset[0] * scale.x, offset[1] * scale.y, offset[2] * scale.z);
        let world_offset = right * local.x + Vector::y() * local.y + forward * local.z;
        Point::from(position.translation.vector + world_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FlatWorld;
    use physics_rapier::{layers, PhysicsWorld};
    use rapier3d::prelude::*;

    fn unit_scale() -> Vector<Real> {
        Vector::new(1.0, 1.0, 1.0)
    }

    #[test]
    fn grounded_only_when_feet_touch() {
        let world = FlatWorld::new();
        let sensor = GroundStepSensor::default();

        let standing = sensor.sense(&world, &Isometry::translation(0.0, 1.0, 0.0), 0.0, unit_scale());
        assert!(standing.grounded);

        let airborne = sensor.sense(&world, &Isometry::translation(0.0, 2.0, 0.0), 0.0, unit_scale());
        assert!(!airborne.grounded);
        assert!(!airborne.stairs_ahead);
    }

    #[test]
    fn climbable_step_is_reported() {
        let mut world = FlatWorld::new();
        world.stairs_face_z = Some(0.55);
        world.stairs_hit_y = Some(0.3);
        let sensor = GroundStepSensor::default();

        let reading = sensor.sense(&world, &Isometry::translation(0.0, 1.0, 0.0), 0.0, unit_scale());
        assert!(reading.stairs_ahead);
        assert!((reading.step_height - 0.3).abs() < 1.0e-5);
        assert!((reading.step_up() - 0.3).abs() < 1.0e-5);
    }

    #[test]
    fn tall_step_is_ignored() {
        let mut world = FlatWorld::new();
        world.stairs_face_z = Some(0.55);
        world.stairs_hit_y = Some(1.5);
        let sensor = GroundStepSensor::default();

        let reading = sensor.sense(&world, &Isometry::translation(0.0, 1.0, 0.0), 0.0, unit_scale());
        assert!(!reading.stairs_ahead);
        assert!((reading.step_height - 1.5).abs() < 1.0e-5);
        assert_eq!(reading.step_up(), 0.0);
    }

    #[test]
    fn step_ray_follows_facing() {
        let mut world = FlatWorld::new();
        world.stairs_face_z = Some(0.55);
        let sensor = GroundStepSensor::default();

        let facing_away = sensor.sense(
            &world,
            &Isometry::translation(0.0, 1.0, 0.0),
            std::f32::consts::PI,
            unit_scale(),
        );
        assert!(!facing_away.stairs_ahead);
    }

    #[test]
    fn rapier_stairs_are_sensed() {
        let mut world = PhysicsWorld::new(vector![0.0, -20.0, 0.0]);
        let floor = ColliderBuilder::cuboid(5.0, 0.1, 5.0)
            .translation(vector![0.0, -0.1, 0.0])
            .build();
        world.insert_layered_collider(floor, layers::GROUND);
        let stair = ColliderBuilder::cuboid(1.0, 0.25, 0.5)
            .translation(vector![0.0, 0.25, 1.05])
            .build();
        world.insert_layered_collider(stair, layers::STAIRS);
        world.step(1.0 / 60.0);

        let sensor = GroundStepSensor::default();
        let reading = sensor.sense(&world, &Isometry::translation(0.0, 1.0, 0.0), 0.0, unit_scale());

        assert!(reading.grounded);
        assert!(reading.stairs_ahead);
        assert!((reading.step_height - 0.4).abs() < 1.0e-3);
    }
}
