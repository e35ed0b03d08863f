//! Collision-world contract, ground/step sensing and the motion executor.
//!
//! Policy: collision resolution goes through Rapier KCC; this crate only
//! decides what to ask for and records what was achieved.
#![forbid(unsafe_code)]

mod executor;
mod sensor;

pub use executor::{MotionExecutor, MotionRequest, MotionResult};
pub use sensor::{GroundStepSensor, SensorConfig, SensorReading};

use physics_rapier::PhysicsWorld;
use rapier3d::control::{CharacterAutostep, CharacterLength, KinematicCharacterController};
use rapier3d::math::{Isometry, Point, UnitVector, Vector};
use rapier3d::prelude::{Capsule, Group, QueryFilter, Real};
use serde::{Deserialize, Serialize};

/// Queries the controller needs from whatever owns the level geometry.
pub trait CollisionWorld {
    fn sphere_overlap(&self, center: Point<Real>, radius: Real, mask: Group) -> bool;

    fn raycast(
        &self,
        origin: Point<Real>,
        direction: Vector<Real>,
        max_distance: Real,
        mask: Group,
    ) -> Option<Point<Real>>;

    /// Moves `body` from `position` by `displacement`, sliding along geometry.
    /// Returns the displacement actually applied.
    fn move_and_collide(
        &self,
        body: &CharacterBody,
        position: &Isometry<Real>,
        displacement: Vector<Real>,
        dt: Real,
    ) -> Vector<Real>;
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionProfile {
    /// Capsule radius in meters.
    pub capsule_radius: Real,
    /// Capsule cylinder height in meters (distance between sphere centers).
    pub capsule_height: Real,
    /// KCC auto-step height in meters (0 leaves stepping to the step sensor).
    pub autostep_height: Real,
    /// Minimum width of free space required after auto-stepping.
    pub autostep_min_width: Real,
    /// Maximum climbable slope angle in radians.
    pub max_slope_angle: Real,
    /// Minimum slope angle where sliding begins (>= max_slope_angle).
    pub min_slope_slide_angle: Real,
    /// Distance to snap to ground in meters (0 disables).
    pub ground_snap_distance: Real,
    /// Small separation to preserve between character and environment.
    pub offset: Real,
}

impl Default for CollisionProfile {
    fn default() -> Self {
        Self::locomotion_default()
    }
}

impl CollisionProfile {
    /// Two meter tall capsule, stepping handled by the sensor.
    pub fn locomotion_default() -> Self {
        Self {
            capsule_radius: 0.5,
            capsule_height: 1.0,
            autostep_height: 0.0,
            autostep_min_width: 0.2,
            max_slope_angle: 45.0_f32.to_radians(),
            min_slope_slide_angle: 50.0_f32.to_radians(),
            ground_snap_distance: 0.0,
            offset: 0.02,
        }
    }

    /// Full standing height, cylinder plus both caps.
    pub fn standing_height(&self) -> Real {
        self.capsule_height + self.capsule_radius * 2.0
    }

    fn capsule(&self, scale: Vector<Real>) -> Capsule {
        let radius = self.capsule_radius * scale.x.abs().max(scale.z.abs());
        let total = self.standing_height() * scale.y.abs();
        let half_height = ((total - radius * 2.0) * 0.5).max(0.0);
        Capsule::new_y(half_height, radius)
    }

    fn apply_to(&self, controller: &mut KinematicCharacterController) {
        controller.autostep = if self.autostep_height > 0.0 {
            Some(CharacterAutostep {
                max_height: CharacterLength::Absolute(self.autostep_height),
                min_width: CharacterLength::Absolute(self.autostep_min_width),
                include_dynamic_bodies: false,
            })
        } else {
            None
        };
        controller.max_slope_climb_angle = self.max_slope_angle;
        controller.min_slope_slide_angle = self.min_slope_slide_angle.max(self.max_slope_angle);
        controller.snap_to_ground = if self.ground_snap_distance > 0.0 {
            Some(CharacterLength::Absolute(self.ground_snap_distance))
        } else {
            None
        };
        controller.offset = CharacterLength::Absolute(self.offset);
    }
}

/// Capsule plus KCC settings for one actor, resized with the actor scale.
#[derive(Clone, Debug)]
pub struct CharacterBody {
    profile: CollisionProfile,
    controller: KinematicCharacterController,
    capsule: Capsule,
}

impl CharacterBody {
    pub fn new(profile: CollisionProfile) -> Self {
        let mut controller = KinematicCharacterController::default();
        profile.apply_to(&mut controller);
        Self {
            profile,
            controller,
            capsule: profile.capsule(Vector::new(1.0, 1.0, 1.0)),
        }
    }

    pub fn profile(&self) -> CollisionProfile {
        self.profile
    }

    pub fn capsule(&self) -> &Capsule {
        &self.capsule
    }

    pub fn controller(&self) -> &KinematicCharacterController {
        &self.controller
    }

    pub fn set_scale(&mut self, scale: Vector<Real>) {
        self.capsule = self.profile.capsule(scale);
    }
}

impl CollisionWorld for PhysicsWorld {
    fn sphere_overlap(&self, center: Point<Real>, radius: Real, mask: Group) -> bool {
        PhysicsWorld::sphere_overlap(self, center, radius, mask)
    }

    fn raycast(
        &self,
        origin: Point<Real>,
        direction: Vector<Real>,
        max_distance: Real,
        mask: Group,
    ) -> Option<Point<Real>> {
        PhysicsWorld::raycast(self, origin, direction, max_distance, mask)
    }

    fn move_and_collide(
        &self,
        body: &CharacterBody,
        position: &Isometry<Real>,
        displacement: Vector<Real>,
        dt: Real,
    ) -> Vector<Real> {
        let mut controller = body.controller.clone();
        if self.gravity.norm_squared() > 1.0e-6 {
            controller.up = UnitVector::new_normalize(-self.gravity);
        }
        let output = controller.move_shape(
            dt,
            self.bodies(),
            self.colliders(),
            self.query_pipeline(),
            &body.capsule,
            position,
            displacement,
            QueryFilter::default(),
            |_| {},
        );
        output.translation
    }
}
