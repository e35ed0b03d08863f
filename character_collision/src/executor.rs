//! Sole writer of actor position and scale.

use rapier3d::math::{Isometry, Vector};
use rapier3d::prelude::Real;
use tracing::trace;

use crate::{CharacterBody, CollisionWorld};

/// One tick's worth of motion handed to the executor.
#[derive(Clone, Copy, Debug, Default)]
pub struct MotionRequest {
    pub displacement: Vector<Real>,
    /// New actor scale, applied before moving.
    pub scale: Option<Vector<Real>>,
    /// Vertical pivot teleport applied with the scale (not collision checked).
    pub pivot_shift: Real,
}

#[derive(Clone, Copy, Debug)]
pub struct MotionResult {
    pub position: Isometry<Real>,
    pub applied: Vector<Real>,
    /// Position delta over the tick divided by dt.
    pub velocity: Vector<Real>,
}

#[derive(Clone, Debug)]
pub struct MotionExecutor {
    body: CharacterBody,
    position: Isometry<Real>,
    scale: Vector<Real>,
    velocity: Vector<Real>,
}

impl MotionExecutor {
    pub fn new(body: CharacterBody, position: Isometry<Real>, scale: Vector<Real>) -> Self {
        let mut body = body;
        body.set_scale(scale);
        Self {
            body,
            position,
            scale,
            velocity: Vector::zeros(),
        }
    }

    pub fn body(&self) -> &CharacterBody {
        &self.body
    }

    pub fn position(&self) -> &Isometry<Real> {
        &self.position
    }

    pub fn scale(&self) -> Vector<Real> {
        self.scale
    }

    /// Achieved velocity of the last applied tick.
    pub fn velocity(&self) -> Vector<Real> {
        self.velocity
    }

    /// Teleports without collision and clears the achieved velocity.
    pub fn set_position(&mut self, position: Isometry<Real>) {
        self.position = position;
        self.velocity = Vector::zeros();
    }

    pub fn apply<W: CollisionWorld + ?Sized>(
        &mut self,
        world: &W,
        request: MotionRequest,
        dt: Real,
    ) -> MotionResult {
        let start = self.position.translation.vector;
        if let Some(scale) = request.scale {
            self.scale = scale;
            self.body.set_scale(scale);
        }
        if request.pivot_shift != 0.0 {
            self.position.translation.vector.y += request.pivot_shift;
        }

        let applied = if request.displacement.norm_squared() > 0.0 {
            world.move_and_collide(&self.body, &self.position, request.displacement, dt)
        } else {
            Vector::zeros()
        };
        self.position.translation.vector += applied;

        self.velocity = if dt > 0.0 {
            (self.position.translation.vector - start) / dt
        } else {
            Vector::zeros()
        };
        trace!(
            x = self.position.translation.x,
            y = self.position.translation.y,
            z = self.position.translation.z,
            "actor moved"
        );
        MotionResult {
            position: self.position,
            applied,
            velocity: self.velocity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FlatWorld;
    use crate::CollisionProfile;

    fn executor_at(y: Real) -> MotionExecutor {
        MotionExecutor::new(
            CharacterBody::new(CollisionProfile::locomotion_default()),
            Isometry::translation(0.0, y, 0.0),
            Vector::new(1.0, 1.0, 1.0),
        )
    }

    #[test]
    fn reports_achieved_velocity() {
        let world = FlatWorld::new();
        let mut executor = executor_at(1.0);
        let result = executor.apply(
            &world,
            MotionRequest {
                displacement: Vector::new(0.5, 0.0, 0.0),
                ..Default::default()
            },
            0.5,
        );
        assert!((result.velocity.x - 1.0).abs() < 1.0e-5);
        assert!((executor.position().translation.x - 0.5).abs() < 1.0e-5);
    }

    #[test]
    fn floor_blocks_descent() {
        let world = FlatWorld::new();
        let mut executor = executor_at(1.0);
        let result = executor.apply(
            &world,
            MotionRequest {
                displacement: Vector::new(0.0, -0.2, 0.0),
                ..Default::default()
            },
            0.1,
        );
        assert_eq!(result.applied.y, 0.0);
        assert_eq!(result.velocity.y, 0.0);
    }

    #[test]
    fn stance_change_resizes_and_shifts_pivot() {
        let world = FlatWorld::new();
        let mut executor = executor_at(1.0);
        executor.apply(
            &world,
            MotionRequest {
                scale: Some(Vector::new(1.0, 0.5, 1.0)),
                pivot_shift: -0.5,
                ..Default::default()
            },
            0.1,
        );
        assert!((executor.position().translation.y - 0.5).abs() < 1.0e-5);
        assert!((executor.scale().y - 0.5).abs() < 1.0e-5);
        assert!((executor.body().capsule().radius - 0.5).abs() < 1.0e-5);
    }

    #[test]
    fn zero_dt_reports_no_velocity() {
        let world = FlatWorld::new();
        let mut executor = executor_at(1.0);
        let result = executor.apply(
            &world,
            MotionRequest {
                displacement: Vector::new(1.0, 0.0, 0.0),
                ..Default::default()
            },
            0.0,
        );
        assert_eq!(result.velocity, Vector::zeros());
    }
}
