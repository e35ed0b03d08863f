//! Velocity and displacement arithmetic shared by the motor.

use rapier3d::math::Vector;
use rapier3d::prelude::Real;

/// Everything that contributes to one tick's displacement.
#[derive(Clone, Copy, Debug)]
pub struct MotionParts {
    /// Already scaled by dt.
    pub dash: Vector<Real>,
    pub horizontal_velocity: Vector<Real>,
    pub vertical_velocity: Real,
    /// Instant vertical snap, not scaled by dt.
    pub step_up: Real,
}

pub fn apply_gravity(vertical_velocity: Real, gravity: Real, dt: Real) -> Real {
    vertical_velocity - gravity.abs() * dt
}

/// Take-off speed that reaches `height` under `gravity` (v = sqrt(2gh)).
pub fn launch_speed(gravity: Real, height: Real) -> Real {
    (2.0 * gravity.abs() * height).max(0.0).sqrt()
}

/// Unit direction for a pair of raw axes, zero for no input.
pub fn move_direction(axis: [Real; 2]) -> Vector<Real> {
    let direction = Vector::new(axis[0], 0.0, axis[1]);
    if direction.norm_squared() > 0.0 {
        direction.normalize()
    } else {
        Vector::zeros()
    }
}

pub fn compose(parts: MotionParts, dt: Real) -> Vector<Real> {
    let velocity = Vector::new(
        parts.horizontal_velocity.x,
        parts.vertical_velocity,
        parts.horizontal_velocity.z,
    );
    parts.dash + velocity * dt + Vector::new(0.0, parts.step_up, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_speed_grows_with_height() {
        let base = launch_speed(20.0, 3.0);
        assert!((base - 120.0_f32.sqrt()).abs() < 1.0e-4);
        assert!(launch_speed(20.0, 4.0) > base);
        assert_eq!(launch_speed(0.0, 3.0), 0.0);
    }

    #[test]
    fn zero_axis_has_no_direction() {
        assert_eq!(move_direction([0.0, 0.0]), Vector::zeros());
        let diagonal = move_direction([1.0, 1.0]);
        assert!((diagonal.norm() - 1.0).abs() < 1.0e-6);
    }

    #[test]
    fn compose_scales_velocity_but_not_snap() {
        let parts = MotionParts {
            dash: Vector::new(0.0, 0.0, 1.0),
            horizontal_velocity: Vector::new(6.0, 0.0, 0.0),
            vertical_velocity: -2.0,
            step_up: 0.3,
        };
        let displacement = compose(parts, 0.5);
        assert!((displacement.x - 3.0).abs() < 1.0e-6);
        assert!((displacement.y - (-1.0 + 0.3)).abs() < 1.0e-6);
        assert!((displacement.z - 1.0).abs() < 1.0e-6);
    }
}
