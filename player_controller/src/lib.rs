//! Player controller composition (input snapshot + sensor + motor + executor + telemetry).
#![forbid(unsafe_code)]

mod config;
mod telemetry;

pub use config::{ControllerConfig, ControllerError};
pub use telemetry::{TelemetrySample, TelemetrySink, TracingTelemetry};

use character_collision::{
    CharacterBody, CollisionWorld, GroundStepSensor, MotionExecutor, MotionRequest, SensorReading,
};
use character_motor_locomotion::{
    ActorState, DashKeys, FlipProgress, FlipTask, GroundSense, LocomotionInput, LocomotionMotor,
    MotorContext,
};
use rapier3d::math::{Isometry, Vector};
use rapier3d::prelude::Real;
use tracing::{debug, info};

/// Everything the host samples for one tick.
#[derive(Clone, Copy, Debug, Default)]
pub struct InputSnapshot {
    pub move_x: Real,
    pub move_y: Real,
    pub jump: bool,
    pub dash: bool,
    pub crouch_pressed: bool,
    pub crouch_released: bool,
    pub hold_forward: bool,
    pub hold_back: bool,
    pub hold_left: bool,
    pub hold_right: bool,
    pub flip: bool,
    pub dt: Real,
    pub now: f64,
}

impl InputSnapshot {
    fn locomotion(&self) -> LocomotionInput {
        LocomotionInput {
            move_axis: [self.move_x.clamp(-1.0, 1.0), self.move_y.clamp(-1.0, 1.0)],
            jump: self.jump,
            dash: self.dash,
            crouch_pressed: self.crouch_pressed,
            crouch_released: self.crouch_released,
            dash_keys: DashKeys {
                forward: self.hold_forward,
                back: self.hold_back,
                left: self.hold_left,
                right: self.hold_right,
            },
        }
    }
}

#[derive(Clone, Debug)]
pub struct PlayerFrame {
    pub position: Isometry<Real>,
    pub scale: Vector<Real>,
    /// Flip pitch in radians, 0 when upright.
    pub pitch: Real,
    /// Achieved velocity, not the requested one.
    pub velocity: Vector<Real>,
    pub state: ActorState,
    pub sensor: SensorReading,
    pub telemetry: TelemetrySample,
}

pub struct PlayerController<T: TelemetrySink> {
    motor: LocomotionMotor,
    sensor: GroundStepSensor,
    executor: MotionExecutor,
    telemetry: T,
    yaw: Real,
    pitch: Real,
    flip: Option<FlipTask>,
}

impl<T: TelemetrySink> PlayerController<T> {
    pub fn builder() -> PlayerControllerBuilder<T> {
        PlayerControllerBuilder::new()
    }

    pub fn state(&self) -> &ActorState {
        self.motor.state()
    }

    pub fn motor(&self) -> &LocomotionMotor {
        &self.motor
    }

    pub fn motor_mut(&mut self) -> &mut LocomotionMotor {
        &mut self.motor
    }

    pub fn executor(&self) -> &MotionExecutor {
        &self.executor
    }

    pub fn sensor(&self) -> &GroundStepSensor {
        &self.sensor
    }

    pub fn telemetry(&self) -> &T {
        &self.telemetry
    }

    pub fn yaw(&self) -> Real {
        self.yaw
    }

    pub fn set_yaw(&mut self, yaw: Real) {
        self.yaw = yaw;
    }

    pub fn pitch(&self) -> Real {
        self.pitch
    }

    pub fn is_flipping(&self) -> bool {
        self.flip.is_some()
    }

    pub fn tick<W: CollisionWorld + ?Sized>(
        &mut self,
        world: &W,
        input: &InputSnapshot,
    ) -> PlayerFrame {
        let dt = input.dt.max(0.0);
        let reading = self.sensor.sense(
            world,
            self.executor.position(),
            self.yaw,
            self.executor.scale(),
        );
        let output = self.motor.step(
            &input.locomotion(),
            GroundSense {
                grounded: reading.grounded,
                stairs_ahead: reading.stairs_ahead,
                step_height: reading.step_height,
            },
            MotorContext {
                dt,
                now: input.now,
                yaw: self.yaw,
            },
        );
        let motion = self.executor.apply(
            world,
            MotionRequest {
                displacement: output.displacement,
                scale: output.stance_change.map(|change| change.scale),
                pivot_shift: output
                    .stance_change
                    .map_or(0.0, |change| change.pivot_shift),
            },
            dt,
        );
        self.update_flip(input.flip, reading.grounded, dt);

        let sample = TelemetrySample {
            bunny_hop_chain: self.motor.state().bunny_hop_chain,
            speed: motion.velocity.norm(),
        };
        self.telemetry.record(sample);

        PlayerFrame {
            position: motion.position,
            scale: self.executor.scale(),
            pitch: self.pitch,
            velocity: motion.velocity,
            state: self.motor.state().clone(),
            sensor: reading,
            telemetry: sample,
        }
    }

    fn update_flip(&mut self, requested: bool, grounded: bool, dt: Real) {
        if grounded {
            if let Some(task) = self.flip.take() {
                self.pitch = task.cancel();
                debug!("flip cancelled on ground contact");
            }
            return;
        }
        if requested {
            let config = self.motor.config();
            if self.flip.is_some() {
                debug!("flip restarted");
            }
            self.flip = Some(FlipTask::new(
                self.pitch,
                config.flip_angle,
                config.flip_duration,
            ));
        }
        if let Some(task) = self.flip.as_mut() {
            match task.advance(dt) {
                FlipProgress::Running(pitch) => self.pitch = pitch,
                FlipProgress::Finished(pitch) => {
                    self.pitch = pitch.rem_euclid(std::f32::consts::TAU);
                    self.flip = None;
                }
            }
        }
    }
}

/// Collects collaborators; `build` refuses to produce a half-wired controller.
pub struct PlayerControllerBuilder<T: TelemetrySink> {
    config: ControllerConfig,
    spawn: Option<Isometry<Real>>,
    scale: Vector<Real>,
    yaw: Real,
    telemetry: Option<T>,
}

impl<T: TelemetrySink> Default for PlayerControllerBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TelemetrySink> PlayerControllerBuilder<T> {
    pub fn new() -> Self {
        Self {
            config: ControllerConfig::default(),
            spawn: None,
            scale: Vector::new(1.0, 1.0, 1.0),
            yaw: 0.0,
            telemetry: None,
        }
    }

    pub fn config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn spawn_at(mut self, position: Isometry<Real>) -> Self {
        self.spawn = Some(position);
        self
    }

    pub fn scale(mut self, scale: Vector<Real>) -> Self {
        self.scale = scale;
        self
    }

    pub fn yaw(mut self, yaw: Real) -> Self {
        self.yaw = yaw;
        self
    }

    pub fn telemetry(mut self, sink: T) -> Self {
        self.telemetry = Some(sink);
        self
    }

    pub fn build(self) -> Result<PlayerController<T>, ControllerError> {
        let spawn = self
            .spawn
            .ok_or(ControllerError::MissingCollaborator("motion executor spawn pose"))?;
        let telemetry = self
            .telemetry
            .ok_or(ControllerError::MissingCollaborator("telemetry sink"))?;
        self.config.validate()?;

        let mut locomotion = self.config.locomotion;
        let body_height = self.config.collision.standing_height();
        if (locomotion.standing_height - body_height).abs() > Real::EPSILON {
            debug!(
                configured = locomotion.standing_height,
                capsule = body_height,
                "standing height taken from collision capsule"
            );
        }
        locomotion.standing_height = body_height;

        let executor = MotionExecutor::new(
            CharacterBody::new(self.config.collision),
            spawn,
            self.scale,
        );
        info!(
            x = spawn.translation.x,
            y = spawn.translation.y,
            z = spawn.translation.z,
            "player controller spawned"
        );
        Ok(PlayerController {
            motor: LocomotionMotor::new(locomotion, self.scale),
            sensor: GroundStepSensor::new(self.config.sensor),
            executor,
            telemetry,
            yaw: self.yaw,
            pitch: 0.0,
            flip: None,
        })
    }
}
