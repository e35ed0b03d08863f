//! Locomotion motor: walking, chained jumps, air dash, crouch and slide.
//!
//! The motor owns the actor's movement state and turns one tick of input
//! plus a ground reading into a displacement request. It never touches
//! position or scale itself; stance changes are returned for the executor.
#![forbid(unsafe_code)]

mod config;
pub mod flip;
pub mod integrator;

pub use config::{ConfigError, LandingChainReset, LocomotionConfig};
pub use flip::{FlipProgress, FlipTask};

use integrator::MotionParts;
use rapier3d::math::Vector;
use rapier3d::prelude::Real;
use tracing::debug;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LocomotionMode {
    #[default]
    Normal,
    Dashing,
    Crouching,
    Sliding,
}

/// Body posture, independent of the movement mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Stance {
    #[default]
    Standing,
    Crouched,
}

/// Held directional keys, relative to the actor facing.
#[derive(Clone, Copy, Debug, Default)]
pub struct DashKeys {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LocomotionInput {
    /// Raw strafe / forward axes in [-1, 1].
    pub move_axis: [Real; 2],
    pub jump: bool,
    pub dash: bool,
    pub crouch_pressed: bool,
    pub crouch_released: bool,
    pub dash_keys: DashKeys,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GroundSense {
    pub grounded: bool,
    pub stairs_ahead: bool,
    pub step_height: Real,
}

#[derive(Clone, Copy, Debug)]
pub struct MotorContext {
    pub dt: Real,
    /// Clock sampled once for the whole tick.
    pub now: f64,
    pub yaw: Real,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StanceChange {
    pub scale: Vector<Real>,
    pub pivot_shift: Real,
}

#[derive(Clone, Copy, Debug)]
pub struct LocomotionOutput {
    pub displacement: Vector<Real>,
    pub stance_change: Option<StanceChange>,
    pub landed: bool,
    pub jumped: bool,
    pub dash_started: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ActorState {
    pub mode: LocomotionMode,
    pub stance: Stance,
    /// Scale captured at spawn and restored when standing up.
    pub standing_scale: Vector<Real>,
    pub velocity: Vector<Real>,
    pub is_grounded: bool,
    pub was_grounded: bool,
    pub bunny_hop_chain: u32,
    pub dash_timer: Real,
    pub last_dash_time: Option<f64>,
    pub slide_timer: Real,
    pub land_time: Option<f64>,
    pub step_height: Real,
    pub stairs_ahead: bool,
}

impl ActorState {
    pub fn spawn(standing_scale: Vector<Real>) -> Self {
        Self {
            mode: LocomotionMode::Normal,
            stance: Stance::Standing,
            standing_scale,
            velocity: Vector::zeros(),
            is_grounded: false,
            was_grounded: false,
            bunny_hop_chain: 0,
            dash_timer: 0.0,
            last_dash_time: None,
            slide_timer: 0.0,
            land_time: None,
            step_height: 0.0,
            stairs_ahead: false,
        }
    }

    pub fn has_ever_dashed(&self) -> bool {
        self.last_dash_time.is_some()
    }

    pub fn dash_cooldown_deadline(&self, cooldown: Real) -> Option<f64> {
        self.last_dash_time.map(|t| t + cooldown as f64)
    }

    /// The first dash is never gated by the cooldown.
    pub fn dash_ready(&self, now: f64, cooldown: Real) -> bool {
        match self.dash_cooldown_deadline(cooldown) {
            Some(deadline) => now >= deadline,
            None => true,
        }
    }

    pub fn horizontal_speed(&self) -> Real {
        Vector::new(self.velocity.x, 0.0, self.velocity.z).norm()
    }
}

pub struct LocomotionMotor {
    config: LocomotionConfig,
    state: ActorState,
}

impl LocomotionMotor {
    pub fn new(config: LocomotionConfig, standing_scale: Vector<Real>) -> Self {
        Self {
            config,
            state: ActorState::spawn(standing_scale),
        }
    }

    pub fn config(&self) -> LocomotionConfig {
        self.config
    }

    pub fn config_mut(&mut self) -> &mut LocomotionConfig {
        &mut self.config
    }

    pub fn state(&self) -> &ActorState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ActorState {
        &mut self.state
    }

    pub fn step(
        &mut self,
        input: &LocomotionInput,
        sense: GroundSense,
        ctx: MotorContext,
    ) -> LocomotionOutput {
        let dt = ctx.dt.max(0.0);
        let now = ctx.now;
        let config = self.config;
        let state = &mut self.state;

        state.was_grounded = state.is_grounded;
        state.is_grounded = sense.grounded;
        state.stairs_ahead = sense.stairs_ahead;
        state.step_height = sense.step_height;

        let mut landed = false;
        if !state.was_grounded && state.is_grounded {
            landed = true;
            let previous = state.land_time.replace(now);
            let reference = match config.landing_chain_reset {
                LandingChainReset::AsRecorded => Some(now),
                LandingChainReset::PreviousLanding => previous,
            };
            if let Some(reference) = reference {
                if state.bunny_hop_chain > 0
                    && (now - reference) as Real > config.landing_grace_window
                {
                    debug!(chain = state.bunny_hop_chain, "bunny hop chain expired on landing");
                    state.bunny_hop_chain = 0;
                }
            }
            debug!(now, "landed");
        }

        if state.is_grounded && state.velocity.y < 0.0 {
            state.velocity.y = config.ground_clamp_velocity;
        }

        let direction = integrator::move_direction(input.move_axis);

        state.velocity.y = integrator::apply_gravity(state.velocity.y, config.gravity, dt);

        let mut dash = Vector::zeros();
        if state.mode == LocomotionMode::Dashing {
            dash = dash_displacement(input.dash_keys, ctx.yaw, config.dash_speed, dt);
            state.dash_timer -= dt;
            if state.dash_timer < 0.0 {
                state.dash_timer = 0.0;
                state.mode = LocomotionMode::Normal;
                debug!("dash finished");
            }
        }

        let mut jumped = false;
        if input.jump && state.is_grounded {
            let chained = state
                .land_time
                .is_some_and(|t| ((now - t) as Real) < config.landing_grace_window);
            let height = if chained {
                state.bunny_hop_chain += 1;
                config.jump_force + state.bunny_hop_chain as Real
            } else {
                state.bunny_hop_chain = 0;
                config.jump_force
            };
            state.velocity.y = integrator::launch_speed(config.gravity, height);
            jumped = true;
            debug!(
                chain = state.bunny_hop_chain,
                launch = state.velocity.y,
                "jumped"
            );
        }

        let mut dash_started = false;
        if input.dash
            && state.mode != LocomotionMode::Dashing
            && state.dash_ready(now, config.dash_cooldown)
        {
            state.mode = LocomotionMode::Dashing;
            state.dash_timer = config.dash_time;
            state.last_dash_time = Some(now);
            dash_started = true;
            debug!(now, "dash started");
        }

        let mut stance_change = None;
        let mut slide_started = false;
        if input.crouch_pressed && state.is_grounded {
            if state.stance == Stance::Standing {
                state.stance = Stance::Crouched;
                stance_change = merge_stance(
                    stance_change,
                    StanceChange {
                        scale: config.crouch_scale(),
                        pivot_shift: -config.crouch_pivot_drop(state.standing_scale),
                    },
                );
            }
            state.velocity.y = config.crouch_down_force;
            state.dash_timer = 0.0;
            if state.horizontal_speed() > config.slide_speed_threshold && state.is_grounded {
                let planar = Vector::new(state.velocity.x, 0.0, state.velocity.z);
                state.mode = LocomotionMode::Sliding;
                state.slide_timer = 0.0;
                state.velocity = planar.normalize() * config.crouch_slide_speed;
                slide_started = true;
                debug!(speed = config.crouch_slide_speed, "slide started");
            } else {
                state.mode = LocomotionMode::Crouching;
                state.velocity = Vector::zeros();
                debug!("crouched");
            }
        }

        if input.crouch_released && state.is_grounded && state.stance == Stance::Crouched {
            state.stance = Stance::Standing;
            stance_change = merge_stance(
                stance_change,
                StanceChange {
                    scale: state.standing_scale,
                    pivot_shift: config.crouch_pivot_drop(state.standing_scale),
                },
            );
            if matches!(
                state.mode,
                LocomotionMode::Crouching | LocomotionMode::Sliding
            ) {
                state.mode = LocomotionMode::Normal;
            }
            state.slide_timer = 0.0;
            state.velocity = Vector::zeros();
            debug!("stood up");
        }

        let horizontal = match state.mode {
            LocomotionMode::Sliding => {
                if !slide_started {
                    state.slide_timer += dt;
                }
                if state.slide_timer < config.slide_duration {
                    Vector::new(state.velocity.x, 0.0, state.velocity.z)
                } else {
                    state.mode = LocomotionMode::Normal;
                    state.velocity = Vector::zeros();
                    debug!(elapsed = state.slide_timer, "slide finished");
                    Vector::zeros()
                }
            }
            LocomotionMode::Crouching => direction * config.crouch_move_speed,
            LocomotionMode::Normal | LocomotionMode::Dashing => direction * config.move_speed,
        };
        state.velocity.x = horizontal.x;
        state.velocity.z = horizontal.z;

        let step_up = if sense.stairs_ahead {
            sense.step_height
        } else {
            0.0
        };
        let displacement = integrator::compose(
            MotionParts {
                dash,
                horizontal_velocity: horizontal,
                vertical_velocity: state.velocity.y,
                step_up,
            },
            dt,
        );

        LocomotionOutput {
            displacement,
            stance_change,
            landed,
            jumped,
            dash_started,
        }
    }
}

fn dash_displacement(keys: DashKeys, yaw: Real, speed: Real, dt: Real) -> Vector<Real> {
    let forward = Vector::new(yaw.sin(), 0.0, yaw.cos());
    let right = Vector::new(yaw.cos(), 0.0, -yaw.sin());
    let step = speed * dt;
    let mut displacement = Vector::zeros();
    if keys.forward {
        displacement += forward * step;
    }
    if keys.back {
        displacement -= forward * step;
    }
    if keys.left {
        displacement -= right * step;
    }
    if keys.right {
        displacement += right * step;
    }
    displacement
}

fn merge_stance(current: Option<StanceChange>, next: StanceChange) -> Option<StanceChange> {
    Some(match current {
        Some(current) => StanceChange {
            scale: next.scale,
            pivot_shift: current.pivot_shift + next.pivot_shift,
        },
        None => next,
    })
}
