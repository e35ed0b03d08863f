//! Airborne flip as a per-tick resumable task.

use rapier3d::prelude::Real;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlipTask {
    elapsed: Real,
    duration: Real,
    start_pitch: Real,
    target_pitch: Real,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FlipProgress {
    Running(Real),
    Finished(Real),
}

impl FlipProgress {
    pub fn pitch(self) -> Real {
        match self {
            FlipProgress::Running(pitch) | FlipProgress::Finished(pitch) => pitch,
        }
    }
}

impl FlipTask {
    pub fn new(start_pitch: Real, angle: Real, duration: Real) -> Self {
        Self {
            elapsed: 0.0,
            duration: duration.max(0.0),
            start_pitch,
            target_pitch: start_pitch + angle,
        }
    }

    pub fn start_pitch(&self) -> Real {
        self.start_pitch
    }

    pub fn target_pitch(&self) -> Real {
        self.target_pitch
    }

    /// Pitch for the current frame, then moves the clock forward by `dt`.
    pub fn advance(&mut self, dt: Real) -> FlipProgress {
        if self.elapsed >= self.duration {
            return FlipProgress::Finished(self.target_pitch);
        }
        let t = self.elapsed / self.duration;
        let pitch = self.start_pitch + (self.target_pitch - self.start_pitch) * t;
        self.elapsed += dt.max(0.0);
        FlipProgress::Running(pitch)
    }

    /// Pitch to restore when the flip is abandoned.
    pub fn cancel(self) -> Real {
        self.start_pitch
    }
}
