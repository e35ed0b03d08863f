use std::fmt;

use rapier3d::prelude::Real;
use tracing::trace;

/// Per-tick readout for HUDs and debug overlays.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TelemetrySample {
    pub bunny_hop_chain: u32,
    /// Magnitude of the achieved velocity.
    pub speed: Real,
}

impl fmt::Display for TelemetrySample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Bunnyhop chain: {}", self.bunny_hop_chain)?;
        write!(f, "Current speed: {:.2}", self.speed)
    }
}

pub trait TelemetrySink {
    fn record(&mut self, sample: TelemetrySample);
}

impl TelemetrySink for Vec<TelemetrySample> {
    fn record(&mut self, sample: TelemetrySample) {
        self.push(sample);
    }
}

/// Emits each sample as a `trace` event.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn record(&mut self, sample: TelemetrySample) {
        trace!(
            chain = sample.bunny_hop_chain,
            speed = sample.speed,
            "locomotion telemetry"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_hud_lines() {
        let sample = TelemetrySample {
            bunny_hop_chain: 3,
            speed: 12.346,
        };
        assert_eq!(
            sample.to_string(),
            "Bunnyhop chain: 3\nCurrent speed: 12.35"
        );
    }
}
