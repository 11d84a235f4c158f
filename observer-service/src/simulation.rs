//! Runs the iris control loop on the host against a simulated light source
//! and a stepper without hardware behind it.

use std::{
    convert::Infallible,
    f32::consts::PI,
    thread,
    time::{Duration, Instant},
};

use embedded_hal::digital::v2::OutputPin;
use iris_firmware::{
    motor::{Actuator, Stepper},
    sensor::IlluminanceSource,
    telemetry::TelemetrySink,
    IrisConfig, IrisController,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, warn};

use crate::config::Simulation;

/// Coil output that goes nowhere
pub struct VirtualCoil;

impl OutputPin for VirtualCoil {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub type VirtualStepper = Stepper<VirtualCoil, VirtualCoil, VirtualCoil, VirtualCoil>;

/// Light level following a day cycle, dark at t=0, brightest half a day
/// later. The level moves on a logarithmic scale, like real dawn and dusk.
pub struct SimulatedLight {
    settings: Simulation,
    started: Instant,
    rng: StdRng,
}

impl SimulatedLight {
    pub fn new(settings: Simulation, seed: u64) -> Self {
        Self {
            settings,
            started: Instant::now(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Noise-free light level at the given time into the simulation.
    pub fn lux_at(&self, elapsed: Duration) -> f32 {
        let s = &self.settings;
        let phase = (elapsed.as_secs_f32() / s.day_length_s).fract();
        let daylight = 0.5 - 0.5 * (2.0 * PI * phase).cos();
        s.min_lux * (s.max_lux / s.min_lux).powf(daylight)
    }

    fn sample(&mut self, elapsed: Duration) -> f32 {
        let jitter = self.settings.jitter_lux;
        let noise = if jitter > 0.0 {
            self.rng.gen_range(-jitter..=jitter)
        } else {
            0.0
        };
        (self.lux_at(elapsed) + noise).max(0.0)
    }
}

impl IlluminanceSource for SimulatedLight {
    type Error = Infallible;

    fn read_illuminance(&mut self) -> Result<f32, Self::Error> {
        let elapsed = self.started.elapsed();
        Ok(self.sample(elapsed))
    }
}

pub fn build<T: TelemetrySink>(
    iris: IrisConfig,
    settings: Simulation,
    telemetry: T,
) -> anyhow::Result<IrisController<SimulatedLight, VirtualStepper, T>> {
    let stepper = Stepper::new(
        (VirtualCoil, VirtualCoil, VirtualCoil, VirtualCoil),
        iris.initial_speed,
        iris.initial_acceleration,
    );
    let light = SimulatedLight::new(settings, rand::random());
    IrisController::new(iris, light, stepper, telemetry)
        .map_err(|e| anyhow::anyhow!("Invalid iris config: {}", e))
}

/// Main loop of the simulation. Never returns.
pub fn run<T: TelemetrySink>(
    mut controller: IrisController<SimulatedLight, VirtualStepper, T>,
    pass_interval: Duration,
) -> ! {
    let started = Instant::now();
    controller.start(0);
    loop {
        let now_us = started.elapsed().as_micros() as u64;
        if let Some(snapshot) = controller.poll(now_us) {
            let zone = controller.last_plan().map(|plan| plan.zone);
            debug!(
                "lux={:.2} smoothed={:.2} target={} ({:?}) position={}",
                snapshot.lux,
                snapshot.smoothed_lux,
                snapshot.target_position,
                zone,
                controller.actuator().current_position(),
            );
        }
        while let Some(e) = controller.take_error() {
            warn!("Control loop error: {}", e);
        }
        thread::sleep(pass_interval);
    }
}

#[cfg(test)]
mod tests {
    use iris_firmware::{planner::Zone, telemetry::SnapshotCell};

    use super::*;

    fn settings() -> Simulation {
        Simulation {
            day_length_s: 100.0,
            min_lux: 0.1,
            max_lux: 10_000.0,
            jitter_lux: 0.0,
            pass_interval_ms: 1,
        }
    }

    #[test]
    fn test_day_cycle() {
        let light = SimulatedLight::new(settings(), 1);
        assert!((light.lux_at(Duration::ZERO) - 0.1).abs() < 1e-4);
        assert!((light.lux_at(Duration::from_secs(50)) - 10_000.0).abs() < 1.0);
        // Dawn and dusk are symmetric
        let dawn = light.lux_at(Duration::from_secs(25));
        let dusk = light.lux_at(Duration::from_secs(75));
        assert!((dawn - dusk).abs() / dawn < 1e-3);
        // Next day starts dark again
        assert!(light.lux_at(Duration::from_secs(100)) < 1.0);
    }

    #[test]
    fn test_jitter_bounded() {
        let mut s = settings();
        s.jitter_lux = 5.0;
        let mut light = SimulatedLight::new(s, 42);
        for _ in 0..1000 {
            let lux = light.sample(Duration::from_secs(25));
            let clean = light.lux_at(Duration::from_secs(25));
            assert!((lux - clean).abs() <= 5.0 + 1e-3);
            assert!(lux >= 0.0);
        }
    }

    #[test]
    fn test_controller_tracks_light() {
        let mut controller = build(IrisConfig::default(), settings(), SnapshotCell::new()).unwrap();
        controller.start(0);
        let mut now = 0;
        while now < 2_000_000 {
            controller.poll(now);
            now += 500;
        }
        // Simulation started at midnight, so the iris stays closed
        let snapshot = controller.telemetry().latest().unwrap();
        assert_eq!(snapshot.target_position, 0);
        assert_eq!(controller.actuator().current_position(), 0);
        assert!(controller.telemetry().published() >= 10);
        // Below the closing threshold but inside its hysteresis margin
        assert_eq!(controller.last_plan().unwrap().zone, Zone::Tracking);
    }
}
