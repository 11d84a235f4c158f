//! The iris control loop.
//!
//! [`IrisController`] owns the estimator, the planner and the hardware
//! collaborators. The application calls [`IrisController::poll`] from its
//! main loop as often as it can: the motor is advanced on every pass, the
//! light sensor is sampled whenever the sampling interval has elapsed.

use heapless::spsc::Queue;

use crate::ambient_light::LightEstimator;
use crate::config::IrisConfig;
use crate::errors::Error;
use crate::motor::Actuator;
use crate::planner::{Plan, PositionPlanner};
use crate::sensor::IlluminanceSource;
use crate::telemetry::{Snapshot, TelemetrySink};

/// Error queue size. Holds `ERROR_QUEUE_SIZE - 1` entries.
pub const ERROR_QUEUE_SIZE: usize = 8;

pub struct IrisController<S, A, T> {
    config: IrisConfig,
    estimator: LightEstimator,
    planner: PositionPlanner,
    sensor: S,
    actuator: A,
    telemetry: T,
    /// Time of the last sample, `None` before `start`
    last_sample_us: Option<u64>,
    last_plan: Option<Plan>,
    snapshot: Option<Snapshot>,
    errors: Queue<Error, ERROR_QUEUE_SIZE>,
}

impl<S, A, T> IrisController<S, A, T>
where
    S: IlluminanceSource,
    A: Actuator,
    T: TelemetrySink,
{
    pub fn new(config: IrisConfig, sensor: S, actuator: A, telemetry: T) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            config,
            estimator: LightEstimator::from_config(&config, 0.0),
            planner: PositionPlanner::new(&config),
            sensor,
            actuator,
            telemetry,
            last_sample_us: None,
            last_plan: None,
            snapshot: None,
            errors: Queue::new(),
        })
    }

    /// Seed the estimator with a first reading and close the iris.
    pub fn start(&mut self, now_us: u64) {
        let initial = self.read().unwrap_or(0.0);
        self.estimator.reset(initial);
        self.actuator
            .set_motion_params(self.config.initial_speed, self.config.initial_acceleration);
        self.actuator.move_to(self.config.min_position);
        self.last_sample_us = Some(now_us);
        log::info!("Iris controller started, initial light level {} lux", initial);
    }

    /// One pass of the main loop. Returns the snapshot if a control tick ran.
    pub fn poll(&mut self, now_us: u64) -> Option<Snapshot> {
        if let Err(e) = self.actuator.advance(now_us) {
            log::warn!("Actuator fault: {}", e);
            self.record(e);
        }

        let last = match self.last_sample_us {
            Some(last) => last,
            None => {
                self.start(now_us);
                return None;
            }
        };
        if now_us.wrapping_sub(last) > self.config.sample_interval_us() {
            self.last_sample_us = Some(now_us);
            return self.tick();
        }
        None
    }

    /// Sample the light sensor and command the actuator. A failed reading
    /// skips the tick and keeps the previous estimate.
    pub fn tick(&mut self) -> Option<Snapshot> {
        let lux = self.read()?;
        let estimate = self.estimator.update(lux);
        let plan = self.planner.plan(estimate.smoothed, estimate.delta);

        self.actuator.set_motion_params(plan.speed, plan.acceleration);
        self.actuator.move_to(plan.target);

        let snapshot = Snapshot {
            lux,
            smoothed_lux: estimate.smoothed,
            lux_change: estimate.delta,
            adjusted_speed: plan.speed,
            adjusted_acceleration: plan.acceleration,
            target_position: plan.target,
            current_position: self.actuator.current_position(),
        };
        log::debug!(
            "Tick: lux={} smoothed={} alpha={} target={} ({:?})",
            lux,
            estimate.smoothed,
            estimate.alpha,
            plan.target,
            plan.zone
        );
        if let Err(e) = self.telemetry.publish(&snapshot) {
            log::warn!("Telemetry fault: {}", e);
            self.record(e);
        }
        self.last_plan = Some(plan);
        self.snapshot = Some(snapshot);
        Some(snapshot)
    }

    fn read(&mut self) -> Option<f32> {
        match self.sensor.read_illuminance() {
            Ok(lux) if lux.is_finite() => Some(lux),
            Ok(_) => {
                log::warn!("Discarding non-finite light reading");
                self.record(Error::SensorReadFailed);
                None
            }
            Err(e) => {
                log::warn!("Light sensor read failed: {:?}", e);
                self.record(Error::SensorReadFailed);
                None
            }
        }
    }

    fn record(&mut self, error: Error) {
        error.log(&mut self.errors);
    }

    /// Oldest unreported error, if any.
    pub fn take_error(&mut self) -> Option<Error> {
        self.errors.dequeue()
    }

    /// Snapshot of the last completed tick.
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.snapshot
    }

    pub fn last_plan(&self) -> Option<Plan> {
        self.last_plan
    }

    pub fn smoothed_lux(&self) -> f32 {
        self.estimator.smoothed()
    }

    pub fn config(&self) -> &IrisConfig {
        &self.config
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn actuator_mut(&mut self) -> &mut A {
        &mut self.actuator
    }

    pub fn telemetry(&self) -> &T {
        &self.telemetry
    }

    /// Give back the collaborators.
    pub fn release(self) -> (S, A, T) {
        (self.sensor, self.actuator, self.telemetry)
    }
}
