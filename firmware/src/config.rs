//! Controller configuration.
//!
//! Everything that was a compiled-in pin or timing constant on the first
//! prototype lives here. The defaults describe a 28BYJ-48 geared stepper
//! driving the iris over a quarter turn, fed by an ambient light sensor.

use crate::errors::ConfigError;

/// Half-step count per output shaft revolution of the 28BYJ-48.
pub const DEFAULT_STEPS_PER_REVOLUTION: u32 = 4096;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "PartialIrisConfig"))]
pub struct IrisConfig {
    /// Steps per output shaft revolution
    pub steps_per_revolution: u32,
    /// Step count of the fully closed iris
    pub min_position: i32,
    /// Step count of the fully open iris
    pub max_position: i32,
    /// Minimum time between two light samples, in milliseconds
    pub sample_interval_ms: u32,
    /// Lux value at (and below) which the iris is fully closed
    pub light_threshold_close: f32,
    /// Lux value at (and above) which the iris is fully open
    pub light_threshold_open: f32,
    /// Smoothing factor used for tiny lux changes
    pub alpha_min: f32,
    /// Smoothing factor used for lux jumps of `light_threshold_open` or more
    pub alpha_max: f32,
    /// Hysteresis (lux) at the dark end of the range
    pub hysteresis_min: f32,
    /// Hysteresis (lux) at the bright end of the range
    pub hysteresis_max: f32,
    /// Slowest motor speed in steps per second
    pub min_speed: f32,
    /// Fastest motor speed in steps per second
    pub max_speed: f32,
    /// Gentlest acceleration in steps per second squared
    pub min_acceleration: f32,
    /// Most aggressive acceleration in steps per second squared
    pub max_acceleration: f32,
    /// Motor speed applied before the first sample
    pub initial_speed: f32,
    /// Motor acceleration applied before the first sample
    pub initial_acceleration: f32,
}

impl Default for IrisConfig {
    fn default() -> Self {
        Self::with_quarter_turn(DEFAULT_STEPS_PER_REVOLUTION)
    }
}

impl IrisConfig {
    /// Default configuration for a motor with the given step count, where the
    /// iris travels a quarter revolution from closed to open.
    pub fn with_quarter_turn(steps_per_revolution: u32) -> Self {
        Self {
            steps_per_revolution,
            min_position: 0,
            max_position: (steps_per_revolution / 4) as i32,
            sample_interval_ms: 120,
            light_threshold_close: 1.0,
            light_threshold_open: 10_000.0,
            alpha_min: 0.5,
            alpha_max: 1.0,
            hysteresis_min: 5.0,
            hysteresis_max: 50.0,
            min_speed: 200.0,
            max_speed: 500.0,
            min_acceleration: 100.0,
            max_acceleration: 200.0,
            initial_speed: 500.0,
            initial_acceleration: 200.0,
        }
    }

    /// Sampling interval in microseconds.
    pub fn sample_interval_us(&self) -> u64 {
        u64::from(self.sample_interval_ms) * 1_000
    }

    /// Check that all ranges are well formed.
    ///
    /// The mapping functions divide by the width of the lux range, and the
    /// logarithmic mapping needs a positive closing threshold.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.light_threshold_close > 0.0) {
            return Err(ConfigError::CloseThresholdNotPositive);
        }
        if !(self.light_threshold_open > self.light_threshold_close) {
            return Err(ConfigError::ThresholdsInverted);
        }
        if !(self.alpha_min > 0.0 && self.alpha_min <= self.alpha_max && self.alpha_max <= 1.0) {
            return Err(ConfigError::AlphaOutOfRange);
        }
        if !(self.hysteresis_min >= 0.0 && self.hysteresis_min <= self.hysteresis_max) {
            return Err(ConfigError::HysteresisInverted);
        }
        if !(self.min_speed > 0.0 && self.min_speed <= self.max_speed && self.initial_speed > 0.0)
        {
            return Err(ConfigError::SpeedRange);
        }
        if !(self.min_acceleration > 0.0
            && self.min_acceleration <= self.max_acceleration
            && self.initial_acceleration > 0.0)
        {
            return Err(ConfigError::AccelerationRange);
        }
        if self.max_position <= self.min_position {
            return Err(ConfigError::PositionRange);
        }
        // The iris travels less than one shaft revolution
        if i64::from(self.max_position) - i64::from(self.min_position)
            > i64::from(self.steps_per_revolution)
        {
            return Err(ConfigError::TravelExceedsRevolution);
        }
        if self.sample_interval_ms == 0 {
            return Err(ConfigError::ZeroSampleInterval);
        }
        Ok(())
    }
}

/// Config as read from a file, where every field may be missing.
///
/// Missing fields take their defaults for the given `steps_per_revolution`,
/// so the open position follows the motor when only the step count is set.
/// A missing `max_position` is a quarter turn past `min_position`.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct PartialIrisConfig {
    steps_per_revolution: Option<u32>,
    min_position: Option<i32>,
    max_position: Option<i32>,
    sample_interval_ms: Option<u32>,
    light_threshold_close: Option<f32>,
    light_threshold_open: Option<f32>,
    alpha_min: Option<f32>,
    alpha_max: Option<f32>,
    hysteresis_min: Option<f32>,
    hysteresis_max: Option<f32>,
    min_speed: Option<f32>,
    max_speed: Option<f32>,
    min_acceleration: Option<f32>,
    max_acceleration: Option<f32>,
    initial_speed: Option<f32>,
    initial_acceleration: Option<f32>,
}

#[cfg(feature = "serde")]
impl From<PartialIrisConfig> for IrisConfig {
    fn from(p: PartialIrisConfig) -> Self {
        let d = Self::with_quarter_turn(p.steps_per_revolution.unwrap_or(DEFAULT_STEPS_PER_REVOLUTION));
        let min_position = p.min_position.unwrap_or(d.min_position);
        let quarter_turn = d.max_position - d.min_position;
        Self {
            steps_per_revolution: d.steps_per_revolution,
            min_position,
            max_position: p.max_position.unwrap_or(min_position.saturating_add(quarter_turn)),
            sample_interval_ms: p.sample_interval_ms.unwrap_or(d.sample_interval_ms),
            light_threshold_close: p.light_threshold_close.unwrap_or(d.light_threshold_close),
            light_threshold_open: p.light_threshold_open.unwrap_or(d.light_threshold_open),
            alpha_min: p.alpha_min.unwrap_or(d.alpha_min),
            alpha_max: p.alpha_max.unwrap_or(d.alpha_max),
            hysteresis_min: p.hysteresis_min.unwrap_or(d.hysteresis_min),
            hysteresis_max: p.hysteresis_max.unwrap_or(d.hysteresis_max),
            min_speed: p.min_speed.unwrap_or(d.min_speed),
            max_speed: p.max_speed.unwrap_or(d.max_speed),
            min_acceleration: p.min_acceleration.unwrap_or(d.min_acceleration),
            max_acceleration: p.max_acceleration.unwrap_or(d.max_acceleration),
            initial_speed: p.initial_speed.unwrap_or(d.initial_speed),
            initial_acceleration: p.initial_acceleration.unwrap_or(d.initial_acceleration),
        }
    }
}
