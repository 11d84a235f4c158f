//! Ambient light estimator with adaptive smoothing.
//!
//! Raw lux readings are blended into an exponential moving average whose
//! weight depends on how far the new reading is from the current estimate:
//! small jitter is damped heavily, large jumps are followed almost
//! immediately.
use crate::config::IrisConfig;
use crate::mapping::map_clamped;

pub struct LightEstimator {
    /// Smoothing factor used when the reading equals the estimate
    alpha_min: f32,
    /// Smoothing factor used for jumps of `full_scale` lux or more
    alpha_max: f32,
    /// Lux change at which the smoothing factor saturates
    full_scale: f32,
    /// Current smoothed lux value, carried from tick to tick
    smoothed: f32,
}

impl LightEstimator {
    pub fn new(alpha_min: f32, alpha_max: f32, full_scale: f32, initial_lux: f32) -> Self {
        Self {
            alpha_min,
            alpha_max,
            full_scale,
            smoothed: initial_lux,
        }
    }

    pub fn from_config(config: &IrisConfig, initial_lux: f32) -> Self {
        Self::new(
            config.alpha_min,
            config.alpha_max,
            config.light_threshold_open,
            initial_lux,
        )
    }

    /// Blend weight for a given lux change.
    pub fn alpha(&self, delta: f32) -> f32 {
        map_clamped(delta, 0.0, self.full_scale, self.alpha_min, self.alpha_max)
    }

    /// Feed a raw reading into the estimator.
    pub fn update(&mut self, lux: f32) -> Estimate {
        let delta = libm::fabsf(lux - self.smoothed);
        let alpha = self.alpha(delta);
        self.smoothed = alpha * lux + (1.0 - alpha) * self.smoothed;
        Estimate {
            raw: lux,
            smoothed: self.smoothed,
            delta,
            alpha,
        }
    }

    pub fn smoothed(&self) -> f32 {
        self.smoothed
    }

    /// Discard history and restart from the given value.
    pub fn reset(&mut self, lux: f32) {
        self.smoothed = lux;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    /// Reading that produced this estimate
    pub raw: f32,
    /// Smoothed lux after the update
    pub smoothed: f32,
    /// Absolute difference between the reading and the previous estimate
    pub delta: f32,
    /// Blend weight that was applied
    pub alpha: f32,
}
