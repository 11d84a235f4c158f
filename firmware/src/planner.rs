//! Maps the smoothed light level to an iris position and motion parameters.
//!
//! Between the two thresholds the aperture follows the logarithm of the lux
//! value, which matches how brightness is perceived. Outside of the
//! thresholds (plus an adaptive hysteresis margin) the iris is driven to one
//! of its end stops.

use crate::config::IrisConfig;
use crate::mapping::{clamp, log_lux, map_clamped, map_range};

/// Which branch of the planner produced the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    /// Darker than the closing threshold minus hysteresis
    Closed,
    /// Inside the band, target follows the log-lux mapping
    Tracking,
    /// Brighter than the opening threshold plus hysteresis
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plan {
    pub target: i32,
    pub speed: f32,
    pub acceleration: f32,
    pub hysteresis: f32,
    pub zone: Zone,
}

pub struct PositionPlanner {
    config: IrisConfig,
    log_close: f32,
    log_open: f32,
}

impl PositionPlanner {
    pub fn new(config: &IrisConfig) -> Self {
        Self {
            config: *config,
            log_close: log_lux(config.light_threshold_close),
            log_open: log_lux(config.light_threshold_open),
        }
    }

    pub fn plan(&self, smoothed: f32, delta: f32) -> Plan {
        let c = &self.config;
        let hysteresis = self.hysteresis(smoothed);

        let (zone, target) = if smoothed < c.light_threshold_close - hysteresis {
            (Zone::Closed, c.min_position)
        } else if smoothed > c.light_threshold_open + hysteresis {
            (Zone::Open, c.max_position)
        } else {
            (Zone::Tracking, self.logarithmic_position(smoothed))
        };

        let (speed, acceleration) = self.motion_params(delta);
        Plan {
            target,
            speed,
            acceleration,
            hysteresis,
            zone,
        }
    }

    /// Hysteresis margin in lux, growing with the light level.
    pub fn hysteresis(&self, smoothed: f32) -> f32 {
        let c = &self.config;
        map_clamped(
            smoothed,
            c.light_threshold_close,
            c.light_threshold_open,
            c.hysteresis_min,
            c.hysteresis_max,
        )
    }

    /// Position for a lux value on the logarithmic scale between the two
    /// thresholds. Non-positive lux maps to the closed position.
    pub fn logarithmic_position(&self, lux: f32) -> i32 {
        let c = &self.config;
        let log = clamp(log_lux(lux), self.log_close, self.log_open);
        let position = map_range(
            log,
            self.log_close,
            self.log_open,
            c.min_position as f32,
            c.max_position as f32,
        );
        // Truncate toward zero to whole steps
        (position as i32).clamp(c.min_position, c.max_position)
    }

    /// Speed and acceleration for a lux change. Fast light changes get a fast,
    /// aggressive sweep; slow ones move gently.
    pub fn motion_params(&self, delta: f32) -> (f32, f32) {
        let c = &self.config;
        let full_scale = c.light_threshold_open;
        let speed = map_clamped(delta, 0.0, full_scale, c.min_speed, c.max_speed);
        let acceleration = map_clamped(
            delta,
            0.0,
            full_scale,
            c.min_acceleration,
            c.max_acceleration,
        );
        (speed, acceleration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_512() -> IrisConfig {
        IrisConfig {
            max_position: 512,
            ..IrisConfig::default()
        }
    }

    fn planner() -> PositionPlanner {
        PositionPlanner::new(&config_512())
    }

    #[test]
    fn test_mid_band() {
        let plan = planner().plan(100.0, 0.0);
        assert_eq!(plan.zone, Zone::Tracking);
        assert_eq!(plan.target, 256);
    }

    #[test]
    fn test_position_truncates_below_integer() {
        // Default config maps one decade onto 256 steps
        let p = PositionPlanner::new(&IrisConfig::default());
        let lux = 10.0_f32.powf(299.9995 / 256.0);
        assert_eq!(p.logarithmic_position(lux), 299);
    }

    #[test]
    fn test_position_truncates_toward_zero() {
        let p = PositionPlanner::new(&IrisConfig {
            min_position: -512,
            max_position: 512,
            ..IrisConfig::default()
        });
        // log10 = 1.1 maps to -230.4
        let lux = 10.0_f32.powf(1.1);
        assert_eq!(p.logarithmic_position(lux), -230);
        assert_eq!(p.logarithmic_position(100.0), 0);
        assert_eq!(p.logarithmic_position(0.5), -512);
    }

    #[test]
    fn test_very_dark_is_closed() {
        let plan = planner().plan(0.001, 0.0);
        assert_eq!(plan.target, 0);
    }

    #[test]
    fn test_negative_lux_is_closed() {
        let p = planner();
        assert_eq!(p.plan(-100.0, 0.0).zone, Zone::Closed);
        assert_eq!(p.plan(-100.0, 0.0).target, 0);
        assert_eq!(p.logarithmic_position(0.0), 0);
        assert_eq!(p.logarithmic_position(-1.0), 0);
    }

    #[test]
    fn test_very_bright_is_open() {
        let plan = planner().plan(50_000.0, 0.0);
        assert_eq!(plan.zone, Zone::Open);
        assert_eq!(plan.target, 512);
    }

    #[test]
    fn test_hysteresis_band_at_open_threshold() {
        let p = planner();
        // Inside the hysteresis margin above the threshold, mapping saturates
        let plan = p.plan(10_020.0, 0.0);
        assert_eq!(plan.zone, Zone::Tracking);
        assert_eq!(plan.target, 512);
        assert_eq!(p.plan(10_051.0, 0.0).zone, Zone::Open);
    }

    #[test]
    fn test_hysteresis_range() {
        let p = planner();
        assert_eq!(p.hysteresis(0.0), 5.0);
        assert_eq!(p.hysteresis(1.0), 5.0);
        assert_eq!(p.hysteresis(10_000.0), 50.0);
        assert_eq!(p.hysteresis(1.0e6), 50.0);
        let mid = p.hysteresis(5_000.0);
        assert!(mid > 27.0 && mid < 28.0);
    }

    #[test]
    fn test_hysteresis_prevents_chatter() {
        let p = planner();
        // Start well below the closing threshold minus hysteresis
        assert_eq!(p.plan(-10.0, 0.0).zone, Zone::Closed);
        // Oscillate within [close - H, close]
        for lux in [-4.0, 0.5, -3.0, 1.0, 0.0, -4.5, 0.9] {
            let plan = p.plan(lux, 1.0);
            assert_eq!(plan.target, 0, "target moved for lux {}", lux);
        }
    }

    #[test]
    fn test_motion_params() {
        let p = planner();
        assert_eq!(p.motion_params(0.0), (200.0, 100.0));
        assert_eq!(p.motion_params(10_000.0), (500.0, 200.0));
        assert_eq!(p.motion_params(1.0e6), (500.0, 200.0));
        let (speed, accel) = p.motion_params(5_000.0);
        assert!((speed - 350.0).abs() < 1e-3);
        assert!((accel - 150.0).abs() < 1e-3);
    }

    #[test]
    fn test_plan_carries_motion_params() {
        let plan = planner().plan(100.0, 10_000.0);
        assert_eq!(plan.speed, 500.0);
        assert_eq!(plan.acceleration, 200.0);
    }

    #[test]
    fn test_monotonic_sweep() {
        let p = planner();
        let mut last = i32::MIN;
        let mut lux = 1.0_f32;
        while lux <= 10_000.0 {
            let target = p.plan(lux, 0.0).target;
            assert!(target >= last, "{} < {} at {} lux", target, last, lux);
            last = target;
            lux *= 1.1;
        }
    }

    mod props {
        use super::super::*;
        use super::config_512;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn target_within_limits(smoothed in -1.0e6f32..1.0e6, delta in 0.0f32..1.0e6) {
                let plan = PositionPlanner::new(&config_512()).plan(smoothed, delta);
                prop_assert!((0..=512).contains(&plan.target));
                prop_assert!((200.0..=500.0).contains(&plan.speed));
                prop_assert!((100.0..=200.0).contains(&plan.acceleration));
                prop_assert!((5.0..=50.0).contains(&plan.hysteresis));
            }

            #[test]
            fn target_monotonic(a in 1.0f32..10_000.0, b in 1.0f32..10_000.0) {
                let p = PositionPlanner::new(&config_512());
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                prop_assert!(p.plan(lo, 0.0).target <= p.plan(hi, 0.0).target);
            }
        }
    }
}
