//! Open-loop stepper motor driver for the iris.
//!
//! Drives a unipolar stepper (28BYJ-48 with a ULN2003 board) through four
//! coil outputs in full-step mode. Motion follows a constant-acceleration
//! profile: the interval between steps shrinks while accelerating, is floored
//! at the interval corresponding to the maximum speed, and grows again so the
//! motor comes to rest exactly on the target.
//!
//! There is no position feedback. The step counter is assumed to match the
//! mechanical position.

use embedded_hal::digital::v2::OutputPin;
use libm::{fabsf, sqrtf};

use crate::errors::Error;

/// Full-step coil pattern, indexed by `position & 3`
const FULL_STEP_SEQUENCE: [[bool; 4]; 4] = [
    [true, false, true, false],
    [false, true, true, false],
    [false, true, false, true],
    [true, false, false, true],
];

/// Something that can move the iris to a commanded position.
pub trait Actuator {
    /// Set the maximum speed (steps/s) and acceleration (steps/s²) for
    /// subsequent motion.
    fn set_motion_params(&mut self, speed: f32, acceleration: f32);

    /// Set a new absolute target. Motion happens in [`advance`](Self::advance).
    fn move_to(&mut self, target: i32);

    /// Make progress towards the target. Must be called on every scheduler
    /// pass, as often as possible. Returns whether a step was taken.
    fn advance(&mut self, now_us: u64) -> Result<bool, Error>;

    /// Step count the actuator believes it is at.
    fn current_position(&self) -> i32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Increasing step count (opening)
    Clockwise,
    /// Decreasing step count (closing)
    CounterClockwise,
}

pub struct Stepper<P1, P2, P3, P4> {
    coils: (P1, P2, P3, P4),
    current: i32,
    target: i32,
    /// Signed speed in steps/s, positive when opening
    speed: f32,
    max_speed: f32,
    acceleration: f32,
    /// Current step interval in µs, 0 when stopped
    step_interval_us: u32,
    last_step_us: u64,
    /// Step counter along the ramp. Negative while decelerating.
    n: i32,
    /// Initial step interval in µs
    c0: f32,
    /// Last step interval in µs
    cn: f32,
    /// Step interval at maximum speed in µs
    cmin: f32,
    direction: Direction,
}

impl<P1, P2, P3, P4> Stepper<P1, P2, P3, P4>
where
    P1: OutputPin,
    P2: OutputPin,
    P3: OutputPin,
    P4: OutputPin,
{
    /// Create a stepper at position 0. Non-positive speed or acceleration
    /// fall back to 1.
    pub fn new(coils: (P1, P2, P3, P4), max_speed: f32, acceleration: f32) -> Self {
        let max_speed = positive_or_one(max_speed);
        let acceleration = positive_or_one(acceleration);
        Self {
            coils,
            current: 0,
            target: 0,
            speed: 0.0,
            max_speed,
            acceleration,
            step_interval_us: 0,
            last_step_us: 0,
            n: 0,
            c0: initial_interval(acceleration),
            cn: 0.0,
            cmin: 1_000_000.0 / max_speed,
            direction: Direction::CounterClockwise,
        }
    }

    pub fn target_position(&self) -> i32 {
        self.target
    }

    pub fn distance_to_go(&self) -> i32 {
        self.target - self.current
    }

    /// Current signed speed in steps/s.
    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn max_speed(&self) -> f32 {
        self.max_speed
    }

    pub fn acceleration(&self) -> f32 {
        self.acceleration
    }

    pub fn is_running(&self) -> bool {
        self.speed != 0.0 || self.distance_to_go() != 0
    }

    /// Redefine the current position without moving. Stops any motion.
    pub fn set_current_position(&mut self, position: i32) {
        self.current = position;
        self.target = position;
        self.n = 0;
        self.step_interval_us = 0;
        self.speed = 0.0;
    }

    pub fn set_max_speed(&mut self, speed: f32) {
        let speed = fabsf(speed);
        if !(speed > 0.0) || !speed.is_finite() {
            log::warn!("Ignoring invalid stepper speed");
            return;
        }
        if self.max_speed != speed {
            self.max_speed = speed;
            self.cmin = 1_000_000.0 / speed;
            // Recompute the ramp position if we are currently accelerating
            if self.n > 0 {
                self.n = self.steps_to_stop();
                self.compute_new_speed();
            }
        }
    }

    pub fn set_acceleration(&mut self, acceleration: f32) {
        let acceleration = fabsf(acceleration);
        if !(acceleration > 0.0) || !acceleration.is_finite() {
            log::warn!("Ignoring invalid stepper acceleration");
            return;
        }
        if self.acceleration != acceleration {
            // Keep the current speed on the new ramp
            self.n = (self.n as f32 * (self.acceleration / acceleration)) as i32;
            self.c0 = initial_interval(acceleration);
            self.acceleration = acceleration;
            self.compute_new_speed();
        }
    }

    /// De-energise all coils. The motor loses holding torque.
    pub fn release(&mut self) -> Result<(), Error> {
        set_pin(&mut self.coils.0, false)?;
        set_pin(&mut self.coils.1, false)?;
        set_pin(&mut self.coils.2, false)?;
        set_pin(&mut self.coils.3, false)
    }

    /// Give back the coil pins.
    pub fn destroy(self) -> (P1, P2, P3, P4) {
        self.coils
    }

    fn steps_to_stop(&self) -> i32 {
        ((self.speed * self.speed) / (2.0 * self.acceleration)) as i32
    }

    /// Work out the interval to the next step, based on the current position
    /// on the ramp and the distance left.
    fn compute_new_speed(&mut self) {
        let distance_to = self.distance_to_go();
        let steps_to_stop = self.steps_to_stop();

        if distance_to == 0 && steps_to_stop <= 1 {
            // At the target and slow enough to stop
            self.step_interval_us = 0;
            self.speed = 0.0;
            self.n = 0;
            return;
        }

        if distance_to > 0 {
            if self.n > 0 {
                // Accelerating: start decelerating if we would overshoot or
                // are heading the wrong way
                if steps_to_stop >= distance_to || self.direction == Direction::CounterClockwise {
                    self.n = -steps_to_stop;
                }
            } else if self.n < 0 {
                // Decelerating: accelerate again if there is room
                if steps_to_stop < distance_to && self.direction == Direction::Clockwise {
                    self.n = -self.n;
                }
            }
        } else if distance_to < 0 {
            if self.n > 0 {
                if steps_to_stop >= -distance_to || self.direction == Direction::Clockwise {
                    self.n = -steps_to_stop;
                }
            } else if self.n < 0 {
                if steps_to_stop < -distance_to && self.direction == Direction::CounterClockwise {
                    self.n = -self.n;
                }
            }
        }

        if self.n == 0 {
            // First step from standstill
            self.cn = self.c0.max(self.cmin);
            self.direction = if distance_to > 0 {
                Direction::Clockwise
            } else {
                Direction::CounterClockwise
            };
        } else {
            self.cn -= (2.0 * self.cn) / (4.0 * self.n as f32 + 1.0);
            self.cn = self.cn.max(self.cmin);
        }
        self.n += 1;
        self.step_interval_us = self.cn as u32;
        self.speed = 1_000_000.0 / self.cn;
        if self.direction == Direction::CounterClockwise {
            self.speed = -self.speed;
        }
    }

    /// Take one step if the step interval has elapsed.
    fn run_speed(&mut self, now_us: u64) -> Result<bool, Error> {
        if self.step_interval_us == 0 {
            return Ok(false);
        }
        if now_us.wrapping_sub(self.last_step_us) < u64::from(self.step_interval_us) {
            return Ok(false);
        }
        let next = match self.direction {
            Direction::Clockwise => self.current + 1,
            Direction::CounterClockwise => self.current - 1,
        };
        self.energize(next)?;
        self.current = next;
        self.last_step_us = now_us;
        Ok(true)
    }

    fn energize(&mut self, position: i32) -> Result<(), Error> {
        let pattern = FULL_STEP_SEQUENCE[(position & 0x3) as usize];
        set_pin(&mut self.coils.0, pattern[0])?;
        set_pin(&mut self.coils.1, pattern[1])?;
        set_pin(&mut self.coils.2, pattern[2])?;
        set_pin(&mut self.coils.3, pattern[3])
    }
}

impl<P1, P2, P3, P4> Actuator for Stepper<P1, P2, P3, P4>
where
    P1: OutputPin,
    P2: OutputPin,
    P3: OutputPin,
    P4: OutputPin,
{
    fn set_motion_params(&mut self, speed: f32, acceleration: f32) {
        self.set_max_speed(speed);
        self.set_acceleration(acceleration);
    }

    fn move_to(&mut self, target: i32) {
        if self.target != target {
            self.target = target;
            self.compute_new_speed();
        }
    }

    fn advance(&mut self, now_us: u64) -> Result<bool, Error> {
        let stepped = self.run_speed(now_us)?;
        if stepped {
            self.compute_new_speed();
        }
        Ok(stepped)
    }

    fn current_position(&self) -> i32 {
        self.current
    }
}

/// Step interval in µs for the first step from standstill.
fn initial_interval(acceleration: f32) -> f32 {
    // Equation 15 of D. Austin, "Generate stepper-motor speed profiles in
    // real time", with the 0.676 correction factor
    0.676 * sqrtf(2.0 / acceleration) * 1_000_000.0
}

fn positive_or_one(value: f32) -> f32 {
    if value > 0.0 && value.is_finite() {
        value
    } else {
        1.0
    }
}

fn set_pin<P: OutputPin>(pin: &mut P, high: bool) -> Result<(), Error> {
    let result = if high { pin.set_high() } else { pin.set_low() };
    result.map_err(|_| Error::MotorGpioWriteError)
}
