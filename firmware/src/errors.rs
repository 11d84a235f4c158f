//! Error handling.

use heapless::spsc::Queue;

/// All possible error types
#[derive(Debug, PartialEq, Copy, Clone)]
pub enum Error {
    SensorReadFailed,
    MotorGpioWriteError,
    TelemetryWriteFailed,
    InvalidConfig(ConfigError),
}

/// Configuration constraint violated by an [`IrisConfig`](crate::config::IrisConfig)
#[derive(Debug, PartialEq, Copy, Clone)]
pub enum ConfigError {
    CloseThresholdNotPositive,
    ThresholdsInverted,
    AlphaOutOfRange,
    HysteresisInverted,
    SpeedRange,
    AccelerationRange,
    PositionRange,
    TravelExceedsRevolution,
    ZeroSampleInterval,
}

impl Error {
    /// Push the error into a bounded queue, dropping the oldest entry if the
    /// queue is full.
    pub fn log<const N: usize>(&self, queue: &mut Queue<Self, N>) {
        match queue.enqueue(*self) {
            Ok(()) => { /* Enqueued */ }
            Err(e) => {
                // Queue full, drop the oldest value and try again
                queue.dequeue();
                queue.enqueue(e).ok();
            }
        }
    }

    pub fn to_bytes(&self) -> &'static [u8] {
        match self {
            Self::SensorReadFailed => b"Light sensor: Reading illuminance failed",
            Self::MotorGpioWriteError => b"Motor GPIO write error",
            Self::TelemetryWriteFailed => b"Writing telemetry failed",
            Self::InvalidConfig(e) => e.to_bytes(),
        }
    }
}

impl ConfigError {
    pub fn to_bytes(&self) -> &'static [u8] {
        match self {
            Self::CloseThresholdNotPositive => b"Config: Close threshold must be positive",
            Self::ThresholdsInverted => b"Config: Open threshold must exceed close threshold",
            Self::AlphaOutOfRange => b"Config: Alpha range must lie within (0, 1]",
            Self::HysteresisInverted => b"Config: Hysteresis range inverted",
            Self::SpeedRange => b"Config: Invalid speed range",
            Self::AccelerationRange => b"Config: Invalid acceleration range",
            Self::PositionRange => b"Config: Open position must exceed closed position",
            Self::TravelExceedsRevolution => b"Config: Iris travel exceeds one revolution",
            Self::ZeroSampleInterval => b"Config: Sample interval must not be zero",
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::InvalidConfig(e)
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // All messages are ASCII literals
        f.write_str(core::str::from_utf8(self.to_bytes()).unwrap_or("Unknown error"))
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&Error::InvalidConfig(*self), f)
    }
}
