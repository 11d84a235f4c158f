//! Ambient light sensor access.

use embedded_hal::blocking::i2c;
use veml6030::Veml6030;

/// Something that reports the ambient illuminance in lux.
pub trait IlluminanceSource {
    type Error: core::fmt::Debug;

    fn read_illuminance(&mut self) -> Result<f32, Self::Error>;
}

/// VEML6030 / VEML7700 ambient light sensor on an I²C bus.
///
/// The sensor must be configured (gain, integration time) and enabled before
/// it is handed to the controller.
impl<I2C, E> IlluminanceSource for Veml6030<I2C>
where
    I2C: i2c::Write<Error = E> + i2c::WriteRead<Error = E>,
    E: core::fmt::Debug,
{
    type Error = veml6030::Error<E>;

    fn read_illuminance(&mut self) -> Result<f32, Self::Error> {
        self.read_lux()
    }
}

/// Adapter for a closure returning `None` when no reading is available.
pub struct FnSource<F>(pub F);

/// The closure had no reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoReading;

impl<F> IlluminanceSource for FnSource<F>
where
    F: FnMut() -> Option<f32>,
{
    type Error = NoReading;

    fn read_illuminance(&mut self) -> Result<f32, Self::Error> {
        (self.0)().ok_or(NoReading)
    }
}
