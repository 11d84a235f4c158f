//! Helpers for using the serial port.

use embedded_hal::serial;

use crate::errors::Error;

/// Wrapper for a serial port that supports ufmt
///
/// Writes block until every byte was accepted by the UART.
pub struct SerialWriter<'a, S>(pub &'a mut S);

impl<'a, S> ufmt::uWrite for SerialWriter<'a, S>
where
    S: serial::Write<u8>,
{
    type Error = Error;
    fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
        for byte in s.bytes() {
            nb::block!(self.0.write(byte)).map_err(|_| Error::TelemetryWriteFailed)?;
        }
        Ok(())
    }
}

/// Owning variant of [`SerialWriter`], for handing the port to a
/// [`TeleplotWriter`](crate::telemetry::TeleplotWriter).
pub struct OwnedSerialWriter<S>(pub S);

impl<S> ufmt::uWrite for OwnedSerialWriter<S>
where
    S: serial::Write<u8>,
{
    type Error = Error;
    fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
        SerialWriter(&mut self.0).write_str(s)
    }
}
