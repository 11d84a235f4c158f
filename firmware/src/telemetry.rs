//! Telemetry output.
//!
//! Every completed control tick produces a [`Snapshot`]. Where it goes is up
//! to the [`TelemetrySink`] the controller was built with: nowhere, a
//! Teleplot text stream on a serial port, or a cache read out of band.

use ufmt::{uDisplay, uWrite, uwrite, Formatter};

use crate::errors::Error;

/// State of the control loop after one tick
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Snapshot {
    /// Raw sensor reading
    pub lux: f32,
    /// Smoothed lux value
    pub smoothed_lux: f32,
    /// Change between the reading and the previous smoothed value
    pub lux_change: f32,
    /// Motor speed applied for this tick
    pub adjusted_speed: f32,
    /// Motor acceleration applied for this tick
    pub adjusted_acceleration: f32,
    /// Commanded iris position
    pub target_position: i32,
    /// Position of the motor when the tick ran
    pub current_position: i32,
}

/// Teleplot names of the snapshot fields, in the order they are written
pub const FIELD_NAMES: [&str; 7] = [
    "lux",
    "smoothedLux",
    "luxChange",
    "adjustedSpeed",
    "adjustedAcceleration",
    "targetPosition",
    "currentPosition",
];

/// Receiver of snapshots.
pub trait TelemetrySink {
    fn publish(&mut self, snapshot: &Snapshot) -> Result<(), Error>;
}

/// Sink for builds without telemetry
pub struct NoTelemetry;

impl TelemetrySink for NoTelemetry {
    fn publish(&mut self, _snapshot: &Snapshot) -> Result<(), Error> {
        Ok(())
    }
}

/// Keeps the most recent snapshot, for readers outside the control loop.
#[derive(Debug, Default)]
pub struct SnapshotCell {
    latest: Option<Snapshot>,
    published: u32,
}

impl SnapshotCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<Snapshot> {
        self.latest
    }

    /// Number of snapshots published so far
    pub fn published(&self) -> u32 {
        self.published
    }
}

impl TelemetrySink for SnapshotCell {
    fn publish(&mut self, snapshot: &Snapshot) -> Result<(), Error> {
        self.latest = Some(*snapshot);
        self.published = self.published.wrapping_add(1);
        Ok(())
    }
}

/// Writes snapshots as Teleplot lines (`>name:value\n`), one per field.
pub struct TeleplotWriter<W> {
    writer: W,
}

impl<W: uWrite> TeleplotWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn writer(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_all(&mut self, s: &Snapshot) -> Result<(), W::Error> {
        let w = &mut self.writer;
        uwrite!(w, ">{}:{}\n", FIELD_NAMES[0], Fixed2(s.lux))?;
        uwrite!(w, ">{}:{}\n", FIELD_NAMES[1], Fixed2(s.smoothed_lux))?;
        uwrite!(w, ">{}:{}\n", FIELD_NAMES[2], Fixed2(s.lux_change))?;
        uwrite!(w, ">{}:{}\n", FIELD_NAMES[3], Fixed2(s.adjusted_speed))?;
        uwrite!(w, ">{}:{}\n", FIELD_NAMES[4], Fixed2(s.adjusted_acceleration))?;
        uwrite!(w, ">{}:{}\n", FIELD_NAMES[5], s.target_position)?;
        uwrite!(w, ">{}:{}\n", FIELD_NAMES[6], s.current_position)
    }
}

impl<W: uWrite> TelemetrySink for TeleplotWriter<W> {
    fn publish(&mut self, snapshot: &Snapshot) -> Result<(), Error> {
        self.write_all(snapshot)
            .map_err(|_| Error::TelemetryWriteFailed)
    }
}

/// Float formatted with two decimals, for `ufmt` which has no float support.
pub struct Fixed2(pub f32);

impl uDisplay for Fixed2 {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        let value = self.0;
        if value.is_nan() {
            return f.write_str("nan");
        }
        if value.is_infinite() {
            return f.write_str(if value > 0.0 { "inf" } else { "-inf" });
        }
        // Saturates above ~42 million, far beyond any lux reading
        let scaled = libm::roundf(libm::fabsf(value) * 100.0) as u32;
        if value < 0.0 && scaled != 0 {
            f.write_str("-")?;
        }
        uwrite!(f, "{}.", scaled / 100)?;
        let frac = scaled % 100;
        if frac < 10 {
            f.write_str("0")?;
        }
        uwrite!(f, "{}", frac)
    }
}
