//! Parsing of the Teleplot lines printed by the firmware.
//!
//! The firmware prints one `>name:value` line per snapshot field. Lines are
//! collected into a [`Snapshot`] until the frame is complete.

use iris_firmware::Snapshot;
use lazy_static::lazy_static;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Lux,
    SmoothedLux,
    LuxChange,
    AdjustedSpeed,
    AdjustedAcceleration,
    TargetPosition,
    CurrentPosition,
}

impl Field {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "lux" => Self::Lux,
            "smoothedLux" => Self::SmoothedLux,
            "luxChange" => Self::LuxChange,
            "adjustedSpeed" => Self::AdjustedSpeed,
            "adjustedAcceleration" => Self::AdjustedAcceleration,
            "targetPosition" => Self::TargetPosition,
            "currentPosition" => Self::CurrentPosition,
            _ => return None,
        })
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryLine {
    pub field: Field,
    pub value: f64,
}

/// Parse a Teleplot line. Returns `None` for anything that isn't a known
/// telemetry field (log output, partial lines, ...).
pub fn parse_line(line: &str) -> Option<TelemetryLine> {
    // Patterns
    lazy_static! {
        static ref TELEPLOT_RE: Regex =
            Regex::new(r"^>(?P<name>[a-zA-Z]+):(?P<value>[-+0-9.eE]+|nan|-?inf)(?:\|.*)?$").unwrap();
    }

    let capture = TELEPLOT_RE.captures(line)?;
    let field = Field::from_name(&capture["name"])?;
    let value = capture["value"].parse().ok()?;
    Some(TelemetryLine { field, value })
}

/// Collects telemetry lines into snapshots.
///
/// A frame ends with `currentPosition`, the last field the firmware prints.
/// If a field shows up twice before that, the previous frame is emitted as
/// is, so that firmware printing only a subset of the fields still produces
/// snapshots. Fields missing from a frame keep their previous value.
#[derive(Debug, Default)]
pub struct SnapshotAssembler {
    current: Snapshot,
    seen: u8,
}

impl SnapshotAssembler {
    pub fn push(&mut self, line: TelemetryLine) -> Option<Snapshot> {
        let mut finished = None;
        if self.seen & line.field.bit() != 0 {
            finished = Some(self.current);
            self.seen = 0;
        }

        self.set(line);
        self.seen |= line.field.bit();

        if line.field == Field::CurrentPosition {
            self.seen = 0;
            return Some(self.current);
        }
        finished
    }

    fn set(&mut self, line: TelemetryLine) {
        let s = &mut self.current;
        let float = line.value as f32;
        let int = line.value as i32;
        match line.field {
            Field::Lux => s.lux = float,
            Field::SmoothedLux => s.smoothed_lux = float,
            Field::LuxChange => s.lux_change = float,
            Field::AdjustedSpeed => s.adjusted_speed = float,
            Field::AdjustedAcceleration => s.adjusted_acceleration = float,
            Field::TargetPosition => s.target_position = int,
            Field::CurrentPosition => s.current_position = int,
        }
    }
}
