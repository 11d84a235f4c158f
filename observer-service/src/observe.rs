//! Follows the Teleplot output of an iris attached over serial.

use std::{
    io::{BufRead, BufReader, ErrorKind},
    thread,
    time::Duration,
};

use anyhow::Context;
use iris_firmware::telemetry::TelemetrySink;
use tracing::{debug, info, warn};

use crate::{
    config::Serial,
    teleplot::{parse_line, SnapshotAssembler},
};

/// Delay before reading again after an I/O error
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

pub type SerialReader = BufReader<Box<dyn serialport::SerialPort>>;

/// Connect to the serial device.
pub fn open(serial: &Serial) -> anyhow::Result<SerialReader> {
    let port_name = serial
        .port
        .to_str()
        .context(format!("Serial port path {:?} is not valid UTF-8", serial.port))?;
    let raw_port = serialport::new(port_name, serial.baudrate)
        .timeout(Duration::from_secs(30))
        .open()
        .context(format!("Failed to open serial port at {:?}", serial.port))?;
    info!("Reading telemetry from {:?}", serial.port);
    Ok(BufReader::new(raw_port))
}

/// Read lines until the reader is exhausted and publish every complete
/// snapshot. Returns the number of published snapshots.
///
/// A serial port never reaches EOF, so with a real device this runs forever.
pub fn process_lines<R: BufRead, T: TelemetrySink>(reader: R, sink: &mut T) -> usize {
    process_lines_with_backoff(reader, sink, ERROR_BACKOFF)
}

/// [`process_lines`] with the delay after read errors other than timeouts.
fn process_lines_with_backoff<R: BufRead, T: TelemetrySink>(
    mut reader: R,
    sink: &mut T,
    backoff: Duration,
) -> usize {
    let mut assembler = SnapshotAssembler::default();
    let mut line_buffer = String::new();
    let mut published = 0;
    loop {
        line_buffer.clear();
        match reader.read_line(&mut line_buffer) {
            Ok(0) => return published,
            Ok(_size) => {}
            Err(e) if e.kind() == ErrorKind::TimedOut => continue,
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                warn!("Skipping line that is not valid UTF-8");
                continue;
            }
            Err(e) => {
                warn!("Error while reading: {}", e);
                thread::sleep(backoff);
                continue;
            }
        }

        let line = line_buffer.trim();
        let Some(parsed) = parse_line(line) else {
            if !line.is_empty() {
                debug!("Ignoring line: {}", line);
            }
            continue;
        };
        if let Some(snapshot) = assembler.push(parsed) {
            match sink.publish(&snapshot) {
                Ok(()) => published += 1,
                Err(e) => warn!("Failed to publish snapshot: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        io::{self, Cursor, Read},
    };

    use iris_firmware::telemetry::SnapshotCell;

    use super::*;

    #[test]
    fn test_process_lines() {
        let input = "\
Iris controller started
>lux:100.00
>smoothedLux:90.00
>luxChange:20.00
>adjustedSpeed:200.60
>adjustedAcceleration:100.30
>targetPosition:512
>currentPosition:17

>lux:110.00
>smoothedLux:100.00
>luxChange:10.00
>adjustedSpeed:200.30
>adjustedAcceleration:100.15
>targetPosition:512
>currentPosition:30
";
        let mut sink = SnapshotCell::new();
        let count = process_lines(Cursor::new(input), &mut sink);
        assert_eq!(count, 2);
        let latest = sink.latest().unwrap();
        assert_eq!(latest.lux, 110.0);
        assert_eq!(latest.current_position, 30);
    }

    #[test]
    fn test_invalid_utf8_is_skipped() {
        let mut input = b">lux:1.00\n".to_vec();
        input.extend_from_slice(&[0xff, 0xfe, b'\n']);
        input.extend_from_slice(b">currentPosition:5\n");
        let mut sink = SnapshotCell::new();
        let count = process_lines(Cursor::new(input), &mut sink);
        assert_eq!(count, 1);
        assert_eq!(sink.latest().unwrap().current_position, 5);
        assert_eq!(sink.latest().unwrap().lux, 1.0);
    }

    /// Serial port replaying a script of chunks and read errors
    struct ScriptedPort(VecDeque<Result<&'static [u8], ErrorKind>>);

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.pop_front() {
                None => Ok(0),
                Some(Err(kind)) => Err(io::Error::from(kind)),
                Some(Ok(chunk)) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    Ok(n)
                }
            }
        }
    }

    const FRAME: &[u8] = b">lux:42.00\n>targetPosition:300\n>currentPosition:12\n";

    #[test]
    fn test_timeout_is_retried() {
        let port = ScriptedPort(VecDeque::from(vec![
            Err(ErrorKind::TimedOut),
            Err(ErrorKind::TimedOut),
            Ok(FRAME),
        ]));
        let mut sink = SnapshotCell::new();
        let count = process_lines(BufReader::new(port), &mut sink);
        assert_eq!(count, 1);
        let latest = sink.latest().unwrap();
        assert_eq!(latest.lux, 42.0);
        assert_eq!(latest.target_position, 300);
        assert_eq!(latest.current_position, 12);
    }

    #[test]
    fn test_read_error_is_retried() {
        let port = ScriptedPort(VecDeque::from(vec![
            Err(ErrorKind::BrokenPipe),
            Ok(FRAME),
            Err(ErrorKind::Other),
            Ok(FRAME),
        ]));
        let mut sink = SnapshotCell::new();
        let count =
            process_lines_with_backoff(BufReader::new(port), &mut sink, Duration::from_millis(1));
        assert_eq!(count, 2);
        assert_eq!(sink.published(), 2);
        assert_eq!(sink.latest().unwrap().current_position, 12);
    }

    #[test]
    fn test_empty_input() {
        let mut sink = SnapshotCell::new();
        assert_eq!(process_lines(Cursor::new(""), &mut sink), 0);
        assert!(sink.latest().is_none());
    }
}
