//! JSON-lines telemetry sink.

use chrono::{DateTime, Utc};
use intercept_core::{TelemetrySink, TickRecord};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[derive(Serialize)]
struct Line<'a> {
    stamp: DateTime<Utc>,
    record: &'a TickRecord,
}

/// Writes one JSON object per tick. Write errors are logged once and counted.
pub struct JsonLinesTelemetry<W: Write> {
    writer: W,
    failed_writes: u64,
}

impl JsonLinesTelemetry<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path.as_ref())?;
        tracing::info!(path = %path.as_ref().display(), "writing telemetry");
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> JsonLinesTelemetry<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            failed_writes: 0,
        }
    }

    pub fn failed_writes(&self) -> u64 {
        self.failed_writes
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, record: &TickRecord) -> io::Result<()> {
        let line = Line {
            stamp: Utc::now(),
            record,
        };
        serde_json::to_writer(&mut self.writer, &line)?;
        self.writer.write_all(b"\n")
    }
}

impl<W: Write> TelemetrySink for JsonLinesTelemetry<W> {
    fn publish(&mut self, record: &TickRecord) {
        if let Err(err) = self.write_line(record) {
            if self.failed_writes == 0 {
                tracing::warn!(error = %err, "telemetry write failed");
            }
            self.failed_writes += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intercept_core::Point3;

    fn record(tick: u64) -> TickRecord {
        TickRecord {
            tick,
            time_s: tick as f64 * 0.05,
            balloon: Point3::new(1.0, 2.0, 3.0),
            balloon_exists: true,
            drones: vec![],
        }
    }

    #[test]
    fn one_json_object_per_line() {
        let mut sink = JsonLinesTelemetry::new(Vec::new());
        sink.publish(&record(1));
        sink.publish(&record(2));
        let text = String::from_utf8(sink.into_inner()).unwrap();

        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["record"]["tick"], 2);
        assert_eq!(lines[0]["record"]["balloon"]["z"], 3.0);
        assert!(lines[0]["stamp"].is_string());
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_errors_are_counted_not_raised() {
        let mut sink = JsonLinesTelemetry::new(Broken);
        sink.publish(&record(1));
        sink.publish(&record(2));
        assert_eq!(sink.failed_writes(), 2);
    }
}
