//! Result reporting.
//!
//! Human-readable stdout lines, one per counter slot per core, plus an
//! optional JSON report for regression tracking.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::error::Error;
use crate::worker::CoreReport;

/// Write the per-slot metric lines for one core:
/// `CPU <id> done <ops> <op>s in <value> <unit>, <avg> <unit>/<op>`.
pub fn print_report(out: &mut impl Write, report: &CoreReport) -> io::Result<()> {
    let ops = report.ops().max(1);
    for delta in &report.deltas {
        writeln!(
            out,
            "CPU {} done {} {}s in {} {}, {} {}/{}",
            report.core,
            report.ops(),
            report.op,
            delta.value,
            delta.unit,
            delta.value / ops,
            delta.unit,
            report.op,
        )?;
    }
    Ok(())
}

/// Machine-readable run summary.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub version: &'static str,
    pub generated_at_unix: u64,
    pub workload: &'a str,
    pub rounds: u64,
    pub results: &'a [CoreReport],
}

impl<'a> JsonReport<'a> {
    pub fn new(workload: &'a str, rounds: u64, results: &'a [CoreReport]) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            generated_at_unix: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            workload,
            rounds,
            results,
        }
    }
}

pub fn write_json_report(path: &Path, report: &JsonReport) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::SlotDelta;

    fn sample_report() -> CoreReport {
        CoreReport {
            core: 3,
            rounds: 300_000,
            factor: 2,
            op: "IPC",
            deltas: vec![SlotDelta {
                unit: "cpu-cycles",
                value: 1_200_000,
            }],
        }
    }

    #[test]
    fn line_format_matches_contract() {
        let mut buf = Vec::new();
        print_report(&mut buf, &sample_report()).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "CPU 3 done 600000 IPCs in 1200000 cpu-cycles, 2 cpu-cycles/IPC\n"
        );
    }

    #[test]
    fn one_line_per_slot() {
        let mut report = sample_report();
        report.deltas.push(SlotDelta {
            unit: "ns",
            value: 400_000,
        });
        let mut buf = Vec::new();
        print_report(&mut buf, &report).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap().lines().count(), 2);
    }

    #[test]
    fn zero_round_report_does_not_divide_by_zero() {
        let mut report = sample_report();
        report.rounds = 0;
        let mut buf = Vec::new();
        print_report(&mut buf, &report).unwrap();
    }

    #[test]
    fn json_report_serializes() {
        let results = vec![sample_report()];
        let json =
            serde_json::to_string(&JsonReport::new("ipc", 300_000, &results)).unwrap();
        assert!(json.contains("\"results\""));
        assert!(json.contains("\"cpu-cycles\""));
    }
}
