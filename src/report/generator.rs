//! Rendering of enriched signals.
//!
//! Signals go out either as JSON lines for downstream tools or as a compact
//! text line for an operator watching a terminal.

use crate::cli::OutputFormat;
use crate::models::{AccelValue, LastReading, MagnitudeStats, Signal, Units};
use anyhow::Result;
use std::io::Write;

/// Serialize a signal as a single JSON line.
pub fn generate_json_line(signal: &Signal) -> Result<String> {
    serde_json::to_string(signal).map_err(Into::into)
}

/// Compact text rendering of the accelerometer field of a signal.
pub fn generate_text_line(signal: &Signal, field: &str, units: Units) -> String {
    let mut line = String::new();

    if let Some(seq) = signal.get("seq") {
        line.push_str(&format!("#{} ", seq));
    }
    if let Some(ts) = signal.get("timestamp").and_then(|v| v.as_str()) {
        line.push_str(ts);
        line.push(' ');
    }

    let value = signal
        .get(field)
        .cloned()
        .and_then(|v| serde_json::from_value::<AccelValue>(v).ok());

    match value {
        Some(AccelValue::Stats(stats)) => line.push_str(&stats_text(&stats, units)),
        Some(AccelValue::Last(last)) => line.push_str(&last_text(&last, units)),
        None => line.push_str(&format!("<no {} value>", field)),
    }

    line
}

fn stats_text(stats: &MagnitudeStats, units: Units) -> String {
    let stdev = match stats.stdev {
        Some(s) => format!("{:.4}", s),
        None => "n/a".to_string(),
    };

    format!(
        "n={} mean={:.4} stdev={} max={:.4} min={:.4} |a|={:.4} {} last={}",
        stats.count,
        stats.mean,
        stdev,
        stats.max_magnitude,
        stats.min_magnitude,
        stats.last_magnitude,
        units,
        stats.last
    )
}

fn last_text(last: &LastReading, units: Units) -> String {
    format!("|a|={:.4} {} last={}", last.last_magnitude, units, last.last)
}

/// Write one signal in the requested format, newline-terminated.
pub fn write_signal(
    out: &mut impl Write,
    signal: &Signal,
    format: OutputFormat,
    field: &str,
    units: Units,
) -> Result<()> {
    let line = match format {
        OutputFormat::Json => generate_json_line(signal)?,
        OutputFormat::Text => generate_text_line(signal, field, units),
    };

    writeln!(out, "{}", line)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::summarize;
    use crate::models::Reading;

    fn stats_signal() -> Signal {
        let stats = summarize(&[Reading::new(3.0, 4.0, 0.0), Reading::new(0.0, 0.0, 1.0)]).unwrap();
        let mut signal = Signal::new()
            .with("seq", 7)
            .with("timestamp", "2026-01-01T00:00:00Z");
        signal.enrich("accel", &AccelValue::Stats(stats)).unwrap();
        signal
    }

    #[test]
    fn test_generate_json_line() {
        let line = generate_json_line(&stats_signal()).unwrap();
        assert!(!line.contains('\n'));

        let back: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(back["seq"], 7);
        assert_eq!(back["accel"]["count"], 2);
        assert_eq!(back["accel"]["max_magnitude"], 5.0);
    }

    #[test]
    fn test_generate_text_line_stats() {
        let line = generate_text_line(&stats_signal(), "accel", Units::G);
        assert!(line.starts_with("#7 2026-01-01T00:00:00Z "));
        assert!(line.contains("n=2"));
        assert!(line.contains("mean=3.0000"));
        assert!(line.contains("max=5.0000"));
        assert!(line.contains("last=(0.0000, 0.0000, 1.0000)"));
    }

    #[test]
    fn test_generate_text_line_single_sample() {
        let stats = summarize(&[Reading::new(1.0, 0.0, 0.0)]).unwrap();
        let mut signal = Signal::new();
        signal.enrich("accel", &AccelValue::Stats(stats)).unwrap();

        let line = generate_text_line(&signal, "accel", Units::G);
        assert!(line.contains("stdev=n/a"));
    }

    #[test]
    fn test_generate_text_line_last() {
        let mut signal = Signal::new();
        let last = LastReading::from_reading(Reading::new(0.0, 0.0, 9.81));
        signal.enrich("accel", &AccelValue::Last(last)).unwrap();

        let line = generate_text_line(&signal, "accel", Units::Ms2);
        assert!(line.starts_with("|a|=9.8100 m/s²"));
    }

    #[test]
    fn test_missing_field() {
        let line = generate_text_line(&Signal::new(), "accel", Units::G);
        assert_eq!(line, "<no accel value>");
    }

    #[test]
    fn test_write_signal() {
        let mut out = Vec::new();
        write_signal(&mut out, &stats_signal(), OutputFormat::Json, "accel", Units::G).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with('\n'));
        assert_eq!(text.lines().count(), 1);
    }
}
