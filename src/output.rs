use std::io::{self, Write};

use serde::Serialize;

use crate::app::{
    DiagnosticEvent, DiagnosticLevel, DiagnosticSink, SectorCountReport, StarsResult,
};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

/// Forwards diagnostics to `tracing`, one field list per event.
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn event(&self, event: DiagnosticEvent) {
        let fields = format_fields(&event);
        match event.level {
            DiagnosticLevel::Debug => tracing::debug!(%fields, "{}", event.message),
            DiagnosticLevel::Info => tracing::info!(%fields, "{}", event.message),
            DiagnosticLevel::Warn => tracing::warn!(%fields, "{}", event.message),
        }
    }
}

fn format_fields(event: &DiagnosticEvent) -> String {
    let mut parts = event
        .fields
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>();
    if let Some(elapsed) = event.elapsed {
        parts.push(format!("latency_ms={}", elapsed.as_millis()));
    }
    parts.join(" ")
}

#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub rows: usize,
    pub columns: Vec<String>,
    pub path: Option<String>,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_stars(result: &StarsResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_table(summary: &TableSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    pub fn print_sector_count(report: &SectorCountReport) -> io::Result<()> {
        Self::print_json(report)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn fields_render_as_pairs() {
        let event = DiagnosticEvent::new(DiagnosticLevel::Info, "saved")
            .field("sector", 5)
            .field("rows", 2)
            .elapsed(Duration::from_millis(12));
        assert_eq!(format_fields(&event), "sector=5 rows=2 latency_ms=12");
    }
}
