//! Grepable rendering: one tab-delimited line per host.

use crate::error::OutputError;
use crate::storage::{AggregateReport, HostStatus, ScanResult};
use crate::types::PortEntry;
use csv::{QuoteStyle, WriterBuilder};

/// Render the report in grepable form.
pub fn render_grepable(report: &AggregateReport) -> Result<String, OutputError> {
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(QuoteStyle::Never)
        .flexible(true)
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record([format!(
        "# netranger {} scan of {} ({}) started {} as {}",
        env!("CARGO_PKG_VERSION"),
        report.range,
        report.id,
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        report.status
    )])?;

    for result in &report.results {
        writer.write_record(host_record(result))?;
    }

    writer.write_record([format!(
        "# Done: {} live hosts, {} scanned ({} up, {} failed)",
        report.live_hosts,
        report.completed(),
        report.succeeded(),
        report.failed()
    )])?;

    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    into_text(bytes)
}

fn into_text(bytes: Vec<u8>) -> Result<String, OutputError> {
    Ok(String::from_utf8(bytes)?)
}

fn host_record(result: &ScanResult) -> [String; 3] {
    let status = match result.status {
        HostStatus::Up => "Up",
        HostStatus::Timeout => "Timeout",
        HostStatus::Failed => "Failed",
    };
    let ports: Vec<String> = result.open_ports().map(port_field).collect();

    [
        format!("Host: {}", result.address()),
        format!("Status: {}", status),
        format!("Ports: {}", ports.join(", ")).trim_end().to_string(),
    ]
}

/// `<port>/<state>/<proto>//<service>//<version>/`
fn port_field(entry: &PortEntry) -> String {
    format!(
        "{}/{}/{}//{}//{}/",
        entry.port,
        entry.state,
        entry.protocol,
        sanitize(&entry.service),
        sanitize(&entry.version)
    )
}

/// Field separators inside engine text would break the line format.
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '/' => '|',
            ',' => ' ',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect()
}
