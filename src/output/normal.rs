//! Human-readable rendering.
//!
//! The same host block is used for the live stream and for the `.nmap` file,
//! so what scrolled past on the terminal is what ends up on disk.

use crate::storage::{AggregateReport, HostStatus, ScanResult};
use std::fmt::Write;

const RULE_WIDTH: usize = 60;

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

/// Render one host's result block.
///
/// Successful hosts get their port table (with script lines) and an
/// open-ports digest; failed hosts get a single failure line.
pub fn render_host_block(result: &ScanResult) -> String {
    let mut out = String::new();
    let addr = result.address();

    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "[+] RESULTS for {}", addr);
    let _ = writeln!(out, "{}", rule());

    match result.status {
        HostStatus::Up => {
            if result.ports.is_empty() {
                let _ = writeln!(out, "No ports reported");
            } else {
                out.push_str(&port_table(result));
            }
            let _ = writeln!(out);

            let open: Vec<String> = result.open_ports().map(|p| p.label()).collect();
            if open.is_empty() {
                let _ = writeln!(out, "[-] {} - No open ports", addr);
            } else {
                let _ = writeln!(out, "[+] {} - Open ports: {}", addr, open.join(", "));
            }
        }
        HostStatus::Timeout | HostStatus::Failed => {
            let reason = result.failure.as_deref().unwrap_or("no output");
            let _ = writeln!(out, "[-] {} - Scan {}: {}", addr, result.status, reason);
        }
    }

    out.push_str(&rule());
    out
}

fn port_table(result: &ScanResult) -> String {
    let rows: Vec<[String; 4]> = result
        .ports
        .iter()
        .map(|p| {
            [
                p.label(),
                p.state.to_string(),
                p.service.clone(),
                p.version.clone(),
            ]
        })
        .collect();

    let header = ["PORT", "STATE", "SERVICE", "VERSION"];
    let mut widths = header.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.len());
        }
    }

    let line = |cells: [&str; 4]| {
        format!(
            "{:<w0$}  {:<w1$}  {:<w2$}  {}",
            cells[0],
            cells[1],
            cells[2],
            cells[3],
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2],
        )
        .trim_end()
        .to_string()
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}", line(header));
    for (row, entry) in rows.iter().zip(&result.ports) {
        let _ = writeln!(out, "{}", line([&row[0], &row[1], &row[2], &row[3]]));
        for script in &entry.scripts {
            let _ = writeln!(out, "{}", script);
        }
    }
    out
}

/// Render the complete `.nmap` document.
///
/// Depends only on the report, never on the wall clock.
pub fn render_report(report: &AggregateReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# netranger {} scan report", env!("CARGO_PKG_VERSION"));
    let _ = writeln!(out, "# Range: {} ({} addresses)", report.range, report.range_hosts);
    let _ = writeln!(out, "# Scan ID: {}", report.id);
    let _ = writeln!(
        out,
        "# Started: {}",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "# Status: {}", report.status);
    let _ = writeln!(out);

    for result in &report.results {
        let _ = writeln!(out, "{}", render_host_block(result));
        let _ = writeln!(out);
    }

    let _ = writeln!(
        out,
        "# Done: {} live hosts, {} scanned ({} up, {} failed)",
        report.live_hosts,
        report.completed(),
        report.succeeded(),
        report.failed()
    );
    out
}
