//! Parsers for the engine's human-readable output.
//!
//! Both parsers are lenient: lines they do not understand are skipped, and
//! garbage input yields an empty result rather than an error.

use crate::types::{Port, PortEntry, PortError, PortState, Protocol};
use std::net::Ipv4Addr;
use tracing::debug;

const REPORT_MARKER: &str = "Nmap scan report for";
const HOST_TIMEOUT_MARKER: &str = "due to host timeout";
const HOST_DOWN_MARKER: &str = "Host seems down";
const DONE_MARKER: &str = "Nmap done:";

/// What a detailed scan that exited cleanly says about its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostVerdict {
    /// The host answered and its ports were enumerated.
    Scanned,
    /// The engine's own `--host-timeout` fired and the host was skipped.
    HostTimeout,
    /// The host never answered.
    Down,
}

/// Classify the output of a detailed scan.
///
/// nmap exits 0 when it skips a host on its own host timeout and when the
/// host is down, so the exit status alone cannot tell these from a scan.
pub fn detailed_verdict(output: &str) -> HostVerdict {
    let mut verdict = HostVerdict::Scanned;
    for line in output.lines().map(str::trim) {
        if line.contains(HOST_TIMEOUT_MARKER) {
            return HostVerdict::HostTimeout;
        }
        let none_up = line.starts_with(DONE_MARKER) && line.contains("(0 hosts up)");
        if none_up || line.contains(HOST_DOWN_MARKER) {
            verdict = HostVerdict::Down;
        }
    }
    verdict
}

/// Extract the addresses reported up by a discovery sweep, in output order.
///
/// Accepts both `Nmap scan report for 10.0.0.5` and
/// `Nmap scan report for host.lan (10.0.0.5)`.
pub fn parse_discovery(output: &str) -> Vec<Ipv4Addr> {
    output
        .lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix(REPORT_MARKER)?;
            let candidate = rest
                .split_whitespace()
                .last()?
                .trim_start_matches('(')
                .trim_end_matches(')');
            candidate.parse::<Ipv4Addr>().ok()
        })
        .collect()
}

/// Parse the port table of a detailed scan.
///
/// The table starts at the `PORT STATE SERVICE [VERSION]` header. Each row is
/// `<port>/<proto> <state> <service> [version...]`; lines starting with `|`
/// are script output for the preceding row. Any other non-empty line ends the
/// table.
pub fn parse_port_table(output: &str) -> Vec<PortEntry> {
    let mut entries: Vec<PortEntry> = Vec::new();
    let mut in_table = false;

    for line in output.lines() {
        if !in_table {
            if line.starts_with("PORT") && line.contains("STATE") {
                in_table = true;
            }
            continue;
        }

        if line.trim().is_empty() {
            continue;
        }

        if line.starts_with('|') {
            if let Some(last) = entries.last_mut() {
                last.scripts.push(line.to_string());
            }
            continue;
        }

        match parse_port_row(line) {
            Some(entry) => entries.push(entry),
            None => {
                in_table = false;
            }
        }
    }

    entries
}

fn parse_port_row(line: &str) -> Option<PortEntry> {
    let mut parts = line.split_whitespace();
    let (port, protocol) = parts.next()?.split_once('/')?;
    let port = match parse_port_number(port) {
        Ok(port) => port,
        Err(e) => {
            debug!(line, error = %e, "skipping port row");
            return None;
        }
    };
    let protocol: Protocol = protocol.parse().ok()?;

    let state = parts.next()?;
    let state: PortState = match state.parse() {
        Ok(state) => state,
        Err(e) => {
            debug!(line, error = %e, "skipping port row");
            return None;
        }
    };

    let service = parts.next().unwrap_or_default();
    let version = parts.collect::<Vec<_>>().join(" ");

    Some(PortEntry::new(port, protocol, state, service).with_version(version))
}

fn parse_port_number(text: &str) -> Result<Port, PortError> {
    let number: u16 = text
        .parse()
        .map_err(|_| PortError::InvalidFormat(text.to_string()))?;
    Port::try_from(number)
}
