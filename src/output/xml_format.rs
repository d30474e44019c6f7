//! Structured XML rendering.
//!
//! Carries every field of every result, including script annotations and the
//! raw engine output, so nothing seen during the run is lost.

use crate::error::OutputError;
use crate::storage::{AggregateReport, ScanResult};
use crate::types::PortEntry;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

type XmlWriter = Writer<Vec<u8>>;

fn emit(writer: &mut XmlWriter, event: Event<'_>) -> Result<(), OutputError> {
    writer
        .write_event(event)
        .map_err(|e| OutputError::Xml(e.to_string()))
}

fn text_element(writer: &mut XmlWriter, name: &str, text: &str) -> Result<(), OutputError> {
    emit(writer, Event::Start(BytesStart::new(name)))?;
    emit(writer, Event::Text(BytesText::new(text)))?;
    emit(writer, Event::End(BytesEnd::new(name)))
}

/// Render the report as an XML document.
pub fn render_xml(report: &AggregateReport) -> Result<String, OutputError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let started = report.started_at.to_rfc3339();
    let range_hosts = report.range_hosts.to_string();
    let id = report.id.to_string();
    let status = report.status.to_string();
    let mut root = BytesStart::new("scanrun");
    root.push_attribute(("scanner", "netranger"));
    root.push_attribute(("version", env!("CARGO_PKG_VERSION")));
    root.push_attribute(("id", id.as_str()));
    root.push_attribute(("range", report.range.as_str()));
    root.push_attribute(("range_hosts", range_hosts.as_str()));
    root.push_attribute(("start", started.as_str()));
    root.push_attribute(("status", status.as_str()));
    emit(&mut writer, Event::Start(root))?;

    let live = report.live_hosts.to_string();
    let completed = report.completed().to_string();
    let up = report.succeeded().to_string();
    let failed = report.failed().to_string();
    let mut summary = BytesStart::new("summary");
    summary.push_attribute(("live", live.as_str()));
    summary.push_attribute(("scanned", completed.as_str()));
    summary.push_attribute(("up", up.as_str()));
    summary.push_attribute(("failed", failed.as_str()));
    emit(&mut writer, Event::Empty(summary))?;

    for result in &report.results {
        write_host(&mut writer, result)?;
    }

    emit(&mut writer, Event::End(BytesEnd::new("scanrun")))?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    String::from_utf8(bytes).map_err(|e| OutputError::Xml(e.to_string()))
}

fn write_host(writer: &mut XmlWriter, result: &ScanResult) -> Result<(), OutputError> {
    let address = result.address().to_string();
    let sequence = result.sequence.to_string();
    let status = result.status.to_string();
    let discovered = result.host.discovered_at.to_rfc3339();
    let completed = result.completed_at.to_rfc3339();
    let elapsed = result.elapsed_ms.to_string();

    let mut host = BytesStart::new("host");
    host.push_attribute(("address", address.as_str()));
    host.push_attribute(("sequence", sequence.as_str()));
    host.push_attribute(("status", status.as_str()));
    host.push_attribute(("discovered", discovered.as_str()));
    host.push_attribute(("completed", completed.as_str()));
    host.push_attribute(("elapsed_ms", elapsed.as_str()));
    emit(writer, Event::Start(host))?;

    if let Some(reason) = &result.failure {
        text_element(writer, "failure", reason)?;
    }

    emit(writer, Event::Start(BytesStart::new("ports")))?;
    for entry in &result.ports {
        write_port(writer, entry)?;
    }
    emit(writer, Event::End(BytesEnd::new("ports")))?;

    if !result.raw_output.is_empty() {
        text_element(writer, "output", &result.raw_output)?;
    }

    emit(writer, Event::End(BytesEnd::new("host")))
}

fn write_port(writer: &mut XmlWriter, entry: &PortEntry) -> Result<(), OutputError> {
    let portid = entry.port.to_string();
    let protocol = entry.protocol.to_string();
    let state = entry.state.to_string();

    let mut port = BytesStart::new("port");
    port.push_attribute(("protocol", protocol.as_str()));
    port.push_attribute(("portid", portid.as_str()));
    port.push_attribute(("state", state.as_str()));
    port.push_attribute(("service", entry.service.as_str()));
    if !entry.version.is_empty() {
        port.push_attribute(("version", entry.version.as_str()));
    }

    if entry.scripts.is_empty() {
        return emit(writer, Event::Empty(port));
    }

    emit(writer, Event::Start(port))?;
    for line in &entry.scripts {
        text_element(writer, "script", line)?;
    }
    emit(writer, Event::End(BytesEnd::new("port")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InvokeError;
    use crate::scanner::EngineOutput;
    use crate::storage::ReportStatus;
    use crate::types::{HostTarget, ScanRange};
    use std::net::Ipv4Addr;
    use std::time::Duration;

    fn report() -> AggregateReport {
        let range = ScanRange::parse("192.168.1.0/24").unwrap();
        let mut report = AggregateReport::new(&range).with_live_hosts(2);

        let output = EngineOutput::new(
            "PORT   STATE SERVICE VERSION\n80/tcp open  http    Apache <2.4>\n|_http-title: A & B\n",
        );
        report.results.push(ScanResult::success(
            HostTarget::assumed(Ipv4Addr::new(192, 168, 1, 10)),
            1,
            output,
            Duration::from_secs(4),
        ));
        report.results.push(ScanResult::failure(
            HostTarget::assumed(Ipv4Addr::new(192, 168, 1, 11)),
            2,
            &InvokeError::Timeout(Duration::from_secs(900)),
            Duration::from_secs(900),
        ));
        report.status = ReportStatus::Completed;
        report
    }

    #[test]
    fn test_xml_document_shape() {
        let xml = render_xml(&report()).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("range=\"192.168.1.0/24\""));
        assert!(xml.contains("status=\"completed\""));
        assert!(xml.contains("<summary live=\"2\" scanned=\"2\" up=\"1\" failed=\"1\"/>"));
        assert!(xml.contains("address=\"192.168.1.10\""));
        assert!(xml.contains("portid=\"80\""));
        assert!(xml.contains("<failure>timed out after 900s</failure>"));
        assert!(xml.trim_end().ends_with("</scanrun>"));
    }

    #[test]
    fn test_xml_escapes_engine_text() {
        let xml = render_xml(&report()).unwrap();

        assert!(xml.contains("version=\"Apache &lt;2.4&gt;\""));
        assert!(xml.contains("<script>|_http-title: A &amp; B</script>"));
        assert!(!xml.contains("A & B"));
    }

    #[test]
    fn test_xml_is_deterministic() {
        let report = report();
        assert_eq!(render_xml(&report).unwrap(), render_xml(&report).unwrap());
    }
}
