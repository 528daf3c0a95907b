//! Terminal output.
//!
//! Prints a colored summary of an [`AnalysisReport`]. All labels come from the
//! topology; nothing is classified again here.

use crate::models::{
    AttachmentNode, DxConnectionNode, DxVifNode, Finding, LinkHealth, Severity, Topology, Visibility,
    VpnNode,
};
use crate::report::AnalysisReport;
use colored::{ColoredString, Colorize};
use itertools::Itertools;

/// Format a value as a quoted, right-aligned field.
///
/// # Arguments
/// * `value` - The value to format
/// * `width` - The minimum width of the field
///
/// # Returns
/// A quoted, right-aligned string
pub fn format_field<T: ToString>(value: T, width: usize) -> String {
    let value_str = value.to_string();
    let quoted = format!("\"{value_str}\"");
    let quoted_len = quoted.len();

    if quoted_len >= width {
        quoted
    } else {
        format!("{quoted:>width$}")
    }
}

/// Print the report summary to stdout.
///
/// # Arguments
/// * `report` - The analysis result
/// * `max_findings` - Findings beyond this many are counted but not listed
pub fn print_summary(report: &AnalysisReport, max_findings: usize) {
    let topology = &report.topology;
    log::info!("#Start print_summary()");

    println!("{}", mode_line(report).bold());
    if let Some(collected_at) = report.snapshot.collected_at {
        println!("Collected at {}", collected_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!(
        "{}",
        resource_counts(topology)
            .iter()
            .map(|(label, count)| format!("{label}={count}"))
            .join(" ")
    );

    let cross_account: Vec<&AttachmentNode> = topology.cross_account_attachments().collect();
    if !cross_account.is_empty() {
        println!();
        println!("{}", "Cross-account attachments".bold());
        for attachment in cross_account {
            println!("  {}", attachment_line(attachment));
        }
    }

    if !topology.vpn_connections.is_empty() {
        println!();
        println!("{}", "VPN connections".bold());
        for vpn in topology.vpn_connections.values() {
            println!("  {} {}", health_label(vpn.health), vpn_line(vpn));
        }
    }

    if !topology.dx_connections.is_empty() || !topology.dx_vifs.is_empty() {
        println!();
        println!("{}", "Direct Connect".bold());
        for connection in topology.dx_connections.values() {
            println!("  {}", dx_connection_line(connection));
        }
        for vif in topology.dx_vifs.values() {
            println!("  {} {}", health_label(vif.bgp_health), vif_line(vif));
        }
    }

    println!();
    if report.findings.is_empty() {
        println!("{}", "No issues found.".green());
    } else {
        println!("{} ({})", "Findings".bold(), report.findings.len());
        println!(
            r#""cnt", "severity",        "kind",                "entities", "location", "message""#
        );
        for (i, finding) in report.findings.iter().take(max_findings).enumerate() {
            println!("{}", finding_row(i + 1, finding));
        }
        if report.findings.len() > max_findings {
            println!(
                "#{}# {} more finding(s) not shown",
                "NOTE".on_red(),
                report.findings.len() - max_findings
            );
        }
    }

    if !report.warnings.is_empty() {
        println!(
            "{} {} warning(s) while reading the snapshot",
            "WARN".yellow(),
            report.warnings.len()
        );
    }
}

fn mode_line(report: &AnalysisReport) -> String {
    let account = report
        .topology
        .viewer_account
        .as_deref()
        .unwrap_or("unknown account");
    let region = report.snapshot.region.as_deref().unwrap_or("unknown region");
    match &report.topology.visibility {
        Visibility::Hub => format!("{account} ({region}): hub account, TGW route tables visible"),
        Visibility::Spoke { referenced_tgw_ids } if referenced_tgw_ids.is_empty() => {
            format!("{account} ({region}): spoke account, no TGW referenced")
        }
        Visibility::Spoke { referenced_tgw_ids } => format!(
            "{account} ({region}): spoke account, TGW internals not visible, references {}",
            referenced_tgw_ids.join(", ")
        ),
    }
}

fn resource_counts(topology: &Topology) -> Vec<(&'static str, usize)> {
    vec![
        ("tgw", topology.transit_gateways.len()),
        ("tgw_route_tables", topology.tgw_route_tables.len()),
        ("attachments", topology.attachments.len()),
        ("vpcs", topology.vpcs.len()),
        ("subnets", topology.subnets().count()),
        ("peerings", topology.peerings.len()),
        ("vpn", topology.vpn_connections.len()),
        ("dx_connections", topology.dx_connections.len()),
        ("dx_gateways", topology.dx_gateways.len()),
        ("dx_vifs", topology.dx_vifs.len()),
    ]
}

fn attachment_line(attachment: &AttachmentNode) -> String {
    let cidrs = if attachment.cidrs.is_empty() {
        "no known CIDRs".to_string()
    } else {
        attachment.cidrs.iter().join(", ")
    };
    format!(
        "{} {} -> {} owner {} [{}]",
        attachment.id,
        attachment.kind,
        attachment.resource.id(),
        attachment.resource_owner_id,
        cidrs
    )
}

fn vpn_line(vpn: &VpnNode) -> String {
    format!(
        "{} ({}) {}/{} tunnels up",
        vpn.name,
        vpn.state,
        vpn.tunnels_up(),
        vpn.tunnels.len()
    )
}

fn dx_connection_line(connection: &DxConnectionNode) -> String {
    format!(
        "{} {} at {} {}{}",
        connection.name,
        connection.state,
        connection.location,
        connection.bandwidth,
        if connection.has_logical_redundancy {
            ""
        } else {
            " (no redundancy)"
        }
    )
}

fn vif_line(vif: &DxVifNode) -> String {
    format!(
        "{} {} vlan {} mtu {} {}/{} BGP peers up",
        vif.name,
        vif.state,
        vif.vlan,
        vif.mtu,
        vif.peers_up(),
        vif.bgp_peers.len()
    )
}

fn health_label(health: LinkHealth) -> ColoredString {
    match health {
        LinkHealth::AllUp => "UP  ".green(),
        LinkHealth::Partial => "PART".yellow(),
        LinkHealth::Down => "DOWN".red(),
        LinkHealth::None => "----".normal(),
    }
}

fn severity_label(severity: Severity) -> ColoredString {
    let label = format_field(severity, 10);
    match severity {
        Severity::High => label.red(),
        Severity::Medium => label.yellow(),
        Severity::Low => label.cyan(),
        Severity::Info => label.normal(),
    }
}

/// One findings table row.
pub fn finding_row(number: usize, finding: &Finding) -> String {
    format!(
        "{cnt},{severity},{kind},{entities},{location},{message}",
        cnt = format_field(number, 6),
        severity = severity_label(finding.severity),
        kind = format_field(finding.kind, 18),
        entities = format_field(finding.entity_ids.join(" "), 26),
        location = format_field(&finding.location, 12),
        message = format_field(&finding.message, 0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FindingKind;
    use crate::report::SnapshotInfo;

    fn report(visibility: Visibility) -> AnalysisReport {
        AnalysisReport {
            snapshot: SnapshotInfo {
                region: Some("eu-west-1".to_string()),
                ..SnapshotInfo::default()
            },
            topology: Topology {
                viewer_account: Some("111111111111".to_string()),
                visibility,
                ..Topology::default()
            },
            findings: vec![],
            warnings: vec![],
        }
    }

    #[test]
    fn test_format_field_short() {
        assert_eq!(format_field("test", 10), "    \"test\"");
    }

    #[test]
    fn test_format_field_exact() {
        assert_eq!(format_field("test", 6), "\"test\"");
    }

    #[test]
    fn test_format_field_long() {
        assert_eq!(format_field("long_value", 5), "\"long_value\"");
    }

    #[test]
    fn test_format_field_number() {
        assert_eq!(format_field(42, 6), "  \"42\"");
    }

    #[test]
    fn test_mode_line() {
        assert_eq!(
            mode_line(&report(Visibility::Hub)),
            "111111111111 (eu-west-1): hub account, TGW route tables visible"
        );
        let spoke = report(Visibility::Spoke {
            referenced_tgw_ids: vec!["tgw-0abc".to_string()],
        });
        assert!(mode_line(&spoke).ends_with("references tgw-0abc"));
    }

    #[test]
    fn test_finding_row() {
        colored::control::set_override(false);
        let finding = Finding::new(
            FindingKind::Blackhole,
            Severity::High,
            vec!["tgw-rtb-1".to_string()],
            "core",
            "10.1.0.0/16 is blackholed",
        );
        let row = finding_row(1, &finding);
        assert!(row.starts_with(r#"   "1",    "high","#), "row: {row}");
        assert!(row.ends_with(r#""10.1.0.0/16 is blackholed""#), "row: {row}");
    }

    #[test]
    fn test_resource_counts_empty() {
        assert!(resource_counts(&Topology::default())
            .iter()
            .all(|(_, count)| *count == 0));
    }
}
