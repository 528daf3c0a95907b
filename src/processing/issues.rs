//! Connectivity issue detection.
//!
//! Every rule reads the built [`Topology`] and returns its own findings; the
//! rules do not depend on each other. [`detect_issues`] runs all of them and
//! returns the findings in report order.

use super::overlap::{find_overlapping_cidrs, log_overlapping_cidrs};
use crate::config::RouteCoverage;
use crate::models::{
    AttachmentNode, Finding, FindingKind, Ipv4, RouteState, RouteTarget, Severity, TargetKind,
    TgwRoute, TgwRouteTableNode, Topology,
};
use itertools::Itertools;

const AVAILABLE: &str = "available";
const ACTIVE: &str = "active";

/// Run every rule against the topology.
///
/// # Arguments
/// * `topology` - The built topology
/// * `coverage` - When a route destination counts as covering a CIDR
///
/// # Returns
/// Findings sorted by severity descending, then by affected entity ids
pub fn detect_issues(topology: &Topology, coverage: RouteCoverage) -> Vec<Finding> {
    let mut findings = Vec::new();
    findings.extend(blackhole_routes(topology));
    findings.extend(asymmetric_routing(topology, coverage));
    findings.extend(degraded_vpns(topology));
    findings.extend(degraded_direct_connect(topology));
    findings.extend(degraded_bgp_sessions(topology));
    findings.extend(overlapping_cidrs(topology));
    findings.extend(missing_tgw_routes(topology, coverage));
    findings.extend(missing_vpc_routes(topology));
    findings.extend(inactive_peerings(topology));

    findings.sort_by(|a, b| a.report_order(b));
    log::info!("Detected {} issue(s)", findings.len());
    findings
}

/// Routes that drop traffic: blackholed, or pointing at a target the snapshot
/// does not contain.
pub fn blackhole_routes(topology: &Topology) -> Vec<Finding> {
    let mut findings = Vec::new();

    for table in topology.tgw_route_tables.values() {
        for route in &table.routes {
            if let Some(message) = dropped_route(route.state, &route.target) {
                let destination = route.destination.to_string();
                findings.push(
                    Finding::new(
                        FindingKind::Blackhole,
                        Severity::High,
                        vec![table.id.clone()],
                        &table.name,
                        format!("{destination} {message}"),
                    )
                    .with_route(&table.id, &destination),
                );
            }
        }
    }

    for vpc in topology.vpcs.values() {
        for table in &vpc.route_tables {
            for route in &table.routes {
                if let Some(message) = dropped_route(route.state, &route.target) {
                    let destination = route.destination.to_string();
                    findings.push(
                        Finding::new(
                            FindingKind::Blackhole,
                            Severity::High,
                            vec![table.id.clone()],
                            format!("{} / {}", vpc.name, table.name),
                            format!("{destination} {message}"),
                        )
                        .with_route(&table.id, &destination),
                    );
                }
            }
        }
    }

    findings
}

fn dropped_route(state: RouteState, target: &RouteTarget) -> Option<String> {
    if state == RouteState::Blackhole {
        Some("is blackholed".to_string())
    } else if state == RouteState::Active && target.is_unresolved() {
        Some(format!("targets {}", target.label))
    } else {
        None
    }
}

/// Attachment pairs where traffic flows one way only.
pub fn asymmetric_routing(topology: &Topology, coverage: RouteCoverage) -> Vec<Finding> {
    let mut findings = Vec::new();
    let by_tgw = topology
        .attachments
        .values()
        .into_group_map_by(|attachment| attachment.tgw_id.as_str());

    for (tgw_id, attachments) in by_tgw.into_iter().sorted_by_key(|(tgw_id, _)| *tgw_id) {
        for (source, destination) in attachments
            .iter()
            .cartesian_product(attachments.iter())
            .filter(|(source, destination)| source.id != destination.id)
        {
            if source.cidrs.is_empty() {
                continue;
            }
            if can_reach(topology, source, destination, coverage)
                && !can_reach(topology, destination, source, coverage)
            {
                findings.push(Finding::new(
                    FindingKind::Asymmetric,
                    Severity::Medium,
                    vec![source.id.clone(), destination.id.clone()],
                    tgw_id,
                    format!(
                        "{} routes to {} but {} has no route back",
                        source.name, destination.name, destination.name
                    ),
                ));
            }
        }
    }

    findings
}

/// The source's associated table forwards to `destination` for one of its CIDRs.
fn can_reach(
    topology: &Topology,
    source: &AttachmentNode,
    destination: &AttachmentNode,
    coverage: RouteCoverage,
) -> bool {
    let Some(table) = source
        .associated_route_table
        .as_deref()
        .and_then(|id| topology.tgw_route_tables.get(id))
    else {
        return false;
    };
    has_covering_route(table, &destination.id, &destination.cidrs, coverage)
}

fn has_covering_route(
    table: &TgwRouteTableNode,
    attachment_id: &str,
    cidrs: &[Ipv4],
    coverage: RouteCoverage,
) -> bool {
    routes_to(table, attachment_id).any(|route| {
        route
            .destination
            .cidr()
            .is_some_and(|dest| cidrs.iter().any(|cidr| coverage.covers(dest, cidr)))
    })
}

fn routes_to<'t>(
    table: &'t TgwRouteTableNode,
    attachment_id: &'t str,
) -> impl Iterator<Item = &'t TgwRoute> {
    table
        .routes
        .iter()
        .filter(move |route| route.is_active() && route.attachment_id() == Some(attachment_id))
}

pub fn degraded_vpns(topology: &Topology) -> Vec<Finding> {
    let mut findings = Vec::new();

    for vpn in topology.vpn_connections.values() {
        let total = vpn.tunnels.len();
        let up = vpn.tunnels_up();
        if total == 0 || up == total {
            continue;
        }
        let (severity, message) = if up == 0 {
            (
                Severity::High,
                format!("All {total} tunnels DOWN for {}", vpn.name),
            )
        } else {
            let down = vpn
                .tunnels
                .iter()
                .filter(|tunnel| !tunnel.up)
                .map(|tunnel| tunnel.outside_ip.as_str())
                .join(", ");
            (
                Severity::Medium,
                format!("{} of {total} tunnels DOWN for {}: {down}", total - up, vpn.name),
            )
        };
        findings.push(Finding::new(
            FindingKind::VpnDegraded,
            severity,
            vec![vpn.id.clone()],
            &vpn.name,
            message,
        ));
    }

    findings
}

/// DX connections and virtual interfaces that are not `available`.
pub fn degraded_direct_connect(topology: &Topology) -> Vec<Finding> {
    let connections = topology
        .dx_connections
        .values()
        .filter(|connection| connection.state != AVAILABLE)
        .map(|connection| {
            Finding::new(
                FindingKind::DxDegraded,
                Severity::High,
                vec![connection.id.clone()],
                &connection.location,
                format!("DX connection {} is {}", connection.name, connection.state),
            )
        });

    let vifs = topology
        .dx_vifs
        .values()
        .filter(|vif| vif.state != AVAILABLE)
        .map(|vif| {
            Finding::new(
                FindingKind::DxDegraded,
                Severity::High,
                vec![vif.id.clone()],
                &vif.name,
                format!("Virtual interface {} is {}", vif.name, vif.state),
            )
        });

    connections.chain(vifs).collect()
}

pub fn degraded_bgp_sessions(topology: &Topology) -> Vec<Finding> {
    topology
        .dx_vifs
        .values()
        .filter_map(|vif| {
            let total = vif.bgp_peers.len();
            let up = vif.peers_up();
            if total == 0 || up == total {
                return None;
            }
            let severity = if up == 0 {
                Severity::High
            } else {
                Severity::Medium
            };
            Some(Finding::new(
                FindingKind::BgpDegraded,
                severity,
                vec![vif.id.clone()],
                &vif.name,
                format!("{} of {total} BGP peers down on {}", total - up, vif.name),
            ))
        })
        .collect()
}

pub fn overlapping_cidrs(topology: &Topology) -> Vec<Finding> {
    let conflicts = find_overlapping_cidrs(topology);
    log_overlapping_cidrs(&conflicts);
    conflicts
        .into_iter()
        .map(|conflict| {
            Finding::new(
                FindingKind::CidrOverlap,
                Severity::Medium,
                vec![conflict.first.id.clone(), conflict.second.id.clone()],
                format!("{} / {}", conflict.first.name, conflict.second.name),
                format!(
                    "{} ({}) overlaps {} ({})",
                    conflict.first_cidr, conflict.first.name, conflict.second_cidr, conflict.second.name
                ),
            )
        })
        .collect()
}

/// Attachments propagating into a TGW table that holds no usable route back to them.
///
/// An attachment without known CIDRs only needs some active route targeting it.
pub fn missing_tgw_routes(topology: &Topology, coverage: RouteCoverage) -> Vec<Finding> {
    let mut findings = Vec::new();

    for table in topology.tgw_route_tables.values() {
        for attachment_id in &table.propagations {
            let Some(attachment) = topology.attachments.get(attachment_id) else {
                continue;
            };
            let routed = if attachment.cidrs.is_empty() {
                routes_to(table, attachment_id).next().is_some()
            } else {
                has_covering_route(table, attachment_id, &attachment.cidrs, coverage)
            };
            if !routed {
                findings.push(Finding::new(
                    FindingKind::MissingRoute,
                    Severity::Low,
                    vec![attachment.id.clone(), table.id.clone()],
                    &table.name,
                    format!(
                        "{} propagates into {} but no active route targets it",
                        attachment.name, table.name
                    ),
                ));
            }
        }
    }

    findings
}

/// VPCs attached to a TGW whose route tables never send traffic to one.
pub fn missing_vpc_routes(topology: &Topology) -> Vec<Finding> {
    topology
        .vpcs
        .values()
        .filter(|vpc| !vpc.tgw_attachment_ids.is_empty())
        .filter(|vpc| {
            !vpc.route_tables
                .iter()
                .flat_map(|table| table.routes.iter())
                .any(|route| route.target.kind == TargetKind::TransitGateway)
        })
        .map(|vpc| {
            Finding::new(
                FindingKind::MissingRoute,
                Severity::Info,
                vec![vpc.id.clone()],
                &vpc.name,
                format!(
                    "{} is attached via {} but no route table targets a TGW",
                    vpc.name,
                    vpc.tgw_attachment_ids.join(", ")
                ),
            )
        })
        .collect()
}

pub fn inactive_peerings(topology: &Topology) -> Vec<Finding> {
    topology
        .peerings
        .values()
        .filter(|peering| peering.status != ACTIVE)
        .map(|peering| {
            Finding::new(
                FindingKind::PeeringInactive,
                Severity::Medium,
                vec![peering.id.clone()],
                &peering.name,
                format!(
                    "Peering {} ({} <-> {}) is {}",
                    peering.name, peering.requester_vpc_id, peering.accepter_vpc_id, peering.status
                ),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DuplicateKeyPolicy;
    use crate::processing::{build_topology, ResourceIndex};
    use crate::snapshot::load_snapshot;
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn topology_of(documents: &[(&str, Value)]) -> Topology {
        let source: HashMap<String, String> = documents
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        let snapshot = load_snapshot(&source, false);
        let index = ResourceIndex::build(&snapshot, DuplicateKeyPolicy::LastWins);
        build_topology(&index, Some("111111111111"))
    }

    fn tgw_route(cidr: &str, attachment: &str, state: &str) -> Value {
        json!({
            "DestinationCidrBlock": cidr,
            "State": state,
            "Type": "static",
            "TransitGatewayAttachments": [{"TransitGatewayAttachmentId": attachment}]
        })
    }

    /// Two VPC attachments on one TGW, both associated with `tgw-rtb-1`.
    fn two_spokes(routes: Vec<Value>, propagations: &[&str]) -> Topology {
        topology_of(&[
            (
                "transit-gateways",
                json!({"TransitGateways": [
                    {"TransitGatewayId": "tgw-1", "OwnerId": "111111111111", "State": "available"}
                ]}),
            ),
            (
                "transit-gateway-route-tables",
                json!({"TransitGatewayRouteTables": [
                    {"TransitGatewayRouteTableId": "tgw-rtb-1", "TransitGatewayId": "tgw-1"}
                ]}),
            ),
            (
                "transit-gateway-attachments",
                json!({"TransitGatewayAttachments": [
                    {"TransitGatewayAttachmentId": "tgw-attach-a", "TransitGatewayId": "tgw-1",
                     "ResourceType": "vpc", "ResourceId": "vpc-a", "ResourceOwnerId": "111111111111"},
                    {"TransitGatewayAttachmentId": "tgw-attach-b", "TransitGatewayId": "tgw-1",
                     "ResourceType": "vpc", "ResourceId": "vpc-b", "ResourceOwnerId": "111111111111"}
                ]}),
            ),
            (
                "vpcs",
                json!({"Vpcs": [
                    {"VpcId": "vpc-a", "CidrBlock": "10.1.0.0/16", "OwnerId": "111111111111"},
                    {"VpcId": "vpc-b", "CidrBlock": "10.2.0.0/16", "OwnerId": "111111111111"}
                ]}),
            ),
            ("routes-tgw-rtb-1", json!({"Routes": routes})),
            (
                "associations-tgw-rtb-1",
                json!({"Associations": [
                    {"TransitGatewayAttachmentId": "tgw-attach-a", "State": "associated"},
                    {"TransitGatewayAttachmentId": "tgw-attach-b", "State": "associated"}
                ]}),
            ),
            (
                "propagations-tgw-rtb-1",
                json!({"TransitGatewayRouteTablePropagations": propagations
                    .iter()
                    .map(|id| json!({"TransitGatewayAttachmentId": id, "State": "enabled"}))
                    .collect::<Vec<_>>()}),
            ),
        ])
    }

    fn kinds(findings: &[Finding]) -> Vec<(FindingKind, Severity)> {
        findings.iter().map(|f| (f.kind, f.severity)).collect()
    }

    #[test]
    fn test_tgw_blackhole_route() {
        let topology = two_spokes(
            vec![
                tgw_route("10.1.0.0/16", "tgw-attach-a", "active"),
                tgw_route("10.2.0.0/16", "tgw-attach-b", "active"),
                json!({"DestinationCidrBlock": "10.9.0.0/16", "State": "blackhole", "Type": "static"}),
            ],
            &[],
        );
        let findings = blackhole_routes(&topology);
        assert_eq!(findings.len(), 1, "exactly one blackhole finding");
        let route = findings[0].route.as_ref().expect("route reference");
        assert_eq!(route.route_table_id, "tgw-rtb-1");
        assert_eq!(route.destination, "10.9.0.0/16");
        assert_eq!(findings[0].severity, Severity::High);
    }

    #[test]
    fn test_unresolved_target_is_blackhole() {
        let topology = two_spokes(
            vec![tgw_route("10.5.0.0/16", "tgw-attach-gone", "active")],
            &[],
        );
        let findings = blackhole_routes(&topology);
        assert_eq!(findings.len(), 1);
        assert!(
            findings[0].message.contains("tgw-attach-gone"),
            "message names the missing target: {}",
            findings[0].message
        );
    }

    #[test]
    fn test_symmetric_routes_are_clean() {
        let topology = two_spokes(
            vec![
                tgw_route("10.1.0.0/16", "tgw-attach-a", "active"),
                tgw_route("10.2.0.0/16", "tgw-attach-b", "active"),
            ],
            &["tgw-attach-a", "tgw-attach-b"],
        );
        assert!(blackhole_routes(&topology).is_empty());
        assert!(asymmetric_routing(&topology, RouteCoverage::Supernet).is_empty());
        assert!(missing_tgw_routes(&topology, RouteCoverage::Supernet).is_empty());
    }

    #[test]
    fn test_asymmetric_pair() {
        // Both attachments share the table, so a missing route back to A
        // makes B unable to return traffic.
        let topology = two_spokes(vec![tgw_route("10.2.0.0/16", "tgw-attach-b", "active")], &[]);
        let findings = asymmetric_routing(&topology, RouteCoverage::Supernet);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].entity_ids, vec!["tgw-attach-a", "tgw-attach-b"]);
    }

    #[test]
    fn test_coverage_policy() {
        let topology = two_spokes(
            vec![
                tgw_route("10.0.0.0/8", "tgw-attach-a", "active"),
                tgw_route("10.2.0.0/16", "tgw-attach-b", "active"),
            ],
            &[],
        );
        assert!(asymmetric_routing(&topology, RouteCoverage::Supernet).is_empty());
        assert_eq!(
            asymmetric_routing(&topology, RouteCoverage::Exact).len(),
            1,
            "a supernet does not count under exact coverage"
        );
    }

    #[test]
    fn test_missing_tgw_route() {
        let topology = two_spokes(
            vec![
                tgw_route("10.1.0.0/16", "tgw-attach-a", "active"),
                tgw_route("10.2.0.0/16", "tgw-attach-b", "blackhole"),
            ],
            &["tgw-attach-a", "tgw-attach-b"],
        );
        let findings = missing_tgw_routes(&topology, RouteCoverage::Supernet);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].entity_ids, vec!["tgw-attach-b", "tgw-rtb-1"]);
        assert_eq!(findings[0].severity, Severity::Low);
    }

    #[test]
    fn test_vpn_health() {
        let vpn = |id: &str, statuses: &[&str]| {
            json!({
                "VpnConnectionId": id,
                "State": "available",
                "VgwTelemetry": statuses
                    .iter()
                    .enumerate()
                    .map(|(i, s)| json!({"OutsideIpAddress": format!("203.0.113.{i}"), "Status": s}))
                    .collect::<Vec<_>>()
            })
        };
        let topology = topology_of(&[(
            "vpn-connections",
            json!({"VpnConnections": [
                vpn("vpn-half", &["UP", "DOWN"]),
                vpn("vpn-down", &["DOWN", "DOWN"]),
                vpn("vpn-up", &["UP", "UP"]),
                vpn("vpn-none", &[])
            ]}),
        )]);
        let findings = degraded_vpns(&topology);
        let by_id: Vec<(&str, Severity)> = findings
            .iter()
            .map(|f| (f.entity_ids[0].as_str(), f.severity))
            .collect();
        assert_eq!(
            by_id,
            vec![("vpn-down", Severity::High), ("vpn-half", Severity::Medium)]
        );
    }

    #[test]
    fn test_direct_connect_and_bgp() {
        let topology = topology_of(&[
            (
                "dx-connections",
                json!({"connections": [
                    {"connectionId": "dxcon-up", "connectionState": "available"},
                    {"connectionId": "dxcon-down", "connectionState": "down"}
                ]}),
            ),
            (
                "dx-vifs",
                json!({"virtualInterfaces": [
                    {"virtualInterfaceId": "dxvif-1", "connectionId": "dxcon-up",
                     "virtualInterfaceState": "available",
                     "bgpPeers": [{"bgpStatus": "up"}, {"bgpStatus": "down"}]},
                    {"virtualInterfaceId": "dxvif-2", "connectionId": "dxcon-down",
                     "virtualInterfaceState": "down",
                     "bgpPeers": [{"bgpStatus": "down"}]}
                ]}),
            ),
        ]);
        let dx = degraded_direct_connect(&topology);
        let ids: Vec<&str> = dx.iter().map(|f| f.entity_ids[0].as_str()).collect();
        assert_eq!(ids, vec!["dxcon-down", "dxvif-2"]);

        let bgp = degraded_bgp_sessions(&topology);
        assert_eq!(
            kinds(&bgp),
            vec![
                (FindingKind::BgpDegraded, Severity::Medium),
                (FindingKind::BgpDegraded, Severity::High)
            ]
        );
    }

    #[test]
    fn test_overlap_and_peering() {
        let topology = topology_of(&[
            (
                "vpcs",
                json!({"Vpcs": [
                    {"VpcId": "vpc-a", "CidrBlock": "10.0.0.0/16"},
                    {"VpcId": "vpc-b", "CidrBlock": "10.0.128.0/20"}
                ]}),
            ),
            (
                "vpc-peering-connections",
                json!({"VpcPeeringConnections": [
                    {"VpcPeeringConnectionId": "pcx-1", "Status": {"Code": "active"}},
                    {"VpcPeeringConnectionId": "pcx-2", "Status": {"Code": "pending-acceptance"}}
                ]}),
            ),
        ]);
        let findings = detect_issues(&topology, RouteCoverage::Supernet);
        assert_eq!(
            findings
                .iter()
                .map(|f| (f.kind, f.entity_ids.clone()))
                .collect::<Vec<_>>(),
            vec![
                (FindingKind::PeeringInactive, vec!["pcx-2".to_string()]),
                (
                    FindingKind::CidrOverlap,
                    vec!["vpc-a".to_string(), "vpc-b".to_string()]
                ),
            ]
        );
    }

    #[test]
    fn test_vpc_without_tgw_route() {
        let topology = topology_of(&[
            (
                "transit-gateway-attachments",
                json!({"TransitGatewayAttachments": [
                    {"TransitGatewayAttachmentId": "tgw-attach-a", "TransitGatewayId": "tgw-1",
                     "ResourceType": "vpc", "ResourceId": "vpc-a"}
                ]}),
            ),
            ("vpcs", json!({"Vpcs": [{"VpcId": "vpc-a", "CidrBlock": "10.1.0.0/16"}]})),
            (
                "vpc-route-tables",
                json!({"RouteTables": [{
                    "RouteTableId": "rtb-1",
                    "VpcId": "vpc-a",
                    "Associations": [{"Main": true}],
                    "Routes": [{"DestinationCidrBlock": "10.1.0.0/16", "GatewayId": "local", "State": "active"}]
                }]}),
            ),
        ]);
        let findings = missing_vpc_routes(&topology);
        assert_eq!(kinds(&findings), vec![(FindingKind::MissingRoute, Severity::Info)]);
        assert_eq!(findings[0].entity_ids, vec!["vpc-a"]);
    }

    #[test]
    fn test_empty_topology() {
        assert!(detect_issues(&Topology::default(), RouteCoverage::Supernet).is_empty());
    }

    #[test]
    fn test_blackhole_in_vpc_missing_from_snapshot() {
        let topology = topology_of(&[
            (
                "subnets",
                json!({"Subnets": [{"SubnetId": "subnet-1", "VpcId": "vpc-1"}]}),
            ),
            (
                "vpc-route-tables",
                json!({"RouteTables": [
                    {"RouteTableId": "rtb-1", "VpcId": "vpc-1",
                     "Routes": [{"DestinationCidrBlock": "172.16.0.0/12", "VpcPeeringConnectionId": "pcx-1", "State": "blackhole"}]}
                ]}),
            ),
        ]);

        let findings = blackhole_routes(&topology);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].entity_ids, vec!["rtb-1".to_string()]);
        assert_eq!(findings[0].location, "vpc-1 / rtb-1");
    }

    #[test]
    fn test_route_to_unlisted_attachment_is_blackhole() {
        let topology = topology_of(&[
            (
                "transit-gateway-route-tables",
                json!({"TransitGatewayRouteTables": [
                    {"TransitGatewayRouteTableId": "tgw-rtb-1", "TransitGatewayId": "tgw-1"}
                ]}),
            ),
            (
                "routes-tgw-rtb-1",
                json!({"Routes": [tgw_route("10.5.0.0/16", "tgw-attach-deleted", "active")]}),
            ),
        ]);

        let findings = blackhole_routes(&topology);
        assert_eq!(kinds(&findings), vec![(FindingKind::Blackhole, Severity::High)]);
        assert_eq!(
            findings[0].message,
            "10.5.0.0/16 targets unresolved tgw-attach-deleted"
        );
    }

    #[test]
    fn test_deleted_routes_are_not_coverage() {
        let topology = two_spokes(
            vec![
                tgw_route("10.1.0.0/16", "tgw-attach-a", "deleted"),
                tgw_route("10.2.0.0/16", "tgw-attach-b", "active"),
                tgw_route("10.9.0.0/16", "tgw-attach-gone", "deleted"),
            ],
            &["tgw-attach-a"],
        );

        assert!(blackhole_routes(&topology).is_empty(), "deleted routes drop nothing");
        let missing = missing_tgw_routes(&topology, RouteCoverage::Supernet);
        assert_eq!(missing.len(), 1);
        assert_eq!(
            missing[0].entity_ids,
            vec!["tgw-attach-a".to_string(), "tgw-rtb-1".to_string()]
        );
    }
}
