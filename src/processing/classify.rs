//! Classification rules.
//!
//! Pure functions, applied once while building the topology. Their results are
//! stored on the graph nodes.

use crate::models::aws::RawVpcRoute;
use crate::models::{AttachmentKind, LinkHealth, RouteState, SubnetKind, TargetKind, VpcRoute};
use regex::Regex;
use std::sync::OnceLock;

/// `com.amazonaws.<region>.<service>` managed prefix list names.
static MANAGED_PREFIX_LIST_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_managed_prefix_list_regex() -> &'static Regex {
    MANAGED_PREFIX_LIST_REGEX
        .get_or_init(|| Regex::new(r"^com\.amazonaws\.[^.]+\.(.+)$").expect("Invalid Regex"))
}

/// Map a TGW attachment `ResourceType` to its kind.
pub fn attachment_kind(resource_type: &str) -> AttachmentKind {
    match resource_type {
        "vpc" => AttachmentKind::Vpc,
        "vpn" => AttachmentKind::Vpn,
        "direct-connect-gateway" => AttachmentKind::DirectConnectGateway,
        "peering" => AttachmentKind::Peering,
        "tgw-peering" => AttachmentKind::TgwPeering,
        "connect" => AttachmentKind::Connect,
        other => AttachmentKind::Unknown(other.to_string()),
    }
}

/// Target kind and id of a VPC route.
///
/// `GatewayId` is checked first because AWS reports several gateway types
/// through it; the dedicated id fields follow.
pub fn vpc_route_target(route: &RawVpcRoute) -> (TargetKind, Option<String>) {
    if let Some(gateway) = present(&route.gateway_id) {
        let kind = if gateway == "local" {
            TargetKind::Local
        } else if gateway.starts_with("igw-") {
            TargetKind::InternetGateway
        } else if gateway.starts_with("vgw-") {
            TargetKind::VirtualPrivateGateway
        } else if gateway.starts_with("eigw-") {
            TargetKind::EgressOnlyInternetGateway
        } else if gateway.starts_with("vpce-") {
            TargetKind::VpcEndpoint
        } else {
            TargetKind::Unknown
        };
        return (kind, Some(gateway.to_string()));
    }

    let dedicated = [
        (&route.nat_gateway_id, TargetKind::NatGateway),
        (&route.transit_gateway_id, TargetKind::TransitGateway),
        (&route.vpc_peering_connection_id, TargetKind::VpcPeering),
        (&route.network_interface_id, TargetKind::NetworkInterface),
        (
            &route.egress_only_internet_gateway_id,
            TargetKind::EgressOnlyInternetGateway,
        ),
    ];
    dedicated
        .into_iter()
        .find_map(|(id, kind)| present(id).map(|id| (kind, Some(id.to_string()))))
        .unwrap_or((TargetKind::None, None))
}

/// Classify a subnet from the routes of its effective route table.
///
/// Only active default routes count; `0.0.0.0/0` is preferred over `::/0`.
/// No route table, or no default route, means isolated.
pub fn subnet_kind(routes: Option<&[VpcRoute]>) -> SubnetKind {
    let Some(routes) = routes else {
        return SubnetKind::Isolated;
    };
    let active = || routes.iter().filter(|r| r.state == RouteState::Active);
    let default_route = active()
        .find(|r| r.destination.is_ipv4_default())
        .or_else(|| active().find(|r| r.destination.is_ipv6_default()));

    match default_route.map(|r| r.target.kind) {
        None => SubnetKind::Isolated,
        Some(TargetKind::InternetGateway) => SubnetKind::Public,
        Some(TargetKind::TransitGateway) => SubnetKind::Tgw,
        Some(_) => SubnetKind::Private,
    }
}

/// Aggregate health of `total` redundant links of which `up` are up.
pub fn link_health(up: usize, total: usize) -> LinkHealth {
    if total == 0 {
        LinkHealth::None
    } else if up >= total {
        LinkHealth::AllUp
    } else if up > 0 {
        LinkHealth::Partial
    } else {
        LinkHealth::Down
    }
}

/// An owner is cross-account only when both it and the viewer are known and differ.
pub fn is_cross_account(owner_id: &str, viewer: Option<&str>) -> bool {
    match viewer {
        Some(viewer) if !owner_id.is_empty() => owner_id != viewer,
        _ => false,
    }
}

/// Display name of a prefix list: the service for AWS managed lists, else the name.
pub fn prefix_list_label(name: &str) -> String {
    get_managed_prefix_list_regex()
        .captures(name)
        .and_then(|c| c.get(1))
        .map(|service| service.as_str().to_string())
        .unwrap_or_else(|| name.to_string())
}

/// VPN tunnels report `UP`/`DOWN`.
pub fn tunnel_is_up(status: &str) -> bool {
    status.eq_ignore_ascii_case("up")
}

/// BGP peers report `up`/`down` in `bgpStatus`.
pub fn bgp_peer_is_up(status: &str) -> bool {
    status.eq_ignore_ascii_case("up")
}

/// Direct Connect reports redundancy as `yes`/`no`/`unknown`.
pub fn has_logical_redundancy(value: &str) -> bool {
    value.eq_ignore_ascii_case("yes")
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
