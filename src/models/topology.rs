//! The correlated network graph.
//!
//! Built once per run by [`crate::processing::build_topology`]. Classification
//! labels (subnet kind, cross-account flag, link health, route target labels)
//! are computed during the build and stored on the nodes, so views never derive
//! them again. Keyed collections are `BTreeMap`s to keep output ordering stable.

use super::Ipv4;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum Visibility {
    /// TGW route tables are visible and owned by the viewer account.
    Hub,
    /// TGW internals are opaque; only ids referenced by local resources are known.
    Spoke { referenced_tgw_ids: Vec<String> },
}

impl Visibility {
    pub fn is_hub(&self) -> bool {
        matches!(self, Visibility::Hub)
    }

    pub fn referenced_tgw_ids(&self) -> &[String] {
        match self {
            Visibility::Hub => &[],
            Visibility::Spoke { referenced_tgw_ids } => referenced_tgw_ids,
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SubnetKind {
    Public,
    Private,
    Isolated,
    Tgw,
}

impl fmt::Display for SubnetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SubnetKind::Public => "public",
            SubnetKind::Private => "private",
            SubnetKind::Isolated => "isolated",
            SubnetKind::Tgw => "tgw",
        };
        f.write_str(s)
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RouteTableSource {
    /// Subnet is explicitly associated with the table.
    Explicit,
    /// Subnet falls back to the VPC main table.
    Main,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    Vpc,
    Vpn,
    DirectConnectGateway,
    Peering,
    TgwPeering,
    Connect,
    Unknown(String),
}

impl fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachmentKind::Vpc => f.write_str("vpc"),
            AttachmentKind::Vpn => f.write_str("vpn"),
            AttachmentKind::DirectConnectGateway => f.write_str("direct-connect-gateway"),
            AttachmentKind::Peering => f.write_str("peering"),
            AttachmentKind::TgwPeering => f.write_str("tgw-peering"),
            AttachmentKind::Connect => f.write_str("connect"),
            AttachmentKind::Unknown(raw) if raw.is_empty() => f.write_str("unknown"),
            AttachmentKind::Unknown(raw) => write!(f, "unknown({raw})"),
        }
    }
}

/// The resource behind an attachment.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "type", content = "id")]
pub enum AttachmentResource {
    Vpc(String),
    Vpn(String),
    DxGateway(String),
    TransitGateway(String),
    /// Not present in the snapshot; only the raw resource id is known.
    Unresolved(String),
}

impl AttachmentResource {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, AttachmentResource::Unresolved(_))
    }

    pub fn id(&self) -> &str {
        match self {
            AttachmentResource::Vpc(id)
            | AttachmentResource::Vpn(id)
            | AttachmentResource::DxGateway(id)
            | AttachmentResource::TransitGateway(id)
            | AttachmentResource::Unresolved(id) => id,
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentVisibility {
    Resolved,
    ReferencedOnly,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RouteState {
    Active,
    Blackhole,
    Pending,
    Deleting,
    Deleted,
    Unknown,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RouteType {
    Static,
    Propagated,
}

/// Route destination.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Destination {
    Cidr { cidr: Ipv4 },
    /// IPv6 or otherwise unparsed CIDR text.
    Other { value: String },
    PrefixList { id: String, name: Option<String> },
    None,
}

impl Destination {
    pub fn cidr(&self) -> Option<&Ipv4> {
        match self {
            Destination::Cidr { cidr } => Some(cidr),
            _ => None,
        }
    }

    pub fn is_ipv4_default(&self) -> bool {
        self.cidr().is_some_and(|c| c.is_default_route())
    }

    pub fn is_ipv6_default(&self) -> bool {
        matches!(self, Destination::Other { value } if value == "::/0")
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Cidr { cidr } => write!(f, "{cidr}"),
            Destination::Other { value } => f.write_str(value),
            Destination::PrefixList { id, .. } => f.write_str(id),
            Destination::None => f.write_str("-"),
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Local,
    InternetGateway,
    EgressOnlyInternetGateway,
    NatGateway,
    TransitGateway,
    TgwAttachment,
    VpcPeering,
    VpcEndpoint,
    VirtualPrivateGateway,
    NetworkInterface,
    None,
    Unknown,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TargetKind::Local => "local",
            TargetKind::InternetGateway => "internet-gateway",
            TargetKind::EgressOnlyInternetGateway => "egress-only-igw",
            TargetKind::NatGateway => "nat-gateway",
            TargetKind::TransitGateway => "transit-gateway",
            TargetKind::TgwAttachment => "tgw-attachment",
            TargetKind::VpcPeering => "vpc-peering",
            TargetKind::VpcEndpoint => "vpc-endpoint",
            TargetKind::VirtualPrivateGateway => "vgw",
            TargetKind::NetworkInterface => "eni",
            TargetKind::None => "none",
            TargetKind::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    Resolved,
    /// The id is absent from a populated collection.
    Unresolved,
    /// Target family not indexed, or its collection was empty.
    Unchecked,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    pub kind: TargetKind,
    pub id: Option<String>,
    pub status: TargetStatus,
    /// Human readable target name.
    pub label: String,
}

impl RouteTarget {
    pub fn is_unresolved(&self) -> bool {
        self.status == TargetStatus::Unresolved
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TgwRoute {
    pub destination: Destination,
    pub route_type: RouteType,
    pub state: RouteState,
    pub target: RouteTarget,
}

impl TgwRoute {
    pub fn is_active(&self) -> bool {
        self.state == RouteState::Active
    }

    /// Attachment id the route forwards to, if any.
    pub fn attachment_id(&self) -> Option<&str> {
        self.target.id.as_deref()
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TgwRouteTableNode {
    pub id: String,
    pub tgw_id: String,
    pub name: String,
    pub state: String,
    pub default_association: bool,
    pub default_propagation: bool,
    pub routes: Vec<TgwRoute>,
    /// Attachment ids associated with this table.
    pub associations: Vec<String>,
    /// Attachment ids propagating into this table.
    pub propagations: Vec<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TransitGatewayNode {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub asn: u64,
    pub state: String,
    pub route_table_ids: Vec<String>,
    pub attachment_ids: Vec<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct AttachmentNode {
    pub id: String,
    pub tgw_id: String,
    pub name: String,
    pub state: String,
    pub kind: AttachmentKind,
    pub resource: AttachmentResource,
    pub visibility: AttachmentVisibility,
    pub resource_owner_id: String,
    pub tgw_owner_id: String,
    pub cross_account: bool,
    /// CIDRs reachable through the attachment, as far as the snapshot shows.
    pub cidrs: Vec<Ipv4>,
    pub associated_route_table: Option<String>,
    pub propagates_to: Vec<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct VpcRoute {
    pub destination: Destination,
    pub state: RouteState,
    pub target: RouteTarget,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct VpcRouteTableNode {
    pub id: String,
    pub vpc_id: String,
    pub name: String,
    pub is_main: bool,
    pub subnet_ids: Vec<String>,
    pub routes: Vec<VpcRoute>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SubnetNode {
    pub id: String,
    pub vpc_id: String,
    pub name: String,
    pub cidr: Option<Ipv4>,
    pub availability_zone: String,
    pub route_table_id: Option<String>,
    pub route_table_source: Option<RouteTableSource>,
    pub kind: SubnetKind,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct VpcNode {
    pub id: String,
    pub name: String,
    /// False for a VPC known only from the route tables or subnets that name it.
    pub resolved: bool,
    pub cidrs: Vec<Ipv4>,
    pub owner_id: String,
    pub is_default: bool,
    pub igw_id: Option<String>,
    pub nat_gateway_ids: Vec<String>,
    pub tgw_attachment_ids: Vec<String>,
    pub main_route_table_id: Option<String>,
    pub route_tables: Vec<VpcRouteTableNode>,
    pub subnets: Vec<SubnetNode>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PeeringNode {
    pub id: String,
    pub name: String,
    pub status: String,
    pub requester_vpc_id: String,
    pub requester_cidr: String,
    pub accepter_vpc_id: String,
    pub accepter_cidr: String,
}

/// Aggregate state of a set of redundant links (VPN tunnels, BGP sessions).
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LinkHealth {
    AllUp,
    Partial,
    Down,
    None,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct VpnTunnel {
    pub outside_ip: String,
    pub up: bool,
    pub status_message: String,
    pub accepted_route_count: u32,
    pub last_status_change: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CustomerGatewayNode {
    pub id: String,
    pub name: String,
    pub ip_address: String,
    pub bgp_asn: String,
    pub state: String,
    pub device_name: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct VpnNode {
    pub id: String,
    pub name: String,
    pub state: String,
    pub customer_gateway_id: String,
    pub customer_gateway: Option<CustomerGatewayNode>,
    pub tgw_id: Option<String>,
    pub vpn_gateway_id: Option<String>,
    pub attachment_id: Option<String>,
    pub tunnels: Vec<VpnTunnel>,
    pub health: LinkHealth,
    pub static_routes_only: bool,
    pub enable_acceleration: bool,
    pub local_cidr: String,
    pub remote_cidr: String,
    pub static_routes: Vec<String>,
}

impl VpnNode {
    pub fn tunnels_up(&self) -> usize {
        self.tunnels.iter().filter(|t| t.up).count()
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DxConnectionNode {
    pub id: String,
    pub name: String,
    pub state: String,
    pub location: String,
    pub bandwidth: String,
    pub vlan: u32,
    pub partner_name: String,
    pub provider_name: String,
    pub has_logical_redundancy: bool,
    pub aws_device: String,
    pub vif_ids: Vec<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DxGatewayNode {
    pub id: String,
    pub name: String,
    pub amazon_asn: u64,
    pub owner_account: String,
    pub state: String,
    pub vif_ids: Vec<String>,
    pub attachment_ids: Vec<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct BgpPeer {
    pub peer_id: String,
    pub asn: u64,
    pub amazon_address: String,
    pub customer_address: String,
    pub state: String,
    pub up: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DxVifNode {
    pub id: String,
    pub name: String,
    pub vif_type: String,
    pub state: String,
    pub connection_id: String,
    pub vlan: u32,
    pub customer_asn: u64,
    pub amazon_asn: u64,
    pub amazon_address: String,
    pub customer_address: String,
    pub mtu: u32,
    pub jumbo_capable: bool,
    pub bgp_peers: Vec<BgpPeer>,
    pub bgp_health: LinkHealth,
    pub dx_gateway_id: Option<String>,
    pub virtual_gateway_id: Option<String>,
    pub attachment_id: Option<String>,
    pub route_filter_prefixes: Vec<String>,
}

impl DxVifNode {
    pub fn peers_up(&self) -> usize {
        self.bgp_peers.iter().filter(|p| p.up).count()
    }
}

/// Everything one snapshot shows about the network.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Topology {
    pub viewer_account: Option<String>,
    pub visibility: Visibility,
    pub transit_gateways: BTreeMap<String, TransitGatewayNode>,
    pub tgw_route_tables: BTreeMap<String, TgwRouteTableNode>,
    pub attachments: BTreeMap<String, AttachmentNode>,
    pub vpcs: BTreeMap<String, VpcNode>,
    pub peerings: BTreeMap<String, PeeringNode>,
    pub vpn_connections: BTreeMap<String, VpnNode>,
    pub dx_connections: BTreeMap<String, DxConnectionNode>,
    pub dx_gateways: BTreeMap<String, DxGatewayNode>,
    pub dx_vifs: BTreeMap<String, DxVifNode>,
}

impl Default for Visibility {
    fn default() -> Self {
        Visibility::Spoke {
            referenced_tgw_ids: vec![],
        }
    }
}

impl Topology {
    pub fn cross_account_attachments(&self) -> impl Iterator<Item = &AttachmentNode> {
        self.attachments.values().filter(|a| a.cross_account)
    }

    pub fn subnets(&self) -> impl Iterator<Item = &SubnetNode> {
        self.vpcs.values().flat_map(|v| v.subnets.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.transit_gateways.is_empty()
            && self.tgw_route_tables.is_empty()
            && self.attachments.is_empty()
            && self.vpcs.is_empty()
            && self.peerings.is_empty()
            && self.vpn_connections.is_empty()
            && self.dx_connections.is_empty()
            && self.dx_gateways.is_empty()
            && self.dx_vifs.is_empty()
    }
}
