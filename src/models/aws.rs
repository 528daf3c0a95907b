//! Records as they appear in AWS CLI describe/list output.
//!
//! Field names follow the provider's JSON (PascalCase for EC2, camelCase for
//! Direct Connect). Everything except the natural key is optional so that
//! partially populated exports still parse.

use serde::{Deserialize, Serialize};

/// EC2 style `{"Key": .., "Value": ..}` tag.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// Direct Connect style `{"key": .., "value": ..}` tag.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DxTag {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// Value of the `Name` tag, if set and non-empty.
pub fn name_tag(tags: &[Tag]) -> Option<&str> {
    tags.iter()
        .find(|t| t.key == "Name")
        .map(|t| t.value.as_str())
        .filter(|v| !v.is_empty())
}

/// Collection metadata written next to the exported documents.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    /// Account the snapshot was collected with (the viewer account).
    #[serde(default)]
    pub aws_account_id: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default, alias = "collected_at")]
    pub timestamp: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct TransitGatewayOptions {
    #[serde(default)]
    pub amazon_side_asn: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RawTransitGateway {
    pub transit_gateway_id: String,
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub options: TransitGatewayOptions,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RawAttachmentAssociation {
    #[serde(default)]
    pub transit_gateway_route_table_id: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RawTgwAttachment {
    pub transit_gateway_attachment_id: String,
    #[serde(default)]
    pub transit_gateway_id: String,
    #[serde(default)]
    pub transit_gateway_owner_id: String,
    #[serde(default)]
    pub resource_owner_id: String,
    #[serde(default)]
    pub resource_type: String,
    #[serde(default)]
    pub resource_id: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub association: Option<RawAttachmentAssociation>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RawTgwRouteTable {
    pub transit_gateway_route_table_id: String,
    #[serde(default)]
    pub transit_gateway_id: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub default_association_route_table: bool,
    #[serde(default)]
    pub default_propagation_route_table: bool,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RawTgwRouteAttachment {
    #[serde(default)]
    pub transit_gateway_attachment_id: Option<String>,
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub resource_type: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RawTgwRoute {
    #[serde(default)]
    pub destination_cidr_block: Option<String>,
    #[serde(default)]
    pub prefix_list_id: Option<String>,
    #[serde(default)]
    pub transit_gateway_attachments: Vec<RawTgwRouteAttachment>,
    #[serde(default, rename = "Type")]
    pub route_type: String,
    #[serde(default)]
    pub state: String,
}

/// Entry of `associations-<id>` and `propagations-<id>` documents.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RawTgwRouteTableLink {
    #[serde(default)]
    pub transit_gateway_attachment_id: Option<String>,
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub state: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RawCidrBlockState {
    #[serde(default)]
    pub state: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RawCidrBlockAssociation {
    #[serde(default)]
    pub cidr_block: Option<String>,
    #[serde(default)]
    pub cidr_block_state: Option<RawCidrBlockState>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RawVpc {
    pub vpc_id: String,
    #[serde(default)]
    pub cidr_block: Option<String>,
    #[serde(default)]
    pub cidr_block_association_set: Vec<RawCidrBlockAssociation>,
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RawSubnet {
    pub subnet_id: String,
    #[serde(default)]
    pub vpc_id: String,
    #[serde(default)]
    pub cidr_block: Option<String>,
    #[serde(default)]
    pub availability_zone: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RawRouteTableAssociation {
    #[serde(default)]
    pub main: bool,
    #[serde(default)]
    pub subnet_id: Option<String>,
    #[serde(default)]
    pub gateway_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RawVpcRoute {
    #[serde(default)]
    pub destination_cidr_block: Option<String>,
    #[serde(default)]
    pub destination_ipv6_cidr_block: Option<String>,
    #[serde(default)]
    pub destination_prefix_list_id: Option<String>,
    #[serde(default)]
    pub gateway_id: Option<String>,
    #[serde(default)]
    pub egress_only_internet_gateway_id: Option<String>,
    #[serde(default)]
    pub nat_gateway_id: Option<String>,
    #[serde(default)]
    pub transit_gateway_id: Option<String>,
    #[serde(default)]
    pub vpc_peering_connection_id: Option<String>,
    #[serde(default)]
    pub network_interface_id: Option<String>,
    #[serde(default)]
    pub state: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RawVpcRouteTable {
    pub route_table_id: String,
    #[serde(default)]
    pub vpc_id: String,
    #[serde(default)]
    pub associations: Vec<RawRouteTableAssociation>,
    #[serde(default)]
    pub routes: Vec<RawVpcRoute>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RawGatewayAttachment {
    #[serde(default)]
    pub vpc_id: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RawInternetGateway {
    pub internet_gateway_id: String,
    #[serde(default)]
    pub attachments: Vec<RawGatewayAttachment>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RawNatGateway {
    pub nat_gateway_id: String,
    #[serde(default)]
    pub vpc_id: String,
    #[serde(default)]
    pub subnet_id: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RawPeeringStatus {
    #[serde(default)]
    pub code: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RawPeeringVpcInfo {
    #[serde(default)]
    pub vpc_id: String,
    #[serde(default)]
    pub cidr_block: String,
    #[serde(default)]
    pub owner_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RawVpcPeering {
    pub vpc_peering_connection_id: String,
    #[serde(default)]
    pub status: RawPeeringStatus,
    #[serde(default)]
    pub requester_vpc_info: RawPeeringVpcInfo,
    #[serde(default)]
    pub accepter_vpc_info: RawPeeringVpcInfo,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RawVgwTelemetry {
    #[serde(default)]
    pub outside_ip_address: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub status_message: String,
    #[serde(default)]
    pub accepted_route_count: u32,
    #[serde(default)]
    pub last_status_change: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RawVpnOptions {
    #[serde(default)]
    pub static_routes_only: bool,
    #[serde(default)]
    pub enable_acceleration: bool,
    #[serde(default)]
    pub local_ipv4_network_cidr: Option<String>,
    #[serde(default)]
    pub remote_ipv4_network_cidr: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RawVpnStaticRoute {
    #[serde(default)]
    pub destination_cidr_block: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RawVpnConnection {
    pub vpn_connection_id: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub customer_gateway_id: String,
    #[serde(default)]
    pub transit_gateway_id: Option<String>,
    #[serde(default)]
    pub vpn_gateway_id: Option<String>,
    #[serde(default)]
    pub vgw_telemetry: Vec<RawVgwTelemetry>,
    #[serde(default)]
    pub options: RawVpnOptions,
    #[serde(default)]
    pub routes: Vec<RawVpnStaticRoute>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RawCustomerGateway {
    pub customer_gateway_id: String,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub bgp_asn: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub device_name: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawDxConnection {
    pub connection_id: String,
    #[serde(default)]
    pub connection_name: String,
    #[serde(default)]
    pub connection_state: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub bandwidth: String,
    #[serde(default)]
    pub vlan: u32,
    #[serde(default)]
    pub partner_name: String,
    #[serde(default)]
    pub provider_name: String,
    #[serde(default)]
    pub has_logical_redundancy: String,
    #[serde(default)]
    pub aws_device: String,
    #[serde(default, rename = "awsDeviceV2")]
    pub aws_device_v2: String,
    #[serde(default)]
    pub tags: Vec<DxTag>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawDxGateway {
    pub direct_connect_gateway_id: String,
    #[serde(default)]
    pub direct_connect_gateway_name: String,
    #[serde(default)]
    pub amazon_side_asn: u64,
    #[serde(default)]
    pub owner_account: String,
    #[serde(default)]
    pub direct_connect_gateway_state: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawBgpPeer {
    #[serde(default)]
    pub bgp_peer_id: String,
    #[serde(default)]
    pub asn: u64,
    #[serde(default)]
    pub amazon_address: String,
    #[serde(default)]
    pub customer_address: String,
    #[serde(default)]
    pub bgp_peer_state: String,
    #[serde(default)]
    pub bgp_status: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct RawRouteFilterPrefix {
    #[serde(default)]
    pub cidr: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawDxVif {
    pub virtual_interface_id: String,
    #[serde(default)]
    pub virtual_interface_name: String,
    #[serde(default)]
    pub virtual_interface_type: String,
    #[serde(default)]
    pub virtual_interface_state: String,
    #[serde(default)]
    pub connection_id: String,
    #[serde(default)]
    pub vlan: u32,
    #[serde(default)]
    pub asn: u64,
    #[serde(default)]
    pub amazon_side_asn: u64,
    #[serde(default)]
    pub amazon_address: String,
    #[serde(default)]
    pub customer_address: String,
    #[serde(default)]
    pub mtu: Option<u32>,
    #[serde(default)]
    pub jumbo_frame_capable: bool,
    #[serde(default)]
    pub bgp_peers: Vec<RawBgpPeer>,
    #[serde(default)]
    pub direct_connect_gateway_id: Option<String>,
    #[serde(default)]
    pub virtual_gateway_id: Option<String>,
    #[serde(default)]
    pub route_filter_prefixes: Vec<RawRouteFilterPrefix>,
    #[serde(default)]
    pub tags: Vec<DxTag>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RawPrefixList {
    pub prefix_list_id: String,
    #[serde(default)]
    pub prefix_list_name: String,
}
