//! Topology builder.
//!
//! Turns the flat, loosely linked collections of a snapshot into one
//! [`Topology`]. Every relationship is resolved through the [`ResourceIndex`];
//! references that do not resolve are kept and marked, never dropped.

use super::classify::{
    attachment_kind, bgp_peer_is_up, has_logical_redundancy, is_cross_account, link_health,
    prefix_list_label, subnet_kind, tunnel_is_up, vpc_route_target,
};
use super::index::ResourceIndex;
use crate::models::aws::*;
use crate::models::{
    AttachmentKind, AttachmentNode, AttachmentResource, AttachmentVisibility, BgpPeer,
    CustomerGatewayNode, Destination, DxConnectionNode, DxGatewayNode, DxVifNode, Ipv4,
    PeeringNode, ResourceFamily, RouteState, RouteTableSource, RouteTarget, RouteType,
    SubnetNode, TargetKind, TargetStatus, TgwRoute, TgwRouteTableNode, Topology,
    TransitGatewayNode, Visibility, VpcNode, VpcRoute, VpcRouteTableNode, VpnNode, VpnTunnel,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// MTU AWS applies to a VIF that does not report one.
const DEFAULT_VIF_MTU: u32 = 1500;

/// Build the topology graph for one snapshot.
///
/// # Arguments
/// * `index` - Lookup tables over the loaded snapshot
/// * `viewer` - Account the snapshot was taken from, if known
pub fn build_topology(index: &ResourceIndex<'_>, viewer: Option<&str>) -> Topology {
    let builder = Builder::new(index, viewer);

    let tgw_route_tables = builder.tgw_route_tables();
    let attachments = builder.attachments(&tgw_route_tables);
    let transit_gateways = builder.transit_gateways();
    let vpcs = builder.vpcs(&attachments);
    let vpn_connections = builder.vpn_connections();
    let dx_vifs = builder.dx_vifs();
    let visibility = builder.visibility(&attachments, &vpn_connections);

    let topology = Topology {
        viewer_account: viewer.map(str::to_string),
        visibility,
        transit_gateways,
        tgw_route_tables,
        attachments,
        vpcs,
        peerings: builder.peerings(),
        vpn_connections,
        dx_connections: builder.dx_connections(),
        dx_gateways: builder.dx_gateways(),
        dx_vifs,
    };

    log::info!(
        "Built topology ({}): {} TGWs, {} TGW route tables, {} attachments ({} cross-account), {} VPCs, {} subnets",
        if topology.visibility.is_hub() { "hub" } else { "spoke" },
        topology.transit_gateways.len(),
        topology.tgw_route_tables.len(),
        topology.attachments.len(),
        topology.cross_account_attachments().count(),
        topology.vpcs.len(),
        topology.subnets().count()
    );
    topology
}

struct Builder<'i, 'a> {
    index: &'i ResourceIndex<'a>,
    viewer: Option<&'i str>,
    /// Destinations of propagated TGW routes, by target attachment.
    propagated_cidrs: HashMap<&'a str, BTreeSet<Ipv4>>,
}

impl<'i, 'a> Builder<'i, 'a> {
    fn new(index: &'i ResourceIndex<'a>, viewer: Option<&'i str>) -> Builder<'i, 'a> {
        let mut propagated_cidrs: HashMap<&'a str, BTreeSet<Ipv4>> = HashMap::new();
        for table in index.all::<RawTgwRouteTable>() {
            for route in index.tgw_routes(&table.transit_gateway_route_table_id) {
                if route.route_type != "propagated" {
                    continue;
                }
                let cidr = route
                    .destination_cidr_block
                    .as_deref()
                    .and_then(|c| Ipv4::new(c).ok());
                if let (Some(cidr), Some(attachment)) = (cidr, first_attachment(route)) {
                    propagated_cidrs.entry(attachment).or_default().insert(cidr);
                }
            }
        }
        Builder {
            index,
            viewer,
            propagated_cidrs,
        }
    }

    fn transit_gateways(&self) -> BTreeMap<String, TransitGatewayNode> {
        let mut tables_by_tgw: HashMap<&str, Vec<String>> = HashMap::new();
        for table in self.index.all::<RawTgwRouteTable>() {
            tables_by_tgw
                .entry(table.transit_gateway_id.as_str())
                .or_default()
                .push(table.transit_gateway_route_table_id.clone());
        }

        self.index
            .all::<RawTransitGateway>()
            .into_iter()
            .map(|tgw| {
                let id = tgw.transit_gateway_id.clone();
                let node = TransitGatewayNode {
                    name: name_or_id(&tgw.tags, &id),
                    owner_id: tgw.owner_id.clone(),
                    asn: tgw.options.amazon_side_asn,
                    state: tgw.state.clone(),
                    route_table_ids: tables_by_tgw.remove(id.as_str()).unwrap_or_default(),
                    attachment_ids: owned(self.index.attachments_on_tgw(&id)),
                    id: id.clone(),
                };
                (id, node)
            })
            .collect()
    }

    fn tgw_route_tables(&self) -> BTreeMap<String, TgwRouteTableNode> {
        self.index
            .all::<RawTgwRouteTable>()
            .into_iter()
            .map(|table| {
                let id = table.transit_gateway_route_table_id.clone();
                let routes = self
                    .index
                    .tgw_routes(&id)
                    .iter()
                    .map(|route| self.tgw_route(route))
                    .collect();
                let node = TgwRouteTableNode {
                    tgw_id: table.transit_gateway_id.clone(),
                    name: name_or_id(&table.tags, &id),
                    state: table.state.clone(),
                    default_association: table.default_association_route_table,
                    default_propagation: table.default_propagation_route_table,
                    routes,
                    associations: linked_attachments(self.index.tgw_associations(&id), "associated"),
                    propagations: linked_attachments(self.index.tgw_propagations(&id), "enabled"),
                    id: id.clone(),
                };
                (id, node)
            })
            .collect()
    }

    fn tgw_route(&self, route: &RawTgwRoute) -> TgwRoute {
        let destination = match (&route.destination_cidr_block, &route.prefix_list_id) {
            (Some(cidr), _) if !cidr.is_empty() => cidr_destination(cidr),
            (_, Some(id)) if !id.is_empty() => self.prefix_list_destination(id),
            _ => Destination::None,
        };
        let state = route_state(&route.state);
        let route_type = if route.route_type == "propagated" {
            RouteType::Propagated
        } else {
            RouteType::Static
        };

        let target = match first_attachment(route) {
            None => RouteTarget {
                kind: TargetKind::None,
                id: None,
                status: TargetStatus::Unchecked,
                label: "none".to_string(),
            },
            Some(attachment_id) => {
                // Attachments are always exported alongside TGW route tables.
                let (status, label) = match self.index.resolve::<RawTgwAttachment>(attachment_id) {
                    Some(attachment) => (
                        TargetStatus::Resolved,
                        format!(
                            "{} ({})",
                            self.attachment_name(attachment),
                            attachment_kind(&attachment.resource_type)
                        ),
                    ),
                    None => (TargetStatus::Unresolved, attachment_id.to_string()),
                };
                RouteTarget {
                    kind: TargetKind::TgwAttachment,
                    id: Some(attachment_id.to_string()),
                    status,
                    label,
                }
            }
        };

        TgwRoute {
            destination,
            route_type,
            state,
            target: finish_label(target, state),
        }
    }

    fn attachments(
        &self,
        tables: &BTreeMap<String, TgwRouteTableNode>,
    ) -> BTreeMap<String, AttachmentNode> {
        // Association and propagation edges, as seen from the route tables.
        let mut associated: HashMap<&str, &str> = HashMap::new();
        let mut propagates: HashMap<&str, Vec<String>> = HashMap::new();
        for table in tables.values() {
            for attachment in &table.associations {
                associated.entry(attachment.as_str()).or_insert(table.id.as_str());
            }
            for attachment in &table.propagations {
                propagates
                    .entry(attachment.as_str())
                    .or_default()
                    .push(table.id.clone());
            }
        }

        self.index
            .all::<RawTgwAttachment>()
            .into_iter()
            .map(|raw| {
                let id = raw.transit_gateway_attachment_id.clone();
                let kind = attachment_kind(&raw.resource_type);
                let resource = self.attachment_resource(&kind, &raw.resource_id);
                let visibility = if resource.is_resolved() {
                    AttachmentVisibility::Resolved
                } else {
                    log::debug!("Attachment {id} references {} outside the snapshot", raw.resource_id);
                    AttachmentVisibility::ReferencedOnly
                };

                let associated_route_table = associated
                    .get(id.as_str())
                    .map(|t| t.to_string())
                    .or_else(|| {
                        raw.association
                            .as_ref()
                            .map(|a| a.transit_gateway_route_table_id.clone())
                            .filter(|t| !t.is_empty())
                    });

                let tgw_owner_id = if raw.transit_gateway_owner_id.is_empty() {
                    self.index
                        .resolve::<RawTransitGateway>(&raw.transit_gateway_id)
                        .map(|tgw| tgw.owner_id.clone())
                        .unwrap_or_default()
                } else {
                    raw.transit_gateway_owner_id.clone()
                };

                let node = AttachmentNode {
                    tgw_id: raw.transit_gateway_id.clone(),
                    name: self.attachment_name(raw),
                    state: raw.state.clone(),
                    cidrs: self.attachment_cidrs(raw, &resource),
                    kind,
                    resource,
                    visibility,
                    resource_owner_id: raw.resource_owner_id.clone(),
                    tgw_owner_id,
                    cross_account: is_cross_account(&raw.resource_owner_id, self.viewer),
                    associated_route_table,
                    propagates_to: propagates.remove(id.as_str()).unwrap_or_default(),
                    id: id.clone(),
                };
                (id, node)
            })
            .collect()
    }

    fn attachment_resource(&self, kind: &AttachmentKind, resource_id: &str) -> AttachmentResource {
        let family = match kind {
            AttachmentKind::Vpc => ResourceFamily::Vpc,
            AttachmentKind::Vpn => ResourceFamily::VpnConnection,
            AttachmentKind::DirectConnectGateway => ResourceFamily::DxGateway,
            AttachmentKind::Peering | AttachmentKind::TgwPeering => ResourceFamily::TransitGateway,
            AttachmentKind::Connect | AttachmentKind::Unknown(_) => {
                return AttachmentResource::Unresolved(resource_id.to_string())
            }
        };
        if !self.index.contains(family, resource_id) {
            return AttachmentResource::Unresolved(resource_id.to_string());
        }
        let id = resource_id.to_string();
        match family {
            ResourceFamily::Vpc => AttachmentResource::Vpc(id),
            ResourceFamily::VpnConnection => AttachmentResource::Vpn(id),
            ResourceFamily::DxGateway => AttachmentResource::DxGateway(id),
            _ => AttachmentResource::TransitGateway(id),
        }
    }

    /// `Name` tag, else the backing VPC's name, else the id.
    fn attachment_name(&self, raw: &RawTgwAttachment) -> String {
        if let Some(name) = name_tag(&raw.tags) {
            return name.to_string();
        }
        if raw.resource_type == "vpc" {
            if let Some(name) = self
                .index
                .resolve::<RawVpc>(&raw.resource_id)
                .and_then(|vpc| name_tag(&vpc.tags))
            {
                return name.to_string();
            }
        }
        raw.transit_gateway_attachment_id.clone()
    }

    fn attachment_cidrs(&self, raw: &RawTgwAttachment, resource: &AttachmentResource) -> Vec<Ipv4> {
        if let AttachmentResource::Vpc(vpc_id) = resource {
            if let Some(vpc) = self.index.resolve::<RawVpc>(vpc_id) {
                let cidrs = vpc_cidrs(vpc);
                if !cidrs.is_empty() {
                    return cidrs;
                }
            }
        }
        if let Some(cidrs) = self
            .propagated_cidrs
            .get(raw.transit_gateway_attachment_id.as_str())
        {
            return cidrs.iter().copied().collect();
        }
        if let AttachmentResource::Vpn(vpn_id) = resource {
            if let Some(vpn) = self.index.resolve::<RawVpnConnection>(vpn_id) {
                let cidrs: BTreeSet<Ipv4> = vpn
                    .routes
                    .iter()
                    .filter_map(|r| Ipv4::new(&r.destination_cidr_block).ok())
                    .collect();
                return cidrs.into_iter().collect();
            }
        }
        Vec::new()
    }

    /// VPCs of the snapshot, plus a placeholder for every VPC id that route
    /// tables or subnets name but the snapshot lacks.
    fn vpcs(&self, attachments: &BTreeMap<String, AttachmentNode>) -> BTreeMap<String, VpcNode> {
        let referenced = self
            .index
            .all::<RawVpcRouteTable>()
            .into_iter()
            .map(|table| (table.vpc_id.as_str(), table.route_table_id.as_str()))
            .chain(
                self.index
                    .all::<RawSubnet>()
                    .into_iter()
                    .map(|subnet| (subnet.vpc_id.as_str(), subnet.subnet_id.as_str())),
            );
        let mut unresolved: BTreeSet<&str> = BTreeSet::new();
        for (vpc_id, referrer) in referenced {
            if vpc_id.is_empty() {
                log::warn!("{referrer} names no VPC, skipping");
            } else if self.index.resolve::<RawVpc>(vpc_id).is_none() && unresolved.insert(vpc_id) {
                log::warn!("VPC '{vpc_id}' is referenced by {referrer} but not in the snapshot");
            }
        }

        self.index
            .all::<RawVpc>()
            .into_iter()
            .map(|vpc| self.vpc(&vpc.vpc_id, Some(vpc), attachments))
            .chain(
                unresolved
                    .into_iter()
                    .map(|vpc_id| self.vpc(vpc_id, None, attachments)),
            )
            .map(|node| (node.id.clone(), node))
            .collect()
    }

    fn vpc(
        &self,
        id: &str,
        vpc: Option<&RawVpc>,
        attachments: &BTreeMap<String, AttachmentNode>,
    ) -> VpcNode {
        let route_tables: Vec<VpcRouteTableNode> = self
            .index
            .route_tables_in(id)
            .iter()
            .map(|table| self.vpc_route_table(table))
            .collect();
        let subnets = self
            .index
            .subnets_in(id)
            .iter()
            .map(|subnet| self.subnet(subnet, &route_tables))
            .collect();
        let tgw_attachment_ids = self
            .index
            .attachments_for_resource(id)
            .iter()
            .filter(|a| {
                attachments
                    .get(**a)
                    .is_some_and(|a| a.kind == AttachmentKind::Vpc)
            })
            .map(|a| a.to_string())
            .collect();

        VpcNode {
            id: id.to_string(),
            name: vpc.map_or_else(|| id.to_string(), |vpc| name_or_id(&vpc.tags, id)),
            resolved: vpc.is_some(),
            cidrs: vpc.map(vpc_cidrs).unwrap_or_default(),
            owner_id: vpc.map(|vpc| vpc.owner_id.clone()).unwrap_or_default(),
            is_default: vpc.is_some_and(|vpc| vpc.is_default),
            igw_id: self.index.internet_gateway_of(id).map(str::to_string),
            nat_gateway_ids: owned(self.index.nat_gateways_in(id)),
            tgw_attachment_ids,
            main_route_table_id: self.index.main_route_table(id).map(str::to_string),
            route_tables,
            subnets,
        }
    }

    fn vpc_route_table(&self, table: &RawVpcRouteTable) -> VpcRouteTableNode {
        let mut subnet_ids: Vec<String> = table
            .associations
            .iter()
            .filter_map(|a| a.subnet_id.clone())
            .filter(|s| !s.is_empty())
            .collect();
        subnet_ids.sort();
        subnet_ids.dedup();

        VpcRouteTableNode {
            id: table.route_table_id.clone(),
            vpc_id: table.vpc_id.clone(),
            name: name_or_id(&table.tags, &table.route_table_id),
            is_main: table.associations.iter().any(|a| a.main),
            subnet_ids,
            routes: table.routes.iter().map(|r| self.vpc_route(r)).collect(),
        }
    }

    fn vpc_route(&self, route: &RawVpcRoute) -> VpcRoute {
        let destination = if let Some(cidr) = present(&route.destination_cidr_block) {
            cidr_destination(cidr)
        } else if let Some(cidr) = present(&route.destination_ipv6_cidr_block) {
            Destination::Other {
                value: cidr.to_string(),
            }
        } else if let Some(id) = present(&route.destination_prefix_list_id) {
            self.prefix_list_destination(id)
        } else {
            Destination::None
        };
        let state = route_state(&route.state);
        let (kind, id) = vpc_route_target(route);
        let target = self.resolve_vpc_target(kind, id);

        VpcRoute {
            destination,
            state,
            target: finish_label(target, state),
        }
    }

    fn resolve_vpc_target(&self, kind: TargetKind, id: Option<String>) -> RouteTarget {
        let family = match kind {
            TargetKind::InternetGateway => Some(ResourceFamily::InternetGateway),
            TargetKind::NatGateway => Some(ResourceFamily::NatGateway),
            TargetKind::TransitGateway => Some(ResourceFamily::TransitGateway),
            TargetKind::VpcPeering => Some(ResourceFamily::VpcPeering),
            _ => None,
        };
        let status = match (family, id.as_deref()) {
            (Some(family), Some(target_id)) => {
                if family == ResourceFamily::TransitGateway
                    && !self.index.attachments_on_tgw(target_id).is_empty()
                {
                    TargetStatus::Resolved
                } else {
                    self.status_of(family, target_id)
                }
            }
            _ => TargetStatus::Unchecked,
        };
        let label = match (&kind, id.as_deref()) {
            (TargetKind::Local, _) => "local".to_string(),
            (_, None) => kind.to_string(),
            (_, Some(target_id)) => format!("{} ({kind})", self.target_name(kind, target_id)),
        };
        RouteTarget {
            kind,
            id,
            status,
            label,
        }
    }

    fn target_name(&self, kind: TargetKind, id: &str) -> String {
        let name = match kind {
            TargetKind::InternetGateway => self
                .index
                .resolve::<RawInternetGateway>(id)
                .and_then(|r| name_tag(&r.tags)),
            TargetKind::NatGateway => self
                .index
                .resolve::<RawNatGateway>(id)
                .and_then(|r| name_tag(&r.tags)),
            TargetKind::TransitGateway => self
                .index
                .resolve::<RawTransitGateway>(id)
                .and_then(|r| name_tag(&r.tags)),
            TargetKind::VpcPeering => self
                .index
                .resolve::<RawVpcPeering>(id)
                .and_then(|r| name_tag(&r.tags)),
            _ => None,
        };
        name.unwrap_or(id).to_string()
    }

    fn subnet(&self, subnet: &RawSubnet, route_tables: &[VpcRouteTableNode]) -> SubnetNode {
        let id = subnet.subnet_id.as_str();
        let (route_table_id, route_table_source) = match self.index.explicit_route_table(id) {
            Some(table) => (Some(table), Some(RouteTableSource::Explicit)),
            None => match self.index.main_route_table(&subnet.vpc_id) {
                Some(table) => (Some(table), Some(RouteTableSource::Main)),
                None => (None, None),
            },
        };
        let routes = route_table_id
            .and_then(|t| route_tables.iter().find(|rt| rt.id == t))
            .map(|rt| rt.routes.as_slice());

        SubnetNode {
            id: id.to_string(),
            vpc_id: subnet.vpc_id.clone(),
            name: name_or_id(&subnet.tags, id),
            cidr: subnet.cidr_block.as_deref().and_then(|c| Ipv4::new(c).ok()),
            availability_zone: subnet.availability_zone.clone(),
            route_table_id: route_table_id.map(str::to_string),
            route_table_source,
            kind: subnet_kind(routes),
        }
    }

    fn peerings(&self) -> BTreeMap<String, PeeringNode> {
        self.index
            .all::<RawVpcPeering>()
            .into_iter()
            .map(|pcx| {
                let id = pcx.vpc_peering_connection_id.clone();
                let node = PeeringNode {
                    name: name_or_id(&pcx.tags, &id),
                    status: pcx.status.code.clone(),
                    requester_vpc_id: pcx.requester_vpc_info.vpc_id.clone(),
                    requester_cidr: pcx.requester_vpc_info.cidr_block.clone(),
                    accepter_vpc_id: pcx.accepter_vpc_info.vpc_id.clone(),
                    accepter_cidr: pcx.accepter_vpc_info.cidr_block.clone(),
                    id: id.clone(),
                };
                (id, node)
            })
            .collect()
    }

    fn vpn_connections(&self) -> BTreeMap<String, VpnNode> {
        self.index
            .all::<RawVpnConnection>()
            .into_iter()
            .map(|vpn| {
                let id = vpn.vpn_connection_id.clone();
                let tunnels: Vec<VpnTunnel> = vpn
                    .vgw_telemetry
                    .iter()
                    .map(|t| VpnTunnel {
                        outside_ip: t.outside_ip_address.clone(),
                        up: tunnel_is_up(&t.status),
                        status_message: t.status_message.clone(),
                        accepted_route_count: t.accepted_route_count,
                        last_status_change: t.last_status_change.clone(),
                    })
                    .collect();
                let up = tunnels.iter().filter(|t| t.up).count();
                let customer_gateway = self
                    .index
                    .resolve::<RawCustomerGateway>(&vpn.customer_gateway_id)
                    .map(|cgw| CustomerGatewayNode {
                        id: cgw.customer_gateway_id.clone(),
                        name: name_or_id(&cgw.tags, &cgw.customer_gateway_id),
                        ip_address: cgw.ip_address.clone(),
                        bgp_asn: cgw.bgp_asn.clone(),
                        state: cgw.state.clone(),
                        device_name: cgw.device_name.clone(),
                    });

                let node = VpnNode {
                    name: name_or_id(&vpn.tags, &id),
                    state: vpn.state.clone(),
                    customer_gateway_id: vpn.customer_gateway_id.clone(),
                    customer_gateway,
                    tgw_id: present(&vpn.transit_gateway_id).map(str::to_string),
                    vpn_gateway_id: present(&vpn.vpn_gateway_id).map(str::to_string),
                    attachment_id: self
                        .index
                        .attachments_for_resource(&id)
                        .first()
                        .map(|a| a.to_string()),
                    health: link_health(up, tunnels.len()),
                    tunnels,
                    static_routes_only: vpn.options.static_routes_only,
                    enable_acceleration: vpn.options.enable_acceleration,
                    local_cidr: any_network(&vpn.options.local_ipv4_network_cidr),
                    remote_cidr: any_network(&vpn.options.remote_ipv4_network_cidr),
                    static_routes: vpn
                        .routes
                        .iter()
                        .map(|r| r.destination_cidr_block.clone())
                        .collect(),
                    id: id.clone(),
                };
                (id, node)
            })
            .collect()
    }

    fn dx_connections(&self) -> BTreeMap<String, DxConnectionNode> {
        self.index
            .all::<RawDxConnection>()
            .into_iter()
            .map(|conn| {
                let id = conn.connection_id.clone();
                let aws_device = if conn.aws_device_v2.is_empty() {
                    conn.aws_device.clone()
                } else {
                    conn.aws_device_v2.clone()
                };
                let node = DxConnectionNode {
                    name: or_id(&conn.connection_name, &id),
                    state: conn.connection_state.clone(),
                    location: conn.location.clone(),
                    bandwidth: conn.bandwidth.clone(),
                    vlan: conn.vlan,
                    partner_name: conn.partner_name.clone(),
                    provider_name: conn.provider_name.clone(),
                    has_logical_redundancy: has_logical_redundancy(&conn.has_logical_redundancy),
                    aws_device,
                    vif_ids: owned(self.index.vifs_on_connection(&id)),
                    id: id.clone(),
                };
                (id, node)
            })
            .collect()
    }

    fn dx_gateways(&self) -> BTreeMap<String, DxGatewayNode> {
        self.index
            .all::<RawDxGateway>()
            .into_iter()
            .map(|gw| {
                let id = gw.direct_connect_gateway_id.clone();
                let node = DxGatewayNode {
                    name: or_id(&gw.direct_connect_gateway_name, &id),
                    amazon_asn: gw.amazon_side_asn,
                    owner_account: gw.owner_account.clone(),
                    state: gw.direct_connect_gateway_state.clone(),
                    vif_ids: owned(self.index.vifs_on_dx_gateway(&id)),
                    attachment_ids: owned(self.index.attachments_for_resource(&id)),
                    id: id.clone(),
                };
                (id, node)
            })
            .collect()
    }

    fn dx_vifs(&self) -> BTreeMap<String, DxVifNode> {
        self.index
            .all::<RawDxVif>()
            .into_iter()
            .map(|vif| {
                let id = vif.virtual_interface_id.clone();
                let bgp_peers: Vec<BgpPeer> = vif
                    .bgp_peers
                    .iter()
                    .map(|p| BgpPeer {
                        peer_id: p.bgp_peer_id.clone(),
                        asn: p.asn,
                        amazon_address: p.amazon_address.clone(),
                        customer_address: p.customer_address.clone(),
                        state: p.bgp_peer_state.clone(),
                        up: bgp_peer_is_up(&p.bgp_status),
                    })
                    .collect();
                let up = bgp_peers.iter().filter(|p| p.up).count();
                let dx_gateway_id = present(&vif.direct_connect_gateway_id).map(str::to_string);
                // Only transit VIFs reach a TGW, through their DX gateway's attachment.
                let attachment_id = dx_gateway_id
                    .as_deref()
                    .filter(|_| vif.virtual_interface_type == "transit")
                    .and_then(|gw| self.index.attachments_for_resource(gw).first())
                    .map(|a| a.to_string());

                let node = DxVifNode {
                    name: or_id(&vif.virtual_interface_name, &id),
                    vif_type: vif.virtual_interface_type.clone(),
                    state: vif.virtual_interface_state.clone(),
                    connection_id: vif.connection_id.clone(),
                    vlan: vif.vlan,
                    customer_asn: vif.asn,
                    amazon_asn: vif.amazon_side_asn,
                    amazon_address: vif.amazon_address.clone(),
                    customer_address: vif.customer_address.clone(),
                    mtu: vif.mtu.unwrap_or(DEFAULT_VIF_MTU),
                    jumbo_capable: vif.jumbo_frame_capable,
                    bgp_health: link_health(up, bgp_peers.len()),
                    bgp_peers,
                    dx_gateway_id,
                    virtual_gateway_id: present(&vif.virtual_gateway_id).map(str::to_string),
                    attachment_id,
                    route_filter_prefixes: vif
                        .route_filter_prefixes
                        .iter()
                        .map(|p| p.cidr.clone())
                        .filter(|c| !c.is_empty())
                        .collect(),
                    id: id.clone(),
                };
                (id, node)
            })
            .collect()
    }

    /// Hub when the viewer owns the TGW behind at least one visible route table.
    fn visibility(
        &self,
        attachments: &BTreeMap<String, AttachmentNode>,
        vpns: &BTreeMap<String, VpnNode>,
    ) -> Visibility {
        let owns_route_tables = self.index.all::<RawTgwRouteTable>().iter().any(|table| {
            self.index
                .resolve::<RawTransitGateway>(&table.transit_gateway_id)
                .is_some_and(|tgw| self.viewer.map_or(true, |viewer| tgw.owner_id == viewer))
        });
        if owns_route_tables {
            return Visibility::Hub;
        }

        let referenced_tgw_ids: BTreeSet<String> = attachments
            .values()
            .map(|a| a.tgw_id.clone())
            .chain(vpns.values().filter_map(|v| v.tgw_id.clone()))
            .filter(|id| !id.is_empty())
            .collect();
        Visibility::Spoke {
            referenced_tgw_ids: referenced_tgw_ids.into_iter().collect(),
        }
    }

    /// `Resolved` if present, `Unresolved` if the family has records but not
    /// this one, `Unchecked` if the family is empty. Used for VPC route
    /// targets, whose families may be legitimately absent from a snapshot.
    fn status_of(&self, family: ResourceFamily, id: &str) -> TargetStatus {
        if self.index.contains(family, id) {
            TargetStatus::Resolved
        } else if self.index.family_len(family) == 0 {
            TargetStatus::Unchecked
        } else {
            TargetStatus::Unresolved
        }
    }

    fn prefix_list_destination(&self, id: &str) -> Destination {
        Destination::PrefixList {
            id: id.to_string(),
            name: self
                .index
                .resolve::<RawPrefixList>(id)
                .map(|pl| prefix_list_label(&pl.prefix_list_name)),
        }
    }
}

fn first_attachment(route: &RawTgwRoute) -> Option<&str> {
    route
        .transit_gateway_attachments
        .iter()
        .find_map(|a| present(&a.transit_gateway_attachment_id))
}

fn linked_attachments(links: &[RawTgwRouteTableLink], state: &str) -> Vec<String> {
    let ids: BTreeSet<String> = links
        .iter()
        .filter(|l| l.state == state)
        .filter_map(|l| present(&l.transit_gateway_attachment_id).map(str::to_string))
        .collect();
    ids.into_iter().collect()
}

/// A missing state reads as active: `local` VPC routes are exported without one.
fn route_state(state: &str) -> RouteState {
    match state {
        "" | "active" => RouteState::Active,
        "blackhole" => RouteState::Blackhole,
        "pending" => RouteState::Pending,
        "deleting" => RouteState::Deleting,
        "deleted" => RouteState::Deleted,
        other => {
            log::debug!("Unknown route state '{other}'");
            RouteState::Unknown
        }
    }
}

fn cidr_destination(text: &str) -> Destination {
    match Ipv4::new(text) {
        Ok(cidr) => Destination::Cidr { cidr },
        Err(_) => Destination::Other {
            value: text.to_string(),
        },
    }
}

/// Blackhole and unresolved targets are labelled by what went wrong.
fn finish_label(mut target: RouteTarget, state: RouteState) -> RouteTarget {
    if state == RouteState::Blackhole {
        target.label = "blackhole".to_string();
    } else if target.is_unresolved() {
        if let Some(id) = &target.id {
            target.label = format!("unresolved {id}");
        }
    }
    target
}

/// Primary CIDR plus every associated secondary CIDR, without repeats.
fn vpc_cidrs(vpc: &RawVpc) -> Vec<Ipv4> {
    let associated = vpc
        .cidr_block_association_set
        .iter()
        .filter(|a| {
            a.cidr_block_state
                .as_ref()
                .map_or(true, |s| s.state == "associated")
        })
        .filter_map(|a| a.cidr_block.as_deref());

    let mut cidrs: Vec<Ipv4> = Vec::new();
    for text in vpc.cidr_block.as_deref().into_iter().chain(associated) {
        match Ipv4::new(text) {
            Ok(cidr) if !cidrs.contains(&cidr) => cidrs.push(cidr),
            Ok(_) => {}
            Err(e) => log::warn!("VPC {}: ignoring CIDR '{text}': {e}", vpc.vpc_id),
        }
    }
    cidrs
}

fn name_or_id(tags: &[Tag], id: &str) -> String {
    name_tag(tags).unwrap_or(id).to_string()
}

fn or_id(name: &str, id: &str) -> String {
    let name = if name.is_empty() { id } else { name };
    name.to_string()
}

fn any_network(cidr: &Option<String>) -> String {
    present(cidr).unwrap_or("0.0.0.0/0").to_string()
}

fn owned(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DuplicateKeyPolicy;
    use crate::models::{LinkHealth, SubnetKind};
    use crate::snapshot::{load_snapshot, Snapshot};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn snapshot(pairs: Vec<(&str, Value)>) -> Snapshot {
        let docs: HashMap<String, String> = pairs
            .into_iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        load_snapshot(&docs, false)
    }

    fn build(snapshot: &Snapshot, viewer: Option<&str>) -> Topology {
        let index = ResourceIndex::build(snapshot, DuplicateKeyPolicy::default());
        build_topology(&index, viewer)
    }

    fn hub_documents() -> Vec<(&'static str, Value)> {
        vec![
            (
                "transit-gateways",
                json!({"TransitGateways": [{"TransitGatewayId": "tgw-1", "OwnerId": "111", "Options": {"AmazonSideAsn": 64512}}]}),
            ),
            (
                "transit-gateway-route-tables",
                json!({"TransitGatewayRouteTables": [{"TransitGatewayRouteTableId": "tgw-rtb-1", "TransitGatewayId": "tgw-1"}]}),
            ),
            (
                "transit-gateway-attachments",
                json!({"TransitGatewayAttachments": [
                    {"TransitGatewayAttachmentId": "tgw-attach-local", "TransitGatewayId": "tgw-1",
                     "ResourceType": "vpc", "ResourceId": "vpc-1", "ResourceOwnerId": "111"},
                    {"TransitGatewayAttachmentId": "tgw-attach-remote", "TransitGatewayId": "tgw-1",
                     "ResourceType": "vpc", "ResourceId": "vpc-remote", "ResourceOwnerId": "222",
                     "Association": {"TransitGatewayRouteTableId": "tgw-rtb-1", "State": "associated"}}
                ]}),
            ),
            (
                "routes-tgw-rtb-1",
                json!({"Routes": [
                    {"DestinationCidrBlock": "10.20.0.0/16", "Type": "propagated", "State": "active",
                     "TransitGatewayAttachments": [{"TransitGatewayAttachmentId": "tgw-attach-remote"}]},
                    {"DestinationCidrBlock": "10.99.0.0/16", "Type": "static", "State": "active",
                     "TransitGatewayAttachments": [{"TransitGatewayAttachmentId": "tgw-attach-gone"}]},
                    {"DestinationCidrBlock": "10.1.0.0/16", "Type": "static", "State": "blackhole"}
                ]}),
            ),
            (
                "associations-tgw-rtb-1",
                json!({"Associations": [{"TransitGatewayAttachmentId": "tgw-attach-local", "State": "associated"}]}),
            ),
            (
                "propagations-tgw-rtb-1",
                json!({"TransitGatewayRouteTablePropagations": [
                    {"TransitGatewayAttachmentId": "tgw-attach-remote", "State": "enabled"},
                    {"TransitGatewayAttachmentId": "tgw-attach-local", "State": "disabled"}
                ]}),
            ),
            (
                "vpcs",
                json!({"Vpcs": [{"VpcId": "vpc-1", "CidrBlock": "10.0.0.0/16",
                    "CidrBlockAssociationSet": [
                        {"CidrBlock": "10.0.0.0/16", "CidrBlockState": {"State": "associated"}},
                        {"CidrBlock": "100.64.0.0/16", "CidrBlockState": {"State": "associated"}},
                        {"CidrBlock": "100.65.0.0/16", "CidrBlockState": {"State": "disassociated"}}
                    ],
                    "Tags": [{"Key": "Name", "Value": "shared"}]}]}),
            ),
            (
                "subnets",
                json!({"Subnets": [
                    {"SubnetId": "subnet-pub", "VpcId": "vpc-1", "CidrBlock": "10.0.1.0/24"},
                    {"SubnetId": "subnet-tgw", "VpcId": "vpc-1", "CidrBlock": "10.0.2.0/24"},
                    {"SubnetId": "subnet-orphan", "VpcId": "vpc-404"}
                ]}),
            ),
            (
                "vpc-route-tables",
                json!({"RouteTables": [
                    {"RouteTableId": "rtb-main", "VpcId": "vpc-1", "Associations": [{"Main": true}],
                     "Routes": [
                        {"DestinationCidrBlock": "10.0.0.0/16", "GatewayId": "local", "State": "active"},
                        {"DestinationCidrBlock": "0.0.0.0/0", "TransitGatewayId": "tgw-1", "State": "active"}
                     ]},
                    {"RouteTableId": "rtb-pub", "VpcId": "vpc-1", "Associations": [{"SubnetId": "subnet-pub"}],
                     "Routes": [
                        {"DestinationCidrBlock": "0.0.0.0/0", "GatewayId": "igw-1", "State": "active"},
                        {"DestinationCidrBlock": "172.16.0.0/12", "VpcPeeringConnectionId": "pcx-gone", "State": "blackhole"}
                     ]}
                ]}),
            ),
            (
                "internet-gateways",
                json!({"InternetGateways": [{"InternetGatewayId": "igw-1", "Attachments": [{"VpcId": "vpc-1"}]}]}),
            ),
        ]
    }

    #[test]
    fn test_empty_snapshot_builds_empty_topology() {
        let topology = build(&Snapshot::default(), None);
        assert!(topology.is_empty());
        assert_eq!(topology.visibility, Visibility::default());
    }

    #[test]
    fn test_hub_mode_and_attachments() {
        let snapshot = snapshot(hub_documents());
        let topology = build(&snapshot, Some("111"));

        assert!(topology.visibility.is_hub());

        let local = &topology.attachments["tgw-attach-local"];
        assert_eq!(local.resource, AttachmentResource::Vpc("vpc-1".to_string()));
        assert_eq!(local.visibility, AttachmentVisibility::Resolved);
        assert!(!local.cross_account);
        assert_eq!(local.name, "shared");
        assert_eq!(local.associated_route_table.as_deref(), Some("tgw-rtb-1"));
        assert!(local.propagates_to.is_empty());
        assert_eq!(local.tgw_owner_id, "111");
        assert_eq!(
            local.cidrs,
            vec![
                Ipv4::new("10.0.0.0/16").unwrap(),
                Ipv4::new("100.64.0.0/16").unwrap()
            ]
        );

        let remote = &topology.attachments["tgw-attach-remote"];
        assert_eq!(
            remote.resource,
            AttachmentResource::Unresolved("vpc-remote".to_string())
        );
        assert_eq!(remote.visibility, AttachmentVisibility::ReferencedOnly);
        assert!(remote.cross_account);
        // Falls back to the raw Association field.
        assert_eq!(remote.associated_route_table.as_deref(), Some("tgw-rtb-1"));
        assert_eq!(remote.propagates_to, vec!["tgw-rtb-1".to_string()]);
        assert_eq!(remote.cidrs, vec![Ipv4::new("10.20.0.0/16").unwrap()]);

        assert_eq!(topology.cross_account_attachments().count(), 1);
        assert_eq!(
            topology.transit_gateways["tgw-1"].route_table_ids,
            vec!["tgw-rtb-1".to_string()]
        );
    }

    #[test]
    fn test_tgw_route_targets() {
        let snapshot = snapshot(hub_documents());
        let topology = build(&snapshot, Some("111"));
        let table = &topology.tgw_route_tables["tgw-rtb-1"];

        assert_eq!(table.associations, vec!["tgw-attach-local".to_string()]);
        assert_eq!(table.propagations, vec!["tgw-attach-remote".to_string()]);
        assert_eq!(table.routes.len(), 3);

        let propagated = &table.routes[0];
        assert_eq!(propagated.route_type, RouteType::Propagated);
        assert_eq!(propagated.target.status, TargetStatus::Resolved);
        assert_eq!(propagated.target.label, "tgw-attach-remote (vpc)");

        let dangling = &table.routes[1];
        assert_eq!(dangling.target.status, TargetStatus::Unresolved);
        assert_eq!(dangling.target.label, "unresolved tgw-attach-gone");

        let blackhole = &table.routes[2];
        assert_eq!(blackhole.state, RouteState::Blackhole);
        assert_eq!(blackhole.target.label, "blackhole");
        assert_eq!(blackhole.target.id, None);
    }

    #[test]
    fn test_subnets_and_vpc_routes() {
        let snapshot = snapshot(hub_documents());
        let topology = build(&snapshot, Some("111"));
        let vpc = &topology.vpcs["vpc-1"];

        assert_eq!(vpc.igw_id.as_deref(), Some("igw-1"));
        assert_eq!(vpc.main_route_table_id.as_deref(), Some("rtb-main"));
        assert_eq!(vpc.tgw_attachment_ids, vec!["tgw-attach-local".to_string()]);
        assert!(vpc.resolved);
        assert_eq!(topology.subnets().count(), 3);

        let missing = &topology.vpcs["vpc-404"];
        assert!(!missing.resolved, "kept as a placeholder");
        assert_eq!(missing.subnets[0].id, "subnet-orphan");
        assert_eq!(missing.subnets[0].kind, SubnetKind::Isolated);

        let public = vpc.subnets.iter().find(|s| s.id == "subnet-pub").unwrap();
        assert_eq!(public.kind, SubnetKind::Public);
        assert_eq!(public.route_table_source, Some(RouteTableSource::Explicit));

        let tgw = vpc.subnets.iter().find(|s| s.id == "subnet-tgw").unwrap();
        assert_eq!(tgw.kind, SubnetKind::Tgw);
        assert_eq!(tgw.route_table_id.as_deref(), Some("rtb-main"));
        assert_eq!(tgw.route_table_source, Some(RouteTableSource::Main));

        let main = vpc.route_tables.iter().find(|t| t.id == "rtb-main").unwrap();
        assert!(main.is_main);
        assert_eq!(main.routes[0].target.label, "local");
        assert_eq!(main.routes[1].target.status, TargetStatus::Resolved);
        assert_eq!(main.routes[1].target.label, "tgw-1 (transit-gateway)");

        let public_table = vpc.route_tables.iter().find(|t| t.id == "rtb-pub").unwrap();
        assert_eq!(public_table.subnet_ids, vec!["subnet-pub".to_string()]);
        // The peering family is empty, so the target cannot be checked.
        assert_eq!(public_table.routes[1].target.status, TargetStatus::Unchecked);
        assert_eq!(public_table.routes[1].target.label, "blackhole");
    }

    #[test]
    fn test_spoke_mode_lists_referenced_tgws() {
        let snapshot = snapshot(vec![(
            "transit-gateway-attachments",
            json!({"TransitGatewayAttachments": [
                {"TransitGatewayAttachmentId": "tgw-attach-1", "TransitGatewayId": "tgw-0abc",
                 "ResourceType": "vpc", "ResourceId": "vpc-1", "ResourceOwnerId": "222"}
            ]}),
        )]);
        let topology = build(&snapshot, Some("222"));
        assert_eq!(
            topology.visibility,
            Visibility::Spoke {
                referenced_tgw_ids: vec!["tgw-0abc".to_string()]
            }
        );
    }

    #[test]
    fn test_route_tables_of_foreign_tgw_are_spoke() {
        let mut docs = hub_documents();
        docs.retain(|(name, _)| name.starts_with("transit-gateway"));
        let snapshot = snapshot(docs);
        let topology = build(&snapshot, Some("999"));
        assert!(!topology.visibility.is_hub());
        assert_eq!(topology.visibility.referenced_tgw_ids(), &["tgw-1".to_string()]);
    }

    #[test]
    fn test_unknown_viewer_is_never_cross_account() {
        let snapshot = snapshot(hub_documents());
        let topology = build(&snapshot, None);
        assert_eq!(topology.cross_account_attachments().count(), 0);
    }

    #[test]
    fn test_vpn_and_dx_health() {
        let snapshot = snapshot(vec![
            (
                "vpn-connections",
                json!({"VpnConnections": [{"VpnConnectionId": "vpn-1", "CustomerGatewayId": "cgw-1",
                    "TransitGatewayId": "tgw-1",
                    "VgwTelemetry": [{"OutsideIpAddress": "1.1.1.1", "Status": "UP"},
                                     {"OutsideIpAddress": "2.2.2.2", "Status": "DOWN"}]}]}),
            ),
            (
                "customer-gateways",
                json!({"CustomerGateways": [{"CustomerGatewayId": "cgw-1", "BgpAsn": "65000", "IpAddress": "203.0.113.1"}]}),
            ),
            (
                "dx-gateways",
                json!({"directConnectGateways": [{"directConnectGatewayId": "dxgw-1", "amazonSideAsn": 64512}]}),
            ),
            (
                "dx-vifs",
                json!({"virtualInterfaces": [
                    {"virtualInterfaceId": "dxvif-1", "virtualInterfaceType": "transit",
                     "directConnectGatewayId": "dxgw-1", "connectionId": "dxcon-1",
                     "bgpPeers": [{"bgpStatus": "down"}, {"bgpStatus": "down"}]},
                    {"virtualInterfaceId": "dxvif-2", "virtualInterfaceType": "private", "mtu": 9001}
                ]}),
            ),
            (
                "transit-gateway-attachments",
                json!({"TransitGatewayAttachments": [
                    {"TransitGatewayAttachmentId": "tgw-attach-dx", "TransitGatewayId": "tgw-1",
                     "ResourceType": "direct-connect-gateway", "ResourceId": "dxgw-1"}
                ]}),
            ),
        ]);
        let topology = build(&snapshot, None);

        let vpn = &topology.vpn_connections["vpn-1"];
        assert_eq!(vpn.health, LinkHealth::Partial);
        assert_eq!(vpn.tunnels_up(), 1);
        assert_eq!(vpn.customer_gateway.as_ref().unwrap().bgp_asn, "65000");
        assert_eq!(vpn.local_cidr, "0.0.0.0/0");

        let vif = &topology.dx_vifs["dxvif-1"];
        assert_eq!(vif.bgp_health, LinkHealth::Down);
        assert_eq!(vif.attachment_id.as_deref(), Some("tgw-attach-dx"));
        assert_eq!(vif.mtu, 1500);
        assert_eq!(topology.dx_vifs["dxvif-2"].mtu, 9001);
        assert_eq!(
            topology.dx_vifs["dxvif-2"].bgp_health,
            LinkHealth::None
        );

        let gateway = &topology.dx_gateways["dxgw-1"];
        assert_eq!(gateway.vif_ids, vec!["dxvif-1".to_string()]);
        assert_eq!(gateway.attachment_ids, vec!["tgw-attach-dx".to_string()]);
        assert_eq!(
            topology.attachments["tgw-attach-dx"].resource,
            AttachmentResource::DxGateway("dxgw-1".to_string())
        );
    }

    #[test]
    fn test_prefix_list_destination() {
        let snapshot = snapshot(vec![
            (
                "prefix-lists",
                json!({"PrefixLists": [{"PrefixListId": "pl-1", "PrefixListName": "com.amazonaws.us-east-1.s3"}]}),
            ),
            ("vpcs", json!({"Vpcs": [{"VpcId": "vpc-1"}]})),
            (
                "vpc-route-tables",
                json!({"RouteTables": [{"RouteTableId": "rtb-1", "VpcId": "vpc-1", "Routes": [
                    {"DestinationPrefixListId": "pl-1", "GatewayId": "vpce-1", "State": "active"}
                ]}]}),
            ),
        ]);
        let topology = build(&snapshot, None);
        let route = &topology.vpcs["vpc-1"].route_tables[0].routes[0];
        assert_eq!(
            route.destination,
            Destination::PrefixList {
                id: "pl-1".to_string(),
                name: Some("s3".to_string())
            }
        );
        assert_eq!(route.target.kind, TargetKind::VpcEndpoint);
        assert_eq!(route.target.status, TargetStatus::Unchecked);
    }

    #[test]
    fn test_route_tables_of_missing_vpc_are_kept() {
        let snapshot = snapshot(vec![
            (
                "subnets",
                json!({"Subnets": [{"SubnetId": "subnet-1", "VpcId": "vpc-1", "CidrBlock": "10.0.1.0/24"}]}),
            ),
            (
                "vpc-route-tables",
                json!({"RouteTables": [
                    {"RouteTableId": "rtb-1", "VpcId": "vpc-1", "Associations": [{"Main": true}],
                     "Routes": [{"DestinationCidrBlock": "172.16.0.0/12", "VpcPeeringConnectionId": "pcx-1", "State": "blackhole"}]}
                ]}),
            ),
        ]);
        let topology = build(&snapshot, None);

        let vpc = &topology.vpcs["vpc-1"];
        assert!(!vpc.resolved);
        assert!(vpc.cidrs.is_empty());
        assert_eq!(vpc.main_route_table_id.as_deref(), Some("rtb-1"));
        assert_eq!(vpc.route_tables[0].routes[0].state, RouteState::Blackhole);
        assert_eq!(vpc.subnets[0].route_table_id.as_deref(), Some("rtb-1"));
    }

    #[test]
    fn test_tgw_route_to_unlisted_attachment_is_unresolved() {
        let snapshot = snapshot(vec![
            (
                "transit-gateway-route-tables",
                json!({"TransitGatewayRouteTables": [{"TransitGatewayRouteTableId": "tgw-rtb-1", "TransitGatewayId": "tgw-1"}]}),
            ),
            (
                "routes-tgw-rtb-1",
                json!({"Routes": [
                    {"DestinationCidrBlock": "10.5.0.0/16", "Type": "static", "State": "active",
                     "TransitGatewayAttachments": [{"TransitGatewayAttachmentId": "tgw-attach-deleted"}]}
                ]}),
            ),
        ]);
        let topology = build(&snapshot, None);
        let target = &topology.tgw_route_tables["tgw-rtb-1"].routes[0].target;
        assert_eq!(target.status, TargetStatus::Unresolved);
        assert_eq!(target.label, "unresolved tgw-attach-deleted");
    }

    #[test]
    fn test_route_states() {
        assert_eq!(route_state("active"), RouteState::Active);
        assert_eq!(route_state(""), RouteState::Active);
        assert_eq!(route_state("blackhole"), RouteState::Blackhole);
        assert_eq!(route_state("deleted"), RouteState::Deleted);
        assert_eq!(route_state("pending"), RouteState::Pending);
        assert_eq!(route_state("rerouted"), RouteState::Unknown);
    }
}
