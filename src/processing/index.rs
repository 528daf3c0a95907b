//! Identifier index over a loaded snapshot.
//!
//! Every resource family gets a map from its natural key to the parsed record,
//! plus the foreign-key groupings the topology builder needs. All lookups borrow
//! from the [`Snapshot`]; nothing is copied.

use crate::config::DuplicateKeyPolicy;
use crate::models::aws::*;
use crate::models::{ResourceFamily, Warning};
use crate::snapshot::Snapshot;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

/// Natural key to record, for one family.
pub type FamilyTable<'a, R> = HashMap<&'a str, &'a R>;

type Grouping<'a, T> = HashMap<&'a str, Vec<T>>;

/// A record type that lives in the index under its natural key.
pub trait Indexed: Sized + 'static {
    const FAMILY: ResourceFamily;

    fn key(&self) -> &str;

    fn table<'i, 'a>(index: &'i ResourceIndex<'a>) -> &'i FamilyTable<'a, Self>;
}

macro_rules! indexed {
    ($record:ty, $family:ident, $table:ident, $key:ident) => {
        impl Indexed for $record {
            const FAMILY: ResourceFamily = ResourceFamily::$family;

            fn key(&self) -> &str {
                &self.$key
            }

            fn table<'i, 'a>(index: &'i ResourceIndex<'a>) -> &'i FamilyTable<'a, Self> {
                &index.$table
            }
        }
    };
}

indexed!(RawTransitGateway, TransitGateway, transit_gateways, transit_gateway_id);
indexed!(RawTgwAttachment, TgwAttachment, tgw_attachments, transit_gateway_attachment_id);
indexed!(RawTgwRouteTable, TgwRouteTable, tgw_route_tables, transit_gateway_route_table_id);
indexed!(RawVpc, Vpc, vpcs, vpc_id);
indexed!(RawSubnet, Subnet, subnets, subnet_id);
indexed!(RawVpcRouteTable, VpcRouteTable, vpc_route_tables, route_table_id);
indexed!(RawInternetGateway, InternetGateway, internet_gateways, internet_gateway_id);
indexed!(RawNatGateway, NatGateway, nat_gateways, nat_gateway_id);
indexed!(RawVpcPeering, VpcPeering, vpc_peerings, vpc_peering_connection_id);
indexed!(RawVpnConnection, VpnConnection, vpn_connections, vpn_connection_id);
indexed!(RawCustomerGateway, CustomerGateway, customer_gateways, customer_gateway_id);
indexed!(RawDxConnection, DxConnection, dx_connections, connection_id);
indexed!(RawDxGateway, DxGateway, dx_gateways, direct_connect_gateway_id);
indexed!(RawDxVif, DxVif, dx_vifs, virtual_interface_id);
indexed!(RawPrefixList, PrefixList, prefix_lists, prefix_list_id);

/// Runs `$body` with `$table` bound to the family table selected by `$family`.
macro_rules! with_family_table {
    ($index:expr, $family:expr, |$table:ident| $body:expr) => {
        match $family {
            ResourceFamily::TransitGateway => { let $table = &$index.transit_gateways; $body }
            ResourceFamily::TgwAttachment => { let $table = &$index.tgw_attachments; $body }
            ResourceFamily::TgwRouteTable => { let $table = &$index.tgw_route_tables; $body }
            ResourceFamily::Vpc => { let $table = &$index.vpcs; $body }
            ResourceFamily::Subnet => { let $table = &$index.subnets; $body }
            ResourceFamily::VpcRouteTable => { let $table = &$index.vpc_route_tables; $body }
            ResourceFamily::InternetGateway => { let $table = &$index.internet_gateways; $body }
            ResourceFamily::NatGateway => { let $table = &$index.nat_gateways; $body }
            ResourceFamily::VpcPeering => { let $table = &$index.vpc_peerings; $body }
            ResourceFamily::VpnConnection => { let $table = &$index.vpn_connections; $body }
            ResourceFamily::CustomerGateway => { let $table = &$index.customer_gateways; $body }
            ResourceFamily::DxConnection => { let $table = &$index.dx_connections; $body }
            ResourceFamily::DxGateway => { let $table = &$index.dx_gateways; $body }
            ResourceFamily::DxVif => { let $table = &$index.dx_vifs; $body }
            ResourceFamily::PrefixList => { let $table = &$index.prefix_lists; $body }
        }
    };
}

/// Lookup tables for one snapshot.
#[derive(Debug)]
pub struct ResourceIndex<'a> {
    snapshot: &'a Snapshot,

    transit_gateways: FamilyTable<'a, RawTransitGateway>,
    tgw_attachments: FamilyTable<'a, RawTgwAttachment>,
    tgw_route_tables: FamilyTable<'a, RawTgwRouteTable>,
    vpcs: FamilyTable<'a, RawVpc>,
    subnets: FamilyTable<'a, RawSubnet>,
    vpc_route_tables: FamilyTable<'a, RawVpcRouteTable>,
    internet_gateways: FamilyTable<'a, RawInternetGateway>,
    nat_gateways: FamilyTable<'a, RawNatGateway>,
    vpc_peerings: FamilyTable<'a, RawVpcPeering>,
    vpn_connections: FamilyTable<'a, RawVpnConnection>,
    customer_gateways: FamilyTable<'a, RawCustomerGateway>,
    dx_connections: FamilyTable<'a, RawDxConnection>,
    dx_gateways: FamilyTable<'a, RawDxGateway>,
    dx_vifs: FamilyTable<'a, RawDxVif>,
    prefix_lists: FamilyTable<'a, RawPrefixList>,

    subnets_by_vpc: Grouping<'a, &'a RawSubnet>,
    route_tables_by_vpc: Grouping<'a, &'a RawVpcRouteTable>,
    explicit_route_table: HashMap<&'a str, &'a str>,
    main_route_table: HashMap<&'a str, &'a str>,
    igw_by_vpc: HashMap<&'a str, &'a str>,
    nats_by_vpc: Grouping<'a, &'a str>,
    attachments_by_resource: Grouping<'a, &'a str>,
    attachments_by_tgw: Grouping<'a, &'a str>,
    vifs_by_dx_gateway: Grouping<'a, &'a str>,
    vifs_by_connection: Grouping<'a, &'a str>,

    warnings: Vec<Warning>,
}

impl<'a> ResourceIndex<'a> {
    /// Index every family of `snapshot`.
    ///
    /// # Arguments
    /// * `snapshot` - The loaded snapshot; the index borrows from it
    /// * `policy` - Which record to keep when two share an id
    pub fn build(snapshot: &'a Snapshot, policy: DuplicateKeyPolicy) -> ResourceIndex<'a> {
        let mut warnings = Vec::new();
        let mut index = ResourceIndex {
            snapshot,
            transit_gateways: table(&snapshot.transit_gateways, policy, &mut warnings),
            tgw_attachments: table(&snapshot.tgw_attachments, policy, &mut warnings),
            tgw_route_tables: table(&snapshot.tgw_route_tables, policy, &mut warnings),
            vpcs: table(&snapshot.vpcs, policy, &mut warnings),
            subnets: table(&snapshot.subnets, policy, &mut warnings),
            vpc_route_tables: table(&snapshot.vpc_route_tables, policy, &mut warnings),
            internet_gateways: table(&snapshot.internet_gateways, policy, &mut warnings),
            nat_gateways: table(&snapshot.nat_gateways, policy, &mut warnings),
            vpc_peerings: table(&snapshot.vpc_peerings, policy, &mut warnings),
            vpn_connections: table(&snapshot.vpn_connections, policy, &mut warnings),
            customer_gateways: table(&snapshot.customer_gateways, policy, &mut warnings),
            dx_connections: table(&snapshot.dx_connections, policy, &mut warnings),
            dx_gateways: table(&snapshot.dx_gateways, policy, &mut warnings),
            dx_vifs: table(&snapshot.dx_vifs, policy, &mut warnings),
            prefix_lists: table(&snapshot.prefix_lists, policy, &mut warnings),
            subnets_by_vpc: HashMap::new(),
            route_tables_by_vpc: HashMap::new(),
            explicit_route_table: HashMap::new(),
            main_route_table: HashMap::new(),
            igw_by_vpc: HashMap::new(),
            nats_by_vpc: HashMap::new(),
            attachments_by_resource: HashMap::new(),
            attachments_by_tgw: HashMap::new(),
            vifs_by_dx_gateway: HashMap::new(),
            vifs_by_connection: HashMap::new(),
            warnings: Vec::new(),
        };
        index.group();
        warnings.sort();
        index.warnings = warnings;

        log::info!(
            "Indexed {} records across {} families ({} duplicate ids)",
            index.record_count(),
            ResourceIndex::FAMILIES.len(),
            index.warnings.len()
        );
        index
    }

    /// Every family, in report order.
    pub const FAMILIES: [ResourceFamily; 15] = [
        ResourceFamily::TransitGateway,
        ResourceFamily::TgwAttachment,
        ResourceFamily::TgwRouteTable,
        ResourceFamily::Vpc,
        ResourceFamily::Subnet,
        ResourceFamily::VpcRouteTable,
        ResourceFamily::InternetGateway,
        ResourceFamily::NatGateway,
        ResourceFamily::VpcPeering,
        ResourceFamily::VpnConnection,
        ResourceFamily::CustomerGateway,
        ResourceFamily::DxConnection,
        ResourceFamily::DxGateway,
        ResourceFamily::DxVif,
        ResourceFamily::PrefixList,
    ];

    // Groupings are built from the de-duplicated tables, in key order, so
    // every grouped list is sorted and free of shadowed duplicates.
    fn group(&mut self) {
        for subnet in self.all::<RawSubnet>() {
            self.subnets_by_vpc
                .entry(subnet.vpc_id.as_str())
                .or_default()
                .push(subnet);
        }

        for table in self.all::<RawVpcRouteTable>() {
            self.route_tables_by_vpc
                .entry(table.vpc_id.as_str())
                .or_default()
                .push(table);
            for association in &table.associations {
                if association.main {
                    self.main_route_table
                        .entry(table.vpc_id.as_str())
                        .or_insert(table.route_table_id.as_str());
                }
                if let Some(subnet_id) = non_empty(&association.subnet_id) {
                    self.explicit_route_table
                        .entry(subnet_id)
                        .or_insert(table.route_table_id.as_str());
                }
            }
        }

        for igw in self.all::<RawInternetGateway>() {
            for attachment in &igw.attachments {
                if !attachment.vpc_id.is_empty() {
                    self.igw_by_vpc
                        .entry(attachment.vpc_id.as_str())
                        .or_insert(igw.internet_gateway_id.as_str());
                }
            }
        }

        for nat in self.all::<RawNatGateway>() {
            if !nat.vpc_id.is_empty() {
                self.nats_by_vpc
                    .entry(nat.vpc_id.as_str())
                    .or_default()
                    .push(nat.nat_gateway_id.as_str());
            }
        }

        for attachment in self.all::<RawTgwAttachment>() {
            let id = attachment.transit_gateway_attachment_id.as_str();
            if !attachment.resource_id.is_empty() {
                self.attachments_by_resource
                    .entry(attachment.resource_id.as_str())
                    .or_default()
                    .push(id);
            }
            if !attachment.transit_gateway_id.is_empty() {
                self.attachments_by_tgw
                    .entry(attachment.transit_gateway_id.as_str())
                    .or_default()
                    .push(id);
            }
        }

        for vif in self.all::<RawDxVif>() {
            let id = vif.virtual_interface_id.as_str();
            if let Some(gateway_id) = non_empty(&vif.direct_connect_gateway_id) {
                self.vifs_by_dx_gateway.entry(gateway_id).or_default().push(id);
            }
            if !vif.connection_id.is_empty() {
                self.vifs_by_connection
                    .entry(vif.connection_id.as_str())
                    .or_default()
                    .push(id);
            }
        }
    }

    /// Duplicate-key warnings, sorted.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Typed lookup of one record by natural key.
    pub fn resolve<R: Indexed>(&self, id: &str) -> Option<&'a R> {
        R::table(self).get(id).copied()
    }

    /// Every record of one family, sorted by key.
    pub fn all<R: Indexed>(&self) -> Vec<&'a R> {
        let mut records: Vec<(&'a str, &'a R)> =
            R::table(self).iter().map(|(k, r)| (*k, *r)).collect();
        records.sort_by_key(|(k, _)| *k);
        records.into_iter().map(|(_, r)| r).collect()
    }

    pub fn contains(&self, family: ResourceFamily, id: &str) -> bool {
        with_family_table!(self, family, |table| table.contains_key(id))
    }

    pub fn family_len(&self, family: ResourceFamily) -> usize {
        with_family_table!(self, family, |table| table.len())
    }

    pub fn record_count(&self) -> usize {
        ResourceIndex::FAMILIES
            .iter()
            .map(|family| self.family_len(*family))
            .sum()
    }

    pub fn tgw_routes(&self, route_table_id: &str) -> &'a [RawTgwRoute] {
        per_table(&self.snapshot.tgw_routes, route_table_id)
    }

    pub fn tgw_associations(&self, route_table_id: &str) -> &'a [RawTgwRouteTableLink] {
        per_table(&self.snapshot.tgw_associations, route_table_id)
    }

    pub fn tgw_propagations(&self, route_table_id: &str) -> &'a [RawTgwRouteTableLink] {
        per_table(&self.snapshot.tgw_propagations, route_table_id)
    }

    pub fn subnets_in(&self, vpc_id: &str) -> &[&'a RawSubnet] {
        grouped(&self.subnets_by_vpc, vpc_id)
    }

    pub fn route_tables_in(&self, vpc_id: &str) -> &[&'a RawVpcRouteTable] {
        grouped(&self.route_tables_by_vpc, vpc_id)
    }

    /// Route table explicitly associated with a subnet.
    pub fn explicit_route_table(&self, subnet_id: &str) -> Option<&'a str> {
        self.explicit_route_table.get(subnet_id).copied()
    }

    pub fn main_route_table(&self, vpc_id: &str) -> Option<&'a str> {
        self.main_route_table.get(vpc_id).copied()
    }

    pub fn internet_gateway_of(&self, vpc_id: &str) -> Option<&'a str> {
        self.igw_by_vpc.get(vpc_id).copied()
    }

    pub fn nat_gateways_in(&self, vpc_id: &str) -> &[&'a str] {
        grouped(&self.nats_by_vpc, vpc_id)
    }

    /// Attachment ids whose resource id is `resource_id`.
    pub fn attachments_for_resource(&self, resource_id: &str) -> &[&'a str] {
        grouped(&self.attachments_by_resource, resource_id)
    }

    pub fn attachments_on_tgw(&self, tgw_id: &str) -> &[&'a str] {
        grouped(&self.attachments_by_tgw, tgw_id)
    }

    pub fn vifs_on_dx_gateway(&self, dx_gateway_id: &str) -> &[&'a str] {
        grouped(&self.vifs_by_dx_gateway, dx_gateway_id)
    }

    pub fn vifs_on_connection(&self, connection_id: &str) -> &[&'a str] {
        grouped(&self.vifs_by_connection, connection_id)
    }
}

fn table<'a, R: Indexed>(
    records: &'a [R],
    policy: DuplicateKeyPolicy,
    warnings: &mut Vec<Warning>,
) -> FamilyTable<'a, R> {
    let mut table: FamilyTable<'a, R> = HashMap::with_capacity(records.len());
    for record in records {
        let key = record.key();
        if key.is_empty() {
            log::debug!("Skipping {} record without an id", R::FAMILY);
            continue;
        }
        match table.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(mut slot) => {
                if policy == DuplicateKeyPolicy::LastWins {
                    slot.insert(record);
                }
                let warning = Warning::duplicate_key(R::FAMILY, key, policy.label());
                log::warn!("{warning}");
                warnings.push(warning);
            }
        }
    }
    table
}

fn grouped<'m, T>(grouping: &'m HashMap<&str, Vec<T>>, key: &str) -> &'m [T] {
    grouping.get(key).map(Vec::as_slice).unwrap_or(&[])
}

fn per_table<'a, T>(collection: &'a BTreeMap<String, Vec<T>>, id: &str) -> &'a [T] {
    collection.get(id).map(Vec::as_slice).unwrap_or(&[])
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
