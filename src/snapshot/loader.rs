//! Reads every expected document and parses it into typed collections.
//!
//! Nothing in here fails: a document that is absent, empty or the wrong shape
//! becomes an empty collection plus a [`Warning`].

use super::documents::{self, Document};
use super::source::DocumentSource;
use crate::models::aws::*;
use crate::models::Warning;
use rayon::prelude::*;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

/// Route-table ids are spliced into document names, so only plain ids are used.
static ROUTE_TABLE_ID_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_route_table_id_regex() -> &'static Regex {
    ROUTE_TABLE_ID_REGEX.get_or_init(|| Regex::new(r"^[A-Za-z0-9-]+$").expect("Invalid Regex"))
}

/// Every collection of one snapshot, as parsed. Per-table collections are keyed
/// by TGW route-table id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub metadata: Metadata,
    pub transit_gateways: Vec<RawTransitGateway>,
    pub tgw_attachments: Vec<RawTgwAttachment>,
    pub tgw_route_tables: Vec<RawTgwRouteTable>,
    pub tgw_routes: BTreeMap<String, Vec<RawTgwRoute>>,
    pub tgw_associations: BTreeMap<String, Vec<RawTgwRouteTableLink>>,
    pub tgw_propagations: BTreeMap<String, Vec<RawTgwRouteTableLink>>,
    pub vpcs: Vec<RawVpc>,
    pub subnets: Vec<RawSubnet>,
    pub vpc_route_tables: Vec<RawVpcRouteTable>,
    pub internet_gateways: Vec<RawInternetGateway>,
    pub nat_gateways: Vec<RawNatGateway>,
    pub vpc_peerings: Vec<RawVpcPeering>,
    pub vpn_connections: Vec<RawVpnConnection>,
    pub customer_gateways: Vec<RawCustomerGateway>,
    pub dx_connections: Vec<RawDxConnection>,
    pub dx_gateways: Vec<RawDxGateway>,
    pub dx_vifs: Vec<RawDxVif>,
    pub prefix_lists: Vec<RawPrefixList>,
    /// Sorted by source.
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone, PartialEq)]
enum RawDocument {
    Missing,
    Unreadable(String),
    Text(String),
}

enum Body {
    Missing,
    Empty,
    Object(Map<String, Value>),
}

/// Load a snapshot from `source`.
///
/// Per-table TGW documents are discovered from the ids listed in
/// `transit-gateway-route-tables`. With `parallel` set, document reads run on
/// the rayon pool; the result does not depend on it.
pub fn load_snapshot<S>(source: &S, parallel: bool) -> Snapshot
where
    S: DocumentSource + ?Sized,
{
    log::info!("Loading snapshot from {}", source.describe());
    let mut raw = read_all(source, documents::static_document_names(), parallel);
    let mut warnings = Vec::new();

    let metadata = parse_metadata(&take(&mut raw, documents::METADATA), &mut warnings);

    let mut snapshot = Snapshot {
        metadata,
        transit_gateways: collection(documents::TRANSIT_GATEWAYS, &mut raw, &mut warnings),
        tgw_attachments: collection(documents::TGW_ATTACHMENTS, &mut raw, &mut warnings),
        tgw_route_tables: collection(documents::TGW_ROUTE_TABLES, &mut raw, &mut warnings),
        vpcs: collection(documents::VPCS, &mut raw, &mut warnings),
        subnets: collection(documents::SUBNETS, &mut raw, &mut warnings),
        vpc_route_tables: collection(documents::VPC_ROUTE_TABLES, &mut raw, &mut warnings),
        internet_gateways: collection(documents::INTERNET_GATEWAYS, &mut raw, &mut warnings),
        nat_gateways: collection(documents::NAT_GATEWAYS, &mut raw, &mut warnings),
        vpc_peerings: collection(documents::VPC_PEERINGS, &mut raw, &mut warnings),
        vpn_connections: collection(documents::VPN_CONNECTIONS, &mut raw, &mut warnings),
        customer_gateways: collection(documents::CUSTOMER_GATEWAYS, &mut raw, &mut warnings),
        dx_connections: collection(documents::DX_CONNECTIONS, &mut raw, &mut warnings),
        dx_gateways: collection(documents::DX_GATEWAYS, &mut raw, &mut warnings),
        dx_vifs: collection(documents::DX_VIFS, &mut raw, &mut warnings),
        prefix_lists: collection(documents::PREFIX_LISTS, &mut raw, &mut warnings),
        ..Snapshot::default()
    };

    let table_ids = route_table_ids(&snapshot.tgw_route_tables, &mut warnings);
    let per_table_names: Vec<String> = table_ids
        .iter()
        .flat_map(|id| {
            [
                documents::routes_document(id),
                documents::associations_document(id),
                documents::propagations_document(id),
            ]
        })
        .collect();
    let mut per_table = read_all(source, per_table_names, parallel);

    for id in &table_ids {
        let name = documents::routes_document(id);
        let doc = take(&mut per_table, &name);
        let routes = keyed_collection(&name, documents::ROUTES_KEY, &doc, &mut warnings);
        snapshot.tgw_routes.insert(id.clone(), routes);

        let name = documents::associations_document(id);
        let doc = take(&mut per_table, &name);
        let links = keyed_collection(&name, documents::ASSOCIATIONS_KEY, &doc, &mut warnings);
        snapshot.tgw_associations.insert(id.clone(), links);

        let name = documents::propagations_document(id);
        let doc = take(&mut per_table, &name);
        let links = keyed_collection(&name, documents::PROPAGATIONS_KEY, &doc, &mut warnings);
        snapshot.tgw_propagations.insert(id.clone(), links);
    }

    warnings.sort();
    snapshot.warnings = warnings;
    log::info!(
        "Loaded {} TGWs, {} attachments, {} TGW route tables, {} VPCs, {} subnets, {} VPNs, {} DX VIFs ({} warnings)",
        snapshot.transit_gateways.len(),
        snapshot.tgw_attachments.len(),
        snapshot.tgw_route_tables.len(),
        snapshot.vpcs.len(),
        snapshot.subnets.len(),
        snapshot.vpn_connections.len(),
        snapshot.dx_vifs.len(),
        snapshot.warnings.len()
    );
    snapshot
}

fn read_all<S>(source: &S, names: Vec<String>, parallel: bool) -> BTreeMap<String, RawDocument>
where
    S: DocumentSource + ?Sized,
{
    let read = |name: String| {
        let doc = match source.read(&name) {
            Ok(Some(text)) if text.trim().is_empty() => RawDocument::Missing,
            Ok(Some(text)) => RawDocument::Text(text),
            Ok(None) => RawDocument::Missing,
            Err(e) => RawDocument::Unreadable(e.to_string()),
        };
        log::debug!("read {name}: {}", describe_raw(&doc));
        (name, doc)
    };
    if parallel {
        names.into_par_iter().map(read).collect()
    } else {
        names.into_iter().map(read).collect()
    }
}

fn take(raw: &mut BTreeMap<String, RawDocument>, name: &str) -> RawDocument {
    raw.remove(name).unwrap_or(RawDocument::Missing)
}

fn describe_raw(doc: &RawDocument) -> String {
    match doc {
        RawDocument::Missing => "missing".to_string(),
        RawDocument::Unreadable(reason) => format!("unreadable ({reason})"),
        RawDocument::Text(text) => format!("{} bytes", text.len()),
    }
}

fn body(name: &str, doc: &RawDocument) -> Result<Body, Warning> {
    let text = match doc {
        RawDocument::Missing => return Ok(Body::Missing),
        RawDocument::Unreadable(reason) => return Err(Warning::malformed(name, reason.clone())),
        RawDocument::Text(text) => text,
    };
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) if map.is_empty() => Ok(Body::Empty),
        Ok(Value::Object(map)) => Ok(Body::Object(map)),
        Ok(_) => Err(Warning::malformed(name, "top-level value is not an object")),
        Err(e) => Err(Warning::malformed(name, e.to_string())),
    }
}

fn deserialize<T: DeserializeOwned>(name: &str, value: Value) -> Result<T, Warning> {
    serde_path_to_error::deserialize(value)
        .map_err(|e| Warning::malformed(name, format!("{} at `{}`", e.inner(), e.path())))
}

fn record(warnings: &mut Vec<Warning>, warning: Warning) {
    log::warn!("{warning}");
    warnings.push(warning);
}

fn parse_metadata(doc: &RawDocument, warnings: &mut Vec<Warning>) -> Metadata {
    let parsed = match body(documents::METADATA, doc) {
        Ok(Body::Missing) => Err(Warning::missing(documents::METADATA)),
        Ok(Body::Empty) => Ok(Metadata::default()),
        Ok(Body::Object(map)) => deserialize(documents::METADATA, Value::Object(map)),
        Err(w) => Err(w),
    };
    parsed.unwrap_or_else(|w| {
        record(warnings, w);
        Metadata::default()
    })
}

fn collection<T: DeserializeOwned>(
    document: Document,
    raw: &mut BTreeMap<String, RawDocument>,
    warnings: &mut Vec<Warning>,
) -> Vec<T> {
    let doc = take(raw, document.name);
    keyed_collection(document.name, document.key, &doc, warnings)
}

fn keyed_collection<T: DeserializeOwned>(
    name: &str,
    key: &str,
    doc: &RawDocument,
    warnings: &mut Vec<Warning>,
) -> Vec<T> {
    let parsed = match body(name, doc) {
        Ok(Body::Missing) => Err(Warning::missing(name)),
        Ok(Body::Empty) => Ok(Vec::new()),
        Ok(Body::Object(mut map)) => match map.remove(key) {
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(Warning::malformed(name, format!("`{key}` is not an array"))),
            None => Err(Warning::malformed(name, format!("missing key `{key}`"))),
        },
        Err(w) => Err(w),
    };
    let items = match parsed {
        Ok(items) => items,
        Err(w) => {
            record(warnings, w);
            return Vec::new();
        }
    };

    // A bad record is skipped on its own; the rest of the collection is kept.
    let total = items.len();
    let records: Vec<T> = items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match deserialize_record(name, i, item) {
            Ok(parsed) => Some(parsed),
            Err(w) => {
                record(warnings, w);
                None
            }
        })
        .collect();
    log::debug!("{name}: {} of {total} records", records.len());
    records
}

fn deserialize_record<T: DeserializeOwned>(
    name: &str,
    position: usize,
    value: Value,
) -> Result<T, Warning> {
    serde_path_to_error::deserialize(value).map_err(|e| {
        let path = e.path().to_string();
        let at = if path == "." {
            format!("[{position}]")
        } else {
            format!("[{position}].{path}")
        };
        Warning::malformed(name, format!("{} at `{at}`", e.inner()))
    })
}

/// Unique route-table ids, skipping any that cannot safely name a document.
fn route_table_ids(tables: &[RawTgwRouteTable], warnings: &mut Vec<Warning>) -> Vec<String> {
    let mut ids = BTreeSet::new();
    for table in tables {
        let id = table.transit_gateway_route_table_id.as_str();
        if get_route_table_id_regex().is_match(id) {
            ids.insert(id.to_string());
        } else {
            record(
                warnings,
                Warning::malformed(
                    documents::TGW_ROUTE_TABLES.name,
                    format!("route table id `{id}` is not a plain identifier"),
                ),
            );
        }
    }
    ids.into_iter().collect()
}
