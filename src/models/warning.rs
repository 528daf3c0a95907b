//! Non-fatal problems met while loading and indexing a snapshot.

use serde::Serialize;
use std::fmt;

/// Resource collections that carry a natural key.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceFamily {
    TransitGateway,
    TgwAttachment,
    TgwRouteTable,
    Vpc,
    Subnet,
    VpcRouteTable,
    InternetGateway,
    NatGateway,
    VpcPeering,
    VpnConnection,
    CustomerGateway,
    DxConnection,
    DxGateway,
    DxVif,
    PrefixList,
}

impl fmt::Display for ResourceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceFamily::TransitGateway => "transit-gateway",
            ResourceFamily::TgwAttachment => "tgw-attachment",
            ResourceFamily::TgwRouteTable => "tgw-route-table",
            ResourceFamily::Vpc => "vpc",
            ResourceFamily::Subnet => "subnet",
            ResourceFamily::VpcRouteTable => "vpc-route-table",
            ResourceFamily::InternetGateway => "internet-gateway",
            ResourceFamily::NatGateway => "nat-gateway",
            ResourceFamily::VpcPeering => "vpc-peering",
            ResourceFamily::VpnConnection => "vpn-connection",
            ResourceFamily::CustomerGateway => "customer-gateway",
            ResourceFamily::DxConnection => "dx-connection",
            ResourceFamily::DxGateway => "dx-gateway",
            ResourceFamily::DxVif => "dx-vif",
            ResourceFamily::PrefixList => "prefix-list",
        };
        f.write_str(name)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum WarningKind {
    /// Document absent or empty.
    MissingDocument,
    /// Document present but not the expected shape.
    MalformedDocument { reason: String },
    /// Two records of one family share an id.
    DuplicateKey {
        family: ResourceFamily,
        id: String,
        kept: String,
    },
}

/// A degraded-input notice. `source` is a document name or a family name.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Warning {
    pub source: String,
    #[serde(flatten)]
    pub kind: WarningKind,
}

impl Warning {
    pub fn missing(document: &str) -> Warning {
        Warning {
            source: document.to_string(),
            kind: WarningKind::MissingDocument,
        }
    }

    pub fn malformed(document: &str, reason: impl Into<String>) -> Warning {
        Warning {
            source: document.to_string(),
            kind: WarningKind::MalformedDocument {
                reason: reason.into(),
            },
        }
    }

    pub fn duplicate_key(family: ResourceFamily, id: &str, kept: &str) -> Warning {
        Warning {
            source: family.to_string(),
            kind: WarningKind::DuplicateKey {
                family,
                id: id.to_string(),
                kept: kept.to_string(),
            },
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            WarningKind::MissingDocument => write!(f, "{}: document missing or empty", self.source),
            WarningKind::MalformedDocument { reason } => {
                write!(f, "{}: malformed document ({reason})", self.source)
            }
            WarningKind::DuplicateKey { id, kept, .. } => {
                write!(f, "{}: duplicate id {id} (kept {kept} record)", self.source)
            }
        }
    }
}
