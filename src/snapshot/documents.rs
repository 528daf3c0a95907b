//! Manifest of the documents a snapshot directory may contain.

/// A collection document: `<name>.json` holding `{"<key>": [...]}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Document {
    pub name: &'static str,
    pub key: &'static str,
}

pub const METADATA: &str = "metadata";

pub const TRANSIT_GATEWAYS: Document = Document {
    name: "transit-gateways",
    key: "TransitGateways",
};
pub const TGW_ATTACHMENTS: Document = Document {
    name: "transit-gateway-attachments",
    key: "TransitGatewayAttachments",
};
pub const TGW_ROUTE_TABLES: Document = Document {
    name: "transit-gateway-route-tables",
    key: "TransitGatewayRouteTables",
};
pub const VPCS: Document = Document {
    name: "vpcs",
    key: "Vpcs",
};
pub const SUBNETS: Document = Document {
    name: "subnets",
    key: "Subnets",
};
pub const VPC_ROUTE_TABLES: Document = Document {
    name: "vpc-route-tables",
    key: "RouteTables",
};
pub const INTERNET_GATEWAYS: Document = Document {
    name: "internet-gateways",
    key: "InternetGateways",
};
pub const NAT_GATEWAYS: Document = Document {
    name: "nat-gateways",
    key: "NatGateways",
};
pub const VPC_PEERINGS: Document = Document {
    name: "vpc-peering-connections",
    key: "VpcPeeringConnections",
};
pub const VPN_CONNECTIONS: Document = Document {
    name: "vpn-connections",
    key: "VpnConnections",
};
pub const CUSTOMER_GATEWAYS: Document = Document {
    name: "customer-gateways",
    key: "CustomerGateways",
};
pub const DX_CONNECTIONS: Document = Document {
    name: "dx-connections",
    key: "connections",
};
pub const DX_GATEWAYS: Document = Document {
    name: "dx-gateways",
    key: "directConnectGateways",
};
pub const DX_VIFS: Document = Document {
    name: "dx-vifs",
    key: "virtualInterfaces",
};
pub const PREFIX_LISTS: Document = Document {
    name: "prefix-lists",
    key: "PrefixLists",
};

/// Every collection document with a fixed name.
pub const STATIC_DOCUMENTS: [Document; 15] = [
    TRANSIT_GATEWAYS,
    TGW_ATTACHMENTS,
    TGW_ROUTE_TABLES,
    VPCS,
    SUBNETS,
    VPC_ROUTE_TABLES,
    INTERNET_GATEWAYS,
    NAT_GATEWAYS,
    VPC_PEERINGS,
    VPN_CONNECTIONS,
    CUSTOMER_GATEWAYS,
    DX_CONNECTIONS,
    DX_GATEWAYS,
    DX_VIFS,
    PREFIX_LISTS,
];

pub const ROUTES_KEY: &str = "Routes";
pub const ASSOCIATIONS_KEY: &str = "Associations";
pub const PROPAGATIONS_KEY: &str = "TransitGatewayRouteTablePropagations";

pub fn routes_document(route_table_id: &str) -> String {
    format!("routes-{route_table_id}")
}

pub fn associations_document(route_table_id: &str) -> String {
    format!("associations-{route_table_id}")
}

pub fn propagations_document(route_table_id: &str) -> String {
    format!("propagations-{route_table_id}")
}

/// Names of every fixed document, metadata first.
pub fn static_document_names() -> Vec<String> {
    std::iter::once(METADATA)
        .chain(STATIC_DOCUMENTS.iter().map(|d| d.name))
        .map(str::to_string)
        .collect()
}
