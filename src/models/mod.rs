//! Domain models for the network topology analyzer.
//!
//! This module contains the core data structures used throughout the application:
//! - [`Ipv4`] - IPv4 network with CIDR notation support
//! - [`aws`] - raw records as exported by the AWS CLI
//! - [`Topology`] and its nodes - the correlated network graph
//! - [`Finding`] - a detected connectivity issue
//! - [`Warning`] - a degraded-input notice

pub mod aws;
mod finding;
mod ipv4;
mod topology;
mod warning;

// Re-export public types
pub use finding::{Finding, FindingKind, RouteRef, Severity};
pub use ipv4::{Ipv4, MAX_LENGTH};
pub use topology::{
    AttachmentKind, AttachmentNode, AttachmentResource, AttachmentVisibility, BgpPeer,
    CustomerGatewayNode, Destination, DxConnectionNode, DxGatewayNode, DxVifNode, LinkHealth,
    PeeringNode, RouteState, RouteTableSource, RouteTarget, RouteType, SubnetKind, SubnetNode,
    TargetKind, TargetStatus, TgwRoute, TgwRouteTableNode, Topology, TransitGatewayNode,
    Visibility, VpcNode, VpcRoute, VpcRouteTableNode, VpnNode, VpnTunnel,
};
pub use warning::{ResourceFamily, Warning, WarningKind};
