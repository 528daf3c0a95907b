//! Topology correlation and analysis.
//!
//! This module contains the analysis stages that run after loading:
//! - [`index`] - De-duplicated, typed lookup of every raw record
//! - [`classify`] - Pure classification rules (subnet kind, link health, ...)
//! - [`topology`] - Builds the correlated [`Topology`](crate::models::Topology)
//! - [`overlap`] - Overlapping CIDR detection
//! - [`issues`] - Connectivity issue detection

pub mod classify;
mod index;
mod issues;
mod overlap;
mod topology;

// Re-export public functions
pub use index::{FamilyTable, Indexed, ResourceIndex};
pub use issues::{
    asymmetric_routing, blackhole_routes, degraded_bgp_sessions, degraded_direct_connect,
    degraded_vpns, detect_issues, inactive_peerings, missing_tgw_routes, missing_vpc_routes,
    overlapping_cidrs,
};
pub use overlap::{cidr_owners, find_overlapping_cidrs, log_overlapping_cidrs, CidrOwner, OverlapConflict};
pub use topology::build_topology;
