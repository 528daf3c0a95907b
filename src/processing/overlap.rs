//! Overlapping CIDR detection.
//!
//! Detects networks with intersecting address space: VPCs in the snapshot, plus
//! VPCs behind unresolved attachments whose CIDRs are only known from
//! propagated TGW routes.

use crate::models::{AttachmentKind, AttachmentResource, Ipv4, Topology};
use itertools::Itertools;
use std::collections::BTreeMap;

/// A network that owns one or more CIDRs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CidrOwner {
    /// VPC id.
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub cidrs: Vec<Ipv4>,
    /// Set when the VPC is only known through this attachment.
    pub via_attachment: Option<String>,
}

/// Two networks whose address spaces intersect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapConflict {
    pub first: CidrOwner,
    pub first_cidr: Ipv4,
    pub second: CidrOwner,
    pub second_cidr: Ipv4,
}

/// Every network with known CIDRs, sorted by id.
pub fn cidr_owners(topology: &Topology) -> Vec<CidrOwner> {
    let mut owners: BTreeMap<String, CidrOwner> = BTreeMap::new();

    for vpc in topology.vpcs.values() {
        owners.insert(
            vpc.id.clone(),
            CidrOwner {
                id: vpc.id.clone(),
                name: vpc.name.clone(),
                owner_id: vpc.owner_id.clone(),
                cidrs: vpc.cidrs.clone(),
                via_attachment: None,
            },
        );
    }

    // Cross-account VPCs appear only as attachments; the same VPC may be
    // attached to several TGWs.
    for attachment in topology.attachments.values() {
        let AttachmentResource::Unresolved(vpc_id) = &attachment.resource else {
            continue;
        };
        if attachment.kind != AttachmentKind::Vpc || vpc_id.is_empty() {
            continue;
        }
        let owner = owners.entry(vpc_id.clone()).or_insert_with(|| CidrOwner {
            id: vpc_id.clone(),
            name: vpc_id.clone(),
            owner_id: attachment.resource_owner_id.clone(),
            cidrs: Vec::new(),
            via_attachment: Some(attachment.id.clone()),
        });
        for cidr in &attachment.cidrs {
            if !owner.cidrs.contains(cidr) {
                owner.cidrs.push(*cidr);
            }
        }
    }

    owners
        .into_values()
        .filter(|owner| !owner.cidrs.is_empty())
        .collect()
}

/// Find overlapping CIDRs between distinct networks.
///
/// Each unordered pair is reported at most once, with the first pair of CIDRs
/// that intersect.
///
/// # Arguments
/// * `topology` - The built topology
///
/// # Returns
/// A list of conflicts, sorted by the ids of the two networks
pub fn find_overlapping_cidrs(topology: &Topology) -> Vec<OverlapConflict> {
    cidr_owners(topology)
        .iter()
        .tuple_combinations()
        .filter_map(|(first, second)| {
            first
                .cidrs
                .iter()
                .cartesian_product(second.cidrs.iter())
                .find(|(a, b)| a.overlaps(b))
                .map(|(a, b)| OverlapConflict {
                    first: first.clone(),
                    first_cidr: *a,
                    second: second.clone(),
                    second_cidr: *b,
                })
        })
        .collect()
}

/// Log overlapping CIDR conflicts as warnings.
pub fn log_overlapping_cidrs(conflicts: &[OverlapConflict]) {
    if conflicts.is_empty() {
        log::info!("No overlapping VPC CIDRs found.");
        return;
    }

    log::warn!(
        "Found {} overlapping VPC CIDR pair(s):",
        conflicts.len()
    );

    for conflict in conflicts {
        log::warn!(
            "  - '{}' {} overlaps '{}' {} (owners {} / {})",
            conflict.first.name,
            conflict.first_cidr,
            conflict.second.name,
            conflict.second_cidr,
            conflict.first.owner_id,
            conflict.second.owner_id
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttachmentNode, AttachmentVisibility, VpcNode};

    fn vpc(id: &str, cidrs: &[&str]) -> VpcNode {
        VpcNode {
            id: id.to_string(),
            name: id.to_string(),
            resolved: true,
            cidrs: cidrs.iter().map(|c| Ipv4::new(c).unwrap()).collect(),
            owner_id: "111111111111".to_string(),
            is_default: false,
            igw_id: None,
            nat_gateway_ids: vec![],
            tgw_attachment_ids: vec![],
            main_route_table_id: None,
            route_tables: vec![],
            subnets: vec![],
        }
    }

    fn remote_attachment(id: &str, vpc_id: &str, cidrs: &[&str]) -> AttachmentNode {
        AttachmentNode {
            id: id.to_string(),
            tgw_id: "tgw-1".to_string(),
            name: id.to_string(),
            state: "available".to_string(),
            kind: AttachmentKind::Vpc,
            resource: AttachmentResource::Unresolved(vpc_id.to_string()),
            visibility: AttachmentVisibility::ReferencedOnly,
            resource_owner_id: "222222222222".to_string(),
            tgw_owner_id: "111111111111".to_string(),
            cross_account: true,
            cidrs: cidrs.iter().map(|c| Ipv4::new(c).unwrap()).collect(),
            associated_route_table: None,
            propagates_to: vec![],
        }
    }

    fn topology(vpcs: Vec<VpcNode>, attachments: Vec<AttachmentNode>) -> Topology {
        Topology {
            vpcs: vpcs.into_iter().map(|v| (v.id.clone(), v)).collect(),
            attachments: attachments.into_iter().map(|a| (a.id.clone(), a)).collect(),
            ..Topology::default()
        }
    }

    #[test]
    fn test_overlap_reported_once_per_pair() {
        let topology = topology(
            vec![
                vpc("vpc-a", &["10.0.0.0/16", "10.0.128.0/17"]),
                vpc("vpc-b", &["10.0.128.0/20"]),
            ],
            vec![],
        );
        let conflicts = find_overlapping_cidrs(&topology);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].first.id, "vpc-a");
        assert_eq!(conflicts[0].second.id, "vpc-b");
        assert_eq!(conflicts[0].first_cidr, Ipv4::new("10.0.0.0/16").unwrap());
    }

    #[test]
    fn test_disjoint_vpcs() {
        let topology = topology(
            vec![vpc("vpc-a", &["10.0.0.0/16"]), vpc("vpc-b", &["10.1.0.0/16"])],
            vec![],
        );
        assert!(find_overlapping_cidrs(&topology).is_empty());
    }

    #[test]
    fn test_unresolved_attachment_counts_as_network() {
        let topology = topology(
            vec![vpc("vpc-a", &["10.20.0.0/16"])],
            vec![
                remote_attachment("tgw-attach-1", "vpc-remote", &["10.20.0.0/24"]),
                remote_attachment("tgw-attach-2", "vpc-remote", &["10.20.0.0/24"]),
            ],
        );
        let owners = cidr_owners(&topology);
        assert_eq!(owners.len(), 2);
        assert_eq!(owners[1].cidrs.len(), 1, "duplicate attachments merge");
        assert_eq!(owners[1].via_attachment.as_deref(), Some("tgw-attach-1"));

        let conflicts = find_overlapping_cidrs(&topology);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].second.id, "vpc-remote");
    }

    #[test]
    fn test_networks_without_cidrs_are_ignored() {
        let topology = topology(
            vec![vpc("vpc-a", &[])],
            vec![remote_attachment("tgw-attach-1", "vpc-remote", &[])],
        );
        assert!(cidr_owners(&topology).is_empty());
    }
}
