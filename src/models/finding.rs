//! Connectivity findings produced by the issue detector.

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        f.write_str(s)
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    Blackhole,
    Asymmetric,
    VpnDegraded,
    DxDegraded,
    BgpDegraded,
    CidrOverlap,
    MissingRoute,
    PeeringInactive,
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FindingKind::Blackhole => "blackhole",
            FindingKind::Asymmetric => "asymmetric",
            FindingKind::VpnDegraded => "vpn_degraded",
            FindingKind::DxDegraded => "dx_degraded",
            FindingKind::BgpDegraded => "bgp_degraded",
            FindingKind::CidrOverlap => "cidr_overlap",
            FindingKind::MissingRoute => "missing_route",
            FindingKind::PeeringInactive => "peering_inactive",
        };
        f.write_str(s)
    }
}

/// Identifies one route: routes have no id of their own.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RouteRef {
    pub route_table_id: String,
    pub destination: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub kind: FindingKind,
    pub severity: Severity,
    /// Ids of the affected entities, primary entity first.
    pub entity_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<RouteRef>,
    /// Human readable place, usually entity names.
    pub location: String,
    pub message: String,
}

impl Finding {
    pub fn new(
        kind: FindingKind,
        severity: Severity,
        entity_ids: Vec<String>,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Finding {
        Finding {
            kind,
            severity,
            entity_ids,
            route: None,
            location: location.into(),
            message: message.into(),
        }
    }

    pub fn with_route(mut self, route_table_id: &str, destination: &str) -> Finding {
        self.route = Some(RouteRef {
            route_table_id: route_table_id.to_string(),
            destination: destination.to_string(),
        });
        self
    }

    /// Report order: severity descending, then entity ids ascending.
    /// Kind, route and message break the remaining ties.
    pub fn report_order(&self, other: &Finding) -> Ordering {
        other
            .severity
            .cmp(&self.severity)
            .then_with(|| self.entity_ids.cmp(&other.entity_ids))
            .then_with(|| self.kind.cmp(&other.kind))
            .then_with(|| self.route.cmp(&other.route))
            .then_with(|| self.message.cmp(&other.message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(severity: Severity, id: &str) -> Finding {
        Finding::new(FindingKind::Blackhole, severity, vec![id.to_string()], id, "m")
    }

    #[test]
    fn test_report_order() {
        let mut findings = vec![
            finding(Severity::Low, "a"),
            finding(Severity::High, "z"),
            finding(Severity::High, "b"),
            finding(Severity::Medium, "a"),
        ];
        findings.sort_by(|a, b| a.report_order(b));
        let order: Vec<(Severity, &str)> = findings
            .iter()
            .map(|f| (f.severity, f.entity_ids[0].as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                (Severity::High, "b"),
                (Severity::High, "z"),
                (Severity::Medium, "a"),
                (Severity::Low, "a"),
            ]
        );
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Severity::High).unwrap(), "\"high\"");
        assert_eq!(
            serde_json::to_string(&FindingKind::CidrOverlap).unwrap(),
            "\"cidr_overlap\""
        );
    }
}
