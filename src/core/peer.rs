//! Peer dependency validation
//!
//! Reports peer dependencies that two packages declare with ranges no single
//! version can satisfy. Ranges use npm syntax; they are translated to
//! [`semver::VersionReq`] before comparison.

use std::collections::BTreeMap;
use std::fmt;

use semver::{Comparator, Version, VersionReq};

use crate::core::graph::DependencyGraph;

/// A package's requirement on a peer dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerRequirement {
    /// Declaring package
    pub package: String,
    /// Declared version range
    pub range: String,
}

/// Two packages that cannot share one version of a peer dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerConflict {
    /// Peer dependency name
    pub dependency: String,
    /// First declaration (by package name)
    pub first: PeerRequirement,
    /// Conflicting declaration
    pub second: PeerRequirement,
}

impl fmt::Display for PeerConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Peer dependency mismatch for {}: {} ({}) vs {} ({})",
            self.dependency,
            self.first.range,
            self.first.package,
            self.second.range,
            self.second.package
        )
    }
}

/// Compare every pair of declarations of each peer dependency
pub fn check_peer_dependencies(graph: &DependencyGraph) -> Vec<PeerConflict> {
    let mut declared: BTreeMap<&str, Vec<PeerRequirement>> = BTreeMap::new();
    for node in graph.nodes() {
        for (dependency, range) in &node.peer_dependencies {
            declared
                .entry(dependency.as_str())
                .or_default()
                .push(PeerRequirement {
                    package: node.name.clone(),
                    range: range.clone(),
                });
        }
    }

    let mut conflicts = Vec::new();
    for (dependency, requirements) in declared {
        for (i, first) in requirements.iter().enumerate() {
            for second in &requirements[i + 1..] {
                if !ranges_overlap(&first.range, &second.range) {
                    tracing::debug!(
                        "'{dependency}' ranges do not overlap: {} / {}",
                        first.range,
                        second.range
                    );
                    conflicts.push(PeerConflict {
                        dependency: dependency.to_string(),
                        first: first.clone(),
                        second: second.clone(),
                    });
                }
            }
        }
    }
    conflicts
}

/// Check whether some version satisfies both ranges
///
/// Ranges that cannot be parsed only overlap when they are textually equal.
pub fn ranges_overlap(left: &str, right: &str) -> bool {
    if left.trim() == right.trim() {
        return true;
    }

    match (parse_range(left), parse_range(right)) {
        (Some(left), Some(right)) => left
            .iter()
            .any(|a| right.iter().any(|b| requirements_intersect(a, b))),
        _ => false,
    }
}

/// Parse an npm range into its `||` alternatives
fn parse_range(range: &str) -> Option<Vec<VersionReq>> {
    range
        .split("||")
        .map(|alternative| VersionReq::parse(&normalize_alternative(alternative)).ok())
        .collect()
}

/// Rewrite npm conjunction syntax into comma-separated comparators
fn normalize_alternative(alternative: &str) -> String {
    let tokens: Vec<&str> = alternative.split_whitespace().collect();

    if let [low, "-", high] = tokens.as_slice() {
        return format!(">={low}, <={high}");
    }

    let mut comparators: Vec<String> = Vec::new();
    let mut operator = String::new();
    for token in tokens {
        let token = token.trim_end_matches(',');
        if token.is_empty() {
            continue;
        }
        if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^')) {
            operator.push_str(token);
            continue;
        }
        // npm reads a bare version as an exact match
        if operator.is_empty() && is_exact_version(token) {
            operator.push('=');
        }
        comparators.push(format!("{operator}{token}"));
        operator.clear();
    }

    if comparators.is_empty() {
        "*".to_string()
    } else {
        comparators.join(", ")
    }
}

fn is_exact_version(token: &str) -> bool {
    token.starts_with(|c: char| c.is_ascii_digit())
        && !token.contains(['x', 'X', '*'])
        && token.split('.').count() == 3
}

fn requirements_intersect(left: &VersionReq, right: &VersionReq) -> bool {
    candidate_versions(left, right)
        .iter()
        .any(|version| left.matches(version) && right.matches(version))
}

// A non-empty intersection of two ranges starts either at 0.0.0, at a
// comparator's own version, or just above it; checking those is enough.
fn candidate_versions(left: &VersionReq, right: &VersionReq) -> Vec<Version> {
    let mut candidates = vec![Version::new(0, 0, 0)];
    for comparator in left.comparators.iter().chain(&right.comparators) {
        candidates.extend(comparator_candidates(comparator));
    }
    candidates
}

fn comparator_candidates(comparator: &Comparator) -> Vec<Version> {
    let major = comparator.major;
    let minor = comparator.minor.unwrap_or(0);
    let patch = comparator.patch.unwrap_or(0);

    let mut base = Version::new(major, minor, patch);
    base.pre = comparator.pre.clone();

    vec![
        base,
        Version::new(major, minor, patch + 1),
        Version::new(major, minor + 1, 0),
        Version::new(major + 1, 0, 0),
    ]
}
