//! Test utilities for property-based testing
//!
//! This module provides generators and helpers for proptest.

#[cfg(test)]
pub mod generators {
    use proptest::prelude::*;
    use proptest::sample::Index;

    use crate::core::graph::{DependencyGraph, PackageNode};

    /// A workspace as (package name, dependency names) pairs
    pub type WorkspaceSpec = Vec<(String, Vec<String>)>;

    /// Generate an acyclic workspace of 1..=`max_packages` packages
    ///
    /// Package `i` may only depend on packages `0..i`, plus the occasional
    /// external dependency that never becomes an edge.
    pub fn acyclic_workspace(max_packages: usize) -> impl Strategy<Value = WorkspaceSpec> {
        (1..=max_packages).prop_flat_map(|count| {
            prop::collection::vec(
                (prop::collection::vec(any::<Index>(), 0..4), any::<bool>()),
                count,
            )
            .prop_map(|picks| {
                picks
                    .into_iter()
                    .enumerate()
                    .map(|(i, (deps, external))| {
                        let mut names: Vec<String> = if i == 0 {
                            Vec::new()
                        } else {
                            deps.iter().map(|d| format!("pkg-{:02}", d.index(i))).collect()
                        };
                        if external {
                            names.push("react".to_string());
                        }
                        (format!("pkg-{i:02}"), names)
                    })
                    .collect()
            })
        })
    }

    /// Build a graph from a workspace spec with placeholder directories
    pub fn build_graph(spec: &[(String, Vec<String>)]) -> DependencyGraph {
        DependencyGraph::from_packages(spec.iter().map(|(name, deps)| {
            PackageNode::new(name, format!("/ws/{name}")).with_dependencies(deps.iter().cloned())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_acyclic_workspace_only_points_backwards(spec in acyclic_workspace(10)) {
            prop_assert!(!spec.is_empty());
            for (i, (_, deps)) in spec.iter().enumerate() {
                for dep in deps.iter().filter(|d| d.starts_with("pkg-")) {
                    let index: usize = dep[4..].parse().unwrap();
                    prop_assert!(index < i);
                }
            }
        }

        #[test]
        fn test_build_graph_keeps_every_package(spec in acyclic_workspace(10)) {
            let graph = build_graph(&spec);
            prop_assert_eq!(graph.len(), spec.len());
            prop_assert!(!graph.has_cycle());
        }
    }
}
