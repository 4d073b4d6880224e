//! Dependency resolution
//!
//! Computes build order, change impact and build levels over a
//! [`DependencyGraph`], and detects dependency cycles.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use crate::core::graph::DependencyGraph;
use crate::error::ResolverError;

/// Packages that can be built concurrently
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLevel {
    /// Position in the build sequence
    pub index: usize,
    /// Package names, in build order
    pub packages: Vec<String>,
}

/// Everything needed to rebuild after a change to `target`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    /// Changed package
    pub target: String,
    /// Target plus all of its transitive dependents
    pub affected: BTreeSet<String>,
    /// Affected packages, dependencies first
    pub order: Vec<String>,
    /// Affected packages grouped into levels
    pub levels: Vec<BuildLevel>,
}

impl DependencyGraph {
    /// Reverse adjacency list: package -> packages that depend on it
    pub fn reverse_edges(&self) -> HashMap<&str, Vec<&str>> {
        let mut reverse: HashMap<&str, Vec<&str>> = HashMap::new();
        for (from, deps) in self.edges() {
            for to in deps {
                reverse.entry(to.as_str()).or_default().push(from);
            }
        }
        reverse
    }

    /// Compute topological sort (build order)
    ///
    /// Returns packages in order such that dependencies come before dependents.
    /// Packages that become ready at the same time are emitted by name.
    pub fn topological_sort(&self) -> Result<Vec<String>, ResolverError> {
        let dependents = self.reverse_edges();

        // In-degree counts a package's own outstanding dependencies
        let mut in_degree: BTreeMap<&str, usize> = self
            .names()
            .map(|name| (name, self.dependencies_of(name).len()))
            .collect();

        let mut ready: VecDeque<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(name, _)| *name)
            .collect();

        let mut order = Vec::with_capacity(self.len());
        while let Some(name) = ready.pop_front() {
            order.push(name.to_string());

            for dependent in dependents.get(name).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push_back(*dependent);
                    }
                }
            }
        }

        if order.len() < self.len() {
            let unresolved: Vec<String> = in_degree
                .into_iter()
                .filter(|(_, degree)| *degree > 0)
                .map(|(name, _)| name.to_string())
                .collect();
            let cycle = self.find_cycle(&unresolved);
            return Err(ResolverError::CyclicDependency { cycle, unresolved });
        }

        Ok(order)
    }

    /// Check if the graph has any cycles
    pub fn has_cycle(&self) -> bool {
        self.topological_sort().is_err()
    }

    // Every unresolved package has at least one unresolved dependency, so
    // following those always closes a loop.
    fn find_cycle(&self, unresolved: &[String]) -> Vec<String> {
        let pending: HashSet<&str> = unresolved.iter().map(String::as_str).collect();
        let Some(start) = unresolved.first() else {
            return Vec::new();
        };

        let mut path: Vec<&str> = Vec::new();
        let mut position: HashMap<&str, usize> = HashMap::new();
        let mut current = start.as_str();

        loop {
            if let Some(&at) = position.get(current) {
                let mut cycle: Vec<String> = path[at..].iter().map(|s| (*s).to_string()).collect();
                cycle.push(current.to_string());
                return cycle;
            }
            position.insert(current, path.len());
            path.push(current);

            match self
                .dependencies_of(current)
                .iter()
                .find(|dep| pending.contains(dep.as_str()))
            {
                Some(next) => current = next.as_str(),
                None => return path.iter().map(|s| (*s).to_string()).collect(),
            }
        }
    }

    /// Packages that must rebuild when `target` changes
    ///
    /// Breadth-first over the reverse relation; includes `target` itself.
    pub fn affected(&self, target: &str) -> Result<BTreeSet<String>, ResolverError> {
        if !self.contains(target) {
            return Err(ResolverError::UnknownPackage {
                name: target.to_string(),
            });
        }

        let dependents = self.reverse_edges();
        let mut affected = BTreeSet::new();
        let mut queue = VecDeque::from([target]);

        while let Some(name) = queue.pop_front() {
            if !affected.insert(name.to_string()) {
                continue;
            }
            for dependent in dependents.get(name).into_iter().flatten() {
                if !affected.contains(*dependent) {
                    queue.push_back(*dependent);
                }
            }
        }

        Ok(affected)
    }

    /// Group a dependency-first sequence into build levels
    ///
    /// A package lands one level above the highest of its dependencies that are
    /// part of `order`; packages without such dependencies land in level 0.
    pub fn build_levels(&self, order: &[String]) -> Vec<BuildLevel> {
        let mut level_of: HashMap<&str, usize> = HashMap::with_capacity(order.len());
        let mut levels: Vec<BuildLevel> = Vec::new();

        for name in order {
            let level = self
                .dependencies_of(name)
                .iter()
                .filter_map(|dep| level_of.get(dep.as_str()))
                .map(|level| level + 1)
                .max()
                .unwrap_or(0);
            level_of.insert(name, level);

            if levels.len() <= level {
                levels.resize_with(level + 1, || BuildLevel {
                    index: 0,
                    packages: Vec::new(),
                });
            }
            levels[level].packages.push(name.clone());
        }

        for (index, level) in levels.iter_mut().enumerate() {
            level.index = index;
        }
        levels
    }

    /// Plan the rebuild triggered by a change to `target`
    pub fn plan(&self, target: &str) -> Result<BuildPlan, ResolverError> {
        let affected = self.affected(target)?;
        let order: Vec<String> = self
            .topological_sort()?
            .into_iter()
            .filter(|name| affected.contains(name))
            .collect();
        let levels = self.build_levels(&order);

        Ok(BuildPlan {
            target: target.to_string(),
            affected,
            order,
            levels,
        })
    }
}
