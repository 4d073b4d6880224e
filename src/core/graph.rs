//! Workspace dependency graph
//!
//! Scans a workspace root for package descriptors and links packages through
//! their internal dependencies. Construction never fails on cycles; ordering
//! and cycle detection live in [`crate::core::resolver`].

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use crate::config::defaults;
use crate::core::manifest::PackageDescriptor;
use crate::error::{GraphError, ResolverError};

/// A workspace package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageNode {
    /// Unique package name
    pub name: String,
    /// Absolute package directory
    pub directory: PathBuf,
    /// Package version, if declared
    pub version: Option<String>,
    /// Every declared runtime and development dependency, internal or not
    pub dependencies: Vec<String>,
    /// Peer dependency ranges (name -> range)
    pub peer_dependencies: BTreeMap<String, String>,
}

impl PackageNode {
    /// Create a node with no declared dependencies
    pub fn new(name: &str, directory: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            directory: directory.into(),
            version: None,
            dependencies: Vec::new(),
            peer_dependencies: BTreeMap::new(),
        }
    }

    /// Set the declared dependency names
    #[must_use]
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    /// Add a peer dependency range
    #[must_use]
    pub fn with_peer(mut self, name: &str, range: &str) -> Self {
        self.peer_dependencies
            .insert(name.to_string(), range.to_string());
        self
    }

    fn from_descriptor(descriptor: PackageDescriptor, directory: PathBuf) -> Self {
        let dependencies = descriptor.dependency_names();
        Self {
            name: descriptor.name,
            directory,
            version: descriptor.version,
            dependencies,
            peer_dependencies: descriptor.peer_dependencies,
        }
    }
}

/// Dependency graph over workspace packages
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// All packages by name
    nodes: BTreeMap<String, PackageNode>,
    /// Adjacency list: package -> internal dependencies
    edges: BTreeMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Link packages through the declared dependencies that name other packages
    ///
    /// External dependency names stay on the nodes but produce no edges. When two
    /// packages share a name, the first one is kept.
    pub fn from_packages(packages: impl IntoIterator<Item = PackageNode>) -> Self {
        let mut nodes = BTreeMap::new();
        for package in packages {
            if nodes.contains_key(&package.name) {
                tracing::warn!(
                    "Duplicate package name '{}' in {}, ignoring",
                    package.name,
                    package.directory.display()
                );
                continue;
            }
            nodes.insert(package.name.clone(), package);
        }

        let edges = nodes
            .iter()
            .map(|(name, node)| {
                let mut internal: Vec<String> = Vec::new();
                for dep in &node.dependencies {
                    if nodes.contains_key(dep) && !internal.contains(dep) {
                        internal.push(dep.clone());
                    }
                }
                (name.clone(), internal)
            })
            .collect();

        Self { nodes, edges }
    }

    /// Number of packages
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph has no packages
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check if a package is part of the graph
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Look up a package
    pub fn node(&self, name: &str) -> Option<&PackageNode> {
        self.nodes.get(name)
    }

    /// All packages, ordered by name
    pub fn nodes(&self) -> impl Iterator<Item = &PackageNode> {
        self.nodes.values()
    }

    /// All package names, in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Internal dependencies of a package (empty for unknown names)
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.edges.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Adjacency list: package -> internal dependencies
    pub fn edges(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.edges
            .iter()
            .map(|(name, deps)| (name.as_str(), deps.as_slice()))
    }

    /// The package plus everything it transitively depends on, breadth-first
    pub fn dependency_closure(&self, name: &str) -> Result<Vec<String>, ResolverError> {
        if !self.contains(name) {
            return Err(ResolverError::UnknownPackage {
                name: name.to_string(),
            });
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut closure = Vec::new();
        let mut queue = VecDeque::from([name]);

        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            closure.push(current.to_string());
            for dep in self.dependencies_of(current) {
                if !seen.contains(dep.as_str()) {
                    queue.push_back(dep);
                }
            }
        }

        Ok(closure)
    }

    /// The package whose directory contains `path`
    ///
    /// Nested package directories resolve to the innermost package.
    pub fn owner_of(&self, path: &Path) -> Option<&PackageNode> {
        self.nodes
            .values()
            .filter(|node| path.starts_with(&node.directory))
            .max_by_key(|node| node.directory.components().count())
    }
}

/// Scan `root` and build the workspace graph
///
/// Every immediate subdirectory holding a `package.json` becomes a package.
/// Descriptors that fail to parse are logged and skipped.
///
/// # Errors
///
/// Returns `GraphError::RootUnreadable` if `root` cannot be resolved or listed.
pub fn load_workspace(root: &Path) -> Result<DependencyGraph, GraphError> {
    let root = root.canonicalize().map_err(|e| GraphError::RootUnreadable {
        path: root.to_path_buf(),
        error: e.to_string(),
    })?;

    let entries = std::fs::read_dir(&root).map_err(|e| GraphError::RootUnreadable {
        path: root.clone(),
        error: e.to_string(),
    })?;

    let mut directories: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry in {}: {e}", root.display());
                None
            }
        })
        .filter(|path| path.is_dir())
        .collect();
    directories.sort();

    let mut packages = Vec::new();
    for directory in directories {
        let descriptor_path = directory.join(defaults::DESCRIPTOR_FILE);
        if !descriptor_path.is_file() {
            continue;
        }

        match PackageDescriptor::load(&descriptor_path) {
            Ok(descriptor) => {
                tracing::debug!(
                    "Found package '{}' in {}",
                    descriptor.name,
                    directory.display()
                );
                packages.push(PackageNode::from_descriptor(descriptor, directory));
            }
            Err(e) => tracing::warn!("{e}, skipping"),
        }
    }

    let graph = DependencyGraph::from_packages(packages);
    tracing::info!("Loaded {} packages from {}", graph.len(), root.display());
    Ok(graph)
}
