//! Package descriptor parsing
//!
//! Reads the `package.json` found in each workspace package. Only the fields
//! the orchestrator needs are deserialized; everything else is ignored.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::GraphError;

/// Parsed package descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDescriptor {
    /// Unique package name
    pub name: String,

    /// Package version
    #[serde(default)]
    pub version: Option<String>,

    /// Runtime dependencies (name -> version range)
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    /// Development dependencies (name -> version range)
    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, String>,

    /// Peer dependencies (name -> version range)
    #[serde(default)]
    pub peer_dependencies: BTreeMap<String, String>,
}

impl PackageDescriptor {
    /// Parse a descriptor from JSON text
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Read and parse the descriptor at `path`
    ///
    /// # Errors
    ///
    /// Returns `GraphError::DescriptorParse` if the file cannot be read, is not
    /// valid JSON, or has an empty name.
    pub fn load(path: &Path) -> Result<Self, GraphError> {
        let content = std::fs::read_to_string(path).map_err(|e| GraphError::DescriptorParse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let descriptor = Self::from_json(&content).map_err(|e| GraphError::DescriptorParse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        if descriptor.name.trim().is_empty() {
            return Err(GraphError::DescriptorParse {
                path: path.to_path_buf(),
                error: "field 'name' is empty".to_string(),
            });
        }

        Ok(descriptor)
    }

    /// Runtime and development dependency names, runtime first, without duplicates
    pub fn dependency_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::with_capacity(
            self.dependencies.len() + self.dev_dependencies.len(),
        );
        for name in self.dependencies.keys().chain(self.dev_dependencies.keys()) {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }
}
