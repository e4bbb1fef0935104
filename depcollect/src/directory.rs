//! Directory nodes: one manifest's worth of resolvable state.
//!
//! A directory node holds the dependency nodes built from one manifest plus
//! the directory nodes of every listed subdirectory, forming a forest rooted
//! at the invoking working directory. Nodes are constructed fresh on every
//! invocation and discarded afterwards; the per-dependency lock files are
//! the only persisted state.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::error;

use crate::config::ResolverConfig;
use crate::dependency::{build_nodes, DependencyNode, SkippedEntry};
use crate::manifest::Manifest;

/// One manifest's worth of resolvable state.
#[derive(Debug, Clone)]
pub struct DirectoryNode {
    /// Location of the manifest this node was loaded from (or where it was
    /// expected).
    pub config_path: PathBuf,

    /// Base output directory for this manifest's direct dependencies.
    pub container_directory: PathBuf,

    /// Dependency nodes keyed by name.
    pub dependencies: BTreeMap<String, DependencyNode>,

    /// Further directory nodes listed by this manifest.
    pub subdirectories: Vec<DirectoryNode>,

    /// False when the manifest is missing or invalid; an invalid node is a
    /// no-op leaf for both processing and cleaning.
    pub is_valid: bool,

    /// Dependency entries rejected during construction, with reasons.
    pub skipped: Vec<SkippedEntry>,
}

impl DirectoryNode {
    /// Load the directory node rooted at `directory`, recursively loading
    /// every listed subdirectory.
    ///
    /// Never fails: a missing or invalid manifest produces an invalid node
    /// (logged), leaving siblings and ancestors unaffected.
    pub fn load(directory: &Path, config: &ResolverConfig) -> DirectoryNode {
        let manifest = match Manifest::load(directory, config) {
            Ok(manifest) => manifest,
            Err(e) => {
                error!(directory = %directory.display(), error = %e, "Could not load manifest");
                return Self::invalid(directory, config);
            }
        };

        let container_directory = directory.join(&manifest.container_directory_name);

        let mut skipped = Vec::new();
        let dependencies = build_nodes(&manifest.dependencies, &container_directory, &mut skipped);

        let subdirectories = manifest
            .subdirectories
            .iter()
            .map(|sub| Self::load(&directory.join(sub), config))
            .collect();

        DirectoryNode {
            config_path: manifest.path,
            container_directory,
            dependencies,
            subdirectories,
            is_valid: true,
            skipped,
        }
    }

    fn invalid(directory: &Path, config: &ResolverConfig) -> DirectoryNode {
        DirectoryNode {
            config_path: directory.join(&config.manifest_file_name),
            container_directory: directory.join(&config.container_dir_name),
            dependencies: BTreeMap::new(),
            subdirectories: Vec::new(),
            is_valid: false,
            skipped: Vec::new(),
        }
    }
}
