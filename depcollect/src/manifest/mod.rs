//! Per-directory dependency manifests.
//!
//! A manifest (`dependencies.json`) describes one directory's direct
//! dependencies, the container directory they materialize under, and the
//! paths of further directories carrying their own manifests.

pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::ResolverConfig;
use crate::error::{CollectError, CollectResult};

/// Name of the per-directory manifest file.
pub const MANIFEST_FILE_NAME: &str = "dependencies.json";

/// Default name of the directory dependencies are materialized under.
pub const DEFAULT_CONTAINER_DIR_NAME: &str = "dependencies";

/// One parsed and structurally validated directory manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Path of the manifest file this was loaded from.
    pub path: PathBuf,

    /// Name of the directory this manifest's dependencies are placed under.
    pub container_directory_name: String,

    /// Paths of further directories with their own manifests, relative to
    /// the manifest's directory.
    pub subdirectories: Vec<PathBuf>,

    /// Raw dependency entries keyed by name.
    ///
    /// Each entry is validated individually when the dependency tree is
    /// built, so one malformed entry does not reject its siblings.
    pub dependencies: serde_json::Map<String, Value>,
}

impl Manifest {
    /// Locate the manifest file inside `directory`.
    ///
    /// Returns `None` when no manifest file is present.
    pub fn find(directory: &Path, config: &ResolverConfig) -> Option<PathBuf> {
        let path = directory.join(&config.manifest_file_name);
        path.is_file().then_some(path)
    }

    /// Load and validate the manifest inside `directory`.
    ///
    /// # Errors
    ///
    /// `ManifestMissing` when no manifest file exists, `ManifestParse` when
    /// the file is not valid JSON, and `Schema` when the directory-level
    /// structure is invalid.
    pub fn load(directory: &Path, config: &ResolverConfig) -> CollectResult<Manifest> {
        let path = Manifest::find(directory, config).ok_or_else(|| {
            CollectError::ManifestMissing {
                path: directory.join(&config.manifest_file_name),
            }
        })?;

        let text = fs::read_to_string(&path).map_err(|e| CollectError::ReadFailed {
            path: path.clone(),
            source: e,
        })?;

        let value: Value =
            serde_json::from_str(&text).map_err(|e| CollectError::ManifestParse {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        schema::validate_directory_manifest(&value)?;

        // Shape is validated above; the extractors below cannot miss.
        let obj = value.as_object().cloned().unwrap_or_default();

        let container_directory_name = obj
            .get("container_directory_name")
            .and_then(Value::as_str)
            .unwrap_or(&config.container_dir_name)
            .to_string();

        let subdirectories = obj
            .get("subdirectories")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .map(PathBuf::from)
                    .collect()
            })
            .unwrap_or_default();

        let dependencies = obj
            .get("dependencies")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        Ok(Manifest {
            path,
            container_directory_name,
            subdirectories,
            dependencies,
        })
    }
}
