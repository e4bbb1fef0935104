//! Dependency nodes and declaration fingerprints.
//!
//! A dependency node is one resolved dependency: its identity, source
//! descriptor, free-form argument bag, computed destination path, and its
//! recursively built sub-dependencies. Construction performs no I/O beyond
//! path composition; everything on disk happens later in the resolver.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::SchemaError;
use crate::manifest::schema;
use crate::source::SourceType;

/// Number of hex characters kept from the declaration digest.
///
/// Matches the fingerprint width persisted in lock files.
const FINGERPRINT_HEX_LEN: usize = 32;

/// A dependency entry that failed validation and was skipped.
///
/// Skips are typed outcomes rather than swallowed exceptions so callers and
/// tests can assert on which entry was rejected and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// Name of the skipped entry.
    pub name: String,

    /// Why the entry was rejected.
    pub reason: SchemaError,
}

/// One resolved dependency.
#[derive(Debug, Clone)]
pub struct DependencyNode {
    /// Name of the dependency, unique within its parent collection.
    pub name: String,

    /// Where the dependency's content is downloaded from.
    ///
    /// Absent only for a node whose sole purpose is to group
    /// sub-dependencies; such a node skips the fetch step.
    pub source_url: Option<String>,

    /// How the content at `source_url` is obtained.
    pub source_type: SourceType,

    /// The remaining declaration fields: `sub_dependencies`, `libraries`,
    /// `binaries`, `include_dirs`, `archive_extract_items`, and anything
    /// else the manifest carried. Kept opaque so the fingerprint covers the
    /// whole declaration.
    pub args: Map<String, Value>,

    /// Where this dependency materializes: `<container>/<name>`.
    ///
    /// Computed once at construction and never mutated.
    pub destination_path: PathBuf,

    /// Sub-dependencies, nested under this node's destination.
    pub sub_dependencies: BTreeMap<String, DependencyNode>,
}

impl DependencyNode {
    /// Build a node from a validated dependency entry.
    ///
    /// `entry` must already have passed
    /// [`schema::validate_dependency_entry`]. Sub-dependencies are built
    /// recursively with this node's destination as their container;
    /// sub-entries that fail validation are recorded in `skipped` and left
    /// out.
    pub fn from_entry(
        name: &str,
        entry: &Map<String, Value>,
        container: &Path,
        skipped: &mut Vec<SkippedEntry>,
    ) -> Self {
        let source_url = entry.get("url").and_then(Value::as_str).map(str::to_owned);
        let source_type = entry
            .get("url_type")
            .and_then(Value::as_str)
            .and_then(SourceType::from_manifest_str)
            .unwrap_or(SourceType::Archive);

        let mut args = entry.clone();
        args.remove("url");
        args.remove("url_type");

        let destination_path = container.join(name);

        let sub_dependencies = match args.get("sub_dependencies").and_then(Value::as_object) {
            Some(subs) => build_nodes(subs, &destination_path, skipped),
            None => BTreeMap::new(),
        };

        Self {
            name: name.to_string(),
            source_url,
            source_type,
            args,
            destination_path,
            sub_dependencies,
        }
    }

    /// Compute the deterministic fingerprint of this node's declaration.
    ///
    /// The digest covers `{source_url, source_type, args}` serialized as
    /// canonical JSON with map keys sorted at every level, so the result is
    /// stable across runs and independent of manifest key ordering.
    pub fn fingerprint(&self) -> String {
        let mut declaration = Map::new();
        declaration.insert(
            "source_url".to_string(),
            match &self.source_url {
                Some(url) => Value::String(url.clone()),
                None => Value::Null,
            },
        );
        declaration.insert(
            "source_type".to_string(),
            Value::String(self.source_type.as_manifest_str().to_string()),
        );
        declaration.insert("args".to_string(), Value::Object(self.args.clone()));

        let mut canonical = String::new();
        write_canonical_json(&Value::Object(declaration), &mut canonical);

        let mut digest = format!("{:x}", Sha256::digest(canonical.as_bytes()));
        digest.truncate(FINGERPRINT_HEX_LEN);
        digest
    }
}

/// Build dependency nodes from a map of raw entries.
///
/// Each entry is validated individually; entries that fail validation are
/// recorded in `skipped` and do not affect their siblings.
pub fn build_nodes(
    entries: &Map<String, Value>,
    container: &Path,
    skipped: &mut Vec<SkippedEntry>,
) -> BTreeMap<String, DependencyNode> {
    let mut nodes = BTreeMap::new();

    for (name, value) in entries {
        match schema::validate_dependency_entry(value, name) {
            Ok(()) => {
                if let Some(entry) = value.as_object() {
                    nodes.insert(
                        name.clone(),
                        DependencyNode::from_entry(name, entry, container, skipped),
                    );
                }
            }
            Err(reason) => {
                warn!(dependency = %name, error = %reason, "Skipping invalid dependency entry");
                skipped.push(SkippedEntry {
                    name: name.clone(),
                    reason,
                });
            }
        }
    }

    nodes
}

/// Serialize `value` as canonical JSON: object keys sorted at every level,
/// array order preserved, scalars in serde_json's standard encoding.
fn write_canonical_json(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (index, key) in keys.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                // Key and scalar encodings reuse serde_json for correct escaping.
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical_json(&map[*key], out);
            }
            out.push('}');
        }
        Value::Array(list) => {
            out.push('[');
            for (index, element) in list.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_canonical_json(element, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
