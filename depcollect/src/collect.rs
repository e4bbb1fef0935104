//! Artifact collection into the normalized output tree.
//!
//! After a dependency's archive is extracted, its declared libraries and
//! binaries are copied into `<dest>/lib/<config>/<platform>/` and
//! `<dest>/bin/<config>/<platform>/`, and its declared include directories
//! into `<dest>/include/`. Invalid declarations skip just that entry;
//! missing include directories skip just that directory.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

use crate::dependency::{DependencyNode, SkippedEntry};
use crate::error::{CollectError, CollectResult};
use crate::fsutil::copy_dir_recursive;
use crate::manifest::schema;

/// Which normalized output tree an artifact declaration feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Library files, collected under `lib/`.
    Library,

    /// Binary files, collected under `bin/`.
    Binary,
}

impl ArtifactKind {
    /// Manifest key carrying declarations of this kind.
    pub fn manifest_key(self) -> &'static str {
        match self {
            Self::Library => "libraries",
            Self::Binary => "binaries",
        }
    }

    /// Name of the output directory for this kind.
    pub fn output_dir(self) -> &'static str {
        match self {
            Self::Library => "lib",
            Self::Binary => "bin",
        }
    }
}

/// Counts from one dependency's collection pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionReport {
    /// Library declarations collected.
    pub libraries: usize,

    /// Binary declarations collected.
    pub binaries: usize,

    /// Include directories copied.
    pub include_dirs: usize,
}

/// Collect every declared artifact of `node` into its output tree.
///
/// Declarations that fail validation are recorded in `skipped` and do not
/// affect their siblings; a missing include directory is logged and skipped.
/// Collection order is libraries, binaries, then includes.
///
/// # Errors
///
/// Filesystem failures while copying a validated declaration (including a
/// declared file that does not exist on disk) abort the node's collection;
/// the caller must not mark the node as satisfied.
pub fn collect_artifacts(
    node: &DependencyNode,
    skipped: &mut Vec<SkippedEntry>,
) -> CollectResult<CollectionReport> {
    let libraries = collect_kind(node, ArtifactKind::Library, skipped)?;
    let binaries = collect_kind(node, ArtifactKind::Binary, skipped)?;
    let include_dirs = collect_includes(node)?;
    Ok(CollectionReport {
        libraries,
        binaries,
        include_dirs,
    })
}

fn collect_kind(
    node: &DependencyNode,
    kind: ArtifactKind,
    skipped: &mut Vec<SkippedEntry>,
) -> CollectResult<usize> {
    let Some(list) = node.args.get(kind.manifest_key()).and_then(Value::as_array) else {
        return Ok(0);
    };

    let mut collected = 0;
    for (index, value) in list.iter().enumerate() {
        let entry_path = format!("{}.{}[{}]", node.name, kind.manifest_key(), index);
        match schema::validate_artifact_entry(value, &entry_path) {
            Err(reason) => {
                warn!(dependency = %node.name, error = %reason, "Skipping invalid artifact entry");
                skipped.push(SkippedEntry {
                    name: node.name.clone(),
                    reason,
                });
            }
            Ok(()) => {
                copy_artifact(node, kind, value)?;
                collected += 1;
            }
        }
    }

    if !list.is_empty() {
        info!(
            dependency = %node.name,
            kind = kind.manifest_key(),
            count = collected,
            "Collected artifacts"
        );
    }

    Ok(collected)
}

/// Fan a validated declaration out over its `configs × platforms` product.
fn copy_artifact(node: &DependencyNode, kind: ArtifactKind, value: &Value) -> CollectResult<()> {
    // Shape is validated by the caller; absent fields read as empty.
    let obj = value.as_object().cloned().unwrap_or_default();
    let filepath = obj.get("filepath").and_then(Value::as_str).unwrap_or("");
    let platforms = string_values(obj.get("platforms"));
    let configs = string_values(obj.get("configs"));

    let source = node.destination_path.join(filepath);
    let file_name = source
        .file_name()
        .map(|name| name.to_owned())
        .ok_or_else(|| CollectError::ReadFailed {
            path: source.clone(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "artifact filepath has no file name",
            ),
        })?;

    for config in &configs {
        for platform in &platforms {
            let target_dir = node
                .destination_path
                .join(kind.output_dir())
                .join(config)
                .join(platform);
            fs::create_dir_all(&target_dir).map_err(|e| CollectError::CreateDirFailed {
                path: target_dir.clone(),
                source: e,
            })?;

            let target = target_dir.join(&file_name);
            fs::copy(&source, &target).map_err(|e| CollectError::WriteFailed {
                path: target,
                source: e,
            })?;
        }
    }

    Ok(())
}

fn collect_includes(node: &DependencyNode) -> CollectResult<usize> {
    let Some(list) = node.args.get("include_dirs").and_then(Value::as_array) else {
        return Ok(0);
    };

    let include_root = node.destination_path.join("include");
    let mut collected = 0;

    for value in list {
        let Some(relative) = value.as_str() else {
            continue;
        };

        let source = node.destination_path.join(relative);
        if !source.is_dir() {
            warn!(
                dependency = %node.name,
                directory = %source.display(),
                "Declared include directory is missing, skipping"
            );
            continue;
        }

        copy_dir_recursive(&source, &include_root)?;
        collected += 1;
    }

    if !list.is_empty() {
        info!(dependency = %node.name, count = collected, "Collected include directories");
    }

    Ok(collected)
}

fn string_values(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn node_with_args(args: Value, dest: &Path) -> DependencyNode {
        let mut entry = args.as_object().unwrap().clone();
        entry.insert(
            "url".to_string(),
            Value::String("https://example.com/d.tar.gz".to_string()),
        );
        let mut skipped = Vec::new();
        let node = DependencyNode::from_entry(
            "dep",
            &entry,
            dest.parent().unwrap(),
            &mut skipped,
        );
        assert!(skipped.is_empty());
        node
    }

    #[test]
    fn test_artifact_fan_out() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("dep");
        fs::create_dir_all(dest.join("out")).unwrap();
        fs::write(dest.join("out/dep.lib"), "lib").unwrap();

        let node = node_with_args(
            json!({
                "libraries": [{
                    "filepath": "out/dep.lib",
                    "platforms": ["win64", "linux64"],
                    "configs": ["debug", "release"]
                }]
            }),
            &dest,
        );

        let mut skipped = Vec::new();
        let report = collect_artifacts(&node, &mut skipped).unwrap();

        assert_eq!(report.libraries, 1);
        assert!(skipped.is_empty());
        for config in ["debug", "release"] {
            for platform in ["win64", "linux64"] {
                let copied = dest.join("lib").join(config).join(platform).join("dep.lib");
                assert!(copied.exists(), "missing {}", copied.display());
            }
        }
    }

    #[test]
    fn test_binaries_collect_under_bin() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("dep");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("tool.exe"), "x").unwrap();

        let node = node_with_args(
            json!({
                "binaries": [{
                    "filepath": "tool.exe",
                    "platforms": ["win64"],
                    "configs": ["release"]
                }]
            }),
            &dest,
        );

        let mut skipped = Vec::new();
        let report = collect_artifacts(&node, &mut skipped).unwrap();

        assert_eq!(report.binaries, 1);
        assert!(dest.join("bin/release/win64/tool.exe").exists());
    }

    #[test]
    fn test_invalid_artifact_entry_is_skipped_with_reason() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("dep");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("dep.lib"), "lib").unwrap();

        let node = node_with_args(
            json!({
                "libraries": [
                    { "platforms": ["win64"], "configs": ["debug"] },
                    { "filepath": "dep.lib", "platforms": ["win64"], "configs": ["debug"] }
                ]
            }),
            &dest,
        );

        let mut skipped = Vec::new();
        let report = collect_artifacts(&node, &mut skipped).unwrap();

        assert_eq!(report.libraries, 1);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].name, "dep");
        assert!(skipped[0].reason.constraint.contains("filepath"));
        assert!(dest.join("lib/debug/win64/dep.lib").exists());
    }

    #[test]
    fn test_missing_artifact_file_aborts_collection() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("dep");
        fs::create_dir_all(&dest).unwrap();

        let node = node_with_args(
            json!({
                "libraries": [{
                    "filepath": "no/such/file.lib",
                    "platforms": ["win64"],
                    "configs": ["debug"]
                }]
            }),
            &dest,
        );

        let mut skipped = Vec::new();
        let err = collect_artifacts(&node, &mut skipped).unwrap_err();
        assert!(matches!(err, CollectError::WriteFailed { .. }));
    }

    #[test]
    fn test_includes_copied_into_include_root() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("dep");
        fs::create_dir_all(dest.join("src/headers/nested")).unwrap();
        fs::write(dest.join("src/headers/dep.h"), "h").unwrap();
        fs::write(dest.join("src/headers/nested/deep.h"), "d").unwrap();

        let node = node_with_args(json!({ "include_dirs": ["src/headers"] }), &dest);

        let mut skipped = Vec::new();
        let report = collect_artifacts(&node, &mut skipped).unwrap();

        assert_eq!(report.include_dirs, 1);
        assert!(dest.join("include/dep.h").exists());
        assert!(dest.join("include/nested/deep.h").exists());
    }

    #[test]
    fn test_missing_include_directory_is_skipped() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("dep");
        fs::create_dir_all(dest.join("real")).unwrap();
        fs::write(dest.join("real/dep.h"), "h").unwrap();

        let node = node_with_args(
            json!({ "include_dirs": ["missing", "real"] }),
            &dest,
        );

        let mut skipped = Vec::new();
        let report = collect_artifacts(&node, &mut skipped).unwrap();

        // The missing directory reduces the count but is not fatal.
        assert_eq!(report.include_dirs, 1);
        assert!(dest.join("include/dep.h").exists());
    }

    #[test]
    fn test_repeated_includes_last_writer_wins() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("dep");
        fs::create_dir_all(dest.join("first")).unwrap();
        fs::create_dir_all(dest.join("second")).unwrap();
        fs::write(dest.join("first/common.h"), "first").unwrap();
        fs::write(dest.join("second/common.h"), "second").unwrap();

        let node = node_with_args(
            json!({ "include_dirs": ["first", "second"] }),
            &dest,
        );

        let mut skipped = Vec::new();
        collect_artifacts(&node, &mut skipped).unwrap();

        let content = fs::read_to_string(dest.join("include/common.h")).unwrap();
        assert_eq!(content, "second");
    }

    #[test]
    fn test_node_without_artifacts_reports_zero() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("dep");
        fs::create_dir_all(&dest).unwrap();

        let node = node_with_args(json!({}), &dest);

        let mut skipped = Vec::new();
        let report = collect_artifacts(&node, &mut skipped).unwrap();
        assert_eq!(report, CollectionReport::default());
    }
}
