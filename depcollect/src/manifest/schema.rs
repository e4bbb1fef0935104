//! Structural validation of raw manifest values.
//!
//! Every JSON value read from a manifest passes through one of these checks
//! before any of it is trusted. Failures carry the JSON path of the
//! violating value and the constraint it broke, so entry-level skips can be
//! reported precisely.

use serde_json::Value;
use url::Url;

use crate::error::SchemaError;
use crate::source::SourceType;

/// Validate a directory manifest value.
///
/// The manifest itself must be an object; `subdirectories` (array of
/// strings), `container_directory_name` (string) and `dependencies` (object)
/// are optional. Dependency entry values are unconstrained at this level and
/// validated individually when the dependency tree is built.
pub fn validate_directory_manifest(value: &Value) -> Result<(), SchemaError> {
    let obj = require_object(value, "")?;

    if let Some(subdirs) = obj.get("subdirectories") {
        require_string_array(subdirs, "subdirectories")?;
    }
    if let Some(name) = obj.get("container_directory_name") {
        require_string(name, "container_directory_name")?;
    }
    if let Some(deps) = obj.get("dependencies") {
        require_object(deps, "dependencies")?;
    }

    Ok(())
}

/// Validate a single dependency entry at `path`.
///
/// All fields are optional; present fields must have the right shape. The
/// elements of `libraries`/`binaries` must be objects here, but their inner
/// fields are checked by [`validate_artifact_entry`] when artifacts are
/// collected, so one malformed artifact does not reject the whole entry.
pub fn validate_dependency_entry(value: &Value, path: &str) -> Result<(), SchemaError> {
    let obj = require_object(value, path)?;

    if let Some(subs) = obj.get("sub_dependencies") {
        require_object(subs, &field(path, "sub_dependencies"))?;
    }

    if let Some(url) = obj.get("url") {
        let url_path = field(path, "url");
        let text = require_string(url, &url_path)?;
        Url::parse(text)
            .map_err(|e| SchemaError::new(&url_path, format!("not a valid URI: {}", e)))?;
    }

    if let Some(url_type) = obj.get("url_type") {
        let type_path = field(path, "url_type");
        let text = require_string(url_type, &type_path)?;
        if SourceType::from_manifest_str(text).is_none() {
            return Err(SchemaError::new(
                &type_path,
                format!("'{}' is not one of `archive`, `git`", text),
            ));
        }
    }

    for key in ["libraries", "binaries"] {
        if let Some(list) = obj.get(key) {
            require_object_array(list, &field(path, key))?;
        }
    }

    if let Some(dirs) = obj.get("include_dirs") {
        require_string_array(dirs, &field(path, "include_dirs"))?;
    }

    Ok(())
}

/// Validate a library/binary entry at `path`.
///
/// Requires `filepath` (string), `platforms` (array of strings) and
/// `configs` (array of strings).
pub fn validate_artifact_entry(value: &Value, path: &str) -> Result<(), SchemaError> {
    let obj = require_object(value, path)?;

    for key in ["filepath", "platforms", "configs"] {
        if !obj.contains_key(key) {
            return Err(SchemaError::new(path, format!("missing required field `{}`", key)));
        }
    }

    require_string(&obj["filepath"], &field(path, "filepath"))?;
    require_string_array(&obj["platforms"], &field(path, "platforms"))?;
    require_string_array(&obj["configs"], &field(path, "configs"))?;

    Ok(())
}

/// Validate an archive-extraction filter at `path`.
///
/// `dirs` and `files` are both optional arrays of strings. Whether a filter
/// that defaults to empty is treated as absent is the caller's concern.
pub fn validate_extract_filter(value: &Value, path: &str) -> Result<(), SchemaError> {
    let obj = require_object(value, path)?;

    for key in ["dirs", "files"] {
        if let Some(list) = obj.get(key) {
            require_string_array(list, &field(path, key))?;
        }
    }

    Ok(())
}

fn field(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn require_object<'a>(
    value: &'a Value,
    path: &str,
) -> Result<&'a serde_json::Map<String, Value>, SchemaError> {
    value
        .as_object()
        .ok_or_else(|| SchemaError::new(path, "must be an object"))
}

fn require_string<'a>(value: &'a Value, path: &str) -> Result<&'a str, SchemaError> {
    value
        .as_str()
        .ok_or_else(|| SchemaError::new(path, "must be a string"))
}

fn require_string_array(value: &Value, path: &str) -> Result<(), SchemaError> {
    let list = value
        .as_array()
        .ok_or_else(|| SchemaError::new(path, "must be an array of strings"))?;
    for (index, element) in list.iter().enumerate() {
        if !element.is_string() {
            return Err(SchemaError::new(
                format!("{}[{}]", path, index),
                "must be a string",
            ));
        }
    }
    Ok(())
}

fn require_object_array(value: &Value, path: &str) -> Result<(), SchemaError> {
    let list = value
        .as_array()
        .ok_or_else(|| SchemaError::new(path, "must be an array of objects"))?;
    for (index, element) in list.iter().enumerate() {
        if !element.is_object() {
            return Err(SchemaError::new(
                format!("{}[{}]", path, index),
                "must be an object",
            ));
        }
    }
    Ok(())
}
