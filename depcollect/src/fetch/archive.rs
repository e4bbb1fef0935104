//! Archive validation and selective extraction.
//!
//! Downloaded archives are gzip-compressed tarballs. Validation walks every
//! entry header before anything is written to disk; extraction preserves the
//! archive's internal relative paths under the destination and can be
//! narrowed to a declared subset of entries.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::Path;

use flate2::read::GzDecoder;
use serde_json::{Map, Value};
use tar::Archive;
use tracing::warn;

use crate::error::{CollectError, CollectResult};
use crate::manifest::schema;

/// Subset of archive entries to extract.
///
/// The selected set is the union of every entry whose path starts with one
/// of `dirs` and every path listed exactly in `files`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractFilter {
    /// Directory prefixes selecting every entry beneath them.
    pub dirs: Vec<String>,

    /// Exact entry paths.
    pub files: Vec<String>,
}

impl ExtractFilter {
    /// Parse the `archive_extract_items` filter from a dependency's args.
    ///
    /// Returns `None` when the filter is absent, structurally invalid
    /// (logged), or empty after defaulting; all three mean "extract every
    /// entry".
    pub fn from_args(args: &Map<String, Value>) -> Option<ExtractFilter> {
        let value = args.get("archive_extract_items")?;

        if let Err(reason) = schema::validate_extract_filter(value, "archive_extract_items") {
            warn!(error = %reason, "Ignoring invalid archive_extract_items filter");
            return None;
        }

        let obj = value.as_object()?;
        let dirs = string_list(obj.get("dirs"));
        let files = string_list(obj.get("files"));

        if dirs.is_empty() && files.is_empty() {
            None
        } else {
            Some(ExtractFilter { dirs, files })
        }
    }

    /// True when `entry_path` belongs to the selected set.
    pub fn matches(&self, entry_path: &str) -> bool {
        self.dirs.iter().any(|dir| entry_path.starts_with(dir.as_str()))
            || self.files.iter().any(|file| file == entry_path)
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
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

/// Check that `path` is a well-formed gzip tar archive.
///
/// Walks every entry header (which drains the whole compressed stream) and
/// returns the entry count.
///
/// # Errors
///
/// `BadArchive` when the stream is not gzip, the tar structure is damaged,
/// or an entry header is unreadable.
pub fn validate_archive(path: &Path) -> CollectResult<usize> {
    let file = File::open(path).map_err(|e| CollectError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut archive = Archive::new(GzDecoder::new(BufReader::new(file)));

    let mut count = 0;
    for entry in archive.entries().map_err(|e| bad_archive(path, &e))? {
        let entry = entry.map_err(|e| bad_archive(path, &e))?;
        entry.path().map_err(|e| bad_archive(path, &e))?;
        count += 1;
    }

    Ok(count)
}

/// Extract the selected entries of the archive at `path` into `dest`.
///
/// With no filter every entry is extracted. Entry paths that escape the
/// destination are skipped. `on_progress` receives
/// `(entries_processed, total_entries)` as the walk advances. Returns the
/// number of entries extracted.
pub fn extract_archive(
    path: &Path,
    dest: &Path,
    filter: Option<&ExtractFilter>,
    total_entries: usize,
    on_progress: Option<&dyn Fn(usize, usize)>,
) -> CollectResult<usize> {
    fs::create_dir_all(dest).map_err(|e| CollectError::CreateDirFailed {
        path: dest.to_path_buf(),
        source: e,
    })?;

    let file = File::open(path).map_err(|e| CollectError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut archive = Archive::new(GzDecoder::new(BufReader::new(file)));

    let mut processed = 0;
    let mut extracted = 0;
    for entry in archive.entries().map_err(|e| bad_archive(path, &e))? {
        let mut entry = entry.map_err(|e| bad_archive(path, &e))?;
        processed += 1;

        let entry_path = entry
            .path()
            .map_err(|e| bad_archive(path, &e))?
            .into_owned();
        let entry_name = entry_path.to_string_lossy().to_string();

        // Entries that climb out of the destination are never written.
        if entry_name.split('/').any(|component| component == "..") {
            warn!(entry = %entry_name, "Skipping archive entry that escapes the destination");
            continue;
        }

        if let Some(filter) = filter {
            if !filter.matches(&entry_name) {
                continue;
            }
        }

        let dest_path = dest.join(&entry_path);
        if entry.header().entry_type().is_dir() {
            fs::create_dir_all(&dest_path).map_err(|e| CollectError::CreateDirFailed {
                path: dest_path.clone(),
                source: e,
            })?;
        } else {
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent).map_err(|e| CollectError::CreateDirFailed {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
            let mut out = File::create(&dest_path).map_err(|e| CollectError::WriteFailed {
                path: dest_path.clone(),
                source: e,
            })?;
            io::copy(&mut entry, &mut out).map_err(|e| CollectError::WriteFailed {
                path: dest_path.clone(),
                source: e,
            })?;
        }

        extracted += 1;
        if let Some(cb) = on_progress {
            cb(processed, total_entries);
        }
    }

    Ok(extracted)
}

fn bad_archive(path: &Path, error: &io::Error) -> CollectError {
    CollectError::BadArchive {
        path: path.to_path_buf(),
        reason: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::testutil::targz_bytes;

    fn write_archive(dir: &Path, entries: &[(&str, &[u8])]) -> std::path::PathBuf {
        let path = dir.join("fixture.tar.gz");
        fs::write(&path, targz_bytes(entries)).unwrap();
        path
    }

    #[test]
    fn test_validate_counts_entries() {
        let temp = TempDir::new().unwrap();
        let archive = write_archive(
            temp.path(),
            &[("a/x.txt", b"x" as &[u8]), ("a/y.txt", b"y"), ("b/z.txt", b"z")],
        );

        assert_eq!(validate_archive(&archive).unwrap(), 3);
    }

    #[test]
    fn test_validate_rejects_garbage() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("junk.tar.gz");
        fs::write(&path, b"definitely not gzip").unwrap();

        let err = validate_archive(&path).unwrap_err();
        assert!(matches!(err, CollectError::BadArchive { .. }));
    }

    #[test]
    fn test_validate_missing_file() {
        let err = validate_archive(Path::new("/nonexistent/archive.tar.gz")).unwrap_err();
        assert!(matches!(err, CollectError::ReadFailed { .. }));
    }

    #[test]
    fn test_extract_all_entries_without_filter() {
        let temp = TempDir::new().unwrap();
        let archive = write_archive(
            temp.path(),
            &[("a/x.txt", b"x" as &[u8]), ("a/y.txt", b"y"), ("b/z.txt", b"z")],
        );
        let dest = temp.path().join("out");

        let extracted = extract_archive(&archive, &dest, None, 3, None).unwrap();

        assert_eq!(extracted, 3);
        assert!(dest.join("a/x.txt").exists());
        assert!(dest.join("a/y.txt").exists());
        assert!(dest.join("b/z.txt").exists());
    }

    #[test]
    fn test_extract_filter_selects_union_of_dirs_and_files() {
        let temp = TempDir::new().unwrap();
        let archive = write_archive(
            temp.path(),
            &[("a/x.txt", b"x" as &[u8]), ("a/y.txt", b"y"), ("b/z.txt", b"z")],
        );
        let dest = temp.path().join("out");

        let filter = ExtractFilter {
            dirs: vec!["a/".to_string()],
            files: vec!["b/z.txt".to_string()],
        };
        let extracted = extract_archive(&archive, &dest, Some(&filter), 3, None).unwrap();

        assert_eq!(extracted, 3);
        assert!(dest.join("a/x.txt").exists());
        assert!(dest.join("a/y.txt").exists());
        assert!(dest.join("b/z.txt").exists());
    }

    #[test]
    fn test_extract_filter_excludes_unselected_entries() {
        let temp = TempDir::new().unwrap();
        let archive = write_archive(
            temp.path(),
            &[("a/x.txt", b"x" as &[u8]), ("b/z.txt", b"z")],
        );
        let dest = temp.path().join("out");

        let filter = ExtractFilter {
            dirs: vec!["a/".to_string()],
            files: vec![],
        };
        let extracted = extract_archive(&archive, &dest, Some(&filter), 2, None).unwrap();

        assert_eq!(extracted, 1);
        assert!(dest.join("a/x.txt").exists());
        assert!(!dest.join("b/z.txt").exists());
    }

    #[test]
    fn test_extract_preserves_contents() {
        let temp = TempDir::new().unwrap();
        let archive =
            write_archive(temp.path(), &[("include/dep.h", b"#pragma once\n" as &[u8])]);
        let dest = temp.path().join("out");

        extract_archive(&archive, &dest, None, 1, None).unwrap();

        let content = fs::read_to_string(dest.join("include/dep.h")).unwrap();
        assert_eq!(content, "#pragma once\n");
    }

    #[test]
    fn test_extract_skips_escaping_entries() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use tar::{Builder, Header};

        // tar::Builder refuses to write `..` through set_path, so the raw
        // GNU name field is filled directly to model a hostile archive.
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        {
            let mut builder = Builder::new(&mut encoder);

            let mut header = Header::new_gnu();
            header.set_size(3);
            header.set_mode(0o644);
            {
                let gnu = header.as_gnu_mut().unwrap();
                let name = b"../escape.txt";
                gnu.name[..name.len()].copy_from_slice(name);
            }
            header.set_cksum();
            builder.append(&header, &b"bad"[..]).unwrap();

            let mut ok = Header::new_gnu();
            ok.set_size(4);
            ok.set_mode(0o644);
            ok.set_cksum();
            builder.append_data(&mut ok, "ok.txt", &b"good"[..]).unwrap();

            builder.finish().unwrap();
        }
        let bytes = encoder.finish().unwrap();

        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("hostile.tar.gz");
        fs::write(&archive, bytes).unwrap();
        let dest = temp.path().join("out");

        let extracted = extract_archive(&archive, &dest, None, 2, None).unwrap();

        assert_eq!(extracted, 1);
        assert!(dest.join("ok.txt").exists());
        assert!(!temp.path().join("escape.txt").exists());
    }

    #[test]
    fn test_extract_reports_progress() {
        let temp = TempDir::new().unwrap();
        let archive = write_archive(
            temp.path(),
            &[("a.txt", b"a" as &[u8]), ("b.txt", b"b")],
        );
        let dest = temp.path().join("out");

        let seen = std::cell::RefCell::new(Vec::new());
        let callback = |done: usize, total: usize| seen.borrow_mut().push((done, total));
        extract_archive(&archive, &dest, None, 2, Some(&callback)).unwrap();

        assert_eq!(*seen.borrow(), vec![(1, 2), (2, 2)]);
    }

    #[test]
    fn test_filter_from_args_absent() {
        let args = json!({}).as_object().unwrap().clone();
        assert!(ExtractFilter::from_args(&args).is_none());
    }

    #[test]
    fn test_filter_from_args_empty_is_absent() {
        let args = json!({ "archive_extract_items": { "dirs": [], "files": [] } })
            .as_object()
            .unwrap()
            .clone();
        assert!(ExtractFilter::from_args(&args).is_none());
    }

    #[test]
    fn test_filter_from_args_invalid_is_absent() {
        let args = json!({ "archive_extract_items": { "dirs": "include/" } })
            .as_object()
            .unwrap()
            .clone();
        assert!(ExtractFilter::from_args(&args).is_none());
    }

    #[test]
    fn test_filter_from_args_valid() {
        let args = json!({ "archive_extract_items": { "dirs": ["include/"], "files": ["README"] } })
            .as_object()
            .unwrap()
            .clone();
        let filter = ExtractFilter::from_args(&args).unwrap();
        assert_eq!(filter.dirs, vec!["include/"]);
        assert_eq!(filter.files, vec!["README"]);
    }

    #[test]
    fn test_filter_matches() {
        let filter = ExtractFilter {
            dirs: vec!["include/".to_string()],
            files: vec!["LICENSE".to_string()],
        };
        assert!(filter.matches("include/dep.h"));
        assert!(filter.matches("LICENSE"));
        assert!(!filter.matches("src/dep.c"));
        assert!(!filter.matches("LICENSE.md"));
    }
}
