//! Resolution and clean driving over the directory forest.
//!
//! The resolver walks the directory nodes loaded from manifests and either
//! processes them (lock check, fetch, artifact collection) or cleans their
//! materialized output. Execution is fully sequential: within one manifest
//! every dependency resolves before any subdirectory is entered, and a
//! dependency's sub-dependencies materialize before the dependency itself.
//!
//! # Architecture
//!
//! ```text
//! Resolver
//!     │
//!     ├── DirectoryNode forest (loaded per invocation)
//!     ├── FetchEngine (download + validate + extract)
//!     │       └── Downloader (trait; HTTP in production)
//!     ├── artifact collection (lib/bin/include trees)
//!     └── lock records (staleness markers per dependency)
//! ```

use std::fs;
use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::collect::collect_artifacts;
use crate::config::ResolverConfig;
use crate::dependency::DependencyNode;
use crate::directory::DirectoryNode;
use crate::error::{CollectError, CollectResult};
use crate::fetch::{Downloader, FetchEngine, HttpDownloader};
use crate::fsutil::{remove_dir_all_observed, Clock, RemovalWait, SystemClock};
use crate::lock::{self, LockRecord};


/// Stages reported through the resolve progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    /// Downloading the source archive; counts are bytes (total 0 when the
    /// server announces no content length).
    Downloading,

    /// Extracting archive entries; counts are entries.
    Extracting,
}

impl FetchStage {
    /// Human-readable name for the stage.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Downloading => "Downloading",
            Self::Extracting => "Extracting",
        }
    }
}

/// Progress callback for resolve operations.
///
/// # Arguments
///
/// * dependency name
/// * current stage
/// * units done within the stage
/// * total units (0 when unknown)
pub type FetchProgressCallback = Box<dyn Fn(&str, FetchStage, u64, u64) + Send + Sync>;

/// Totals across one processing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Dependencies fetched and materialized.
    pub resolved: usize,

    /// Dependencies skipped because their lock matched.
    pub skipped: usize,

    /// Dependencies that failed; siblings and ancestors continue regardless.
    pub failed: usize,
}

impl RunSummary {
    /// True when at least one dependency failed.
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    fn absorb(&mut self, other: RunSummary) {
        self.resolved += other.resolved;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Resolves and materializes the dependency forest.
pub struct Resolver<D = HttpDownloader, C = SystemClock> {
    config: ResolverConfig,
    fetch_engine: FetchEngine<D>,
    clock: C,
    on_progress: Option<FetchProgressCallback>,
}

impl Resolver {
    /// Create a resolver with production wiring: an HTTP downloader using
    /// the configured timeout and the system clock.
    pub fn new(config: ResolverConfig) -> Self {
        let downloader = HttpDownloader::with_timeout(config.http_timeout);
        Self::with_parts(config, downloader, SystemClock)
    }
}

impl<D: Downloader, C: Clock> Resolver<D, C> {
    /// Create a resolver from explicit parts.
    ///
    /// The seam tests use to substitute the network and the clock.
    pub fn with_parts(config: ResolverConfig, downloader: D, clock: C) -> Self {
        let fetch_engine = FetchEngine::new(downloader, config.staging_dir.clone());
        Self {
            config,
            fetch_engine,
            clock,
            on_progress: None,
        }
    }

    /// Attach a progress callback (builder pattern).
    pub fn with_progress(mut self, on_progress: FetchProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    /// The default action: load the forest rooted at `root` and process it,
    /// cleaning the whole tree first when `force` is set.
    pub fn resolve(&self, root: &Path, force: bool) -> RunSummary {
        let tree = DirectoryNode::load(root, &self.config);
        if force {
            self.clean(&tree);
        }
        self.process(&tree)
    }

    /// Process every dependency of `directory`, then recurse into its
    /// subdirectories. An invalid directory node is a no-op.
    pub fn process(&self, directory: &DirectoryNode) -> RunSummary {
        let mut summary = RunSummary::default();
        if !directory.is_valid {
            return summary;
        }

        for node in directory.dependencies.values() {
            summary.absorb(self.process_node(node));
        }
        for sub in &directory.subdirectories {
            summary.absorb(self.process(sub));
        }

        summary
    }

    /// Delete every container directory reachable from `root`.
    pub fn clean_tree(&self, root: &Path) {
        let tree = DirectoryNode::load(root, &self.config);
        self.clean(&tree);
    }

    /// Delete `directory`'s container directory and recurse into its
    /// subdirectories. Lock files vanish with the tree; clean never
    /// consults them individually.
    pub fn clean(&self, directory: &DirectoryNode) {
        if !directory.is_valid {
            return;
        }

        if directory.container_directory.exists() {
            info!(path = %directory.container_directory.display(), "Removing container directory");
            if let Err(e) = fs::remove_dir_all(&directory.container_directory) {
                error!(
                    path = %directory.container_directory.display(),
                    error = %e,
                    "Failed to remove container directory"
                );
            }
        }

        for sub in &directory.subdirectories {
            self.clean(sub);
        }
    }

    fn process_node(&self, node: &DependencyNode) -> RunSummary {
        let mut summary = RunSummary::default();
        let fingerprint = node.fingerprint();

        if lock::is_satisfied(&node.destination_path, &fingerprint) {
            info!(dependency = %node.name, "Skipped, already installed");
            summary.skipped += 1;
            return summary;
        }

        if node.destination_path.exists() {
            match remove_dir_all_observed(
                &node.destination_path,
                &self.clock,
                self.config.removal_timeout,
                self.config.removal_poll_interval,
            ) {
                Ok(RemovalWait::Observed) => {}
                Ok(RemovalWait::TimedOut) => {
                    // Proceeding is optimistic: a not-yet-finished OS-level
                    // delete can still race the mkdir below.
                    warn!(
                        dependency = %node.name,
                        path = %node.destination_path.display(),
                        "Removal not yet observable after waiting, proceeding"
                    );
                }
                Err(e) => {
                    error!(dependency = %node.name, error = %e, "Could not remove stale destination");
                    summary.failed += 1;
                    return summary;
                }
            }
        }

        // Sub-dependencies materialize before this node does.
        for child in node.sub_dependencies.values() {
            summary.absorb(self.process_node(child));
        }

        match self.materialize(node, &fingerprint) {
            Ok(()) => summary.resolved += 1,
            Err(e) => {
                error!(dependency = %node.name, error = %e, "Failed to resolve dependency");
                summary.failed += 1;
            }
        }

        summary
    }

    /// Fetch, collect, and lock one node. The lock record is the commit
    /// marker: it is written only after collection succeeds.
    fn materialize(&self, node: &DependencyNode, fingerprint: &str) -> CollectResult<()> {
        fs::create_dir_all(&node.destination_path).map_err(|e| CollectError::CreateDirFailed {
            path: node.destination_path.clone(),
            source: e,
        })?;
        LockRecord::remove(&node.destination_path);

        if node.source_url.is_some() {
            if let Some(cb) = self.on_progress.as_ref() {
                let on_download =
                    |bytes: u64, total: u64| cb(&node.name, FetchStage::Downloading, bytes, total);
                let on_extract = |done: usize, total: usize| {
                    cb(&node.name, FetchStage::Extracting, done as u64, total as u64)
                };
                self.fetch_engine
                    .fetch(node, Some(&on_download), Some(&on_extract))?;
            } else {
                self.fetch_engine.fetch(node, None, None)?;
            }
        } else {
            debug!(dependency = %node.name, "No source URL declared, nothing to fetch");
        }

        let mut skipped = Vec::new();
        collect_artifacts(node, &mut skipped)?;

        LockRecord::new(fingerprint).write(&node.destination_path)?;
        info!(dependency = %node.name, "Dependency resolved");
        Ok(())
    }
}
