//! The default resolve action.

use std::path::Path;

use depcollect::{Resolver, ResolverConfig};
use tracing::info;

use crate::error::CliError;
use crate::progress;

/// Resolve the dependency forest rooted at `root`.
///
/// With `force` set the whole tree is cleaned first and everything is
/// rebuilt from scratch. Returns an error when any dependency failed, so
/// the process exits non-zero even though the run itself completed.
pub fn run(root: &Path, force: bool) -> Result<(), CliError> {
    let resolver =
        Resolver::new(ResolverConfig::default()).with_progress(progress::console_progress());

    let summary = resolver.resolve(root, force);

    info!(
        resolved = summary.resolved,
        skipped = summary.skipped,
        failed = summary.failed,
        "Run complete"
    );

    if summary.has_failures() {
        return Err(CliError::ResolutionFailed {
            failed: summary.failed,
        });
    }
    Ok(())
}
