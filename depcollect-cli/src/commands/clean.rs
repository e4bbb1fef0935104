//! The destructive clean action.

use std::path::Path;

use console::style;
use depcollect::{Resolver, ResolverConfig};
use dialoguer::Confirm;

use crate::error::CliError;

/// Delete every materialized dependency reachable from `root`.
///
/// Asks for confirmation first unless `yes` is set; the library side never
/// prompts and assumes the caller has already confirmed.
pub fn run(root: &Path, yes: bool) -> Result<(), CliError> {
    if !yes {
        let prompt = format!(
            "Delete every materialized dependency under {}?",
            root.display()
        );
        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?;
        if !confirmed {
            println!("{}", style("Aborted.").yellow());
            return Ok(());
        }
    }

    let resolver = Resolver::new(ResolverConfig::default());
    resolver.clean_tree(root);
    Ok(())
}
