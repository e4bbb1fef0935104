//! Progress rendering for resolve runs.

use std::sync::Mutex;

use depcollect::{FetchProgressCallback, FetchStage};
use indicatif::{ProgressBar, ProgressStyle};

/// Bridge resolver progress callbacks onto an indicatif bar.
///
/// The resolver runs fully sequentially, so a single bar suffices; it is
/// replaced whenever the dependency or stage changes. Downloads without a
/// known content length render as a spinner instead of a bar.
pub fn console_progress() -> FetchProgressCallback {
    let state: Mutex<Option<(String, FetchStage, ProgressBar)>> = Mutex::new(None);

    Box::new(move |name, stage, done, total| {
        let mut state = state.lock().unwrap();

        let stale = match &*state {
            Some((current, current_stage, _)) => current != name || *current_stage != stage,
            None => true,
        };
        if stale {
            if let Some((_, _, bar)) = state.take() {
                bar.finish_and_clear();
            }
            let bar = new_bar(stage, total);
            bar.set_message(format!("{} {}", stage.name(), name));
            *state = Some((name.to_string(), stage, bar));
        }

        if let Some((_, _, bar)) = &*state {
            if total > 0 {
                bar.set_length(total);
            }
            bar.set_position(done);
        }
    })
}

fn new_bar(stage: FetchStage, total: u64) -> ProgressBar {
    if total == 0 {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg} {pos}")
                .expect("valid progress template"),
        );
        return bar;
    }

    let bar = ProgressBar::new(total);
    let template = match stage {
        FetchStage::Downloading => "{msg} [{bar:40}] {bytes}/{total_bytes}",
        FetchStage::Extracting => "{msg} [{bar:40}] {pos}/{len}",
    };
    bar.set_style(
        ProgressStyle::with_template(template)
            .expect("valid progress template")
            .progress_chars("=> "),
    );
    bar
}
