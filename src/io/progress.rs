//! Terminal progress for a batch whose length is not known up front

use crate::io::configuration::{PROGRESS_BAR_WIDTH, SPINNER_TICK_MS};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static ITEM_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_spinner()
        .template("{spinner} [{elapsed_precise}] Volumes: {pos} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
});

static PATCH_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    let template = format!("{{prefix}} [{{bar:{PROGRESS_BAR_WIDTH}.cyan/blue}}] {{pos}}/{{len}} patches");
    ProgressStyle::default_bar()
        .template(&template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏ ")
});

/// Two-line display: a counter of finished volumes and a patch bar for the current one
///
/// Inputs are streamed, so the volume line is a spinner rather than a bar.
pub struct ProgressReporter {
    multi_progress: MultiProgress,
    items: ProgressBar,
    patches: ProgressBar,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    /// Create the display; nothing is drawn until the first item starts
    pub fn new() -> Self {
        let multi_progress = MultiProgress::new();

        let items = multi_progress.add(ProgressBar::new_spinner());
        items.set_style(ITEM_STYLE.clone());
        items.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));

        let patches = multi_progress.add(ProgressBar::new(0));
        patches.set_style(PATCH_STYLE.clone());

        Self {
            multi_progress,
            items,
            patches,
        }
    }

    /// Show which volume is being worked on and reset the patch bar
    pub fn start_item(&self, identifier: &Path) {
        let name = identifier
            .file_name()
            .unwrap_or(identifier.as_os_str())
            .to_string_lossy()
            .to_string();
        self.items.set_message(name.clone());
        self.patches.set_prefix(name);
        self.patches.set_length(0);
        self.patches.set_position(0);
    }

    /// Report `done` of `total` patches finished for the current volume
    pub fn update_patches(&self, done: usize, total: usize) {
        self.patches.set_length(total as u64);
        self.patches.set_position(done as u64);
    }

    /// Count the current volume as finished
    pub fn complete_item(&self) {
        self.items.inc(1);
    }

    /// Number of volumes counted so far
    pub fn completed(&self) -> u64 {
        self.items.position()
    }

    /// Clean up all progress displays
    pub fn finish(&self) {
        self.patches.finish_and_clear();
        self.items.finish_with_message("done");
        let _ = self.multi_progress.clear();
    }
}
