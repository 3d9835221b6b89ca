//! Progress display for extraction.

use console::Term;
use indicatif::ProgressBar;
use indicatif::ProgressState;
use indicatif::ProgressStyle;
use reassemble_core::ProgressCallback;
use std::fmt::Write;
use std::path::Path;
use std::time::Duration;

/// Spinner implementing `ProgressCallback`.
///
/// The snapshot's entry count is unknown until the stream ends, so this
/// shows a running count and byte total instead of a bar.
pub struct CliProgress {
    bar: ProgressBar,
    bytes_written: u64,
}

impl CliProgress {
    #[must_use]
    pub fn new(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();

        // "⠋ Extracting 1532 entries (48.2 MB)"
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg} {pos} entries ({bytes_total})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .with_key("bytes_total", |state: &ProgressState, w: &mut dyn Write| {
                    write!(w, "{}", humanize_bytes(state.len().unwrap_or(0))).unwrap_or(());
                }),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));

        Self {
            bar,
            bytes_written: 0,
        }
    }

    /// Checks if we should show progress (TTY detection).
    #[must_use]
    pub fn should_show() -> bool {
        Term::stderr().is_term()
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressCallback for CliProgress {
    fn on_entry(&mut self, _path: &Path, current: usize) {
        self.bar.set_position(current as u64);
    }

    fn on_bytes_written(&mut self, bytes: u64) {
        self.bytes_written += bytes;
        // The spinner has no length; it carries the byte total instead.
        self.bar.set_length(self.bytes_written);
    }

    fn on_complete(&mut self) {
        self.bar.finish_and_clear();
    }
}

/// Converts bytes to human-readable format (KB, MB, GB, TB).
#[allow(clippy::cast_precision_loss)]
fn humanize_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.1} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
