//! Download progress display.

use fnaupdater::traits::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};

const BAR_TEMPLATE: &str = "  {bar:40.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";
const SPINNER_TEMPLATE: &str = "  {spinner} {bytes} ({bytes_per_sec})";

/// Build a progress callback that renders to stderr.
///
/// Switches from a spinner to a bar once the server reports a length, and
/// clears itself when the transfer completes. Nothing is drawn when stderr
/// is not a terminal.
pub fn download_progress() -> ProgressCallback {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template(SPINNER_TEMPLATE) {
        bar.set_style(style);
    }

    Box::new(move |downloaded, total| {
        if total > 0 && bar.length() != Some(total) {
            bar.set_length(total);
            if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
                bar.set_style(style.progress_chars("=> "));
            }
        }
        bar.set_position(downloaded);
        if total > 0 && downloaded >= total {
            bar.finish_and_clear();
        }
    })
}
