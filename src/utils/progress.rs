//! Live progress display for scans.
//!
//! The scanner's progress callback fires from worker threads with no
//! ordering guarantee, so the display keeps its state in atomics and
//! throttles repaints. Rendering is decoupled from the core: the scanner
//! only ever sees the plain callback produced by [`ScanDisplay::callback`].

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::types::ProgressCallback;

/// A single-line spinner showing file/directory counts and scan rate.
pub struct ScanDisplay {
    bar: ProgressBar,
    files: AtomicU64,
    dirs: AtomicU64,
    start_time: Instant,
    last_update: AtomicU64,
}

impl ScanDisplay {
    pub fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(80));

        Arc::new(Self {
            bar,
            files: AtomicU64::new(0),
            dirs: AtomicU64::new(0),
            start_time: Instant::now(),
            last_update: AtomicU64::new(0),
        })
    }

    /// The callback handed to the scanner. Tolerates concurrent calls.
    pub fn callback(self: &Arc<Self>) -> ProgressCallback {
        let display = Arc::clone(self);
        Arc::new(move |path: &str, files: u64, dirs: u64| display.update(path, files, dirs))
    }

    fn update(&self, path: &str, files: u64, dirs: u64) {
        self.files.fetch_max(files, Ordering::Relaxed);
        self.dirs.fetch_max(dirs, Ordering::Relaxed);

        // Repaint at most every 50ms; racing workers may skip a frame.
        let now_ms = self.start_time.elapsed().as_millis() as u64;
        let last = self.last_update.load(Ordering::Relaxed);
        if now_ms.saturating_sub(last) > 50
            && self
                .last_update
                .compare_exchange(last, now_ms, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
        {
            self.repaint(path);
        }
    }

    fn repaint(&self, current_path: &str) {
        let files = self.files.load(Ordering::Relaxed);
        let dirs = self.dirs.load(Ordering::Relaxed);
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 {
            ((files + dirs) as f64 / elapsed) as u64
        } else {
            0
        };

        self.bar.set_message(format!(
            "{}  {} files • {} dirs ({}/s)  {}",
            "Scanning".bright_blue(),
            files.to_string().bright_white(),
            dirs.to_string().bright_white(),
            rate.to_string().dimmed(),
            tail(current_path, 48).dimmed()
        ));
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// The last `max` characters of a path, ellipsized.
fn tail(path: &str, max: usize) -> String {
    let count = path.chars().count();
    if count <= max {
        return path.to_string();
    }
    let skipped = count - max;
    format!("…{}", path.chars().skip(skipped + 1).collect::<String>())
}
