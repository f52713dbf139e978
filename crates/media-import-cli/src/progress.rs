use indicatif::{ProgressBar, ProgressStyle};
use media_import_core::{ScanEvent, ScanObserver, ScanResult};
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Drives an indicatif bar from scan events.
///
/// - Enumeration: spinner (total unknown)
/// - Classification: bar over the candidate total
pub struct CliObserver {
    bar: ProgressBar,
}

impl CliObserver {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            bar.set_style(style.tick_chars(TICK_CHARS));
        }
        bar.set_message("Looking for media files...");
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }

    fn start_hashing(&self, total: usize) {
        if let Ok(style) = ProgressStyle::with_template(
            "  {spinner:.cyan} Hashing [{bar:30.cyan/dim}] {pos}/{len} files ({eta} remaining)",
        ) {
            self.bar
                .set_style(style.progress_chars("━╸─").tick_chars(TICK_CHARS));
        }
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
    }
}

impl ScanObserver for CliObserver {
    fn on_scan_event(&self, event: &ScanEvent, result: &ScanResult) {
        match event {
            ScanEvent::CandidatesCounted { total } => self.start_hashing(*total),
            ScanEvent::Processed { .. } => {
                self.bar
                    .set_position((result.processed_count() + result.failed_count()) as u64);
            }
            ScanEvent::Warning(warning) => {
                self.bar.suspend(|| eprintln!("  ! {}", warning));
                self.bar
                    .set_position((result.processed_count() + result.failed_count()) as u64);
            }
            ScanEvent::Canceled => self.bar.set_message("Canceling..."),
            ScanEvent::Finalized => self.bar.finish_and_clear(),
            ScanEvent::DuplicateFound { .. } => {}
        }
    }
}
