use std::sync::atomic::{AtomicU64, Ordering};

use indicatif::{ProgressBar, ProgressStyle};

/// Receives one tick per settled lookup, successful or not.
pub trait ProgressReporter: Send + Sync {
	fn inc(&self, n: u64);
	fn finish(&self) {}
}

/// Terminal progress bar for interactive scans.
pub struct BarProgress {
	bar: ProgressBar,
}

impl BarProgress {
	pub fn new(total: u64) -> Self {
		let bar = ProgressBar::new(total);
		if let Ok(style) = ProgressStyle::with_template(
			"Scanning #{pos} of {len}... {wide_bar} {percent}% | {eta} remaining",
		) {
			bar.set_style(style.progress_chars("█▓░"));
		}
		Self { bar }
	}
}

impl ProgressReporter for BarProgress {
	fn inc(&self, n: u64) {
		self.bar.inc(n);
	}

	fn finish(&self) {
		self.bar.finish();
	}
}

/// Silent reporter that only counts; used with `--quiet` and in tests.
#[derive(Debug, Default)]
pub struct CountingProgress {
	count: AtomicU64,
}

impl CountingProgress {
	#[cfg(test)]
	pub fn count(&self) -> u64 {
		self.count.load(Ordering::Relaxed)
	}
}

impl ProgressReporter for CountingProgress {
	fn inc(&self, n: u64) {
		self.count.fetch_add(n, Ordering::Relaxed);
	}
}
