use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Progress over PDFs whose pipeline has finished. The length grows as the
/// walk discovers more PDFs.
#[derive(Clone)]
pub struct ProgressTracker {
    bar: ProgressBar,
    completed: Arc<AtomicUsize>,
}

impl ProgressTracker {
    pub fn new(visible: bool) -> Self {
        let target = if visible {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        };
        let bar = ProgressBar::with_draw_target(Some(0), target);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        bar.set_message("Converting covers...");

        Self {
            bar,
            completed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn discovered(&self) {
        self.bar.inc_length(1);
    }

    pub fn increment(&self) {
        let count = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        self.bar.set_position(count as u64);
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("done");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_across_clones() {
        let progress = ProgressTracker::new(false);
        let other = progress.clone();
        progress.discovered();
        progress.discovered();
        other.increment();
        progress.increment();
        assert_eq!(progress.bar.position(), 2);
        assert_eq!(progress.bar.length(), Some(2));
        progress.finish();
    }
}
