//! Batch-wide progress sink.
//!
//! Exactly one kind of indicator is live for a batch:
//! - more than one item: a single master bar, advanced once per item that
//!   reaches a terminal state; byte and conversion progress is dropped;
//! - exactly one item: per-stage byte and conversion bars, no master bar.
//!
//! The aggregator is created by the orchestrator and handed to every item's
//! run behind an `Arc`. The completed count is an atomic so concurrent items
//! can finish in any order.

use std::sync::atomic::{AtomicUsize, Ordering};

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::fetcher::FetchProgress;
use crate::transcode::ConversionProgress;

const MASTER_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} items {msg}";
const BYTES_TEMPLATE: &str =
    "{msg:20} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";
const UNBOUNDED_TEMPLATE: &str = "{spinner:.green} {msg:20} {bytes} ({bytes_per_sec})";
const PERCENT_TEMPLATE: &str = "{msg:20} [{bar:40.cyan/blue}] {pos:>3}%";

fn style(template: &str, fallback: fn() -> ProgressStyle) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .map(|s| s.progress_chars("#>-"))
        .unwrap_or_else(|_| fallback())
}

enum Display {
    Master(ProgressBar),
    PerItem(MultiProgress),
}

pub struct ProgressAggregator {
    display: Display,
    completed: AtomicUsize,
}

impl ProgressAggregator {
    /// Draws to stderr.
    pub fn new(items: usize) -> Self {
        Self::with_draw_target(items, ProgressDrawTarget::stderr())
    }

    /// Same mode selection as `new`, but nothing is drawn.
    pub fn hidden(items: usize) -> Self {
        Self::with_draw_target(items, ProgressDrawTarget::hidden())
    }

    pub fn with_draw_target(items: usize, target: ProgressDrawTarget) -> Self {
        let display = if items > 1 {
            let bar = ProgressBar::with_draw_target(Some(items as u64), target);
            bar.set_style(style(MASTER_TEMPLATE, ProgressStyle::default_bar));
            Display::Master(bar)
        } else {
            Display::PerItem(MultiProgress::with_draw_target(target))
        };
        Self {
            display,
            completed: AtomicUsize::new(0),
        }
    }

    pub fn is_master(&self) -> bool {
        matches!(self.display, Display::Master(_))
    }

    /// Byte bar for one fetch; inert in master mode.
    pub fn byte_reporter(&self, label: &str, declared: Option<u64>) -> ByteReporter {
        let Display::PerItem(multi) = &self.display else {
            return ByteReporter(None);
        };
        let bar = match declared {
            Some(total) if total > 0 => {
                let bar = multi.add(ProgressBar::new(total));
                bar.set_style(style(BYTES_TEMPLATE, ProgressStyle::default_bar));
                bar
            }
            _ => {
                let bar = multi.add(ProgressBar::new_spinner());
                bar.set_style(style(UNBOUNDED_TEMPLATE, ProgressStyle::default_spinner));
                bar
            }
        };
        bar.set_message(label.to_string());
        ByteReporter(Some(bar))
    }

    /// Percent bar for one conversion; inert in master mode.
    pub fn conversion_reporter(&self, label: &str) -> ConversionReporter {
        let Display::PerItem(multi) = &self.display else {
            return ConversionReporter(None);
        };
        let bar = multi.add(ProgressBar::new(100));
        bar.set_style(style(PERCENT_TEMPLATE, ProgressStyle::default_bar));
        bar.set_message(label.to_string());
        ConversionReporter(Some(bar))
    }

    /// Record one item reaching Done or Failed. Returns the new completed count.
    pub fn item_finished(&self) -> usize {
        let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if let Display::Master(bar) = &self.display {
            bar.inc(1);
        }
        done
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn finish(&self) {
        match &self.display {
            Display::Master(bar) => bar.finish(),
            Display::PerItem(multi) => {
                let _ = multi.clear();
            }
        }
    }

    #[cfg(test)]
    fn master_position(&self) -> Option<u64> {
        match &self.display {
            Display::Master(bar) => Some(bar.position()),
            Display::PerItem(_) => None,
        }
    }
}

/// Receives `FetchProgress`; cheap to clone into a blocking closure.
#[derive(Clone)]
pub struct ByteReporter(Option<ProgressBar>);

impl ByteReporter {
    #[cfg(test)]
    fn is_active(&self) -> bool {
        self.0.is_some()
    }

    pub fn report(&self, p: FetchProgress) {
        if let Some(bar) = &self.0 {
            if let Some(total) = p.total_bytes {
                bar.set_length(total);
            }
            bar.set_position(p.bytes_done);
        }
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.0 {
            bar.finish();
        }
    }
}

#[derive(Clone)]
pub struct ConversionReporter(Option<ProgressBar>);

impl ConversionReporter {
    pub fn report(&self, p: ConversionProgress) {
        if let (Some(bar), Some(pct)) = (&self.0, p.percent()) {
            bar.set_position(pct.round() as u64);
        }
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.0 {
            bar.set_position(100);
            bar.finish();
        }
    }
}
