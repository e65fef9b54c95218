#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the `bo_etl` binary.
//!
//! [`init_logger`] routes `log` records through `pretty_env_logger` and
//! `indicatif-log-bridge`, so log lines are printed above the progress
//! bars instead of tearing them. [`IndicatifProgress`] renders the
//! pipeline's [`ProgressCallback`] events.

use std::sync::Arc;
use std::time::Duration;

use bo_etl_source::progress::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

const SPINNER_TICK: Duration = Duration::from_millis(100);

/// An `indicatif` [`ProgressBar`] that implements [`ProgressCallback`].
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Style applied once `set_total()` provides a length.
    bar_style: ProgressStyle,
}

impl IndicatifProgress {
    /// Bar for the workbook loading stage: one step per file.
    ///
    /// The file count is only known once the input pattern is expanded,
    /// so the bar starts empty and is sized by `set_total()`.
    #[must_use]
    pub fn steps_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        let bar_style = bar_style("{msg} {wide_bar:.green/dim} {pos}/{len} [{elapsed_precise}]");
        let bar = multi.add(ProgressBar::new(0));
        bar.set_style(bar_style.clone());
        bar.set_message(message.to_string());

        Arc::new(Self { bar, bar_style })
    }

    /// Bar for geocoding lookups: a spinner until the number of pending
    /// addresses is known, then a bar with an ETA.
    ///
    /// At one lookup per second the ETA is the useful part.
    #[must_use]
    pub fn batch_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(SPINNER_TICK);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.yellow} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        let bar_style = bar_style("  {msg} {wide_bar:.yellow/dim} {pos}/{len} {percent}% [{eta}]");

        Arc::new(Self { bar, bar_style })
    }
}

fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-")
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(self.bar_style.clone());
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }

    fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

/// Initializes the global logger wrapped in `indicatif-log-bridge`.
///
/// The level comes from `RUST_LOG` and defaults to `info` when unset.
/// Returns the [`MultiProgress`] that all progress bars must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let mut builder = pretty_env_logger::formatted_builder();
    if std::env::var_os("RUST_LOG").is_some() {
        builder.parse_env("RUST_LOG");
    } else {
        builder.filter_level(log::LevelFilter::Info);
    }
    let logger = builder.build();
    let level = logger.filter();

    // Already set in tests.
    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok();

    log::set_max_level(level);

    multi
}
