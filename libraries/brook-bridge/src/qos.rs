//! Quality-of-service translation
//!
//! Downstream quality reports describe what fraction of buffers the
//! upstream should keep, in parts per thousand. The engine wants the
//! inverse: how much faster it should produce. A proportion of 500 means
//! half the buffers should be dropped because they take twice as long as
//! they should to arrive, so the engine is told to run at 2.0x.

use brook_core::{QualityKind, QualityReport};
use tracing::warn;

/// Translated notification ready to hand to the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QosNotification {
    /// The consumer is genuinely starved
    pub is_underrun: bool,
    /// Production rate multiplier (1000 / proportion)
    pub rate_multiplier: f64,
    /// Lateness, clamped so `timestamp + diff` stays nonnegative
    pub diff: i64,
    /// Report timestamp, clamped to nonnegative
    pub timestamp: u64,
}

/// Translate a downstream quality report into an engine notification
///
/// Returns `None` for a zero-proportion report, which carries no usable
/// rate information.
pub fn translate(report: &QualityReport) -> Option<QosNotification> {
    if report.proportion == 0 {
        warn!("ignoring quality report with zero proportion");
        return None;
    }

    // Consumers sometimes report the current time rather than the time of
    // the last buffer, which can be negative; clamp to 0.
    let timestamp = u64::try_from(report.timestamp).unwrap_or(0);

    // timestamp + diff must stay nonnegative.
    let mut diff = report.lateness;
    if diff < 0 && timestamp < diff.unsigned_abs() {
        diff = -(timestamp as i64);
    }

    // An overflow report can also mean "on time"; only a starvation report
    // with an actual deficit counts as an underrun.
    let is_underrun = report.kind == QualityKind::Starvation && report.proportion < 1000;

    Some(QosNotification {
        is_underrun,
        rate_multiplier: 1000.0 / f64::from(report.proportion),
        diff,
        timestamp,
    })
}
