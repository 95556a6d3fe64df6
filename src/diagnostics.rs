//! Per-parse diagnostics collector.
//!
//! Warnings are logged through the `log` facade. Repeated warnings sharing a
//! key are logged once per parse and counted afterwards, so two parses in
//! the same process never share suppression state.

use serde::Serialize;
use std::collections::BTreeMap;

/// Collects warnings and dropped-zone counts for one parse invocation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    warnings: Vec<String>,
    repeats: BTreeMap<String, usize>,
    malformed: usize,
    unknown: usize,
}

impl Diagnostics {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs and records a warning.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.warnings.push(message);
    }

    /// Logs a warning the first time `key` is seen; later calls only count.
    ///
    /// Returns true if the warning was emitted.
    pub fn warn_once(&mut self, key: &str, message: impl Into<String>) -> bool {
        match self.repeats.get_mut(key) {
            Some(count) => {
                *count += 1;
                false
            }
            None => {
                self.repeats.insert(key.to_string(), 1);
                self.warn(message);
                true
            }
        }
    }

    /// Records a malformed zone that was skipped.
    pub fn record_malformed(&mut self, message: impl Into<String>) {
        self.malformed += 1;
        self.warn(message);
    }

    /// Records a record with an unrecognized tag.
    pub fn record_unknown(&mut self, key: &str, message: impl Into<String>) {
        self.unknown += 1;
        self.warn_once(key, message);
    }

    /// Warnings emitted so far, in order.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// How many times a warn-once key was hit.
    pub fn occurrences(&self, key: &str) -> usize {
        self.repeats.get(key).copied().unwrap_or(0)
    }

    /// Number of malformed zones dropped.
    pub fn malformed_count(&self) -> usize {
        self.malformed
    }

    /// Number of records skipped for an unknown tag.
    pub fn unknown_count(&self) -> usize {
        self.unknown
    }

    /// Returns true if nothing was reported.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.malformed == 0 && self.unknown == 0
    }

    /// Folds another collector into this one.
    pub fn merge(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
        for (key, count) in other.repeats {
            *self.repeats.entry(key).or_insert(0) += count;
        }
        self.malformed += other.malformed;
        self.unknown += other.unknown;
    }
}
