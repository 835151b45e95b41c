//! Outcome aggregation for one import run.

use serde::{Deserialize, Serialize};

/// Outcome of reconciling a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Created,
    Updated,
    Skipped,
}

impl RecordOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for RecordOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record-level failure, tagged with the record's position in the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportErrorEntry {
    pub index: usize,
    pub message: String,
}

/// Final, immutable result of an import run.
///
/// Outside of dry-run, `created + updated + skipped + failed == total`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub total: u32,
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
    pub failed: u32,
    pub errors: Vec<ImportErrorEntry>,
}

/// Accumulates outcomes while the engine walks the batch.
///
/// In dry-run mode `finish` forces created/updated/skipped to zero while
/// total and failed stay accurate, since nothing was persisted.
#[derive(Debug)]
pub struct SummaryBuilder {
    dry_run: bool,
    created: u32,
    updated: u32,
    skipped: u32,
    failed: u32,
    errors: Vec<ImportErrorEntry>,
}

impl SummaryBuilder {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            created: 0,
            updated: 0,
            skipped: 0,
            failed: 0,
            errors: Vec::new(),
        }
    }

    /// Record a successful (or would-be successful, in dry-run) outcome.
    pub fn record(&mut self, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Created => self.created += 1,
            RecordOutcome::Updated => self.updated += 1,
            RecordOutcome::Skipped => self.skipped += 1,
        }
    }

    /// Record a failure, preserving error order.
    pub fn record_failure(&mut self, index: usize, message: impl Into<String>) {
        self.failed += 1;
        self.errors.push(ImportErrorEntry {
            index,
            message: message.into(),
        });
    }

    /// Seal the summary. `total` is the attempted record count after cap
    /// enforcement.
    pub fn finish(self, total: usize) -> ImportSummary {
        let (created, updated, skipped) = if self.dry_run {
            (0, 0, 0)
        } else {
            (self.created, self.updated, self.skipped)
        };
        ImportSummary {
            total: total as u32,
            created,
            updated,
            skipped,
            failed: self.failed,
            errors: self.errors,
        }
    }
}
