//! Per-run import configuration: conflict strategy, source format, and
//! the knobs controlling reference auto-creation and dry-run behaviour.

use serde::{Deserialize, Serialize};

/// Default item cap when the caller does not supply one.
pub const DEFAULT_MAX_ITEMS: u32 = 100;

// ---------------------------------------------------------------------------
// Import strategy
// ---------------------------------------------------------------------------

/// How a record is reconciled against the existing catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportStrategy {
    /// Always create a new quiz; the input id is informational only.
    CreateOnly,
    /// Merge into the quiz with the supplied id, creating it if absent.
    UpsertById,
    /// Merge into the quiz matching the record's canonical content hash,
    /// scoped to the acting creator.
    UpsertByContentHash,
    /// Skip records that match an existing quiz by id or content hash.
    SkipOnDuplicate,
}

impl ImportStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateOnly => "CREATE_ONLY",
            Self::UpsertById => "UPSERT_BY_ID",
            Self::UpsertByContentHash => "UPSERT_BY_CONTENT_HASH",
            Self::SkipOnDuplicate => "SKIP_ON_DUPLICATE",
        }
    }

    /// Parse a strategy name. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CREATE_ONLY" => Some(Self::CreateOnly),
            "UPSERT_BY_ID" => Some(Self::UpsertById),
            "UPSERT_BY_CONTENT_HASH" => Some(Self::UpsertByContentHash),
            "SKIP_ON_DUPLICATE" => Some(Self::SkipOnDuplicate),
            _ => None,
        }
    }

    /// All valid strategy names.
    pub const ALL: &'static [&'static str] = &[
        "CREATE_ONLY",
        "UPSERT_BY_ID",
        "UPSERT_BY_CONTENT_HASH",
        "SKIP_ON_DUPLICATE",
    ];
}

impl std::fmt::Display for ImportStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Import format
// ---------------------------------------------------------------------------

/// Source encoding of the raw payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportFormat {
    /// Multi-sheet XLSX workbook.
    Xlsx,
    /// Structured JSON document.
    Json,
}

impl ImportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Xlsx => "XLSX",
            Self::Json => "JSON",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "XLSX" => Some(Self::Xlsx),
            "JSON" => Some(Self::Json),
            _ => None,
        }
    }
}

impl std::fmt::Display for ImportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Import options
// ---------------------------------------------------------------------------

/// Immutable per-run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOptions {
    pub strategy: ImportStrategy,
    /// Full validation without any persistence.
    #[serde(default)]
    pub dry_run: bool,
    /// Create tags that are referenced but do not exist yet.
    #[serde(default = "default_true")]
    pub auto_create_tags: bool,
    /// Create a category that is referenced but does not exist yet.
    #[serde(default = "default_true")]
    pub auto_create_category: bool,
    /// Maximum number of quizzes a single payload may declare.
    #[serde(default = "default_max_items")]
    pub max_items: u32,
}

fn default_true() -> bool {
    true
}

fn default_max_items() -> u32 {
    DEFAULT_MAX_ITEMS
}

impl ImportOptions {
    /// Options with the given strategy and all other knobs at their defaults.
    pub fn with_strategy(strategy: ImportStrategy) -> Self {
        Self {
            strategy,
            dry_run: false,
            auto_create_tags: true,
            auto_create_category: true,
            max_items: DEFAULT_MAX_ITEMS,
        }
    }

    /// Validate option values that serde cannot enforce.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_items == 0 {
            return Err("maxItems must be a positive integer".to_string());
        }
        Ok(())
    }
}
