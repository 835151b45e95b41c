//! Canonical, format-independent representation of one quiz awaiting
//! reconciliation, plus the domain enums shared with the persisted catalog.
//!
//! Both parsers emit [`ImportRecord`]s; the engine consumes each record
//! exactly once. Question content payloads stay as `serde_json::Value` so
//! key-presence semantics (e.g. an ordering question with zero items omits
//! its keys entirely) survive decoding and hashing unchanged.

use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Who may see a quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    Private,
    Public,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "PRIVATE",
            Self::Public => "PUBLIC",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PRIVATE" => Some(Self::Private),
            "PUBLIC" => Some(Self::Public),
            _ => None,
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quiz or question difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "EASY",
            Self::Medium => "MEDIUM",
            Self::Hard => "HARD",
            Self::Expert => "EXPERT",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "EASY" => Some(Self::Easy),
            "MEDIUM" => Some(Self::Medium),
            "HARD" => Some(Self::Hard),
            "EXPERT" => Some(Self::Expert),
            _ => None,
        }
    }

    pub const ALL: &'static [&'static str] = &["EASY", "MEDIUM", "HARD", "EXPERT"];
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported question types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    Mcq,
    TrueFalse,
    Open,
    FillGap,
    Ordering,
    Compliance,
    Matching,
    Hotspot,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mcq => "MCQ",
            Self::TrueFalse => "TRUE_FALSE",
            Self::Open => "OPEN",
            Self::FillGap => "FILL_GAP",
            Self::Ordering => "ORDERING",
            Self::Compliance => "COMPLIANCE",
            Self::Matching => "MATCHING",
            Self::Hotspot => "HOTSPOT",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "MCQ" => Some(Self::Mcq),
            "TRUE_FALSE" => Some(Self::TrueFalse),
            "OPEN" => Some(Self::Open),
            "FILL_GAP" => Some(Self::FillGap),
            "ORDERING" => Some(Self::Ordering),
            "COMPLIANCE" => Some(Self::Compliance),
            "MATCHING" => Some(Self::Matching),
            "HOTSPOT" => Some(Self::Hotspot),
            _ => None,
        }
    }

    pub const ALL: &'static [&'static str] = &[
        "MCQ",
        "TRUE_FALSE",
        "OPEN",
        "FILL_GAP",
        "ORDERING",
        "COMPLIANCE",
        "MATCHING",
        "HOTSPOT",
    ];
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Default schema version when a payload declares none.
pub const DEFAULT_SCHEMA_VERSION: i32 = 1;

/// One question of an [`ImportRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    /// Informational id; the catalog assigns its own on create.
    #[serde(default)]
    pub id: Option<DbId>,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    pub text: String,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    /// Must be https on the configured attachment host if present.
    #[serde(default)]
    pub attachment_url: Option<String>,
    /// Type-specific structured payload.
    #[serde(default)]
    pub content: serde_json::Value,
}

/// Canonical representation of one quiz awaiting reconciliation.
///
/// `questions == None` means "leave existing questions untouched"; any
/// `Some` list, even an empty one, replaces the persisted set wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecord {
    #[serde(default = "default_schema_version")]
    pub schema_version: i32,
    /// Informational for CREATE_ONLY; the join key for UPSERT_BY_ID.
    #[serde(default)]
    pub id: Option<DbId>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_visibility")]
    pub visibility: Visibility,
    #[serde(default = "default_difficulty")]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub estimated_time_minutes: Option<i32>,
    /// Ordered; may be empty.
    #[serde(default)]
    pub tag_names: Vec<String>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub questions: Option<Vec<QuestionRecord>>,
    /// Echoed only; never reconciled.
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

fn default_schema_version() -> i32 {
    DEFAULT_SCHEMA_VERSION
}

fn default_visibility() -> Visibility {
    Visibility::Private
}

fn default_difficulty() -> Difficulty {
    Difficulty::Medium
}
