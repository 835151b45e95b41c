//! Canonical hashing for change detection and duplicate matching.
//!
//! All digests are SHA-256 hex over a canonical JSON rendering (object keys
//! sorted recursively), so logically identical payloads hash identically
//! regardless of field ordering.
//!
//! Three digests exist:
//! - content hash: substantive quiz fields; gates review transitions.
//! - presentation hash: formatting-only fields; tracked, never gating.
//! - import hash: the whole canonical record minus ids and timestamps;
//!   used by the hash-matching strategies, scoped per creator.

use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::catalog::Quiz;
use crate::record::ImportRecord;

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Render a JSON value with object keys sorted recursively.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

/// SHA-256 hex digest of the canonical rendering of `value`.
pub fn hash_value(value: &Value) -> String {
    sha256_hex(canonical_json(value).as_bytes())
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Key escaping via the serializer keeps quoting rules exact.
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Quiz digests
// ---------------------------------------------------------------------------

/// Content hash over the substantive fields of a quiz.
///
/// Question ids are excluded: replacing a question set with identical
/// content must not read as a content change.
pub fn quiz_content_hash(quiz: &Quiz) -> String {
    let questions: Vec<Value> = quiz
        .questions
        .iter()
        .map(|q| {
            json!({
                "type": q.question_type.as_str(),
                "difficulty": q.difficulty.map(|d| d.as_str()),
                "text": q.text,
                "hint": q.hint,
                "explanation": q.explanation,
                "attachmentUrl": q.attachment_url,
                "content": q.content,
            })
        })
        .collect();

    hash_value(&json!({
        "title": quiz.title,
        "description": quiz.description,
        "difficulty": quiz.difficulty.as_str(),
        "questions": questions,
    }))
}

/// Presentation hash over formatting-only fields.
pub fn quiz_presentation_hash(quiz: &Quiz) -> String {
    let mut tag_names: Vec<&str> = quiz.tags.iter().map(|t| t.name.as_str()).collect();
    tag_names.sort_unstable();

    hash_value(&json!({
        "visibility": quiz.visibility.as_str(),
        "estimatedTimeMinutes": quiz.estimated_time_minutes,
        "category": quiz.category.name,
        "tags": tag_names,
    }))
}

// ---------------------------------------------------------------------------
// Record digest
// ---------------------------------------------------------------------------

/// Canonical hash of an import record, excluding ids and timestamps.
///
/// Stable under JSON field reordering; two creators importing
/// byte-identical content produce the same digest, which is why lookups
/// against it are always scoped per creator.
pub fn record_import_hash(record: &ImportRecord) -> String {
    let questions: Option<Vec<Value>> = record.questions.as_ref().map(|questions| {
        questions
            .iter()
            .map(|q| {
                json!({
                    "type": q.question_type.as_str(),
                    "difficulty": q.difficulty.map(|d| d.as_str()),
                    "text": q.text,
                    "hint": q.hint,
                    "explanation": q.explanation,
                    "attachmentUrl": q.attachment_url,
                    "content": q.content,
                })
            })
            .collect()
    });

    hash_value(&json!({
        "schemaVersion": record.schema_version,
        "title": record.title,
        "description": record.description,
        "visibility": record.visibility.as_str(),
        "difficulty": record.difficulty.as_str(),
        "estimatedTimeMinutes": record.estimated_time_minutes,
        "tagNames": record.tag_names,
        "categoryName": record.category_name,
        "questions": questions,
    }))
}
