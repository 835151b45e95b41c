//! Structured JSON import channel.
//!
//! The payload is an envelope `{"schemaVersion": n, "quizzes": [...]}` whose
//! entries already match the [`ImportRecord`] contract, so this channel does
//! strictly less transformation than the workbook one. It still enforces the
//! shared field policies: positive estimated time, tag list hygiene, the
//! attachment URL rules, content shape presence, and the item cap.

use serde::Deserialize;

use crate::cells;
use crate::error::ImportError;
use crate::record::{ImportRecord, QuestionRecord, QuestionType, DEFAULT_SCHEMA_VERSION};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentEnvelope {
    #[serde(default = "default_schema_version")]
    schema_version: i32,
    #[serde(default)]
    quizzes: Vec<ImportRecord>,
}

fn default_schema_version() -> i32 {
    DEFAULT_SCHEMA_VERSION
}

/// Decode a JSON document into ordered import records.
pub fn parse_document(raw: &[u8], max_items: u32) -> Result<Vec<ImportRecord>, ImportError> {
    let envelope: DocumentEnvelope = serde_json::from_slice(raw)
        .map_err(|e| ImportError::Format(format!("invalid JSON document: {e}")))?;

    if envelope.quizzes.len() > max_items as usize {
        return Err(ImportError::LimitExceeded {
            max: max_items,
            found: envelope.quizzes.len(),
        });
    }

    let mut records = envelope.quizzes;
    for (index, record) in records.iter_mut().enumerate() {
        // The envelope version wins over any per-record declaration.
        record.schema_version = envelope.schema_version;
        validate_record(index, record)?;
    }
    Ok(records)
}

fn validate_record(index: usize, record: &mut ImportRecord) -> Result<(), ImportError> {
    let quiz_num = index + 1;

    record.title = record.title.trim().to_string();
    if record.title.is_empty() {
        return Err(ImportError::Format(format!(
            "quiz {quiz_num}: title is required"
        )));
    }

    if matches!(record.estimated_time_minutes, Some(minutes) if minutes <= 0) {
        record.estimated_time_minutes = None;
    }

    record.tag_names = record
        .tag_names
        .iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();

    if matches!(record.category_name.as_deref(), Some(name) if name.trim().is_empty()) {
        record.category_name = None;
    }

    if let Some(questions) = record.questions.as_ref() {
        for (qi, question) in questions.iter().enumerate() {
            validate_question(question).map_err(|e| {
                ImportError::Format(format!(
                    "quiz {quiz_num} question {num}: {e}",
                    num = qi + 1
                ))
            })?;
        }
    }
    Ok(())
}

fn validate_question(question: &QuestionRecord) -> Result<(), String> {
    if question.text.trim().is_empty() {
        return Err("text is required".to_string());
    }

    if let Some(url) = question.attachment_url.as_deref() {
        let trimmed = url.trim();
        if !trimmed.is_empty() {
            cells::validate_attachment_url(trimmed)?;
        }
    }

    if let Some(key) = required_content_key(question.question_type) {
        let present = question
            .content
            .as_object()
            .is_some_and(|map| map.contains_key(key));
        if !present {
            return Err(format!(
                "{question_type} content requires key '{key}'",
                question_type = question.question_type
            ));
        }
    }
    Ok(())
}

/// The one content key each type cannot do without. Ordering legitimately
/// encodes zero items as an empty object, so nothing is required for it.
fn required_content_key(question_type: QuestionType) -> Option<&'static str> {
    match question_type {
        QuestionType::Mcq => Some("options"),
        QuestionType::TrueFalse | QuestionType::Open => Some("answer"),
        QuestionType::FillGap => Some("gaps"),
        QuestionType::Compliance => Some("statements"),
        QuestionType::Matching => Some("pairs"),
        QuestionType::Hotspot => Some("regions"),
        QuestionType::Ordering => None,
    }
}
