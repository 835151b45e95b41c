//! Tabular (XLSX workbook) import channel.
//!
//! A workbook declares quizzes on a sheet literally named "Quizzes" and
//! carries one sheet per supported question type. Question rows join back
//! to their quiz through a "Quiz ID" column; content is reconstructed from
//! numbered column groups ("Option N", "Gap N Answer", ...). All scalar
//! cells go through the uniform rules in [`crate::cells`].
//!
//! Every decoding failure is fatal for the whole parse and carries sheet
//! and row context. Exceeding the item cap is reported as the distinct
//! `LimitExceeded` condition, never as an ordinary format error.

use std::collections::HashMap;
use std::io::Cursor;

use calamine::{open_workbook_from_rs, Data, Range, Reader, Xlsx};
use serde_json::{json, Value};

use crate::cells;
use crate::error::ImportError;
use crate::record::{
    Difficulty, ImportRecord, QuestionRecord, QuestionType, Visibility, DEFAULT_SCHEMA_VERSION,
};
use crate::types::DbId;

/// The sheet declaring quizzes; its absence is fatal.
pub const QUIZZES_SHEET: &str = "Quizzes";

/// Optional key/value sheet consulted for the schema version fallback.
pub const METADATA_SHEET: &str = "Metadata";

/// One sheet per question type supported by this channel.
const QUESTION_SHEETS: &[(&str, QuestionType)] = &[
    ("MCQ", QuestionType::Mcq),
    ("True False", QuestionType::TrueFalse),
    ("Open", QuestionType::Open),
    ("Fill Gap", QuestionType::FillGap),
    ("Ordering", QuestionType::Ordering),
    ("Compliance", QuestionType::Compliance),
];

/// Question types the spreadsheet channel cannot express. The presence of
/// their sheets fails the whole parse.
const UNSUPPORTED_SHEETS: &[(&str, &str)] = &[("Matching", "MATCHING"), ("Hotspot", "HOTSPOT")];

static EMPTY_CELL: Data = Data::Empty;

/// Decode a workbook into ordered import records.
pub fn parse_workbook(raw: &[u8], max_items: u32) -> Result<Vec<ImportRecord>, ImportError> {
    let cursor = Cursor::new(raw.to_vec());
    let mut workbook: Xlsx<_> = open_workbook_from_rs(cursor)
        .map_err(|e| ImportError::Format(format!("cannot open workbook: {e}")))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();

    for (sheet, type_name) in UNSUPPORTED_SHEETS {
        if sheet_names.iter().any(|n| n == sheet) {
            return Err(ImportError::Format(format!(
                "question type {type_name} is not supported by the spreadsheet channel \
                 (remove sheet '{sheet}')"
            )));
        }
    }

    if !sheet_names.iter().any(|n| n == QUIZZES_SHEET) {
        return Err(ImportError::Format(format!(
            "missing required sheet '{QUIZZES_SHEET}'"
        )));
    }
    let quizzes_range = read_sheet(&mut workbook, QUIZZES_SHEET)?;

    let metadata_range = if sheet_names.iter().any(|n| n == METADATA_SHEET) {
        Some(read_sheet(&mut workbook, METADATA_SHEET)?)
    } else {
        None
    };

    let schema_version = schema_version(&quizzes_range, metadata_range.as_ref())?;
    let (mut records, index_by_id) = parse_quiz_rows(&quizzes_range, schema_version)?;

    for (sheet_name, question_type) in QUESTION_SHEETS {
        if !sheet_names.iter().any(|n| n == sheet_name) {
            continue;
        }
        let range = read_sheet(&mut workbook, sheet_name)?;
        parse_question_sheet(sheet_name, *question_type, &range, &index_by_id, &mut records)?;
    }

    if records.len() > max_items as usize {
        return Err(ImportError::LimitExceeded {
            max: max_items,
            found: records.len(),
        });
    }
    Ok(records)
}

fn read_sheet(
    workbook: &mut Xlsx<Cursor<Vec<u8>>>,
    name: &str,
) -> Result<Range<Data>, ImportError> {
    workbook
        .worksheet_range(name)
        .map_err(|e| ImportError::Format(format!("cannot read sheet '{name}': {e}")))
}

// ---------------------------------------------------------------------------
// Header handling
// ---------------------------------------------------------------------------

/// Map header names to column indices by exact match. The last duplicate
/// column wins; unknown columns are simply carried and ignored.
fn header_map(range: &Range<Data>) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    if let Some(header_row) = range.rows().next() {
        for (idx, header) in header_row.iter().enumerate() {
            let name = cells::cell_to_string(header).trim().to_string();
            if !name.is_empty() {
                map.insert(name, idx);
            }
        }
    }
    map
}

/// Header columns matching `{prefix}{N}{suffix}` with integer N, sorted
/// ascending by N.
fn numbered_columns(
    headers: &HashMap<String, usize>,
    prefix: &str,
    suffix: &str,
) -> Vec<(u32, usize)> {
    let mut found: Vec<(u32, usize)> = headers
        .iter()
        .filter_map(|(name, &idx)| {
            let middle = name.strip_prefix(prefix)?.strip_suffix(suffix)?;
            middle.trim().parse::<u32>().ok().map(|n| (n, idx))
        })
        .collect();
    found.sort_unstable_by_key(|&(n, _)| n);
    found
}

fn cell<'a>(row: &'a [Data], idx: Option<&usize>) -> &'a Data {
    idx.and_then(|i| row.get(*i)).unwrap_or(&EMPTY_CELL)
}

fn row_is_blank(row: &[Data]) -> bool {
    row.iter().all(cells::is_blank)
}

fn optional_text(value: &Data) -> Option<String> {
    let text = cells::cell_to_string(value);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn ctx(sheet: &str, row: usize, err: String) -> ImportError {
    ImportError::Format(format!("sheet '{sheet}' row {row}: {err}"))
}

fn missing_column(sheet: &str, column: &str) -> ImportError {
    ImportError::Format(format!(
        "sheet '{sheet}' is missing required column '{column}'"
    ))
}

// ---------------------------------------------------------------------------
// Schema version
// ---------------------------------------------------------------------------

/// Precedence: explicit "Schema Version" cell in the Quizzes sheet, then a
/// "Schema Version" key on the Metadata sheet, then the default.
fn schema_version(
    quizzes: &Range<Data>,
    metadata: Option<&Range<Data>>,
) -> Result<i32, ImportError> {
    let headers = header_map(quizzes);
    if let Some(&idx) = headers.get("Schema Version") {
        if let Some(row) = quizzes.rows().nth(1) {
            let value = cell(row, Some(&idx));
            if let Some(version) =
                cells::decode_integer(value, "Schema Version").map_err(ImportError::Format)?
            {
                return Ok(version as i32);
            }
        }
    }
    if let Some(meta) = metadata {
        for row in meta.rows() {
            let key = cells::cell_to_string(cell(row, Some(&0)));
            if key.trim() == "Schema Version" {
                if let Some(version) = cells::decode_integer(cell(row, Some(&1)), "Schema Version")
                    .map_err(ImportError::Format)?
                {
                    return Ok(version as i32);
                }
            }
        }
    }
    Ok(DEFAULT_SCHEMA_VERSION)
}

// ---------------------------------------------------------------------------
// Quiz rows
// ---------------------------------------------------------------------------

fn parse_quiz_rows(
    range: &Range<Data>,
    schema_version: i32,
) -> Result<(Vec<ImportRecord>, HashMap<DbId, usize>), ImportError> {
    let headers = header_map(range);
    if !headers.contains_key("Title") {
        return Err(missing_column(QUIZZES_SHEET, "Title"));
    }

    let mut records: Vec<ImportRecord> = Vec::new();
    let mut index_by_id: HashMap<DbId, usize> = HashMap::new();

    for (ri, row) in range.rows().enumerate().skip(1) {
        let row_num = ri + 1;
        if row_is_blank(row) {
            continue;
        }

        let id = cells::decode_uuid(cell(row, headers.get("Quiz ID")), "Quiz ID")
            .map_err(|e| ctx(QUIZZES_SHEET, row_num, e))?;

        let title = cells::cell_to_string(cell(row, headers.get("Title")));
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(ctx(QUIZZES_SHEET, row_num, "Title is required".to_string()));
        }

        let visibility = cells::decode_enum(
            cell(row, headers.get("Visibility")),
            "Visibility",
            &["PRIVATE", "PUBLIC"],
            Visibility::from_str,
        )
        .map_err(|e| ctx(QUIZZES_SHEET, row_num, e))?
        .unwrap_or(Visibility::Private);

        let difficulty = cells::decode_enum(
            cell(row, headers.get("Difficulty")),
            "Difficulty",
            Difficulty::ALL,
            Difficulty::from_str,
        )
        .map_err(|e| ctx(QUIZZES_SHEET, row_num, e))?
        .unwrap_or(Difficulty::Medium);

        let estimated_time_minutes =
            cells::decode_estimated_time(cell(row, headers.get("Estimated Time")), "Estimated Time")
                .map_err(|e| ctx(QUIZZES_SHEET, row_num, e))?;

        if let Some(id) = id {
            if index_by_id.insert(id, records.len()).is_some() {
                return Err(ctx(
                    QUIZZES_SHEET,
                    row_num,
                    format!("duplicate quiz id {id}"),
                ));
            }
        }

        records.push(ImportRecord {
            schema_version,
            id,
            title,
            description: optional_text(cell(row, headers.get("Description"))),
            visibility,
            difficulty,
            estimated_time_minutes,
            tag_names: cells::decode_tag_list(cell(row, headers.get("Tags"))),
            category_name: optional_text(cell(row, headers.get("Category"))),
            // The workbook channel always expresses a full question set;
            // sheets that are absent simply contribute nothing to it.
            questions: Some(Vec::new()),
            created_at: cells::decode_timestamp(cell(row, headers.get("Created At"))),
            updated_at: cells::decode_timestamp(cell(row, headers.get("Updated At"))),
        });
    }

    Ok((records, index_by_id))
}

// ---------------------------------------------------------------------------
// Question sheets
// ---------------------------------------------------------------------------

fn parse_question_sheet(
    sheet: &str,
    question_type: QuestionType,
    range: &Range<Data>,
    index_by_id: &HashMap<DbId, usize>,
    records: &mut [ImportRecord],
) -> Result<(), ImportError> {
    let headers = header_map(range);
    require_columns(sheet, question_type, &headers)?;

    for (ri, row) in range.rows().enumerate().skip(1) {
        let row_num = ri + 1;
        if row_is_blank(row) {
            continue;
        }

        let quiz_id = cells::decode_uuid(cell(row, headers.get("Quiz ID")), "Quiz ID")
            .map_err(|e| ctx(sheet, row_num, e))?
            .ok_or_else(|| ctx(sheet, row_num, "Quiz ID is required".to_string()))?;
        let Some(&record_index) = index_by_id.get(&quiz_id) else {
            return Err(ctx(
                sheet,
                row_num,
                format!("references undeclared quiz id {quiz_id}"),
            ));
        };

        let text = cells::cell_to_string(cell(row, headers.get("Text")));
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(ctx(sheet, row_num, "Text is required".to_string()));
        }

        let question = QuestionRecord {
            id: cells::decode_uuid(cell(row, headers.get("Question ID")), "Question ID")
                .map_err(|e| ctx(sheet, row_num, e))?,
            question_type,
            difficulty: cells::decode_enum(
                cell(row, headers.get("Difficulty")),
                "Difficulty",
                Difficulty::ALL,
                Difficulty::from_str,
            )
            .map_err(|e| ctx(sheet, row_num, e))?,
            text,
            hint: optional_text(cell(row, headers.get("Hint"))),
            explanation: optional_text(cell(row, headers.get("Explanation"))),
            attachment_url: cells::decode_attachment_url(
                cell(row, headers.get("Attachment URL")),
                "Attachment URL",
            )
            .map_err(|e| ctx(sheet, row_num, e))?,
            content: build_content(question_type, &headers, row)
                .map_err(|e| ctx(sheet, row_num, e))?,
        };

        records[record_index]
            .questions
            .get_or_insert_with(Vec::new)
            .push(question);
    }

    Ok(())
}

fn require_columns(
    sheet: &str,
    question_type: QuestionType,
    headers: &HashMap<String, usize>,
) -> Result<(), ImportError> {
    for column in ["Quiz ID", "Text"] {
        if !headers.contains_key(column) {
            return Err(missing_column(sheet, column));
        }
    }
    match question_type {
        QuestionType::TrueFalse | QuestionType::Open => {
            if !headers.contains_key("Answer") {
                return Err(missing_column(sheet, "Answer"));
            }
        }
        QuestionType::Mcq => {
            if numbered_columns(headers, "Option ", "").is_empty() {
                return Err(missing_column(sheet, "Option 1"));
            }
        }
        QuestionType::FillGap => {
            if numbered_columns(headers, "Gap ", " Answer").is_empty() {
                return Err(missing_column(sheet, "Gap 1 Answer"));
            }
        }
        QuestionType::Compliance => {
            if numbered_columns(headers, "Statement ", "").is_empty() {
                return Err(missing_column(sheet, "Statement 1"));
            }
        }
        // An ordering row with zero items is a legal encoding, so no
        // "Item N" column is required up front.
        QuestionType::Ordering => {}
        QuestionType::Matching | QuestionType::Hotspot => {}
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Content reconstruction
// ---------------------------------------------------------------------------

fn build_content(
    question_type: QuestionType,
    headers: &HashMap<String, usize>,
    row: &[Data],
) -> Result<Value, String> {
    match question_type {
        QuestionType::Mcq => {
            let mut options = Vec::new();
            for (n, idx) in numbered_columns(headers, "Option ", "") {
                let option_cell = cell(row, Some(&idx));
                if cells::is_blank(option_cell) {
                    continue;
                }
                let correct = match headers.get(&format!("Option {n} Correct")) {
                    Some(&correct_idx) => cells::decode_bool(
                        cell(row, Some(&correct_idx)),
                        &format!("Option {n} Correct"),
                        false,
                    )?,
                    None => false,
                };
                let id = options.len() + 1;
                options.push(json!({
                    "id": id,
                    "text": cells::cell_to_string(option_cell).trim(),
                    "correct": correct,
                }));
            }
            Ok(json!({ "options": options }))
        }
        QuestionType::TrueFalse => {
            let answer = cells::decode_bool(cell(row, headers.get("Answer")), "Answer", true)?;
            Ok(json!({ "answer": answer }))
        }
        QuestionType::Open => {
            let answer = cells::cell_to_string(cell(row, headers.get("Answer")));
            let answer = answer.trim().to_string();
            if answer.is_empty() {
                return Err("Answer is required".to_string());
            }
            Ok(json!({ "answer": answer }))
        }
        QuestionType::FillGap => {
            // Gap ids keep the original, possibly sparse numbering.
            let mut gaps = Vec::new();
            for (n, idx) in numbered_columns(headers, "Gap ", " Answer") {
                let gap_cell = cell(row, Some(&idx));
                if cells::is_blank(gap_cell) {
                    continue;
                }
                gaps.push(json!({
                    "id": n,
                    "answer": cells::cell_to_string(gap_cell).trim(),
                }));
            }
            Ok(json!({ "gaps": gaps }))
        }
        QuestionType::Ordering => {
            // Items renumber densely 1..M regardless of source columns.
            let mut items = Vec::new();
            for (_, idx) in numbered_columns(headers, "Item ", "") {
                let item_cell = cell(row, Some(&idx));
                if cells::is_blank(item_cell) {
                    continue;
                }
                let id = items.len() + 1;
                items.push(json!({
                    "id": id,
                    "text": cells::cell_to_string(item_cell).trim(),
                }));
            }
            if items.is_empty() {
                // Zero items omit both keys entirely, not empty arrays.
                return Ok(json!({}));
            }
            let correct_order: Vec<usize> = (1..=items.len()).collect();
            Ok(json!({ "items": items, "correctOrder": correct_order }))
        }
        QuestionType::Compliance => {
            let mut statements = Vec::new();
            for (n, idx) in numbered_columns(headers, "Statement ", "") {
                let statement_cell = cell(row, Some(&idx));
                if cells::is_blank(statement_cell) {
                    continue;
                }
                let compliant = cells::decode_bool(
                    cell(row, headers.get(&format!("Statement {n} Compliant"))),
                    &format!("Statement {n} Compliant"),
                    true,
                )?;
                statements.push(json!({
                    "id": n,
                    "text": cells::cell_to_string(statement_cell).trim(),
                    "compliant": compliant,
                }));
            }
            Ok(json!({ "statements": statements }))
        }
        QuestionType::Matching | QuestionType::Hotspot => Err(format!(
            "question type {question_type} is not supported by the spreadsheet channel"
        )),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
