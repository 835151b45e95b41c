//! Uniform scalar decoding for workbook cells.
//!
//! Every sheet in the tabular channel goes through these rules, so a blank
//! UUID, a numeric text cell, or a "Compliant" boolean token behaves the
//! same wherever it appears. Errors are plain strings; the parser wraps
//! them with sheet/row context.

use calamine::Data;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::types::{DbId, Timestamp};

/// The only host attachment URLs may point at.
pub const ATTACHMENT_HOST: &str = "cdn.quizmill.io";

const TRUE_TOKENS: &[&str] = &["yes", "true", "1", "y", "compliant", "correct"];
const FALSE_TOKENS: &[&str] = &["no", "false", "0", "n", "non-compliant", "incorrect"];

/// Render a cell as text. Floats without a fractional part print as
/// integers so numeric ids and flags round-trip cleanly.
pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                format!("{f:.0}")
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#ERR:{e:?}"),
    }
}

/// Returns `true` if the cell is empty or whitespace-only text.
pub fn is_blank(cell: &Data) -> bool {
    matches!(cell, Data::Empty) || cell_to_string(cell).trim().is_empty()
}

/// Decode an optional UUID. Blank is `None`; anything else must parse.
pub fn decode_uuid(cell: &Data, field: &str) -> Result<Option<DbId>, String> {
    let text = cell_to_string(cell);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    DbId::parse_str(trimmed)
        .map(Some)
        .map_err(|_| format!("{field} must be a valid UUID, got '{trimmed}'"))
}

/// Decode an optional enum, case-insensitively. Blank is `None`; an
/// unmatched token is fatal.
pub fn decode_enum<T>(
    cell: &Data,
    field: &str,
    expected: &[&str],
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, String> {
    let text = cell_to_string(cell);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let canonical = trimmed.to_uppercase().replace([' ', '-'], "_");
    parse(&canonical).map(Some).ok_or_else(|| {
        format!(
            "{field} must be one of {}, got '{trimmed}'",
            expected.join(", ")
        )
    })
}

/// Decode an optional integer. Numeric cells truncate; numeric text
/// truncates; non-numeric text is fatal.
pub fn decode_integer(cell: &Data, field: &str) -> Result<Option<i64>, String> {
    match cell {
        Data::Empty => Ok(None),
        Data::Int(i) => Ok(Some(*i)),
        Data::Float(f) => Ok(Some(f.trunc() as i64)),
        Data::Bool(_) => Err(format!("{field} must be numeric, got a boolean")),
        other => {
            let text = cell_to_string(other);
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<f64>()
                .map(|f| Some(f.trunc() as i64))
                .map_err(|_| format!("{field} must be numeric, got '{trimmed}'"))
        }
    }
}

/// Decode an estimated time in minutes. Values ≤ 0 coerce to `None`
/// rather than erroring.
pub fn decode_estimated_time(cell: &Data, field: &str) -> Result<Option<i32>, String> {
    match decode_integer(cell, field)? {
        Some(minutes) if minutes > 0 => Ok(Some(minutes as i32)),
        _ => Ok(None),
    }
}

/// Best-effort timestamp parse of trimmed text. Unparsable values are
/// `None`, never an error.
pub fn decode_timestamp(cell: &Data) -> Option<Timestamp> {
    let text = cell_to_string(cell);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive));
    }
    None
}

/// Split a comma-separated tag cell, trimming entries, dropping empties,
/// preserving order.
pub fn decode_tag_list(cell: &Data) -> Vec<String> {
    cell_to_string(cell)
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Decode a boolean token.
///
/// Accepted, case-insensitively: yes/no, true/false, 1/0, y/n,
/// compliant/non-compliant, correct/incorrect. A blank optional cell is
/// `false`; a blank required cell is fatal; an unknown token is fatal.
pub fn decode_bool(cell: &Data, field: &str, required: bool) -> Result<bool, String> {
    let text = cell_to_string(cell);
    let token = text.trim().to_lowercase();
    if token.is_empty() {
        if required {
            return Err(format!("{field} is required"));
        }
        return Ok(false);
    }
    if TRUE_TOKENS.contains(&token.as_str()) {
        Ok(true)
    } else if FALSE_TOKENS.contains(&token.as_str()) {
        Ok(false)
    } else {
        Err(format!("{field} has unrecognized boolean value '{token}'"))
    }
}

/// Check the attachment URL policy: https scheme, fixed host.
pub fn validate_attachment_url(url: &str) -> Result<(), String> {
    let Some(rest) = url.strip_prefix("https://") else {
        return Err(format!("attachment URL must use https, got '{url}'"));
    };
    let host = rest
        .split(|c| c == '/' || c == '?' || c == '#')
        .next()
        .unwrap_or("");
    if !host.eq_ignore_ascii_case(ATTACHMENT_HOST) {
        return Err(format!(
            "attachment URL host must be {ATTACHMENT_HOST}, got '{host}'"
        ));
    }
    Ok(())
}

/// Decode an optional attachment URL cell. Blank is `None`; anything
/// else must satisfy [`validate_attachment_url`].
pub fn decode_attachment_url(cell: &Data, field: &str) -> Result<Option<String>, String> {
    let text = cell_to_string(cell);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    validate_attachment_url(trimmed).map_err(|e| format!("{field}: {e}"))?;
    Ok(Some(trimmed.to_string()))
}
