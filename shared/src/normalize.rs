//! Field normalization over inconsistent upstream record shapes.
//!
//! Each logical field is read through a [`FieldRule`]: an ordered list of
//! JSON pointers where the first usable value wins. The rules are the only
//! place that knows upstream field names.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

/// Shown in place of a missing shift start or end time.
pub const TIME_PLACEHOLDER: &str = "-- -- --";

/// Ordered JSON pointers for one logical field.
#[derive(Debug)]
pub struct FieldRule(&'static [&'static str]);

impl FieldRule {
    /// First string or number, as text. Objects, arrays and booleans are skipped.
    pub fn text(&self, record: &Value) -> Option<String> {
        self.0
            .iter()
            .filter_map(|pointer| record.pointer(pointer))
            .find_map(scalar_text)
    }
}

pub mod rules {
    use super::FieldRule;

    pub const BRANCH_ID: FieldRule = FieldRule(&["/branchId", "/id"]);
    pub const BRANCH_NAME: FieldRule = FieldRule(&["/name", "/branchName"]);
    pub const BRANCH_ACCOUNT_ID: FieldRule =
        FieldRule(&["/accountId", "/account/id", "/account/accountId"]);

    pub const STAFF_ID: FieldRule = FieldRule(&["/staffId", "/id"]);
    pub const STAFF_FIRST_NAME: FieldRule = FieldRule(&["/firstName"]);
    pub const STAFF_LAST_NAME: FieldRule = FieldRule(&["/surname", "/lastName"]);
    pub const STAFF_ROLE: FieldRule = FieldRule(&["/role", "/jobTitle"]);
    /// A scalar `branch` is itself the id.
    pub const STAFF_BRANCH: FieldRule =
        FieldRule(&["/branchId", "/branch/id", "/branch/branchId", "/branch"]);

    pub const SHIFT_START: FieldRule = FieldRule(&["/startTime", "/start"]);
    pub const SHIFT_END: FieldRule = FieldRule(&["/endTime", "/end"]);
    pub const SHIFT_DATE: FieldRule = FieldRule(&["/startDate", "/date", "/day"]);
    pub const SHIFT_NOTES: FieldRule = FieldRule(&["/notes", "/remark"]);
}

/// Upstream branch object with `id`, `name` and `accountId` guaranteed.
pub fn normalize_branch(record: &Value) -> Value {
    let mut out = match record {
        Value::Object(map) => map.clone(),
        other => return other.clone(),
    };
    out.insert("id".to_string(), text_or_null(rules::BRANCH_ID.text(record)));
    out.insert("name".to_string(), text_or_null(rules::BRANCH_NAME.text(record)));
    out.insert(
        "accountId".to_string(),
        text_or_null(rules::BRANCH_ACCOUNT_ID.text(record)),
    );
    Value::Object(out)
}

/// Stable staff shape returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedStaff {
    pub id: Option<String>,
    pub name: String,
    pub role: String,
    pub active: bool,
    pub branch_id: Option<String>,
}

pub fn normalize_staff(record: &Value, queried_branch: &str) -> NormalizedStaff {
    let first = rules::STAFF_FIRST_NAME.text(record).unwrap_or_default();
    let last = rules::STAFF_LAST_NAME.text(record).unwrap_or_default();

    NormalizedStaff {
        id: rules::STAFF_ID.text(record),
        name: format!("{} {}", first, last).trim().to_string(),
        role: rules::STAFF_ROLE.text(record).unwrap_or_default(),
        active: is_active(record),
        branch_id: rules::STAFF_BRANCH
            .text(record)
            .or_else(|| Some(queried_branch.to_string())),
    }
}

/// Records with no `active` field, or a non-boolean one, are active.
pub fn is_active(record: &Value) -> bool {
    record.get("active").and_then(Value::as_bool).unwrap_or(true)
}

/// Client-side staff filter. A record without any branch identifier cannot
/// be excluded by branch.
pub fn include_staff(record: &Value, branch_id: Option<&str>, include_inactive: bool) -> bool {
    if let (Some(wanted), Some(actual)) = (branch_id, rules::STAFF_BRANCH.text(record)) {
        if actual != wanted {
            return false;
        }
    }
    include_inactive || is_active(record)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkStatus {
    Working,
    NonWorking,
}

/// One row of a staff member's schedule.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRow {
    pub date_label: String,
    pub status: WorkStatus,
    pub time_in: String,
    pub time_out: String,
    pub remarks: String,
}

pub fn schedule_row(shift: &Value) -> ScheduleRow {
    let start = rules::SHIFT_START.text(shift);
    let end = rules::SHIFT_END.text(shift);

    let working = match shift.get("working") {
        Some(flag) => truthy(flag),
        None => start.is_some() && end.is_some(),
    };

    let remarks = if shift.get("holiday").is_some_and(truthy) {
        "HOLIDAY".to_string()
    } else {
        rules::SHIFT_NOTES.text(shift).unwrap_or_default()
    };

    ScheduleRow {
        date_label: rules::SHIFT_DATE
            .text(shift)
            .map(|date| date_label(&date))
            .unwrap_or_default(),
        status: if working {
            WorkStatus::Working
        } else {
            WorkStatus::NonWorking
        },
        time_in: start.unwrap_or_else(|| TIME_PLACEHOLDER.to_string()),
        time_out: end.unwrap_or_else(|| TIME_PLACEHOLDER.to_string()),
        remarks,
    }
}

/// `Mon, 06 Jan` from the leading `YYYY-MM-DD`; the raw value otherwise.
pub fn date_label(raw: &str) -> String {
    raw.get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
        .map(|day| day.format("%a, %d %b").to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text_or_null(text: Option<String>) -> Value {
    text.map(Value::String).unwrap_or(Value::Null)
}
