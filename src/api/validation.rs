//! Payload validation for the mutating endpoints.
//!
//! Every rule is checked so a failed request reports all violations at once.

use std::str::FromStr;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use time::macros::format_description;
use time::{Date, Time, UtcOffset};

use crate::model::number::parse_decimal;
use crate::model::{CampaignRecord, DedicationStatus, DedicationUpdate};

use super::response::FieldError;

pub const MSG_GOAL: &str = "Goal must be a number";
pub const MSG_RAISED: &str = "Raised amount must be a number";
pub const MSG_LAST_UPDATED: &str = "Last updated must be a valid date";
pub const MSG_TITLE: &str = "Title is required";
pub const MSG_AMOUNT: &str = "Amount is required";
pub const MSG_STATUS: &str = "Status must be available, sold, or pending";
pub const MSG_PHASE: &str = "Phase must be a positive integer";

/// Raw `update-campaign` body. Fields stay untyped until validated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CampaignPayload {
    #[serde(default)]
    pub goal: Option<Value>,
    #[serde(default)]
    pub raised: Option<Value>,
    #[serde(default, rename = "lastUpdated")]
    pub last_updated: Option<Value>,
}

/// Raw `update-dedication` / `add-dedication` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DedicationPayload {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub title: Option<Value>,
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub status: Option<Value>,
    /// `Some(Value::Null)` for an explicit `null`, `None` when omitted.
    #[serde(default, deserialize_with = "present")]
    pub phase: Option<Value>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

/// How the client's `id` should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdField {
    /// Omitted, null, zero, false or empty.
    Missing,
    /// Present but cannot match any dedication.
    Unmatchable,
    /// A usable id.
    Id(u64),
}

/// Validate an `update-campaign` body into a full record.
pub fn validate_campaign(payload: &CampaignPayload) -> Result<CampaignRecord, Vec<FieldError>> {
    let mut errors = Vec::new();

    let goal = payload.goal.as_ref().and_then(parse_decimal);
    if goal.is_none() {
        errors.push(FieldError::new("goal", MSG_GOAL));
    }

    let raised = payload.raised.as_ref().and_then(parse_decimal);
    if raised.is_none() {
        errors.push(FieldError::new("raised", MSG_RAISED));
    }

    let last_updated = payload
        .last_updated
        .as_ref()
        .and_then(Value::as_str)
        .filter(|s| is_iso8601(s));
    if last_updated.is_none() {
        errors.push(FieldError::new("lastUpdated", MSG_LAST_UPDATED));
    }

    match (goal, raised, last_updated) {
        (Some(goal), Some(raised), Some(last_updated)) if errors.is_empty() => Ok(CampaignRecord {
            goal,
            raised,
            last_updated: last_updated.to_string(),
        }),
        _ => Err(errors),
    }
}

/// Validate the shared dedication fields (everything except `id`).
pub fn validate_dedication(
    payload: &DedicationPayload,
) -> Result<DedicationUpdate, Vec<FieldError>> {
    let mut errors = Vec::new();

    let title = non_empty_trimmed(payload.title.as_ref());
    if title.is_none() {
        errors.push(FieldError::new("title", MSG_TITLE));
    }

    let amount = non_empty_trimmed(payload.amount.as_ref());
    if amount.is_none() {
        errors.push(FieldError::new("amount", MSG_AMOUNT));
    }

    let status = payload
        .status
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|s| DedicationStatus::from_str(s).ok());
    if status.is_none() {
        errors.push(FieldError::new("status", MSG_STATUS));
    }

    let phase = match payload.phase.as_ref() {
        None => Ok(None),
        Some(value) => positive_int(value).map(Some).ok_or(()),
    };
    if phase.is_err() {
        errors.push(FieldError::new("phase", MSG_PHASE));
    }

    match (title, amount, status, phase) {
        (Some(title), Some(amount), Some(status), Ok(phase)) => Ok(DedicationUpdate {
            title,
            amount,
            status,
            phase,
        }),
        _ => Err(errors),
    }
}

/// Classify the client's `id` value.
///
/// Numbers, numeric strings and `true` are read numerically; an integral
/// value such as `1.0` or `"1.0"` matches id 1.
pub fn parse_id(value: Option<&Value>) -> IdField {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => IdField::Missing,
        Some(Value::Bool(true)) => IdField::Id(1),
        Some(Value::Number(n)) => match n.as_u64() {
            Some(0) => IdField::Missing,
            Some(id) => IdField::Id(id),
            None => match n.as_f64() {
                Some(f) if f == 0.0 => IdField::Missing,
                Some(f) => integral_id(f),
                None => IdField::Unmatchable,
            },
        },
        Some(Value::String(s)) => {
            if s.is_empty() {
                return IdField::Missing;
            }
            let trimmed = s.trim();
            match trimmed.parse::<u64>() {
                Ok(0) => IdField::Unmatchable,
                Ok(id) => IdField::Id(id),
                Err(_) => trimmed
                    .parse::<f64>()
                    .map_or(IdField::Unmatchable, integral_id),
            }
        }
        Some(_) => IdField::Unmatchable,
    }
}

fn integral_id(value: f64) -> IdField {
    if value.is_finite() && value.fract() == 0.0 && value >= 1.0 && value <= u64::MAX as f64 {
        IdField::Id(value as u64)
    } else {
        IdField::Unmatchable
    }
}

/// Text of a field, reading numbers and booleans as their string form.
fn non_empty_trimmed(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    Some(text).filter(|s| !s.is_empty())
}

fn positive_int(value: &Value) -> Option<u32> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    parsed.filter(|&p| p >= 1)
}

/// ISO 8601 calendar dates and date-times.
///
/// Dates are `YYYY`, `YYYY-MM` or `YYYY-MM-DD`. A date-time adds
/// `THH:MM`, with optional seconds, optional fractional seconds and an
/// optional `Z` or `±HH:MM` / `±HHMM` offset.
pub fn is_iso8601(text: &str) -> bool {
    match text.split_once('T') {
        None => is_iso_date(text),
        Some((date, time)) => {
            Date::parse(date, format_description!("[year]-[month]-[day]")).is_ok()
                && is_iso_time(time)
        }
    }
}

fn is_iso_date(text: &str) -> bool {
    let full = format_description!("[year]-[month]-[day]");
    match text.len() {
        4 => text.bytes().all(|b| b.is_ascii_digit()),
        7 => Date::parse(&format!("{text}-01"), full).is_ok(),
        _ => Date::parse(text, full).is_ok(),
    }
}

fn is_iso_time(text: &str) -> bool {
    let (clock, offset) = match text.strip_suffix('Z') {
        Some(clock) => (clock, None),
        None => match text.find(['+', '-']) {
            Some(at) => (&text[..at], Some(&text[at..])),
            None => (text, None),
        },
    };

    let offset_ok = offset.map_or(true, |offset| {
        UtcOffset::parse(
            offset,
            format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
        )
        .is_ok()
            || UtcOffset::parse(
                offset,
                format_description!("[offset_hour sign:mandatory][offset_minute]"),
            )
            .is_ok()
    });

    let clock_ok = Time::parse(clock, format_description!("[hour]:[minute]")).is_ok()
        || Time::parse(clock, format_description!("[hour]:[minute]:[second]")).is_ok()
        || Time::parse(
            clock,
            format_description!("[hour]:[minute]:[second].[subsecond]"),
        )
        .is_ok();

    offset_ok && clock_ok
}
