//! Typed export filter dimensions.
//!
//! Each supported filter dimension is an explicit field so unsupported
//! shapes fail at compile time instead of travelling as open maps. The
//! whole structure is passed through to the export backend verbatim; the
//! client never interprets it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::{Validate, ValidationError};

/// Dataset a single export draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Partner orders (purchases and renewals).
    Orders,
    /// Prepaid membership-card units.
    MembershipCards,
    /// Partner accounts.
    Partners,
    /// Revenue-sharing settlement records.
    Settlements,
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "orders" => Ok(RecordKind::Orders),
            "membership_cards" => Ok(RecordKind::MembershipCards),
            "partners" => Ok(RecordKind::Partners),
            "settlements" => Ok(RecordKind::Settlements),
            _ => Err(format!("Unknown record kind: {}", s)),
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Orders => write!(f, "orders"),
            RecordKind::MembershipCards => write!(f, "membership_cards"),
            RecordKind::Partners => write!(f, "partners"),
            RecordKind::Settlements => write!(f, "settlements"),
        }
    }
}

/// Inclusive creation-time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Inclusive amount window in cents. Either bound may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AmountRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
}

/// Filter payload for one export request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExportFilters {
    pub record_kind: RecordKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_date_range"))]
    pub date_range: Option<DateRange>,

    /// Record-status values to include; empty means all.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub statuses: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_amount_range"))]
    pub amount: Option<AmountRange>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 128, message = "Keyword too long"))]
    pub keyword: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 32, message = "Partner number too long"))]
    pub partner_no: Option<String>,
}

impl ExportFilters {
    /// Empty filter set for the given dataset.
    pub fn for_kind(record_kind: RecordKind) -> Self {
        Self {
            record_kind,
            date_range: None,
            statuses: Vec::new(),
            amount: None,
            keyword: None,
            partner_no: None,
        }
    }
}

fn validate_date_range(range: &DateRange) -> Result<(), ValidationError> {
    if range.from > range.to {
        return Err(ValidationError::new("date_range")
            .with_message("Date range start must not be after its end".into()));
    }
    Ok(())
}

fn validate_amount_range(range: &AmountRange) -> Result<(), ValidationError> {
    match (range.min, range.max) {
        (Some(min), Some(max)) if min > max => Err(ValidationError::new("amount")
            .with_message("Amount range minimum must not exceed its maximum".into())),
        (Some(min), _) if min < 0 => Err(ValidationError::new("amount")
            .with_message("Amount range bounds must be non-negative".into())),
        (_, Some(max)) if max < 0 => Err(ValidationError::new("amount")
            .with_message("Amount range bounds must be non-negative".into())),
        _ => Ok(()),
    }
}
