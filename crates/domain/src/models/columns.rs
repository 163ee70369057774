//! Export column catalog.
//!
//! Each record kind has a fixed catalog: a required subset that is always
//! exported and optional columns the caller may toggle. Request
//! construction goes through [`normalize_columns`], which guarantees the
//! required set survives any caller selection.

use serde::{Deserialize, Serialize};

use super::filters::RecordKind;

/// Rendering hint for a column's cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnFormat {
    Text,
    Integer,
    Currency,
    Date,
    DateTime,
    Percent,
}

/// A single exportable column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    /// Backend field key.
    pub field: String,
    /// Human-readable header.
    pub title: String,
    /// Required columns are fixed and cannot be deselected.
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ColumnFormat>,
}

impl ColumnSpec {
    fn required(field: &str, title: &str, format: ColumnFormat) -> Self {
        Self {
            field: field.to_string(),
            title: title.to_string(),
            required: true,
            width: None,
            format: Some(format),
        }
    }

    fn optional(field: &str, title: &str, format: ColumnFormat) -> Self {
        Self {
            field: field.to_string(),
            title: title.to_string(),
            required: false,
            width: None,
            format: Some(format),
        }
    }
}

/// Columns that are always part of an export for the given dataset.
pub fn required_columns(kind: RecordKind) -> Vec<ColumnSpec> {
    use ColumnFormat::*;
    match kind {
        RecordKind::Orders => vec![
            ColumnSpec::required("order_no", "Order No.", Text),
            ColumnSpec::required("created_at", "Created", DateTime),
            ColumnSpec::required("amount", "Amount", Currency),
            ColumnSpec::required("status", "Status", Text),
        ],
        RecordKind::MembershipCards => vec![
            ColumnSpec::required("card_no", "Card No.", Text),
            ColumnSpec::required("batch_no", "Batch No.", Text),
            ColumnSpec::required("status", "Status", Text),
        ],
        RecordKind::Partners => vec![
            ColumnSpec::required("partner_no", "Partner No.", Text),
            ColumnSpec::required("name", "Name", Text),
            ColumnSpec::required("level", "Level", Integer),
            ColumnSpec::required("status", "Status", Text),
        ],
        RecordKind::Settlements => vec![
            ColumnSpec::required("settlement_no", "Settlement No.", Text),
            ColumnSpec::required("period", "Period", Date),
            ColumnSpec::required("partner_no", "Partner No.", Text),
            ColumnSpec::required("amount", "Amount", Currency),
            ColumnSpec::required("status", "Status", Text),
        ],
    }
}

/// Columns the caller may add on top of the required set.
pub fn optional_columns(kind: RecordKind) -> Vec<ColumnSpec> {
    use ColumnFormat::*;
    match kind {
        RecordKind::Orders => vec![
            ColumnSpec::optional("partner_no", "Partner No.", Text),
            ColumnSpec::optional("partner_name", "Partner Name", Text),
            ColumnSpec::optional("card_no", "Card No.", Text),
            ColumnSpec::optional("pay_channel", "Payment Channel", Text),
            ColumnSpec::optional("settled_at", "Settled", DateTime),
            ColumnSpec::optional("remark", "Remark", Text),
        ],
        RecordKind::MembershipCards => vec![
            ColumnSpec::optional("partner_no", "Partner No.", Text),
            ColumnSpec::optional("face_value", "Face Value", Currency),
            ColumnSpec::optional("activated_at", "Activated", DateTime),
            ColumnSpec::optional("expires_at", "Expires", Date),
        ],
        RecordKind::Partners => vec![
            ColumnSpec::optional("contact", "Contact", Text),
            ColumnSpec::optional("phone", "Phone", Text),
            ColumnSpec::optional("balance", "Balance", Currency),
            ColumnSpec::optional("created_at", "Created", DateTime),
        ],
        RecordKind::Settlements => vec![
            ColumnSpec::optional("commission", "Commission", Currency),
            ColumnSpec::optional("commission_rate", "Commission Rate", Percent),
            ColumnSpec::optional("paid_at", "Paid", DateTime),
            ColumnSpec::optional("remark", "Remark", Text),
        ],
    }
}

/// Default selection for a fresh export: the required set only.
pub fn default_columns(kind: RecordKind) -> Vec<ColumnSpec> {
    required_columns(kind)
}

/// Produce the column list actually sent to the backend.
///
/// The required catalog for `kind` always comes first; caller-selected
/// columns follow in their given order, deduplicated by field key. A caller
/// restating a required column (with or without the `required` flag set)
/// does not produce a duplicate.
pub fn normalize_columns(kind: RecordKind, selected: &[ColumnSpec]) -> Vec<ColumnSpec> {
    let mut columns = required_columns(kind);
    for column in selected {
        if columns.iter().any(|c| c.field == column.field) {
            continue;
        }
        columns.push(column.clone());
    }
    columns
}
