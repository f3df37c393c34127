//! The structured result of one extraction.
//!
//! The completion endpoint returns free-form text that merely *should* be a
//! JSON object. [`crate::pipeline::response::parse_reply`] turns it into an
//! untyped [`serde_json::Map`]; [`PolicyRecord::from_payload`] then checks
//! that all fourteen keys are present with the right JSON type before a
//! record exists. Nothing is defaulted: a missing key is an error.

use crate::error::ExtractError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Every record key, in report column order.
pub const FIELD_NAMES: [&str; 14] = [
    "payer_name",
    "policy_name",
    "policy_number",
    "policy_type",
    "approval_date",
    "effective_date",
    "brief_summary",
    "covered_hcpcs_codes",
    "non_covered_hcpcs_codes",
    "modifiers_used",
    "service_summary",
    "reimbursement_detail",
    "non_reimbursement_detail",
    "notes",
];

/// Keys whose value is a list of strings.
pub const LIST_FIELDS: [&str; 3] = ["covered_hcpcs_codes", "non_covered_hcpcs_codes", "modifiers_used"];

/// Separator used when a list field is flattened into one report cell.
pub const LIST_SEPARATOR: &str = ", ";

/// Policy metadata extracted from one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub payer_name: String,
    pub policy_name: String,
    pub policy_number: String,
    pub policy_type: String,
    pub approval_date: String,
    pub effective_date: String,
    pub brief_summary: String,
    /// HCPCS codes, CPT codes included, in document order.
    pub covered_hcpcs_codes: Vec<String>,
    pub non_covered_hcpcs_codes: Vec<String>,
    pub modifiers_used: Vec<String>,
    pub service_summary: String,
    pub reimbursement_detail: String,
    pub non_reimbursement_detail: String,
    pub notes: String,
}

impl PolicyRecord {
    /// Validate an untyped reply object and build a record from it.
    ///
    /// Keys outside [`FIELD_NAMES`] are ignored.
    pub fn from_payload(payload: &Map<String, Value>) -> Result<Self, ExtractError> {
        Ok(Self {
            payer_name: text_field(payload, "payer_name")?,
            policy_name: text_field(payload, "policy_name")?,
            policy_number: text_field(payload, "policy_number")?,
            policy_type: text_field(payload, "policy_type")?,
            approval_date: text_field(payload, "approval_date")?,
            effective_date: text_field(payload, "effective_date")?,
            brief_summary: text_field(payload, "brief_summary")?,
            covered_hcpcs_codes: list_field(payload, "covered_hcpcs_codes")?,
            non_covered_hcpcs_codes: list_field(payload, "non_covered_hcpcs_codes")?,
            modifiers_used: list_field(payload, "modifiers_used")?,
            service_summary: text_field(payload, "service_summary")?,
            reimbursement_detail: text_field(payload, "reimbursement_detail")?,
            non_reimbursement_detail: text_field(payload, "non_reimbursement_detail")?,
            notes: text_field(payload, "notes")?,
        })
    }

    /// The record as `(column, cell)` pairs in [`FIELD_NAMES`] order, list
    /// fields joined with [`LIST_SEPARATOR`].
    pub fn to_row(&self) -> Vec<(String, String)> {
        let cells = [
            self.payer_name.clone(),
            self.policy_name.clone(),
            self.policy_number.clone(),
            self.policy_type.clone(),
            self.approval_date.clone(),
            self.effective_date.clone(),
            self.brief_summary.clone(),
            flatten_list(&self.covered_hcpcs_codes),
            flatten_list(&self.non_covered_hcpcs_codes),
            flatten_list(&self.modifiers_used),
            self.service_summary.clone(),
            self.reimbursement_detail.clone(),
            self.non_reimbursement_detail.clone(),
            self.notes.clone(),
        ];
        FIELD_NAMES
            .iter()
            .zip(cells)
            .map(|(name, cell)| (name.to_string(), cell))
            .collect()
    }
}

/// Join list items for a single cell. Order is kept and duplicates are not removed.
pub fn flatten_list(items: &[String]) -> String {
    items.join(LIST_SEPARATOR)
}

fn text_field(payload: &Map<String, Value>, key: &'static str) -> Result<String, ExtractError> {
    match payload.get(key) {
        None => Err(ExtractError::MissingField { key }),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(ExtractError::FieldType {
            key,
            expected: "a string",
            found: json_type_name(other),
        }),
    }
}

fn list_field(payload: &Map<String, Value>, key: &'static str) -> Result<Vec<String>, ExtractError> {
    let items = match payload.get(key) {
        None => return Err(ExtractError::MissingField { key }),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(ExtractError::FieldType {
                key,
                expected: "a list of strings",
                found: json_type_name(other),
            })
        }
    };

    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.clone()),
            other => Err(ExtractError::FieldType {
                key,
                expected: "a list of strings",
                found: json_type_name(other),
            }),
        })
        .collect()
}

/// JSON type name for error messages.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_payload() -> Map<String, Value> {
        let value = json!({
            "payer_name": "Acme",
            "policy_name": "Anesthesia Services",
            "policy_number": "AN1234",
            "policy_type": "Anesthesia",
            "approval_date": "11/10/23",
            "effective_date": "1/1/24",
            "brief_summary": "Covers anesthesia.",
            "covered_hcpcs_codes": ["85", "123"],
            "non_covered_hcpcs_codes": ["12"],
            "modifiers_used": ["AA", "QK", "AA"],
            "service_summary": "General anesthesia.",
            "reimbursement_detail": "ASA units.",
            "non_reimbursement_detail": "Cosmetic.",
            "notes": "Prior auth."
        });
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn builds_from_complete_payload() {
        let record = PolicyRecord::from_payload(&full_payload()).unwrap();
        assert_eq!(record.payer_name, "Acme");
        assert_eq!(record.covered_hcpcs_codes, vec!["85", "123"]);
    }

    #[test]
    fn missing_key_is_not_defaulted() {
        let mut payload = full_payload();
        payload.remove("notes");
        let err = PolicyRecord::from_payload(&payload).unwrap_err();
        assert!(matches!(err, ExtractError::MissingField { key: "notes" }));
    }

    #[test]
    fn list_field_must_be_array_of_strings() {
        let mut payload = full_payload();
        payload.insert("modifiers_used".into(), json!("AA, QK"));
        let err = PolicyRecord::from_payload(&payload).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::FieldType { key: "modifiers_used", found: "string", .. }
        ));

        payload.insert("modifiers_used".into(), json!(["AA", 7]));
        let err = PolicyRecord::from_payload(&payload).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::FieldType { key: "modifiers_used", found: "number", .. }
        ));
    }

    #[test]
    fn text_field_rejects_null() {
        let mut payload = full_payload();
        payload.insert("approval_date".into(), Value::Null);
        let err = PolicyRecord::from_payload(&payload).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::FieldType { key: "approval_date", found: "null", .. }
        ));
    }

    #[test]
    fn row_flattens_lists_in_order_without_dedup() {
        let record = PolicyRecord::from_payload(&full_payload()).unwrap();
        let row = record.to_row();
        assert_eq!(row.len(), FIELD_NAMES.len());
        let cell = |key: &str| row.iter().find(|(k, _)| k == key).unwrap().1.clone();
        assert_eq!(cell("covered_hcpcs_codes"), "85, 123");
        assert_eq!(cell("modifiers_used"), "AA, QK, AA");
        assert_eq!(cell("non_covered_hcpcs_codes"), "12");
        let keys: Vec<&str> = row.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, FIELD_NAMES.to_vec());
    }

    #[test]
    fn empty_list_flattens_to_empty_cell() {
        assert_eq!(flatten_list(&[]), "");
    }
}
