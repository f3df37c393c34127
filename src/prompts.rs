//! The extraction prompt sent to the completion endpoint.
//!
//! The template is fixed; only the document text is interpolated, and it
//! always goes last so that nothing in a document can be mistaken for
//! instructions that follow it.

/// Instructions preceding the document text.
///
/// Lists the human-readable field layout with a worked example, then the
/// exact JSON keys. Keep the key list in step with
/// [`crate::record::FIELD_NAMES`]; the unit tests check this.
pub const EXTRACTION_INSTRUCTIONS: &str = r#"Act as a policy advisor. Please analyze the following insurance policy document and extract key details using the exact format below. Ensure each section is filled in accurately based on the content of the document.

Required Output Format:
Payer Name:
Policy Name:
Policy Number:
Policy Type:
Approval Date:
Effective Date:
Brief Summary:
Covered HCPCS Codes: (Include CPT codes as HCPCS codes)
Non-Covered HCPCS Codes: (Include CPT codes as HCPCS codes)
Modifiers Used:
Service Summary:
Reimbursement Detail:
Non-Reimbursement Detail:
Notes:

EXAMPLE:
Payer Name: Blue Cross Blue Shield NC
Policy Name: Anesthesia Services
Policy Number: AN1234
Policy Type: Anesthesia
Approval Date: 11/10/23
Effective Date: 1/1/24
Brief Summary: Covers anesthesia services when medically necessary during surgical procedures. Non-covered services include experimental anesthetic techniques.
Covered HCPCS Codes: ["85", "123", "456"]
Non Covered HCPCS Codes: ["12", "789"]
Modifiers Used: ["AA", "AD", "QK", "QX", "QY", "QZ"]
Service Summary: General, regional, and monitored anesthesia care for covered surgical procedures. Excludes experimental procedures.
Reimbursement Detail: Payment is based on ASA units multiplied by the contracted rate. Specific documentation requirements must be met.
Non-Reimbursement Detail: Experimental anesthesia, anesthesia for cosmetic procedures not covered
Notes: All claims must include proper ASA and CPT coding. Prior authorization required for specific high-cost procedures.

Please provide the entire output as a JSON object, directly, without any surrounding markdown code block fences (e.g., ```json). The JSON should have the following keys: payer_name, policy_name, policy_number, policy_type, approval_date, effective_date, brief_summary, covered_hcpcs_codes, non_covered_hcpcs_codes, modifiers_used, service_summary, reimbursement_detail, non_reimbursement_detail, notes. Ensure 'covered_hcpcs_codes' and 'non_covered_hcpcs_codes' are lists of strings (including CPT codes), and 'modifiers_used' is also a list of strings. All other keys are plain strings.

Policy Document Content:
"#;

/// Build the complete prompt for one document.
pub fn build_prompt(document_text: &str) -> String {
    let mut prompt = String::with_capacity(EXTRACTION_INSTRUCTIONS.len() + document_text.len() + 1);
    prompt.push_str(EXTRACTION_INSTRUCTIONS);
    prompt.push_str(document_text);
    prompt.push('\n');
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FIELD_NAMES, LIST_FIELDS};

    #[test]
    fn template_lists_all_keys() {
        for key in FIELD_NAMES.iter().chain(LIST_FIELDS.iter()) {
            assert!(EXTRACTION_INSTRUCTIONS.contains(key), "missing {key}");
        }
    }

    #[test]
    fn prompt_ends_with_document_text() {
        let prompt = build_prompt("POLICY BODY TEXT");
        assert!(prompt.starts_with("Act as a policy advisor."));
        assert!(prompt.trim_end().ends_with("Policy Document Content:\nPOLICY BODY TEXT"));
    }

    #[test]
    fn prompt_forbids_fences() {
        let prompt = build_prompt("");
        assert!(prompt.contains("without any surrounding markdown code block fences"));
    }

    #[test]
    fn prompt_is_constant_apart_from_text() {
        let a = build_prompt("one");
        let b = build_prompt("two");
        assert_eq!(
            a.trim_end_matches("one\n"),
            b.trim_end_matches("two\n")
        );
    }
}
