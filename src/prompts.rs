//! Prompt templates for the two model-backed stages.
//!
//! Keeping the wording here means tests can check exactly what the model is
//! asked without a live provider. Both templates embed their input verbatim;
//! nothing is escaped or truncated.

/// Instruction sent by the parse stage, followed by the invoice text.
pub const PARSE_INSTRUCTIONS: &str = "You are an AP assistant. Extract the following fields as minified JSON: \
vendor, invoice_no, date, currency, total, \
line_items (list of {description, qty, unit_price, line_total}).";

/// Build the parse-stage prompt for `raw_text`.
pub fn parse_prompt(raw_text: &str) -> String {
    format!("{PARSE_INSTRUCTIONS}\n\nInvoice text:\n{raw_text}")
}

/// Build the validate-stage prompt for the extracted fields.
///
/// Rule 2 (duplicate invoice numbers) is answered inside the prompt; no
/// invoice history is supplied.
pub fn validate_prompt(parsed_fields: &str, approval_threshold: u64) -> String {
    format!(
        "Assess this invoice JSON for issues. \
Rules: (1) total must equal sum(line_total); \
(2) duplicate invoice_no triggers alert (assume no duplicates for demo); \
(3) total > {} requires manual approval. \
Reply 'OK' if clean, otherwise list problems in markdown bullets.\n\n\
JSON:\n```json\n{parsed_fields}\n```",
        group_thousands(approval_threshold)
    )
}

/// `50000` → `50_000`, matching how the threshold reads in the rules.
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('_');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_prompt_lists_fields_and_embeds_text() {
        let p = parse_prompt("Invoice #42\nTotal: 90.00");
        for field in ["vendor", "invoice_no", "date", "currency", "total", "line_items"] {
            assert!(p.contains(field), "missing {field}");
        }
        assert!(p.contains("minified JSON"));
        assert!(p.ends_with("Invoice text:\nInvoice #42\nTotal: 90.00"));
    }

    #[test]
    fn parse_prompt_with_empty_text() {
        assert!(parse_prompt("").ends_with("Invoice text:\n"));
    }

    #[test]
    fn validate_prompt_rules() {
        let p = validate_prompt(r#"{"total":90}"#, 50_000);
        assert!(p.contains("total must equal sum(line_total)"));
        assert!(p.contains("assume no duplicates"));
        assert!(p.contains("total > 50_000 requires manual approval"));
        assert!(p.contains("Reply 'OK' if clean"));
        assert!(p.contains("```json\n{\"total\":90}\n```"));
    }

    #[test]
    fn validate_prompt_custom_threshold() {
        let p = validate_prompt("{}", 1_250_000);
        assert!(p.contains("total > 1_250_000"));
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1_000");
        assert_eq!(group_thousands(50_000), "50_000");
        assert_eq!(group_thousands(123_456_789), "123_456_789");
    }
}
