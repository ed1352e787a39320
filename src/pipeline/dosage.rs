//! Dosage safety validation against a fixed limit table.
//!
//! A pure function: same inputs, same verdict, no hidden state. Both the
//! supplied dosage and the limit are reduced to the first run of digits
//! they contain — unit suffixes are ignored, so `"1000mg"`, `"1000 mg"`,
//! and `"1000"` all compare the same way.
//!
//! Unknown drugs fall back to a limit of `0mg`, which means any parsed
//! positive dosage produces [`ValidationVerdict::HighDosageWarning`]. That
//! warn-by-default behaviour is intentional and pinned by tests; see
//! DESIGN.md before changing it.

use crate::output::ValidationVerdict;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Per-drug maximum daily dose.
///
/// Unknown drugs default to "0mg" — warn-by-default, see module docs.
fn safe_limit(drug: &str) -> &'static str {
    match drug.to_lowercase().as_str() {
        "ibuprofen" => "800mg",
        "metformin" => "2000mg",
        "paracetamol" => "4000mg",
        _ => "0mg",
    }
}

/// First run of digits in `s`, parsed as an integer.
fn first_number(s: &str) -> Option<u64> {
    RE_DIGITS.find(s)?.as_str().parse().ok()
}

/// Compare an extracted dosage against the safety limit for `drug`.
///
/// Drug lookup is case-insensitive. Returns
/// [`ValidationVerdict::UnrecognizedFormat`] when either string carries no
/// parseable number.
pub fn validate_dosage(drug: &str, dosage: &str) -> ValidationVerdict {
    let supplied = match first_number(dosage) {
        Some(n) => n,
        None => return ValidationVerdict::UnrecognizedFormat,
    };
    let limit = match first_number(safe_limit(drug)) {
        Some(n) => n,
        None => return ValidationVerdict::UnrecognizedFormat,
    };

    if supplied > limit {
        ValidationVerdict::HighDosageWarning
    } else {
        ValidationVerdict::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_above_limit_warns() {
        assert_eq!(
            validate_dosage("ibuprofen", "1000mg"),
            ValidationVerdict::HighDosageWarning
        );
    }

    #[test]
    fn verdict_within_limit_is_ok() {
        assert_eq!(validate_dosage("ibuprofen", "400mg"), ValidationVerdict::Ok);
        // The limit itself is not an overdose.
        assert_eq!(validate_dosage("ibuprofen", "800mg"), ValidationVerdict::Ok);
        assert_eq!(validate_dosage("metformin", "2000mg"), ValidationVerdict::Ok);
        assert_eq!(
            validate_dosage("paracetamol", "500 mg"),
            ValidationVerdict::Ok
        );
    }

    #[test]
    fn verdict_without_digits_is_unrecognized() {
        assert_eq!(
            validate_dosage("ibuprofen", "abc"),
            ValidationVerdict::UnrecognizedFormat
        );
        assert_eq!(
            validate_dosage("ibuprofen", ""),
            ValidationVerdict::UnrecognizedFormat
        );
    }

    #[test]
    fn verdict_unknown_drug_warns() {
        // Zero-default limit: any positive dosage for an unlisted drug warns.
        assert_eq!(
            validate_dosage("unknownium", "1mg"),
            ValidationVerdict::HighDosageWarning
        );
        assert_eq!(validate_dosage("unknownium", "0mg"), ValidationVerdict::Ok);
    }

    #[test]
    fn drug_lookup_is_case_insensitive() {
        assert_eq!(validate_dosage("Ibuprofen", "400mg"), ValidationVerdict::Ok);
        assert_eq!(validate_dosage("IBUPROFEN", "400mg"), ValidationVerdict::Ok);
    }

    #[test]
    fn first_digit_run_wins() {
        // "2x400mg" parses as 2, not 400 — the comparison uses the first run.
        assert_eq!(validate_dosage("ibuprofen", "2x400mg"), ValidationVerdict::Ok);
    }

    #[test]
    fn unparseable_overflow_is_unrecognized() {
        let huge = "9".repeat(40);
        assert_eq!(
            validate_dosage("ibuprofen", &huge),
            ValidationVerdict::UnrecognizedFormat
        );
    }

    #[test]
    fn verdict_is_idempotent() {
        let first = validate_dosage("ibuprofen", "1000mg");
        let second = validate_dosage("ibuprofen", "1000mg");
        assert_eq!(first, second);
    }
}
