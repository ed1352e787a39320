//! Output types: the structured report produced by a pipeline run.
//!
//! Everything here is plain data — serialisable with serde so a front door
//! can hand the report straight to a JSON response, and cheap to clone.
//! Field names on the wire match the categories the entity model emits
//! (`DRUG`, `DOSAGE`, `FREQUENCY`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Extracted entity spans, grouped by category.
///
/// All three buckets are always present, even when empty. Within a bucket,
/// spans keep their order of appearance in the source text and duplicates
/// are permitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySet {
    /// Spans whose model label is exactly `DRUG`.
    #[serde(rename = "DRUG")]
    pub drugs: Vec<String>,
    /// Spans whose model label contains `DOSAGE` (e.g. `DOSAGE-VALUE`).
    #[serde(rename = "DOSAGE")]
    pub dosages: Vec<String>,
    /// Spans whose model label contains `FREQUENCY`.
    #[serde(rename = "FREQUENCY")]
    pub frequencies: Vec<String>,
}

impl EntitySet {
    /// True when no span landed in any bucket.
    pub fn is_empty(&self) -> bool {
        self.drugs.is_empty() && self.dosages.is_empty() && self.frequencies.is_empty()
    }
}

/// Outcome of the drug-interaction lookup. Never absent: a failed lookup
/// degrades to [`InteractionResult::LookupUnavailable`] rather than aborting
/// the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionResult {
    /// A warning string from the interaction label database.
    Warning(String),
    /// Fewer than two drugs were extracted; no lookup was attempted.
    NoneSingleDrug,
    /// The lookup succeeded but the label carries no warnings.
    NoneKnown,
    /// The lookup failed (network, timeout, quota, or malformed response).
    /// Deliberately generic: the upstream API does not let us distinguish.
    LookupUnavailable,
}

impl fmt::Display for InteractionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InteractionResult::Warning(w) => f.write_str(w),
            InteractionResult::NoneSingleDrug => f.write_str("No interactions (single drug)"),
            InteractionResult::NoneKnown => f.write_str("No known interactions"),
            InteractionResult::LookupUnavailable => f.write_str("API limit reached"),
        }
    }
}

impl Serialize for InteractionResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Verdict of a dosage safety check for a known (drug, dosage) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationVerdict {
    /// Supplied dosage is at or below the safety limit.
    Ok,
    /// Supplied dosage exceeds the safety limit for this drug.
    HighDosageWarning,
    /// One of the strings carried no parseable numeric value.
    UnrecognizedFormat,
}

impl fmt::Display for ValidationVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationVerdict::Ok => f.write_str("Dosage OK"),
            ValidationVerdict::HighDosageWarning => f.write_str("Warning: High dosage"),
            ValidationVerdict::UnrecognizedFormat => f.write_str("Invalid dosage format"),
        }
    }
}

/// Per-stage wall-clock timings for one pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineStats {
    /// Image decode duration.
    pub decode_ms: u64,
    /// OCR duration.
    pub ocr_ms: u64,
    /// Entity recognition + bucketing duration.
    pub ner_ms: u64,
    /// Interaction lookup duration (zero when short-circuited).
    pub lookup_ms: u64,
    /// End-to-end duration.
    pub total_ms: u64,
}

/// The structured result of processing one prescription image.
#[derive(Debug, Clone, Serialize)]
pub struct PrescriptionReport {
    /// Raw OCR text the entities were extracted from.
    pub text: String,
    /// Extracted spans grouped into the three categories.
    pub entities: EntitySet,
    /// Interaction verdict for the extracted drugs.
    pub interactions: InteractionResult,
    /// Per-stage timings.
    pub stats: PipelineStats,
}

impl PrescriptionReport {
    /// The first extracted drug and dosage, when both exist.
    ///
    /// This is the pair a caller typically feeds to
    /// [`crate::validate_dosage`] or a reminder, matching how the original
    /// front end consumed the report.
    pub fn first_drug_and_dosage(&self) -> Option<(&str, &str)> {
        match (self.entities.drugs.first(), self.entities.dosages.first()) {
            (Some(drug), Some(dosage)) => Some((drug.as_str(), dosage.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_set_serialises_with_category_keys() {
        let set = EntitySet {
            drugs: vec!["Ibuprofen".into()],
            dosages: vec!["1000mg".into()],
            frequencies: vec!["twice daily".into()],
        };
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json["DRUG"][0], "Ibuprofen");
        assert_eq!(json["DOSAGE"][0], "1000mg");
        assert_eq!(json["FREQUENCY"][0], "twice daily");
    }

    #[test]
    fn empty_entity_set_keeps_all_three_keys() {
        let json = serde_json::to_value(EntitySet::default()).unwrap();
        for key in ["DRUG", "DOSAGE", "FREQUENCY"] {
            assert!(json[key].is_array(), "missing key {key}");
        }
    }

    #[test]
    fn interaction_sentinels_render_canonical_strings() {
        assert_eq!(
            InteractionResult::NoneSingleDrug.to_string(),
            "No interactions (single drug)"
        );
        assert_eq!(
            InteractionResult::NoneKnown.to_string(),
            "No known interactions"
        );
        assert_eq!(
            InteractionResult::LookupUnavailable.to_string(),
            "API limit reached"
        );
    }

    #[test]
    fn interaction_result_serialises_as_string() {
        let json = serde_json::to_value(InteractionResult::Warning(
            "Do not combine with warfarin".into(),
        ))
        .unwrap();
        assert_eq!(json, "Do not combine with warfarin");
    }

    #[test]
    fn verdict_serialises_screaming_snake() {
        assert_eq!(
            serde_json::to_value(ValidationVerdict::HighDosageWarning).unwrap(),
            "HIGH_DOSAGE_WARNING"
        );
        assert_eq!(serde_json::to_value(ValidationVerdict::Ok).unwrap(), "OK");
        assert_eq!(
            serde_json::to_value(ValidationVerdict::UnrecognizedFormat).unwrap(),
            "UNRECOGNIZED_FORMAT"
        );
    }

    #[test]
    fn first_drug_and_dosage_requires_both() {
        let mut report = PrescriptionReport {
            text: String::new(),
            entities: EntitySet {
                drugs: vec!["Metformin".into()],
                ..Default::default()
            },
            interactions: InteractionResult::NoneSingleDrug,
            stats: PipelineStats::default(),
        };
        assert_eq!(report.first_drug_and_dosage(), None);

        report.entities.dosages.push("500mg".into());
        assert_eq!(
            report.first_drug_and_dosage(),
            Some(("Metformin", "500mg"))
        );
    }
}
