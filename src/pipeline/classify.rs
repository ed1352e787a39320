//! Categorization: bucket labeled spans into the three report categories.
//!
//! The policy is deliberately asymmetric:
//!
//! - `DRUG` requires an **exact** label match;
//! - `DOSAGE` and `FREQUENCY` match by **substring**, so model label
//!   variants like `DOSAGE-VALUE` or `MED-FREQUENCY` still land in the
//!   right bucket;
//! - every other label is dropped silently.
//!
//! The substring semantics for the latter two are load-bearing — clinical
//! checkpoints disagree on exact label spellings, and collapsing their
//! variants here keeps the report schema stable across model swaps.

use crate::output::EntitySet;
use crate::pipeline::ner::TokenSpan;
use tracing::debug;

/// Bucket spans into an [`EntitySet`], preserving order of appearance and
/// duplicates. Spans scoring below `min_score` are discarded.
pub fn bucket_entities(spans: &[TokenSpan], min_score: f32) -> EntitySet {
    let mut set = EntitySet::default();

    for span in spans {
        if span.score < min_score {
            continue;
        }
        if span.label == "DRUG" {
            set.drugs.push(span.text.clone());
        } else if span.label.contains("DOSAGE") {
            set.dosages.push(span.text.clone());
        } else if span.label.contains("FREQUENCY") {
            set.frequencies.push(span.text.clone());
        }
        // other labels: dropped
    }

    debug!(
        "Bucketed {} spans: {} drugs, {} dosages, {} frequencies",
        spans.len(),
        set.drugs.len(),
        set.dosages.len(),
        set.frequencies.len()
    );

    set
}
