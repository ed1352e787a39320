//! Drug-interaction lookup against a label-search endpoint (openFDA).
//!
//! This stage is **infallible by contract**: it always returns an
//! [`InteractionResult`], never an error. Anything that goes wrong on the
//! wire — connect failure, timeout, quota, malformed body, empty result
//! set — collapses into the single
//! [`InteractionResult::LookupUnavailable`] sentinel. The upstream API
//! reports quota exhaustion, outages, and empty matches in ways we cannot
//! reliably tell apart, so the pipeline does not pretend to.
//!
//! Exactly one attempt is made per request; there is no retry.

use crate::output::InteractionResult;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Response shape of the label-search endpoint: a `results` list whose
/// entries optionally carry a `warnings` list.
#[derive(Debug, Deserialize)]
struct LabelSearchResponse {
    #[serde(default)]
    results: Vec<LabelResult>,
}

#[derive(Debug, Deserialize)]
struct LabelResult {
    #[serde(default)]
    warnings: Vec<String>,
}

/// Check the first two extracted drugs for known interaction warnings.
///
/// With fewer than two drugs the single-drug sentinel is returned
/// immediately and no network call is made.
pub async fn check_interactions(
    api_base: &str,
    drugs: &[String],
    timeout_secs: u64,
) -> InteractionResult {
    if drugs.len() < 2 {
        debug!("{} drug(s) extracted, skipping interaction lookup", drugs.len());
        return InteractionResult::NoneSingleDrug;
    }

    let pair = format!("{}+{}", drugs[0], drugs[1]);
    let url = format!("{api_base}?search=interactions:{pair}&limit=1");
    debug!("Interaction lookup: {url}");

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            warn!("Interaction lookup client build failed: {e}");
            return InteractionResult::LookupUnavailable;
        }
    };

    let response = match client.get(&url).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!("Interaction lookup failed for '{pair}': {e}");
            return InteractionResult::LookupUnavailable;
        }
    };

    if !response.status().is_success() {
        warn!(
            "Interaction lookup for '{pair}' returned HTTP {}",
            response.status()
        );
        return InteractionResult::LookupUnavailable;
    }

    match response.json::<LabelSearchResponse>().await {
        Ok(body) => interpret(body),
        Err(e) => {
            warn!("Interaction response for '{pair}' did not parse: {e}");
            InteractionResult::LookupUnavailable
        }
    }
}

/// Map a parsed response body to its verdict.
///
/// A missing or empty `results` list is treated as a malformed response
/// (lookup unavailable); a result whose `warnings` list is missing or empty
/// means the label genuinely carries no warnings.
fn interpret(body: LabelSearchResponse) -> InteractionResult {
    match body.results.first() {
        None => InteractionResult::LookupUnavailable,
        Some(result) => match result.warnings.first() {
            Some(warning) => InteractionResult::Warning(warning.clone()),
            None => InteractionResult::NoneKnown,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_drugs_short_circuits() {
        let result = check_interactions("https://api.invalid", &[], 1).await;
        assert_eq!(result, InteractionResult::NoneSingleDrug);
    }

    #[tokio::test]
    async fn single_drug_short_circuits() {
        let drugs = vec!["aspirin".to_string()];
        let result = check_interactions("https://api.invalid", &drugs, 1).await;
        assert_eq!(result, InteractionResult::NoneSingleDrug);
    }

    #[tokio::test]
    async fn unreachable_endpoint_degrades() {
        let drugs = vec!["aspirin".to_string(), "warfarin".to_string()];
        // Nothing listens on the discard port; the connect fails fast.
        let result = check_interactions("http://127.0.0.1:9/drug/label.json", &drugs, 1).await;
        assert_eq!(result, InteractionResult::LookupUnavailable);
    }

    #[test]
    fn first_warning_of_first_result_wins() {
        let body: LabelSearchResponse = serde_json::from_str(
            r#"{"results": [{"warnings": ["Do not combine.", "Second warning."]},
                            {"warnings": ["From a later result."]}]}"#,
        )
        .unwrap();
        assert_eq!(
            interpret(body),
            InteractionResult::Warning("Do not combine.".into())
        );
    }

    #[test]
    fn result_without_warnings_means_none_known() {
        let body: LabelSearchResponse =
            serde_json::from_str(r#"{"results": [{"id": "abc123"}]}"#).unwrap();
        assert_eq!(interpret(body), InteractionResult::NoneKnown);

        let body: LabelSearchResponse =
            serde_json::from_str(r#"{"results": [{"warnings": []}]}"#).unwrap();
        assert_eq!(interpret(body), InteractionResult::NoneKnown);
    }

    #[test]
    fn empty_or_missing_results_degrade() {
        let body: LabelSearchResponse = serde_json::from_str(r#"{"results": []}"#).unwrap();
        assert_eq!(interpret(body), InteractionResult::LookupUnavailable);

        let body: LabelSearchResponse =
            serde_json::from_str(r#"{"error": {"code": "NOT_FOUND"}}"#).unwrap();
        assert_eq!(interpret(body), InteractionResult::LookupUnavailable);
    }
}
