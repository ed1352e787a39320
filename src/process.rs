//! Pipeline entry points: image bytes in, structured report out.
//!
//! ## State machine
//!
//! A request walks `RECEIVED → DECODED → OCR_DONE → ENTITIES_DONE →
//! INTERACTIONS_DONE → RESPONDED`; returning `Ok(PrescriptionReport)` is
//! the RESPONDED state. Any failure before that carries the stage it died
//! at ([`RxScanError::stage`]) and a reason. The interactions transition
//! never fails — a degraded lookup produces a sentinel value and the
//! request still completes.
//!
//! Dosage validation and reminders are not part of this sequence; they are
//! invoked on demand against already-extracted data and re-exported from
//! the crate root.

use crate::config::PipelineConfig;
use crate::error::RxScanError;
use crate::output::{EntitySet, PipelineStats, PrescriptionReport};
use crate::pipeline::ner::{EntityRecognizer, OnnxRecognizer};
use crate::pipeline::{classify, decode, interactions, ocr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Process one prescription image into a structured report.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `image_bytes` — the raw uploaded payload; must decode as a raster image
/// * `config` — pipeline configuration
///
/// # Errors
/// Returns `Err(RxScanError)` when the request aborts: undecodable input,
/// OCR failure or blank text, or an entity-model failure. A failed
/// interaction lookup does **not** abort — the report carries the
/// lookup-unavailable sentinel instead.
pub async fn process(
    image_bytes: &[u8],
    config: &PipelineConfig,
) -> Result<PrescriptionReport, RxScanError> {
    let total_start = Instant::now();
    info!("Processing prescription image ({} bytes)", image_bytes.len());

    // ── Step 1: Decode ───────────────────────────────────────────────────
    let decode_start = Instant::now();
    let image = decode::decode_image(image_bytes)?;
    let decode_ms = decode_start.elapsed().as_millis() as u64;

    // ── Step 2: Resolve the recognizer ───────────────────────────────────
    let recognizer = resolve_recognizer(config)?;

    // ── Step 3: OCR ──────────────────────────────────────────────────────
    let ocr_start = Instant::now();
    let text = ocr::extract_text(&image, &config.ocr_languages).await?;
    if text.trim().is_empty() {
        return Err(RxScanError::NoTextExtracted);
    }
    let ocr_ms = ocr_start.elapsed().as_millis() as u64;
    debug!("OCR text: {} bytes", text.len());

    // ── Step 4: Entities ─────────────────────────────────────────────────
    let ner_start = Instant::now();
    let entities = {
        let recognizer = Arc::clone(&recognizer);
        let text = text.clone();
        let min_score = config.min_entity_score;
        tokio::task::spawn_blocking(move || extract_entities(recognizer.as_ref(), &text, min_score))
            .await
            .map_err(|e| RxScanError::Internal(format!("NER task panicked: {e}")))??
    };
    let ner_ms = ner_start.elapsed().as_millis() as u64;
    info!(
        "Extracted {} drugs, {} dosages, {} frequencies",
        entities.drugs.len(),
        entities.dosages.len(),
        entities.frequencies.len()
    );

    // ── Step 5: Interactions (degrades, never aborts) ────────────────────
    let lookup_start = Instant::now();
    let interactions = interactions::check_interactions(
        &config.interaction_api,
        &entities.drugs,
        config.lookup_timeout_secs,
    )
    .await;
    let lookup_ms = lookup_start.elapsed().as_millis() as u64;

    // ── Step 6: Respond ──────────────────────────────────────────────────
    let stats = PipelineStats {
        decode_ms,
        ocr_ms,
        ner_ms,
        lookup_ms,
        total_ms: total_start.elapsed().as_millis() as u64,
    };
    info!("Pipeline complete in {}ms", stats.total_ms);

    Ok(PrescriptionReport {
        text,
        entities,
        interactions,
        stats,
    })
}

/// Process a prescription image read from disk.
pub async fn process_from_file(
    path: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<PrescriptionReport, RxScanError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| RxScanError::ImageRead {
            path: path.to_path_buf(),
            source: e,
        })?;
    process(&bytes, config).await
}

/// Synchronous wrapper around [`process`].
///
/// Creates a temporary tokio runtime internally.
pub fn process_sync(
    image_bytes: &[u8],
    config: &PipelineConfig,
) -> Result<PrescriptionReport, RxScanError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| RxScanError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(process(image_bytes, config))
}

/// Run entity recognition and bucket the spans into an [`EntitySet`].
///
/// All three category buckets are present in the result even when empty.
/// Exposed for callers that already have text (or their own recognizer)
/// and want to skip the image stages.
pub fn extract_entities(
    recognizer: &dyn EntityRecognizer,
    text: &str,
    min_score: f32,
) -> Result<EntitySet, RxScanError> {
    let spans = recognizer.recognize(text)?;
    Ok(classify::bucket_entities(&spans, min_score))
}

/// Resolve the entity recognizer, from most-specific to least-specific.
///
/// 1. **Pre-built recognizer** (`config.recognizer`) — the caller loaded
///    the model once (or injected a stub in tests); reused as-is. This is
///    the right choice for services: load at startup, share the `Arc`.
/// 2. **Model directory** (`config.model_dir`) — load from the configured
///    path.
/// 3. **`RXSCAN_MODEL_DIR` env var** — the execution environment chose the
///    model.
///
/// Loading per-request (2 and 3) works but pays the model-load cost every
/// time; long-lived callers should hold the `Arc` from
/// [`OnnxRecognizer::load`] and use (1).
fn resolve_recognizer(
    config: &PipelineConfig,
) -> Result<Arc<dyn EntityRecognizer>, RxScanError> {
    if let Some(ref recognizer) = config.recognizer {
        return Ok(Arc::clone(recognizer));
    }

    if let Some(ref dir) = config.model_dir {
        return Ok(Arc::new(OnnxRecognizer::load(dir)?));
    }

    if let Ok(dir) = std::env::var("RXSCAN_MODEL_DIR") {
        if !dir.is_empty() {
            return Ok(Arc::new(OnnxRecognizer::load(&PathBuf::from(dir))?));
        }
    }

    Err(RxScanError::RecognizerNotConfigured {
        hint: "Set RXSCAN_MODEL_DIR, or supply model_dir / a pre-built recognizer in the \
               pipeline config."
            .to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ner::TokenSpan;

    struct StubRecognizer(Vec<TokenSpan>);

    impl EntityRecognizer for StubRecognizer {
        fn recognize(&self, _text: &str) -> Result<Vec<TokenSpan>, RxScanError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn extract_entities_buckets_through_the_policy() {
        let stub = StubRecognizer(vec![
            TokenSpan {
                text: "Ibuprofen".into(),
                label: "DRUG".into(),
                score: 0.95,
            },
            TokenSpan {
                text: "1000mg".into(),
                label: "DOSAGE-VALUE".into(),
                score: 0.9,
            },
            TokenSpan {
                text: "Dr. Patel".into(),
                label: "PERSON".into(),
                score: 0.99,
            },
        ]);
        let set = extract_entities(&stub, "whatever", 0.0).unwrap();
        assert_eq!(set.drugs, vec!["Ibuprofen"]);
        assert_eq!(set.dosages, vec!["1000mg"]);
        assert!(set.frequencies.is_empty());
    }

    #[test]
    fn recognizer_resolution_prefers_prebuilt() {
        let config = PipelineConfig::builder()
            .recognizer(Arc::new(StubRecognizer(vec![])))
            .model_dir("/nonexistent/model/dir")
            .build()
            .unwrap();
        // The pre-built stub wins; the bogus model_dir is never touched.
        assert!(resolve_recognizer(&config).is_ok());
    }

    #[test]
    fn missing_recognizer_is_reported_with_a_hint() {
        let config = PipelineConfig::default();
        if std::env::var("RXSCAN_MODEL_DIR").is_ok() {
            return; // environment provides one; nothing to assert here
        }
        let err = resolve_recognizer(&config).unwrap_err();
        assert!(matches!(err, RxScanError::RecognizerNotConfigured { .. }));
        assert!(err.to_string().contains("RXSCAN_MODEL_DIR"));
    }
}
