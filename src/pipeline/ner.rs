//! Entity recognition: raw text → labeled spans via an ONNX
//! token-classification model.
//!
//! The model (a BERT-class clinical NER checkpoint exported to ONNX) is
//! loaded once and shared read-only across requests; loading is a
//! process-wide initialisation step, not a per-request cost. Inference goes
//! tokenize → session run → per-token softmax/argmax → **simple
//! aggregation**: adjacent tokens carrying the same entity group are merged
//! into one span, `B-`/`I-` prefixes stripped, scores averaged, and the
//! span text sliced out of the source via tokenizer offsets.
//!
//! A model failure of any kind returns
//! [`RxScanError::EntityModelFailed`] — nothing escapes as a panic or a raw
//! runtime error, so callers can always check-and-map.

use crate::error::RxScanError;
use ort::session::Session;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// One classified span of source text: `(text, label, confidence)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenSpan {
    /// The span text as it appears in the source.
    pub text: String,
    /// Entity group, prefix-stripped (e.g. `DRUG`, `DOSAGE-VALUE`).
    pub label: String,
    /// Mean softmax probability across the merged tokens.
    pub score: f32,
}

/// A named-entity recognizer usable concurrently from many requests.
///
/// The trait is the seam between the pipeline and the model runtime:
/// production uses [`OnnxRecognizer`]; tests inject a stub.
pub trait EntityRecognizer: Send + Sync {
    /// Classify `text` into labeled spans using simple aggregation.
    fn recognize(&self, text: &str) -> Result<Vec<TokenSpan>, RxScanError>;
}

/// Token-classification model backed by ONNX Runtime.
///
/// Requires three files in the model directory:
/// - `model.onnx` — exported token-classification weights
/// - `tokenizer.json` — HuggingFace tokenizer definition
/// - `config.json` — model config carrying the `id2label` table
///
/// Uses interior mutability (Mutex) because `ort::Session::run` requires
/// `&mut self` while [`EntityRecognizer`] exposes `&self` for shared use;
/// the tokenizer and label table are immutable and lock-free.
pub struct OnnxRecognizer {
    session: Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
    labels: Vec<String>,
}

/// The slice of a HuggingFace `config.json` we care about.
#[derive(Deserialize)]
struct ModelConfig {
    id2label: HashMap<String, String>,
}

impl OnnxRecognizer {
    /// Load the recognizer from a directory.
    pub fn load(model_dir: &Path) -> Result<Self, RxScanError> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let config_path = model_dir.join("config.json");

        for path in [&model_path, &tokenizer_path, &config_path] {
            if !path.exists() {
                return Err(RxScanError::ModelNotFound { path: path.clone() });
            }
        }

        let session = Session::builder()
            .map_err(|e| RxScanError::ModelInit {
                detail: e.to_string(),
            })?
            .with_intra_threads(2)
            .map_err(|e| RxScanError::ModelInit {
                detail: e.to_string(),
            })?
            .commit_from_file(&model_path)
            .map_err(|e| RxScanError::ModelInit {
                detail: format!("ONNX load failed: {e}"),
            })?;

        let tokenizer =
            tokenizers::Tokenizer::from_file(&tokenizer_path).map_err(|e| RxScanError::ModelInit {
                detail: format!("tokenizer load failed: {e}"),
            })?;

        let labels = load_labels(&config_path)?;

        tracing::info!(
            "NER model loaded from {} ({} labels)",
            model_dir.display(),
            labels.len()
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            labels,
        })
    }

    /// Tokenize and run the session, returning per-token `(offsets, label
    /// id, probability)` for every non-special token.
    fn infer(&self, text: &str) -> Result<Vec<(usize, usize, usize, f32)>, RxScanError> {
        use ort::value::TensorRef;

        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| RxScanError::EntityModelFailed {
                detail: format!("tokenization failed: {e}"),
            })?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let token_type_ids: Vec<i64> = encoding
            .get_type_ids()
            .iter()
            .map(|&t| t as i64)
            .collect();

        let seq_len = input_ids.len();
        let n_labels = self.labels.len();

        let ids_array = ndarray::Array2::from_shape_vec((1, seq_len), input_ids)
            .map_err(|e| RxScanError::EntityModelFailed {
                detail: e.to_string(),
            })?;
        let mask_array = ndarray::Array2::from_shape_vec((1, seq_len), attention_mask)
            .map_err(|e| RxScanError::EntityModelFailed {
                detail: e.to_string(),
            })?;
        let type_array = ndarray::Array2::from_shape_vec((1, seq_len), token_type_ids)
            .map_err(|e| RxScanError::EntityModelFailed {
                detail: e.to_string(),
            })?;

        let ids_tensor =
            TensorRef::from_array_view(&ids_array).map_err(|e| RxScanError::EntityModelFailed {
                detail: e.to_string(),
            })?;
        let mask_tensor =
            TensorRef::from_array_view(&mask_array).map_err(|e| RxScanError::EntityModelFailed {
                detail: e.to_string(),
            })?;
        let type_tensor =
            TensorRef::from_array_view(&type_array).map_err(|e| RxScanError::EntityModelFailed {
                detail: e.to_string(),
            })?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| RxScanError::EntityModelFailed {
                detail: "session lock poisoned".to_string(),
            })?;

        let outputs = session
            .run(ort::inputs![ids_tensor, mask_tensor, type_tensor])
            .map_err(|e| RxScanError::EntityModelFailed {
                detail: format!("ONNX inference failed: {e}"),
            })?;

        // Logits shape: [1, seq_len, n_labels]
        let (shape, logits) = outputs[0].try_extract_tensor::<f32>().map_err(|e| {
            RxScanError::EntityModelFailed {
                detail: format!("output extraction: {e}"),
            }
        })?;

        if shape.len() != 3 || shape[1] as usize != seq_len || shape[2] as usize != n_labels {
            return Err(RxScanError::EntityModelFailed {
                detail: format!(
                    "unexpected logits shape {shape:?}, expected [1, {seq_len}, {n_labels}]"
                ),
            });
        }

        let specials = encoding.get_special_tokens_mask();
        let offsets = encoding.get_offsets();

        let mut per_token = Vec::with_capacity(seq_len);
        for token_idx in 0..seq_len {
            if specials.get(token_idx).copied().unwrap_or(1) == 1 {
                continue;
            }
            let (start, end) = offsets[token_idx];
            if start == end {
                continue;
            }
            let row = &logits[token_idx * n_labels..(token_idx + 1) * n_labels];
            let (label_id, prob) = argmax_softmax(row);
            per_token.push((start, end, label_id, prob));
        }

        debug!("NER classified {} tokens", per_token.len());
        Ok(per_token)
    }
}

impl EntityRecognizer for OnnxRecognizer {
    fn recognize(&self, text: &str) -> Result<Vec<TokenSpan>, RxScanError> {
        let per_token = self.infer(text)?;
        let observations: Vec<Observation> = per_token
            .iter()
            .map(|&(start, end, label_id, score)| Observation {
                start,
                end,
                label: &self.labels[label_id],
                score,
            })
            .collect();
        Ok(aggregate_spans(text, &observations))
    }
}

/// Parse the `id2label` table into a dense, id-indexed vector.
fn load_labels(config_path: &Path) -> Result<Vec<String>, RxScanError> {
    let raw = std::fs::read_to_string(config_path).map_err(|e| RxScanError::ModelInit {
        detail: format!("config read failed: {e}"),
    })?;
    let config: ModelConfig =
        serde_json::from_str(&raw).map_err(|e| RxScanError::ModelInit {
            detail: format!("config parse failed: {e}"),
        })?;

    if config.id2label.is_empty() {
        return Err(RxScanError::ModelInit {
            detail: "empty id2label table in config.json".to_string(),
        });
    }

    let mut labels = vec![String::new(); config.id2label.len()];
    for (key, label) in config.id2label {
        let id: usize = key.parse().map_err(|_| RxScanError::ModelInit {
            detail: format!("non-numeric label id '{key}' in config.json"),
        })?;
        if id >= labels.len() {
            return Err(RxScanError::ModelInit {
                detail: format!("label id {id} out of range in config.json"),
            });
        }
        labels[id] = label;
    }
    Ok(labels)
}

/// Softmax the logit row and return `(argmax index, max probability)`.
fn argmax_softmax(row: &[f32]) -> (usize, f32) {
    let max_logit = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp_sum: f32 = row.iter().map(|&x| (x - max_logit).exp()).sum();

    let mut best = 0;
    for (i, &x) in row.iter().enumerate() {
        if x > row[best] {
            best = i;
        }
    }
    let prob = (row[best] - max_logit).exp() / exp_sum;
    (best, prob)
}

/// One classified token, before aggregation.
struct Observation<'a> {
    start: usize,
    end: usize,
    label: &'a str,
    score: f32,
}

/// Strip the BIO prefix from a label; `O` (and empty) means "no entity".
fn entity_group(label: &str) -> Option<&str> {
    if label == "O" || label.is_empty() {
        return None;
    }
    let group = label
        .strip_prefix("B-")
        .or_else(|| label.strip_prefix("I-"))
        .unwrap_or(label);
    (!group.is_empty()).then_some(group)
}

/// Simple aggregation: merge runs of adjacent tokens that carry the same
/// entity group. A token classified `O` breaks the run.
fn aggregate_spans(text: &str, observations: &[Observation<'_>]) -> Vec<TokenSpan> {
    struct Run<'a> {
        group: &'a str,
        start: usize,
        end: usize,
        score_sum: f32,
        tokens: usize,
    }

    let mut spans = Vec::new();
    let mut current: Option<Run> = None;

    let flush = |run: Option<Run>, spans: &mut Vec<TokenSpan>| {
        if let Some(run) = run {
            if let Some(slice) = text.get(run.start..run.end) {
                spans.push(TokenSpan {
                    text: slice.to_string(),
                    label: run.group.to_string(),
                    score: run.score_sum / run.tokens as f32,
                });
            }
        }
    };

    for obs in observations {
        match entity_group(obs.label) {
            None => {
                flush(current.take(), &mut spans);
            }
            Some(group) => {
                match current.as_mut() {
                    Some(run) if run.group == group => {
                        run.end = obs.end;
                        run.score_sum += obs.score;
                        run.tokens += 1;
                    }
                    _ => {
                        flush(current.take(), &mut spans);
                        current = Some(Run {
                            group,
                            start: obs.start,
                            end: obs.end,
                            score_sum: obs.score,
                            tokens: 1,
                        });
                    }
                }
            }
        }
    }
    flush(current, &mut spans);

    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(start: usize, end: usize, label: &'static str, score: f32) -> Observation<'static> {
        Observation {
            start,
            end,
            label,
            score,
        }
    }

    #[test]
    fn entity_group_strips_bio_prefixes() {
        assert_eq!(entity_group("B-DRUG"), Some("DRUG"));
        assert_eq!(entity_group("I-DRUG"), Some("DRUG"));
        assert_eq!(entity_group("DOSAGE-VALUE"), Some("DOSAGE-VALUE"));
        assert_eq!(entity_group("O"), None);
        assert_eq!(entity_group(""), None);
    }

    #[test]
    fn adjacent_same_group_tokens_merge() {
        let text = "Take Ibuprofen now";
        let observations = [
            obs(0, 4, "O", 0.99),
            obs(5, 8, "B-DRUG", 0.9),
            obs(8, 14, "I-DRUG", 0.7),
            obs(15, 18, "O", 0.99),
        ];
        let spans = aggregate_spans(text, &observations);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Ibuprofen");
        assert_eq!(spans[0].label, "DRUG");
        assert!((spans[0].score - 0.8).abs() < 1e-6);
    }

    #[test]
    fn o_token_breaks_a_run() {
        let text = "Aspirin and Warfarin";
        let observations = [
            obs(0, 7, "B-DRUG", 0.95),
            obs(8, 11, "O", 0.99),
            obs(12, 20, "B-DRUG", 0.92),
        ];
        let spans = aggregate_spans(text, &observations);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text, "Aspirin");
        assert_eq!(spans[1].text, "Warfarin");
    }

    #[test]
    fn group_change_starts_a_new_span() {
        let text = "Ibuprofen 1000mg";
        let observations = [
            obs(0, 9, "B-DRUG", 0.9),
            obs(10, 14, "B-DOSAGE", 0.8),
            obs(14, 16, "I-DOSAGE", 0.8),
        ];
        let spans = aggregate_spans(text, &observations);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].label, "DRUG");
        assert_eq!(spans[1].text, "1000mg");
        assert_eq!(spans[1].label, "DOSAGE");
    }

    #[test]
    fn multiword_span_keeps_interior_whitespace() {
        let text = "twice daily after meals";
        let observations = [
            obs(0, 5, "B-FREQUENCY", 0.85),
            obs(6, 11, "I-FREQUENCY", 0.75),
        ];
        let spans = aggregate_spans(text, &observations);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "twice daily");
        assert_eq!(spans[0].label, "FREQUENCY");
    }

    #[test]
    fn softmax_picks_the_dominant_logit() {
        let (idx, prob) = argmax_softmax(&[0.1, 4.0, -2.0]);
        assert_eq!(idx, 1);
        assert!(prob > 0.9);

        let (_, uniform) = argmax_softmax(&[1.0, 1.0]);
        assert!((uniform - 0.5).abs() < 1e-6);
    }

    #[test]
    fn out_of_bounds_offsets_are_dropped() {
        let text = "short";
        let observations = [
            obs(0, 5, "B-DRUG", 0.9),
            obs(5, 5, "O", 0.9),
            obs(10, 20, "B-DRUG", 0.9),
        ];
        let spans = aggregate_spans(text, &observations);
        // The second run's offsets fall outside the text and cannot be sliced.
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "short");
    }
}
