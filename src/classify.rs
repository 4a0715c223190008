//! Optional article classification.
//!
//! The classifier is an opaque `predict(texts) -> labels` capability loaded
//! from a model artifact on disk. It is optional end to end: a missing file,
//! an unreadable artifact or a failing prediction all leave every record at
//! [`UNCLASSIFIED`] instead of failing the run.
//!
//! # Artifact Format
//!
//! The bundled [`LinearTextModel`] is a JSON linear classifier over
//! lowercase word tokens:
//!
//! ```json
//! {
//!   "bias": -0.4,
//!   "weights": { "ekonomi": 1.2, "inflasi": 0.9, "harga": 0.5 },
//!   "positive_label": 1,
//!   "negative_label": 0
//! }
//! ```

use crate::models::{ArticleRecord, UNCLASSIFIED};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("could not read model artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid model artifact: {0}")]
    Artifact(String),
    #[error("prediction failed: {0}")]
    Predict(String),
    #[error("model returned {got} labels for {expected} texts")]
    LengthMismatch { expected: usize, got: usize },
}

/// A batch text classifier.
pub trait Classifier {
    fn predict(&self, texts: &[String]) -> Result<Vec<i64>, ClassifyError>;
}

/// Linear bag-of-words model: `score = bias + Σ weight(token)`.
#[derive(Debug, Clone, Deserialize)]
pub struct LinearTextModel {
    #[serde(default)]
    pub bias: f64,
    pub weights: HashMap<String, f64>,
    #[serde(default = "default_positive")]
    pub positive_label: i64,
    #[serde(default)]
    pub negative_label: i64,
}

fn default_positive() -> i64 {
    1
}

impl LinearTextModel {
    /// Parse and validate a JSON artifact.
    pub fn from_json(raw: &str) -> Result<Self, ClassifyError> {
        let model: LinearTextModel =
            serde_json::from_str(raw).map_err(|e| ClassifyError::Artifact(e.to_string()))?;
        if !model.bias.is_finite() {
            return Err(ClassifyError::Artifact("bias is not finite".into()));
        }
        if let Some((token, _)) = model.weights.iter().find(|(_, w)| !w.is_finite()) {
            return Err(ClassifyError::Artifact(format!("weight for {token:?} is not finite")));
        }
        Ok(model)
    }

    fn score(&self, text: &str) -> f64 {
        tokens(text)
            .filter_map(|t| self.weights.get(&t))
            .fold(self.bias, |acc, w| acc + w)
    }
}

impl Classifier for LinearTextModel {
    fn predict(&self, texts: &[String]) -> Result<Vec<i64>, ClassifyError> {
        Ok(texts
            .iter()
            .map(|t| {
                if self.score(t) > 0.0 {
                    self.positive_label
                } else {
                    self.negative_label
                }
            })
            .collect())
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Load the model artifact at `path`.
///
/// Absence is normal and logged at info; a present but unusable artifact is
/// logged as a warning. Neither is returned as an error.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn load_model(path: &Path) -> Option<Box<dyn Classifier>> {
    if !path.exists() {
        info!("Model not found; skipping classification");
        return None;
    }
    let loaded = std::fs::read_to_string(path)
        .map_err(ClassifyError::from)
        .and_then(|raw| LinearTextModel::from_json(&raw));
    match loaded {
        Ok(model) => {
            info!(vocabulary = model.weights.len(), "Model loaded");
            Some(Box::new(model))
        }
        Err(e) => {
            warn!(error = %e, "Failed to load model; skipping classification");
            None
        }
    }
}

/// Label every record in one batch.
///
/// Without a classifier, or when prediction fails in any way, every record
/// is set to [`UNCLASSIFIED`]; a batch is never partially labeled.
#[instrument(level = "info", skip_all, fields(count = records.len()))]
pub fn classify(records: &mut [ArticleRecord], classifier: Option<&dyn Classifier>) {
    let labels = classifier.and_then(|model| {
        let texts: Vec<String> = records.iter().map(|r| r.body.clone()).collect();
        let outcome = model.predict(&texts).and_then(|labels| {
            if labels.len() == texts.len() {
                Ok(labels)
            } else {
                Err(ClassifyError::LengthMismatch {
                    expected: texts.len(),
                    got: labels.len(),
                })
            }
        });
        match outcome {
            Ok(labels) => Some(labels),
            Err(e) => {
                warn!(error = %e, "Classification failed; leaving articles unclassified");
                None
            }
        }
    });

    match labels {
        Some(labels) => {
            for (record, label) in records.iter_mut().zip(labels) {
                record.label = label;
            }
        }
        None => {
            for record in records.iter_mut() {
                record.label = UNCLASSIFIED;
            }
        }
    }
}

/// Records whose label equals `target`.
pub fn split_target(records: &[ArticleRecord], target: i64) -> Vec<ArticleRecord> {
    records.iter().filter(|r| r.label == target).cloned().collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::TARGET_LABEL;
    use chrono::NaiveDate;

    pub(crate) fn record(link: &str, body: &str) -> ArticleRecord {
        ArticleRecord::new(
            "x",
            "judul",
            link,
            NaiveDate::from_ymd_opt(2024, 3, 12).unwrap(),
            body.to_string(),
        )
    }

    const MODEL: &str = r#"{"bias": -0.5, "weights": {"ekonomi": 1.0, "inflasi": 1.0}}"#;

    struct Broken;

    impl Classifier for Broken {
        fn predict(&self, _texts: &[String]) -> Result<Vec<i64>, ClassifyError> {
            Err(ClassifyError::Predict("shape mismatch".into()))
        }
    }

    struct Short;

    impl Classifier for Short {
        fn predict(&self, _texts: &[String]) -> Result<Vec<i64>, ClassifyError> {
            Ok(vec![1])
        }
    }

    #[test]
    fn test_linear_model_predicts_by_token_weights() {
        let model = LinearTextModel::from_json(MODEL).unwrap();
        let labels = model
            .predict(&[
                "Inflasi Lampung turun".to_string(),
                "Banjir di pesisir".to_string(),
                String::new(),
            ])
            .unwrap();
        assert_eq!(labels, vec![1, 0, 0]);
    }

    #[test]
    fn test_invalid_artifact_is_rejected() {
        assert!(matches!(
            LinearTextModel::from_json("not json"),
            Err(ClassifyError::Artifact(_))
        ));
        assert!(matches!(
            LinearTextModel::from_json(r#"{"bias": 0}"#),
            Err(ClassifyError::Artifact(_))
        ));
    }

    #[test]
    fn test_classify_without_model_marks_unclassified() {
        let mut records = vec![record("a", "ekonomi"), record("b", "")];
        records[0].label = 1;
        classify(&mut records, None);
        assert!(records.iter().all(|r| r.label == UNCLASSIFIED));
        assert!(split_target(&records, TARGET_LABEL).is_empty());
    }

    #[test]
    fn test_classify_labels_batch_and_splits_target() {
        let model = LinearTextModel::from_json(MODEL).unwrap();
        let mut records = vec![record("a", "ekonomi tumbuh"), record("b", "sepak bola")];
        classify(&mut records, Some(&model));
        assert_eq!(records[0].label, 1);
        assert_eq!(records[1].label, 0);
        let target = split_target(&records, TARGET_LABEL);
        assert_eq!(target.len(), 1);
        assert_eq!(target[0].link, "a");
    }

    #[test]
    fn test_prediction_failure_degrades_whole_batch() {
        let mut records = vec![record("a", "ekonomi"), record("b", "")];
        classify(&mut records, Some(&Broken));
        assert!(records.iter().all(|r| r.label == UNCLASSIFIED));

        classify(&mut records, Some(&Short));
        assert!(records.iter().all(|r| r.label == UNCLASSIFIED));
    }

    #[test]
    fn test_load_model_missing_and_corrupt() {
        let dir = std::env::temp_dir().join(format!("lampung_news_model_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        assert!(load_model(&dir.join("absent.json")).is_none());

        let corrupt = dir.join("corrupt.json");
        std::fs::write(&corrupt, b"\x00\x01 pickle").unwrap();
        assert!(load_model(&corrupt).is_none());

        let good = dir.join("model.json");
        std::fs::write(&good, MODEL).unwrap();
        let model = load_model(&good).unwrap();
        assert_eq!(model.predict(&["inflasi".to_string()]).unwrap(), vec![1]);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
