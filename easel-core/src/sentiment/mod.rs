//! Binary sentiment classification with a DistilBERT SST-2 checkpoint.

use std::collections::HashMap;

use anyhow::{Context, Error, Result};
use candle_core::{DType, Device, IndexOp, Module, Tensor};
use candle_nn::{ops::softmax, Linear, VarBuilder};
use candle_transformers::models::distilbert::{self, DistilBertModel};
use hf_hub::api::tokio::Api;
use serde::{Deserialize, Serialize};
use tokenizers::Tokenizer;
use tracing::debug;

use crate::{select_best_device, DeviceMap};

pub const DEFAULT_SENTIMENT_MODEL: &str =
    "distilbert/distilbert-base-uncased-finetuned-sst-2-english";

const MAX_POSITIONS: usize = 512;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentResult {
    pub label: String,
    pub score: f32,
}

/// The parts of `config.json` the classification head needs.
#[derive(Debug, Deserialize)]
struct HeadConfig {
    #[serde(default = "default_dim")]
    dim: usize,
    #[serde(default)]
    id2label: HashMap<String, String>,
}

fn default_dim() -> usize {
    768
}

impl HeadConfig {
    fn label(&self, index: usize) -> String {
        self.id2label
            .get(&index.to_string())
            .cloned()
            .unwrap_or_else(|| format!("LABEL_{index}"))
    }
}

/// Picks the highest-probability class.
fn best_label(probabilities: &[f32], labels: &HeadConfig) -> Result<SentimentResult> {
    let (index, score) = probabilities
        .iter()
        .copied()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .context("classifier produced no scores")?;
    Ok(SentimentResult {
        label: labels.label(index),
        score,
    })
}

pub struct SentimentClassifier {
    device: Device,
    tokenizer: Tokenizer,
    model: DistilBertModel,
    pre_classifier: Linear,
    classifier: Linear,
    labels: HeadConfig,
}

impl SentimentClassifier {
    pub async fn load(model_id: &str, api: Api, device_map: DeviceMap) -> Result<Self> {
        let device = select_best_device(device_map).context("failed to set up device")?;
        let repo = api.model(model_id.to_string());

        let config_file = repo.get("config.json").await.context("failed to get config")?;
        let config_str =
            std::fs::read_to_string(&config_file).context("failed to read classifier config")?;
        let config: distilbert::Config =
            serde_json::from_str(&config_str).context("failed to parse classifier config")?;
        let head: HeadConfig =
            serde_json::from_str(&config_str).context("failed to parse classifier head config")?;

        let tokenizer_file = repo
            .get("tokenizer.json")
            .await
            .context("failed to get tokenizer")?;
        let tokenizer = Tokenizer::from_file(tokenizer_file)
            .map_err(Error::msg)
            .context("failed to load tokenizer")?;

        let weights = repo
            .get("model.safetensors")
            .await
            .context("failed to get classifier weights")?;
        debug!(file = %weights.display(), "mapping classifier weights");
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, &device)
                .context("failed to build classifier var builder")?
        };
        let model = DistilBertModel::load(vb.pp("distilbert"), &config)
            .context("failed to load DistilBERT encoder")?;
        let hidden = head.dim;
        let num_labels = head.id2label.len().max(2);
        let pre_classifier = candle_nn::linear(hidden, hidden, vb.pp("pre_classifier"))
            .context("failed to load pre-classifier")?;
        let classifier = candle_nn::linear(hidden, num_labels, vb.pp("classifier"))
            .context("failed to load classifier head")?;

        Ok(Self {
            device,
            tokenizer,
            model,
            pre_classifier,
            classifier,
            labels: head,
        })
    }

    pub fn classify(&self, text: &str) -> Result<SentimentResult> {
        let mut tokens = self
            .tokenizer
            .encode(text, true)
            .map_err(Error::msg)?
            .get_ids()
            .to_vec();
        tokens.truncate(MAX_POSITIONS);
        let len = tokens.len();
        let input_ids = Tensor::new(tokens.as_slice(), &self.device)?.unsqueeze(0)?;
        // Nothing is padded, so no position is masked out.
        let mask = Tensor::zeros((len, len), DType::U8, &self.device)?;

        let hidden = self.model.forward(&input_ids, &mask)?;
        let pooled = hidden.i((.., 0))?;
        let pooled = self.pre_classifier.forward(&pooled)?.relu()?;
        let logits = self.classifier.forward(&pooled)?;
        let probabilities = softmax(&logits, 1)?.i(0)?.to_vec1::<f32>()?;

        best_label(&probabilities, &self.labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sst2_labels() -> HeadConfig {
        serde_json::from_str(r#"{"dim": 768, "id2label": {"0": "NEGATIVE", "1": "POSITIVE"}}"#)
            .unwrap()
    }

    #[test]
    fn picks_highest_probability() {
        let result = best_label(&[0.1, 0.9], &sst2_labels()).unwrap();
        assert_eq!(result.label, "POSITIVE");
        assert!((result.score - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn unknown_index_gets_generic_label() {
        let labels: HeadConfig = serde_json::from_str("{}").unwrap();
        let result = best_label(&[0.7, 0.3], &labels).unwrap();
        assert_eq!(result.label, "LABEL_0");
    }

    #[test]
    fn empty_scores_are_an_error() {
        assert!(best_label(&[], &sst2_labels()).is_err());
    }

    #[test]
    fn serializes_like_a_pipeline_result() {
        let json = serde_json::to_string(&vec![SentimentResult {
            label: "POSITIVE".to_string(),
            score: 0.5,
        }])
        .unwrap();
        assert_eq!(json, r#"[{"label":"POSITIVE","score":0.5}]"#);
    }
}
