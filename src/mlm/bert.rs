//! BERT masked language model run locally with candle.
//!
//! The model directory follows the HuggingFace layout:
//!
//! - `config.json`: BERT hyper-parameters
//! - `tokenizer.json`: fast tokenizer definition
//! - `model.safetensors`: weights of a `BertForMaskedLM` checkpoint
//! - `tokenizer_config.json` (optional): names the mask token
//!
//! The encoder comes from `candle-transformers`. The prediction head
//! (dense, GELU, LayerNorm, then a decoder tied to the word embeddings)
//! is assembled here from the `cls.predictions.*` tensors.

use super::{MaskedLm, MlmError, Result};
use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{layer_norm, linear, LayerNorm, Linear, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

pub const CONFIG_FILE: &str = "config.json";
pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const WEIGHTS_FILE: &str = "model.safetensors";
pub const TOKENIZER_CONFIG_FILE: &str = "tokenizer_config.json";

/// Files that make up a usable model directory
pub const MODEL_FILES: [&str; 3] = [CONFIG_FILE, TOKENIZER_FILE, WEIGHTS_FILE];

const DEFAULT_MASK_TOKEN: &str = "[MASK]";

/// The subset of `config.json` the prediction head and `model info` need.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelSummary {
    pub vocab_size: usize,
    pub hidden_size: usize,
    pub num_hidden_layers: usize,
    pub num_attention_heads: usize,
    pub max_position_embeddings: usize,
    #[serde(default = "default_layer_norm_eps")]
    pub layer_norm_eps: f64,
    #[serde(default)]
    pub model_type: Option<String>,
}

fn default_layer_norm_eps() -> f64 {
    1e-12
}

/// `mask_token` is either a bare string or a serialized added token.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TokenEntry {
    Plain(String),
    Added { content: String },
}

#[derive(Debug, Deserialize)]
struct TokenizerSettings {
    #[serde(default)]
    mask_token: Option<TokenEntry>,
}

/// Find the mask token of the tokenizer in `dir`
///
/// `tokenizer_config.json` wins when it names one; otherwise the special
/// added token whose text contains "mask", then `[MASK]`.
fn resolve_mask_token(dir: &Path, tokenizer: &Tokenizer) -> Result<String> {
    let settings_path = dir.join(TOKENIZER_CONFIG_FILE);
    if settings_path.exists() {
        let settings: TokenizerSettings =
            serde_json::from_str(&std::fs::read_to_string(&settings_path)?)?;
        match settings.mask_token {
            Some(TokenEntry::Plain(token)) | Some(TokenEntry::Added { content: token }) => {
                return Ok(token)
            }
            None => {}
        }
    }

    let mut special: Vec<(u32, String)> = tokenizer
        .get_added_tokens_decoder()
        .into_iter()
        .filter(|(_, token)| token.special && token.content.to_lowercase().contains("mask"))
        .map(|(id, token)| (id, token.content))
        .collect();
    special.sort();

    Ok(special
        .into_iter()
        .next()
        .map(|(_, content)| content)
        .unwrap_or_else(|| DEFAULT_MASK_TOKEN.to_string()))
}

/// Pick the device named in the configuration
pub fn select_device(name: &str) -> Result<Device> {
    match name.to_lowercase().as_str() {
        "auto" => Ok(Device::cuda_if_available(0)?),
        "cpu" => Ok(Device::Cpu),
        "cuda" | "gpu" => Ok(Device::new_cuda(0)?),
        other => Err(MlmError::UnknownDevice(other.to_string())),
    }
}

struct PredictionHead {
    dense: Linear,
    layer_norm: LayerNorm,
    decoder_weight: Tensor,
    decoder_bias: Tensor,
}

impl PredictionHead {
    fn load(vb: VarBuilder, summary: &ModelSummary) -> Result<Self> {
        let transform = vb.pp("cls.predictions.transform");
        let dense = linear(summary.hidden_size, summary.hidden_size, transform.pp("dense"))?;
        let layer_norm = layer_norm(
            summary.hidden_size,
            summary.layer_norm_eps,
            transform.pp("LayerNorm"),
        )?;

        // The decoder shares its weight with the input word embeddings
        let decoder_weight = vb.get(
            (summary.vocab_size, summary.hidden_size),
            "bert.embeddings.word_embeddings.weight",
        )?;
        let decoder_bias = vb.get(summary.vocab_size, "cls.predictions.bias")?;

        Ok(Self {
            dense,
            layer_norm,
            decoder_weight,
            decoder_bias,
        })
    }

    /// Map hidden states `(n, hidden)` to vocabulary logits `(n, vocab)`
    fn forward(&self, hidden: &Tensor) -> Result<Tensor> {
        let xs = self.dense.forward(hidden)?.gelu_erf()?;
        let xs = self.layer_norm.forward(&xs)?;
        let logits = xs
            .matmul(&self.decoder_weight.t()?)?
            .broadcast_add(&self.decoder_bias)?;
        Ok(logits)
    }
}

pub struct BertMaskedLm {
    model: BertModel,
    head: PredictionHead,
    tokenizer: Tokenizer,
    device: Device,
    mask_token: String,
    mask_token_id: u32,
    summary: ModelSummary,
    path: PathBuf,
}

impl BertMaskedLm {
    /// Load a model directory onto the named device
    pub fn load(dir: &Path, device: &str) -> Result<Self> {
        for file in MODEL_FILES {
            let path = dir.join(file);
            if !path.exists() {
                return Err(MlmError::MissingFile(path));
            }
        }

        let device = select_device(device)?;
        info!(path = %dir.display(), device = ?device, "loading masked language model");

        let config_str = std::fs::read_to_string(dir.join(CONFIG_FILE))?;
        let bert_config: BertConfig = serde_json::from_str(&config_str)?;
        let summary: ModelSummary = serde_json::from_str(&config_str)?;

        let mut tokenizer = Tokenizer::from_file(dir.join(TOKENIZER_FILE))
            .map_err(|e| MlmError::Tokenizer(e.to_string()))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: summary.max_position_embeddings,
                ..Default::default()
            }))
            .map_err(|e| MlmError::Tokenizer(e.to_string()))?;
        tokenizer.with_padding(None);

        let mask_token = resolve_mask_token(dir, &tokenizer)?;
        let mask_token_id = tokenizer
            .token_to_id(&mask_token)
            .ok_or_else(|| MlmError::MissingMaskToken(mask_token.clone()))?;
        debug!(mask_token, mask_token_id, "resolved mask token");

        let weights = dir.join(WEIGHTS_FILE);
        // SAFETY: the weights file is mapped read-only for the lifetime of the model.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, &device)? };

        let model = BertModel::load(vb.pp("bert"), &bert_config)?;
        let head = PredictionHead::load(vb, &summary)?;

        Ok(Self {
            model,
            head,
            tokenizer,
            device,
            mask_token,
            mask_token_id,
            summary,
            path: dir.to_path_buf(),
        })
    }

    /// Read `config.json` without loading any weights
    pub fn read_summary(dir: &Path) -> Result<ModelSummary> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Err(MlmError::MissingFile(path));
        }
        let config_str = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&config_str)?)
    }

    pub fn summary(&self) -> &ModelSummary {
        &self.summary
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MaskedLm for BertMaskedLm {
    fn mask_token(&self) -> &str {
        &self.mask_token
    }

    fn mask_distribution(&self, masked_sentence: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(masked_sentence, true)
            .map_err(|e| MlmError::Tokenizer(e.to_string()))?;

        let ids = encoding.get_ids();
        let mask_positions: Vec<usize> = ids
            .iter()
            .enumerate()
            .filter(|(_, &id)| id == self.mask_token_id)
            .map(|(pos, _)| pos)
            .collect();
        if mask_positions.len() != 1 {
            return Err(MlmError::MaskCount(mask_positions.len()));
        }
        let mask_pos = mask_positions[0];

        let input_ids = Tensor::new(ids, &self.device)?.unsqueeze(0)?;
        let token_type_ids = input_ids.zeros_like()?;
        let attention_mask = Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;

        let sequence = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        // (1, seq, hidden) -> (1, hidden) at the mask position
        let hidden = sequence.get(0)?.get(mask_pos)?.unsqueeze(0)?;
        let logits = self.head.forward(&hidden)?;
        let probs = candle_nn::ops::softmax_last_dim(&logits)?
            .squeeze(0)?
            .to_dtype(DType::F32)?
            .to_vec1::<f32>()?;

        debug!(tokens = ids.len(), mask_pos, "scored masked sentence");
        Ok(probs)
    }

    fn word_token_ids(&self, word: &str) -> Result<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(word, false)
            .map_err(|e| MlmError::Tokenizer(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode_token(&self, id: u32) -> Result<String> {
        if id as usize >= self.summary.vocab_size {
            return Err(MlmError::TokenOutOfRange(id));
        }
        let text = self
            .tokenizer
            .decode(&[id], false)
            .map_err(|e| MlmError::Tokenizer(e.to_string()))?;
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_nn::VarMap;
    use std::fs;
    use tempfile::tempdir;

    const WORDS: [&str; 5] = ["ذهب", "الولد", "الى", "البيت", "المدرسة"];

    fn tiny_config(vocab_size: usize) -> String {
        format!(
            r#"{{
                "vocab_size": {vocab_size},
                "hidden_size": 8,
                "num_hidden_layers": 1,
                "num_attention_heads": 2,
                "intermediate_size": 16,
                "hidden_act": "gelu",
                "hidden_dropout_prob": 0.0,
                "max_position_embeddings": 16,
                "type_vocab_size": 2,
                "initializer_range": 0.02,
                "layer_norm_eps": 1e-12,
                "pad_token_id": 0,
                "position_embedding_type": "absolute",
                "classifier_dropout": null,
                "model_type": "bert"
            }}"#
        )
    }

    fn tiny_tokenizer(mask: &str) -> String {
        let specials = ["[PAD]", "[UNK]", "[CLS]", "[SEP]", mask];
        let added: Vec<String> = specials
            .iter()
            .enumerate()
            .map(|(id, content)| {
                format!(
                    r#"{{"id": {id}, "content": "{content}", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}}"#
                )
            })
            .collect();
        let vocab: Vec<String> = specials
            .iter()
            .chain(WORDS.iter())
            .enumerate()
            .map(|(id, token)| format!(r#""{token}": {id}"#))
            .collect();

        format!(
            r#"{{
                "version": "1.0",
                "truncation": null,
                "padding": null,
                "added_tokens": [{}],
                "normalizer": null,
                "pre_tokenizer": {{"type": "Whitespace"}},
                "post_processor": {{"type": "BertProcessing", "sep": ["[SEP]", 3], "cls": ["[CLS]", 2]}},
                "decoder": null,
                "model": {{"type": "WordLevel", "vocab": {{{}}}, "unk_token": "[UNK]"}}
            }}"#,
            added.join(", "),
            vocab.join(", ")
        )
    }

    /// Write a randomly initialized model directory using `mask` as mask token
    fn write_tiny_model(dir: &Path, mask: &str) -> usize {
        let vocab_size = 5 + WORDS.len();
        let config_json = tiny_config(vocab_size);
        fs::write(dir.join(CONFIG_FILE), &config_json).unwrap();
        fs::write(dir.join(TOKENIZER_FILE), tiny_tokenizer(mask)).unwrap();

        let bert_config: BertConfig = serde_json::from_str(&config_json).unwrap();
        let summary: ModelSummary = serde_json::from_str(&config_json).unwrap();
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        BertModel::load(vb.pp("bert"), &bert_config).unwrap();
        PredictionHead::load(vb, &summary).unwrap();
        varmap.save(dir.join(WEIGHTS_FILE)).unwrap();

        vocab_size
    }

    #[test]
    fn test_mask_distribution_of_tiny_model() {
        let dir = tempdir().unwrap();
        let vocab_size = write_tiny_model(dir.path(), "[MASK]");
        let model = BertMaskedLm::load(dir.path(), "cpu").unwrap();

        assert_eq!(model.mask_token(), "[MASK]");
        let probs = model.mask_distribution("ذهب الولد الى [MASK]").unwrap();
        assert_eq!(probs.len(), vocab_size);
        assert!(probs.iter().all(|p| *p >= 0.0));
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-4);

        assert_eq!(model.word_token_ids("البيت").unwrap(), vec![8]);
        assert_eq!(model.decode_token(8).unwrap(), "البيت");
        assert!(matches!(
            model.decode_token(vocab_size as u32),
            Err(MlmError::TokenOutOfRange(_))
        ));
    }

    #[test]
    fn test_mask_count_of_tiny_model() {
        let dir = tempdir().unwrap();
        write_tiny_model(dir.path(), "[MASK]");
        let model = BertMaskedLm::load(dir.path(), "cpu").unwrap();

        assert!(matches!(
            model.mask_distribution("ذهب الولد"),
            Err(MlmError::MaskCount(0))
        ));
        assert!(matches!(
            model.mask_distribution("[MASK] الولد [MASK]"),
            Err(MlmError::MaskCount(2))
        ));

        // 16 positions: the mask falls past the truncation point
        let long = format!("{} [MASK]", vec!["ذهب"; 20].join(" "));
        assert!(matches!(
            model.mask_distribution(&long),
            Err(MlmError::MaskCount(0))
        ));
    }

    #[test]
    fn test_mask_token_from_added_tokens() {
        let dir = tempdir().unwrap();
        write_tiny_model(dir.path(), "<mask>");
        let model = BertMaskedLm::load(dir.path(), "cpu").unwrap();

        assert_eq!(model.mask_token(), "<mask>");
        let probs = model.mask_distribution("ذهب <mask>").unwrap();
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_mask_token_from_tokenizer_config() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(TOKENIZER_FILE), tiny_tokenizer("<mask>")).unwrap();
        let tokenizer = Tokenizer::from_file(dir.path().join(TOKENIZER_FILE)).unwrap();

        fs::write(
            dir.path().join(TOKENIZER_CONFIG_FILE),
            r#"{"mask_token": {"content": "<mask>", "lstrip": true, "special": true}}"#,
        )
        .unwrap();
        assert_eq!(resolve_mask_token(dir.path(), &tokenizer).unwrap(), "<mask>");

        fs::write(dir.path().join(TOKENIZER_CONFIG_FILE), r#"{"mask_token": "[MASK]"}"#).unwrap();
        assert_eq!(resolve_mask_token(dir.path(), &tokenizer).unwrap(), "[MASK]");
    }

    #[test]
    fn test_missing_files_are_reported() {
        let dir = tempdir().unwrap();
        match BertMaskedLm::load(dir.path(), "cpu") {
            Err(MlmError::MissingFile(path)) => assert!(path.ends_with(CONFIG_FILE)),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("loading an empty directory should fail"),
        }
    }

    #[test]
    fn test_read_summary() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{
                "vocab_size": 64000,
                "hidden_size": 768,
                "num_hidden_layers": 12,
                "num_attention_heads": 12,
                "max_position_embeddings": 512,
                "model_type": "bert"
            }"#,
        )
        .unwrap();

        let summary = BertMaskedLm::read_summary(dir.path()).unwrap();
        assert_eq!(summary.vocab_size, 64000);
        assert_eq!(summary.layer_norm_eps, 1e-12);
        assert_eq!(summary.model_type.as_deref(), Some("bert"));
    }

    #[test]
    fn test_select_device() {
        assert!(matches!(select_device("cpu"), Ok(Device::Cpu)));
        assert!(matches!(
            select_device("tpu"),
            Err(MlmError::UnknownDevice(_))
        ));
    }
}
