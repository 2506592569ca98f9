use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Tokens made of at least two characters from the Arabic block
pub const DEFAULT_CANDIDATE_PATTERN: &str = r"^[\x{0600}-\x{06FF}]{2,}$";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding config.json, tokenizer.json and model.safetensors
    pub model_path: Option<PathBuf>,
    pub vocab_path: Option<PathBuf>,

    #[serde(default = "default_min_freq")]
    pub min_freq: u64,

    /// Words outside the vocabulary scoring below this are misspelled
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default = "default_candidate_pattern")]
    pub candidate_pattern: String,

    /// Written in place of a word when no candidate matches
    #[serde(default = "default_fallback_token")]
    pub fallback_token: String,

    /// auto, cpu or cuda
    #[serde(default = "default_device")]
    pub device: String,

    #[serde(default = "default_text_field")]
    pub text_field: String,

    #[serde(default = "default_normalize_corpus")]
    pub normalize_corpus: bool,
}

fn default_min_freq() -> u64 {
    3
}

fn default_threshold() -> f32 {
    0.15
}

fn default_top_k() -> usize {
    5
}

fn default_candidate_pattern() -> String {
    DEFAULT_CANDIDATE_PATTERN.to_string()
}

fn default_fallback_token() -> String {
    "[UNK]".to_string()
}

fn default_device() -> String {
    "auto".to_string()
}

fn default_text_field() -> String {
    "text".to_string()
}

fn default_normalize_corpus() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: None,
            vocab_path: None,
            min_freq: default_min_freq(),
            threshold: default_threshold(),
            top_k: default_top_k(),
            candidate_pattern: default_candidate_pattern(),
            fallback_token: default_fallback_token(),
            device: default_device(),
            text_field: default_text_field(),
            normalize_corpus: default_normalize_corpus(),
        }
    }
}

/// Values given on the command line, applied last
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub model_path: Option<PathBuf>,
    pub vocab_path: Option<PathBuf>,
    pub threshold: Option<f32>,
    pub top_k: Option<usize>,
    pub device: Option<String>,
}

impl Config {
    /// Load configuration with priority: CLI args > local config > global config > defaults
    pub fn load(overrides: Overrides) -> Result<Self> {
        let mut config = Self::default();

        // Load global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                let global_config = Self::from_file(&global_path)?;
                config = config.merge(global_config);
            }
        }

        // Load local config (overrides global)
        let local_path = PathBuf::from(".arspell.toml");
        if local_path.exists() {
            let local_config = Self::from_file(&local_path)?;
            config = config.merge(local_config);
        }

        config = config.apply(overrides);

        if config.model_path.is_none() {
            config.model_path = Self::default_model_path();
        }
        if config.vocab_path.is_none() {
            config.vocab_path = Self::default_vocab_path();
        }

        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn merge(mut self, other: Self) -> Self {
        // other's values override self's if they differ from defaults
        if other.model_path.is_some() {
            self.model_path = other.model_path;
        }
        if other.vocab_path.is_some() {
            self.vocab_path = other.vocab_path;
        }
        if other.min_freq != default_min_freq() {
            self.min_freq = other.min_freq;
        }
        if other.threshold != default_threshold() {
            self.threshold = other.threshold;
        }
        if other.top_k != default_top_k() {
            self.top_k = other.top_k;
        }
        if other.candidate_pattern != DEFAULT_CANDIDATE_PATTERN {
            self.candidate_pattern = other.candidate_pattern;
        }
        if other.fallback_token != default_fallback_token() {
            self.fallback_token = other.fallback_token;
        }
        if other.device != default_device() {
            self.device = other.device;
        }
        if other.text_field != default_text_field() {
            self.text_field = other.text_field;
        }
        if other.normalize_corpus != default_normalize_corpus() {
            self.normalize_corpus = other.normalize_corpus;
        }
        self
    }

    fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(path) = overrides.model_path {
            self.model_path = Some(path);
        }
        if let Some(path) = overrides.vocab_path {
            self.vocab_path = Some(path);
        }
        if let Some(threshold) = overrides.threshold {
            self.threshold = threshold;
        }
        if let Some(top_k) = overrides.top_k {
            self.top_k = top_k;
        }
        if let Some(device) = overrides.device {
            self.device = device;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            bail!("threshold must be between 0 and 1, got {}", self.threshold);
        }
        if self.top_k == 0 {
            bail!("top_k must be at least 1");
        }
        if self.min_freq == 0 {
            bail!("min_freq must be at least 1");
        }
        regex::Regex::new(&self.candidate_pattern)
            .with_context(|| format!("Invalid candidate pattern: {}", self.candidate_pattern))?;
        Ok(())
    }

    /// Model directory, or an error telling the user how to get one
    pub fn model_dir(&self) -> Result<&Path> {
        self.model_path
            .as_deref()
            .context("No model directory configured. Use --model or `arspell model download`.")
    }

    pub fn vocab_file(&self) -> Result<&Path> {
        self.vocab_path
            .as_deref()
            .context("No vocabulary path configured. Use --vocab.")
    }

    pub fn global_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "arspell").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn default_model_path() -> Option<PathBuf> {
        Self::data_dir().map(|dir| dir.join("model"))
    }

    pub fn default_vocab_path() -> Option<PathBuf> {
        Self::data_dir().map(|dir| dir.join("vocab.fst"))
    }

    pub fn data_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "arspell").map(|dirs| dirs.data_dir().to_path_buf())
    }
}
