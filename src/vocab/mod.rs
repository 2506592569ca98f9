//! Frequency vocabulary built from a reference corpus.
//!
//! Words seen at least `min_freq` times are kept together with their
//! counts. The vocabulary is persisted as an FST map (word -> count) and
//! memory-mapped on load, so large vocabularies open instantly.

pub mod manager;

use crate::corpus::{self, CorpusOptions};
use crate::text::{preprocess, split_words};
use anyhow::{Context, Result};
use dashmap::DashMap;
use fst::{Map, MapBuilder, Streamer};
use memmap2::Mmap;
use rayon::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

/// Bytes behind an FST map: built in memory or mapped from disk
enum Backing {
    Memory(Vec<u8>),
    Mapped(Mmap),
}

impl AsRef<[u8]> for Backing {
    fn as_ref(&self) -> &[u8] {
        match self {
            Backing::Memory(bytes) => bytes.as_slice(),
            Backing::Mapped(mmap) => &mmap[..],
        }
    }
}

pub struct Vocabulary {
    map: Map<Backing>,
    total_count: u64,
}

impl Vocabulary {
    fn from_backing(backing: Backing) -> Result<Self> {
        let map = Map::new(backing).context("Failed to parse vocabulary")?;

        let mut total_count = 0u64;
        let mut stream = map.stream();
        while let Some((_, freq)) = stream.next() {
            total_count += freq;
        }

        Ok(Self { map, total_count })
    }

    /// A vocabulary with no words: every word is scored by the model.
    pub fn empty() -> Result<Self> {
        let bytes = MapBuilder::memory()
            .into_inner()
            .context("Failed to create empty vocabulary")?;
        Self::from_backing(Backing::Memory(bytes))
    }

    /// Build from `(word, frequency)` pairs; duplicate words are summed.
    pub fn from_counts<I, S>(counts: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let builder = VocabBuilder::new();
        for (word, freq) in counts {
            *builder.counts.entry(word.into()).or_insert(0) += freq;
        }
        builder.finish(1)
    }

    /// Load a vocabulary previously written with [`Vocabulary::save`]
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open vocabulary: {}", path.display()))?;

        // SAFETY: the file is only read; concurrent truncation by another
        // process is outside what the CLI supports.
        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("Failed to map vocabulary: {}", path.display()))?;

        Self::from_backing(Backing::Mapped(mmap))
            .with_context(|| format!("Invalid vocabulary file: {}", path.display()))
    }

    /// Load `path`, falling back to an empty vocabulary when it does not exist
    pub fn load_or_empty(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!(
                path = %path.display(),
                "No vocabulary file found. Using empty vocabulary."
            );
            Self::empty()
        }
    }

    /// Count words across corpus files in parallel and keep those seen
    /// at least `min_freq` times
    pub fn build_from_corpus<F>(
        files: &[PathBuf],
        min_freq: u64,
        options: &BuildOptions,
        on_file: F,
    ) -> Result<(Self, BuildStats)>
    where
        F: Fn(&Path) + Sync,
    {
        let builder = VocabBuilder::new();
        let documents = AtomicUsize::new(0);

        files.par_iter().try_for_each(|file| -> Result<()> {
            let docs = corpus::read_documents(file, &options.corpus)?;
            debug!(file = %file.display(), documents = docs.len(), "read corpus file");

            for doc in &docs {
                if options.normalize {
                    builder.add_document(&preprocess(doc));
                } else {
                    builder.add_document(doc);
                }
            }

            documents.fetch_add(docs.len(), Ordering::Relaxed);
            on_file(file);
            Ok(())
        })?;

        let distinct_words = builder.distinct_words();
        let vocab = builder.finish(min_freq)?;

        let stats = BuildStats {
            files: files.len(),
            documents: documents.into_inner(),
            distinct_words,
            kept_words: vocab.len(),
        };

        Ok((vocab, stats))
    }

    /// Write the vocabulary to disk in FST format
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create vocabulary directory: {}", parent.display())
                })?;
            }
        }

        std::fs::write(path, self.map.as_fst().as_bytes())
            .with_context(|| format!("Failed to write vocabulary: {}", path.display()))
    }

    pub fn contains(&self, word: &str) -> bool {
        self.map.contains_key(word)
    }

    pub fn frequency(&self, word: &str) -> Option<u64> {
        self.map.get(word)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Sum of the frequencies of every kept word
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// The `n` most frequent words, ties broken alphabetically
    pub fn top(&self, n: usize) -> Vec<(String, u64)> {
        let mut entries = self.entries();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries.truncate(n);
        entries
    }

    /// Every `(word, frequency)` pair in byte order
    pub fn entries(&self) -> Vec<(String, u64)> {
        let mut entries = Vec::with_capacity(self.len());
        let mut stream = self.map.stream();

        while let Some((key, freq)) = stream.next() {
            if let Ok(word) = std::str::from_utf8(key) {
                entries.push((word.to_string(), freq));
            }
        }

        entries
    }
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub corpus: CorpusOptions,
    /// Run documents through `preprocess` before counting
    pub normalize: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            corpus: CorpusOptions::default(),
            normalize: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub files: usize,
    pub documents: usize,
    pub distinct_words: usize,
    pub kept_words: usize,
}

/// Thread-safe word counter
#[derive(Default)]
pub struct VocabBuilder {
    counts: DashMap<String, u64>,
}

impl VocabBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count every whitespace-separated word of `text`
    pub fn add_document(&self, text: &str) {
        for word in split_words(text) {
            *self.counts.entry(word.to_string()).or_insert(0) += 1;
        }
    }

    pub fn distinct_words(&self) -> usize {
        self.counts.len()
    }

    /// Keep words with `freq >= min_freq` and freeze them into a vocabulary
    pub fn finish(self, min_freq: u64) -> Result<Vocabulary> {
        let mut kept: Vec<(String, u64)> = self
            .counts
            .into_iter()
            .filter(|(_, freq)| *freq >= min_freq)
            .collect();
        kept.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        let mut builder = MapBuilder::memory();
        for (word, freq) in kept {
            builder
                .insert(word.as_bytes(), freq)
                .context("Failed to insert word into vocabulary")?;
        }

        let bytes = builder
            .into_inner()
            .context("Failed to finalize vocabulary")?;

        Vocabulary::from_backing(Backing::Memory(bytes))
    }
}
