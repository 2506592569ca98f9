//! Reference corpora used to build the vocabulary.
//!
//! A corpus is a set of files, each yielding a list of documents. The
//! file format is chosen from the extension, and a trailing `.gz` is
//! decompressed transparently before the inner format is picked.

pub mod jsonl;
pub mod markdown;
pub mod plaintext;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusFormat {
    PlainText,
    JsonLines,
    Markdown,
}

impl CorpusFormat {
    /// Detect corpus format from extension, looking through a `.gz` suffix
    pub fn from_path(path: &Path) -> Self {
        let ext = inner_extension(path);

        match ext.as_str() {
            "jsonl" | "ndjson" => CorpusFormat::JsonLines,
            "md" | "mdx" | "markdown" => CorpusFormat::Markdown,
            _ => CorpusFormat::PlainText,
        }
    }
}

fn is_gzipped(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("gz"))
        .unwrap_or(false)
}

fn inner_extension(path: &Path) -> String {
    let path = if is_gzipped(path) {
        Path::new(path.file_stem().unwrap_or_default())
    } else {
        path
    };

    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

#[derive(Debug, Clone)]
pub struct CorpusOptions {
    /// JSON field holding the document text in `.jsonl` files
    pub text_field: String,
}

impl Default for CorpusOptions {
    fn default() -> Self {
        Self {
            text_field: "text".to_string(),
        }
    }
}

/// Expand the given paths into corpus files, walking directories recursively.
pub fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()))
            {
                let entry = entry
                    .with_context(|| format!("Failed to walk corpus directory: {}", path.display()))?;
                if entry.file_type().is_file() {
                    files.push(entry.into_path());
                }
            }
        } else if path.exists() {
            files.push(path.clone());
        } else {
            anyhow::bail!("Corpus path not found: {}", path.display());
        }
    }

    Ok(files)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().map(|s| s.starts_with('.')).unwrap_or(false)
}

/// Read a corpus file to a string, gunzipping when needed
pub fn read_to_string(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open corpus file: {}", path.display()))?;

    let mut content = String::new();
    if is_gzipped(path) {
        GzDecoder::new(file)
            .read_to_string(&mut content)
            .with_context(|| format!("Failed to decompress corpus file: {}", path.display()))?;
    } else {
        file.read_to_string(&mut content)
            .with_context(|| format!("Failed to read corpus file: {}", path.display()))?;
    }

    Ok(content)
}

/// Read a corpus file and split it into documents
pub fn read_documents(path: &Path, options: &CorpusOptions) -> Result<Vec<String>> {
    let content = read_to_string(path)?;

    match CorpusFormat::from_path(path) {
        CorpusFormat::PlainText => Ok(plaintext::documents(&content)),
        CorpusFormat::JsonLines => jsonl::documents(&content, &options.text_field)
            .with_context(|| format!("Failed to parse corpus file: {}", path.display())),
        CorpusFormat::Markdown => Ok(markdown::documents(&content)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_format_detection() {
        assert_eq!(
            CorpusFormat::from_path(&PathBuf::from("news.jsonl")),
            CorpusFormat::JsonLines
        );
        assert_eq!(
            CorpusFormat::from_path(&PathBuf::from("news.jsonl.gz")),
            CorpusFormat::JsonLines
        );
        assert_eq!(
            CorpusFormat::from_path(&PathBuf::from("README.md")),
            CorpusFormat::Markdown
        );
        assert_eq!(
            CorpusFormat::from_path(&PathBuf::from("wiki.txt.gz")),
            CorpusFormat::PlainText
        );
    }

    #[test]
    fn test_gzipped_corpus() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corpus.txt.gz");

        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all("سطر اول\nسطر ثان\n".as_bytes()).unwrap();
        encoder.finish().unwrap();

        let docs = read_documents(&path, &CorpusOptions::default()).unwrap();
        assert_eq!(docs, vec!["سطر اول", "سطر ثان"]);
    }

    #[test]
    fn test_collect_files_skips_hidden() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "كلمة").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("b.jsonl"), "{}").unwrap();
        std::fs::write(dir.path().join(".hidden.txt"), "كلمة").unwrap();

        let files = collect_files(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| !f.to_string_lossy().contains(".hidden")));
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(collect_files(&[dir.path().join("missing.txt")]).is_err());
    }
}
