use super::{BuildOptions, Vocabulary};
use crate::corpus;
use anyhow::Result;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};

/// Build a vocabulary from corpus files and save it to `output`
pub fn build_vocabulary(
    corpus_paths: &[PathBuf],
    output: &Path,
    min_freq: u64,
    options: &BuildOptions,
) -> Result<()> {
    let files = corpus::collect_files(corpus_paths)?;
    if files.is_empty() {
        anyhow::bail!("No corpus files found.");
    }

    println!(
        "{} vocabulary from {} {} (min frequency: {})...",
        "Building".cyan().bold(),
        files.len().to_string().yellow(),
        if files.len() == 1 { "file" } else { "files" },
        min_freq.to_string().yellow()
    );

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let (vocab, stats) = Vocabulary::build_from_corpus(&files, min_freq, options, |file| {
        pb.set_message(
            file.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
        );
        pb.inc(1);
    })?;
    pb.finish_and_clear();

    println!(
        "Read {} documents, {} distinct words, kept {}",
        stats.documents.to_string().yellow(),
        stats.distinct_words.to_string().yellow(),
        stats.kept_words.to_string().green().bold()
    );

    vocab.save(output)?;

    println!(
        "{} Vocabulary saved: {}",
        "✓".green().bold(),
        output.display().to_string().cyan()
    );

    Ok(())
}

pub fn show_info(path: &Path, top: usize) -> Result<()> {
    if !path.exists() {
        println!(
            "{} Vocabulary not found at {}",
            "✗".red().bold(),
            path.display().to_string().yellow()
        );
        println!(
            "Run {} to build one.",
            "arspell vocab build <CORPUS>".cyan()
        );
        return Ok(());
    }

    let metadata = fs::metadata(path)?;
    let vocab = Vocabulary::load(path)?;

    println!("{}", "Vocabulary".bold());
    println!("  Path: {}", path.display());
    println!("  Size: {} KB", metadata.len() / 1024);
    println!("  Words: {}", vocab.len());
    println!("  Total occurrences: {}", vocab.total_count());
    println!("  Format: FST map (word -> frequency)");

    if top > 0 && !vocab.is_empty() {
        println!();
        println!("{}", format!("Top {} words:", top.min(vocab.len())).bold());
        for (word, freq) in vocab.top(top) {
            println!("  {:>8}  {}", freq.to_string().dimmed(), word);
        }
    }

    Ok(())
}

/// Print whether each word is in the vocabulary, with its frequency
pub fn lookup(path: &Path, words: &[String]) -> Result<()> {
    let vocab = Vocabulary::load(path)?;

    for word in words {
        let normalized = crate::text::preprocess(word);
        let normalized = normalized.trim();
        match vocab.frequency(normalized) {
            Some(freq) => println!(
                "  {} {} ({})",
                "✓".green(),
                normalized.cyan().bold(),
                freq.to_string().dimmed()
            ),
            None => println!("  {} {}", "✗".red(), normalized.yellow()),
        }
    }

    Ok(())
}
