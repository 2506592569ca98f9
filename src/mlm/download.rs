use super::bert::{MODEL_FILES, TOKENIZER_CONFIG_FILE};
use anyhow::{Context, Result};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

const HUB_BASE_URL: &str = "https://huggingface.co";

/// Model used when none is named on the command line
pub const DEFAULT_REPO: &str = "CAMeL-Lab/bert-base-arabic-camelbert-msa";

/// URL of one file of a hub repository at `revision`
pub fn file_url(repo: &str, revision: &str, file: &str) -> String {
    format!("{}/{}/resolve/{}/{}", HUB_BASE_URL, repo, revision, file)
}

/// Download the model files of `repo` into `dest`
///
/// `tokenizer_config.json` is fetched too when the repository has one.
/// `HF_TOKEN` is sent as a bearer token when set, for gated repositories.
pub fn download_model(repo: &str, revision: &str, dest: &Path) -> Result<Vec<(PathBuf, String)>> {
    println!(
        "{} model {} (revision: {})...",
        "Downloading".cyan().bold(),
        repo.yellow(),
        revision.dimmed()
    );

    fs::create_dir_all(dest)
        .with_context(|| format!("Failed to create model directory: {}", dest.display()))?;

    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("arspell/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(60 * 60))
        .build()
        .context("Failed to create HTTP client")?;
    let token = std::env::var("HF_TOKEN").ok();

    let optional = [TOKENIZER_CONFIG_FILE];
    let files = MODEL_FILES.iter().map(|f| (*f, true)).chain(optional.map(|f| (f, false)));

    let mut written = Vec::new();
    for (file, required) in files {
        let url = file_url(repo, revision, file);
        let path = dest.join(file);
        if !fetch(&client, &url, token.as_deref(), &path, required)? {
            info!(file, "optional model file not in repository");
            continue;
        }

        let digest = sha256_file(&path)?;
        println!(
            "  {} {} {}",
            "✓".green(),
            file.cyan(),
            format!("sha256:{}", digest).dimmed()
        );
        written.push((path, digest));
    }

    println!(
        "{} Model installed: {}",
        "✓".green().bold(),
        dest.display().to_string().cyan()
    );

    Ok(written)
}

fn fetch(
    client: &reqwest::blocking::Client,
    url: &str,
    token: Option<&str>,
    path: &Path,
    required: bool,
) -> Result<bool> {
    info!(url, "downloading model file");

    let mut request = client.get(url);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }

    let response = request
        .send()
        .with_context(|| format!("Failed to download {}", url))?;

    if !required && response.status() == reqwest::StatusCode::NOT_FOUND {
        return Ok(false);
    }
    if !response.status().is_success() {
        anyhow::bail!("Failed to download {}: HTTP {}", url, response.status());
    }

    let pb = match response.content_length() {
        Some(len) => {
            let pb = ProgressBar::new(len);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.cyan} {msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes}")?
                    .progress_chars("=> "),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg} {bytes}")?);
            pb
        }
    };
    pb.set_message(
        path.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
    );

    // Write to a temporary name so an interrupted download never looks complete
    let partial = path.with_extension("part");
    let file = File::create(&partial)
        .with_context(|| format!("Failed to create file: {}", partial.display()))?;
    let mut writer = BufWriter::new(file);
    io::copy(&mut pb.wrap_read(response), &mut writer)
        .with_context(|| format!("Failed to write file: {}", partial.display()))?;
    drop(writer);

    fs::rename(&partial, path)
        .with_context(|| format!("Failed to move {} into place", partial.display()))?;
    pb.finish_and_clear();

    Ok(true)
}

/// Hex SHA-256 of a file's contents
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .with_context(|| format!("Failed to hash file: {}", path.display()))?;
    Ok(format!("{:x}", hasher.finalize()))
}
