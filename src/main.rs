use anyhow::{Context, Result};
use arspell::cli::output::{print_report, JsonReport, OutputFormat};
use arspell::config::Overrides;
use arspell::mlm::{download, BertMaskedLm};
use arspell::vocab::{manager, BuildOptions};
use arspell::{cli, corpus, Config, Corrector, CorrectorOptions, Vocabulary};
use clap::{ArgAction, CommandFactory, Parser};
use clap_complete::{generate, Shell};
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "arspell")]
#[command(version, about = "Arabic spellchecker backed by a masked language model", long_about = None)]
struct Cli {
    /// Files to check
    #[arg(value_name = "FILES")]
    files: Vec<PathBuf>,

    /// Correct this text instead of files
    #[arg(short, long, conflicts_with = "files")]
    text: Option<String>,

    /// Fix misspellings in place (auto-apply top replacement)
    #[arg(short, long)]
    fix: bool,

    /// Interactive mode for selecting corrections
    #[arg(short, long, requires = "fix")]
    interactive: bool,

    /// Print only the corrected text, without the correction log
    #[arg(short, long)]
    quiet: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Exit with code 0 even if errors are found
    #[arg(long)]
    no_fail: bool,

    /// Output format (text, json)
    #[arg(short = 'o', long, default_value = "text")]
    format: OutputFormat,

    /// Model directory (config.json, tokenizer.json, model.safetensors)
    #[arg(long, env = "ARSPELL_MODEL")]
    model: Option<PathBuf>,

    /// Vocabulary file built with `arspell vocab build`
    #[arg(long, env = "ARSPELL_VOCAB")]
    vocab: Option<PathBuf>,

    /// Probability below which an unknown word is misspelled
    #[arg(long)]
    threshold: Option<f32>,

    /// Number of predictions inspected per misspelling
    #[arg(long)]
    top_k: Option<usize>,

    /// Device to run the model on (auto, cpu, cuda)
    #[arg(long)]
    device: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Generate shell completion script
    #[arg(long, value_name = "SHELL")]
    completion: Option<Shell>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Vocabulary management
    Vocab {
        #[command(subcommand)]
        action: VocabCommands,
    },
    /// Model management
    Model {
        #[command(subcommand)]
        action: ModelCommands,
    },
    /// Interactive correction session
    Session,
}

#[derive(Parser, Debug)]
enum VocabCommands {
    /// Build a vocabulary from corpus files or directories
    Build {
        /// Corpus files (.txt, .jsonl, .md, optionally .gz) or directories
        #[arg(required = true)]
        corpus: Vec<PathBuf>,

        /// Minimum number of occurrences for a word to be kept
        #[arg(long)]
        min_freq: Option<u64>,

        /// Where to write the vocabulary
        #[arg(long)]
        output: Option<PathBuf>,

        /// JSON field holding the text in .jsonl corpora
        #[arg(long)]
        text_field: Option<String>,

        /// Count words as they appear, without preprocessing
        #[arg(long)]
        raw: bool,
    },
    /// Show vocabulary info
    Info {
        /// Vocabulary file (defaults to the configured one)
        path: Option<PathBuf>,

        /// Number of most frequent words to list
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Look words up in the vocabulary
    Lookup {
        #[arg(required = true)]
        words: Vec<String>,
    },
}

#[derive(Parser, Debug)]
enum ModelCommands {
    /// Download a BERT masked-LM from the HuggingFace hub
    Download {
        /// Repository id (e.g., CAMeL-Lab/bert-base-arabic-camelbert-msa)
        #[arg(default_value = download::DEFAULT_REPO)]
        repo: String,

        /// Branch, tag or commit
        #[arg(long, default_value = "main")]
        revision: String,
    },
    /// Show model info
    Info,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle shell completion generation
    if let Some(shell) = cli.completion {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "arspell", &mut io::stdout());
        return Ok(());
    }

    init_tracing(cli.verbose);

    if cli.no_color {
        colored::control::set_override(false);
    }
    let colored = !cli.no_color;

    // Load configuration
    let config = Config::load(Overrides {
        model_path: cli.model.clone(),
        vocab_path: cli.vocab.clone(),
        threshold: cli.threshold,
        top_k: cli.top_k,
        device: cli.device.clone(),
    })?;

    // Handle subcommands
    if let Some(command) = cli.command {
        return handle_command(command, &config, colored);
    }

    let corrector = load_corrector(&config)?;

    if let Some(text) = &cli.text {
        let report = corrector.correct(text)?;
        print_report(&report, !cli.quiet, colored, &cli.format);
        return Ok(());
    }

    if cli.files.is_empty() {
        if io::stdin().is_terminal() {
            anyhow::bail!("No files specified. Use --help for usage information.");
        }
        return correct_stdin(&corrector, &cli.format);
    }

    // Process files
    let mut total_errors = 0;
    let mut total_fixed = 0;

    for file_path in &cli.files {
        if !file_path.exists() {
            eprintln!("Error: File not found: {}", file_path.display());
            continue;
        }

        let result = if cli.fix {
            if cli.interactive {
                corrector.fix_interactive(file_path, colored)?
            } else {
                corrector.fix_auto(file_path)?
            }
        } else {
            corrector.check_file(file_path, colored, &cli.format)?
        };

        total_errors += result.error_count;
        total_fixed += result.fixed_count;
    }

    // Print summary
    if matches!(cli.format, OutputFormat::Text) {
        if cli.fix {
            cli::output::print_fix_summary(total_fixed, &cli.files, colored);
        } else {
            cli::output::print_check_summary(total_errors, &cli.files, colored);
        }
    }

    // Exit with appropriate code
    if total_errors > 0 && !cli.no_fail && !cli.fix {
        std::process::exit(1);
    }

    Ok(())
}

fn load_corrector(config: &Config) -> Result<Corrector<BertMaskedLm>> {
    let vocab = Vocabulary::load_or_empty(config.vocab_file()?)?;

    let model_dir = config.model_dir()?;
    let model = BertMaskedLm::load(model_dir, &config.device)
        .with_context(|| format!("Failed to load model from {}", model_dir.display()))?;

    Ok(Corrector::new(vocab, model, CorrectorOptions::from_config(config)?))
}

/// Filter mode: correct stdin line by line
fn correct_stdin(corrector: &Corrector<BertMaskedLm>, format: &OutputFormat) -> Result<()> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read stdin")?;

    let reports = corrector.correct_lines(&input)?;

    match format {
        OutputFormat::Json => {
            let json: Vec<JsonReport> = reports.iter().map(JsonReport::from).collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            for report in &reports {
                println!("{}", report.corrected);
            }
        }
    }

    Ok(())
}

fn handle_command(command: Commands, config: &Config, colored: bool) -> Result<()> {
    match command {
        Commands::Vocab { action } => match action {
            VocabCommands::Build {
                corpus,
                min_freq,
                output,
                text_field,
                raw,
            } => {
                let output = match output {
                    Some(path) => path,
                    None => config.vocab_file()?.to_path_buf(),
                };
                let options = BuildOptions {
                    corpus: corpus::CorpusOptions {
                        text_field: text_field.unwrap_or_else(|| config.text_field.clone()),
                    },
                    normalize: config.normalize_corpus && !raw,
                };
                manager::build_vocabulary(
                    &corpus,
                    &output,
                    min_freq.unwrap_or(config.min_freq),
                    &options,
                )?;
            }
            VocabCommands::Info { path, top } => {
                let path = match path {
                    Some(path) => path,
                    None => config.vocab_file()?.to_path_buf(),
                };
                manager::show_info(&path, top)?;
            }
            VocabCommands::Lookup { words } => {
                manager::lookup(config.vocab_file()?, &words)?;
            }
        },
        Commands::Model { action } => match action {
            ModelCommands::Download { repo, revision } => {
                download::download_model(&repo, &revision, config.model_dir()?)?;
            }
            ModelCommands::Info => {
                show_model_info(config)?;
            }
        },
        Commands::Session => {
            let corrector = load_corrector(config)?;
            cli::session::run(&corrector, colored)?;
        }
    }
    Ok(())
}

fn show_model_info(config: &Config) -> Result<()> {
    let dir = config.model_dir()?;
    let summary = BertMaskedLm::read_summary(dir)
        .with_context(|| format!("No model found in {}", dir.display()))?;

    println!("Model: {}", dir.display());
    println!("  Type: {}", summary.model_type.as_deref().unwrap_or("bert"));
    println!("  Vocabulary size: {}", summary.vocab_size);
    println!("  Hidden size: {}", summary.hidden_size);
    println!("  Layers: {}", summary.num_hidden_layers);
    println!("  Attention heads: {}", summary.num_attention_heads);
    println!("  Max positions: {}", summary.max_position_embeddings);
    println!("  Device: {}", config.device);

    Ok(())
}
