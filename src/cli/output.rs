use crate::checker::{Correction, CorrectionReport};
use crate::CheckResult;
use anyhow::Context;
use colored::*;
use dialoguer::theme::{ColorfulTheme, SimpleTheme, Theme};
use dialoguer::Select;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub const NO_ERRORS_MESSAGE: &str = "✅ لا توجد أخطاء إملائية واضحة.";
pub const CORRECTED_HEADER: &str = "🔍 الكلمات التي تم تصحيحها:";

#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonError {
    file: String,
    line: usize,
    column: usize,
    word: String,
    replacement: String,
    suggestions: Vec<String>,
    context: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonOutput {
    files_checked: usize,
    total_errors: usize,
    errors: Vec<JsonError>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct JsonCorrection {
    pub index: usize,
    pub original: String,
    pub replacement: String,
    pub candidates: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct JsonReport {
    pub normalized: String,
    pub corrected: String,
    pub corrections: Vec<JsonCorrection>,
}

impl From<&CorrectionReport> for JsonReport {
    fn from(report: &CorrectionReport) -> Self {
        Self {
            normalized: report.normalized.clone(),
            corrected: report.corrected.clone(),
            corrections: report
                .corrections
                .iter()
                .map(|c| JsonCorrection {
                    index: c.index,
                    original: c.original.clone(),
                    replacement: c.replacement.clone(),
                    candidates: c.candidates.clone(),
                })
                .collect(),
        }
    }
}

pub fn print_errors(
    file_path: &Path,
    result: &CheckResult,
    colored_output: bool,
    format: &OutputFormat,
) {
    match format {
        OutputFormat::Text => print_text_errors(file_path, result, colored_output),
        OutputFormat::Json => print_json_errors(file_path, result),
    }
}

fn print_text_errors(file_path: &Path, result: &CheckResult, colored_output: bool) {
    if result.errors.is_empty() {
        return;
    }

    let file_name = file_path.display().to_string();

    if colored_output {
        println!("\n{}", file_name.bold().underline());
    } else {
        println!("\n{}", file_name);
    }

    for error in &result.errors {
        let line_info = format!("{}:{}", error.line, error.column);

        if colored_output {
            println!(
                "  {} {} {}",
                line_info.blue().bold(),
                error.word.red().bold(),
                format_context(&error.context, &error.word, colored_output)
            );
            println!("    {} {}", "➤".dimmed(), error.replacement.green().bold());

            if error.suggestions.len() > 1 {
                let others = error.suggestions[1..]
                    .iter()
                    .map(|s| s.green().to_string())
                    .collect::<Vec<_>>()
                    .join(&", ".dimmed().to_string());
                println!("    {} {}", "also:".dimmed(), others);
            }
        } else {
            println!("  {} {} {}", line_info, error.word, &error.context);
            println!("    ➤ {}", error.replacement);

            if error.suggestions.len() > 1 {
                println!("    also: {}", error.suggestions[1..].join(", "));
            }
        }
    }
}

fn print_json_errors(file_path: &Path, result: &CheckResult) {
    let json_errors: Vec<JsonError> = result
        .errors
        .iter()
        .map(|e| JsonError {
            file: file_path.display().to_string(),
            line: e.line,
            column: e.column,
            word: e.word.clone(),
            replacement: e.replacement.clone(),
            suggestions: e.suggestions.clone(),
            context: e.context.clone(),
        })
        .collect();

    let output = JsonOutput {
        files_checked: 1,
        total_errors: result.error_count,
        errors: json_errors,
    };

    match serde_json::to_string_pretty(&output) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error: failed to serialize results: {}", e),
    }
}

fn format_context(context: &str, word: &str, colored: bool) -> String {
    if colored {
        context.replacen(word, &word.red().bold().to_string(), 1)
    } else {
        context.to_string()
    }
}

/// The correction log: a no-errors message, or one `original ➤ replacement` line per word
pub fn report_details(report: &CorrectionReport) -> Vec<String> {
    if report.is_clean() {
        return vec![NO_ERRORS_MESSAGE.to_string()];
    }

    let mut lines = vec![CORRECTED_HEADER.to_string()];
    for correction in &report.corrections {
        lines.push(format!(
            " - {} ➤ {}",
            correction.original, correction.replacement
        ));
    }
    lines
}

/// Print the corrected sentence, with the correction log when `verbose`
pub fn print_report(report: &CorrectionReport, verbose: bool, colored: bool, format: &OutputFormat) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(&JsonReport::from(report)) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error: failed to serialize report: {}", e),
        },
        OutputFormat::Text => {
            if verbose {
                for line in report_details(report) {
                    if colored && line.starts_with(" - ") {
                        println!("{}", line.yellow());
                    } else {
                        println!("{}", line);
                    }
                }
            }
            if colored && verbose {
                println!("{} {}", "Corrected text:".bold(), report.corrected);
            } else if verbose {
                println!("Corrected text: {}", report.corrected);
            } else {
                println!("{}", report.corrected);
            }
        }
    }
}

pub fn print_check_summary(total_errors: usize, files: &[impl AsRef<Path>], colored: bool) {
    println!();
    if total_errors == 0 {
        if colored {
            println!("{}", "✓ No spelling errors found!".green().bold());
        } else {
            println!("✓ No spelling errors found!");
        }
    } else {
        let error_word = if total_errors == 1 { "error" } else { "errors" };
        if colored {
            println!(
                "{} {} {} found in {} {}",
                "✗".red().bold(),
                total_errors.to_string().red().bold(),
                error_word,
                files.len(),
                if files.len() == 1 { "file" } else { "files" }
            );
        } else {
            println!(
                "✗ {} {} found in {} {}",
                total_errors,
                error_word,
                files.len(),
                if files.len() == 1 { "file" } else { "files" }
            );
        }
    }
}

pub fn print_fix_summary(total_fixed: usize, files: &[impl AsRef<Path>], colored: bool) {
    println!();
    if total_fixed == 0 {
        if colored {
            println!("{}", "No corrections needed!".green().bold());
        } else {
            println!("No corrections needed!");
        }
    } else {
        let fix_word = if total_fixed == 1 { "correction" } else { "corrections" };
        if colored {
            println!(
                "{} {} {} applied to {} {}",
                "✓".green().bold(),
                total_fixed.to_string().green().bold(),
                fix_word,
                files.len(),
                if files.len() == 1 { "file" } else { "files" }
            );
        } else {
            println!(
                "✓ {} {} applied to {} {}",
                total_fixed,
                fix_word,
                files.len(),
                if files.len() == 1 { "file" } else { "files" }
            );
        }
    }
}

/// What the user picked for one misspelling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    Replace(String),
    Keep,
    Quit,
}

/// Menu entries for a correction: candidates (or the fallback), keep, quit
pub fn choice_items(correction: &Correction) -> Vec<String> {
    let mut items: Vec<String> = if correction.candidates.is_empty() {
        vec![correction.replacement.clone()]
    } else {
        correction.candidates.iter().take(9).cloned().collect()
    };
    items.push(format!("Keep \"{}\"", correction.original));
    items.push("Quit".to_string());
    items
}

/// Turn the outcome of the menu into a choice, failing when the prompt could not be shown
pub fn choice_from_selection<E>(
    correction: &Correction,
    selection: Result<Option<usize>, E>,
) -> anyhow::Result<Choice>
where
    E: std::error::Error + Send + Sync + 'static,
{
    let selected = selection.context("Failed to read the selected correction")?;
    Ok(choice_from_index(correction, selected))
}

/// Map a menu selection back to a choice
pub fn choice_from_index(correction: &Correction, selected: Option<usize>) -> Choice {
    let items = choice_items(correction);
    let replacements = items.len() - 2;

    match selected {
        Some(i) if i < replacements => Choice::Replace(
            correction
                .candidates
                .get(i)
                .cloned()
                .unwrap_or_else(|| correction.replacement.clone()),
        ),
        Some(i) if i == items.len() - 1 => Choice::Quit,
        _ => Choice::Keep,
    }
}

pub fn prompt_correction(
    correction: &Correction,
    context: &str,
    line: usize,
    colored: bool,
) -> anyhow::Result<Choice> {
    if colored {
        println!(
            "\n{} {}:{}",
            "Misspelling found:".yellow().bold(),
            line.to_string().blue(),
            (correction.index + 1).to_string().blue()
        );
        println!("  {}", format_context(context, &correction.original, colored));
    } else {
        println!("\nMisspelling found: {}:{}", line, correction.index + 1);
        println!("  {}", context);
    }

    let colorful = ColorfulTheme::default();
    let theme: &dyn Theme = if colored { &colorful } else { &SimpleTheme };

    let selected = Select::with_theme(theme)
        .with_prompt(format!("Replace \"{}\" with", correction.original))
        .items(&choice_items(correction))
        .default(0)
        .interact_opt();

    choice_from_selection(correction, selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn correction() -> Correction {
        Correction {
            index: 1,
            original: "المدرسه".to_string(),
            replacement: "المدرسة".to_string(),
            candidates: vec!["المدرسة".to_string(), "البيت".to_string()],
        }
    }

    #[test]
    fn test_output_format_parsing() {
        assert!(matches!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json)));
        assert!("xml".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Text.to_string(), "text");
    }

    #[test]
    fn test_report_details() {
        let clean = CorrectionReport {
            normalized: "ذهب".to_string(),
            corrected: "ذهب".to_string(),
            corrections: Vec::new(),
        };
        assert_eq!(report_details(&clean), vec![NO_ERRORS_MESSAGE]);

        let report = CorrectionReport {
            normalized: "الى المدرسه".to_string(),
            corrected: "الى المدرسة".to_string(),
            corrections: vec![correction()],
        };
        assert_eq!(
            report_details(&report),
            vec![CORRECTED_HEADER.to_string(), " - المدرسه ➤ المدرسة".to_string()]
        );
    }

    #[test]
    fn test_choice_mapping() {
        let c = correction();
        assert_eq!(choice_items(&c).len(), 4);
        assert_eq!(choice_from_index(&c, Some(1)), Choice::Replace("البيت".to_string()));
        assert_eq!(choice_from_index(&c, Some(2)), Choice::Keep);
        assert_eq!(choice_from_index(&c, Some(3)), Choice::Quit);
        assert_eq!(choice_from_index(&c, None), Choice::Keep);
    }

    #[test]
    fn test_prompt_failure_is_an_error() {
        let c = correction();
        let no_tty = std::io::Error::new(std::io::ErrorKind::NotConnected, "not a terminal");
        assert!(choice_from_selection(&c, Err(no_tty)).is_err());
        let kept = choice_from_selection(&c, Ok::<_, std::io::Error>(Some(2))).unwrap();
        assert_eq!(kept, Choice::Keep);
    }

    #[test]
    fn test_choice_without_candidates_offers_fallback() {
        let c = Correction {
            candidates: Vec::new(),
            replacement: "[UNK]".to_string(),
            ..correction()
        };
        assert_eq!(choice_items(&c)[0], "[UNK]");
        assert_eq!(choice_from_index(&c, Some(0)), Choice::Replace("[UNK]".to_string()));
    }

    #[test]
    fn test_json_report() {
        let report = CorrectionReport {
            normalized: "الى المدرسه".to_string(),
            corrected: "الى المدرسة".to_string(),
            corrections: vec![correction()],
        };
        let json = serde_json::to_value(JsonReport::from(&report)).unwrap();
        assert_eq!(json["corrections"][0]["replacement"], "المدرسة");
        assert_eq!(json["corrections"][0]["index"], 1);
    }
}
