//! Interactive correction session.
//!
//! Each line typed is corrected and answered with the corrected text and
//! the correction log. `:clear` wipes the screen and `:quit` (or end of
//! input) leaves the session.

use super::output::report_details;
use crate::checker::Corrector;
use crate::mlm::MaskedLm;
use anyhow::Result;
use colored::*;
use console::Term;
use std::io::{self, BufRead, Write};

pub const EMPTY_INPUT_MESSAGE: &str = "Please enter some Arabic text to correct.";

#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    Corrected {
        corrected: String,
        details: Vec<String>,
    },
    Empty,
    Clear,
    Quit,
    Failed(String),
}

/// Decide what one line of user input does
pub fn handle_input<M: MaskedLm>(corrector: &Corrector<M>, input: &str) -> SessionAction {
    let input = input.trim();

    match input {
        "" => SessionAction::Empty,
        ":clear" | ":c" => SessionAction::Clear,
        ":quit" | ":q" | ":exit" => SessionAction::Quit,
        text => match corrector.correct(text) {
            Ok(report) => SessionAction::Corrected {
                details: report_details(&report),
                corrected: report.corrected,
            },
            Err(e) => SessionAction::Failed(format!("{:#}", e)),
        },
    }
}

pub fn run<M: MaskedLm>(corrector: &Corrector<M>, colored: bool) -> Result<()> {
    let term = Term::stdout();
    print_banner(corrector, colored);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("{} ", if colored { "›".cyan().bold().to_string() } else { ">".to_string() });
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let line = line?;

        match handle_input(corrector, &line) {
            SessionAction::Corrected { corrected, details } => {
                if colored {
                    println!("{}", "Corrected text".bold().underline());
                } else {
                    println!("Corrected text");
                }
                println!("  {}", corrected);

                if colored {
                    println!("{}", "Correction details".bold().underline());
                } else {
                    println!("Correction details");
                }
                for detail in details {
                    println!("  {}", detail);
                }
            }
            SessionAction::Empty => println!("{}", EMPTY_INPUT_MESSAGE.yellow()),
            SessionAction::Clear => term.clear_screen()?,
            SessionAction::Quit => break,
            SessionAction::Failed(message) => {
                if colored {
                    eprintln!("{} {}", "Error:".red().bold(), message);
                } else {
                    eprintln!("Error: {}", message);
                }
            }
        }
    }

    Ok(())
}

fn print_banner<M: MaskedLm>(corrector: &Corrector<M>, colored: bool) {
    if colored {
        println!("{}", "Arabic Text Autocorrection".bold());
    } else {
        println!("Arabic Text Autocorrection");
    }
    println!("Type text to correct, :clear to clear the screen, :quit to leave.");

    if corrector.vocabulary().is_empty() {
        println!(
            "{}",
            "Warning: vocabulary is empty, every word will be scored by the model.".yellow()
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::CorrectorOptions;
    use crate::cli::output::NO_ERRORS_MESSAGE;
    use crate::mlm::TableMaskedLm;
    use crate::vocab::Vocabulary;

    fn corrector() -> Corrector<TableMaskedLm> {
        let model = TableMaskedLm::new("[MASK]", ["[MASK]", "x", "y", "ab", "1", "قلم"])
            .with_prediction("اشتريت [MASK]", &[("قلم", 0.8)]);
        let vocab = Vocabulary::from_counts(vec![("اشتريت", 3)]).unwrap();
        Corrector::new(vocab, model, CorrectorOptions::default())
    }

    #[test]
    fn test_commands() {
        let c = corrector();
        assert_eq!(handle_input(&c, "   "), SessionAction::Empty);
        assert_eq!(handle_input(&c, ":clear"), SessionAction::Clear);
        assert_eq!(handle_input(&c, ":q"), SessionAction::Quit);
    }

    #[test]
    fn test_clean_input() {
        let c = corrector();
        assert_eq!(
            handle_input(&c, "اشتريت"),
            SessionAction::Corrected {
                corrected: "اشتريت".to_string(),
                details: vec![NO_ERRORS_MESSAGE.to_string()],
            }
        );
    }

    #[test]
    fn test_correction_details() {
        let c = corrector();
        match handle_input(&c, "اشتريت قلمم") {
            SessionAction::Corrected { corrected, details } => {
                assert_eq!(corrected, "اشتريت قلم");
                assert_eq!(details[1], " - قلمم ➤ قلم");
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }
}
