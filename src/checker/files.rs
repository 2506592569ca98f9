use super::Corrector;
use crate::cli::output::{print_errors, prompt_correction, Choice, OutputFormat};
use crate::mlm::MaskedLm;
use crate::CheckResult;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

impl<M: MaskedLm> Corrector<M> {
    /// Report misspellings in a file without touching it
    pub fn check_file(
        &self,
        file_path: &Path,
        colored: bool,
        format: &OutputFormat,
    ) -> Result<CheckResult> {
        let content = fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read file: {}", file_path.display()))?;

        let reports = self.correct_lines(&content)?;
        let result = CheckResult::from_reports(&reports);

        print_errors(file_path, &result, colored, format);

        Ok(result)
    }

    /// Rewrite a file with every top replacement applied
    pub fn fix_auto(&self, file_path: &Path) -> Result<CheckResult> {
        let content = fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read file: {}", file_path.display()))?;

        let reports = self.correct_lines(&content)?;
        let fixed_count = reports.iter().map(|r| r.corrections.len()).sum();

        if fixed_count > 0 {
            let mut new_content = String::with_capacity(content.len());
            for (raw, report) in content.split_inclusive('\n').zip(&reports) {
                let (line, ending) = split_line_ending(raw);
                new_content.push_str(&report.apply_to(line, |c| Some(c.replacement.clone())));
                new_content.push_str(ending);
            }
            write_content(file_path, &new_content)?;
            info!(file = %file_path.display(), fixed_count, "applied corrections");
        }

        Ok(CheckResult {
            error_count: 0,
            fixed_count,
            errors: Vec::new(),
        })
    }

    /// Ask for every misspelling which replacement to apply
    pub fn fix_interactive(&self, file_path: &Path, colored: bool) -> Result<CheckResult> {
        let content = fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read file: {}", file_path.display()))?;

        let reports = self.correct_lines(&content)?;
        let mut fixed_count = 0;
        let mut quit = false;
        let mut new_content = String::with_capacity(content.len());

        for (line_num, (raw, report)) in content.split_inclusive('\n').zip(&reports).enumerate() {
            let (line, ending) = split_line_ending(raw);

            let mut chosen = Vec::with_capacity(report.corrections.len());
            for correction in &report.corrections {
                if quit {
                    chosen.push(None);
                    continue;
                }
                match prompt_correction(correction, &report.normalized, line_num + 1, colored)? {
                    Choice::Replace(word) => {
                        fixed_count += 1;
                        chosen.push(Some(word));
                    }
                    Choice::Keep => chosen.push(None),
                    Choice::Quit => {
                        quit = true;
                        chosen.push(None);
                    }
                }
            }

            let mut chosen = chosen.into_iter();
            new_content.push_str(&report.apply_to(line, |_| chosen.next().flatten()));
            new_content.push_str(ending);
        }

        if fixed_count > 0 {
            write_content(file_path, &new_content)?;
        }

        Ok(CheckResult {
            error_count: 0,
            fixed_count,
            errors: Vec::new(),
        })
    }
}

/// Split a raw line into its text and its `\n` or `\r\n` terminator
fn split_line_ending(raw: &str) -> (&str, &str) {
    if let Some(line) = raw.strip_suffix("\r\n") {
        (line, &raw[line.len()..])
    } else if let Some(line) = raw.strip_suffix('\n') {
        (line, &raw[line.len()..])
    } else {
        (raw, "")
    }
}

fn write_content(file_path: &Path, content: &str) -> Result<()> {
    fs::write(file_path, content)
        .with_context(|| format!("Failed to write file: {}", file_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::CorrectorOptions;
    use crate::mlm::TableMaskedLm;
    use crate::vocab::Vocabulary;
    use tempfile::tempdir;

    fn corrector() -> Corrector<TableMaskedLm> {
        let model = TableMaskedLm::new("[MASK]", ["[MASK]", "x", "y", "ab", "1", "البيت"])
            .with_prediction("ذهب [MASK]", &[("البيت", 0.9)]);
        let vocab = Vocabulary::from_counts(vec![("ذهب", 4), ("الولد", 4)]).unwrap();
        Corrector::new(vocab, model, CorrectorOptions::default())
    }

    #[test]
    fn test_check_file_reports_line_and_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("input.txt");
        fs::write(&path, "ذهب الولد\nذهب البيتت\n").unwrap();

        let result = corrector()
            .check_file(&path, false, &OutputFormat::Json)
            .unwrap();

        assert_eq!(result.error_count, 1);
        let error = &result.errors[0];
        assert_eq!(error.word, "البيتت");
        assert_eq!(error.line, 2);
        assert_eq!(error.column, 2);
        assert_eq!(error.replacement, "البيت");

        // checking never rewrites the file
        assert_eq!(fs::read_to_string(&path).unwrap(), "ذهب الولد\nذهب البيتت\n");
    }

    #[test]
    fn test_fix_auto_rewrites_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("input.txt");
        fs::write(&path, "ذهب  الولد\nذهب البيتت\n").unwrap();

        let result = corrector().fix_auto(&path).unwrap();
        assert_eq!(result.fixed_count, 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "ذهب  الولد\nذهب البيت\n");
    }

    #[test]
    fn test_fix_auto_keeps_non_arabic_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(
            &path,
            "Title: My notes 🙂\nذهب الولد (see ref)\r\nذهب البيتت, done\r\nend",
        )
        .unwrap();

        let result = corrector().fix_auto(&path).unwrap();
        assert_eq!(result.fixed_count, 1);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Title: My notes 🙂\nذهب الولد (see ref)\r\nذهب البيت done\r\nend"
        );
    }

    #[test]
    fn test_split_line_ending() {
        assert_eq!(split_line_ending("abc\r\n"), ("abc", "\r\n"));
        assert_eq!(split_line_ending("abc\n"), ("abc", "\n"));
        assert_eq!(split_line_ending("abc"), ("abc", ""));
    }

    #[test]
    fn test_fix_auto_leaves_clean_file_alone() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clean.txt");
        fs::write(&path, "ذهب الولد hello").unwrap();

        let result = corrector().fix_auto(&path).unwrap();
        assert_eq!(result.fixed_count, 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), "ذهب الولد hello");
    }
}
