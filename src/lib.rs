pub mod checker;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod mlm;
pub mod text;
pub mod vocab;

pub use checker::{Correction, CorrectionReport, Corrector, CorrectorOptions};
pub use config::Config;
pub use mlm::{BertMaskedLm, MaskedLm};
pub use vocab::Vocabulary;

#[derive(Debug, Clone, Default)]
pub struct CheckResult {
    pub error_count: usize,
    pub fixed_count: usize,
    pub errors: Vec<SpellError>,
}

#[derive(Debug, Clone)]
pub struct SpellError {
    pub word: String,
    pub line: usize,
    /// 1-based position of the word in its line
    pub column: usize,
    pub context: String,
    pub replacement: String,
    pub suggestions: Vec<String>,
}

impl CheckResult {
    /// Collect the corrections of per-line reports, numbering lines from 1
    pub fn from_reports(reports: &[CorrectionReport]) -> Self {
        let errors: Vec<SpellError> = reports
            .iter()
            .enumerate()
            .flat_map(|(i, report)| {
                report.corrections.iter().map(move |c| SpellError {
                    word: c.original.clone(),
                    line: i + 1,
                    column: c.index + 1,
                    context: report.normalized.clone(),
                    replacement: c.replacement.clone(),
                    suggestions: c.candidates.clone(),
                })
            })
            .collect();

        Self {
            error_count: errors.len(),
            fixed_count: 0,
            errors,
        }
    }
}
