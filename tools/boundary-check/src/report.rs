//! Check results and their text / JSON renderings.

use std::fmt::Write as _;

use serde::Serialize;

use crate::errors::CheckError;
use crate::rules::{Rule, Unresolved, Violation};

#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub files_scanned: usize,
    pub domain_files: usize,
    pub constants: usize,
    pub violations: Vec<Violation>,
    pub unresolved: Vec<Unresolved>,
}

impl Report {
    /// No violations. Unresolved constants are warnings only.
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn to_json(&self) -> Result<String, CheckError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();

        for v in &self.violations {
            let _ = writeln!(
                out,
                "{}:{}: [{}] {}",
                v.file.display(),
                v.line,
                rule_label(v.rule),
                v.message
            );
        }
        for u in &self.unresolved {
            let _ = writeln!(
                out,
                "{}:{}: warning: cannot resolve topic constant {} ({})",
                u.file.display(),
                u.line,
                u.identifier,
                u.domain
            );
        }

        let _ = writeln!(
            out,
            "Scanned {} files ({} domain files, {} constants): {} violation(s), {} unresolved",
            self.files_scanned,
            self.domain_files,
            self.constants,
            self.violations.len(),
            self.unresolved.len()
        );
        out
    }
}

fn rule_label(rule: Rule) -> &'static str {
    match rule {
        Rule::DirectDependency => "direct-dependency",
        Rule::Publish => "publish",
        Rule::Subscribe => "subscribe",
    }
}
