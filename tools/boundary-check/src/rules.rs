//! # Flow Rules
//!
//! Applies [`FlowPolicy`] to what the scanner found in one domain file.

use std::path::{Path, PathBuf};

use serde::Serialize;
use shared_types::{Domain, FlowPolicy};

use crate::scanner::{Access, ConstantTable, Scanner, TopicRef};

/// Which rule a finding breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    DirectDependency,
    Publish,
    Subscribe,
}

/// A broken flow rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub rule: Rule,
    pub domain: Domain,
    pub file: PathBuf,
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub message: String,
}

/// A topic constant that could not be resolved to a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unresolved {
    pub access: Access,
    pub domain: Domain,
    pub file: PathBuf,
    pub line: usize,
    pub identifier: String,
}

/// Findings for one file.
#[derive(Debug, Default)]
pub struct FileFindings {
    pub violations: Vec<Violation>,
    pub unresolved: Vec<Unresolved>,
}

/// Check one production source file owned by `domain`.
pub fn check_file(
    scanner: &Scanner,
    constants: &ConstantTable,
    domain: Domain,
    file: &Path,
    source: &str,
) -> FileFindings {
    let mut findings = FileFindings::default();

    for reference in scanner.domain_references(source) {
        if let Err(violation) = FlowPolicy::check_reference(domain, reference.to) {
            findings.violations.push(Violation {
                rule: Rule::DirectDependency,
                domain,
                file: file.to_path_buf(),
                line: reference.line,
                topic: None,
                message: violation.to_string(),
            });
        }
    }

    for topic_use in scanner.topic_uses(source) {
        let Some(topic) = topic_use.target.resolve(constants) else {
            if let TopicRef::Constant(identifier) = topic_use.target {
                findings.unresolved.push(Unresolved {
                    access: topic_use.access,
                    domain,
                    file: file.to_path_buf(),
                    line: topic_use.line,
                    identifier,
                });
            }
            continue;
        };

        let (rule, verdict) = match topic_use.access {
            Access::Publish => (Rule::Publish, FlowPolicy::check_publish(domain, &topic)),
            Access::Subscribe => (Rule::Subscribe, FlowPolicy::check_subscribe(domain, &topic)),
        };
        if let Err(violation) = verdict {
            findings.violations.push(Violation {
                rule,
                domain,
                file: file.to_path_buf(),
                line: topic_use.line,
                topic: Some(topic),
                message: violation.to_string(),
            });
        }
    }

    findings.violations.sort_by_key(|v| v.line);
    findings
}
