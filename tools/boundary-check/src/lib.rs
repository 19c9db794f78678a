//! # Boundary Check
//!
//! Static counterpart of the runtime `DomainBus` checks. Scans the source
//! files mapped to each domain in `boundary.toml` and reports:
//!
//! | Rule | Example |
//! |------|---------|
//! | `direct-dependency` | `use crate::domains::presentation::..` in a decision file |
//! | `publish` | decision code emitting `presentation.speech.start` |
//! | `subscribe` | ingestion code subscribing to `decision.intent.generated` or `*` |
//!
//! Topics passed as local variables cannot be resolved statically and are
//! skipped; the runtime adapter still checks them.

pub mod config;
pub mod errors;
pub mod report;
pub mod rules;
pub mod scanner;

pub use config::BoundaryConfig;
pub use errors::CheckError;
pub use report::Report;
pub use rules::{Rule, Unresolved, Violation};

use scanner::{ConstantTable, Scanner};

/// Run every rule over the configured tree.
pub fn check(config: &BoundaryConfig) -> Result<Report, CheckError> {
    let scanner = Scanner::new()?;

    let mut paths = config.scan.clone();
    paths.extend(config.domain_paths().map(|p| p.to_path_buf()));
    let files = scanner::rust_files(&config.root, &paths, &config.exclude)?;

    let mut sources = Vec::with_capacity(files.len());
    let mut constants = ConstantTable::default();
    for file in files {
        let full = config.root.join(&file);
        let text = std::fs::read_to_string(&full).map_err(|source| CheckError::Io {
            path: full.clone(),
            source,
        })?;
        let source = scanner::production_source(&text);
        scanner.collect_constants(&source, &mut constants);
        sources.push((file, source));
    }

    let mut report = Report {
        files_scanned: sources.len(),
        constants: constants.len(),
        ..Report::default()
    };
    for (file, source) in &sources {
        let Some(domain) = config.domain_of(file) else {
            continue;
        };
        report.domain_files += 1;
        let findings = rules::check_file(&scanner, &constants, domain, file, source);
        report.violations.extend(findings.violations);
        report.unresolved.extend(findings.unresolved);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const CONFIG: &str = r#"
scan = ["shared"]

[domains]
ingestion = ["app/ingestion.rs"]
decision = ["app/decision"]
presentation = ["app/presentation.rs"]
"#;

    fn write(root: &Path, file: &str, text: &str) {
        let path = root.join(file);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, text).unwrap();
    }

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "boundary.toml", CONFIG);
        write(
            root,
            "shared/topics.rs",
            r#"
pub const INGESTION_MESSAGE_READY: &str = "ingestion.message.ready";
pub const DECISION_INTENT_GENERATED: &str = "decision.intent.generated";
"#,
        );
        write(
            root,
            "app/ingestion.rs",
            "fn submit(bus: &DomainBus) {\n    bus.emit(INGESTION_MESSAGE_READY, p, \"chat\");\n}\n",
        );
        write(
            root,
            "app/decision/mod.rs",
            "fn attach(bus: &DomainBus) {\n    bus.subscribe(INGESTION_MESSAGE_READY, h);\n    bus.emit(DECISION_INTENT_GENERATED, p, \"responder\");\n}\n",
        );
        write(
            root,
            "app/presentation.rs",
            "fn attach(bus: &DomainBus) {\n    bus.subscribe(DECISION_INTENT_GENERATED, h);\n}\n",
        );
        dir
    }

    #[test]
    fn test_clean_tree() {
        let dir = tree();
        let config = BoundaryConfig::load(&dir.path().join("boundary.toml")).unwrap();
        let report = check(&config).unwrap();

        assert!(report.is_clean(), "{}", report.to_text());
        assert_eq!(report.files_scanned, 4);
        assert_eq!(report.domain_files, 3);
        assert_eq!(report.constants, 2);
    }

    #[test]
    fn test_violating_tree() {
        let dir = tree();
        write(
            dir.path(),
            "app/ingestion.rs",
            "use crate::domains::decision::Responder;\n\nfn listen(bus: &DomainBus) {\n    bus.subscribe(DECISION_INTENT_GENERATED, h);\n}\n",
        );
        let config = BoundaryConfig::load(&dir.path().join("boundary.toml")).unwrap();
        let report = check(&config).unwrap();

        let found: Vec<(Rule, usize)> = report.violations.iter().map(|v| (v.rule, v.line)).collect();
        assert_eq!(found, vec![(Rule::DirectDependency, 1), (Rule::Subscribe, 4)]);
        assert!(report
            .violations
            .iter()
            .all(|v| v.file == Path::new("app/ingestion.rs")));
    }
}
