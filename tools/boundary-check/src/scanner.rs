//! # Source Scanner
//!
//! Finds, in production Rust source:
//!
//! - string constants (`const NAME: &str = "..."`) used to resolve topics
//! - topic publications (`.emit(TOPIC, ..)`) and subscriptions
//!   (`.subscribe(TOPIC, ..)`, `.subscribe_with_priority(TOPIC, ..)`)
//! - references to a domain module (`domains::decision`, `super::presentation`,
//!   `ingestion_domain::..`)
//!
//! Test modules and comment lines are blanked before matching so line
//! numbers stay stable.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::WalkBuilder;
use regex::Regex;
use serde::Serialize;
use shared_types::topics::presentation_topic;
use shared_types::Domain;

use crate::errors::CheckError;

/// How a domain touches a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Publish,
    Subscribe,
}

/// The topic argument of a bus call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicRef {
    /// A string literal.
    Literal(String),
    /// A constant, by path as written (`topics::DECISION_INTENT_GENERATED`).
    Constant(String),
    /// `presentation_topic(device, action)`.
    PresentationFamily,
}

impl TopicRef {
    /// Resolve to a concrete topic string.
    pub fn resolve(&self, constants: &ConstantTable) -> Option<String> {
        match self {
            TopicRef::Literal(topic) => Some(topic.clone()),
            TopicRef::Constant(path) => constants.resolve(path).map(str::to_string),
            TopicRef::PresentationFamily => Some(presentation_topic("<device>", "<action>")),
        }
    }
}

/// One bus call in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicUse {
    pub access: Access,
    pub target: TopicRef,
    pub line: usize,
}

/// A reference to a domain module by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainReference {
    pub to: Domain,
    pub line: usize,
}

/// String constants collected across the scanned tree, keyed by name.
///
/// A name defined twice with different values is ambiguous and never
/// resolves.
#[derive(Debug, Default)]
pub struct ConstantTable {
    values: HashMap<String, Option<String>>,
}

impl ConstantTable {
    pub fn insert(&mut self, name: &str, value: &str) {
        self.values
            .entry(name.to_string())
            .and_modify(|existing| {
                if existing.as_deref() != Some(value) {
                    *existing = None;
                }
            })
            .or_insert_with(|| Some(value.to_string()));
    }

    /// Resolve by the last segment of a path.
    pub fn resolve(&self, path: &str) -> Option<&str> {
        let name = path.rsplit("::").next().unwrap_or(path);
        self.values.get(name).and_then(|v| v.as_deref())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Compiled patterns.
pub struct Scanner {
    constant: Regex,
    publish: Regex,
    subscribe: Regex,
    module_path: Regex,
    module_group: Regex,
    crate_path: Regex,
    domain_word: Regex,
}

impl Scanner {
    pub fn new() -> Result<Self, CheckError> {
        Ok(Self {
            constant: Regex::new(
                r#"\bconst\s+([A-Z][A-Z0-9_]*)\s*:\s*&\s*(?:'static\s+)?str\s*=\s*"([^"]*)""#,
            )?,
            publish: Regex::new(
                r#"\.emit\s*\(\s*(?:"([^"]*)"|&?\s*([A-Za-z_][A-Za-z0-9_]*(?:::[A-Za-z_][A-Za-z0-9_]*)*))"#,
            )?,
            subscribe: Regex::new(
                r#"\.subscribe(?:_with_priority)?\s*\(\s*(?:"([^"]*)"|&?\s*([A-Za-z_][A-Za-z0-9_]*(?:::[A-Za-z_][A-Za-z0-9_]*)*))"#,
            )?,
            module_path: Regex::new(r"\b(?:domains|super)::(ingestion|decision|presentation)\b")?,
            module_group: Regex::new(r"\b(?:domains|super)::\{([^}]*)\}")?,
            crate_path: Regex::new(r"\b(ingestion|decision|presentation)_domain\b")?,
            domain_word: Regex::new(r"\b(ingestion|decision|presentation)\b")?,
        })
    }

    /// Add every string constant in `source` to `table`.
    pub fn collect_constants(&self, source: &str, table: &mut ConstantTable) {
        for caps in self.constant.captures_iter(source) {
            table.insert(&caps[1], &caps[2]);
        }
    }

    /// Every publication and subscription, in source order.
    pub fn topic_uses(&self, source: &str) -> Vec<TopicUse> {
        let mut uses = Vec::new();
        for (access, pattern) in [
            (Access::Publish, &self.publish),
            (Access::Subscribe, &self.subscribe),
        ] {
            for caps in pattern.captures_iter(source) {
                let Some(whole) = caps.get(0) else { continue };
                let target = if let Some(literal) = caps.get(1) {
                    TopicRef::Literal(literal.as_str().to_string())
                } else if let Some(ident) = caps.get(2) {
                    match classify_identifier(ident.as_str()) {
                        Some(target) => target,
                        // Locals and parameters are not statically known.
                        None => continue,
                    }
                } else {
                    continue;
                };
                uses.push(TopicUse {
                    access,
                    target,
                    line: line_of(source, whole.start()),
                });
            }
        }
        uses.sort_by_key(|u| u.line);
        uses
    }

    /// Every reference to a domain module, one per `(line, domain)`.
    pub fn domain_references(&self, source: &str) -> Vec<DomainReference> {
        let mut found = BTreeSet::new();

        for pattern in [&self.module_path, &self.crate_path] {
            for caps in pattern.captures_iter(source) {
                if let (Some(m), Ok(to)) = (caps.get(1), caps[1].parse::<Domain>()) {
                    found.insert((line_of(source, m.start()), to));
                }
            }
        }
        for caps in self.module_group.captures_iter(source) {
            let Some(group) = caps.get(1) else { continue };
            for word in self.domain_word.find_iter(group.as_str()) {
                if let Ok(to) = word.as_str().parse::<Domain>() {
                    found.insert((line_of(source, group.start() + word.start()), to));
                }
            }
        }

        found
            .into_iter()
            .map(|(line, to)| DomainReference { to, line })
            .collect()
    }
}

fn classify_identifier(path: &str) -> Option<TopicRef> {
    let last = path.rsplit("::").next().unwrap_or(path);
    if last == "presentation_topic" {
        return Some(TopicRef::PresentationFamily);
    }
    let is_constant = last.starts_with(|c: char| c.is_ascii_uppercase())
        && last
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
    is_constant.then(|| TopicRef::Constant(path.to_string()))
}

/// 1-based line of a byte offset.
fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].bytes().filter(|b| *b == b'\n').count() + 1
}

/// Production part of a source file: everything from the first
/// `#[cfg(test)]` on is dropped and `//` comment lines are blanked.
pub fn production_source(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("#[cfg(test)]") {
            break;
        }
        if !trimmed.starts_with("//") {
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}

/// Root-relative paths of every `.rs` file under `paths`.
pub fn rust_files(
    root: &Path,
    paths: &[PathBuf],
    exclude: &[String],
) -> Result<Vec<PathBuf>, CheckError> {
    let excluded = exclusions(root, exclude)?;
    let mut files = BTreeSet::new();

    for path in paths {
        let start = root.join(path);
        if !start.exists() {
            return Err(CheckError::InvalidConfig(format!(
                "path does not exist: {}",
                start.display()
            )));
        }
        for entry in WalkBuilder::new(&start).require_git(false).build() {
            let entry = entry?;
            let full = entry.path();
            let is_file = entry.file_type().is_some_and(|t| t.is_file());
            if !is_file || full.extension().and_then(|e| e.to_str()) != Some("rs") {
                continue;
            }
            let Ok(relative) = full.strip_prefix(root) else {
                files.insert(full.to_path_buf());
                continue;
            };
            if excluded
                .matched_path_or_any_parents(relative, false)
                .is_ignore()
            {
                continue;
            }
            files.insert(relative.to_path_buf());
        }
    }

    Ok(files.into_iter().collect())
}

fn exclusions(root: &Path, patterns: &[String]) -> Result<Gitignore, CheckError> {
    let mut builder = GitignoreBuilder::new(root);
    for pattern in patterns {
        builder.add_line(None, pattern)?;
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOMAIN_SOURCE: &str = r#"
use shared_types::topics::{DECISION_INTENT_GENERATED, INGESTION_MESSAGE_READY};
use crate::domains::presentation::PlaybackMonitor;
use super::{ingestion, helpers};

// self.bus.emit("decision.commented.out", payload)
const LOCAL_TOPIC: &str = "decision.local.topic";

async fn run(bus: &DomainBus, topic: &str) {
    bus.subscribe(
        INGESTION_MESSAGE_READY,
        handler,
    );
    bus.emit(topics::DECISION_INTENT_GENERATED, payload, "responder").await;
    bus.emit("presentation.avatar.wave", payload, "responder").await;
    bus.emit(&presentation_topic("subtitle", "show"), payload, "responder").await;
    bus.emit(topic, payload, "responder").await;
    let _ = ingestion_domain::submit;
}

#[cfg(test)]
mod tests {
    fn t() { bus.emit("presentation.test.only", p, "t"); }
}
"#;

    fn uses() -> Vec<TopicUse> {
        let scanner = Scanner::new().unwrap();
        scanner.topic_uses(&production_source(DOMAIN_SOURCE))
    }

    #[test]
    fn test_production_source_preserves_lines() {
        let source = production_source(DOMAIN_SOURCE);
        assert!(!source.contains("commented.out"));
        assert!(!source.contains("test.only"));
        let original: Vec<&str> = DOMAIN_SOURCE.lines().collect();
        let kept: Vec<&str> = source.lines().collect();
        for (i, line) in kept.iter().enumerate() {
            if !line.is_empty() {
                assert_eq!(*line, original[i]);
            }
        }
    }

    #[test]
    fn test_topic_uses() {
        let found = uses();
        assert_eq!(found.len(), 4);

        assert_eq!(found[0].access, Access::Subscribe);
        assert_eq!(
            found[0].target,
            TopicRef::Constant("INGESTION_MESSAGE_READY".into())
        );
        assert_eq!(found[0].line, 10);

        assert_eq!(found[1].access, Access::Publish);
        assert_eq!(
            found[1].target,
            TopicRef::Constant("topics::DECISION_INTENT_GENERATED".into())
        );
        assert_eq!(found[1].line, 14);

        assert_eq!(
            found[2].target,
            TopicRef::Literal("presentation.avatar.wave".into())
        );
        assert_eq!(found[3].target, TopicRef::PresentationFamily);
    }

    #[test]
    fn test_constant_table() {
        let scanner = Scanner::new().unwrap();
        let mut table = ConstantTable::default();
        scanner.collect_constants(&production_source(DOMAIN_SOURCE), &mut table);
        scanner.collect_constants(
            r#"pub const DECISION_INTENT_GENERATED: &'static str = "decision.intent.generated";"#,
            &mut table,
        );

        assert_eq!(table.len(), 2);
        assert_eq!(table.resolve("LOCAL_TOPIC"), Some("decision.local.topic"));
        assert_eq!(
            table.resolve("shared_types::topics::DECISION_INTENT_GENERATED"),
            Some("decision.intent.generated")
        );

        // Same value twice is fine; a different value makes it ambiguous.
        scanner.collect_constants(r#"const LOCAL_TOPIC: &str = "decision.local.topic";"#, &mut table);
        assert!(table.resolve("LOCAL_TOPIC").is_some());
        scanner.collect_constants(r#"const LOCAL_TOPIC: &str = "decision.other";"#, &mut table);
        assert_eq!(table.resolve("LOCAL_TOPIC"), None);

        assert_eq!(
            TopicRef::PresentationFamily.resolve(&table).as_deref(),
            Some("presentation.<device>.<action>")
        );
    }

    #[test]
    fn test_domain_references() {
        let scanner = Scanner::new().unwrap();
        let refs = scanner.domain_references(&production_source(DOMAIN_SOURCE));
        let found: Vec<(usize, Domain)> = refs.iter().map(|r| (r.line, r.to)).collect();
        assert_eq!(
            found,
            vec![
                (3, Domain::Presentation),
                (4, Domain::Ingestion),
                (18, Domain::Ingestion),
            ]
        );
    }

    #[test]
    fn test_rust_files_walks_and_excludes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src/domains")).unwrap();
        std::fs::create_dir_all(root.join("src/generated")).unwrap();
        std::fs::write(root.join("src/lib.rs"), "").unwrap();
        std::fs::write(root.join("src/domains/decision.rs"), "").unwrap();
        std::fs::write(root.join("src/generated/topics.rs"), "").unwrap();
        std::fs::write(root.join("src/README.md"), "").unwrap();

        let files = rust_files(
            root,
            &[PathBuf::from("src"), PathBuf::from("src/domains/decision.rs")],
            &["generated/".to_string()],
        )
        .unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("src/domains/decision.rs"),
                PathBuf::from("src/lib.rs"),
            ]
        );

        assert!(matches!(
            rust_files(root, &[PathBuf::from("missing")], &[]),
            Err(CheckError::InvalidConfig(_))
        ));
    }
}
