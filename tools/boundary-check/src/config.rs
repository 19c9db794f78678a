//! # Boundary Configuration
//!
//! ```toml
//! # Relative to the directory holding this file.
//! root = "."
//!
//! # Trees scanned for topic constants. Domain files are always scanned.
//! scan = ["crates/shared-types/src", "crates/conduit-runtime/src"]
//!
//! # Gitignore-style patterns skipped while walking.
//! exclude = ["target/"]
//!
//! [domains]
//! ingestion = ["crates/conduit-runtime/src/domains/ingestion.rs"]
//! decision = ["crates/conduit-runtime/src/domains/decision.rs"]
//! presentation = ["crates/conduit-runtime/src/domains/presentation.rs"]
//! ```
//!
//! A path may name a file or a directory. A file belongs to the domain whose
//! path is the longest prefix of its own; files matching no domain path are
//! shared infrastructure and are not checked.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use shared_types::Domain;

use crate::errors::CheckError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    root: Option<PathBuf>,
    scan: Vec<PathBuf>,
    exclude: Vec<String>,
    domains: BTreeMap<String, Vec<PathBuf>>,
}

/// Validated boundary configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryConfig {
    /// Absolute or config-relative root every other path is relative to.
    pub root: PathBuf,
    /// Extra trees scanned for topic constants.
    pub scan: Vec<PathBuf>,
    /// Gitignore-style patterns, relative to `root`, skipped while walking.
    pub exclude: Vec<String>,
    /// `(path, domain)` pairs, longest path first.
    mappings: Vec<(PathBuf, Domain)>,
}

impl BoundaryConfig {
    /// Load and validate a configuration file.
    ///
    /// # Errors
    ///
    /// `CheckError::Io`, `CheckError::Parse` or `CheckError::InvalidConfig`.
    pub fn load(path: &Path) -> Result<Self, CheckError> {
        let text = std::fs::read_to_string(path).map_err(|source| CheckError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&text, base).map_err(|e| match e {
            ParseFailure::Toml(source) => CheckError::Parse {
                path: path.to_path_buf(),
                source,
            },
            ParseFailure::Invalid(reason) => CheckError::InvalidConfig(reason),
        })
    }

    /// Parse configuration text. Relative roots are resolved against `base`.
    fn parse(text: &str, base: &Path) -> Result<Self, ParseFailure> {
        let raw: RawConfig = toml::from_str(text).map_err(ParseFailure::Toml)?;

        let root = match raw.root {
            Some(root) if root.is_absolute() => root,
            Some(root) => base.join(root),
            None => base.to_path_buf(),
        };

        if raw.domains.is_empty() {
            return Err(ParseFailure::Invalid("no domains configured".into()));
        }

        let mut mappings = Vec::new();
        for (name, paths) in raw.domains {
            let domain: Domain = name.parse().map_err(ParseFailure::Invalid)?;
            for path in paths {
                if path.is_absolute() {
                    return Err(ParseFailure::Invalid(format!(
                        "domain path must be relative to root: {}",
                        path.display()
                    )));
                }
                if let Some((_, other)) = mappings.iter().find(|(p, _)| p == &path) {
                    return Err(ParseFailure::Invalid(format!(
                        "{} is mapped to both {other} and {domain}",
                        path.display()
                    )));
                }
                mappings.push((path, domain));
            }
        }
        mappings.sort_by_key(|(path, _)| std::cmp::Reverse(path.components().count()));

        Ok(Self {
            root,
            scan: raw.scan,
            exclude: raw.exclude,
            mappings,
        })
    }

    /// The domain owning a root-relative path, if any.
    pub fn domain_of(&self, relative: &Path) -> Option<Domain> {
        self.mappings
            .iter()
            .find(|(prefix, _)| relative.starts_with(prefix))
            .map(|(_, domain)| *domain)
    }

    /// Root-relative paths mapped to domains.
    pub fn domain_paths(&self) -> impl Iterator<Item = &Path> {
        self.mappings.iter().map(|(path, _)| path.as_path())
    }
}

enum ParseFailure {
    Toml(toml::de::Error),
    Invalid(String),
}
