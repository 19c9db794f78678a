//! # Boundary Tests
//!
//! Runs `boundary-check` over this workspace with the root `boundary.toml`,
//! then over a copy of the domain files with violations seeded in.

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use boundary_check::{check, BoundaryConfig, Rule};
    use shared_types::Domain;

    fn workspace_root() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .expect("tests crate lives in the workspace")
            .to_path_buf()
    }

    fn read(relative: &str) -> String {
        std::fs::read_to_string(workspace_root().join(relative)).unwrap()
    }

    #[test]
    fn test_workspace_respects_boundaries() {
        let config = BoundaryConfig::load(&workspace_root().join("boundary.toml")).unwrap();
        let report = check(&config).unwrap();

        assert!(report.is_clean(), "{}", report.to_text());
        assert!(report.unresolved.is_empty(), "{}", report.to_text());
        assert_eq!(report.domain_files, 3);
        assert!(report.constants >= 6);
    }

    #[test]
    fn test_seeded_violations_are_found() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("shared")).unwrap();
        std::fs::create_dir_all(root.join("domains")).unwrap();

        std::fs::write(
            root.join("shared/topics.rs"),
            read("crates/shared-types/src/topics.rs"),
        )
        .unwrap();
        for name in ["ingestion", "decision", "presentation"] {
            std::fs::write(
                root.join(format!("domains/{name}.rs")),
                read(&format!("crates/conduit-runtime/src/domains/{name}.rs")),
            )
            .unwrap();
        }

        // Decision reaches into presentation and speaks for it.
        let decision = read("crates/conduit-runtime/src/domains/decision.rs").replacen(
            "use crate::adapters::{DomainBus, DomainBusError};",
            "use crate::adapters::{DomainBus, DomainBusError};\n\
             use crate::domains::presentation::PlaybackMonitor;\n\
             fn speak(bus: &DomainBus) { bus.emit(PRESENTATION_INTENT_READY, payload, \"responder\"); }",
            1,
        );
        std::fs::write(root.join("domains/decision.rs"), decision).unwrap();

        std::fs::write(
            root.join("boundary.toml"),
            r#"
scan = ["shared"]

[domains]
ingestion = ["domains/ingestion.rs"]
decision = ["domains/decision.rs"]
presentation = ["domains/presentation.rs"]
"#,
        )
        .unwrap();

        let config = BoundaryConfig::load(&root.join("boundary.toml")).unwrap();
        let report = check(&config).unwrap();

        let found: Vec<(Rule, Domain, Option<&str>)> = report
            .violations
            .iter()
            .map(|v| (v.rule, v.domain, v.topic.as_deref()))
            .collect();
        assert_eq!(
            found,
            vec![
                (Rule::DirectDependency, Domain::Decision, None),
                (Rule::Publish, Domain::Decision, Some("presentation.intent.ready")),
            ]
        );
        assert!(report
            .violations
            .iter()
            .all(|v| v.file == Path::new("domains/decision.rs")));
    }
}
