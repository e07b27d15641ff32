use std::sync::Arc;

use reqforge_core::fakes::ScriptedEvaluator;
use reqforge_core::{
    read_validation_artifact, write_validation_artifact, Context, CriteriaRegistry, CriterionKind,
    EvaluatorTable, NoopSink, Orchestrator, OrchestratorConfig, ReqforgeError,
};
use tempfile::tempdir;

async fn processed(requirement_id: &str) -> reqforge_core::ValidationResult {
    let evaluator = ScriptedEvaluator::uniform(0.9).with_score(CriterionKind::Clarity, 0.4);
    let orch = Orchestrator::new(
        Arc::new(CriteriaRegistry::builtin()),
        EvaluatorTable::uniform(Arc::new(evaluator)),
        OrchestratorConfig::default(),
    )
    .unwrap();
    orch.process(
        requirement_id,
        "The system shall archive invoices for ten years.",
        Context::new(),
        &NoopSink,
    )
    .await
}

#[tokio::test]
async fn artifact_round_trip_preserves_history() {
    let dir = tempdir().unwrap();
    let result = processed("REQ-100").await;

    let path = write_validation_artifact(&result, dir.path()).unwrap();
    assert!(path.ends_with("REQ-100/validation.json"));
    assert!(dir.path().join("REQ-100/validation.digest").exists());

    let loaded = read_validation_artifact("REQ-100", dir.path()).unwrap();
    assert_eq!(loaded.run_id, result.run_id);
    assert_eq!(loaded.final_text, result.final_text);
    assert_eq!(loaded.passed, result.passed);
    assert_eq!(loaded.total_fixes, 1);
    assert_eq!(loaded.iterations.len(), result.iterations.len());
    assert_eq!(
        loaded.fixes().next().map(|f| f.criterion),
        Some(CriterionKind::Clarity)
    );
}

#[tokio::test]
async fn tampered_artifact_is_rejected() {
    let dir = tempdir().unwrap();
    let result = processed("REQ-101").await;
    let path = write_validation_artifact(&result, dir.path()).unwrap();

    let tampered = std::fs::read_to_string(&path)
        .unwrap()
        .replace("\"passed\": true", "\"passed\": false");
    std::fs::write(&path, tampered).unwrap();

    let err = read_validation_artifact("REQ-101", dir.path()).unwrap_err();
    assert!(matches!(err, ReqforgeError::DigestMismatch { .. }));
}

#[tokio::test]
async fn missing_artifact_is_an_io_error() {
    let dir = tempdir().unwrap();
    let err = read_validation_artifact("REQ-404", dir.path()).unwrap_err();
    assert!(matches!(err, ReqforgeError::Io(_)));
}

#[tokio::test]
async fn summary_reflects_outcome() {
    let result = processed("REQ-102").await;
    let summary = result.summary();
    assert!(summary.starts_with("REQ-102: passed after 1 iteration(s)"));
    assert!(summary.contains("1 fix(es)"));
}

#[tokio::test]
async fn similar_ids_do_not_overwrite_each_other() {
    let dir = tempdir().unwrap();
    let slashed = processed("REQ/1").await;
    let underscored = processed("REQ_1").await;

    let a = write_validation_artifact(&slashed, dir.path()).unwrap();
    let b = write_validation_artifact(&underscored, dir.path()).unwrap();
    assert_ne!(a, b);
    assert!(a.starts_with(dir.path()));

    let loaded = read_validation_artifact("REQ/1", dir.path()).unwrap();
    assert_eq!(loaded.requirement_id, "REQ/1");
    assert_eq!(loaded.run_id, slashed.run_id);
    let loaded = read_validation_artifact("REQ_1", dir.path()).unwrap();
    assert_eq!(loaded.run_id, underscored.run_id);
}
