//! End-to-end tests for baseline persistence and diffing.

use std::collections::BTreeSet;

use odavl_core::{
    count_by_severity, BaselineMatcher, BaselineMeta, BaselineStore, Fingerprint,
    FingerprintEngine, Issue, OdavlError, Severity, SeverityCounts,
};

fn i1() -> Issue {
    Issue::new(
        "a.ts",
        12,
        Severity::Critical,
        "sql-injection",
        "security",
        "User input flows into raw query",
    )
}

fn i2() -> Issue {
    Issue::new(
        "b.ts",
        40,
        Severity::High,
        "xss",
        "security",
        "Unescaped output written to innerHTML",
    )
}

fn fingerprints(engine: &FingerprintEngine, issues: &[Issue]) -> BTreeSet<Fingerprint> {
    issues.iter().map(|i| engine.fingerprint(i)).collect()
}

#[tokio::test]
async fn test_new_issue_against_stored_baseline() {
    let dir = tempfile::tempdir().unwrap();
    let store = BaselineStore::new(dir.path());
    store
        .create("main", vec![i1()], BaselineMeta::default())
        .await
        .unwrap();

    let baseline = store.load("main").await.unwrap();
    // Same issue, shifted down by unrelated edits.
    let mut moved = i1();
    moved.line = 30;
    let current = vec![moved.clone(), i2()];

    let diff = BaselineMatcher::new(FingerprintEngine::with_root(dir.path())).diff(&baseline, &current);

    assert_eq!(diff.new, vec![i2()]);
    assert!(diff.resolved.is_empty());
    assert_eq!(diff.persisting, vec![moved]);

    let mut unresolved = diff.persisting.clone();
    unresolved.extend(diff.new.iter().cloned());
    assert_eq!(
        count_by_severity(&unresolved),
        SeverityCounts {
            critical: 1,
            high: 1,
            medium: 0,
            low: 0,
        }
    );
    assert!(diff.has_regressions());
}

#[tokio::test]
async fn test_fixed_issue_is_resolved() {
    let dir = tempfile::tempdir().unwrap();
    let store = BaselineStore::new(dir.path());
    store
        .create("main", vec![i1(), i2()], BaselineMeta::default())
        .await
        .unwrap();
    let baseline = store.load("main").await.unwrap();

    let diff = BaselineMatcher::default().diff(&baseline, &[i2()]);

    assert!(diff.new.is_empty());
    assert_eq!(diff.resolved, vec![i1()]);
    assert_eq!(diff.persisting, vec![i2()]);
    assert_eq!(diff.summary.resolved.critical, 1);
    assert!(!diff.has_regressions());
}

#[test]
fn test_partition_covers_union_without_overlap() {
    let engine = FingerprintEngine::default();
    let matcher = BaselineMatcher::new(engine.clone());
    let issue = |file: &str, ty: &str| Issue::new(file, 1, Severity::Medium, ty, "lint", "rule broken");

    let baseline = vec![issue("a.ts", "r1"), issue("b.ts", "r2"), issue("c.ts", "r3")];
    let current = vec![issue("b.ts", "r2"), issue("c.ts", "r3"), issue("d.ts", "r4")];
    let diff = matcher.diff_issues(&baseline, &current);

    let new = fingerprints(&engine, &diff.new);
    let resolved = fingerprints(&engine, &diff.resolved);
    let persisting = fingerprints(&engine, &diff.persisting);

    let mut covered = new.clone();
    covered.extend(resolved.iter().cloned());
    covered.extend(persisting.iter().cloned());

    let mut expected = fingerprints(&engine, &baseline);
    expected.extend(fingerprints(&engine, &current));

    assert_eq!(covered, expected);
    assert!(new.is_disjoint(&resolved));
    assert!(new.is_disjoint(&persisting));
    assert!(resolved.is_disjoint(&persisting));
}

#[tokio::test]
async fn test_absolute_paths_match_relative_baseline() {
    let dir = tempfile::tempdir().unwrap();
    let store = BaselineStore::new(dir.path());
    store
        .create("main", vec![i1()], BaselineMeta::default())
        .await
        .unwrap();
    let baseline = store.load("main").await.unwrap();

    let mut absolute = i1();
    absolute.file = dir.path().join("a.ts").to_string_lossy().into_owned();
    let diff = BaselineMatcher::new(FingerprintEngine::with_root(dir.path())).diff(&baseline, &[absolute]);

    assert!(diff.new.is_empty());
    assert_eq!(diff.persisting.len(), 1);
}

#[tokio::test]
async fn test_corrupt_baseline_is_distinct_from_missing() {
    let dir = tempfile::tempdir().unwrap();
    let store = BaselineStore::new(dir.path());

    let missing = store.load("main").await.unwrap_err();
    assert!(matches!(missing, OdavlError::BaselineNotFound { .. }));

    std::fs::create_dir_all(store.dir()).unwrap();
    std::fs::write(store.dir().join("main.json"), b"{ not json").unwrap();
    let corrupt = store.load("main").await.unwrap_err();
    assert!(matches!(corrupt, OdavlError::BaselineCorrupt { .. }));
}

#[tokio::test]
async fn test_metadata_is_stamped() {
    let dir = tempfile::tempdir().unwrap();
    let store = BaselineStore::new(dir.path());
    let created = store
        .create(
            "release-1",
            vec![i1(), i2()],
            BaselineMeta {
                git_commit: Some("a".repeat(40)),
                ..BaselineMeta::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(created.metadata.total_issues, 2);
    assert_eq!(created.metadata.total_files, 2);
    assert_eq!(created.metadata.detectors, vec!["security".to_string()]);

    let loaded = store.load("release-1").await.unwrap();
    assert_eq!(loaded, created);
}
