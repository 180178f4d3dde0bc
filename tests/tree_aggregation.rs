use arkivd::ArchiveError;
use arkivd::core::{
    AggregationPolicy, ArchiveTree, BackendDescriptor, BackendRegistry, JobStatus, TargetStatus,
};

fn registry(names: &[&str]) -> BackendRegistry {
    BackendRegistry::new(names.iter().map(|n| BackendDescriptor::storage(*n)).collect())
}

#[test]
fn job_with_no_targets_is_done_immediately() {
    let mut tree = ArchiveTree::new(AggregationPolicy::default());
    tree.add_job("src", "dst", "alice", None).unwrap();
    tree.set_targets("dst", &registry(&[])).unwrap();

    assert!(tree.job("dst").unwrap().done);
}

#[test]
fn done_follows_the_last_pending_target() {
    let mut tree = ArchiveTree::new(AggregationPolicy::default());
    tree.add_job("src", "dst", "alice", None).unwrap();
    tree.set_targets("dst", &registry(&["a", "b"])).unwrap();

    tree.update_target("dst", "a", TargetStatus::Success, None, None)
        .unwrap();
    assert!(!tree.job("dst").unwrap().done);

    tree.update_target("dst", "b", TargetStatus::Success, None, None)
        .unwrap();
    assert!(tree.job("dst").unwrap().done);
}

#[test]
fn terminal_target_accepts_a_later_overwrite() {
    let mut tree = ArchiveTree::new(AggregationPolicy::default());
    tree.add_job("src", "dst", "alice", None).unwrap();
    tree.set_targets("dst", &registry(&["a"])).unwrap();

    tree.update_target("dst", "a", TargetStatus::Failure, None, Some(vec!["boom".into()]))
        .unwrap();
    tree.update_target("dst", "a", TargetStatus::Success, None, None)
        .unwrap();

    let job = tree.job("dst").unwrap();
    assert_eq!(job.targets[0].status, TargetStatus::Success);
    assert!(job.targets[0].errors.is_empty());
}

#[test]
fn all_success_tree_resolves_success_at_the_root() {
    let mut tree = ArchiveTree::new(AggregationPolicy::default());
    tree.add_job("s0", "root", "alice", None).unwrap();
    tree.add_job("s1", "c1", "alice", Some("root")).unwrap();
    tree.add_job("s2", "c2", "alice", Some("root")).unwrap();
    for node in ["root", "c1", "c2"] {
        tree.set_targets(node, &registry(&["osfstorage"])).unwrap();
    }

    for node in ["c1", "c2", "root"] {
        tree.update_target(node, "osfstorage", TargetStatus::Success, None, None)
            .unwrap();
    }

    let root = tree.job("root").unwrap();
    assert!(root.done);
    assert!(root.is_success());
    assert!(tree.archive_tree_finished("root").unwrap());
}

#[test]
fn single_child_failure_resolves_failure_at_the_root() {
    let mut tree = ArchiveTree::new(AggregationPolicy::default());
    tree.add_job("s0", "root", "alice", None).unwrap();
    tree.add_job("s1", "c1", "alice", Some("root")).unwrap();
    tree.set_targets("root", &registry(&["osfstorage"])).unwrap();
    tree.set_targets("c1", &registry(&["osfstorage"])).unwrap();

    tree.update_target("root", "osfstorage", TargetStatus::Success, None, None)
        .unwrap();
    tree.update_target(
        "c1",
        "osfstorage",
        TargetStatus::UncaughtError,
        None,
        Some(vec!["backend crashed".into()]),
    )
    .unwrap();

    assert_eq!(tree.job("root").unwrap().status, JobStatus::Failure);
    assert_eq!(
        tree.tree_errors("root").unwrap(),
        vec!["backend crashed".to_string()]
    );
}

#[test]
fn unknown_backend_reports_not_found() {
    let mut tree = ArchiveTree::new(AggregationPolicy::default());
    tree.add_job("src", "dst", "alice", None).unwrap();
    tree.set_targets("dst", &registry(&["a"])).unwrap();

    let err = tree
        .update_target("dst", "nonexistent-backend", TargetStatus::Success, None, None)
        .unwrap_err();
    assert!(matches!(err, ArchiveError::UnknownTarget { .. }));
}

#[test]
fn repeated_set_targets_appends_duplicates() {
    // Regression pin: set_targets is not idempotent.
    let mut tree = ArchiveTree::new(AggregationPolicy::default());
    tree.add_job("src", "dst", "alice", None).unwrap();
    tree.set_targets("dst", &registry(&["a", "b"])).unwrap();
    tree.set_targets("dst", &registry(&["a", "b"])).unwrap();

    assert_eq!(tree.job("dst").unwrap().targets.len(), 4);
}
