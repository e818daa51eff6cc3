use dropmirror::diff::Differencer;
use dropmirror::extract::staged_entries;
use dropmirror::types::ChangeAction;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    fs::write(path, content).expect("Failed to write file");
}

fn action_of(plan: &dropmirror::diff::DiffPlan, rel: &str) -> Option<ChangeAction> {
    plan.decisions
        .iter()
        .find(|d| d.relative_path == Path::new(rel))
        .map(|d| d.action)
}

#[test]
fn test_scenario_unchanged_create_and_untouched_target_only() {
    let stage = TempDir::new().expect("Failed to create stage");
    let mirror = TempDir::new().expect("Failed to create mirror");
    write(stage.path(), "a.txt", b"content one");
    write(stage.path(), "b.txt", b"content two");
    write(mirror.path(), "a.txt", b"content one");
    write(mirror.path(), "c.txt", b"content three");

    let plan = Differencer::new(mirror.path()).plan(staged_entries(stage.path()));

    assert_eq!(action_of(&plan, "a.txt"), Some(ChangeAction::Unchanged));
    assert_eq!(action_of(&plan, "b.txt"), Some(ChangeAction::Create));
    assert_eq!(action_of(&plan, "c.txt"), None);
    assert_eq!(plan.stats.create_count, 1);
    assert_eq!(plan.stats.replace_count, 0);
    assert_eq!(plan.stats.unchanged_count, 1);
    assert_eq!(plan.stats.failed_count, 0);
}

#[test]
fn test_changed_content_is_replace() {
    let stage = TempDir::new().expect("Failed to create stage");
    let mirror = TempDir::new().expect("Failed to create mirror");
    write(stage.path(), "notes/todo.md", b"- new item");
    write(mirror.path(), "notes/todo.md", b"- old item");

    let plan = Differencer::new(mirror.path()).plan(staged_entries(stage.path()));

    assert_eq!(action_of(&plan, "notes/todo.md"), Some(ChangeAction::Replace));
    let decision = &plan.decisions[0];
    assert_eq!(decision.source, stage.path().join("notes/todo.md"));
    assert_eq!(decision.destination, mirror.path().join("notes/todo.md"));
}

#[test]
fn test_identical_trees_are_all_unchanged() {
    let stage = TempDir::new().expect("Failed to create stage");
    let mirror = TempDir::new().expect("Failed to create mirror");
    for (rel, content) in [("a.txt", &b"1"[..]), ("x/y/z.bin", &[0u8, 1, 2][..])] {
        write(stage.path(), rel, content);
        write(mirror.path(), rel, content);
    }

    let plan = Differencer::new(mirror.path()).plan(staged_entries(stage.path()));

    assert_eq!(plan.transfer_count(), 0);
    assert_eq!(plan.stats.unchanged_count, 2);
}

#[test]
fn test_order_follows_staging_enumeration() {
    let stage = TempDir::new().expect("Failed to create stage");
    let mirror = TempDir::new().expect("Failed to create mirror");
    for rel in ["c.txt", "a.txt", "b/inner.txt"] {
        write(stage.path(), rel, rel.as_bytes());
    }

    let plan = Differencer::new(mirror.path()).plan(staged_entries(stage.path()));
    let order: Vec<PathBuf> = plan
        .decisions
        .iter()
        .map(|d| d.relative_path.clone())
        .collect();

    assert_eq!(
        order,
        vec![
            PathBuf::from("a.txt"),
            PathBuf::from("b/inner.txt"),
            PathBuf::from("c.txt"),
        ]
    );
}

#[test]
fn test_directory_in_target_is_per_file_failure() {
    let stage = TempDir::new().expect("Failed to create stage");
    let mirror = TempDir::new().expect("Failed to create mirror");
    write(stage.path(), "report", b"file in archive");
    write(stage.path(), "other.txt", b"fine");
    fs::create_dir_all(mirror.path().join("report")).expect("create dir in the way");

    let plan = Differencer::new(mirror.path()).plan(staged_entries(stage.path()));

    assert_eq!(plan.failures.len(), 1);
    assert_eq!(plan.failures[0].0, PathBuf::from("report"));
    assert_eq!(action_of(&plan, "other.txt"), Some(ChangeAction::Create));
}

#[test]
fn test_missing_target_root_classifies_everything_as_create() {
    let stage = TempDir::new().expect("Failed to create stage");
    let base = TempDir::new().expect("Failed to create base");
    write(stage.path(), "a.txt", b"a");

    let plan = Differencer::new(&base.path().join("not-created-yet"))
        .plan(staged_entries(stage.path()));

    assert_eq!(plan.stats.create_count, 1);
}
