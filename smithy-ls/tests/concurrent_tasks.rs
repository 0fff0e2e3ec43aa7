//! Rapid-edit cancellation and stale-commit refusal: many queued rebuilds
//! for one document run to at most one completion, and a rebuild planned
//! against a model another file's rebuild has since replaced is refused at
//! commit.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use smithy_ls::deps::MavenResolver;
use smithy_ls::lifecycle::DocumentLifecycleManager;
use smithy_ls::project::{Project, ProjectLoader};
use smithy_ls::state::ServerState;
use tokio::sync::Barrier;
use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::{Range, Url};

fn write(root: &Path, rel: &str, text: &str) {
    std::fs::write(root.join(rel), text).unwrap();
}

fn load(root: &Path) -> Project {
    ProjectLoader::load(root, &HashMap::new(), &mut MavenResolver::default()).unwrap()
}

#[tokio::test]
async fn rapid_changes_complete_at_most_one_assembly() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(
        root,
        "smithy-build.json",
        r#"{"version": "1.0", "sources": ["main.smithy"]}"#,
    );
    write(root, "main.smithy", "$version: \"2\"\nnamespace com.foo\nstring Foo\n");

    let mut project = load(root);
    let path = root.join("main.smithy");
    let uri = Url::from_file_path(&path).unwrap();

    let lifecycle = Arc::new(DocumentLifecycleManager::new());
    let completed = Arc::new(AtomicUsize::new(0));
    let cancelled = Arc::new(AtomicUsize::new(0));
    // All eight tasks are registered before any of them starts assembling,
    // so every earlier task observes cancellation before its assembly phase.
    let barrier = Arc::new(Barrier::new(9));

    for _ in 0..8 {
        // One single-character edit per change event.
        let end = project.get_file(&path).unwrap().document().end();
        project
            .get_file_mut(&path)
            .unwrap()
            .document_mut()
            .apply_edit(Some(Range::new(end, end)), "\n");

        let plan = project.file_update_plan(&path).unwrap();
        let token = CancellationToken::new();
        let task_token = token.clone();
        let barrier = Arc::clone(&barrier);
        let completed = Arc::clone(&completed);
        let cancelled = Arc::clone(&cancelled);
        let handle = tokio::spawn(async move {
            barrier.wait().await;
            match plan.assemble(&task_token) {
                Some(_) => {
                    completed.fetch_add(1, Ordering::SeqCst);
                }
                None => {
                    cancelled.fetch_add(1, Ordering::SeqCst);
                }
            }
        });
        lifecycle.put(uri.clone(), token, handle);
    }

    barrier.wait().await;
    lifecycle.wait_for_all_tasks().await;

    assert_eq!(completed.load(Ordering::SeqCst), 1);
    assert_eq!(cancelled.load(Ordering::SeqCst), 7);
}

/// Two files of the same project edited in quick succession: both rebuild
/// tasks plan against the same model, so whichever result lands second was
/// computed from a carry-over that no longer matches. The commit must
/// refuse it — applying it would silently revert the first file's edit —
/// and a replan against the committed model must bring both edits in.
fn race_two_files(first: &str, second: &str) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(
        root,
        "smithy-build.json",
        r#"{"version": "1.0", "sources": ["a.smithy", "b.smithy"]}"#,
    );
    write(root, "a.smithy", "$version: \"2\"\nnamespace com.foo\nstring A\n");
    write(root, "b.smithy", "$version: \"2\"\nnamespace com.foo\nstring B\n");

    let mut state = ServerState::new();
    state.load_workspace(root);

    let uri = |name: &str| Url::from_file_path(root.join(format!("{name}.smithy"))).unwrap();
    let edited = |name: &str| {
        format!("$version: \"2\"\nnamespace com.foo\nstring Edit{}\n", name.to_uppercase())
    };
    state.open(uri("a"), &edited("a"));
    state.open(uri("b"), &edited("b"));

    // Both plans snapshot the same pre-edit model.
    let (first_key, first_plan) = state.plan_rebuild(&uri(first), false).unwrap();
    let (second_key, second_plan) = state.plan_rebuild(&uri(second), false).unwrap();

    let first_result = first_plan.assemble(&CancellationToken::new()).unwrap();
    assert!(state.commit_rebuild(&first_key, first_plan.generation(), first_result));

    // The second result is stale now; committing it would drop the first
    // edit from the model.
    let second_result = second_plan.assemble(&CancellationToken::new()).unwrap();
    assert!(!state.commit_rebuild(&second_key, second_plan.generation(), second_result));

    let shape = |name: &str| format!("com.foo#Edit{}", name.to_uppercase());
    let committed = state.project(&first_key).unwrap().model_result().unwrap();
    assert!(committed.get_shape(&shape(first).parse().unwrap()).is_some());

    // The refused task replans against the committed model and retries.
    let (second_key, second_plan) = state.plan_rebuild(&uri(second), false).unwrap();
    let second_result = second_plan.assemble(&CancellationToken::new()).unwrap();
    assert!(state.commit_rebuild(&second_key, second_plan.generation(), second_result));

    // Both edits survive, in either completion order.
    let model = state.project(&second_key).unwrap().model_result().unwrap();
    assert!(model.get_shape(&shape("a").parse().unwrap()).is_some());
    assert!(model.get_shape(&shape("b").parse().unwrap()).is_some());
    assert!(model.get_shape(&"com.foo#A".parse().unwrap()).is_none());
    assert!(model.get_shape(&"com.foo#B".parse().unwrap()).is_none());
}

#[test]
fn cross_file_race_keeps_both_edits_when_a_commits_first() {
    race_two_files("a", "b");
}

#[test]
fn cross_file_race_keeps_both_edits_when_b_commits_first() {
    race_two_files("b", "a");
}
