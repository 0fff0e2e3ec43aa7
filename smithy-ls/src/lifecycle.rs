//! Per-URI background task registry.
//!
//! The lifecycle manager is the only place tasks are registered and
//! cancelled. Starting a new task for a URI cancels any in-flight task for
//! the same URI first. Cancellation is cooperative: tasks observe their
//! [`CancellationToken`] at coarse checkpoints and exit without partial
//! mutation.

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::Url;

#[derive(Debug)]
struct ManagedTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Debug, Default)]
pub struct DocumentLifecycleManager {
    tasks: DashMap<Url, ManagedTask>,
}

impl DocumentLifecycleManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task for `uri`, cancelling any in-flight task for the
    /// same URI first.
    pub fn put(&self, uri: Url, token: CancellationToken, handle: JoinHandle<()>) {
        if let Some(previous) = self.tasks.insert(uri, ManagedTask { token, handle }) {
            previous.token.cancel();
        }
    }

    /// Cancel and remove the task for `uri`, if any.
    pub fn cancel_task(&self, uri: &Url) {
        if let Some((_, task)) = self.tasks.remove(uri) {
            task.token.cancel();
        }
    }

    /// Cancel every registered task.
    pub fn cancel_all_tasks(&self) {
        for entry in self.tasks.iter() {
            entry.value().token.cancel();
        }
        self.tasks.clear();
    }

    /// The cancellation token of the task registered for `uri`.
    #[must_use]
    pub fn get_task(&self, uri: &Url) -> Option<CancellationToken> {
        self.tasks.get(uri).map(|task| task.token.clone())
    }

    /// Wait for every registered task to finish, cancelled or not.
    pub async fn wait_for_all_tasks(&self) {
        let uris: Vec<Url> = self.tasks.iter().map(|entry| entry.key().clone()).collect();
        for uri in uris {
            if let Some((_, task)) = self.tasks.remove(&uri) {
                // A task that panicked already logged through the join
                // error; nothing to propagate.
                let _ = task.handle.await;
            }
        }
    }
}
