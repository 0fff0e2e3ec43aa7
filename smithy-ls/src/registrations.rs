//! File-watcher registration payloads.
//!
//! Two bundles: a workspace-level watcher for build files, and a per-project
//! watcher covering every source and import location. Clients do not
//! de-duplicate watchers, so the previous bundle is always unregistered
//! before a new one is registered.

use std::path::Path;

use tower_lsp::lsp_types::{
    DidChangeWatchedFilesRegistrationOptions, FileSystemWatcher, GlobPattern, Registration,
    Unregistration, WatchKind,
};

use crate::state::ServerState;

const WATCH_BUILD_FILES_ID: &str = "WatchSmithyBuildFiles";
const WATCH_SMITHY_FILES_ID: &str = "WatchSmithyFiles";
const WATCHED_FILES_METHOD: &str = "workspace/didChangeWatchedFiles";

pub struct FileWatchRegistrar;

impl FileWatchRegistrar {
    /// Registrations for the current project set.
    #[must_use]
    pub fn registrations(state: &ServerState) -> Vec<Registration> {
        vec![
            registration(WATCH_BUILD_FILES_ID, build_file_watchers(state)),
            registration(WATCH_SMITHY_FILES_ID, smithy_file_watchers(state)),
        ]
    }

    /// Unregistrations matching the previously registered bundles.
    #[must_use]
    pub fn unregistrations() -> Vec<Unregistration> {
        [WATCH_BUILD_FILES_ID, WATCH_SMITHY_FILES_ID]
            .into_iter()
            .map(|id| Unregistration {
                id: id.to_string(),
                method: WATCHED_FILES_METHOD.to_string(),
            })
            .collect()
    }
}

fn registration(id: &str, watchers: Vec<FileSystemWatcher>) -> Registration {
    Registration {
        id: id.to_string(),
        method: WATCHED_FILES_METHOD.to_string(),
        register_options: Some(
            serde_json::to_value(DidChangeWatchedFilesRegistrationOptions { watchers })
                .expect("watcher options serialize"),
        ),
    }
}

fn watcher(glob: String) -> FileSystemWatcher {
    FileSystemWatcher {
        glob_pattern: GlobPattern::String(glob),
        kind: Some(WatchKind::Create | WatchKind::Delete),
    }
}

fn build_file_watchers(state: &ServerState) -> Vec<FileSystemWatcher> {
    let mut roots: Vec<&Path> = state
        .workspace_roots()
        .iter()
        .map(|root| root.as_path())
        .collect();
    roots.sort();
    roots
        .into_iter()
        .map(|root| {
            watcher(format!(
                "{}/**/{{smithy-build,.smithy-project}}.json",
                root.display()
            ))
        })
        .collect()
}

fn smithy_file_watchers(state: &ServerState) -> Vec<FileSystemWatcher> {
    let mut globs: Vec<String> = Vec::new();
    for project in state.all_projects() {
        for declared in project
            .config()
            .sources
            .iter()
            .chain(&project.config().imports)
        {
            if declared.is_dir() {
                globs.push(format!("{}/**/*.{{smithy,json}}", declared.display()));
            } else {
                globs.push(declared.display().to_string());
            }
        }
    }
    globs.sort();
    globs.dedup();
    globs.into_iter().map(watcher).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundles_carry_fixed_ids_and_method() {
        let state = ServerState::new();
        let registrations = FileWatchRegistrar::registrations(&state);
        assert_eq!(registrations.len(), 2);
        assert_eq!(registrations[0].id, WATCH_BUILD_FILES_ID);
        assert_eq!(registrations[1].id, WATCH_SMITHY_FILES_ID);
        assert!(registrations
            .iter()
            .all(|r| r.method == WATCHED_FILES_METHOD));

        let unregistrations = FileWatchRegistrar::unregistrations();
        assert_eq!(unregistrations.len(), 2);
        assert_eq!(unregistrations[0].id, WATCH_BUILD_FILES_ID);
    }

    #[test]
    fn build_file_watcher_globs_cover_workspace_roots() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = ServerState::new();
        state.load_workspace(dir.path());

        let watchers = build_file_watchers(&state);
        assert_eq!(watchers.len(), 1);
        let GlobPattern::String(glob) = &watchers[0].glob_pattern else {
            panic!("expected string glob");
        };
        assert!(glob.ends_with("/**/{smithy-build,.smithy-project}.json"));
        assert!(glob.starts_with(&dir.path().display().to_string()));
        assert_eq!(
            watchers[0].kind,
            Some(WatchKind::Create | WatchKind::Delete)
        );
    }
}
