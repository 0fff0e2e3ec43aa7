//! LSP backend.
//!
//! `Backend` implements the `LanguageServer` trait over a single
//! [`ServerState`] behind a `RwLock`: every state mutation happens on the
//! request-dispatching path, while re-assembly runs on background tasks that
//! snapshot a [`RebuildPlan`] under the read lock and hand results back
//! through [`ServerState::commit_rebuild`].

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    CompletionOptions, CompletionParams, CompletionResponse, DidChangeConfigurationParams,
    DidChangeTextDocumentParams, DidChangeWatchedFilesParams, DidChangeWorkspaceFoldersParams,
    DidCloseTextDocumentParams, DidOpenTextDocumentParams, DidSaveTextDocumentParams,
    DocumentFormattingParams, DocumentSymbolParams, DocumentSymbolResponse, FileChangeType,
    GotoDefinitionParams, GotoDefinitionResponse, Hover, HoverParams, HoverProviderCapability,
    InitializeParams, InitializeResult, InitializedParams, OneOf, ServerCapabilities, ServerInfo,
    TextDocumentSyncCapability, TextDocumentSyncKind, TextEdit, Url,
};
use tower_lsp::{Client, LanguageServer};

use smithy_model::Severity;

use crate::capabilities::{completion, definition, formatting, hover, symbols};
use crate::project::BuildFileKind;
use crate::registrations::FileWatchRegistrar;
use crate::state::ServerState;

/// Initialization options, a closed set.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub minimum_severity: Severity,
    pub only_reload_on_save: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            minimum_severity: Severity::Warning,
            only_reload_on_save: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitializationOptions {
    #[serde(default)]
    diagnostics: DiagnosticsOptions,
    #[serde(default)]
    only_reload_on_save: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiagnosticsOptions {
    minimum_severity: Option<Severity>,
}

impl ServerConfig {
    fn from_options(options: Option<serde_json::Value>) -> Self {
        let parsed: InitializationOptions = options
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default();
        Self {
            minimum_severity: parsed
                .diagnostics
                .minimum_severity
                .unwrap_or(Severity::Warning),
            only_reload_on_save: parsed.only_reload_on_save,
        }
    }
}

pub struct Backend {
    client: Client,
    state: Arc<RwLock<ServerState>>,
    config: RwLock<ServerConfig>,
}

impl Backend {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            state: Arc::new(RwLock::new(ServerState::new())),
            config: RwLock::new(ServerConfig::default()),
        }
    }

    /// Snapshot a rebuild plan for `uri` and run it on a background task.
    /// The lifecycle manager cancels any in-flight task for the same URI; a
    /// result planned against a model that another file's rebuild has since
    /// replaced is refused at commit, and the task replans against the
    /// fresh model so neither edit is lost.
    async fn schedule_rebuild(&self, uri: Url, validate: bool) {
        let planned = {
            let state = self.state.read().await;
            state.plan_rebuild(&uri, validate)
        };
        let Some((key, plan)) = planned else {
            return;
        };

        let token = CancellationToken::new();
        let state = Arc::clone(&self.state);
        let client = self.client.clone();
        let minimum_severity = self.config.read().await.minimum_severity;

        let task_token = token.clone();
        let task_uri = uri.clone();
        let handle = tokio::spawn(async move {
            let mut key = key;
            let mut plan = plan;
            loop {
                let assembly_token = task_token.clone();
                let assembly_plan = plan.clone();
                let assembled =
                    tokio::task::spawn_blocking(move || assembly_plan.assemble(&assembly_token))
                        .await;
                let Ok(Some(result)) = assembled else {
                    return;
                };

                let published = {
                    let mut state = state.write().await;
                    // A newer task for this document may have started while
                    // we were assembling; its put() cancelled us.
                    if task_token.is_cancelled() {
                        return;
                    }
                    if state.commit_rebuild(&key, plan.generation(), result) {
                        state.project_diagnostics(&key, minimum_severity)
                    } else {
                        // Another file's rebuild landed while we assembled;
                        // replan against the committed model and try again.
                        match state.plan_rebuild(&task_uri, validate) {
                            Some((new_key, new_plan)) => {
                                key = new_key;
                                plan = new_plan;
                                continue;
                            }
                            None => return,
                        }
                    }
                };
                for (uri, diags) in published {
                    client.publish_diagnostics(uri, diags, None).await;
                }
                return;
            }
        });

        self.state
            .read()
            .await
            .lifecycle()
            .put(uri, token, handle);
    }

    async fn update_watchers(&self) {
        let registrations = {
            let state = self.state.read().await;
            FileWatchRegistrar::registrations(&state)
        };
        // Clients do not de-duplicate watchers; drop the previous bundle
        // before registering the new one.
        if let Err(err) = self
            .client
            .unregister_capability(FileWatchRegistrar::unregistrations())
            .await
        {
            tracing::debug!(%err, "unregister watchers failed");
        }
        if let Err(err) = self.client.register_capability(registrations).await {
            tracing::warn!(%err, "register watchers failed");
        }
    }

    async fn publish_all_diagnostics(&self) {
        let minimum_severity = self.config.read().await.minimum_severity;
        let published = {
            let state = self.state.read().await;
            state.all_managed_diagnostics(minimum_severity)
        };
        for (uri, diags) in published {
            self.client.publish_diagnostics(uri, diags, None).await;
        }
    }
}

fn workspace_roots_from(params: &InitializeParams) -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Some(folders) = &params.workspace_folders {
        for folder in folders {
            if let Ok(path) = folder.uri.to_file_path() {
                roots.push(path);
            }
        }
    }
    #[allow(deprecated)]
    if roots.is_empty() {
        if let Some(root_uri) = &params.root_uri {
            if let Ok(path) = root_uri.to_file_path() {
                roots.push(path);
            }
        }
    }
    roots
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        tracing::info!("initializing smithy-ls");
        *self.config.write().await = ServerConfig::from_options(params.initialization_options.clone());

        let roots = workspace_roots_from(&params);
        {
            let mut state = self.state.write().await;
            for root in roots {
                state.load_workspace(&root);
            }
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::INCREMENTAL,
                )),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                definition_provider: Some(OneOf::Left(true)),
                completion_provider: Some(CompletionOptions::default()),
                document_symbol_provider: Some(OneOf::Left(true)),
                document_formatting_provider: Some(OneOf::Left(true)),
                ..ServerCapabilities::default()
            },
            server_info: Some(ServerInfo {
                name: "smithy-ls".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        tracing::info!("smithy-ls initialized");
        self.update_watchers().await;
        self.publish_all_diagnostics().await;
    }

    async fn shutdown(&self) -> Result<()> {
        tracing::info!("shutting down");
        let state = self.state.read().await;
        state.lifecycle().cancel_all_tasks();
        state.lifecycle().wait_for_all_tasks().await;
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        tracing::debug!(%uri, "opened");
        {
            let mut state = self.state.write().await;
            state.open(uri.clone(), &params.text_document.text);
        }
        self.schedule_rebuild(uri, false).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        {
            let mut state = self.state.write().await;
            state.apply_changes(&uri, &params.content_changes);
        }
        if !self.config.read().await.only_reload_on_save {
            self.schedule_rebuild(uri, false).await;
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri;
        let is_build_file = uri
            .to_file_path()
            .is_ok_and(|path| BuildFileKind::of(&path).is_some());
        if is_build_file {
            // Saving a build file reloads the project's config, migrating
            // files between the attached and detached sets.
            {
                let mut state = self.state.write().await;
                state.handle_build_file_changed(&uri);
            }
            self.update_watchers().await;
            self.publish_all_diagnostics().await;
        } else {
            self.schedule_rebuild(uri, true).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        tracing::debug!(%uri, "closed");
        {
            let mut state = self.state.write().await;
            state.close(&uri);
        }
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        {
            let mut state = self.state.write().await;
            for event in &params.changes {
                match event.typ {
                    FileChangeType::CREATED => state.handle_created(&event.uri),
                    FileChangeType::DELETED => state.handle_deleted(&event.uri),
                    FileChangeType::CHANGED => state.handle_build_file_changed(&event.uri),
                    _ => {}
                }
            }
        }
        self.update_watchers().await;
        self.publish_all_diagnostics().await;
    }

    async fn did_change_workspace_folders(&self, params: DidChangeWorkspaceFoldersParams) {
        {
            let mut state = self.state.write().await;
            for removed in &params.event.removed {
                if let Ok(path) = removed.uri.to_file_path() {
                    state.remove_workspace(&path);
                }
            }
            for added in &params.event.added {
                if let Ok(path) = added.uri.to_file_path() {
                    state.load_workspace(&path);
                }
            }
        }
        self.update_watchers().await;
        self.publish_all_diagnostics().await;
    }

    async fn did_change_configuration(&self, _params: DidChangeConfigurationParams) {
        // Initialization options are fixed for the session.
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let state = self.state.read().await;
        let response = state
            .find_project_and_file(&uri)
            .and_then(|found| hover::hover(found.project, found.file, position));
        Ok(response)
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let state = self.state.read().await;
        let response = state
            .find_project_and_file(&uri)
            .and_then(|found| definition::definition(found.project, found.file, position))
            .map(GotoDefinitionResponse::Scalar);
        Ok(response)
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        let state = self.state.read().await;
        let response = state.find_project_and_file(&uri).map(|found| {
            CompletionResponse::Array(completion::completion(found.project, found.file, position))
        });
        Ok(response)
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        let uri = params.text_document.uri;
        let state = self.state.read().await;
        let response = state.find_project_and_file(&uri).map(|found| {
            DocumentSymbolResponse::Nested(symbols::document_symbols(found.project, found.file))
        });
        Ok(response)
    }

    async fn formatting(&self, params: DocumentFormattingParams) -> Result<Option<Vec<TextEdit>>> {
        let uri = params.text_document.uri;
        let state = self.state.read().await;
        let response = state
            .find_project_and_file(&uri)
            .map(|found| formatting::format(found.file.document()));
        Ok(response)
    }
}
