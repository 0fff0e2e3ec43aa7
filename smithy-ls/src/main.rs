//! smithy-ls: Language Server Protocol implementation for Smithy models.

use tower_lsp::{LspService, Server};
use tracing_subscriber::EnvFilter;

use smithy_ls::Backend;

#[tokio::main]
async fn main() {
    // Logs go to stderr since stdout carries LSP frames.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("starting smithy-ls");

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(Backend::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}
