use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use toolgate::{AuthConfig, McpServer};
use toolgate_dropbox::DropboxConnector;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".to_string().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let auth = AuthConfig::new(
        "Missing Dropbox access token. Pass it in the x-auth-token header or set DROPBOX_ACCESS_TOKEN.",
        std::env::var("DROPBOX_ACCESS_TOKEN").ok(),
    );
    let server = Arc::new(
        McpServer::new(
            "toolgate-dropbox",
            env!("CARGO_PKG_VERSION"),
            toolgate_dropbox::tools::registry(),
        )
        .with_instructions(
            "Dropbox file operations. Paths start with \"/\"; the root folder is \"\". \
             Batch tools may hand back an async job id; poll it with check_batch_job_status.",
        ),
    );
    let router = toolgate::http_router(Arc::new(DropboxConnector::default()), server, auth);

    let host = std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "127.0.0.1".to_owned());
    let port = std::env::var("PORT").unwrap_or_else(|_| "8001".to_owned());
    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}")).await?;
    tracing::info!(addr = %listener.local_addr()?, "dropbox adapter listening");

    let ct = CancellationToken::new();
    let signal_ct = ct.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_ct.cancel();
        }
    });

    toolgate::serve(listener, router, ct).await?;
    Ok(())
}
