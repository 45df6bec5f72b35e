//! Remote sandbox file tailer.
//!
//! Usage: `sandtail <agent> <framework> <executor> <container> [--tail -n N] [-f]`
//! Output goes to stdout, diagnostics to stderr (`RUST_LOG` to tune).

use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::WrapErr;
use reqwest::Url;
use tokio::io::AsyncWriteExt;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use sandtail::cli::Cli;
use sandtail::settings::{self, Settings, header_map};
use sandtail::{Cursor, Error, HttpEndpoint};

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sandtail=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    init_tracing();
    let cli = Cli::parse();
    let settings = settings::load_settings();
    run(cli, settings).await
}

async fn run(cli: Cli, settings: Settings) -> color_eyre::Result<()> {
    let endpoint = cli.endpoint.clone().unwrap_or_else(|| settings.endpoint.clone());
    let url = Url::parse(&endpoint).wrap_err_with(|| format!("invalid endpoint {}", endpoint))?;

    let mut headers = settings.header_map()?;
    headers.extend(header_map(
        cli.headers.iter().map(|(k, v)| (k.as_str(), v.as_str())),
    )?);
    let config = cli
        .read_config()
        .headers(headers)
        .chunk_size(cli.chunk_size.unwrap_or(settings.chunk_size));
    let poll_interval = cli
        .poll_interval_ms
        .map(std::time::Duration::from_millis)
        .unwrap_or_else(|| settings.poll_interval());

    let endpoint = Arc::new(HttpEndpoint::new(reqwest::Client::new(), url));
    let mut cursor = Cursor::new(
        endpoint,
        &cli.coordinates(),
        &cli.file,
        cli.format.formatter(),
        config,
    )
    .await?;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut stdout = tokio::io::stdout();
    loop {
        match cursor.pull_until(&mut shutdown).await {
            Ok(Some(block)) => {
                stdout.write_all(&block).await?;
                stdout.flush().await?;
            }
            Ok(None) if cursor.is_stream() => {
                tokio::select! {
                    _ = tokio::time::sleep(poll_interval) => {}
                    _ = &mut shutdown => break,
                }
            }
            Ok(None) | Err(Error::Cancelled) => break,
            Err(Error::Format(e)) => warn!(error = %e, "skipping line that failed to encode"),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
