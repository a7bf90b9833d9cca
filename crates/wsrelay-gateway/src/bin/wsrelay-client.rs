//! Terminal client for the relay.
//!
//! Usage: `wsrelay-client [ws://host:port/path]`
//!
//! Every stdin line is sent as a text frame; every payload relayed by the
//! server is printed on stdout. Logs go to stderr.

use std::process::ExitCode;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wsrelay_core::error::Result;
use wsrelay_core::Payload;
use wsrelay_gateway::client::{RelayClient, DEFAULT_URL};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let url = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_URL.to_string());

    match run(&url).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(%url, error = %e, "wsrelay-client failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(url: &str) -> Result<()> {
    let client = RelayClient::connect(url).await?;
    tracing::info!(%url, "connected");

    let (mut tx, mut rx) = client.into_split();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => tx.send(line).await?,
                    None => {
                        tx.close().await?;
                        break;
                    }
                }
            }
            incoming = rx.recv() => {
                match incoming? {
                    Some(Payload::Text(s)) => println!("{s}"),
                    Some(Payload::Binary(b)) => println!("<binary {} bytes>", b.len()),
                    None => {
                        tracing::info!("server closed the connection");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}
