//! Connects to a local Xray control plane and prints the stat counters
//! matching the "rand" pattern.
//!
//! Run against a server whose API inbound listens on 127.0.0.1:10085:
//!
//! ```text
//! cargo run -p xctl --example query_stats
//! ```

use anyhow::Result;
use xctl::ControlClient;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let client = ControlClient::connect("127.0.0.1", 10085).await?;

    println!("--------------------------------------------");
    for (name, value) in client.query_stats("rand", false).await {
        println!("{name} -> {value}");
    }
    println!("--------------------------------------------");

    Ok(())
}
