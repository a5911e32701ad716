//! ttlq-publish - publish text messages stamped with their expiration time.
//!
//! All bodies given in one invocation share a single marker,
//! `This message expires at YYYY-MM-DD HH:MM:SS`, computed as now + queue TTL.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ttlq::{publish_on_broker, Config, EnvOrPrompt, PublishError, PublishReceipt, SessionError};

#[derive(Parser)]
#[command(
    name = "ttlq-publish",
    version,
    about = "Publish expiring text messages to the configured exchange"
)]
struct Cli {
    /// Print one JSON receipt per line instead of plain text
    #[arg(long)]
    json: bool,

    /// Message bodies, published in the order given. Everything from the
    /// first body on is taken literally, including leading hyphens.
    #[arg(
        value_name = "BODY",
        required = true,
        num_args = 1..,
        allow_hyphen_values = true,
        trailing_var_arg = true
    )]
    bodies: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true).with_writer(std::io::stderr))
        .init();

    info!(count = cli.bodies.len(), "publisher_starting");

    let config = Config::from_env();
    info!(
        host = %config.host,
        vhost = %config.vhost,
        exchange = %config.exchange,
        routing_key = %config.routing_key,
        ttl_ms = config.ttl_ms,
        "config_loaded"
    );

    let provider = EnvOrPrompt::new(config.user.clone());
    match publish_on_broker(&config, &provider, &cli.bodies).await {
        Ok(receipts) => {
            report(&receipts, cli.json)?;
            Ok(())
        }
        Err(SessionError::Publish(PublishError::TransportFailure { receipts, source })) => {
            // Already-sent messages are not rolled back; show what went out.
            report(&receipts, cli.json)?;
            Err(PublishError::TransportFailure { receipts, source }.into())
        }
        Err(e) => Err(e.into()),
    }
}

fn report(receipts: &[PublishReceipt], json: bool) -> Result<()> {
    for receipt in receipts {
        if json {
            println!("{}", serde_json::to_string(receipt)?);
        } else {
            println!("Message published: {}", receipt.composed_text);
        }
    }
    Ok(())
}
