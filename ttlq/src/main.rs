//! ttlq-provision - declare the durable exchange, TTL queue and binding.
//!
//! Safe to run repeatedly: an unchanged topology is re-declared as a no-op,
//! while a topology that conflicts with the broker's state fails the run.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ttlq::{provision_on_broker, Config, EnvOrPrompt};

#[derive(Parser)]
#[command(
    name = "ttlq-provision",
    version,
    about = "Declare a durable exchange and a TTL-bound queue bound to it"
)]
struct Cli {}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // No arguments beyond --help and --version; configuration comes from the environment.
    let _cli = Cli::parse();

    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true).with_writer(std::io::stderr))
        .init();

    info!("provisioner_starting");

    let config = Config::from_env();
    info!(
        host = %config.host,
        vhost = %config.vhost,
        exchange = %config.exchange,
        queue = %config.queue,
        routing_key = %config.routing_key,
        ttl_ms = config.ttl_ms,
        "config_loaded"
    );

    provision_on_broker(&config, &EnvOrPrompt::new(config.user.clone())).await?;

    println!(
        "The Exchange '{}' and queue '{}' were created on vhost '{}'.",
        config.exchange, config.queue, config.vhost
    );

    Ok(())
}
