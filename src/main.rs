//! Chatgate CLI entry point

mod cli;

use crate::cli::{Cli, Commands};
use anyhow::{Context, Result};
use chatgate::auth::{AllowAll, GrantRoute, QueryOptions, RequestSigner};
use chatgate::channels::{GlobalChannel, RESERVED_PATTERNS};
use chatgate::config::{GatewayConfig, Keyset, SECRET_KEY_NAME};
use chatgate::server::{self, Collaborators, Gateway};
use chatgate::storage::{KvStore, MemoryStore, PostgresConfig, PostgresStore};
use chatgate::upstream::{GrantClient, HttpFetch, PubNubGrantClient, ReqwestFetcher, StaticVault};
use clap::Parser;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const PURGE_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let keys = Keyset::new(cli.subscribe_key.clone(), cli.publish_key.clone());
    let vault = match &cli.secret_key {
        Some(secret) => StaticVault::new().with_secret(SECRET_KEY_NAME, secret.clone()),
        None => StaticVault::new(),
    };

    match cli.command {
        Commands::Serve {
            bind,
            call_timeout,
            database_url,
        } => {
            let bind_addr = bind.parse().context("Invalid bind address")?;
            let config = GatewayConfig::new(bind_addr, keys)
                .upstream_origin(cli.upstream_origin)
                .call_timeout(Duration::from_secs(call_timeout));
            serve(config, vault, database_url).await
        }
        Commands::Validate { globals } => {
            validate(&globals);
            Ok(())
        }
        Commands::Grants {
            route,
            global,
            uuid,
            auth_key,
            channel,
        } => grants(&route, global, uuid, auth_key, channel),
        Commands::Sign {
            path,
            params,
            timestamp,
        } => {
            let signer = RequestSigner::new(keys, Arc::new(vault), cli.upstream_origin);
            sign(&signer, &path, params, timestamp).await
        }
    }
}

async fn serve(config: GatewayConfig, vault: StaticVault, database_url: Option<String>) -> Result<()> {
    if config.keys.subscribe_key.is_empty() || config.keys.publish_key.is_empty() {
        warn!("Subscribe or publish key is empty; upstream calls will be rejected");
    }

    let store: Arc<dyn KvStore> = match database_url {
        Some(url) => {
            let db_config = PostgresConfig::from_url(&url).context("Invalid DATABASE_URL")?;
            let store = Arc::new(PostgresStore::new(db_config).await?);
            spawn_purge(store.clone());
            store
        }
        None => {
            info!("No DATABASE_URL set, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let signer = Arc::new(
        RequestSigner::new(config.keys.clone(), Arc::new(vault), config.upstream_origin.clone())
            .call_timeout(config.call_timeout),
    );
    let fetcher: Arc<dyn HttpFetch> = Arc::new(ReqwestFetcher::new(reqwest::Client::new()));
    let grants: Arc<dyn GrantClient> = Arc::new(PubNubGrantClient::new(signer.clone(), fetcher.clone()));

    let gateway = Arc::new(Gateway::new(
        &config,
        Collaborators {
            store,
            grants,
            signer,
            fetcher,
            policy: Arc::new(AllowAll),
        },
    ));

    info!(
        addr = %config.bind_addr,
        upstream = %config.upstream_origin,
        "Chatgate v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    server::serve(config.bind_addr, gateway, shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Chatgate stopped");
    Ok(())
}

/// Periodically delete expired rows; reads already ignore them
fn spawn_purge(store: Arc<PostgresStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = store.purge_expired().await {
                warn!(error = %e, "Failed to purge expired records");
            }
        }
    });
}

fn validate(globals: &[String]) {
    for global in globals {
        match GlobalChannel::parse(Some(global.as_str())) {
            Ok(_) => println!("ok       {}", global),
            Err(e) => println!("rejected {} ({})", global, e),
        }
    }

    println!();
    println!("Reserved patterns:");
    for pattern in RESERVED_PATTERNS {
        println!("  {}", pattern);
    }
}

fn grants(
    route: &str,
    global: Option<String>,
    uuid: Option<String>,
    auth_key: Option<String>,
    channel: Option<String>,
) -> Result<()> {
    let grant_route = GrantRoute::parse(route)
        .ok_or_else(|| anyhow::anyhow!("Not a grant route: {}", route))?;

    // The group route reads the lowercase field name.
    let body = json!({
        "global": global,
        "uuid": uuid,
        "authKey": auth_key,
        "authkey": auth_key,
        "chat": { "channel": channel },
    });

    let grant = grant_route
        .build(&body)
        .with_context(|| format!("Missing arguments for route {}", grant_route))?;

    println!("{}", serde_json::to_string_pretty(&grant)?);
    Ok(())
}

async fn sign(
    signer: &RequestSigner,
    path: &str,
    params: Vec<(String, String)>,
    timestamp: Option<u64>,
) -> Result<()> {
    let options: QueryOptions = params.into_iter().collect();

    let signed = match timestamp {
        Some(ts) => signer.sign_at(path, options, ts).await,
        None => signer.sign(path, options).await,
    }
    .context("Failed to sign request (is CHATGATE_SECRET_KEY set?)")?;

    println!("{}", signed.url(signer.origin())?);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server");
}
