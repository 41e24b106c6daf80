//! WakeMATE headless client entry point.
//!
//! Finds the companion server on the local network, remembers it for the
//! next start, and runs diagnostics against it.

mod config;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use wakemate_commands::CommandClient;
use wakemate_connection::store::default_store_path;
use wakemate_connection::{
    AddressCache, Diagnostics, DiscoveryEvent, DiscoveryManager, DiscoveryState, JsonStore,
    MemoryAddressCache, StoredAddressCache,
};
use wakemate_discovery::HttpProber;
use wakemate_discovery::http::lan_client;
use wakemate_protocol::Command;

use crate::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,wakemate=debug")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting WakeMATE headless client");

    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load config, using defaults");
            AppConfig::default()
        }
    };
    let discovery = config.discovery;

    let cache: Arc<dyn AddressCache> = match config.store_path.or_else(default_store_path) {
        Some(path) => Arc::new(StoredAddressCache::new(Arc::new(JsonStore::open(path)))),
        None => {
            tracing::warn!("no storage location, the server address will not be remembered");
            Arc::new(MemoryAddressCache::new())
        }
    };

    let http = lan_client().context("failed to build HTTP client")?;
    let prober = Arc::new(HttpProber::with_client(http.clone(), discovery.port));
    let manager = DiscoveryManager::new(prober, cache.clone(), discovery.clone())
        .context("invalid discovery configuration")?;
    tracing::info!(
        subnets = manager.plan().subnets().len(),
        candidates = manager.plan().candidate_count(),
        "discovery configured"
    );

    let mut events = manager
        .take_events()
        .await
        .context("discovery events already taken")?;
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            report_event(&event);
        }
    });

    manager.start();
    let state = tokio::select! {
        state = manager.wait_until_settled() => state,
        _ = tokio::signal::ctrl_c() => {
            manager.cancel();
            tracing::info!("interrupted");
            return Ok(());
        }
    };

    let Some(address) = found_address(&state) else {
        eprintln!("Server not found. Make sure:");
        for hint in state.guidance() {
            eprintln!("  - {hint}");
        }
        anyhow::bail!("no server found on the local network");
    };
    println!("Server found at {address}");

    let diagnostics =
        Diagnostics::with_client(http.clone(), discovery.port, discovery.diagnostics_timeout());
    let report = diagnostics.run(&address).await;
    for step in &report.steps {
        let mark = if step.success { "ok" } else { "FAILED" };
        println!("[{mark}] {}: {}", step.name, step.message);
    }
    if !report.overall {
        tracing::warn!(address = %address, "server found but diagnostics failed");
        return Ok(());
    }

    let client = CommandClient::with_client(
        http,
        cache,
        discovery.port,
        discovery.diagnostics_timeout(),
    );
    match client.send_command(&Command::GetStatus, None).await {
        Ok(reply) => println!("Server status: {reply}"),
        Err(e) => tracing::warn!(error = %e, "get_status failed"),
    }

    Ok(())
}

fn found_address(state: &DiscoveryState) -> Option<String> {
    if state.failed {
        None
    } else {
        state.server_address.clone()
    }
}

fn report_event(event: &DiscoveryEvent) {
    match event {
        DiscoveryEvent::CacheChecked { address, valid } => {
            if *valid {
                println!("Using saved server {address}");
            } else {
                println!("Saved server {address} is not responding, scanning network...");
            }
        }
        DiscoveryEvent::SubnetChanged { subnet } => println!("Scanning {subnet}x..."),
        DiscoveryEvent::Failed => println!("Scan finished without finding a server"),
        other => tracing::debug!(event = ?other, "discovery event"),
    }
}
