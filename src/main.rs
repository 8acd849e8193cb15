// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context as _, Result};
use clap::Parser;
use kube::Client;
use route53_dns_operator::{
    cache::DnsCache, config::OperatorArgs, context::Context, controller, metrics,
    provider::aws::AwsRoute53Client, server,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

fn main() -> Result<()> {
    let args = OperatorArgs::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .thread_name("route53-dns-operator")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(args))
}

async fn async_main(args: OperatorArgs) -> Result<()> {
    init_logging();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        base_domain = %args.base_domain,
        management_cluster = %args.management_cluster,
        "Starting Route53 DNS operator"
    );

    let cache = Arc::new(DnsCache::new(args.cache_config()).context("Invalid cache configuration")?);
    debug!(config = ?cache.config(), "DNS cache created");

    let route53 = Arc::new(AwsRoute53Client::from_env(args.aws_region.as_deref()).await);
    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    debug!("Kubernetes client initialized successfully");

    let ctx = Arc::new(Context::new(
        client,
        route53,
        Arc::clone(&cache),
        args.settings(),
    ));

    spawn_cache_janitor(Arc::clone(&cache));

    tokio::select! {
        result = server::serve_metrics(args.metrics_bind_address) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Metrics server exited unexpectedly without error")
        }
        result = controller::run(ctx) => {
            error!("CRITICAL: OpenStackCluster controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("OpenStackCluster controller exited unexpectedly without error")
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, exiting");
            Ok(())
        }
    }
}

/// Initialize logging.
///
/// Format: timestamp file:line LEVEL message. Level comes from `RUST_LOG`
/// (default `info`), format from `RUST_LOG_FORMAT` (`text` or `json`).
fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

/// Sweep expired cache entries every clean window and publish cache gauges.
fn spawn_cache_janitor(cache: Arc<DnsCache>) {
    let period = cache.config().clean_window.max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let purged = cache.purge_expired();
            let stats = cache.stats();
            metrics::update_cache_stats(&stats);
            debug!(purged, entries = stats.entries, bytes = stats.bytes, "Swept DNS cache");
        }
    });
}
