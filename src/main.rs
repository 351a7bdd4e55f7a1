// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use clap::Parser;
use futures::TryStreamExt;
use kube::{
    runtime::watcher::{self, Event},
    Api, Client, ResourceExt,
};
use pgop::{
    constants::{DEFAULT_NAMESPACE, DRIFT_SWEEP_INTERVAL_SECS},
    crd::{PostgresDatabase, PostgresInstance},
    handler::OperationHandler,
    reconcilers::{DatabaseHandler, InstanceHandler},
    resolver::KubeInstanceResolver,
    sql::PgExecutor,
    state::{object_id, Store},
};
use std::pin::pin;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// PostgreSQL operator: reconciles `PostgresInstance` and `PostgresDatabase`
/// resources against a live cluster and its engines.
#[derive(Parser, Debug)]
#[command(name = "pgop", version, about)]
struct Args {
    /// Namespace whose resources are watched
    #[arg(default_value = DEFAULT_NAMESPACE)]
    namespace: String,
}

/// Whether this process runs inside the cluster it manages.
///
/// Selects the endpoint convention for catalog connections: in-cluster the
/// internal Service DNS name, otherwise the external Service's load-balancer
/// ingress address.
fn running_in_cluster() -> bool {
    std::env::var("KUBERNETES_SERVICE_HOST").is_ok()
}

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .thread_name("pgop-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    // Initialize logging with custom format
    // Format: timestamp file:line LEVEL message
    //
    // Respects RUST_LOG environment variable if set, otherwise defaults to INFO level
    // Example: RUST_LOG=debug cargo run
    //
    // Respects RUST_LOG_FORMAT environment variable for output format
    // Example: RUST_LOG_FORMAT=json cargo run
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

    let args = Args::parse();
    let in_cluster = running_in_cluster();

    info!("Starting PostgreSQL Controller");
    info!(namespace = %args.namespace, in_cluster, "Configuration");

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    // One tracking store per kind; the instance store is shared with the
    // database resolver for instance-reference lookups.
    let instance_store: Store<PostgresInstance> = Store::new();
    let database_store: Store<PostgresDatabase> = Store::new();

    let instance_handler = InstanceHandler::new(client.clone(), instance_store.clone());
    let resolver = KubeInstanceResolver::new(client.clone(), instance_store.clone(), in_cluster);
    let database_handler = DatabaseHandler::new(database_store.clone(), resolver, PgExecutor::new());

    let instance_api: Api<PostgresInstance> = Api::namespaced(client.clone(), &args.namespace);
    let database_api: Api<PostgresDatabase> = Api::namespaced(client.clone(), &args.namespace);

    info!("Starting watch loops and drift sweep");

    // Watch loops should never exit - if one fails, we log it and exit the
    // main process
    tokio::select! {
        result = run_watch_loop(instance_api, &instance_handler, &instance_store, "PostgresInstance") => {
            error!("CRITICAL: PostgresInstance watch loop exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("PostgresInstance watch loop exited unexpectedly without error")
        }
        result = run_watch_loop(database_api, &database_handler, &database_store, "PostgresDatabase") => {
            error!("CRITICAL: PostgresDatabase watch loop exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("PostgresDatabase watch loop exited unexpectedly without error")
        }
        result = run_drift_sweep(&instance_handler, &database_handler) => {
            error!("CRITICAL: drift sweep exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("drift sweep exited unexpectedly without error")
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, exiting");
            Ok(())
        }
    }
}

/// Watch one resource kind and dispatch each event to its handler.
///
/// The raw watch only distinguishes "applied" from "deleted"; an applied
/// resource is routed to `on_added` or `on_updated` by tracked-store
/// membership, so a resource whose add failed is retried as an add on its
/// next event. The initial listing after (re)start is replayed through the
/// same path, restoring tracking for resources that predate this process.
///
/// Handler errors are configuration errors fatal to the single operation:
/// they are logged and the loop continues. Watch stream errors propagate and
/// terminate the process.
async fn run_watch_loop<K, H>(
    api: Api<K>,
    handler: &H,
    store: &Store<K>,
    kind: &str,
) -> Result<()>
where
    K: kube::Resource<DynamicType = ()>
        + Clone
        + serde::de::DeserializeOwned
        + std::fmt::Debug
        + Send
        + 'static,
    H: OperationHandler<Resource = K>,
{
    info!("Starting {kind} watch loop");

    let mut stream = pin!(watcher::watcher(api, watcher::Config::default()));

    while let Some(event) = stream.try_next().await? {
        match event {
            Event::Init => debug!("{kind} watch (re)initializing"),
            Event::InitDone => info!("{kind} initial listing replayed"),
            Event::Apply(resource) | Event::InitApply(resource) => {
                let id = object_id(&resource.namespace().unwrap_or_default(), &resource.name_any());
                let tracked = store.get(&id).await.is_some();

                let result = if tracked {
                    handler.on_updated(resource.clone()).await
                } else {
                    handler.on_added(resource.clone()).await
                };

                match result {
                    Ok(outcome) => debug!("{kind} {id} reconciled: {outcome:?}"),
                    Err(e) => {
                        error!("Failed to reconcile {kind} {id}: {e:#}");
                        let _ = handler.on_error(resource).await;
                    }
                }
            }
            Event::Delete(resource) => {
                let id = object_id(&resource.namespace().unwrap_or_default(), &resource.name_any());

                match handler.on_deleted(resource.clone()).await {
                    Ok(outcome) => debug!("{kind} {id} deleted: {outcome:?}"),
                    Err(e) => {
                        error!("Failed to delete {kind} {id}: {e:#}");
                        let _ = handler.on_error(resource).await;
                    }
                }
            }
        }
    }

    Ok(())
}

/// Periodically repair divergence between tracked resources and live state.
///
/// A failing pass is logged and the next tick tries again; the sweep itself
/// never gives up.
async fn run_drift_sweep<A, B>(instances: &A, databases: &B) -> Result<()>
where
    A: OperationHandler,
    B: OperationHandler,
{
    info!(
        interval_secs = DRIFT_SWEEP_INTERVAL_SECS,
        "Starting drift sweep"
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(DRIFT_SWEEP_INTERVAL_SECS));
    // The first tick fires immediately; skip it so startup event processing
    // settles before the first sweep.
    ticker.tick().await;

    loop {
        ticker.tick().await;

        if let Err(e) = instances.check_current_state().await {
            warn!("Instance sweep pass failed: {e:#}");
        }
        if let Err(e) = databases.check_current_state().await {
            warn!("Database sweep pass failed: {e:#}");
        }
    }
}
