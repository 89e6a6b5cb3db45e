//! CLI entry point: one process per configured exchange.
//!
//! Wires the pieces `xquery2::*` exposes: loads env + TOML config, acquires the
//! single-instance advisory lock, performs the restart-safety rewind, then runs the
//! `scan`+`compute` loop until an interrupt or hangup signal requests shutdown.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use bigdecimal::BigDecimal;
use clap::Parser;
use tracing::{error, info};
use xquery2::abi::EventKind;
use xquery2::cache::{Cache, InMemoryCache, RedisCache};
use xquery2::config::{Arguments, ChainConfig};
use xquery2::controller::{Controller, IndexerConfig, StageSlot};
use xquery2::db::state::StateStore;
use xquery2::db::Database;
use xquery2::filter::ExchangeFilter;
use xquery2::processor::bundle::{BundleStage, PairInfo};
use xquery2::processor::count::CountStage;
use xquery2::processor::rollup::{ExchangeRollupStage, PairRollupStage, Period, TokenRollupStage};
use xquery2::queue::Terminate;
use xquery2::rpc::RpcClient;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Arguments::parse();

    let filter = tracing_subscriber::EnvFilter::try_new(&args.log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(?err, "xquery2 exited with an error");
            ExitCode::FAILURE
        }
    }
}

/// Builds the shared cache handle from `REDIS_HOST`: absent host falls back to the
/// in-process cache, present host to the networked one.
async fn build_cache(args: &Arguments) -> anyhow::Result<Arc<dyn Cache>> {
    match &args.redis_host {
        Some(host) => {
            let cache = RedisCache::connect(host, args.redis_port, args.redis_password.as_deref(), args.redis_database).await?;
            Ok(Arc::new(cache))
        }
        None => Ok(Arc::new(InMemoryCache::default())),
    }
}

async fn run(args: Arguments) -> anyhow::Result<()> {
    let chain_config = ChainConfig::from_file(&args.config)?;

    let db = Database::connect(&args.db_url()).await?;
    if !db.try_acquire_instance_lock(chain_config.chain_id).await? {
        anyhow::bail!("another xquery2 instance already holds the lock for chain {}", chain_config.chain_id);
    }

    let _cache = build_cache(&args).await?;
    let rpc = RpcClient::new(args.api_url.clone());
    let state = Arc::new(StateStore::new());

    let factory_address: alloy_primitives::Address = chain_config.factory_address.parse()?;
    let router_address: Option<alloy_primitives::Address> =
        if chain_config.router_address.is_empty() { None } else { Some(chain_config.router_address.parse()?) };

    let pair_events =
        vec![EventKind::Transfer, EventKind::Mint, EventKind::Burn, EventKind::Swap, EventKind::Sync];
    let filter = Arc::new(ExchangeFilter::new(rpc.clone(), factory_address, pair_events, Vec::new()));

    let indexer_config = IndexerConfig {
        factory_address,
        router_address,
        pair_visibility_timeout: Duration::from_secs(chain_config.pair_visibility_timeout_seconds),
    };

    let pool = db.pool.clone();
    let factory_address_str = chain_config.factory_address.clone();
    let tracked_pairs: Vec<PairInfo> = chain_config
        .tracked_pairs
        .iter()
        .map(|p| PairInfo { address: p.address.clone(), order: p.native_is_token1 })
        .collect();
    let bundle_migrations: Vec<(i64, Vec<PairInfo>)> = chain_config
        .bundle_migrations
        .iter()
        .map(|m| {
            (
                m.at_block,
                m.tracked_pairs.iter().map(|p| PairInfo { address: p.address.clone(), order: p.native_is_token1 }).collect(),
            )
        })
        .collect();
    let default_native_price: BigDecimal = chain_config.default_native_price.parse()?;
    let stages = vec![
        StageSlot {
            name: "bundle".into(),
            batch_size: None,
            factory: Box::new({
                let pool = pool.clone();
                let tracked_pairs = tracked_pairs.clone();
                let bundle_migrations = bundle_migrations.clone();
                let default_native_price = default_native_price.clone();
                move || {
                    Box::new(BundleStage::new(pool.clone(), tracked_pairs.clone(), bundle_migrations.clone(), default_native_price.clone()))
                        as Box<dyn xquery2::processor::Stage>
                }
            }),
        },
        StageSlot {
            name: "count".into(),
            batch_size: None,
            factory: Box::new({
                let pool = pool.clone();
                let factory_address_str = factory_address_str.clone();
                move || Box::new(CountStage::new(pool.clone(), factory_address_str.clone())) as Box<dyn xquery2::processor::Stage>
            }),
        },
        StageSlot {
            name: "pair_hour".into(),
            batch_size: Some(50_000),
            factory: Box::new({
                let pool = pool.clone();
                move || Box::new(PairRollupStage::new(pool.clone(), Period::Hour)) as Box<dyn xquery2::processor::Stage>
            }),
        },
        StageSlot {
            name: "pair_day".into(),
            batch_size: Some(50_000),
            factory: Box::new({
                let pool = pool.clone();
                move || Box::new(PairRollupStage::new(pool.clone(), Period::Day)) as Box<dyn xquery2::processor::Stage>
            }),
        },
        StageSlot {
            name: "token_hour".into(),
            batch_size: Some(50_000),
            factory: Box::new({
                let pool = pool.clone();
                move || Box::new(TokenRollupStage::new(pool.clone(), Period::Hour)) as Box<dyn xquery2::processor::Stage>
            }),
        },
        StageSlot {
            name: "token_day".into(),
            batch_size: Some(50_000),
            factory: Box::new({
                let pool = pool.clone();
                move || Box::new(TokenRollupStage::new(pool.clone(), Period::Day)) as Box<dyn xquery2::processor::Stage>
            }),
        },
        StageSlot {
            name: "exchange_day".into(),
            batch_size: Some(50_000),
            factory: Box::new({
                let pool = pool.clone();
                let factory_address_str = factory_address_str.clone();
                move || Box::new(ExchangeRollupStage::new(pool.clone(), factory_address_str.clone())) as Box<dyn xquery2::processor::Stage>
            }),
        },
    ];

    let terminate = Terminate::new();
    let num_workers = args.num_workers.unwrap_or_else(num_cpus_or_one);

    let controller = Arc::new(Controller::new(
        db,
        state,
        rpc,
        filter,
        indexer_config,
        stages,
        num_workers,
        chain_config.safety_blocks as i64,
        chain_config.chunk_size,
        chain_config.max_chunk_size,
        terminate.clone(),
    ));

    controller.rewind_on_restart().await?;

    install_shutdown_handlers(terminate.clone());
    // Give the spawned worker pool a moment to reach their queue-poll loop before
    // the controller starts submitting jobs, avoiding a racy shutdown on start.
    tokio::time::sleep(Duration::from_secs(5)).await;

    info!(workers = num_workers, chain_id = chain_config.chain_id, "xquery2 starting");

    let run_result =
        controller.run(chain_config.start_block as i64, Duration::from_secs(chain_config.target_sleep_seconds)).await;

    controller.shutdown().await;
    run_result
}

fn num_cpus_or_one() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Installs interrupt/hangup handlers that set the shared terminate flag.
fn install_shutdown_handlers(terminate: Terminate) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut hangup = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup())
                .expect("failed to install SIGHUP handler");
            let mut term = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => info!("received interrupt, shutting down"),
                _ = hangup.recv() => info!("received hangup, shutting down"),
                _ = term.recv() => info!("received terminate, shutting down"),
            }
        }
        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received interrupt, shutting down");
        }
        terminate.set();
    });
}
