use clap::Parser;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

use dexflow::cli::{Cli, Commands};
use dexflow::config::ExecutionMode;
use dexflow::dex::{build_quote_sources, build_swap_adapter, DexRouter};
use dexflow::domain::{NewOrder, OrderKind};
use dexflow::error::Result;
use dexflow::executor::{OrderExecutor, RateLimiter};
use dexflow::queue::{JobStore, PgJobStore, WorkerPool};
use dexflow::relay::{self, RelayState, UpdateBus};
use dexflow::store::{OrderStore, PostgresOrderStore};
use dexflow::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_from(&cli.config_dir)?;
    dexflow::logging::init(&config.logging);

    match cli.command {
        Commands::Run { mode } => run_service(config, mode).await,
        Commands::Enqueue {
            user,
            token_in,
            token_out,
            amount,
            limit_price,
            slippage,
        } => enqueue_order(config, user, token_in, token_out, amount, limit_price, slippage).await,
        Commands::Migrate => {
            let store =
                PostgresOrderStore::new(&config.database.url, config.database.max_connections)
                    .await?;
            store.migrate().await
        }
    }
}

async fn run_service(mut config: AppConfig, mode_override: Option<ExecutionMode>) -> Result<()> {
    if let Some(mode) = mode_override {
        config.execution.mode = mode;
    }
    info!(mode = %config.execution.mode, "starting dexflow");

    let pg = PostgresOrderStore::new(&config.database.url, config.database.max_connections).await?;
    pg.migrate().await?;

    let jobs: Arc<dyn JobStore> =
        Arc::new(PgJobStore::new(pg.pool().clone(), config.execution.max_attempts));
    let store: Arc<dyn OrderStore> = Arc::new(pg);

    let bus = Arc::new(UpdateBus::new());
    let router = DexRouter::new(
        build_quote_sources(config.execution.mode),
        config.execution.quote_timeout(),
    );
    let swap = build_swap_adapter(config.execution.mode);
    let limiter = Arc::new(RateLimiter::new(config.rate_limit.orders_per_minute));

    let executor = Arc::new(OrderExecutor::new(
        store,
        router,
        swap,
        limiter,
        Arc::clone(&bus),
        config.execution.clone(),
    ));

    let pool = Arc::new(WorkerPool::new(
        jobs,
        executor,
        config.queue.clone(),
        config.execution.backoff_base_ms,
    ));
    pool.start().await;

    let (relay_shutdown_tx, relay_shutdown_rx) = watch::channel(false);
    let relay_state = RelayState { bus };
    let relay_bind = config.relay.bind.clone();
    let relay_handle = tokio::spawn(async move {
        if let Err(e) = relay::serve(&relay_bind, relay_state, relay_shutdown_rx).await {
            error!(error = %e, "relay server exited with error");
        }
    });

    shutdown_signal().await;
    info!("shutdown signal received");

    // The close sequence is idempotent; a second signal mid-close is
    // harmless.
    pool.close().await;
    let _ = relay_shutdown_tx.send(true);
    let _ = relay_handle.await;

    info!("shutdown complete");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn enqueue_order(
    config: AppConfig,
    user: String,
    token_in: String,
    token_out: String,
    amount: rust_decimal::Decimal,
    limit_price: Option<rust_decimal::Decimal>,
    slippage: Option<rust_decimal::Decimal>,
) -> Result<()> {
    let pg = PostgresOrderStore::new(&config.database.url, config.database.max_connections).await?;
    let jobs = PgJobStore::new(pg.pool().clone(), config.execution.max_attempts);

    let mut new_order = match limit_price {
        Some(limit_price) => NewOrder::limit(&user, &token_in, &token_out, amount, limit_price),
        None => NewOrder::market(&user, &token_in, &token_out, amount),
    };
    if let Some(tolerance) = slippage {
        new_order = new_order.with_slippage(tolerance);
    }

    let order = pg.create_order(new_order).await?;
    let job = jobs.enqueue(order.id).await?;

    info!(
        order_id = %order.id,
        job_id = job.id,
        kind = %order.kind,
        "order enqueued"
    );
    println!("{}", order.id);

    if order.kind == OrderKind::Limit {
        println!(
            "limit {} {} -> {} @ {}",
            order.amount,
            order.token_in,
            order.token_out,
            order.limit_price.unwrap_or_default()
        );
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
