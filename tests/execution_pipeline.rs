//! End-to-end pipeline tests over the in-memory store and queue.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use dexflow::config::{ExecutionConfig, QueueConfig};
use dexflow::dex::{DexRouter, SimulatedSwapAdapter, SwapAdapter, SwapOutcome, SwapRequest};
use dexflow::domain::{NewOrder, Order, OrderStatus, OrderUpdate, Quote};
use dexflow::error::{DexflowError, Result};
use dexflow::executor::{OrderExecutor, RateLimiter};
use dexflow::queue::{JobState, MemoryJobStore, WorkerPool};
use dexflow::relay::UpdateBus;
use dexflow::store::{MemoryOrderStore, OrderStore};
use dexflow::{JobStore, QuoteSource};

struct FixedSource {
    name: &'static str,
    price: Decimal,
    fee: Decimal,
}

#[async_trait]
impl QuoteSource for FixedSource {
    fn name(&self) -> &str {
        self.name
    }

    async fn quote(&self, _base_price: Decimal, _amount: Decimal) -> Result<Quote> {
        Ok(Quote {
            price: self.price,
            fee: self.fee,
            liquidity: dec!(100000),
        })
    }
}

/// Records when each quote call starts; used to observe execution spacing.
struct RecordingSource {
    inner: FixedSource,
    starts: Arc<Mutex<Vec<Instant>>>,
}

#[async_trait]
impl QuoteSource for RecordingSource {
    fn name(&self) -> &str {
        self.inner.name
    }

    async fn quote(&self, base_price: Decimal, amount: Decimal) -> Result<Quote> {
        self.starts.lock().unwrap().push(Instant::now());
        self.inner.quote(base_price, amount).await
    }
}

/// Fails the first `fail_times` swaps, then fills at the limit price.
struct FlakySwapAdapter {
    fail_times: u32,
    calls: AtomicU32,
}

impl FlakySwapAdapter {
    fn new(fail_times: u32) -> Self {
        Self {
            fail_times,
            calls: AtomicU32::new(0),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SwapAdapter for FlakySwapAdapter {
    async fn execute_swap(&self, source: &str, request: &SwapRequest) -> Result<SwapOutcome> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_times {
            return Err(DexflowError::SwapExecution {
                venue: source.to_string(),
                reason: "venue rejected swap".to_string(),
            });
        }
        Ok(SwapOutcome {
            tx_signature: format!("flaky-{source}-{call}"),
            executed_price: request.limit_price,
        })
    }
}

struct Harness {
    store: Arc<MemoryOrderStore>,
    jobs: Arc<MemoryJobStore>,
    bus: Arc<UpdateBus>,
    pool: Arc<WorkerPool>,
}

fn harness(
    sources: Vec<Arc<dyn QuoteSource>>,
    swap: Arc<dyn SwapAdapter>,
    execution: ExecutionConfig,
    queue: QueueConfig,
    orders_per_minute: u32,
) -> Harness {
    let store = Arc::new(MemoryOrderStore::new());
    let jobs = Arc::new(MemoryJobStore::new(execution.max_attempts));
    let bus = Arc::new(UpdateBus::new());

    let router = DexRouter::new(sources, execution.quote_timeout());
    let limiter = Arc::new(RateLimiter::new(orders_per_minute));
    let backoff_base_ms = execution.backoff_base_ms;

    let executor = Arc::new(OrderExecutor::new(
        Arc::clone(&store) as Arc<dyn OrderStore>,
        router,
        swap,
        limiter,
        Arc::clone(&bus),
        execution,
    ));

    let pool = Arc::new(WorkerPool::new(
        Arc::clone(&jobs) as Arc<dyn JobStore>,
        executor,
        queue,
        backoff_base_ms,
    ));

    Harness {
        store,
        jobs,
        bus,
        pool,
    }
}

fn fast_execution(max_attempts: u32) -> ExecutionConfig {
    ExecutionConfig {
        max_attempts,
        backoff_base_ms: 1,
        settlement_delay_ms: 0,
        ..Default::default()
    }
}

fn fast_queue(concurrency: usize) -> QueueConfig {
    QueueConfig {
        concurrency,
        poll_interval_ms: 10,
    }
}

/// Poll the store until the order reaches a terminal status.
async fn wait_for_terminal(store: &MemoryOrderStore, order_id: uuid::Uuid) -> Order {
    for _ in 0..2_000 {
        let order = store.get_order(order_id).await.unwrap().unwrap();
        if order.status.is_terminal() {
            return order;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("order never reached a terminal status");
}

#[tokio::test(start_paused = true)]
async fn happy_path_walks_the_full_state_machine() {
    let harness = harness(
        vec![
            Arc::new(dexflow::dex::SimulatedSource::raydium()),
            Arc::new(dexflow::dex::SimulatedSource::meteora()),
        ],
        Arc::new(SimulatedSwapAdapter::new()),
        ExecutionConfig::default(),
        fast_queue(2),
        6_000, // 10ms spacing, irrelevant here
    );

    let order = harness
        .store
        .create_order(NewOrder::limit("u1", "SOL", "USDC", dec!(1.0), dec!(25.5)))
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Pending);

    let mut subscription = harness.bus.clone().subscribe(order.id);
    harness.jobs.enqueue(order.id).await.unwrap();
    harness.pool.start().await;

    // Collect the published status walk until the terminal event.
    let mut statuses: Vec<OrderStatus> = Vec::new();
    loop {
        let update: OrderUpdate = subscription.recv().await.expect("bus closed early");
        statuses.push(update.status);
        if update.status == OrderStatus::Confirmed {
            assert!(update.details.as_ref().unwrap().executed_price.is_some());
            break;
        }
    }
    statuses.dedup();
    assert_eq!(
        statuses,
        [
            OrderStatus::Routing,
            OrderStatus::Building,
            OrderStatus::Submitted,
            OrderStatus::Confirmed,
        ]
    );

    let done = wait_for_terminal(&harness.store, order.id).await;
    assert_eq!(done.status, OrderStatus::Confirmed);
    assert_eq!(done.attempts, 0);
    assert!(["Raydium", "Meteora"].contains(&done.chosen_dex.as_deref().unwrap()));
    assert!(done.chosen_quote.is_some());
    assert!(done.tx_signature.is_some());

    // Fill lands inside the simulated adapter's declared band of the limit.
    let executed = done.executed_price.unwrap();
    assert!(executed >= dec!(25.5) * dec!(0.995));
    assert!(executed <= dec!(25.5) * dec!(1.005));

    harness.pool.close().await;
    // Idempotent: a second close is a no-op.
    harness.pool.close().await;
}

#[tokio::test(start_paused = true)]
async fn always_failing_job_exhausts_attempts_and_forces_failed() {
    let swap = Arc::new(FlakySwapAdapter::new(u32::MAX));
    let harness = harness(
        vec![Arc::new(FixedSource {
            name: "Raydium",
            price: dec!(25.0),
            fee: dec!(0.003),
        })],
        Arc::clone(&swap) as Arc<dyn SwapAdapter>,
        fast_execution(3),
        fast_queue(1),
        6_000,
    );

    let order = harness
        .store
        .create_order(NewOrder::limit("u1", "SOL", "USDC", dec!(1.0), dec!(25.5)))
        .await
        .unwrap();

    let mut subscription = harness.bus.clone().subscribe(order.id);
    let job = harness.jobs.enqueue(order.id).await.unwrap();
    harness.pool.start().await;

    let done = wait_for_terminal(&harness.store, order.id).await;
    assert_eq!(done.status, OrderStatus::Failed);
    assert_eq!(done.attempts, 3);
    assert!(done.last_error.as_deref().unwrap().contains("venue rejected"));
    assert_eq!(swap.calls(), 3);

    // Exactly one terminal event, carrying a non-empty error detail.
    let mut failed_events = 0;
    while let Ok(Some(update)) =
        tokio::time::timeout(Duration::from_millis(200), subscription.recv()).await
    {
        if update.status == OrderStatus::Failed {
            failed_events += 1;
            let details = update.details.expect("terminal event has details");
            assert!(!details.error.unwrap().is_empty());
            assert_eq!(details.attempt, Some(3));
        }
    }
    assert_eq!(failed_events, 1);

    let job = harness.jobs.get(job.id).await.unwrap();
    assert_eq!(job.state, JobState::Dead);
    assert_eq!(job.attempts, 3);

    harness.pool.close().await;
}

#[tokio::test(start_paused = true)]
async fn success_after_retries_keeps_the_failed_attempt_count() {
    let swap = Arc::new(FlakySwapAdapter::new(2));
    let harness = harness(
        vec![Arc::new(FixedSource {
            name: "Meteora",
            price: dec!(25.0),
            fee: dec!(0.002),
        })],
        Arc::clone(&swap) as Arc<dyn SwapAdapter>,
        fast_execution(3),
        fast_queue(1),
        6_000,
    );

    let order = harness
        .store
        .create_order(NewOrder::limit("u1", "SOL", "USDC", dec!(1.0), dec!(25.5)))
        .await
        .unwrap();
    let job = harness.jobs.enqueue(order.id).await.unwrap();
    harness.pool.start().await;

    let done = wait_for_terminal(&harness.store, order.id).await;
    assert_eq!(done.status, OrderStatus::Confirmed);
    // Two failed deliveries before the third succeeded.
    assert_eq!(done.attempts, 2);
    assert_eq!(swap.calls(), 3);

    let job = harness.jobs.get(job.id).await.unwrap();
    assert_eq!(job.state, JobState::Done);

    harness.pool.close().await;
}

#[tokio::test(start_paused = true)]
async fn limit_not_met_is_a_failing_attempt() {
    // Net 30 * 0.997 = 29.91, above the 25.5 limit: never executes.
    let harness = harness(
        vec![Arc::new(FixedSource {
            name: "Raydium",
            price: dec!(30.0),
            fee: dec!(0.003),
        })],
        Arc::new(SimulatedSwapAdapter::new()),
        fast_execution(2),
        fast_queue(1),
        6_000,
    );

    let order = harness
        .store
        .create_order(NewOrder::limit("u1", "SOL", "USDC", dec!(1.0), dec!(25.5)))
        .await
        .unwrap();
    harness.jobs.enqueue(order.id).await.unwrap();
    harness.pool.start().await;

    let done = wait_for_terminal(&harness.store, order.id).await;
    assert_eq!(done.status, OrderStatus::Failed);
    assert_eq!(done.attempts, 2);
    assert!(done.last_error.as_deref().unwrap().contains("Limit price not met"));
    // The order got as far as building before the constraint failed.
    assert_eq!(done.chosen_dex.as_deref(), Some("Raydium"));

    harness.pool.close().await;
}

#[tokio::test(start_paused = true)]
async fn late_subscriber_sees_no_replay() {
    let harness = harness(
        vec![Arc::new(FixedSource {
            name: "Raydium",
            price: dec!(25.0),
            fee: dec!(0.003),
        })],
        Arc::new(FlakySwapAdapter::new(0)),
        fast_execution(3),
        fast_queue(1),
        6_000,
    );

    let order = harness
        .store
        .create_order(NewOrder::limit("u1", "SOL", "USDC", dec!(1.0), dec!(25.5)))
        .await
        .unwrap();
    harness.jobs.enqueue(order.id).await.unwrap();
    harness.pool.start().await;

    let done = wait_for_terminal(&harness.store, order.id).await;
    assert_eq!(done.status, OrderStatus::Confirmed);

    // Subscribing after the terminal event yields nothing: no replay log.
    let mut late = harness.bus.clone().subscribe(order.id);
    let nothing = tokio::time::timeout(Duration::from_millis(200), late.recv()).await;
    assert!(nothing.is_err());

    harness.pool.close().await;
}

#[tokio::test(start_paused = true)]
async fn admission_rate_spaces_sequential_executions() {
    let starts = Arc::new(Mutex::new(Vec::new()));
    let harness = harness(
        vec![Arc::new(RecordingSource {
            inner: FixedSource {
                name: "Raydium",
                price: dec!(25.0),
                fee: dec!(0.003),
            },
            starts: Arc::clone(&starts),
        })],
        Arc::new(FlakySwapAdapter::new(0)),
        fast_execution(3),
        fast_queue(1),
        100, // 600ms spacing
    );

    for _ in 0..2 {
        let order = harness
            .store
            .create_order(NewOrder::market("u1", "SOL", "USDC", dec!(1.0)))
            .await
            .unwrap();
        harness.jobs.enqueue(order.id).await.unwrap();
    }
    harness.pool.start().await;

    for _ in 0..2_000 {
        if starts.lock().unwrap().len() >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    let starts = starts.lock().unwrap();
    assert_eq!(starts.len(), 2);
    let spacing = starts[1].duration_since(starts[0]);
    assert!(
        spacing >= Duration::from_millis(550),
        "executions started {spacing:?} apart"
    );

    drop(starts);
    harness.pool.close().await;
}
