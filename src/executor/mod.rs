//! Order execution state machine.
//!
//! Drives one order through `pending → routing → building → submitted →
//! confirmed`, persisting and publishing after every transition. `failed`
//! is reachable only as the forced terminal transition once the job queue
//! has no retry left.

mod rate_limiter;

pub use rate_limiter::RateLimiter;

use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::time::{sleep, timeout};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::ExecutionConfig;
use crate::dex::{DexRouter, SwapAdapter, SwapRequest};
use crate::domain::{OrderKind, OrderStatus, OrderUpdate, QuoteSummary, UpdateDetails};
use crate::error::{DexflowError, Result};
use crate::relay::UpdateBus;
use crate::store::{OrderPatch, OrderStore};

/// Delivery handed to the executor by the worker pool
#[derive(Debug, Clone, Copy)]
pub struct JobContext {
    pub order_id: Uuid,
    /// Zero-based delivery index for this job
    pub attempt_index: u32,
}

/// Limit-order execution rule: the order may execute only when the expected
/// net price does not exceed the limit price.
pub fn limit_satisfied(expected_price: Decimal, limit_price: Decimal) -> bool {
    expected_price <= limit_price
}

pub struct OrderExecutor {
    store: Arc<dyn OrderStore>,
    router: DexRouter,
    swap: Arc<dyn SwapAdapter>,
    limiter: Arc<RateLimiter>,
    publisher: Arc<UpdateBus>,
    config: ExecutionConfig,
}

impl OrderExecutor {
    pub fn new(
        store: Arc<dyn OrderStore>,
        router: DexRouter,
        swap: Arc<dyn SwapAdapter>,
        limiter: Arc<RateLimiter>,
        publisher: Arc<UpdateBus>,
        config: ExecutionConfig,
    ) -> Self {
        Self {
            store,
            router,
            swap,
            limiter,
            publisher,
            config,
        }
    }

    /// Entry point invoked by the worker pool for each job delivery.
    ///
    /// Retries re-run the whole pipeline from quoting onward, including swap
    /// submission: an attempt that failed after submitting may submit again
    /// on redelivery (no idempotency key; see DESIGN.md).
    pub async fn process(&self, job: JobContext) -> Result<()> {
        self.limiter.acquire().await;

        info!(
            order_id = %job.order_id,
            attempt = job.attempt_index + 1,
            "processing order"
        );

        match self.run_pipeline(job).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.record_failure(job, &e).await;
                Err(e)
            }
        }
    }

    /// One execution attempt, steps strictly in order.
    async fn run_pipeline(&self, job: JobContext) -> Result<()> {
        let order = self
            .store
            .get_order(job.order_id)
            .await?
            .ok_or(DexflowError::NotFound(job.order_id))?;

        if order.status.is_terminal() {
            warn!(order_id = %order.id, status = %order.status, "order already terminal, skipping");
            return Ok(());
        }

        // pending -> routing; a retried attempt past pending keeps its
        // status and re-runs the pipeline from quoting.
        if order.status == OrderStatus::Pending {
            self.store
                .update_status(order.id, OrderStatus::Routing, OrderPatch::default())
                .await?;
            self.publisher
                .publish(OrderUpdate::new(order.id, OrderStatus::Routing));
        }

        let base_price = crate::dex::base_price(&order.token_in, &order.token_out);
        let quotes = self
            .router
            .quotes(&order.token_in, &order.token_out, order.amount, base_price)
            .await;

        if quotes.is_empty() {
            return Err(DexflowError::NoQuoteAvailable);
        }

        let decision = self
            .router
            .select_best(&quotes)
            .ok_or(DexflowError::RoutingFailure)?;

        self.publisher.publish(
            OrderUpdate::new(order.id, OrderStatus::Routing).with_details(UpdateDetails {
                quotes: Some(QuoteSummary::new(&quotes, &decision.source)),
                ..Default::default()
            }),
        );

        self.store
            .update_status(
                order.id,
                OrderStatus::Building,
                OrderPatch {
                    chosen_dex: Some(decision.source.clone()),
                    chosen_quote: Some(decision.snapshot()),
                    ..Default::default()
                },
            )
            .await?;
        self.publisher
            .publish(OrderUpdate::new(order.id, OrderStatus::Building));

        if order.kind == OrderKind::Limit {
            if let Some(limit_price) = order.limit_price {
                if !limit_satisfied(decision.expected_price, limit_price) {
                    return Err(DexflowError::LimitNotMet {
                        expected: decision.expected_price,
                        limit: limit_price,
                    });
                }
            }
        }

        let request = SwapRequest {
            token_in: order.token_in.clone(),
            token_out: order.token_out.clone(),
            amount: order.amount,
            limit_price: order.limit_price.unwrap_or(decision.expected_price),
            min_amount_out: order.min_amount_out(decision.expected_price),
        };

        let outcome = timeout(
            self.config.swap_timeout(),
            self.swap.execute_swap(&decision.source, &request),
        )
        .await
        .map_err(|_| DexflowError::SwapExecution {
            venue: decision.source.clone(),
            reason: format!("timed out after {}ms", self.config.swap_timeout_ms),
        })??;

        self.store
            .update_status(
                order.id,
                OrderStatus::Submitted,
                OrderPatch {
                    tx_signature: Some(outcome.tx_signature.clone()),
                    ..Default::default()
                },
            )
            .await?;
        self.publisher.publish(
            OrderUpdate::new(order.id, OrderStatus::Submitted).with_details(UpdateDetails {
                tx_signature: Some(outcome.tx_signature.clone()),
                ..Default::default()
            }),
        );

        sleep(self.config.settlement_delay()).await;

        self.store
            .update_status(
                order.id,
                OrderStatus::Confirmed,
                OrderPatch {
                    executed_price: Some(outcome.executed_price),
                    tx_signature: Some(outcome.tx_signature.clone()),
                    ..Default::default()
                },
            )
            .await?;
        self.publisher.publish(
            OrderUpdate::new(order.id, OrderStatus::Confirmed).with_details(UpdateDetails {
                tx_signature: Some(outcome.tx_signature.clone()),
                executed_price: Some(outcome.executed_price),
                ..Default::default()
            }),
        );

        info!(
            order_id = %order.id,
            tx_signature = %outcome.tx_signature,
            executed_price = %outcome.executed_price,
            "order completed"
        );

        Ok(())
    }

    /// Record a failed attempt exactly once.
    ///
    /// Non-final attempts keep the order's current status (no regression)
    /// and only persist the attempt count and error; the final attempt
    /// forces the terminal `failed` state. A persistence failure in here is
    /// logged and swallowed so the original error still reaches the queue
    /// and other jobs keep processing.
    async fn record_failure(&self, job: JobContext, error: &DexflowError) {
        let attempts = (job.attempt_index + 1) as i32;
        let is_final = job.attempt_index + 1 >= self.config.max_attempts;
        let error_text = error.to_string();

        error!(
            order_id = %job.order_id,
            attempt = attempts,
            is_final,
            error = %error_text,
            "order attempt failed"
        );

        let patch = OrderPatch {
            attempts: Some(attempts),
            last_error: Some(error_text.clone()),
            ..Default::default()
        };

        let result = if is_final {
            self.store
                .update_status(job.order_id, OrderStatus::Failed, patch)
                .await
                .map(|_| OrderStatus::Failed)
        } else {
            // Preserve whatever stage the order reached.
            match self.store.get_order(job.order_id).await {
                Ok(current) => {
                    let status = current
                        .map(|order| order.status)
                        .unwrap_or(OrderStatus::Pending);
                    self.store
                        .update_status(job.order_id, status, patch)
                        .await
                        .map(|_| status)
                }
                Err(e) => Err(e),
            }
        };

        match result {
            Ok(status) => {
                self.publisher.publish(
                    OrderUpdate::new(job.order_id, status).with_details(UpdateDetails {
                        error: Some(error_text),
                        attempt: Some(attempts),
                        ..Default::default()
                    }),
                );
            }
            Err(e) => {
                // Log-and-continue isolation: the worker pool must survive a
                // store outage while recording another error.
                error!(
                    order_id = %job.order_id,
                    error = %e,
                    "failed to record execution failure"
                );
            }
        }
    }
}
