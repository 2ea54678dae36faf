pub mod cli;
pub mod config;
pub mod dex;
pub mod domain;
pub mod error;
pub mod executor;
pub mod logging;
pub mod queue;
pub mod relay;
pub mod store;

pub use config::{AppConfig, ExecutionMode};
pub use dex::{
    build_quote_sources, build_swap_adapter, DexRouter, QuoteSource, SwapAdapter, SwapOutcome,
    SwapRequest,
};
pub use domain::{
    NewOrder, Order, OrderKind, OrderStatus, OrderUpdate, Quote, QuoteSnapshot, RoutingDecision,
    UpdateDetails,
};
pub use error::{DexflowError, Result};
pub use executor::{JobContext, OrderExecutor, RateLimiter};
pub use queue::{backoff_delay, Job, JobState, JobStore, MemoryJobStore, PgJobStore, WorkerPool};
pub use relay::{RelayState, UpdateBus};
pub use store::{MemoryOrderStore, OrderPatch, OrderStore, PostgresOrderStore};
