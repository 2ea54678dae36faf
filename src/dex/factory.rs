use std::sync::Arc;

use crate::config::ExecutionMode;

use super::live::{LiveSource, LiveSwapAdapter};
use super::source::{QuoteSource, SimulatedSource};
use super::swap::{SimulatedSwapAdapter, SwapAdapter};

/// Build the quote source set for the configured execution mode.
pub fn build_quote_sources(mode: ExecutionMode) -> Vec<Arc<dyn QuoteSource>> {
    match mode {
        ExecutionMode::Simulated => vec![
            Arc::new(SimulatedSource::raydium()),
            Arc::new(SimulatedSource::meteora()),
        ],
        ExecutionMode::Live => vec![
            Arc::new(LiveSource::raydium()),
            Arc::new(LiveSource::meteora()),
        ],
    }
}

/// Build the swap adapter for the configured execution mode.
pub fn build_swap_adapter(mode: ExecutionMode) -> Arc<dyn SwapAdapter> {
    match mode {
        ExecutionMode::Simulated => Arc::new(SimulatedSwapAdapter::new()),
        ExecutionMode::Live => Arc::new(LiveSwapAdapter),
    }
}
