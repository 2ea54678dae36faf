pub mod order;
pub mod quote;
pub mod update;

pub use order::{NewOrder, Order, OrderKind, OrderStatus, QuoteSnapshot};
pub use quote::{DexQuote, Quote, RoutingDecision};
pub use update::{OrderUpdate, QuoteSummary, SourceQuote, UpdateDetails};
