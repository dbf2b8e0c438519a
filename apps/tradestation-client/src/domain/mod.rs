//! Domain layer: market data records, orders and session rules.
//!
//! Nothing here performs I/O.

pub mod bar;
pub mod batch;
pub(crate) mod lenient;
pub mod market_calendar;
pub mod order;
pub mod position;
pub mod quote;

pub use bar::Bar;
pub use batch::{BatchResult, SymbolOutcome, SymbolResult};
pub use order::{BracketOrderBuilder, OrderAck, OrderRequest, OrderType, TimeInForce, TradeAction};
pub use position::{Balances, Position};
pub use quote::Quote;
