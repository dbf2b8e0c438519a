#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! TradeStation Client - Brokerage API Adapter
//!
//! Async client for TradeStation's v3 brokerage API: OAuth token upkeep,
//! historical and intraday bars, live bar and quote streams, bracket orders,
//! positions and balances.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Bars, quotes, orders, positions, market calendar
//!   - `bar` / `quote`: Market data records
//!   - `order`: Order types and the bracket builder
//!   - `market_calendar`: Business days, session hours, intraday capacity
//!   - `batch`: Per-symbol outcomes of multi-symbol fetches
//!
//! - **Application**: Port definitions and named operations
//!   - `ports`: `BrokerageApi` and `Clock`
//!   - `operations`: `BrokerOperation` parsed from a name and JSON arguments
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `tradestation`: REST and streaming client
//!   - `metrics`: Prometheus counters
//!   - `telemetry`: Tracing subscriber and OTLP export
//!
//! # Data Flow
//!
//! ```text
//! BrokerOperation ──► BrokerageApi ──► TradeStationClient ──► TokenManager ──► /oauth/token
//!                                            │
//!                                            ├──► /marketdata/barcharts ──► parse_bars ──► BatchResult
//!                                            ├──► /marketdata/stream/*  ──► Stream<Bar | Quote>
//!                                            └──► /orderexecution/orders, /brokerage/accounts
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Value types and pure market rules.
pub mod domain;

/// Application layer - Ports and operations.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

/// Error types.
pub mod error;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::{
    Balances, Bar, BatchResult, BracketOrderBuilder, OrderAck, OrderRequest, OrderType, Position,
    Quote, SymbolOutcome, SymbolResult, TimeInForce, TradeAction,
};

// Application
pub use application::BrokerOperation;
pub use application::ports::{
    BarQuery, BarUnit, BarWindow, BrokerageApi, Clock, ClosePositionRequest, FixedClock,
    OpenPositionRequest, SystemClock,
};

// Client
pub use error::ClientError;
pub use infrastructure::tradestation::{
    AccessToken, ConfigError, Credentials, StreamSettings, TradeStationClient, TradeStationConfig,
};

// Metrics
pub use infrastructure::metrics::{MetricsConfig, MetricsError, init_metrics};

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
