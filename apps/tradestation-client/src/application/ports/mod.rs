//! Application Ports
//!
//! - **BrokerageApi**: what the operation boundary needs from the brokerage
//! - **Clock**: exchange-local time

mod brokerage_port;
mod clock_port;

pub use brokerage_port::{
    BarQuery, BarUnit, BarWindow, BrokerageApi, ClosePositionRequest, OpenPositionRequest,
};
pub use clock_port::{Clock, FixedClock, SystemClock};
