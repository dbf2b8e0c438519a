//! Application layer: ports and the named-operation boundary.

pub mod operations;
pub mod ports;

pub use operations::BrokerOperation;
