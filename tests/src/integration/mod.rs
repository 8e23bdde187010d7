//! Cross-crate integration flows.

pub mod bus_flows;
pub mod fixture_replay;
pub mod store_ports;
