//! # Ronda Test Suite
//!
//! Unified test crate for flows that cross crate boundaries.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/
//! │   └── round_benchmarks.rs   # Identifier decoding, geofence, finalize latency
//! └── src/integration/
//!     ├── bus_flows.rs          # Engine → event bus choreography
//!     ├── store_ports.rs        # Custom store adapters behind the engine
//!     └── fixture_replay.rs     # The demo fixture through the runtime
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p rd-tests
//!
//! # By category
//! cargo test -p rd-tests integration::bus_flows
//!
//! # Benchmarks
//! cargo bench -p rd-tests
//! ```

#![allow(unused_variables)]
#![allow(unused_imports)]
#![allow(dead_code)]

pub mod integration;
