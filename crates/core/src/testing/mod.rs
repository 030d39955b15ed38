//! Test doubles for the dispatch and transport ports
//!
//! Available to this crate's tests and, through the `test-utils` feature, to
//! downstream crates.

pub mod immediate;
pub mod mock_transport;

pub use immediate::ImmediateScheduler;
pub use mock_transport::MockTransport;
