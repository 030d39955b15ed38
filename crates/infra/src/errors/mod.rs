//! Infrastructure error plumbing

mod conversions;

pub use conversions::{transport_error, InfraError};
