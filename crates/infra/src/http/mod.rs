//! HTTP adapters

pub mod transport;

pub use transport::{post_params_hash, ReqwestTransport, ReqwestTransportBuilder};
