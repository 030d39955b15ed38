//! Endpoint gateway: transport port, request bodies, response parsers and
//! the [`Backend`] procedures built on them

pub mod backend;
pub mod bodies;
pub mod parsers;
pub mod ports;

pub use backend::Backend;
pub use ports::Transport;
