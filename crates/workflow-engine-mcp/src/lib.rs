//! Tool Protocol client layer: wire types, stdio subprocess transport,
//! tool-server config, and the hybrid real/stub `ToolClient` implementation.

pub mod clients;
pub mod config;
pub mod protocol;
pub mod transport;

pub use clients::HybridToolClient;
