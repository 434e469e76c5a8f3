//! # psynth
//!
//! Network side of the Psynth client: the HTTP transport, configuration and
//! the session actor. The model itself lives in `psynth-core`.

pub mod actor;
pub mod client;
pub mod config;

pub use actor::{SessionHandle, run_blocking};
pub use client::HttpGraphService;
pub use config::ClientConfig;
