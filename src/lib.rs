//! # Route Agent Library
//!
//! Discovers labelled Cloud Run backends and turns their labels into Traefik
//! dynamic configuration, attaching a per-backend identity token to every
//! route, re-derived on a fixed interval.
//!
//! Modules:
//! - `discovery`: directory of backends (Cloud Run admin API)
//! - `parser`: router label DSL and its static tables
//! - `credentials`: per-audience identity tokens, cached
//! - `routing`: ownership resolution and configuration assembly
//! - `reconciler`: the periodic loop and its single-slot handoff
//! - `sinks`: snapshot consumers (YAML file)

pub mod cache;
pub mod config;
pub mod credentials;
pub mod discovery;
pub mod errors;
pub mod helpers;
pub mod observability;
pub mod parser;
pub mod reconciler;
pub mod resilience;
pub mod routing;
pub mod server;
pub mod sinks;
pub mod sources;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::config::service::ServiceConfig;
pub use crate::errors::{CredentialError, ReconcileError};
pub use crate::routing::types::RoutingConfiguration;
