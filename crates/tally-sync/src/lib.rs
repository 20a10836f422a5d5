//! # tally-sync: Sync Engine for the Tally Bridge
//!
//! Polls the production switcher and keeps the camera tally lamps in step
//! with its program/preview state.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync Engine Architecture                         │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                 SyncScheduler (fixed-interval loop)              │  │
//! │  │                                                                  │  │
//! │  │  Spawned as a Tokio task by the tally-bridge binary              │  │
//! │  │  Sole writer of committed tally state and published status       │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │SourceStatus-   │  │   DiffEngine   │  │  CommandDispatcher     │    │
//! │  │Client          │  │  (tally-core)  │  │                        │    │
//! │  │ HTTP + digest  │  │ target vs      │  │ Sequential, commits    │    │
//! │  │ XML documents  │  │ committed      │  │ on confirmed success   │    │
//! │  └────────────────┘  └────────────────┘  └───────────┬────────────┘    │
//! │                                                      ▼                  │
//! │                                          ┌────────────────────────┐    │
//! │                                          │  TallyProtocolClient   │    │
//! │                                          │  TCP/XML, one          │    │
//! │                                          │  connection / command  │    │
//! │                                          └────────────────────────┘    │
//! │                                                                         │
//! │  BridgeContext (Arc): mapping + committed state + published status,    │
//! │  read by the status page and updated by the mapping editor.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - Layered bridge configuration (defaults, TOML, environment)
//! - [`context`] - Shared `BridgeContext`
//! - [`dispatcher`] - `CommandDispatcher`
//! - [`error`] - Bridge error types
//! - [`gateway`] - Gateway wire protocol and `TallyProtocolClient`
//! - [`scheduler`] - `SyncScheduler` and its handle
//! - [`switcher`] - `SourceStatusClient` and document parsers
//!
//! ## Usage
//! ```rust,ignore
//! let config = BridgeConfig::load(None)?;
//! let scheduler = build_scheduler(&config)?;
//! let handle = scheduler.spawn();
//!
//! // later
//! println!("{}", handle.status().await.status);
//! handle.shutdown().await?;
//! ```

use std::sync::Arc;

pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod scheduler;
pub mod switcher;

pub use config::BridgeConfig;
pub use context::{BridgeContext, EngineState};
pub use dispatcher::{CommandDispatcher, DispatchReport};
pub use error::{BridgeError, BridgeResult};
pub use gateway::{
    CommandOutcome, GatewayConfig, TallyCommand, TallyCommandSender, TallyProtocolClient,
};
pub use scheduler::{SchedulerHandle, SyncScheduler};
pub use switcher::{FetchOutcome, SourceStatusClient, SwitcherSource};

/// Wires a scheduler from configuration: real switcher client, real gateway
/// client and a fresh context seeded from the configured mapping.
pub fn build_scheduler(config: &BridgeConfig) -> BridgeResult<SyncScheduler> {
    let context = Arc::new(BridgeContext::new(
        config.camera_mapping()?,
        config.sessions()?,
    ));
    let source = Arc::new(SourceStatusClient::new(&config.switcher)?);
    let gateway = Arc::new(TallyProtocolClient::new(config.gateway_config()));

    Ok(SyncScheduler::new(
        context,
        source,
        CommandDispatcher::new(gateway),
        config.interval(),
    ))
}
