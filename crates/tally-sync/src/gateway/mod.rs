//! # Camera Gateway
//!
//! The TCP/XML side of the bridge: wire documents in [`protocol`], the
//! connection-per-command client in [`client`].

pub mod client;
pub mod protocol;

pub use client::{
    CommandOutcome, ExchangeStage, GatewayConfig, TallyCommand, TallyCommandSender,
    TallyProtocolClient,
};
pub use protocol::{Reply, Verdict};
