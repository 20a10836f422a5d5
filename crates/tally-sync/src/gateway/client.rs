//! # Tally Protocol Client
//!
//! Sends single lamp commands to the camera tally gateway over TCP.
//!
//! ## Exchange States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Per-Command Exchange                                │
//! │                                                                         │
//! │  ┌────────────┐  connect ≤ timeout  ┌────────────────┐                 │
//! │  │ Connecting │ ──────────────────► │ Authenticating │                 │
//! │  └─────┬──────┘                     └───────┬────────┘                 │
//! │        │ refused / timeout                  │ Ok or silence            │
//! │        │                                    ▼                           │
//! │        │                            ┌────────────────┐                 │
//! │        │       other reply ◄─────── │   Settling     │ (500 ms)        │
//! │        │                            └───────┬────────┘                 │
//! │        │                                    ▼                           │
//! │        │                            ┌────────────────┐                 │
//! │        │                            │ SettingValue   │                 │
//! │        │                            └───────┬────────┘                 │
//! │        │                                    │                           │
//! │        ▼                                    ▼                           │
//! │  ┌─────────────────────────────────────────────────┐                   │
//! │  │ Closed (every path; connections are never reused)│                  │
//! │  └─────────────────────────────────────────────────┘                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use async_trait::async_trait;
use tally_core::{
    GatewaySessions, LampState, SessionId, SessionResolution, TallyColor, TallyTransition, UnitId,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::protocol::{
    encode_authentication_request, encode_function_value_change, judge_authentication,
    judge_function_value_change, Reply, Verdict, READ_BUFFER_SIZE,
};
use crate::error::{BridgeError, BridgeResult};

// =============================================================================
// Exchange State
// =============================================================================

/// Where a command exchange currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeStage {
    Connecting,
    Authenticating,
    Settling,
    SettingValue,
    Closed,
}

impl std::fmt::Display for ExchangeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExchangeStage::Connecting => write!(f, "connecting"),
            ExchangeStage::Authenticating => write!(f, "authenticating"),
            ExchangeStage::Settling => write!(f, "settling"),
            ExchangeStage::SettingValue => write!(f, "setting value"),
            ExchangeStage::Closed => write!(f, "closed"),
        }
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Connection settings for the gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,

    pub port: u16,

    /// Bound on connect and on each read.
    pub timeout: Duration,

    /// Pause between authentication and the function-value-change.
    pub settle_delay: Duration,

    /// Application name sent in the authentication request.
    pub client_name: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            timeout: Duration::from_secs(2),
            settle_delay: Duration::from_millis(500),
            client_name: "TallySender".to_string(),
        }
    }
}

impl GatewayConfig {
    /// `host:port` for connecting.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// Commands
// =============================================================================

/// One lamp change addressed to one gateway session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallyCommand {
    pub session: SessionResolution,
    pub color: TallyColor,
    pub lamp: LampState,
}

impl TallyCommand {
    /// Addresses `unit` through the session table.
    pub fn for_unit(
        unit: &UnitId,
        color: TallyColor,
        lamp: LampState,
        sessions: &GatewaySessions,
    ) -> Self {
        TallyCommand {
            session: sessions.resolve(unit),
            color,
            lamp,
        }
    }

    /// Addresses an explicit session id, bypassing the table.
    pub fn for_session(session: SessionId, color: TallyColor, lamp: LampState) -> Self {
        TallyCommand {
            session: SessionResolution::Override(session),
            color,
            lamp,
        }
    }

    /// The command that carries out `transition`.
    pub fn from_transition(transition: &TallyTransition, sessions: &GatewaySessions) -> Self {
        Self::for_unit(
            &transition.unit,
            transition.color,
            transition.lamp(),
            sessions,
        )
    }

    /// Human-readable target for logs.
    pub fn target(&self) -> String {
        match &self.session {
            SessionResolution::Resolved(id) => format!("session {id}"),
            SessionResolution::Override(id) => format!("session {id} (override)"),
            SessionResolution::Unresolved(unit) => format!("{unit} (no session)"),
        }
    }
}

/// How a successful command was confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The gateway acknowledged the value change.
    Confirmed,
    /// The gateway stayed silent and the change is assumed applied.
    Assumed,
}

/// Sends tally commands to something that drives lamps.
///
/// The dispatcher only talks to this trait so tests can swap in a scripted
/// gateway.
#[async_trait]
pub trait TallyCommandSender: Send + Sync {
    /// Performs one complete command exchange.
    async fn send(&self, command: &TallyCommand) -> BridgeResult<CommandOutcome>;
}

// =============================================================================
// Protocol Client
// =============================================================================

/// TCP client for the gateway's two-message exchange.
///
/// Each call to [`send`](TallyCommandSender::send) opens a fresh connection,
/// authenticates, sets one function value and closes.
#[derive(Debug, Clone)]
pub struct TallyProtocolClient {
    config: GatewayConfig,
}

impl TallyProtocolClient {
    pub fn new(config: GatewayConfig) -> Self {
        TallyProtocolClient { config }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    async fn connect(&self) -> BridgeResult<TcpStream> {
        let address = self.config.address();
        debug!(address = %address, stage = %ExchangeStage::Connecting, "Opening gateway connection");

        match timeout(self.config.timeout, TcpStream::connect(&address)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(BridgeError::ConnectionFailed(format!("{address}: {e}"))),
            Err(_) => Err(BridgeError::timeout("gateway connect", self.config.timeout)),
        }
    }

    /// One bounded read; the whole reply must fit in it.
    async fn read_reply(&self, stream: &mut TcpStream) -> BridgeResult<Reply> {
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        match timeout(self.config.timeout, stream.read(&mut buf)).await {
            Err(_) => Ok(Reply::TimedOut),
            Ok(Ok(0)) => Ok(Reply::Empty),
            Ok(Ok(n)) => Ok(Reply::Data(String::from_utf8_lossy(&buf[..n]).into_owned())),
            Ok(Err(e)) => Err(BridgeError::ConnectionFailed(format!("gateway read: {e}"))),
        }
    }

    async fn write_document(&self, stream: &mut TcpStream, document: &str) -> BridgeResult<()> {
        stream
            .write_all(document.as_bytes())
            .await
            .map_err(|e| BridgeError::ConnectionFailed(format!("gateway write: {e}")))
    }

    async fn exchange(
        &self,
        stream: &mut TcpStream,
        command: &TallyCommand,
    ) -> BridgeResult<CommandOutcome> {
        debug!(stage = %ExchangeStage::Authenticating, client = %self.config.client_name, "Sending authentication request");
        let auth = encode_authentication_request(&self.config.client_name);
        self.write_document(stream, &auth).await?;

        let reply = self.read_reply(stream).await?;
        match judge_authentication(&reply) {
            Verdict::Rejected => {
                let text = reply.text().unwrap_or_default().to_string();
                warn!(reply = %text, "Gateway rejected authentication");
                return Err(BridgeError::AuthenticationRejected(text));
            }
            Verdict::Assumed => debug!("No authentication reply, continuing"),
            Verdict::Confirmed => debug!("Authentication accepted"),
        }

        debug!(stage = %ExchangeStage::Settling, delay_ms = self.config.settle_delay.as_millis() as u64, "Waiting for gateway to settle");
        tokio::time::sleep(self.config.settle_delay).await;

        debug!(
            stage = %ExchangeStage::SettingValue,
            dest = %command.target(),
            function_id = command.color.function_id(),
            value = command.lamp.protocol_value(),
            "Sending function-value-change"
        );
        let set = encode_function_value_change(
            command.session.session_id(),
            command.color.function_id(),
            command.lamp,
        );
        self.write_document(stream, &set).await?;

        let reply = self.read_reply(stream).await?;
        match judge_function_value_change(&reply) {
            Verdict::Confirmed => Ok(CommandOutcome::Confirmed),
            Verdict::Assumed => {
                info!(dest = %command.target(), color = %command.color, lamp = %command.lamp, "No reply to value change, assuming applied");
                Ok(CommandOutcome::Assumed)
            }
            Verdict::Rejected => Err(BridgeError::CommandRejected(
                reply.text().unwrap_or("empty reply").to_string(),
            )),
        }
    }
}

#[async_trait]
impl TallyCommandSender for TallyProtocolClient {
    async fn send(&self, command: &TallyCommand) -> BridgeResult<CommandOutcome> {
        if let SessionResolution::Unresolved(unit) = &command.session {
            warn!(unit = %unit, "No gateway session for unit, sending empty session id");
        }

        let mut stream = self.connect().await?;
        let result = self.exchange(&mut stream, command).await;

        if let Err(e) = stream.shutdown().await {
            debug!(error = %e, "Gateway connection shutdown failed");
        }
        debug!(stage = %ExchangeStage::Closed, "Gateway connection closed");

        match &result {
            Ok(outcome) => info!(
                dest = %command.target(),
                color = %command.color,
                lamp = %command.lamp,
                ?outcome,
                "Tally command applied"
            ),
            Err(e) => warn!(
                dest = %command.target(),
                color = %command.color,
                lamp = %command.lamp,
                error = %e,
                "Tally command failed"
            ),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(id: &str) -> UnitId {
        UnitId::new(id).unwrap()
    }

    #[test]
    fn test_command_resolution() {
        let sessions: GatewaySessions =
            [(unit("XCU-08"), SessionId::new("PH3XQD"))].into_iter().collect();

        let known = TallyCommand::for_unit(&unit("XCU-08"), TallyColor::Red, LampState::On, &sessions);
        assert_eq!(known.session.session_id(), "PH3XQD");
        assert_eq!(known.target(), "session PH3XQD");

        let unknown =
            TallyCommand::for_unit(&unit("XCU-99"), TallyColor::Green, LampState::Off, &sessions);
        assert!(unknown.session.is_unresolved());
        assert_eq!(unknown.target(), "XCU-99 (no session)");

        let manual = TallyCommand::for_session(SessionId::new("ABC"), TallyColor::Yellow, LampState::On);
        assert_eq!(manual.session.session_id(), "ABC");
    }

    #[test]
    fn test_from_transition() {
        let transition = TallyTransition::new(unit("XCU-08"), TallyColor::Green, false);
        let command = TallyCommand::from_transition(&transition, &GatewaySessions::new());

        assert_eq!(command.color, TallyColor::Green);
        assert_eq!(command.lamp, LampState::Off);
        assert!(command.session.is_unresolved());
    }

    #[tokio::test]
    async fn test_connection_refused_fails() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = TallyProtocolClient::new(GatewayConfig {
            port,
            settle_delay: Duration::ZERO,
            timeout: Duration::from_millis(500),
            ..Default::default()
        });
        let command =
            TallyCommand::for_session(SessionId::new("ABC"), TallyColor::Red, LampState::On);

        let err = client.send(&command).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
