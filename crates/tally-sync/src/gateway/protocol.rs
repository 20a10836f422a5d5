//! # Gateway Wire Protocol
//!
//! Document encoding and reply classification for the camera tally gateway.
//!
//! ## Message Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   One Command = One Connection                          │
//! │                                                                         │
//! │   Bridge                                              Gateway           │
//! │     │                                                    │              │
//! │     │── application-authentication-request ─────────────►│              │
//! │     │◄──────────────── result="Ok" / nothing / other ────│              │
//! │     │                                                    │              │
//! │     │   (settle delay)                                   │              │
//! │     │                                                    │              │
//! │     │── function-value-change (session, function id) ──►│              │
//! │     │◄── result="Ok" / authentication-indication / ... ─│              │
//! │     │                                                    │              │
//! │     ╳ close                                              │              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The gateway speaks unframed XML. A reply is whatever one bounded read
//! returns, and success is decided by substring presence, not by parsing.

use quick_xml::escape::escape;
use tally_core::LampState;

/// Declaration line for every document. The gateway requires `version="2.0"`.
pub const XML_DECLARATION: &str = r#"<?xml version="2.0" encoding="UTF-8"?>"#;

/// Marker for an accepted request.
pub const RESULT_OK: &str = r#"result="Ok""#;

/// The gateway sometimes answers a function-value-change with a late
/// authentication indication instead of an explicit result.
pub const AUTH_INDICATION: &str = "<application-authentication-indication";

/// Size of the single read that makes up a reply.
pub const READ_BUFFER_SIZE: usize = 4096;

// =============================================================================
// Encoding
// =============================================================================

/// Encodes the authentication request naming this application.
pub fn encode_authentication_request(client_name: &str) -> String {
    format!(
        "{XML_DECLARATION}\n\
         <application-authentication-request xml-protocol=\"2.0\">\n  \
         <Name>{}</Name>\n\
         </application-authentication-request>",
        escape(client_name)
    )
}

/// Encodes a function-value-change for one lamp of one session.
pub fn encode_function_value_change(session_id: &str, function_id: u16, lamp: LampState) -> String {
    format!(
        "{XML_DECLARATION}\n\
         <function-value-change>\n  \
         <device>\n    \
         <sessionid>{}</sessionid>\n    \
         <function id=\"{function_id}\">\n      \
         <Value>{}</Value>\n    \
         </function>\n  \
         </device>\n\
         </function-value-change>",
        escape(session_id),
        lamp.protocol_value()
    )
}

// =============================================================================
// Replies
// =============================================================================

/// What one bounded read produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Bytes arrived (decoded lossily as UTF-8).
    Data(String),
    /// The peer closed without sending anything.
    Empty,
    /// Nothing arrived within the receive timeout.
    TimedOut,
}

impl Reply {
    /// Trimmed text of the reply, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Reply::Data(text) if !text.trim().is_empty() => Some(text.trim()),
            _ => None,
        }
    }
}

/// How a reply is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The gateway confirmed.
    Confirmed,
    /// No answer; treated as success because the gateway often stays silent.
    Assumed,
    /// The gateway answered with something other than a confirmation.
    Rejected,
}

/// Judges the reply to the authentication request.
///
/// Silence and empty reads count as provisional success. Any non-empty reply
/// without `result="Ok"` aborts the command.
pub fn judge_authentication(reply: &Reply) -> Verdict {
    match reply.text() {
        None => Verdict::Assumed,
        Some(text) if text.contains(RESULT_OK) => Verdict::Confirmed,
        Some(_) => Verdict::Rejected,
    }
}

/// Judges the reply to a function-value-change.
///
/// Only a timeout is optimistic here; an empty read or an unrecognized reply
/// fails the command.
pub fn judge_function_value_change(reply: &Reply) -> Verdict {
    match reply {
        Reply::TimedOut => Verdict::Assumed,
        Reply::Data(text) if text.contains(RESULT_OK) || text.contains(AUTH_INDICATION) => {
            Verdict::Confirmed
        }
        _ => Verdict::Rejected,
    }
}
