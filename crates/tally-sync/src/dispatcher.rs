//! # Command Dispatcher
//!
//! Applies one cycle's transitions to the gateway, strictly in order.
//!
//! ```text
//! transitions ──► for each: send ──► ok?  ── yes ──► commit to BridgeContext
//!                                         └─ no ───► leave state alone
//!                                                    (next cycle recomputes it)
//! ```
//!
//! There is no retry, backoff or limit here. A failed transition is simply
//! still a difference on the next cycle and gets emitted again.

use std::sync::Arc;

use tally_core::{ConnectivityStatus, TallyTransition};
use tracing::{debug, warn};

use crate::context::BridgeContext;
use crate::gateway::{TallyCommand, TallyCommandSender};

/// Counts for one dispatch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    /// Connectivity summary for a cycle whose fetch succeeded.
    pub fn connectivity(&self) -> ConnectivityStatus {
        if self.is_clean() {
            ConnectivityStatus::Connected
        } else {
            ConnectivityStatus::Degraded {
                failed: self.failed,
                attempted: self.attempted,
            }
        }
    }
}

/// Sequential transition applier.
#[derive(Clone)]
pub struct CommandDispatcher {
    sender: Arc<dyn TallyCommandSender>,
}

impl CommandDispatcher {
    pub fn new(sender: Arc<dyn TallyCommandSender>) -> Self {
        CommandDispatcher { sender }
    }

    /// Sends every transition, committing each confirmed one immediately.
    pub async fn dispatch(
        &self,
        transitions: &[TallyTransition],
        context: &BridgeContext,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();

        for transition in transitions {
            report.attempted += 1;
            let command = TallyCommand::from_transition(transition, context.sessions());

            match self.sender.send(&command).await {
                Ok(outcome) => {
                    context.commit(transition).await;
                    report.succeeded += 1;
                    debug!(transition = %transition, ?outcome, "Committed tally transition");
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(transition = %transition, error = %e, "Tally transition not applied");
                }
            }
        }

        report
    }
}
