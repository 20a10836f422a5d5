//! # Bridge Context
//!
//! The shared state of a running bridge, passed around as `Arc<BridgeContext>`.
//!
//! ## Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         BridgeContext                                   │
//! │                                                                         │
//! │  ┌───────────────────────────────┐   ┌─────────────────────────────┐   │
//! │  │ RwLock<EngineState>           │   │ RwLock<TallyStatus>         │   │
//! │  │  • mapping   (source → unit)  │   │  published after each cycle │   │
//! │  │  • committed (unit → r/g)     │   │                             │   │
//! │  └───────────────────────────────┘   └─────────────────────────────┘   │
//! │          ▲                 ▲                    ▲            │          │
//! │ replace_mapping()   commit() / settle()   publish()    status()        │
//! │  (mapping editor)    (dispatcher)         (scheduler)   (status page)   │
//! │                                                                         │
//! │  GatewaySessions: fixed at startup, read without locking                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Mapping and committed state share one lock, so a cycle always diffs a
//! mapping against the state that belongs to it.

use std::collections::BTreeMap;

use tally_core::diff::prune_released;
use tally_core::validation::validate_mapping;
use tally_core::{
    CameraUnitMapping, GatewaySessions, MappingChange, TallyState, TallyStatus, TallyTransition,
    UnitId, ValidationError,
};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Mapping plus the committed lamp state derived from it.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    pub mapping: CameraUnitMapping,
    pub committed: TallyState,
}

/// Shared context of a running bridge.
#[derive(Debug)]
pub struct BridgeContext {
    engine: RwLock<EngineState>,
    status: RwLock<TallyStatus>,
    sessions: GatewaySessions,
}

impl BridgeContext {
    /// Creates a context with every mapped unit believed dark.
    pub fn new(mapping: CameraUnitMapping, sessions: GatewaySessions) -> Self {
        let committed = TallyState::seeded(&mapping);
        BridgeContext {
            engine: RwLock::new(EngineState { mapping, committed }),
            status: RwLock::new(TallyStatus::default()),
            sessions,
        }
    }

    // =========================================================================
    // Read Operations
    // =========================================================================

    /// The most recently published status.
    pub async fn status(&self) -> TallyStatus {
        self.status.read().await.clone()
    }

    pub async fn mapping(&self) -> CameraUnitMapping {
        self.engine.read().await.mapping.clone()
    }

    /// Copy of the committed lamp belief.
    pub async fn tally_state(&self) -> TallyState {
        self.engine.read().await.committed.clone()
    }

    pub fn sessions(&self) -> &GatewaySessions {
        &self.sessions
    }

    /// Mapping and committed state taken under one guard.
    pub async fn engine_snapshot(&self) -> EngineState {
        self.engine.read().await.clone()
    }

    // =========================================================================
    // Write Operations
    // =========================================================================

    /// Replaces the mapping with a validated copy of `raw`.
    ///
    /// Invalid input leaves everything untouched. Added units get dark
    /// entries; removed units keep theirs until the next cycle has confirmed
    /// their lamps off. Removed units that are already dark are dropped now.
    pub async fn replace_mapping(
        &self,
        raw: &BTreeMap<String, String>,
    ) -> Result<MappingChange, ValidationError> {
        let next = validate_mapping(raw)?;

        let mut engine = self.engine.write().await;
        let change = engine.mapping.change_to(&next);

        for unit in &change.added {
            engine.committed.ensure(unit);
        }
        engine.mapping = next;

        let EngineState { mapping, committed } = &mut *engine;
        let released = prune_released(committed, mapping);

        info!(
            sources = engine.mapping.len(),
            added = change.added.len(),
            removed = change.removed.len(),
            changed = change.changed.len(),
            released = released.len(),
            "Camera mapping replaced"
        );

        Ok(change)
    }

    /// Records one confirmed lamp change.
    pub async fn commit(&self, transition: &TallyTransition) {
        self.engine
            .write()
            .await
            .committed
            .commit(&transition.unit, transition.color, transition.desired);
    }

    /// Drops dark entries for unmapped units and makes sure every mapped unit
    /// has an entry. Returns the dropped units.
    pub async fn settle(&self) -> Vec<UnitId> {
        let mut engine = self.engine.write().await;
        let EngineState { mapping, committed } = &mut *engine;

        for unit in mapping.units() {
            committed.ensure(&unit);
        }

        let released = prune_released(committed, mapping);
        if !released.is_empty() {
            debug!(units = ?released, "Released unmapped units");
        }
        released
    }

    /// Replaces the published status.
    pub async fn publish(&self, status: TallyStatus) {
        *self.status.write().await = status;
    }
}
