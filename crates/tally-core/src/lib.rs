//! # tally-core: Pure Tally Logic for the Tally Bridge
//!
//! Everything in this crate is deterministic and free of I/O. The sync engine
//! in `tally-sync` feeds it switcher snapshots and applies the transitions it
//! returns to the camera gateway.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Bridge Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Switcher (HTTP/XML, digest auth)                     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ SourceSnapshot                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  mapping  │  │   diff    │  │ validation│  │   │
//! │  │   │ SourceId  │  │ Source →  │  │  target   │  │ id format │  │   │
//! │  │   │ UnitId    │  │   Unit    │  │  vs state │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO SOCKETS • NO TIMERS • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ Vec<TallyTransition>                   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            Camera gateway (TCP/XML, per-unit sessions)          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Identifiers, snapshot, mapping, tally state, published status
//! - [`diff`] - The DiffEngine
//! - [`error`] - Domain error types
//! - [`validation`] - Identifier and mapping validation
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::diff::compute_transitions;
//! use tally_core::types::{CameraUnitMapping, SourceId, SourceSnapshot, TallyState, UnitId};
//!
//! let mut mapping = CameraUnitMapping::new();
//! mapping.insert(SourceId::new("input1").unwrap(), UnitId::new("XCU-08").unwrap());
//!
//! let snapshot = SourceSnapshot::new(vec![SourceId::new("input1").unwrap()], None);
//! let transitions = compute_transitions(&snapshot, &mapping, &TallyState::new());
//!
//! assert_eq!(transitions.len(), 1);
//! assert!(transitions[0].desired);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod diff;
pub mod error;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use diff::{apply_transitions, compute_transitions, prune_released, target_state};
pub use error::{CoreError, CoreResult, ValidationError};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a switcher source identifier (e.g. `input10`).
pub const MAX_SOURCE_ID_LEN: usize = 64;

/// Maximum length of a camera control unit identifier (e.g. `XCU-08`).
pub const MAX_UNIT_ID_LEN: usize = 32;
