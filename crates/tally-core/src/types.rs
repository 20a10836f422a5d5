//! # Domain Types
//!
//! Core domain types used throughout the tally bridge.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  SWITCHER SIDE                       GATEWAY SIDE                       │
//! │  ┌─────────────────┐                 ┌─────────────────┐               │
//! │  │ SourceSnapshot  │                 │ GatewaySessions │               │
//! │  │  program: [Id]  │                 │  UnitId →       │               │
//! │  │  preview: Id?   │                 │    SessionId    │               │
//! │  │  fetched_at     │                 └─────────────────┘               │
//! │  └────────┬────────┘                 ┌─────────────────┐               │
//! │           │                          │  TallyColor     │               │
//! │  ┌────────▼────────┐                 │  red    = 8215  │               │
//! │  │CameraUnitMapping│                 │  green  = 8216  │               │
//! │  │ SourceId → Unit │                 │  yellow = 8217  │               │
//! │  └────────┬────────┘                 └─────────────────┘               │
//! │           │                                                             │
//! │  ┌────────▼────────┐     diff     ┌──────────────────┐                 │
//! │  │   TallyState    │ ───────────► │ TallyTransition  │                 │
//! │  │ Unit → {r, g}   │              │ unit,color,desired│                │
//! │  └─────────────────┘              └──────────────────┘                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `TallyState` is a belief, not a reading: the gateway offers no way to query
//! lamp state, so the bridge remembers what it last confirmed.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, ValidationError};
use crate::validation::{validate_source_id, validate_unit_id};

// =============================================================================
// Identifiers
// =============================================================================

/// A switcher input identifier, always lowercase (`input8`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SourceId(String);

impl SourceId {
    /// Creates a validated source id.
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        validate_source_id(raw).map(SourceId)
    }

    /// Normalizes an identifier reported by the switcher without validating it.
    ///
    /// Unexpected spellings simply never match a mapping key.
    pub fn from_switcher(raw: &str) -> Self {
        SourceId(raw.trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SourceId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        SourceId::new(&value)
    }
}

impl From<SourceId> for String {
    fn from(id: SourceId) -> Self {
        id.0
    }
}

/// A camera control unit identifier as the gateway vendor spells it (`XCU-08`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UnitId(String);

impl UnitId {
    /// Creates a validated unit id.
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        validate_unit_id(raw).map(UnitId)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UnitId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        UnitId::new(&value)
    }
}

impl From<UnitId> for String {
    fn from(id: UnitId) -> Self {
        id.0
    }
}

/// Gateway-assigned session identifier (the base station serial, e.g. `PH3XQD`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(raw: impl Into<String>) -> Self {
        SessionId(raw.into().trim().to_string())
    }

    /// The empty session id sent for units missing from the session table.
    pub fn empty() -> Self {
        SessionId(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Tally Colors
// =============================================================================

/// A tally lamp color and its gateway function id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TallyColor {
    /// Program (on air).
    Red,
    /// Preview (next up).
    Green,
    /// Supported by the gateway; never driven by the sync cycle.
    Yellow,
}

impl TallyColor {
    /// Colors driven by the sync cycle, in emission order.
    pub const DRIVEN: [TallyColor; 2] = [TallyColor::Red, TallyColor::Green];

    /// Gateway function id for this color.
    pub const fn function_id(&self) -> u16 {
        match self {
            TallyColor::Red => 8215,
            TallyColor::Green => 8216,
            TallyColor::Yellow => 8217,
        }
    }
}

impl fmt::Display for TallyColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TallyColor::Red => write!(f, "red"),
            TallyColor::Green => write!(f, "green"),
            TallyColor::Yellow => write!(f, "yellow"),
        }
    }
}

impl std::str::FromStr for TallyColor {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "red" | "program" => Ok(TallyColor::Red),
            "green" | "preview" => Ok(TallyColor::Green),
            "yellow" => Ok(TallyColor::Yellow),
            other => Err(CoreError::UnknownColor(other.to_string())),
        }
    }
}

/// Lamp on/off as the gateway encodes it (`1` / `0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LampState {
    On,
    Off,
}

impl LampState {
    /// Value written into `<Value>` of a function-value-change.
    pub const fn protocol_value(&self) -> u8 {
        match self {
            LampState::On => 1,
            LampState::Off => 0,
        }
    }

    pub const fn is_on(&self) -> bool {
        matches!(self, LampState::On)
    }
}

impl From<bool> for LampState {
    fn from(on: bool) -> Self {
        if on {
            LampState::On
        } else {
            LampState::Off
        }
    }
}

impl fmt::Display for LampState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LampState::On => write!(f, "on"),
            LampState::Off => write!(f, "off"),
        }
    }
}

impl std::str::FromStr for LampState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "on" | "1" | "true" => Ok(LampState::On),
            "off" | "0" | "false" => Ok(LampState::Off),
            other => Err(CoreError::InvalidLampState(other.to_string())),
        }
    }
}

// =============================================================================
// Switcher Snapshot
// =============================================================================

/// Program/preview state as read from the switcher in one cycle.
///
/// Built fresh every cycle and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSnapshot {
    /// Sources on program, in document order. May contain duplicates.
    pub program_sources: Vec<SourceId>,

    /// The source on preview. Last claimant in document order.
    pub preview_source: Option<SourceId>,

    /// When the snapshot was taken.
    pub fetched_at: DateTime<Utc>,
}

impl SourceSnapshot {
    /// Creates a snapshot stamped with the current time.
    pub fn new(program_sources: Vec<SourceId>, preview_source: Option<SourceId>) -> Self {
        Self::at(program_sources, preview_source, Utc::now())
    }

    pub fn at(
        program_sources: Vec<SourceId>,
        preview_source: Option<SourceId>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        SourceSnapshot {
            program_sources,
            preview_source,
            fetched_at,
        }
    }

    /// Snapshot with nothing on program or preview.
    pub fn empty() -> Self {
        Self::new(Vec::new(), None)
    }

    pub fn is_empty(&self) -> bool {
        self.program_sources.is_empty() && self.preview_source.is_none()
    }
}

/// Display labels for switcher inputs. Cosmetic only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLabels(BTreeMap<SourceId, String>);

impl SourceLabels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: SourceId, label: impl Into<String>) {
        self.0.insert(source, label.into());
    }

    /// Label for a source, falling back to the identifier itself.
    pub fn label_for<'a>(&'a self, source: &'a SourceId) -> &'a str {
        self.0
            .get(source)
            .map(String::as_str)
            .unwrap_or_else(|| source.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// =============================================================================
// Camera → Unit Mapping
// =============================================================================

/// Which camera control unit each switcher source lights up.
///
/// Several sources may map to the same unit (e.g. an iso and a clean feed of
/// the same camera).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CameraUnitMapping(BTreeMap<SourceId, UnitId>);

impl CameraUnitMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: SourceId, unit: UnitId) -> Option<UnitId> {
        self.0.insert(source, unit)
    }

    pub fn get(&self, source: &SourceId) -> Option<&UnitId> {
        self.0.get(source)
    }

    pub fn contains_source(&self, source: &SourceId) -> bool {
        self.0.contains_key(source)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SourceId, &UnitId)> {
        self.0.iter()
    }

    /// Distinct units referenced by the mapping, sorted.
    pub fn units(&self) -> BTreeSet<UnitId> {
        self.0.values().cloned().collect()
    }

    /// Sources mapped to `unit`, sorted.
    pub fn sources_for(&self, unit: &UnitId) -> BTreeSet<SourceId> {
        self.0
            .iter()
            .filter(|(_, u)| *u == unit)
            .map(|(s, _)| s.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compares this (current) mapping against a replacement, per unit.
    pub fn change_to(&self, next: &CameraUnitMapping) -> MappingChange {
        let before = self.units();
        let after = next.units();

        let added = after.difference(&before).cloned().collect();
        let removed = before.difference(&after).cloned().collect();
        let changed = before
            .intersection(&after)
            .filter(|unit| self.sources_for(unit) != next.sources_for(unit))
            .cloned()
            .collect();

        MappingChange {
            added,
            removed,
            changed,
        }
    }
}

impl FromIterator<(SourceId, UnitId)> for CameraUnitMapping {
    fn from_iter<T: IntoIterator<Item = (SourceId, UnitId)>>(iter: T) -> Self {
        CameraUnitMapping(iter.into_iter().collect())
    }
}

/// Units affected by a mapping replacement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingChange {
    /// Units that were not mapped before.
    pub added: BTreeSet<UnitId>,
    /// Units no longer referenced by any source.
    pub removed: BTreeSet<UnitId>,
    /// Units still mapped but from a different set of sources.
    pub changed: BTreeSet<UnitId>,
}

impl MappingChange {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    /// Every unit touched by the change.
    pub fn affected(&self) -> BTreeSet<UnitId> {
        self.added
            .iter()
            .chain(&self.removed)
            .chain(&self.changed)
            .cloned()
            .collect()
    }
}

// =============================================================================
// Tally State
// =============================================================================

/// Red/green lamp belief for one unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UnitTally {
    pub red: bool,
    pub green: bool,
}

impl UnitTally {
    /// Yellow is never tracked and always reads as off.
    pub fn get(&self, color: TallyColor) -> bool {
        match color {
            TallyColor::Red => self.red,
            TallyColor::Green => self.green,
            TallyColor::Yellow => false,
        }
    }

    pub fn set(&mut self, color: TallyColor, on: bool) {
        match color {
            TallyColor::Red => self.red = on,
            TallyColor::Green => self.green = on,
            TallyColor::Yellow => {}
        }
    }

    /// Both lamps off.
    pub fn is_dark(&self) -> bool {
        !self.red && !self.green
    }
}

/// Committed lamp state per unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TallyState(BTreeMap<UnitId, UnitTally>);

impl TallyState {
    pub fn new() -> Self {
        Self::default()
    }

    /// All-off entries for every unit in the mapping.
    pub fn seeded(mapping: &CameraUnitMapping) -> Self {
        TallyState(
            mapping
                .units()
                .into_iter()
                .map(|unit| (unit, UnitTally::default()))
                .collect(),
        )
    }

    pub fn get(&self, unit: &UnitId) -> Option<&UnitTally> {
        self.0.get(unit)
    }

    /// Lamp belief for a unit, treating unknown units as dark.
    pub fn lamp(&self, unit: &UnitId, color: TallyColor) -> bool {
        self.0.get(unit).map(|t| t.get(color)).unwrap_or(false)
    }

    /// Records a confirmed lamp change.
    pub fn commit(&mut self, unit: &UnitId, color: TallyColor, on: bool) {
        self.0.entry(unit.clone()).or_default().set(color, on);
    }

    /// Inserts an all-off entry unless one exists.
    pub fn ensure(&mut self, unit: &UnitId) {
        self.0.entry(unit.clone()).or_default();
    }

    pub fn remove(&mut self, unit: &UnitId) -> Option<UnitTally> {
        self.0.remove(unit)
    }

    pub fn contains(&self, unit: &UnitId) -> bool {
        self.0.contains_key(unit)
    }

    pub fn units(&self) -> impl Iterator<Item = &UnitId> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UnitId, &UnitTally)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(UnitId, UnitTally)> for TallyState {
    fn from_iter<T: IntoIterator<Item = (UnitId, UnitTally)>>(iter: T) -> Self {
        TallyState(iter.into_iter().collect())
    }
}

/// One lamp change the gateway must make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallyTransition {
    pub unit: UnitId,
    pub color: TallyColor,
    pub desired: bool,
}

impl TallyTransition {
    pub fn new(unit: UnitId, color: TallyColor, desired: bool) -> Self {
        TallyTransition {
            unit,
            color,
            desired,
        }
    }

    pub fn lamp(&self) -> LampState {
        LampState::from(self.desired)
    }
}

impl fmt::Display for TallyTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.unit, self.color, self.lamp())
    }
}

// =============================================================================
// Gateway Sessions
// =============================================================================

/// How a command's session id was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionResolution {
    /// Found in the session table.
    Resolved(SessionId),
    /// Supplied explicitly by the caller.
    Override(SessionId),
    /// Unit missing from the table; the empty session id is sent.
    Unresolved(UnitId),
}

impl SessionResolution {
    /// The session id written on the wire.
    pub fn session_id(&self) -> &str {
        match self {
            SessionResolution::Resolved(id) | SessionResolution::Override(id) => id.as_str(),
            SessionResolution::Unresolved(_) => "",
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, SessionResolution::Unresolved(_))
    }
}

/// Static `unit → session` table for the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewaySessions(BTreeMap<UnitId, SessionId>);

impl GatewaySessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, unit: UnitId, session: SessionId) {
        self.0.insert(unit, session);
    }

    pub fn resolve(&self, unit: &UnitId) -> SessionResolution {
        match self.0.get(unit) {
            Some(session) if !session.is_empty() => SessionResolution::Resolved(session.clone()),
            _ => SessionResolution::Unresolved(unit.clone()),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UnitId, &SessionId)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(UnitId, SessionId)> for GatewaySessions {
    fn from_iter<T: IntoIterator<Item = (UnitId, SessionId)>>(iter: T) -> Self {
        GatewaySessions(iter.into_iter().collect())
    }
}

// =============================================================================
// Published Status
// =============================================================================

/// Connectivity summary shown to operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityStatus {
    /// No cycle has completed yet.
    NotConnected,
    /// Last cycle fetched and dispatched everything.
    Connected,
    /// Switcher reachable but some gateway commands failed.
    Degraded { failed: usize, attempted: usize },
    /// The cycle failed before dispatching.
    Error(String),
}

impl fmt::Display for ConnectivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectivityStatus::NotConnected => write!(f, "Not Connected"),
            ConnectivityStatus::Connected => write!(f, "Connected"),
            ConnectivityStatus::Degraded { failed, attempted } => {
                write!(f, "Degraded: {failed} of {attempted} tally commands failed")
            }
            ConnectivityStatus::Error(message) => write!(f, "Error: {message}"),
        }
    }
}

/// A source with its display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SourceRef {
    pub id: String,
    pub label: String,
}

impl SourceRef {
    pub fn labelled(source: &SourceId, labels: &SourceLabels) -> Self {
        SourceRef {
            id: source.to_string(),
            label: labels.label_for(source).to_string(),
        }
    }
}

/// Read-only status published after every cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TallyStatus {
    pub program_sources: Vec<SourceRef>,

    pub preview_source: Option<SourceRef>,

    /// When the published snapshot was taken.
    #[ts(as = "Option<String>")]
    pub last_update: Option<DateTime<Utc>>,

    pub status: String,
}

impl Default for TallyStatus {
    fn default() -> Self {
        TallyStatus {
            program_sources: Vec::new(),
            preview_source: None,
            last_update: None,
            status: ConnectivityStatus::NotConnected.to_string(),
        }
    }
}

impl TallyStatus {
    pub fn from_snapshot(
        snapshot: &SourceSnapshot,
        labels: &SourceLabels,
        status: &ConnectivityStatus,
    ) -> Self {
        TallyStatus {
            program_sources: snapshot
                .program_sources
                .iter()
                .map(|s| SourceRef::labelled(s, labels))
                .collect(),
            preview_source: snapshot
                .preview_source
                .as_ref()
                .map(|s| SourceRef::labelled(s, labels)),
            last_update: Some(snapshot.fetched_at),
            status: status.to_string(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn source(id: &str) -> SourceId {
        SourceId::new(id).unwrap()
    }

    fn unit(id: &str) -> UnitId {
        UnitId::new(id).unwrap()
    }

    #[test]
    fn test_function_ids() {
        assert_eq!(TallyColor::Red.function_id(), 8215);
        assert_eq!(TallyColor::Green.function_id(), 8216);
        assert_eq!(TallyColor::Yellow.function_id(), 8217);
    }

    #[test]
    fn test_color_and_lamp_parsing() {
        assert_eq!("RED".parse::<TallyColor>().unwrap(), TallyColor::Red);
        assert_eq!("preview".parse::<TallyColor>().unwrap(), TallyColor::Green);
        assert!("blue".parse::<TallyColor>().is_err());

        assert_eq!("on".parse::<LampState>().unwrap(), LampState::On);
        assert_eq!("Off".parse::<LampState>().unwrap().protocol_value(), 0);
        assert!("maybe".parse::<LampState>().is_err());
    }

    #[test]
    fn test_source_id_normalization() {
        assert_eq!(source("Input8").as_str(), "input8");
        assert_eq!(SourceId::from_switcher(" INPUT9 ").as_str(), "input9");
    }

    #[test]
    fn test_labels_fall_back_to_id() {
        let mut labels = SourceLabels::new();
        labels.insert(source("input1"), "Cam 1");

        assert_eq!(labels.label_for(&source("input1")), "Cam 1");
        assert_eq!(labels.label_for(&source("input2")), "input2");
    }

    #[test]
    fn test_session_resolution() {
        let sessions: GatewaySessions =
            [(unit("XCU-08"), SessionId::new("PH3XQD"))].into_iter().collect();

        assert_eq!(
            sessions.resolve(&unit("XCU-08")),
            SessionResolution::Resolved(SessionId::new("PH3XQD"))
        );

        let missing = sessions.resolve(&unit("XCU-99"));
        assert!(missing.is_unresolved());
        assert_eq!(missing.session_id(), "");
    }

    #[test]
    fn test_mapping_change() {
        let before: CameraUnitMapping = [
            (source("input1"), unit("A")),
            (source("input2"), unit("B")),
            (source("input3"), unit("C")),
        ]
        .into_iter()
        .collect();
        let after: CameraUnitMapping = [
            (source("input1"), unit("A")),
            (source("input3"), unit("B")),
            (source("input4"), unit("D")),
        ]
        .into_iter()
        .collect();

        let change = before.change_to(&after);
        assert_eq!(change.added, [unit("D")].into_iter().collect());
        assert_eq!(change.removed, [unit("C")].into_iter().collect());
        assert_eq!(change.changed, [unit("B")].into_iter().collect());
        assert_eq!(change.affected().len(), 3);
        assert!(before.change_to(&before).is_empty());
    }

    #[test]
    fn test_tally_state_commit() {
        let mut state = TallyState::new();
        state.commit(&unit("A"), TallyColor::Red, true);
        state.commit(&unit("A"), TallyColor::Yellow, true);

        assert!(state.lamp(&unit("A"), TallyColor::Red));
        assert!(!state.lamp(&unit("A"), TallyColor::Green));
        assert!(!state.lamp(&unit("A"), TallyColor::Yellow));
        assert!(!state.lamp(&unit("B"), TallyColor::Red));
    }

    #[test]
    fn test_status_json_shape() {
        let mut labels = SourceLabels::new();
        labels.insert(source("input1"), "Cam 1");
        let snapshot = SourceSnapshot::new(vec![source("input1")], Some(source("input2")));

        let status = TallyStatus::from_snapshot(&snapshot, &labels, &ConnectivityStatus::Connected);
        let json = serde_json::to_value(&status).unwrap();

        assert_eq!(json["programSources"][0]["label"], "Cam 1");
        assert_eq!(json["previewSource"]["id"], "input2");
        assert_eq!(json["previewSource"]["label"], "input2");
        assert_eq!(json["status"], "Connected");
        assert!(json["lastUpdate"].is_string());
    }

    #[test]
    fn test_connectivity_status_strings() {
        assert_eq!(TallyStatus::default().status, "Not Connected");
        assert_eq!(
            ConnectivityStatus::Degraded {
                failed: 1,
                attempted: 3
            }
            .to_string(),
            "Degraded: 1 of 3 tally commands failed"
        );
        assert_eq!(
            ConnectivityStatus::Error("timeout".into()).to_string(),
            "Error: timeout"
        );
    }
}
