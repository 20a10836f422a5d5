//! # DiffEngine
//!
//! Turns a switcher snapshot into the minimal list of lamp changes.
//!
//! ## Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   SourceSnapshot ──┐                                                    │
//! │                    ├──► target_state ──┐                                │
//! │   Mapping ─────────┘   (all mapped     │                                │
//! │                         units, red /   ├──► per unit, per color:        │
//! │                         green folded)  │      target != committed       │
//! │                                        │        → TallyTransition       │
//! │   TallyState (committed) ──────────────┘                                │
//! │                                                                         │
//! │   Units only in TallyState (unmapped) target all-off.                   │
//! │   Output order: unit id ascending, red before green.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here touches the network. The dispatcher applies transitions one by
//! one and commits each success back into [`TallyState`].

use std::collections::BTreeSet;

use crate::types::{
    CameraUnitMapping, SourceSnapshot, TallyColor, TallyState, TallyTransition, UnitId,
};

/// Lamp state the mapping says every unit should show for `snapshot`.
///
/// Every mapped unit gets an entry, dark unless one of its sources is on
/// program (red) or is the preview source (green). Unmapped sources are
/// ignored.
pub fn target_state(snapshot: &SourceSnapshot, mapping: &CameraUnitMapping) -> TallyState {
    let mut target = TallyState::seeded(mapping);

    for source in &snapshot.program_sources {
        if let Some(unit) = mapping.get(source) {
            target.commit(unit, TallyColor::Red, true);
        }
    }

    if let Some(unit) = snapshot
        .preview_source
        .as_ref()
        .and_then(|source| mapping.get(source))
    {
        target.commit(unit, TallyColor::Green, true);
    }

    target
}

/// Computes the transitions needed to move `committed` to the target for
/// `snapshot`.
///
/// Units in `committed` that the mapping no longer references are driven dark.
/// Units missing from `committed` are assumed dark.
pub fn compute_transitions(
    snapshot: &SourceSnapshot,
    mapping: &CameraUnitMapping,
    committed: &TallyState,
) -> Vec<TallyTransition> {
    let target = target_state(snapshot, mapping);

    let units: BTreeSet<&UnitId> = target.units().chain(committed.units()).collect();

    let mut transitions = Vec::new();
    for unit in units {
        for color in TallyColor::DRIVEN {
            let desired = target.lamp(unit, color);
            if desired != committed.lamp(unit, color) {
                transitions.push(TallyTransition::new(unit.clone(), color, desired));
            }
        }
    }

    transitions
}

/// Commits every transition into `state`, as if the gateway accepted all of
/// them.
pub fn apply_transitions(state: &mut TallyState, transitions: &[TallyTransition]) {
    for transition in transitions {
        state.commit(&transition.unit, transition.color, transition.desired);
    }
}

/// Drops entries for units that are both unmapped and dark.
///
/// Returns the pruned units. Unmapped units with a lit color are kept until
/// their off command has been confirmed.
pub fn prune_released(state: &mut TallyState, mapping: &CameraUnitMapping) -> Vec<UnitId> {
    let mapped = mapping.units();
    let released: Vec<UnitId> = state
        .iter()
        .filter(|(unit, tally)| !mapped.contains(*unit) && tally.is_dark())
        .map(|(unit, _)| unit.clone())
        .collect();

    for unit in &released {
        state.remove(unit);
    }

    released
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SourceId, UnitTally};

    fn source(id: &str) -> SourceId {
        SourceId::new(id).unwrap()
    }

    fn unit(id: &str) -> UnitId {
        UnitId::new(id).unwrap()
    }

    fn mapping(pairs: &[(&str, &str)]) -> CameraUnitMapping {
        pairs.iter().map(|(s, u)| (source(s), unit(u))).collect()
    }

    fn snapshot(program: &[&str], preview: Option<&str>) -> SourceSnapshot {
        SourceSnapshot::new(program.iter().map(|s| source(s)).collect(), preview.map(source))
    }

    #[test]
    fn test_program_and_preview_scenario() {
        let mapping = mapping(&[("input1", "UNIT-A"), ("input2", "UNIT-B")]);
        let snap = snapshot(&["input1"], Some("input2"));
        let committed = TallyState::seeded(&mapping);

        let transitions = compute_transitions(&snap, &mapping, &committed);

        assert_eq!(
            transitions,
            vec![
                TallyTransition::new(unit("UNIT-A"), TallyColor::Red, true),
                TallyTransition::new(unit("UNIT-B"), TallyColor::Green, true),
            ]
        );
    }

    #[test]
    fn test_converged_state_is_idempotent() {
        let mapping = mapping(&[("input1", "UNIT-A"), ("input2", "UNIT-B")]);
        let snap = snapshot(&["input1"], Some("input2"));
        let mut committed = TallyState::seeded(&mapping);

        let first = compute_transitions(&snap, &mapping, &committed);
        apply_transitions(&mut committed, &first);

        assert!(compute_transitions(&snap, &mapping, &committed).is_empty());
    }

    #[test]
    fn test_applying_transitions_converges_to_target() {
        let mapping = mapping(&[
            ("input1", "UNIT-A"),
            ("input2", "UNIT-B"),
            ("input3", "UNIT-C"),
        ]);
        let mut device: TallyState = [
            (unit("UNIT-A"), UnitTally { red: false, green: true }),
            (unit("UNIT-B"), UnitTally { red: true, green: false }),
            (unit("UNIT-Z"), UnitTally { red: true, green: true }),
        ]
        .into_iter()
        .collect();

        let snap = snapshot(&["input1", "input3"], Some("input2"));
        let transitions = compute_transitions(&snap, &mapping, &device);
        apply_transitions(&mut device, &transitions);
        prune_released(&mut device, &mapping);

        assert_eq!(device, target_state(&snap, &mapping));
    }

    #[test]
    fn test_many_to_one_keeps_red_until_all_sources_leave() {
        let mapping = mapping(&[("input1", "UNIT-A"), ("input2", "UNIT-A")]);
        let mut committed = TallyState::seeded(&mapping);

        let both = snapshot(&["input1", "input2"], None);
        let transitions = compute_transitions(&both, &mapping, &committed);
        assert_eq!(transitions.len(), 1);
        apply_transitions(&mut committed, &transitions);

        let one_left = snapshot(&["input2"], None);
        assert!(compute_transitions(&one_left, &mapping, &committed).is_empty());

        let none = snapshot(&[], None);
        assert_eq!(
            compute_transitions(&none, &mapping, &committed),
            vec![TallyTransition::new(unit("UNIT-A"), TallyColor::Red, false)]
        );
    }

    #[test]
    fn test_removed_unit_is_driven_dark_once() {
        let before = mapping(&[("input1", "UNIT-A"), ("input2", "UNIT-B")]);
        let mut committed = TallyState::seeded(&before);
        committed.commit(&unit("UNIT-B"), TallyColor::Red, true);
        committed.commit(&unit("UNIT-B"), TallyColor::Green, true);

        let after = mapping(&[("input1", "UNIT-A")]);
        let snap = snapshot(&["input2"], Some("input2"));

        let transitions = compute_transitions(&snap, &after, &committed);
        assert_eq!(
            transitions,
            vec![
                TallyTransition::new(unit("UNIT-B"), TallyColor::Red, false),
                TallyTransition::new(unit("UNIT-B"), TallyColor::Green, false),
            ]
        );

        apply_transitions(&mut committed, &transitions);
        assert_eq!(prune_released(&mut committed, &after), vec![unit("UNIT-B")]);
        assert!(compute_transitions(&snap, &after, &committed).is_empty());
    }

    #[test]
    fn test_removed_dark_unit_emits_nothing() {
        let before = mapping(&[("input1", "UNIT-A"), ("input2", "UNIT-B")]);
        let committed = TallyState::seeded(&before);
        let after = mapping(&[("input1", "UNIT-A")]);

        assert!(compute_transitions(&snapshot(&[], None), &after, &committed).is_empty());
    }

    #[test]
    fn test_unmapped_sources_are_ignored() {
        let mapping = mapping(&[("input1", "UNIT-A")]);
        let snap = snapshot(&["input7"], Some("input8"));

        assert!(compute_transitions(&snap, &mapping, &TallyState::new()).is_empty());
    }

    #[test]
    fn test_units_emitted_in_sorted_order_red_first() {
        let mapping = mapping(&[("input1", "UNIT-B"), ("input2", "UNIT-A")]);
        let snap = snapshot(&["input1", "input2"], Some("input1"));

        let order: Vec<String> = compute_transitions(&snap, &mapping, &TallyState::new())
            .iter()
            .map(|t| t.to_string())
            .collect();

        assert_eq!(order, vec!["UNIT-A red on", "UNIT-B red on", "UNIT-B green on"]);
    }

    #[test]
    fn test_prune_keeps_lit_and_mapped_units() {
        let mapping = mapping(&[("input1", "UNIT-A")]);
        let mut state: TallyState = [
            (unit("UNIT-A"), UnitTally::default()),
            (unit("UNIT-B"), UnitTally { red: true, green: false }),
            (unit("UNIT-C"), UnitTally::default()),
        ]
        .into_iter()
        .collect();

        assert_eq!(prune_released(&mut state, &mapping), vec![unit("UNIT-C")]);
        assert!(state.contains(&unit("UNIT-A")));
        assert!(state.contains(&unit("UNIT-B")));
    }
}
