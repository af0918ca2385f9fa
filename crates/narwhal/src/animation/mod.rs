//! Snapshots taken around a render pass and the reconciliation that turns a pair of them into
//! transition directives.

mod diff;
mod snapshot;

pub use diff::{LinkTransition, NodeTransition, Transition, TransitionKind, reconcile};
pub use snapshot::{
    AnimationSnapshot, LinkSnapshot, NodeSnapshot, OverviewNode, OverviewSnapshot, SnapshotScope,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DiagramData, LinkData, NodeData};
    use crate::state::DiagramState;

    fn kinds(transitions: &[Transition]) -> Vec<TransitionKind> {
        transitions
            .iter()
            .filter(|t| t.is_link())
            .map(Transition::kind)
            .collect()
    }

    fn state() -> DiagramState {
        let mut state = DiagramState::default();
        state.load(DiagramData {
            nodes: vec![
                NodeData::new("A").with_children(vec![NodeData::new("B"), NodeData::new("B2")]),
                NodeData::new("D"),
                NodeData::new("E"),
            ],
            links: vec![
                LinkData::new("L1", "B", "D"),
                LinkData::new("L2", "B2", "D"),
                LinkData::new("L3", "D", "E"),
            ],
            expanded: vec!["A".into()],
        });
        state
    }

    #[test]
    fn collapse_merges_links_into_one_directive() {
        let mut state = state();
        let mut old = AnimationSnapshot::capture(&state, &SnapshotScope::Full);
        state.collapse("A").unwrap();
        let new = AnimationSnapshot::capture(&state, &SnapshotScope::Full);
        let t = reconcile(&mut old, &new);
        assert_eq!(
            kinds(&t),
            vec![TransitionKind::Collapse, TransitionKind::Update]
        );
        let Transition::Link(LinkTransition::Collapse { old: before, new: after }) = &t[3] else {
            panic!("expected a collapse, got {t:?}");
        };
        assert_eq!(before.len(), 2);
        assert_eq!(after.len(), 1);
        assert!(after[0].promoted);
    }

    #[test]
    fn expand_splits_an_aggregate_into_one_directive() {
        let mut state = state();
        state.collapse("A").unwrap();
        let mut old = AnimationSnapshot::capture(&state, &SnapshotScope::Full);
        state.expand("A").unwrap();
        let new = AnimationSnapshot::capture(&state, &SnapshotScope::Full);
        let t = reconcile(&mut old, &new);
        // Collapsing re-keyed the links: the untouched L3 now precedes the aggregate.
        assert_eq!(kinds(&t), vec![TransitionKind::Update, TransitionKind::Expand]);
        assert!(old.new_links().is_empty());
    }

    #[test]
    fn removed_links_are_deleted_and_added_ones_inserted() {
        let mut state = state();
        let mut old = AnimationSnapshot::capture(&state, &SnapshotScope::Full);
        state
            .apply_event(crate::events::DataEvent::Remove {
                parent_id: None,
                nodes: Vec::new(),
                links: vec!["L3".into()],
            })
            .unwrap();
        state
            .apply_event(crate::events::DataEvent::Add {
                parent_id: None,
                nodes: Vec::new(),
                links: vec![LinkData::new("L4", "E", "D")],
                index: None,
            })
            .unwrap();
        let new = AnimationSnapshot::capture(&state, &SnapshotScope::Full);
        let t = reconcile(&mut old, &new);
        assert_eq!(
            kinds(&t),
            vec![
                TransitionKind::Update,
                TransitionKind::Update,
                TransitionKind::Delete,
                TransitionKind::Insert
            ]
        );
        assert_eq!(old.new_links().len(), 1);
    }

    #[test]
    fn links_that_become_hidden_disappear_silently() {
        let mut state = DiagramState::default();
        state.load(DiagramData {
            nodes: vec![NodeData::new("A").with_children(vec![NodeData::new("B"), NodeData::new("C")])],
            links: vec![LinkData::new("inner", "B", "C")],
            expanded: vec!["A".into()],
        });
        let mut old = AnimationSnapshot::capture(&state, &SnapshotScope::Full);
        state.collapse("A").unwrap();
        let new = AnimationSnapshot::capture(&state, &SnapshotScope::Full);
        let t = reconcile(&mut old, &new);
        assert!(kinds(&t).is_empty());
    }

    #[test]
    fn nodes_match_by_id() {
        let mut state = state();
        let scope = state.collapse("A").unwrap();
        state.expand("A").unwrap();
        let mut old = AnimationSnapshot::capture(&state, &scope);
        state.collapse("A").unwrap();
        let new = AnimationSnapshot::capture(&state, &scope);
        let t = reconcile(&mut old, &new);
        let node_kinds: Vec<TransitionKind> = t
            .iter()
            .filter(|t| !t.is_link())
            .map(Transition::kind)
            .collect();
        // B and B2 go away, A stays.
        assert_eq!(
            node_kinds,
            vec![
                TransitionKind::Delete,
                TransitionKind::Delete,
                TransitionKind::Update
            ]
        );
        assert!(old.new_nodes().is_empty());
    }
}
