//! Promoted links.
//!
//! A data link whose endpoint is hidden inside a collapsed container is drawn between the
//! nearest visible ancestors of its endpoints instead. Every hidden link that resolves to the
//! same ordered pair of visible nodes shares one aggregate record keyed by that pair.
//! Classification is per data link and incremental: callers pass the ids whose classification
//! may have changed, and links whose classification did not change keep their records.

use crate::config::PromotedLinkBehavior;
use crate::model::{Connectivity, LinkBacking, LinkData, LinkId, LinkRecord};
use crate::state::{DataSource, DataTree, DiagramState, IdSet, NodeMap};
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// Neither endpoint is visible and nothing is collapsed.
    Inert,
    /// A hidden endpoint is not inside any collapsed container.
    Unresolvable,
    /// Both endpoints resolve to the same visible node.
    Interior,
}

/// How a data link is currently shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Promotion {
    Direct,
    /// Aggregated into the promoted record with this id.
    Promoted(LinkId),
    /// Would be promoted, but promoted links are switched off.
    Hidden,
    Discarded(DiscardReason),
}

impl Promotion {
    /// `true` for links that stand behind a hidden endpoint, drawn or not.
    pub fn is_promoted(&self) -> bool {
        matches!(self, Promotion::Promoted(_) | Promotion::Hidden)
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self, Promotion::Direct | Promotion::Promoted(_))
    }
}

/// Classifies links against a set of visible records and collapsed containers.
pub struct PromotedLinkResolver<'a> {
    data: &'a DataTree,
    visible: &'a NodeMap,
    collapsed: &'a IdSet,
    behavior: PromotedLinkBehavior,
}

impl<'a> PromotedLinkResolver<'a> {
    pub(crate) fn new(
        data: &'a DataTree,
        visible: &'a NodeMap,
        collapsed: &'a IdSet,
        behavior: PromotedLinkBehavior,
    ) -> Self {
        Self {
            data,
            visible,
            collapsed,
            behavior,
        }
    }

    pub fn classify(&self, start: &str, end: &str) -> Promotion {
        let start_visible = self.visible.contains_key(start);
        let end_visible = self.visible.contains_key(end);
        if start_visible && end_visible {
            return Promotion::Direct;
        }
        if !start_visible && !end_visible && self.collapsed.is_empty() {
            return Promotion::Discarded(DiscardReason::Inert);
        }
        if self.behavior == PromotedLinkBehavior::None {
            return Promotion::Hidden;
        }
        let start = if start_visible {
            Some(start)
        } else {
            self.visible_ancestor(start)
        };
        let end = if end_visible {
            Some(end)
        } else {
            self.visible_ancestor(end)
        };
        match (start, end) {
            (Some(s), Some(e)) if s == e => Promotion::Discarded(DiscardReason::Interior),
            (Some(s), Some(e)) => Promotion::Promoted(LinkId::promoted(s, e)),
            _ => Promotion::Discarded(DiscardReason::Unresolvable),
        }
    }

    /// The collapsed container hiding `id`. Containers are searched in tracking order; ones whose
    /// data source reports a disjoint subtree are skipped.
    fn visible_ancestor(&self, id: &str) -> Option<&'a str> {
        self.collapsed
            .iter()
            .filter(|c| self.data.descendants_connectivity(c) != Connectivity::Disjoint)
            .find(|c| self.data.is_descendant(id, c))
            .map(String::as_str)
    }
}

impl DiagramState {
    pub fn resolver(&self) -> PromotedLinkResolver<'_> {
        PromotedLinkResolver::new(
            &self.data,
            &self.nodes,
            &self.collapsed,
            self.config.promoted_link_behavior,
        )
    }

    /// Current classification of a data link.
    pub fn link_promotion(&self, link_id: &str) -> Option<&Promotion> {
        self.link_status.get(link_id)
    }

    pub fn is_link_promoted(&self, link_id: &str) -> bool {
        self.link_status
            .get(link_id)
            .is_some_and(Promotion::is_promoted)
    }

    /// Aggregate a hidden data link is drawn through.
    pub fn aggregate_of(&self, link_id: &str) -> Option<&LinkId> {
        self.original_to_aggregate.get(link_id)
    }

    pub fn promoted_link(&self, start: &str, end: &str) -> Option<&LinkRecord> {
        self.links.get(&LinkId::promoted(start, end))
    }

    pub fn promoted_links(&self) -> impl Iterator<Item = &LinkRecord> {
        self.links.values().filter(|l| l.is_promoted())
    }

    /// Data link ids that exist but are not drawn.
    pub fn hidden_link_ids(&self) -> impl Iterator<Item = &str> {
        self.link_status
            .iter()
            .filter(|(_, p)| !p.is_rendered())
            .map(|(id, _)| id.as_str())
    }

    /// Re-derives the classification of each named data link and moves it between direct
    /// records and aggregates as needed. Ids no longer in the data set are dropped.
    pub(crate) fn reconcile_links<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut seen: FxHashSet<String> = FxHashSet::default();
        for id in ids {
            if !seen.insert(id.clone()) {
                continue;
            }
            let Some(data) = self.data.link(&id).cloned() else {
                self.detach_link(&id);
                self.link_status.remove(&id);
                continue;
            };
            let next = self.resolver().classify(&data.start_id, &data.end_id);
            if self.link_status.get(&id) == Some(&next) {
                self.refresh_link(&next, data);
                continue;
            }
            self.detach_link(&id);
            self.attach_link(&next, data);
            self.link_status.insert(id, next);
        }
    }

    fn attach_link(&mut self, promotion: &Promotion, data: LinkData) {
        match promotion {
            Promotion::Direct => {
                self.links
                    .insert(LinkId::data(data.id.clone()), LinkRecord::direct(data));
            }
            Promotion::Promoted(aggregate) => {
                let LinkId::Promoted { start, end } = aggregate else {
                    return;
                };
                debug!(link = %data.id, aggregate = %aggregate, "link promoted");
                self.original_to_aggregate
                    .insert(data.id.clone(), aggregate.clone());
                self.links
                    .entry(aggregate.clone())
                    .or_insert_with(|| LinkRecord::promoted(start.clone(), end.clone()))
                    .upsert_constituent(data);
            }
            Promotion::Hidden => {}
            Promotion::Discarded(DiscardReason::Unresolvable) => {
                warn!(
                    link = %data.id,
                    start = %data.start_id,
                    end = %data.end_id,
                    "link endpoint does not resolve to a visible node; link dropped"
                );
            }
            Promotion::Discarded(reason) => {
                debug!(link = %data.id, ?reason, "link discarded");
            }
        }
    }

    fn refresh_link(&mut self, promotion: &Promotion, data: LinkData) {
        match promotion {
            Promotion::Direct => {
                if let Some(rec) = self.links.get_mut(&LinkId::data(data.id.clone())) {
                    rec.start_id = data.start_id.clone();
                    rec.end_id = data.end_id.clone();
                    rec.style = data.style.clone();
                    rec.backing = LinkBacking::Direct(data);
                }
            }
            Promotion::Promoted(aggregate) => {
                if let Some(rec) = self.links.get_mut(aggregate) {
                    rec.upsert_constituent(data);
                }
            }
            Promotion::Hidden | Promotion::Discarded(_) => {}
        }
    }

    /// Takes a data link out of whatever record currently draws it. An aggregate left without
    /// members is deleted; one that keeps members keeps its geometry.
    fn detach_link(&mut self, id: &str) {
        match self.link_status.get(id) {
            Some(Promotion::Direct) => {
                self.links.shift_remove(&LinkId::data(id));
            }
            Some(Promotion::Promoted(aggregate)) => {
                let aggregate = aggregate.clone();
                let emptied = match self.links.get_mut(&aggregate) {
                    Some(rec) => {
                        rec.remove_constituent(id);
                        rec.constituent_count() == 0
                    }
                    None => false,
                };
                if emptied {
                    debug!(aggregate = %aggregate, "promoted link removed");
                    self.links.shift_remove(&aggregate);
                }
                self.original_to_aggregate.remove(id);
            }
            _ => {}
        }
    }

    /// Consistency problems between records, classifications and the reverse map. Always empty
    /// for a correctly maintained state.
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (key, rec) in &self.links {
            if &rec.id != key {
                out.push(format!("record {} stored under {key}", rec.id));
            }
            match (&rec.id, rec.is_promoted()) {
                (LinkId::Promoted { start, end }, true) => {
                    if rec.constituent_count() == 0 {
                        out.push(format!("aggregate {key} has no constituents"));
                    }
                    if start != &rec.start_id || end != &rec.end_id {
                        out.push(format!("aggregate {key} endpoints do not match its id"));
                    }
                    for member in rec.constituent_ids() {
                        if self.original_to_aggregate.get(member) != Some(key) {
                            out.push(format!("{member} is in {key} but not mapped to it"));
                        }
                    }
                }
                (LinkId::Data(_), false) => {}
                _ => out.push(format!("record {key} has mismatched promotion")),
            }
            for end in [&rec.start_id, &rec.end_id] {
                if !self.nodes.contains_key(end) {
                    out.push(format!("record {key} ends at invisible node {end}"));
                }
            }
        }
        for (original, aggregate) in &self.original_to_aggregate {
            let holds = self
                .links
                .get(aggregate)
                .is_some_and(|rec| rec.constituent_ids().any(|c| c == original));
            if !holds {
                out.push(format!("{original} maps to {aggregate}, which does not hold it"));
            }
        }
        for (id, rec) in &self.nodes {
            if !rec.disclosed() && self.data.child_count(id) > 0 && !self.collapsed.contains(id) {
                out.push(format!("collapsed container {id} is not tracked"));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiagramConfig;
    use crate::model::{DiagramData, NodeData};

    fn state(behavior: PromotedLinkBehavior) -> DiagramState {
        let mut state = DiagramState::new(DiagramConfig {
            promoted_link_behavior: behavior,
            ..DiagramConfig::default()
        });
        state.load(DiagramData {
            nodes: vec![
                NodeData::new("A").with_children(vec![NodeData::new("B"), NodeData::new("B2")]),
                NodeData::new("C"),
                NodeData::new("D"),
            ],
            links: vec![
                LinkData::new("L1", "B", "C"),
                LinkData::new("L2", "B2", "C"),
                LinkData::new("in", "B", "B2"),
                LinkData::new("ghost", "nowhere", "C"),
            ],
            expanded: Vec::new(),
        });
        state
    }

    #[test]
    fn classification_follows_visibility() {
        let state = state(PromotedLinkBehavior::Full);
        let r = state.resolver();
        assert_eq!(r.classify("C", "D"), Promotion::Direct);
        assert_eq!(r.classify("B", "C"), Promotion::Promoted(LinkId::promoted("A", "C")));
        assert_eq!(r.classify("C", "B"), Promotion::Promoted(LinkId::promoted("C", "A")));
        assert_eq!(r.classify("B", "B2"), Promotion::Discarded(DiscardReason::Interior));
        assert_eq!(
            r.classify("nowhere", "C"),
            Promotion::Discarded(DiscardReason::Unresolvable)
        );
    }

    #[test]
    fn nothing_collapsed_makes_fully_hidden_links_inert() {
        let mut state = state(PromotedLinkBehavior::Full);
        state.expand("A").unwrap();
        assert_eq!(
            state.resolver().classify("x", "y"),
            Promotion::Discarded(DiscardReason::Inert)
        );
    }

    #[test]
    fn disjoint_containers_are_not_searched() {
        let mut state = state(PromotedLinkBehavior::Full);
        let mut a = state.data().node("A").cloned().unwrap();
        a.descendants_connectivity = Connectivity::Disjoint;
        state.data.replace_node("A", a);
        assert_eq!(
            state.resolver().classify("B", "C"),
            Promotion::Discarded(DiscardReason::Unresolvable)
        );
    }

    #[test]
    fn aggregates_collect_every_hidden_link_between_the_same_pair() {
        let state = state(PromotedLinkBehavior::Full);
        let agg = state.promoted_link("A", "C").unwrap();
        assert_eq!(agg.constituent_ids().collect::<Vec<_>>(), vec!["L1", "L2"]);
        assert_eq!(state.aggregate_of("L2"), Some(&LinkId::promoted("A", "C")));
        assert!(state.is_link_promoted("L1"));
        assert!(!state.is_link_promoted("in"));
        let mut hidden: Vec<&str> = state.hidden_link_ids().collect();
        hidden.sort_unstable();
        assert_eq!(hidden, vec!["ghost", "in"]);
        assert!(state.invariant_violations().is_empty());
    }

    #[test]
    fn disabled_promotion_hides_without_records() {
        let state = state(PromotedLinkBehavior::None);
        assert!(state.is_link_promoted("L1"));
        assert_eq!(state.link_promotion("L1"), Some(&Promotion::Hidden));
        assert_eq!(state.promoted_links().count(), 0);
        assert_eq!(state.link_count(), 0);
        assert!(state.invariant_violations().is_empty());
    }

    #[test]
    fn reclassifying_unchanged_links_is_a_no_op() {
        let mut state = state(PromotedLinkBehavior::Full);
        let before: Vec<LinkRecord> = state.links().cloned().collect();
        state.reconcile_links(["L1".to_string(), "L2".to_string(), "in".to_string()]);
        let after: Vec<LinkRecord> = state.links().cloned().collect();
        assert_eq!(before, after);
    }
}
