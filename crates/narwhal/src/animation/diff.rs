//! Old/new snapshot reconciliation.
//!
//! Nodes are matched by id. Links are matched through the data links they render: a promoted
//! record stands for each of its constituents, a direct record for itself. Records on either
//! side that share a data link end up in the same group, and each group yields exactly one
//! directive (or one per record when nothing is shared), so every rendered link on both sides is
//! accounted for once.

use super::snapshot::{AnimationSnapshot, LinkSnapshot, NodeSnapshot};
use rustc_hash::FxHashMap;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TransitionKind {
    Insert,
    Update,
    Delete,
    Expand,
    Collapse,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NodeTransition {
    Insert { new: NodeSnapshot },
    Update { old: NodeSnapshot, new: NodeSnapshot },
    Delete { old: NodeSnapshot },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LinkTransition {
    Insert { new: LinkSnapshot },
    Update { old: LinkSnapshot, new: LinkSnapshot },
    Delete { old: LinkSnapshot },
    /// Aggregated links split into finer ones.
    Expand {
        old: Vec<LinkSnapshot>,
        new: Vec<LinkSnapshot>,
    },
    /// Links merged into an aggregate.
    Collapse {
        old: Vec<LinkSnapshot>,
        new: Vec<LinkSnapshot>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "entity", rename_all = "camelCase")]
pub enum Transition {
    Node(NodeTransition),
    Link(LinkTransition),
}

impl Transition {
    pub fn kind(&self) -> TransitionKind {
        match self {
            Transition::Node(NodeTransition::Insert { .. })
            | Transition::Link(LinkTransition::Insert { .. }) => TransitionKind::Insert,
            Transition::Node(NodeTransition::Update { .. })
            | Transition::Link(LinkTransition::Update { .. }) => TransitionKind::Update,
            Transition::Node(NodeTransition::Delete { .. })
            | Transition::Link(LinkTransition::Delete { .. }) => TransitionKind::Delete,
            Transition::Link(LinkTransition::Expand { .. }) => TransitionKind::Expand,
            Transition::Link(LinkTransition::Collapse { .. }) => TransitionKind::Collapse,
        }
    }

    pub fn is_link(&self) -> bool {
        matches!(self, Transition::Link(_))
    }
}

/// Classifies every entity of `old` and `new`. Entities found only in `new` are also recorded
/// in `old`'s new-node/new-link lists.
pub fn reconcile(old: &mut AnimationSnapshot, new: &AnimationSnapshot) -> Vec<Transition> {
    let mut out = Vec::new();
    diff_nodes(old, new, &mut out);
    diff_links(old, new, &mut out);
    out
}

fn diff_nodes(old: &mut AnimationSnapshot, new: &AnimationSnapshot, out: &mut Vec<Transition>) {
    for o in old.nodes() {
        if new.node(&o.id).is_none() {
            out.push(Transition::Node(NodeTransition::Delete { old: o.clone() }));
        }
    }
    let mut inserted = Vec::new();
    for n in new.nodes() {
        match old.node(&n.id) {
            Some(o) => out.push(Transition::Node(NodeTransition::Update {
                old: o.clone(),
                new: n.clone(),
            })),
            None => {
                out.push(Transition::Node(NodeTransition::Insert { new: n.clone() }));
                inserted.push(n.clone());
            }
        }
    }
    old.new_nodes.extend(inserted);
}

struct DisjointSet(Vec<usize>);

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self((0..n).collect())
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.0[x] != x {
            self.0[x] = self.0[self.0[x]];
            x = self.0[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Lower index wins so groups are ordered by their first member.
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.0[hi] = lo;
        }
    }
}

fn diff_links(old: &mut AnimationSnapshot, new: &AnimationSnapshot, out: &mut Vec<Transition>) {
    let olds: Vec<LinkSnapshot> = old.links().cloned().collect();
    let news: Vec<&LinkSnapshot> = new.links().collect();
    let m = olds.len();

    let mut sets = DisjointSet::new(m + news.len());
    let mut first_seen: FxHashMap<&str, usize> = FxHashMap::default();
    let records = olds.iter().chain(news.iter().copied()).enumerate();
    for (i, rec) in records {
        for id in &rec.constituent_ids {
            match first_seen.get(id.as_str()) {
                Some(&j) => sets.union(i, j),
                None => {
                    first_seen.insert(id.as_str(), i);
                }
            }
        }
    }

    let mut groups: Vec<(usize, Vec<usize>)> = Vec::new();
    let mut group_of_root: FxHashMap<usize, usize> = FxHashMap::default();
    for i in 0..m + news.len() {
        let root = sets.find(i);
        let g = *group_of_root.entry(root).or_insert_with(|| {
            groups.push((root, Vec::new()));
            groups.len() - 1
        });
        groups[g].1.push(i);
    }

    let mut inserted = Vec::new();
    for (_, members) in groups {
        let (o, n): (Vec<usize>, Vec<usize>) = members.into_iter().partition(|&i| i < m);
        let o: Vec<&LinkSnapshot> = o.into_iter().map(|i| &olds[i]).collect();
        let n: Vec<&LinkSnapshot> = n.into_iter().map(|i| news[i - m]).collect();
        match (o.as_slice(), n.as_slice()) {
            ([], added) => {
                for rec in added {
                    out.push(Transition::Link(LinkTransition::Insert {
                        new: (*rec).clone(),
                    }));
                    inserted.push((*rec).clone());
                }
            }
            (gone, []) => {
                for rec in gone {
                    // Still in the data set, just not drawn any more.
                    if rec.constituent_ids.iter().all(|c| new.is_link_hidden(c)) {
                        continue;
                    }
                    out.push(Transition::Link(LinkTransition::Delete {
                        old: (*rec).clone(),
                    }));
                }
            }
            ([a], [b]) => out.push(pair(a, b)),
            (a, b) => out.extend(regroup(a, b)),
        }
    }
    old.new_links.extend(inserted);
}

fn pair(old: &LinkSnapshot, new: &LinkSnapshot) -> Transition {
    let update = || {
        Transition::Link(LinkTransition::Update {
            old: old.clone(),
            new: new.clone(),
        })
    };
    if old.id == new.id || (!old.promoted && !new.promoted) {
        return update();
    }
    let (before, after) = (old.constituent_count(), new.constituent_count());
    if before > after {
        Transition::Link(LinkTransition::Expand {
            old: vec![old.clone()],
            new: vec![new.clone()],
        })
    } else if before < after {
        Transition::Link(LinkTransition::Collapse {
            old: vec![old.clone()],
            new: vec![new.clone()],
        })
    } else {
        update()
    }
}

/// Several records on at least one side. The side with the largest aggregate decides the
/// direction; a tie falls back to record counts, then to positional updates.
fn regroup(old: &[&LinkSnapshot], new: &[&LinkSnapshot]) -> Vec<Transition> {
    let (before, after) = (widest(old), widest(new));
    let expand = before > after || (before == after && old.len() < new.len());
    let collapse = before < after || (before == after && old.len() > new.len());
    if expand {
        vec![Transition::Link(LinkTransition::Expand {
            old: owned(old),
            new: owned(new),
        })]
    } else if collapse {
        vec![Transition::Link(LinkTransition::Collapse {
            old: owned(old),
            new: owned(new),
        })]
    } else {
        pair_by_members(old, new)
            .into_iter()
            .map(|(o, n)| {
                Transition::Link(LinkTransition::Update {
                    old: o.clone(),
                    new: n.clone(),
                })
            })
            .collect()
    }
}

/// Equal-sized sides: each old record is paired with the unpaired new record it shares the most
/// data links with. Records sharing nothing with what is left are paired in order.
fn pair_by_members<'a>(
    old: &[&'a LinkSnapshot],
    new: &[&'a LinkSnapshot],
) -> Vec<(&'a LinkSnapshot, &'a LinkSnapshot)> {
    let shared = |a: &LinkSnapshot, b: &LinkSnapshot| {
        a.constituent_ids
            .iter()
            .filter(|c| b.constituent_ids.contains(c))
            .count()
    };
    let mut open: Vec<&LinkSnapshot> = new.to_vec();
    let mut pairs = Vec::with_capacity(old.len());
    let mut leftover = Vec::new();
    for &o in old {
        let best = open
            .iter()
            .enumerate()
            .map(|(i, n)| (i, shared(o, *n)))
            .filter(|&(_, count)| count > 0)
            .max_by_key(|&(i, count)| (count, std::cmp::Reverse(i)));
        match best {
            Some((i, _)) => pairs.push((o, open.remove(i))),
            None => leftover.push(o),
        }
    }
    pairs.extend(leftover.into_iter().zip(open));
    pairs
}

fn widest(side: &[&LinkSnapshot]) -> usize {
    side.iter()
        .map(|l| l.constituent_count())
        .max()
        .unwrap_or(0)
}

fn owned(side: &[&LinkSnapshot]) -> Vec<LinkSnapshot> {
    side.iter().map(|l| (*l).clone()).collect()
}
