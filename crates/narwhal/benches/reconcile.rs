use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use narwhal::{
    AnimationSnapshot, DiagramData, DiagramState, LinkData, NodeData, SnapshotScope, reconcile,
};
use std::hint::black_box;
use std::time::Duration;

/// `groups` containers with `per_group` children each; every child links to the next group's
/// first child and to one top-level hub.
fn build_data(groups: usize, per_group: usize) -> DiagramData {
    let mut nodes = vec![NodeData::new("hub")];
    let mut links = Vec::new();
    for g in 0..groups {
        let children = (0..per_group)
            .map(|c| NodeData::new(format!("g{g}_c{c}")))
            .collect();
        nodes.push(NodeData::new(format!("g{g}")).with_children(children));
        for c in 0..per_group {
            let from = format!("g{g}_c{c}");
            links.push(LinkData::new(format!("hub_{g}_{c}"), from.clone(), "hub"));
            let next = (g + 1) % groups;
            if next != g {
                links.push(LinkData::new(format!("x_{g}_{c}"), from, format!("g{next}_c0")));
            }
        }
    }
    let expanded = (0..groups).map(|g| format!("g{g}")).collect();
    DiagramData {
        nodes,
        links,
        expanded,
    }
}

/// Snapshots before and after collapsing every other group.
fn snapshots(data: &DiagramData) -> (AnimationSnapshot, AnimationSnapshot) {
    let mut state = DiagramState::default();
    state.load(data.clone());
    let old = AnimationSnapshot::capture(&state, &SnapshotScope::Full);
    let keep: Vec<String> = data
        .expanded
        .iter()
        .enumerate()
        .filter(|(i, _)| i % 2 == 0)
        .map(|(_, id)| id.clone())
        .collect();
    state
        .set_expanded(keep)
        .unwrap_or_else(|err| panic!("set_expanded failed: {err}"));
    let new = AnimationSnapshot::capture(&state, &SnapshotScope::Full);
    (old, new)
}

fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");
    group.measurement_time(Duration::from_secs(10));

    let cases = [("g10_c10", 10usize, 10usize), ("g40_c20", 40, 20), ("g100_c20", 100, 20)];

    for (name, groups, per_group) in cases {
        let data = build_data(groups, per_group);
        let (old, new) = snapshots(&data);
        group.bench_with_input(BenchmarkId::new("reconcile", name), &(old, new), |b, (old, new)| {
            b.iter_batched(
                || old.clone(),
                |mut old| {
                    let directives = reconcile(black_box(&mut old), black_box(new));
                    black_box(directives.len());
                },
                BatchSize::LargeInput,
            )
        });
        group.bench_with_input(BenchmarkId::new("collapse_all", name), &data, |b, data| {
            b.iter_batched(
                || {
                    let mut state = DiagramState::default();
                    state.load(data.clone());
                    state
                },
                |mut state| {
                    let ids: Vec<String> = Vec::new();
                    state
                        .set_expanded(ids)
                        .unwrap_or_else(|err| panic!("set_expanded failed: {err}"));
                    black_box(state.link_count());
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_reconcile);
criterion_main!(benches);
