use criterion::{
    BenchmarkGroup, Criterion, Throughput, black_box, criterion_group, criterion_main,
    measurement::WallTime,
};
use sdnlb_core::{Link, LinkEnd, LinkSet, MissingWeight, SwitchId, TopologyGraph};

/// `side * side` switches, each cabled to its right and lower neighbour.
/// Port 1..=4 face up, down, left and right.
fn grid(side: u64) -> (Vec<SwitchId>, LinkSet) {
    let id = |row: u64, col: u64| SwitchId::new(row * side + col + 1);
    let nodes = (0..side)
        .flat_map(|row| (0..side).map(move |col| id(row, col)))
        .collect();

    let mut links = LinkSet::new();
    for row in 0..side {
        for col in 0..side {
            if col + 1 < side {
                let link = Link::new(
                    LinkEnd::new(id(row, col), 4),
                    LinkEnd::new(id(row, col + 1), 3),
                );
                links.insert(link);
                links.insert(link.reversed());
            }
            if row + 1 < side {
                let link = Link::new(
                    LinkEnd::new(id(row, col), 2),
                    LinkEnd::new(id(row + 1, col), 1),
                );
                links.insert(link);
                links.insert(link.reversed());
            }
        }
    }

    (nodes, links)
}

/// deterministic, uneven load on every egress port
fn load(end: LinkEnd) -> Option<u64> {
    let seed = end.switch.into_u64() * 31 + u64::from(end.port.into_u32()) * 17;
    Some(seed % 97 * 1_000)
}

fn bench_build_size(group: &mut BenchmarkGroup<'_, WallTime>, side: u64) {
    let (nodes, links) = grid(side);

    group.throughput(Throughput::Elements(links.len() as u64));
    group.bench_function(format!("{} switches", side * side), |b| {
        b.iter(|| {
            TopologyGraph::build(
                nodes.iter().copied(),
                black_box(&links),
                MissingWeight::Zero,
                load,
            )
        })
    });
}

fn build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");

    for side in [4, 8, 16, 32] {
        bench_build_size(&mut group, side);
    }

    group.finish();
}

fn shortest_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("shortest_path");

    for side in [4, 8, 16, 32] {
        let (nodes, links) = grid(side);
        let graph = TopologyGraph::build(nodes, &links, MissingWeight::Zero, load);
        let src = SwitchId::new(1);
        let dst = SwitchId::new(side * side);

        group.bench_function(format!("{} switches", side * side), |b| {
            b.iter(|| graph.shortest_path(black_box(src), black_box(dst)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, build, shortest_path);
criterion_main!(benches);
