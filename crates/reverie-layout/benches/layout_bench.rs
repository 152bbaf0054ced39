use criterion::{black_box, criterion_group, criterion_main, Criterion};
use reverie_core::{Node, Size};
use reverie_layout::{layout_tree, NoLeaves, ScrollOffsets};

fn deep_tree(depth: usize, fanout: usize) -> Node {
    let mut level: Vec<Node> = (0..fanout)
        .map(|_| {
            Node::new("box")
                .prop("width", 20.0)
                .prop("height", 12.0)
        })
        .collect();
    for d in 0..depth {
        let kind = if d % 2 == 0 { "row" } else { "column" };
        level = (0..fanout)
            .map(|_| {
                Node::new(kind)
                    .prop("spacing", 2.0)
                    .children(level.clone())
            })
            .collect();
    }
    Node::new("column").children(level)
}

fn bench_layout(c: &mut Criterion) {
    let tree = deep_tree(3, 4);
    let offsets = ScrollOffsets::default();
    c.bench_function("layout deep tree", |b| {
        b.iter(|| {
            black_box(layout_tree(
                black_box(&tree),
                Size::new(1280.0, 720.0),
                &NoLeaves,
                &offsets,
            ))
        })
    });
}

criterion_group!(benches, bench_layout);
criterion_main!(benches);
