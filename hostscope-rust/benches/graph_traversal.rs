use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use hostscope::graph::{resolve, GraphDumper, Node, TaskPath};

const LEAF: &str = "BehaviorDesigner.Runtime.Tasks.Wait";
const SEQUENCE: &str = "BehaviorDesigner.Runtime.Tasks.Sequence";

/// Full tree of `depth` composite levels, `width` children each
fn build(depth: usize, width: usize) -> Node {
    if depth == 0 {
        return Node::leaf("Wait", LEAF);
    }
    let children = (0..width).map(|_| build(depth - 1, width)).collect();
    Node::composite(format!("Sequence{}", depth), SEQUENCE, children)
}

fn bench_resolve(c: &mut Criterion) {
    let root = build(6, 4);
    let deepest = TaskPath::new(vec![3; 6]);
    let broken = TaskPath::new(vec![3, 3, 3, 3, 3, 3, 0]);

    c.bench_function("resolve_deepest", |b| {
        b.iter(|| resolve(black_box(&root), black_box(&deepest)))
    });
    c.bench_function("resolve_through_leaf", |b| {
        b.iter(|| resolve(black_box(&root), black_box(&broken)))
    });
}

fn bench_dump(c: &mut Criterion) {
    let root = build(5, 4);
    let mut dumper = GraphDumper::new();

    c.bench_function("dump_node", |b| b.iter(|| dumper.dump_node(black_box(&root))));
}

criterion_group!(benches, bench_resolve, bench_dump);
criterion_main!(benches);
