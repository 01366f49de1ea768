#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use microprolog::{Atom, Config, Engine, Strategy, Term};

fn setup_large_graph(strategy: Strategy) -> Engine {
    let mut engine = Engine::with_config(Config {
        strategy,
        ..Config::default()
    });

    // Create a large graph with 1000 nodes
    for i in 0..1000 {
        for j in 0..5 {
            let next = (i + j + 1) % 1000;
            engine
                .add_fact(&Atom::new(
                    "edge",
                    [
                        Term::Constant(format!("node_{i}")),
                        Term::Constant(format!("node_{next}")),
                    ],
                ))
                .unwrap();
        }
    }
    engine
}

fn two_hops(engine: &mut Engine) -> microprolog::Query {
    engine
        .build(&[
            Atom::new("edge", [Term::constant("node_0"), Term::variable("X")]),
            Atom::new("edge", [Term::variable("X"), Term::variable("Y")]),
        ])
        .unwrap()
}

fn query_two_hops(c: &mut Criterion) {
    let mut indexed = setup_large_graph(Strategy::Indexed);
    let query = two_hops(&mut indexed);
    c.bench_function("query_two_hops_indexed", |b| {
        b.iter(|| black_box(indexed.solve(&query)));
    });

    let mut scanned = setup_large_graph(Strategy::Scan);
    let query = two_hops(&mut scanned);
    c.bench_function("query_two_hops_scan", |b| {
        b.iter(|| black_box(scanned.solve(&query)));
    });
}

fn query_existence_check(c: &mut Criterion) {
    let mut engine = setup_large_graph(Strategy::Indexed);
    let query = engine
        .build(&[Atom::new(
            "edge",
            [Term::constant("node_500"), Term::constant("node_503")],
        )])
        .unwrap();

    c.bench_function("query_existence_check", |b| {
        b.iter(|| black_box(engine.ask(&query)));
    });
}

fn query_all_edges(c: &mut Criterion) {
    let mut engine = setup_large_graph(Strategy::Indexed);
    let query = engine
        .build(&[Atom::new(
            "edge",
            [Term::variable("X"), Term::variable("Y")],
        )])
        .unwrap();

    c.bench_function("query_all_edges", |b| {
        b.iter(|| black_box(engine.solutions(&query).count()));
    });
}

criterion_group!(
    benches,
    query_two_hops,
    query_existence_check,
    query_all_edges
);
criterion_main!(benches);
