//! XPath compile and evaluation benchmarks
//!
//! Measures:
//! - Compilation of representative expressions
//! - Lazy selection over documents of 10, 100 and 1000 records
//! - Paths that stream versus paths that need a document-order merge
//!
//! Run benchmarks: `cargo bench --bench xpath_eval`

#[path = "../tests/common/mod.rs"]
mod common;

use common::XmlNavigator;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use navpath::Expr;
use roxmltree::Document;
use std::hint::black_box;

const EXPRESSIONS: &[(&str, &str)] = &[
    ("child_path", "/catalog/record/name"),
    ("descendant", "//name"),
    ("predicate", "//record[value > 500]/@id"),
    ("positional", "//record[last()]"),
    ("merge", "//record/parent::*/record"),
    ("aggregate", "sum(//record/value)"),
];

/// Generate a flat catalogue with `count` records
fn generate_catalog(count: usize) -> String {
    let mut xml = String::from("<catalog>");
    for i in 0..count {
        xml.push_str(&format!(
            r#"<record id="r{i}"><name>Record {i}</name><value>{}</value></record>"#,
            i * 10
        ));
    }
    xml.push_str("</catalog>");
    xml
}

fn benchmark_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");

    for (name, expr) in EXPRESSIONS {
        group.bench_function(*name, |b| {
            b.iter(|| Expr::<XmlNavigator>::compile(black_box(expr)).expect("Failed to compile"));
        });
    }

    group.finish();
}

/// Benchmark selection throughput with varying document sizes
fn benchmark_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("select");

    for count in [10, 100, 1000] {
        let xml = generate_catalog(count);
        let doc = Document::parse(&xml).expect("Failed to parse catalog");
        let root = XmlNavigator::root(&doc);
        group.throughput(Throughput::Elements(count as u64));

        for (name, expr) in EXPRESSIONS {
            let compiled = Expr::compile(expr).expect("Failed to compile");
            group.bench_with_input(BenchmarkId::new(*name, count), &root, |b, root| {
                b.iter(|| match compiled.evaluate(root) {
                    navpath::Value::NodeSet(nodes) => nodes.count(),
                    other => black_box(other.to_number()) as usize,
                });
            });
        }
    }

    group.finish();
}

/// Benchmark taking only the first result
fn benchmark_first_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("first_match");
    let xml = generate_catalog(1000);
    let doc = Document::parse(&xml).expect("Failed to parse catalog");
    let root = XmlNavigator::root(&doc);

    let streaming = Expr::compile("//record/name").expect("Failed to compile");
    group.bench_function("streaming", |b| {
        b.iter(|| streaming.select(black_box(&root)).next());
    });

    let buffered = Expr::compile("//record[last()]/name").expect("Failed to compile");
    group.bench_function("buffered", |b| {
        b.iter(|| buffered.select(black_box(&root)).next());
    });

    group.finish();
}

criterion_group!(benches, benchmark_compile, benchmark_select, benchmark_first_match);
criterion_main!(benches);
