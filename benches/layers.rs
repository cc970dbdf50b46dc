//! Benchmarks for reorder moves and viewport windowing.
//!
//! Run with: cargo bench
//!
//! Results are saved to `target/criterion/` with HTML reports.
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::cast_possible_truncation)]

use std::cell::RefCell;
use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use layergrid::command::{ScrollAmount, ScrollDirection};
use layergrid::data::{DataLayer, VecDataProvider};
use layergrid::layer::FixedClientArea;
use layergrid::reorder::{IndexOrder, ReorderLayer};
use layergrid::viewport::ViewportLayer;
use layergrid::{flush_events, Axis, Layer, Rectangle, SharedLayer};

/// Single moves across permutations of growing size
fn bench_move_single(c: &mut Criterion) {
    let mut group = c.benchmark_group("move_single");

    for count in [1_000usize, 10_000, 100_000] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut order = IndexOrder::identity(Axis::Column, count);
            b.iter(|| {
                order
                    .move_single(black_box(0), black_box(count))
                    .expect("valid move");
            });
        });
    }

    group.finish();
}

/// Block moves of scattered positions
fn bench_move_multiple(c: &mut Criterion) {
    let count = 10_000;
    let from: Vec<usize> = (0..count).step_by(7).collect();

    c.bench_function("move_multiple_scattered_10k", |b| {
        let mut order = IndexOrder::identity(Axis::Column, count);
        b.iter(|| {
            order
                .move_multiple(black_box(&from), black_box(count / 2))
                .expect("valid move");
        });
    });
}

/// Visible count after scrolling a viewport over a reordered 200k-row layer
fn bench_viewport_count(c: &mut Criterion) {
    let provider = Rc::new(VecDataProvider::new(4, 200_000));
    let data: SharedLayer = Rc::new(RefCell::new(DataLayer::new(provider, 100, 20)));
    let reorder = ReorderLayer::rows(data);
    reorder
        .borrow_mut()
        .move_multiple(&[0, 10, 100_000], 199_999)
        .expect("valid move");
    let viewport = ViewportLayer::new(Rc::clone(&reorder) as SharedLayer);
    viewport
        .borrow_mut()
        .set_client_area_provider(Rc::new(FixedClientArea::new(Rectangle::new(0, 0, 400, 900))));

    let root: SharedLayer = Rc::clone(&viewport) as SharedLayer;

    c.bench_function("viewport_page_and_count", |b| {
        b.iter(|| {
            viewport
                .borrow_mut()
                .scroll(Axis::Row, ScrollDirection::Forward, ScrollAmount::Page);
            flush_events(&root);
            black_box(viewport.borrow().row_count())
        });
    });
}

criterion_group!(benches, bench_move_single, bench_move_multiple, bench_viewport_count);

criterion_main!(benches);
