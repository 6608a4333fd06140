//! Performance benchmarks for Twitter Extras.
//!
//! Run with: cargo bench
//!
//! These cover the work done for every post the site inserts: code-span
//! splitting, timecode extraction and selector matching.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use extras::dom::Dom;
use extras::features::code_spans::{format_post_text, split_code_spans};
use extras::features::timecodes::{find_timecodes, timestamp_to_seconds};
use extras::page::selectors;

/// Benchmark splitting post text into text and code segments.
fn bench_code_spans(c: &mut Criterion) {
    let mut group = c.benchmark_group("code_spans");

    let inputs = [
        ("plain", "Just setting up my twttr. Nothing to see here at all."),
        ("one_span", "Run `cargo build --release` and wait."),
        ("many_spans", "`a` then `b` then `c` then `d` then `e` then `f` then `g`"),
        ("unclosed", "A stray ` backtick and `one closed` span"),
    ];

    for (name, text) in inputs {
        group.bench_with_input(BenchmarkId::from_parameter(name), &text, |b, text| {
            b.iter(|| black_box(split_code_spans(black_box(text))))
        });
    }

    group.finish();
}

/// Benchmark formatting a rendered post text element.
fn bench_format_post_text(c: &mut Criterion) {
    c.bench_function("format_post_text", |b| {
        b.iter_batched(
            || {
                let dom = Dom::new();
                let added = dom
                    .append_html(
                        dom.body(),
                        "<div data-testid='tweetText'><span>use `Rc` or `Arc`</span> <a>link</a><span>then `clone()`</span></div>",
                    )
                    .unwrap();
                (dom, added[0])
            },
            |(dom, post_text)| dom.with_mut(|doc| black_box(format_post_text(doc, post_text))),
            BatchSize::SmallInput,
        )
    });
}

/// Benchmark timecode extraction and conversion.
fn bench_timecodes(c: &mut Criterion) {
    let mut group = c.benchmark_group("timecodes");

    let chapters = "0:00 intro\n1:30 setup\n12:05 build\n1:02:44 questions\n1:15:00 outro";

    group.bench_function("find", |b| {
        b.iter(|| black_box(find_timecodes(black_box(chapters))))
    });

    group.bench_function("to_seconds", |b| {
        b.iter(|| black_box(timestamp_to_seconds(black_box("1:02:44"))))
    });

    group.finish();
}

/// Benchmark selector matching over a timeline.
fn bench_selectors(c: &mut Criterion) {
    let dom = Dom::new();
    for i in 0..50 {
        dom.append_html(
            dom.body(),
            &format!(
                "<article data-testid='tweet'><a href='/u/status/{i}'>now</a><div data-testid='tweetText'>post {i}</div></article>"
            ),
        )
        .unwrap();
    }

    c.bench_function("query_post_text", |b| {
        b.iter(|| dom.with(|doc| black_box(doc.query_selector_all(doc.root(), &selectors::POST_TEXT))))
    });
}

criterion_group!(
    benches,
    bench_code_spans,
    bench_format_post_text,
    bench_timecodes,
    bench_selectors
);
criterion_main!(benches);
