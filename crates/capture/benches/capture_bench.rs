//! 캡처 핫패스 벤치마크
//!
//! 패턴 매칭, 플러드 가드, 중복 제거, 분할 평가의 이벤트당 비용을
//! 측정합니다.

use std::time::Duration;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use debugtap_capture::dedup::Deduplicator;
use debugtap_capture::exclude::ExclusionMatcher;
use debugtap_capture::flood::FloodGuard;
use debugtap_capture::pattern::LinePattern;
use debugtap_capture::split::{FileSplitter, RotationState, SplitRules};

const SAMPLE_LINE: &str = "Failed to connect to 192.168.1.100:5432 after 3 retries";

fn bench_pattern_match(c: &mut Criterion) {
    let literal = LinePattern::parse("failed").unwrap();
    let regex = LinePattern::parse(r"/\d+\.\d+\.\d+\.\d+:\d+/").unwrap();

    let mut group = c.benchmark_group("pattern_match");
    group.throughput(Throughput::Elements(1));

    group.bench_function("literal", |b| {
        b.iter(|| literal.is_match(black_box(SAMPLE_LINE)))
    });

    group.bench_function("regex", |b| {
        b.iter(|| regex.is_match(black_box(SAMPLE_LINE)))
    });

    group.finish();
}

fn bench_exclusion_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("exclusion_scaling");

    for rule_count in [1, 10, 100].iter() {
        let patterns: Vec<String> = (0..*rule_count)
            .map(|i| format!("no-match-pattern-{i}"))
            .collect();
        let matcher = ExclusionMatcher::compile(&patterns);

        group.throughput(Throughput::Elements(*rule_count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(rule_count),
            rule_count,
            |b, _| b.iter(|| matcher.is_excluded(black_box(SAMPLE_LINE))),
        );
    }

    group.finish();
}

fn bench_flood_guard(c: &mut Criterion) {
    let mut group = c.benchmark_group("flood_guard");
    group.throughput(Throughput::Elements(1));

    group.bench_function("distinct_messages", |b| {
        let mut guard = FloodGuard::new(100, Duration::from_secs(1), Duration::from_secs(1));
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            guard.check(black_box(&format!("message {i}")))
        })
    });

    group.bench_function("repeated_message", |b| {
        let mut guard = FloodGuard::new(100, Duration::from_secs(600), Duration::from_secs(600));
        b.iter(|| guard.check(black_box(SAMPLE_LINE)))
    });

    group.finish();
}

fn bench_dedup(c: &mut Criterion) {
    let mut group = c.benchmark_group("dedup");
    group.throughput(Throughput::Elements(1));

    group.bench_function("repeated_line", |b| {
        let mut dedup = Deduplicator::new(Duration::from_secs(600));
        b.iter(|| dedup.process(black_box(SAMPLE_LINE)))
    });

    group.bench_function("alternating_lines", |b| {
        let mut dedup = Deduplicator::new(Duration::from_secs(600));
        let mut flip = false;
        b.iter(|| {
            flip = !flip;
            let line = if flip { "line a" } else { "line b" };
            dedup.process(black_box(line))
        })
    });

    group.finish();
}

fn bench_split_evaluation(c: &mut Criterion) {
    let idle = FileSplitter::new(SplitRules::default());
    let active = FileSplitter::new(SplitRules {
        max_lines: 10_000,
        max_size_kb: 1024,
        keywords: vec!["CHECKPOINT".to_owned(), "/fatal/i".to_owned()],
        ..Default::default()
    });
    let state = RotationState::fresh();

    let mut group = c.benchmark_group("split_evaluation");
    group.throughput(Throughput::Elements(1));

    group.bench_function("no_rules_fast_path", |b| {
        b.iter(|| idle.evaluate(black_box(&state), black_box(Some(SAMPLE_LINE))))
    });

    group.bench_function("active_rules_no_match", |b| {
        b.iter(|| active.evaluate(black_box(&state), black_box(Some(SAMPLE_LINE))))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_pattern_match,
    bench_exclusion_scaling,
    bench_flood_guard,
    bench_dedup,
    bench_split_evaluation
);
criterion_main!(benches);
