// Criterion benchmarks for Roomie Match

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use roomie_match::core::{calculate_compatibility, MatchFilter, MatchRanker, QUIZ_QUESTIONS};
use roomie_match::models::{QuizAnswerSet, UserRecord};

/// Deterministic answers: question i gets option (seed + i) % options
fn answers_for(seed: usize) -> QuizAnswerSet {
    QUIZ_QUESTIONS
        .iter()
        .enumerate()
        .map(|(i, q)| (q.id, q.options[(seed + i) % q.options.len()].value))
        .collect()
}

fn create_candidate(id: usize) -> UserRecord {
    let mut record = UserRecord::new(format!("user-{:05}", id), format!("User {}", id), format!("{}@bench.local", id));
    record.gender = Some(if id % 2 == 0 { "female" } else { "male" }.to_string());
    record.quiz_answers = Some(answers_for(id * 7));
    record.quiz_completed = true;
    record
}

fn bench_compatibility(c: &mut Criterion) {
    let mine = answers_for(0);
    let theirs = answers_for(1);

    c.bench_function("calculate_compatibility", |b| {
        b.iter(|| calculate_compatibility(black_box(Some(&mine)), black_box(Some(&theirs))));
    });
}

fn bench_ranking(c: &mut Criterion) {
    let ranker = MatchRanker::default();
    let mine = answers_for(0);

    let mut group = c.benchmark_group("ranking");

    for candidate_count in [10, 100, 1000, 5000].iter() {
        let candidates: Vec<UserRecord> = (0..*candidate_count).map(create_candidate).collect();

        group.bench_with_input(
            BenchmarkId::new("rank", candidate_count),
            candidate_count,
            |b, _| {
                b.iter(|| ranker.rank(black_box("me"), black_box(&mine), black_box(candidates.clone())));
            },
        );
    }

    group.finish();
}

fn bench_select(c: &mut Criterion) {
    let ranker = MatchRanker::default();
    let ranked = ranker.rank("me", &answers_for(0), (0..1000).map(create_candidate).collect());
    let filter = MatchFilter {
        gender: Some("female".to_string()),
        min_compatibility: Some(40),
        limit: Some(20),
    };

    c.bench_function("select_filtered_1000", |b| {
        b.iter(|| ranker.select(black_box(&ranked), black_box(&filter)));
    });
}

criterion_group!(benches, bench_compatibility, bench_ranking, bench_select);

criterion_main!(benches);
