use std::collections::BTreeSet;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use arvtrain_core::categorical::{score_categorical, BucketPartition};
use arvtrain_core::comps::{score_comparable, CompIssue};
use arvtrain_core::distractor::{generate_distractors_with, DistractorConfig};
use arvtrain_core::grade::{score_numeric, weighted_composite, Grade, GradeScale};
use arvtrain_core::model::GroundTruth;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn bench_numeric(c: &mut Criterion) {
    let mut group = c.benchmark_group("score_numeric");
    let scale = GradeScale::default();

    group.bench_function("within_a", |b| {
        b.iter(|| score_numeric(black_box(102_000.0), black_box(Some(100_000.0)), &scale))
    });

    group.bench_function("zero_truth", |b| {
        b.iter(|| score_numeric(black_box(50_000.0), black_box(Some(0.0)), &scale))
    });

    group.bench_function("composite", |b| {
        b.iter(|| weighted_composite(black_box(Grade::B), black_box(Grade::D), 0.6, 0.4))
    });

    group.finish();
}

fn bench_categorical(c: &mut Criterion) {
    let partition = BucketPartition::renovation_scope();
    let scale = GradeScale::default();
    let truth = GroundTruth::value(42_000.0);

    c.bench_function("score_categorical", |b| {
        b.iter(|| score_categorical(black_box(Grade::A), black_box(&truth), &partition, &scale))
    });
}

fn bench_distractors(c: &mut Criterion) {
    let mut group = c.benchmark_group("distractors");
    let config = DistractorConfig::default();
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    group.bench_function("no_collisions", |b| {
        b.iter(|| generate_distractors_with(black_box(300_000.0), &config, &mut rng))
    });

    group.bench_function("with_nudging", |b| {
        b.iter(|| generate_distractors_with(black_box(20_000.0), &config, &mut rng))
    });

    group.finish();
}

fn bench_comps(c: &mut Criterion) {
    let truth: BTreeSet<CompIssue> = [CompIssue::SaleTooOld, CompIssue::TooFarAway].into_iter().collect();
    let user: BTreeSet<CompIssue> = [CompIssue::SaleTooOld, CompIssue::SizeMismatch].into_iter().collect();

    c.bench_function("score_comparable", |b| {
        b.iter(|| score_comparable(black_box(&user), false, black_box(&truth), &CompIssue::ALL))
    });
}

criterion_group!(benches, bench_numeric, bench_categorical, bench_distractors, bench_comps);
criterion_main!(benches);
