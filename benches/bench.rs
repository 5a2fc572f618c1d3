// Criterion benchmarks for matchlens scoring

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use matchlens::core::store::ReferenceEmbedding;
use matchlens::core::{
    interest_score, physical_score, weighted_confidence, Embedding, PreferenceSnapshot,
    ScoringPolicy,
};
use matchlens::models::{ComponentScores, PreferenceProfile, ScoringWeights, SharedInterest};

fn embedding(seed: usize, dim: usize) -> Embedding {
    let values: Vec<f32> = (0..dim)
        .map(|i| (((seed * 31 + i * 17) % 101) as f32 / 101.0) + 0.01)
        .collect();
    Embedding::new(values).expect("valid embedding")
}

fn snapshot_with_references(count: usize, dim: usize) -> PreferenceSnapshot {
    PreferenceSnapshot {
        profile: PreferenceProfile::default(),
        references: (0..count)
            .map(|i| ReferenceEmbedding {
                id: uuid::Uuid::new_v4(),
                category: "general".to_string(),
                description: None,
                embedding: embedding(i, dim),
            })
            .collect(),
        positive_examples: (0..count / 2).map(|i| embedding(i + 1000, dim)).collect(),
        negative_examples: (0..count / 2).map(|i| embedding(i + 2000, dim)).collect(),
        traits: Vec::new(),
        negative_keywords: Vec::new(),
        interests: Vec::new(),
        trait_embedding: None,
        generation: 1,
    }
}

fn bench_cosine(c: &mut Criterion) {
    let a = embedding(1, 512);
    let b = embedding(2, 512);

    c.bench_function("cosine_512", |bench| {
        bench.iter(|| black_box(&a).cosine(black_box(&b)));
    });
}

fn bench_physical_score(c: &mut Criterion) {
    let policy = ScoringPolicy::default();
    let subject = embedding(42, 512);

    let mut group = c.benchmark_group("physical_score");
    for reference_count in [1, 10, 50, 200].iter() {
        let snapshot = snapshot_with_references(*reference_count, 512);

        group.bench_with_input(
            BenchmarkId::new("references", reference_count),
            reference_count,
            |bench, _| {
                bench.iter(|| physical_score(black_box(&subject), black_box(&snapshot), &policy));
            },
        );
    }
    group.finish();
}

fn bench_interest_score(c: &mut Criterion) {
    let mut snapshot = snapshot_with_references(0, 2);
    snapshot.interests = (0..20)
        .map(|i| SharedInterest {
            interest: format!("interest{}", i),
            is_dealbreaker: false,
        })
        .collect();
    let bio = "interest3 and interest7 are my thing, also interest15 on weekends";

    c.bench_function("interest_score_20_interests", |bench| {
        bench.iter(|| interest_score(black_box(Some(bio)), black_box(&snapshot)));
    });
}

fn bench_weighted_confidence(c: &mut Criterion) {
    let weights = ScoringWeights::default();
    let components = ComponentScores {
        physical: 0.9,
        personality: 0.5,
        interests: 0.5,
    };

    c.bench_function("weighted_confidence", |bench| {
        bench.iter(|| weighted_confidence(black_box(&components), black_box(&weights)));
    });
}

criterion_group!(
    benches,
    bench_cosine,
    bench_physical_score,
    bench_interest_score,
    bench_weighted_confidence
);

criterion_main!(benches);
