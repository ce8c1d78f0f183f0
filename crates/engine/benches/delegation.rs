//! Benchmarks for the delegating engine
//!
//! Run with: cargo bench --package engine
//!
//! Compares the cost of a full request when post-processors are tightly
//! bounded (small safe prefix) against unbounded ones (everything is
//! post-processed), and measures the pruning computation on its own.

use anyhow::Result;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use engine::{DelegatingEngine, Engine, FanOut, SingleScore, SingleScoreEngine, safe_prefix_len};
use pipeline::{PostProcessor, ScoreBounds};
use reco_core::{Config, Context, Recommendations};

const CANDIDATES: u32 = 10_000;

type Ctx = Context<u32, u32>;

/// Pseudo-random but deterministic scores for `CANDIDATES` items.
struct Synthetic {
    name: &'static str,
    salt: u32,
}

impl SingleScoreEngine<u32, u32> for Synthetic {
    fn name(&self) -> &str {
        self.name
    }

    fn score_single(&self, _input: &u32, _context: &Ctx) -> Result<Vec<(u32, f32)>> {
        Ok((0..CANDIDATES)
            .map(|item| {
                let hashed = item.wrapping_mul(2_654_435_761).wrapping_add(self.salt);
                (item, (hashed % 1000) as f32)
            })
            .collect())
    }
}

/// Nudges every score it sees by a small amount.
struct Jitter {
    bound: f32,
}

impl PostProcessor<u32, u32> for Jitter {
    fn name(&self) -> &str {
        "jitter"
    }

    fn max_positive_score(&self, _input: &u32, _context: &Ctx) -> f32 {
        self.bound
    }

    fn max_negative_score(&self, _input: &u32, _context: &Ctx) -> f32 {
        -self.bound
    }

    fn post_process(&self, recommendations: &mut Recommendations<u32>, _input: &u32, _context: &Ctx) -> Result<()> {
        let items: Vec<u32> = recommendations.items().copied().collect();
        for item in items {
            let delta = if item % 2 == 0 { 1.0 } else { -1.0 };
            recommendations.add_score(item, "jitter", delta);
        }
        Ok(())
    }
}

fn build_engine(bound: f32, fan_out: FanOut) -> DelegatingEngine<u32, u32> {
    DelegatingEngine::new()
        .add_engine(SingleScore::new(Synthetic { name: "first", salt: 7 }))
        .add_engine(SingleScore::new(Synthetic { name: "second", salt: 13 }))
        .add_post_processor(Jitter { bound })
        .with_fan_out(fan_out)
}

fn bench_bounded_recommend(c: &mut Criterion) {
    let engine = build_engine(1.0, FanOut::Sequential);

    c.bench_function("recommend_bounded", |b| {
        b.iter(|| {
            let context = Ctx::new(1, Config::new(20));
            let recommendations = engine.recommend(black_box(&1), &context).unwrap();
            black_box(recommendations)
        })
    });
}

fn bench_unbounded_recommend(c: &mut Criterion) {
    let engine = build_engine(f32::INFINITY, FanOut::Sequential);

    c.bench_function("recommend_unbounded", |b| {
        b.iter(|| {
            let context = Ctx::new(1, Config::new(20));
            let recommendations = engine.recommend(black_box(&1), &context).unwrap();
            black_box(recommendations)
        })
    });
}

fn bench_parallel_recommend(c: &mut Criterion) {
    let engine = build_engine(1.0, FanOut::Parallel);

    c.bench_function("recommend_parallel", |b| {
        b.iter(|| {
            let context = Ctx::new(1, Config::new(20));
            let recommendations = engine.recommend(black_box(&1), &context).unwrap();
            black_box(recommendations)
        })
    });
}

fn bench_safe_prefix(c: &mut Criterion) {
    let scores: Vec<f32> = (0..CANDIDATES).rev().map(|s| s as f32).collect();
    let bounds = ScoreBounds::new(50.0, -50.0);

    c.bench_function("safe_prefix_len", |b| {
        b.iter(|| safe_prefix_len(black_box(&scores), black_box(20), black_box(bounds)))
    });
}

criterion_group!(
    benches,
    bench_bounded_recommend,
    bench_unbounded_recommend,
    bench_parallel_recommend,
    bench_safe_prefix
);
criterion_main!(benches);
