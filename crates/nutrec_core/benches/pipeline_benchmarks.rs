//! Criterion benchmarks for nutrec_core hot paths
//!
//! Run with: cargo bench -p nutrec_core

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use nutrec_core::config::RateOfReturnConfig;
use nutrec_core::dcf::{CashFlowBasis, DiscountSchedule, break_even_price};
use nutrec_core::model::CostBreakdown;
use nutrec_core::ror::{RateOfReturnProblem, rate_of_return_curve};
use nutrec_core::sampling::{
    DistributionSpec, ParameterCatalog, ParameterGroup, SamplingMethod, draw_samples,
};

fn create_catalog(parameters: usize) -> ParameterCatalog {
    let specs = (0..parameters)
        .map(|i| {
            let minimum = i as f64;
            if i % 2 == 0 {
                DistributionSpec::uniform(format!("p{i}"), minimum, 10.0)
            } else {
                DistributionSpec::triangular(format!("p{i}"), minimum, 10.0, 0.3)
            }
        })
        .collect();
    ParameterCatalog {
        groups: vec![ParameterGroup {
            name: "bench".to_string(),
            parameters: specs,
        }],
    }
}

fn create_problem() -> RateOfReturnProblem {
    RateOfReturnProblem {
        capital: 400_000.0,
        annual_ongoing: 30_000.0,
        maintenance: 25_000.0,
        maintenance_year: 4,
        lifetime: 8,
        annual_nutrient_mass: 38_000.0,
    }
}

fn bench_sampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("sampling");
    let catalog = create_catalog(80);

    for samples in [1_000, 10_000].iter() {
        group.bench_with_input(
            BenchmarkId::new("latin_hypercube", samples),
            samples,
            |b, &n| {
                b.iter(|| {
                    draw_samples(
                        black_box(&catalog),
                        n,
                        SamplingMethod::LatinHypercube,
                        black_box(42),
                    )
                })
            },
        );
        group.bench_with_input(
            BenchmarkId::new("simple_random", samples),
            samples,
            |b, &n| {
                b.iter(|| {
                    draw_samples(
                        black_box(&catalog),
                        n,
                        SamplingMethod::SimpleRandom,
                        black_box(42),
                    )
                })
            },
        );
    }

    group.finish();
}

fn bench_rate_of_return_curve(c: &mut Criterion) {
    let problem = create_problem();
    let settings = RateOfReturnConfig::default();
    let prices = settings.prices();

    c.bench_function("rate_of_return_101_prices", |b| {
        b.iter(|| rate_of_return_curve(black_box(&problem), black_box(&prices), &settings))
    });
}

fn bench_break_even(c: &mut Criterion) {
    let asset = CostBreakdown {
        material: 200_000.0,
        labor: 50_000.0,
        operating: 8_000.0,
        maintenance: 20_000.0,
        consumable: 12_000.0,
    };
    let basis = CashFlowBasis {
        assets: vec![asset; 5],
        land_lease: 1_000.0,
        annual_nutrient_mass: 38_000.0,
    };

    c.bench_function("break_even_price", |b| {
        b.iter(|| {
            let schedule = DiscountSchedule::new(black_box(0.1), 8, 4);
            break_even_price(black_box(&basis), black_box(0.3), &schedule)
        })
    });
}

criterion_group!(
    benches,
    bench_sampling,
    bench_rate_of_return_curve,
    bench_break_even,
);
criterion_main!(benches);
