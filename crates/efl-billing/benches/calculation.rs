//! Calculation benchmarks
//!
//! - single usage level, by tier count
//! - standard usage levels
//! - cached lookups

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use efl_billing::{CostCache, CostCalculator};
use efl_common::{BillCredit, EnergyTier, RateStructure, TduDelivery};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn tiered(tier_count: u32) -> RateStructure {
    let mut builder = RateStructure::builder()
        .with_base_charge(dec!(9.95))
        .with_tdu(TduDelivery::new(dec!(4.23), dec!(0.038287)))
        .with_bill_credit(BillCredit::bounded(dec!(1000), dec!(2000), dec!(50)));

    for index in 0..tier_count - 1 {
        let lower = Decimal::from(index * 500);
        builder = builder.with_tier(EnergyTier::bounded(lower, lower + dec!(500), dec!(0.09)));
    }
    builder
        .with_tier(EnergyTier::open(Decimal::from((tier_count - 1) * 500), dec!(0.07)))
        .build()
        .expect("valid benchmark structure")
}

fn bench_calculate(c: &mut Criterion) {
    let mut group = c.benchmark_group("calculate");
    let calculator = CostCalculator::new();

    for tier_count in [1u32, 2, 4, 8] {
        let rates = tiered(tier_count);
        group.bench_with_input(BenchmarkId::new("tiers", tier_count), &rates, |b, rates| {
            b.iter(|| calculator.calculate(black_box(rates), black_box(dec!(1500))))
        });
    }

    group.finish();
}

fn bench_standard_levels(c: &mut Criterion) {
    let calculator = CostCalculator::new();
    let rates = tiered(3);

    c.bench_function("calculate_standard", |b| {
        b.iter(|| calculator.calculate_standard(black_box(&rates)))
    });
}

fn bench_cached(c: &mut Criterion) {
    let calculator = CostCalculator::new();
    let cache = CostCache::new(1_000);
    let rates = tiered(3);

    c.bench_function("calculate_cached_hit", |b| {
        b.iter(|| cache.get_or_calculate(&calculator, black_box(&rates), dec!(1000)))
    });
}

criterion_group!(benches, bench_calculate, bench_standard_levels, bench_cached);
criterion_main!(benches);
