//! Flow properties checked on seeded random benchmarks.

mod common;

use common::{config, BenchBuilder};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tdm_solve::run_flow;

/// A random acyclic design over three devices: instance `i` only drives
/// instances with a larger index.
fn random_bench(seed: u64) -> common::Bench {
    let mut rng = StdRng::seed_from_u64(seed);
    let count = 30;
    let mut b = BenchBuilder::new();
    for i in 0..count {
        let kind = if rng.gen_bool(0.25) { "ff" } else { "lut" };
        let pos = (
            f64::from(rng.gen_range(0..20u32)),
            f64::from(rng.gen_range(0..20u32)),
        );
        b.inst(&format!("i{i}"), kind, rng.gen_range(0..3), pos);
    }
    for i in 0..count - 1 {
        let fanout = rng.gen_range(1..=3);
        let mut sinks: Vec<usize> = (0..fanout).map(|_| rng.gen_range(i + 1..count)).collect();
        sinks.sort_unstable();
        sinks.dedup();
        let names: Vec<String> = sinks.iter().map(|s| format!("i{s}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        b.net(&format!("i{i}"), &refs);
    }
    b.write()
}

#[test]
fn random_designs_end_legal_and_within_limits() {
    for seed in 0..6 {
        let bench = random_bench(seed);
        let mut ctx = bench.context(config(3, 2));
        let summary = run_flow(&mut ctx, &bench.out()).unwrap();

        assert!(summary.solution.legal, "seed {seed}");
        assert_eq!(summary.solution.limit_vio, 0, "seed {seed}");
        for t in ctx.db.troncons() {
            if !t.is_active() {
                for v in &t.vars {
                    assert_eq!(ctx.db.value(*v), 1.0, "seed {seed}");
                }
            }
        }
    }
}

#[test]
fn random_designs_refinement_never_slows() {
    for seed in 10..14 {
        let bench = random_bench(seed);
        let mut ctx = bench.context(config(3, 2));
        let summary = run_flow(&mut ctx, &bench.out()).unwrap();
        let refine = summary.refine.unwrap();
        assert!(refine.at_after <= refine.at_before + 1e-9, "seed {seed}");
        assert!(summary.solution.at <= refine.at_before + 1e-9, "seed {seed}");
    }
}

#[test]
fn random_designs_are_deterministic() {
    let bench = random_bench(42);
    let mut first = bench.context(config(3, 1));
    run_flow(&mut first, &bench.out()).unwrap();
    let mut second = bench.context(config(3, 3));
    run_flow(&mut second, &bench.out()).unwrap();
    assert_eq!(first.db.values(), second.db.values());
}
