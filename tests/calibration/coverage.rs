//! Interval coverage of the cumulative effect and false-positive rate.

use causal_impact::{CausalImpact, ImpactData};

use crate::series::{generate, generate_noise, Recipe, Synthetic};

const TRIALS: u64 = 60;

/// Whether the 95% interval covered the truth, the p-value, and the
/// posterior mean cumulative effect.
fn analyze(synthetic: &Synthetic, seed: u64) -> (bool, f64, f64) {
    let data = ImpactData::new(
        synthetic.response.clone(),
        synthetic.controls.clone(),
        synthetic.pre_period(),
        synthetic.post_period(),
    )
    .unwrap();
    let analysis = CausalImpact::new()
        .iterations(1_000)
        .burn_in(200)
        .seed(seed)
        .run(&data)
        .unwrap();
    let totals = analysis.post_period().unwrap();
    (
        totals.effect_cumulative.covers(synthetic.true_cumulative_effect()),
        totals.p_value,
        totals.effect_cumulative.mean,
    )
}

fn run_trial(recipe: Recipe, seed: u64) -> (bool, f64, f64) {
    analyze(&generate(recipe, seed), seed)
}

#[test]
#[ignore]
fn shift_without_controls_is_calibrated() {
    // 70 pre-period and 30 post-period steps of N(10, 1), shifted by +1.
    let shift = 1.0;
    let truth = shift * 30.0;

    let mut covered = 0;
    let mut total_estimate = 0.0;
    for seed in 0..TRIALS {
        let synthetic = generate_noise(100, 70, 10.0, 1.0, shift, 3_000 + seed);
        assert!((synthetic.true_cumulative_effect() - truth).abs() < 1e-9);
        let (covers, _, estimate) = analyze(&synthetic, 3_000 + seed);
        covered += usize::from(covers);
        total_estimate += estimate;
    }
    let rate = covered as f64 / TRIALS as f64;
    let mean_estimate = total_estimate / TRIALS as f64;
    eprintln!("[coverage, no controls] {covered}/{TRIALS} = {rate:.3}, mean estimate {mean_estimate:.3} (truth {truth})");

    assert!(rate >= 0.90, "95% interval covered the true effect in only {rate:.3} of trials");
    // sd of one estimate is about 6.5, so about 0.85 for the average
    assert!(
        (mean_estimate - truth).abs() < 4.0,
        "mean cumulative effect {mean_estimate:.3}, truth {truth}"
    );
}

#[test]
#[ignore]
fn regression_interval_coverage() {
    let covered = (0..TRIALS)
        .filter(|&seed| run_trial(Recipe::default(), 1_000 + seed).0)
        .count();
    let rate = covered as f64 / TRIALS as f64;
    eprintln!("[coverage, one control] {covered}/{TRIALS} = {rate:.3}");
    assert!(rate >= 0.85, "95% interval covered the true effect in only {rate:.3} of trials");
}

#[test]
#[ignore]
fn null_false_positive_rate() {
    let recipe = Recipe {
        effect: 0.0,
        ..Recipe::default()
    };
    let rejections = (0..TRIALS)
        .filter(|&seed| run_trial(recipe, 2_000 + seed).1 < 0.05)
        .count();
    let rate = rejections as f64 / TRIALS as f64;
    eprintln!("[null] {rejections}/{TRIALS} = {rate:.3}");
    assert!(rate <= 0.15, "false-positive rate {rate:.3} at p < 0.05");
}
