//! Recovery of injected effects.

use causal_impact::{CausalImpact, ImpactData, PredictionMode};

use crate::series::{generate, Recipe, Synthetic};

fn data_for(synthetic: &Synthetic) -> ImpactData {
    ImpactData::new(
        synthetic.response.clone(),
        synthetic.controls.clone(),
        synthetic.pre_period(),
        synthetic.post_period(),
    )
    .unwrap()
}

#[test]
fn detects_level_shift_with_control() {
    let synthetic = generate(Recipe::default(), 1);
    let analysis = CausalImpact::new()
        .iterations(600)
        .burn_in(100)
        .seed(1)
        .run(&data_for(&synthetic))
        .unwrap();

    let totals = analysis.post_period().unwrap();
    let truth = synthetic.true_cumulative_effect();
    assert_eq!(totals.n_steps, 30);
    let estimate = &totals.effect_cumulative;
    assert!(
        (estimate.mean - truth).abs() <= 3.0 * estimate.sd,
        "cumulative effect {estimate:?} far from {truth}"
    );
    assert!(analysis.is_significant());
    assert!(totals.p_value < 0.05, "p = {}", totals.p_value);
    assert!((totals.prob_causal_effect + totals.p_value - 1.0).abs() < 1e-12);

    let inclusion = analysis.inclusion_probabilities.as_ref().unwrap();
    assert!(inclusion[0] > 0.9, "inclusion was {}", inclusion[0]);
}

#[test]
fn no_effect_is_not_significant() {
    let synthetic = generate(
        Recipe {
            effect: 0.0,
            ..Recipe::default()
        },
        2,
    );
    let analysis = CausalImpact::new()
        .iterations(600)
        .burn_in(100)
        .seed(2)
        .run(&data_for(&synthetic))
        .unwrap();
    let p = analysis.p_value().unwrap();
    assert!(p > 0.01, "p = {p} for a null effect");
}

#[test]
fn ignores_unrelated_controls() {
    let synthetic = generate(
        Recipe {
            noise_controls: 4,
            ..Recipe::default()
        },
        3,
    );
    let analysis = CausalImpact::new()
        .iterations(600)
        .burn_in(100)
        .seed(3)
        .run(&data_for(&synthetic))
        .unwrap();
    let inclusion = analysis.inclusion_probabilities.as_ref().unwrap();
    assert_eq!(inclusion.len(), 5);
    assert!(inclusion[0] > 0.9, "true control inclusion {}", inclusion[0]);
    for (j, &p) in inclusion.iter().enumerate().skip(1) {
        assert!(p < 0.5, "noise control {j} inclusion {p}");
    }
}

#[test]
fn univariate_step_change() {
    let mut response: Vec<f64> = (0..80).map(|t| 20.0 + (t as f64 * 0.9).sin()).collect();
    for y in &mut response[60..] {
        *y += 5.0;
    }
    let data = ImpactData::univariate(response, (0, 59), (60, 79)).unwrap();
    let analysis = CausalImpact::new().iterations(500).burn_in(100).run(&data).unwrap();
    let totals = analysis.post_period().unwrap();
    let effect = &totals.effect_average;
    assert!(effect.mean > 4.0 && effect.mean < 6.0, "{effect:?}");
    assert!(effect.lower > 0.0);
}

#[test]
fn missing_post_values_and_gap() {
    let synthetic = generate(Recipe::default(), 4);
    let mut response = synthetic.response.clone();
    response[80] = f64::NAN;
    response[81] = f64::NAN;
    let data = ImpactData::new(response, synthetic.controls.clone(), (0, 64), (70, 99)).unwrap();
    let analysis = CausalImpact::new()
        .iterations(300)
        .burn_in(50)
        .prediction_mode(PredictionMode::Projected)
        .run(&data)
        .unwrap();

    let totals = analysis.post_period().unwrap();
    assert_eq!(totals.n_steps, 28);

    // Gap steps are forecast but carry no cumulative effect
    let gap = analysis.at(67).unwrap();
    assert!(gap.cumulative_effect.is_none());

    let missing = analysis.at(80).unwrap();
    assert!(missing.observed.is_none());
    assert!(missing.effect.is_none());
    let before = analysis.at(79).unwrap().cumulative_effect.unwrap();
    let carried = missing.cumulative_effect.unwrap();
    assert!((before.mean - carried.mean).abs() < 1e-9);
}

#[test]
fn trend_and_seasonal_model_runs() {
    let response: Vec<f64> = (0..84)
        .map(|t| 10.0 + 0.05 * t as f64 + [0.0, 1.0, 2.0, 1.0, 0.0, -2.0, -2.0][t % 7] + 0.1 * ((t * 7919) % 13) as f64)
        .collect();
    let data = ImpactData::univariate(response, (0, 69), (70, 83)).unwrap();
    let analysis = CausalImpact::new()
        .trend(true)
        .seasonal(7)
        .iterations(300)
        .burn_in(100)
        .run(&data)
        .unwrap();
    assert_eq!(analysis.summary.steps.len(), 84);
    assert!(analysis.p_value().unwrap() > 0.0);
}

#[test]
fn multiple_chains_pool_and_agree() {
    let synthetic = generate(Recipe::default(), 5);
    let analysis = CausalImpact::new()
        .iterations(400)
        .burn_in(100)
        .chains(3)
        .keep_draws(true)
        .run(&data_for(&synthetic))
        .unwrap();
    assert_eq!(analysis.diagnostics.chains.len(), 3);
    assert_eq!(analysis.summary.n_draws, 900);
    assert_eq!(analysis.draws.as_ref().unwrap().len(), 900);
    let r_hat = analysis.diagnostics.max_r_hat().unwrap();
    assert!(r_hat < 1.2, "R-hat {r_hat}");
}
