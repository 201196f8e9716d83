//! Tests for configuration validation.
//!
//! Builder methods reject invalid values with a panic; `Config::validate`
//! reports them as errors.

use causal_impact::{CausalImpact, Config, ImpactError};

// =============================================================================
// BUILDER VALIDATION
// =============================================================================

#[test]
#[should_panic(expected = "iterations must be positive")]
fn iterations_zero_panics() {
    let _ = CausalImpact::new().iterations(0);
}

#[test]
#[should_panic(expected = "thinning must be positive")]
fn thinning_zero_panics() {
    let _ = CausalImpact::new().thinning(0);
}

#[test]
#[should_panic(expected = "n_chains must be positive")]
fn chains_zero_panics() {
    let _ = CausalImpact::new().chains(0);
}

#[test]
#[should_panic(expected = "alpha must be in (0, 1)")]
fn alpha_zero_panics() {
    let _ = CausalImpact::new().alpha(0.0);
}

#[test]
#[should_panic(expected = "alpha must be in (0, 1)")]
fn alpha_one_panics() {
    let _ = CausalImpact::new().alpha(1.0);
}

#[test]
#[should_panic(expected = "seasonal_period must be at least 2")]
fn seasonal_period_one_panics() {
    let _ = CausalImpact::new().seasonal(1);
}

#[test]
#[should_panic(expected = "state_sd_guess must be positive")]
fn state_sd_guess_negative_panics() {
    let _ = CausalImpact::new().state_sd_guess(-0.01);
}

#[test]
fn builder_sets_values() {
    let ci = CausalImpact::new()
        .iterations(500)
        .burn_in(50)
        .thinning(2)
        .chains(3)
        .alpha(0.1)
        .seasonal(7)
        .trend(true)
        .standardize(false)
        .max_model_size(2);
    let config = ci.config();
    assert_eq!(config.iterations, 500);
    assert_eq!(config.burn_in, 50);
    assert_eq!(config.thinning, 2);
    assert_eq!(config.n_chains, 3);
    assert_eq!(config.alpha, 0.1);
    assert_eq!(config.seasonal_period, Some(7));
    assert!(config.trend);
    assert!(!config.standardize);
    assert_eq!(config.max_model_size, Some(2));
}

// =============================================================================
// Config::validate
// =============================================================================

#[test]
fn default_config_valid() {
    assert!(Config::default().validate().is_ok());
}

#[test]
fn burn_in_not_below_iterations_rejected() {
    let config = Config {
        iterations: 200,
        burn_in: 250,
        ..Config::default()
    };
    assert!(matches!(config.validate(), Err(ImpactError::InvalidConfig { .. })));
}

#[test]
fn non_positive_prior_rejected() {
    let config = Config {
        observation_sample_size: 0.0,
        ..Config::default()
    };
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("observation_sample_size"), "{err}");
}

#[test]
fn zero_max_model_size_rejected() {
    let config = Config {
        max_model_size: Some(0),
        ..Config::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn invalid_config_fails_run() {
    let data = causal_impact::ImpactData::univariate(
        (0..20).map(|t| (t as f64).sin()).collect(),
        (0, 14),
        (15, 19),
    )
    .unwrap();
    let config = Config {
        burn_in: 2_000,
        ..Config::default()
    };
    let err = CausalImpact::with_config(config).run(&data).unwrap_err();
    assert!(matches!(err, ImpactError::InvalidConfig { .. }));
}
