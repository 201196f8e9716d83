//! Tests for input validation and preparation.

use causal_impact::{ImpactData, ImpactError};

use crate::series::{generate, Recipe};

fn ramp(n: usize) -> Vec<f64> {
    (0..n).map(|t| t as f64 + (t % 3) as f64).collect()
}

// =============================================================================
// PERIODS
// =============================================================================

#[test]
fn overlapping_periods_rejected() {
    let err = ImpactData::univariate(ramp(20), (0, 10), (10, 19)).unwrap_err();
    assert!(matches!(err, ImpactError::InvalidPeriods { .. }));
}

#[test]
fn reversed_pre_period_rejected() {
    let err = ImpactData::univariate(ramp(20), (8, 3), (10, 19)).unwrap_err();
    assert!(matches!(err, ImpactError::InvalidPeriods { .. }));
}

#[test]
fn post_period_beyond_series_rejected() {
    let err = ImpactData::univariate(ramp(20), (0, 9), (10, 20)).unwrap_err();
    assert!(matches!(err, ImpactError::InvalidPeriods { .. }));
}

#[test]
fn gap_between_periods_accepted() {
    let data = ImpactData::univariate(ramp(30), (0, 14), (20, 29)).unwrap();
    let prepared = data.prepare(true).unwrap();
    assert_eq!(prepared.series.pre_end(), 15);
    assert_eq!(prepared.series.post_start(), 20);
    assert_eq!(prepared.series.post_len(), 10);
}

#[test]
fn data_outside_periods_dropped() {
    let data = ImpactData::univariate(ramp(40), (5, 24), (25, 34)).unwrap();
    let prepared = data.prepare(false).unwrap();
    assert_eq!(prepared.time_offset, 5);
    assert_eq!(prepared.series.len(), 30);
}

// =============================================================================
// RESPONSE
// =============================================================================

#[test]
fn too_few_observations_rejected() {
    let response = vec![1.0, f64::NAN, 2.0, f64::NAN, f64::NAN, f64::NAN];
    let err = ImpactData::univariate(response, (0, 2), (3, 5)).unwrap_err();
    assert_eq!(err, ImpactError::TooFewObservations { found: 2 });
}

#[test]
fn constant_pre_period_rejected() {
    let response = vec![5.0, 5.0, f64::NAN, 5.0, 9.0, 10.0];
    let err = ImpactData::univariate(response, (0, 3), (4, 5)).unwrap_err();
    assert_eq!(err, ImpactError::ConstantResponse { value: 5.0 });
}

#[test]
fn infinite_response_rejected() {
    let mut response = ramp(10);
    response[4] = f64::INFINITY;
    let err = ImpactData::univariate(response, (0, 6), (7, 9)).unwrap_err();
    assert_eq!(err, ImpactError::NonFiniteResponse { index: 4 });
}

#[test]
fn missing_pre_period_rejected() {
    let mut response = vec![f64::NAN; 5];
    response.extend(ramp(5));
    let err = ImpactData::univariate(response, (0, 4), (5, 9)).unwrap_err();
    assert!(matches!(err, ImpactError::InvalidPeriods { .. }));
}

// =============================================================================
// CONTROLS
// =============================================================================

#[test]
fn control_length_mismatch_rejected() {
    let err = ImpactData::new(ramp(10), vec![ramp(10), ramp(9)], (0, 6), (7, 9)).unwrap_err();
    assert_eq!(
        err,
        ImpactError::ControlLength {
            control: 1,
            expected: 10,
            found: 9
        }
    );
}

#[test]
fn missing_control_value_rejected() {
    let mut control = ramp(10);
    control[8] = f64::NAN;
    let err = ImpactData::new(ramp(10), vec![control], (0, 6), (7, 9)).unwrap_err();
    assert_eq!(err, ImpactError::MissingControlValue { control: 0, index: 8 });
}

#[test]
fn missing_control_outside_window_ignored() {
    let mut control = ramp(12);
    control[11] = f64::NAN;
    assert!(ImpactData::new(ramp(12), vec![control], (0, 6), (7, 9)).is_ok());
}

#[test]
fn standardized_pre_period_has_unit_moments() {
    let synthetic = generate(Recipe::default(), 3);
    let data = ImpactData::new(
        synthetic.response.clone(),
        synthetic.controls.clone(),
        synthetic.pre_period(),
        synthetic.post_period(),
    )
    .unwrap();
    let prepared = data.prepare(true).unwrap();
    let (mean, var) = prepared.series.pre_moments();
    assert!(mean.abs() < 1e-10, "mean was {mean}");
    assert!((var - 1.0).abs() < 1e-10, "var was {var}");

    let x = prepared.series.controls().unwrap();
    let pre = synthetic.intervention;
    let col_mean = (0..pre).map(|t| x[(t, 0)]).sum::<f64>() / pre as f64;
    assert!(col_mean.abs() < 1e-10);

    assert!(prepared.response_scaler.is_some());
    let y0 = prepared.series.response()[0].unwrap();
    assert!((prepared.response_scale().apply(y0) - synthetic.response[0]).abs() < 1e-9);
}
