//! Cancelled runs.

use causal_impact::{Cancellation, CausalImpact, ImpactData, ImpactError};

fn data() -> ImpactData {
    let response = (0..50).map(|t| 3.0 + (t as f64 * 0.4).cos()).collect();
    ImpactData::univariate(response, (0, 39), (40, 49)).unwrap()
}

#[test]
fn cancelled_run_is_refused() {
    let token = Cancellation::new();
    token.cancel();
    let err = CausalImpact::new()
        .iterations(100)
        .burn_in(10)
        .chains(2)
        .cancellation(token)
        .run(&data())
        .unwrap_err();
    assert_eq!(
        err,
        ImpactError::IncompleteDraws {
            completed: 0,
            requested: 200
        }
    );
}

#[test]
fn cancelled_run_without_draws_cannot_be_summarized() {
    let token = Cancellation::new();
    token.cancel();
    let err = CausalImpact::new()
        .iterations(100)
        .burn_in(10)
        .allow_incomplete(true)
        .cancellation(token)
        .run(&data())
        .unwrap_err();
    assert!(matches!(err, ImpactError::Sampler(_)), "{err}");
}
