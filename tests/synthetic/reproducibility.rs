//! Same seed, same data, same configuration: identical results.

use causal_impact::{CausalImpact, ImpactData};

use crate::series::{generate, Recipe};

fn data() -> ImpactData {
    let synthetic = generate(Recipe::default(), 11);
    ImpactData::new(
        synthetic.response.clone(),
        synthetic.controls.clone(),
        synthetic.pre_period(),
        synthetic.post_period(),
    )
    .unwrap()
}

#[test]
fn same_seed_same_analysis() {
    let ci = CausalImpact::new().iterations(200).burn_in(50).chains(2).seed(99);
    let a = ci.run(&data()).unwrap();
    let b = ci.run(&data()).unwrap();
    assert_eq!(a.summary, b.summary);
    assert_eq!(a.inclusion_probabilities, b.inclusion_probabilities);
    assert_eq!(a.diagnostics, b.diagnostics);
}

#[test]
fn different_seed_different_draws() {
    let a = CausalImpact::new().iterations(200).burn_in(50).seed(1).run(&data()).unwrap();
    let b = CausalImpact::new().iterations(200).burn_in(50).seed(2).run(&data()).unwrap();
    assert_ne!(a.summary, b.summary);
}
