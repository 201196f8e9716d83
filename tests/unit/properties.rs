//! Property tests for the filter, the variance draws and standardization.

use causal_impact::engine::filter::{backward_sample, forward_filter, predictive_log_likelihood};
use causal_impact::engine::model::{InitialState, Priors};
use causal_impact::engine::types::Observation;
use causal_impact::engine::variance::draw_variances;
use causal_impact::engine::{ModelSpec, StateSpaceModel, Variances};
use causal_impact::ImpactData;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Series of 10 to 80 steps, roughly one in ten missing, first step present.
fn observations() -> impl Strategy<Value = Vec<Observation>> {
    prop::collection::vec(prop::option::weighted(0.9, -100.0f64..100.0), 10..80).prop_map(|mut obs| {
        if obs[0].is_none() {
            obs[0] = Some(0.0);
        }
        obs
    })
}

fn model(trend: bool) -> (ModelSpec, StateSpaceModel) {
    let spec = if trend {
        ModelSpec::local_linear_trend()
    } else {
        ModelSpec::local_level()
    };
    let model = StateSpaceModel::new(&spec).unwrap();
    (spec, model)
}

fn variances(observation: f64, level: f64, trend: bool) -> Variances {
    Variances {
        observation,
        level: Some(level),
        trend: trend.then_some(level / 10.0),
        seasonal: None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The filter's log likelihood is finite and matches its recomputation
    #[test]
    fn prop_filter_log_likelihood_finite(
        obs in observations(),
        h in 1e-3f64..10.0,
        q in 1e-6f64..1.0,
        trend in any::<bool>(),
    ) {
        let (_, model) = model(trend);
        let vars = variances(h, q, trend);
        let init = InitialState { level_mean: obs[0].unwrap_or(0.0), variance: 100.0 };
        let offsets = vec![0.0; obs.len()];

        let filtered = forward_filter(&model, &obs, &offsets, &vars, &init, 0.0).unwrap();
        prop_assert!(filtered.log_likelihood.is_finite());

        let recomputed = predictive_log_likelihood(&model, &obs, &offsets, &vars, &filtered);
        let tolerance = 1e-8 * (1.0 + filtered.log_likelihood.abs());
        prop_assert!((recomputed - filtered.log_likelihood).abs() < tolerance);
    }

    /// Variance draws given a sampled trajectory are positive and finite
    #[test]
    fn prop_variance_draws_positive(
        obs in observations(),
        h in 1e-3f64..10.0,
        q in 1e-6f64..1.0,
        trend in any::<bool>(),
        seed in any::<u64>(),
    ) {
        let (_, model) = model(trend);
        let vars = variances(h, q, trend);
        let init = InitialState { level_mean: obs[0].unwrap_or(0.0), variance: 100.0 };
        let offsets = vec![0.0; obs.len()];
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

        let filtered = forward_filter(&model, &obs, &offsets, &vars, &init, 0.0).unwrap();
        let states = backward_sample(&model, &filtered, &mut rng).unwrap();
        let drawn = draw_variances(&model, &Priors::default(), &obs, &offsets, &states, &mut rng).unwrap();

        prop_assert!(drawn.observation > 0.0 && drawn.observation.is_finite());
        let level = drawn.level.unwrap();
        prop_assert!(level > 0.0 && level.is_finite());
        prop_assert_eq!(drawn.trend.is_some(), trend);
        if let Some(slope) = drawn.trend {
            prop_assert!(slope > 0.0 && slope.is_finite());
        }
    }

    /// Standardization gives the pre-period zero mean and unit variance,
    /// and the response scale maps every value back
    #[test]
    fn prop_standardized_pre_period(values in prop::collection::vec(-1e3f64..1e3, 12..60)) {
        let n = values.len();
        let pre_end = n - 5;
        prop_assume!(values[..=pre_end].iter().any(|&v| v != values[0]));

        let data = ImpactData::univariate(values.clone(), (0, pre_end), (pre_end + 1, n - 1)).unwrap();
        let prepared = data.prepare(true).unwrap();
        let (mean, var) = prepared.series.pre_moments();
        prop_assert!(mean.abs() < 1e-9, "mean was {}", mean);
        prop_assert!((var - 1.0).abs() < 1e-9, "var was {}", var);

        let scale = prepared.response_scale();
        for (y, &original) in prepared.series.response().iter().zip(&values) {
            let back = scale.apply(y.unwrap());
            prop_assert!((back - original).abs() < 1e-9 * (1.0 + original.abs()));
        }
    }
}
