//! Synthetic series with a known intervention effect.
//!
//! The response follows a local level plus a linear regression on one or
//! more control series; from `intervention` on, `effect` is added.

#![allow(dead_code)]

use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rand_xoshiro::Xoshiro256PlusPlus;

/// Generated data plus the ground truth.
#[derive(Debug, Clone)]
pub struct Synthetic {
    pub response: Vec<f64>,
    pub controls: Vec<Vec<f64>>,
    /// Response without the injected effect.
    pub counterfactual: Vec<f64>,
    pub intervention: usize,
}

impl Synthetic {
    pub fn pre_period(&self) -> (usize, usize) {
        (0, self.intervention - 1)
    }

    pub fn post_period(&self) -> (usize, usize) {
        (self.intervention, self.response.len() - 1)
    }

    /// True post-period cumulative effect.
    pub fn true_cumulative_effect(&self) -> f64 {
        (self.intervention..self.response.len())
            .map(|t| self.response[t] - self.counterfactual[t])
            .sum()
    }
}

/// Parameters of a synthetic series.
#[derive(Debug, Clone, Copy)]
pub struct Recipe {
    pub len: usize,
    pub intervention: usize,
    pub effect: f64,
    pub coefficient: f64,
    pub level_sd: f64,
    pub noise_sd: f64,
    /// Extra controls unrelated to the response.
    pub noise_controls: usize,
}

impl Default for Recipe {
    fn default() -> Self {
        Self {
            len: 100,
            intervention: 70,
            effect: 10.0,
            coefficient: 1.2,
            level_sd: 0.1,
            noise_sd: 1.0,
            noise_controls: 0,
        }
    }
}

/// Generate a series from a recipe.
pub fn generate(recipe: Recipe, seed: u64) -> Synthetic {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let unit = Normal::new(0.0, 1.0).unwrap();

    // Control: AR(1) around 100
    let mut x = Vec::with_capacity(recipe.len);
    let mut state = 0.0;
    for _ in 0..recipe.len {
        state = 0.8 * state + unit.sample(&mut rng);
        x.push(100.0 + 3.0 * state);
    }

    let mut level = 0.0;
    let counterfactual: Vec<f64> = x
        .iter()
        .map(|&xt| {
            level += recipe.level_sd * unit.sample(&mut rng);
            level + recipe.coefficient * xt + recipe.noise_sd * unit.sample(&mut rng)
        })
        .collect();
    let response = counterfactual
        .iter()
        .enumerate()
        .map(|(t, &y)| if t >= recipe.intervention { y + recipe.effect } else { y })
        .collect();

    let mut controls = vec![x];
    for _ in 0..recipe.noise_controls {
        controls.push((0..recipe.len).map(|_| 50.0 + 5.0 * unit.sample(&mut rng)).collect());
    }

    Synthetic {
        response,
        controls,
        counterfactual,
        intervention: recipe.intervention,
    }
}

/// White noise around `mean` with no controls; from `intervention` on,
/// `shift` is added.
pub fn generate_noise(len: usize, intervention: usize, mean: f64, noise_sd: f64, shift: f64, seed: u64) -> Synthetic {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let noise = Normal::new(0.0, noise_sd).unwrap();

    let counterfactual: Vec<f64> = (0..len).map(|_| mean + noise.sample(&mut rng)).collect();
    let response = counterfactual
        .iter()
        .enumerate()
        .map(|(t, &y)| if t >= intervention { y + shift } else { y })
        .collect();

    Synthetic {
        response,
        controls: Vec::new(),
        counterfactual,
        intervention,
    }
}
