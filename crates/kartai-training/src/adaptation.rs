//! Self-adjusting mutation and new-blood rates.
//!
//! After every generation the adapter compares the generation's best fitness
//! with the best seen so far:
//!
//! - **Improvement** - both rates are multiplied by `relax_factor`, favouring
//!   refinement of what works
//! - **Stagnation** - after `stagnation_limit` generations in a row without
//!   improvement both rates are multiplied by `boost_factor` and the counter
//!   restarts
//!
//! Rates never leave their [`RateBounds`].

use serde::{Deserialize, Serialize};

/// Starting value and limits of an adaptive rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateBounds {
    pub initial: f64,
    pub min: f64,
    pub max: f64,
}

impl RateBounds {
    #[must_use]
    pub const fn new(initial: f64, min: f64, max: f64) -> Self {
        Self { initial, min, max }
    }

    /// Returns `true` if `0 <= min <= initial <= max <= 1`.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        0.0 <= self.min && self.min <= self.initial && self.initial <= self.max && self.max <= 1.0
    }

    fn clamp(&self, rate: f64) -> f64 {
        rate.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptationParams {
    pub relax_factor: f64,
    pub boost_factor: f64,
    pub stagnation_limit: usize,
}

impl Default for AdaptationParams {
    fn default() -> Self {
        Self {
            relax_factor: 0.95,
            boost_factor: 1.5,
            stagnation_limit: 3,
        }
    }
}

/// What the adapter did after observing a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum Adaptation {
    #[display("improved")]
    Improved,
    #[display("stagnant")]
    Stagnant,
    #[display("boosted")]
    Boosted,
}

/// Tracks the best fitness and adjusts the rates used by the next generation.
#[derive(Debug, Clone)]
pub struct RateAdapter {
    params: AdaptationParams,
    mutation_bounds: RateBounds,
    new_blood_bounds: RateBounds,
    mutation_rate: f64,
    new_blood_rate: f64,
    best_fitness: Option<f64>,
    stale_generations: usize,
}

impl RateAdapter {
    #[must_use]
    pub fn new(
        params: AdaptationParams,
        mutation_bounds: RateBounds,
        new_blood_bounds: RateBounds,
    ) -> Self {
        Self {
            params,
            mutation_rate: mutation_bounds.clamp(mutation_bounds.initial),
            new_blood_rate: new_blood_bounds.clamp(new_blood_bounds.initial),
            mutation_bounds,
            new_blood_bounds,
            best_fitness: None,
            stale_generations: 0,
        }
    }

    #[must_use]
    pub fn mutation_rate(&self) -> f64 {
        self.mutation_rate
    }

    #[must_use]
    pub fn new_blood_rate(&self) -> f64 {
        self.new_blood_rate
    }

    #[must_use]
    pub fn best_fitness(&self) -> Option<f64> {
        self.best_fitness
    }

    /// Feeds the best fitness of the generation just evaluated.
    pub fn observe(&mut self, generation_best: f64) -> Adaptation {
        if self.best_fitness.is_none_or(|best| generation_best > best) {
            self.best_fitness = Some(generation_best);
            self.stale_generations = 0;
            self.scale(self.params.relax_factor);
            return Adaptation::Improved;
        }

        self.stale_generations += 1;
        if self.stale_generations >= self.params.stagnation_limit {
            self.stale_generations = 0;
            self.scale(self.params.boost_factor);
            return Adaptation::Boosted;
        }
        Adaptation::Stagnant
    }

    fn scale(&mut self, factor: f64) {
        self.mutation_rate = self.mutation_bounds.clamp(self.mutation_rate * factor);
        self.new_blood_rate = self.new_blood_bounds.clamp(self.new_blood_rate * factor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> RateAdapter {
        RateAdapter::new(
            AdaptationParams::default(),
            RateBounds::new(0.1, 0.02, 0.5),
            RateBounds::new(0.05, 0.01, 0.3),
        )
    }

    #[test]
    fn test_improvement_relaxes_rates() {
        let mut adapter = adapter();
        assert_eq!(adapter.observe(10.0), Adaptation::Improved);
        assert!((adapter.mutation_rate() - 0.095).abs() < 1e-12);
        assert!((adapter.new_blood_rate() - 0.0475).abs() < 1e-12);
        assert_eq!(adapter.best_fitness(), Some(10.0));
    }

    #[test]
    fn test_stagnation_boosts_rates() {
        let mut adapter = adapter();
        adapter.observe(10.0);
        let relaxed = adapter.mutation_rate();
        assert_eq!(adapter.observe(10.0), Adaptation::Stagnant);
        assert_eq!(adapter.observe(5.0), Adaptation::Stagnant);
        assert_eq!(adapter.observe(9.0), Adaptation::Boosted);
        assert!((adapter.mutation_rate() - relaxed * 1.5).abs() < 1e-12);
        assert_eq!(adapter.observe(9.0), Adaptation::Stagnant);
    }

    #[test]
    fn test_rates_stay_within_bounds() {
        let mut adapter = adapter();
        for i in 0..200 {
            adapter.observe(f64::from(i));
        }
        assert_eq!(adapter.mutation_rate(), 0.02);
        assert_eq!(adapter.new_blood_rate(), 0.01);

        for _ in 0..200 {
            adapter.observe(0.0);
        }
        assert_eq!(adapter.mutation_rate(), 0.5);
        assert_eq!(adapter.new_blood_rate(), 0.3);
    }

    #[test]
    fn test_bounds_validation() {
        assert!(RateBounds::new(0.1, 0.02, 0.5).is_valid());
        assert!(!RateBounds::new(0.6, 0.02, 0.5).is_valid());
        assert!(!RateBounds::new(0.1, 0.2, 0.5).is_valid());
        assert!(!RateBounds::new(0.1, 0.0, 1.5).is_valid());
    }
}
