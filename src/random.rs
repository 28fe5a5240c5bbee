use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Above this rate the Poisson draw switches to a rounded normal deviate.
pub const POISSON_NORMAL_CUTOFF: f64 = 50.0;
/// Iteration cap for the multiplicative Poisson method.
pub const POISSON_MAX_ITER: u32 = 1000;

/// Source of uniform reals in [0, 1). Every other sampler is derived from
/// `uniform`, so injecting a source fully determines a simulation.
pub trait RandomSource {
    fn uniform(&mut self) -> f64;

    /// Uniform integer in `[a, b]` inclusive. An inverted range yields `a`.
    fn uniform_int(&mut self, a: u32, b: u32) -> u32 {
        if b <= a {
            return a;
        }
        let span = (b - a) as f64 + 1.0;
        let offset = (self.uniform() * span).floor() as u32;
        a + offset.min(b - a)
    }

    /// Bernoulli trial.
    fn chance(&mut self, p: f64) -> bool {
        self.uniform() < p
    }

    /// Box-Muller; a zero uniform is resampled to keep `ln` finite.
    fn normal(&mut self, mu: f64, sigma: f64) -> f64 {
        let mut u = 0.0;
        while u == 0.0 {
            u = self.uniform();
        }
        let mut v = 0.0;
        while v == 0.0 {
            v = self.uniform();
        }
        mu + sigma * (-2.0 * u.ln()).sqrt() * (2.0 * PI * v).cos()
    }

    fn poisson(&mut self, lambda: f64) -> u32 {
        // Also catches NaN.
        if !(lambda > 0.0) {
            return 0;
        }
        if lambda > POISSON_NORMAL_CUTOFF {
            let x = self.normal(lambda, lambda.sqrt()).round();
            return x.max(0.0) as u32;
        }

        let threshold = (-lambda).exp();
        let mut k = 0u32;
        let mut p = 1.0;
        while p > threshold {
            k += 1;
            p *= self.uniform();
            if k > POISSON_MAX_ITER {
                break;
            }
        }
        k.saturating_sub(1)
    }

    /// Index drawn proportionally to `weights`: a uniform point in
    /// `[0, sum)` has each weight subtracted in turn until it goes negative.
    fn weighted_index(&mut self, weights: &[u32]) -> usize {
        let total: u32 = weights.iter().sum();
        if total == 0 {
            return 0;
        }
        let mut r = self.uniform() * total as f64;
        for (idx, w) in weights.iter().enumerate() {
            r -= *w as f64;
            if r < 0.0 {
                return idx;
            }
        }
        weights.len() - 1
    }
}

impl<T: RandomSource + ?Sized> RandomSource for &mut T {
    fn uniform(&mut self) -> f64 {
        (**self).uniform()
    }
}

/// `rand`-backed source.
#[derive(Debug, Clone)]
pub struct RngSource<R = StdRng> {
    rng: R,
}

impl RngSource<StdRng> {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seeded when a seed is configured, entropy otherwise.
    pub fn from_seed_opt(seed: Option<u64>) -> Self {
        match seed {
            Some(s) => Self::seeded(s),
            None => Self::from_entropy(),
        }
    }
}

impl<R: Rng> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn uniform(&mut self) -> f64 {
        self.rng.gen_range(0.0..1.0)
    }
}

/// Replays a fixed list of uniforms, wrapping around at the end.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    values: Vec<f64>,
    pos: usize,
}

impl ScriptedSource {
    /// Values outside `[0, 1)` are dropped; an empty script behaves as a
    /// constant 0.5.
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        let mut values: Vec<f64> = values
            .into_iter()
            .filter(|v| (0.0..1.0).contains(v))
            .collect();
        if values.is_empty() {
            values.push(0.5);
        }
        Self { values, pos: 0 }
    }

    pub fn draws(&self) -> usize {
        self.pos
    }
}

impl RandomSource for ScriptedSource {
    fn uniform(&mut self) -> f64 {
        let v = self.values[self.pos % self.values.len()];
        self.pos += 1;
        v
    }
}

#[cfg(test)]
mod tests {
    use super::{RandomSource, RngSource, ScriptedSource};

    #[test]
    fn poisson_of_zero_or_negative_rate_draws_nothing() {
        let mut src = ScriptedSource::new([0.3]);
        assert_eq!(src.poisson(0.0), 0);
        assert_eq!(src.poisson(-2.0), 0);
        assert_eq!(src.poisson(f64::NAN), 0);
        assert_eq!(src.draws(), 0);
    }

    #[test]
    fn poisson_counts_products_above_threshold() {
        // exp(-1) ~ 0.368: 0.9 -> 0.9, 0.9 -> 0.81, 0.4 -> 0.324 stops at k = 3.
        let mut src = ScriptedSource::new([0.9, 0.9, 0.4]);
        assert_eq!(src.poisson(1.0), 2);
    }

    #[test]
    fn poisson_iteration_cap_bounds_the_loop() {
        // Uniforms this close to 1 never push the product under exp(-40)
        // within the cap.
        let mut src = ScriptedSource::new([0.999_999_9]);
        assert_eq!(src.poisson(40.0), 1000);
        assert_eq!(src.draws(), 1001);
    }

    #[test]
    fn large_rate_uses_normal_approximation() {
        let mut rng = RngSource::seeded(7);
        let n = 2000;
        let total: u64 = (0..n).map(|_| rng.poisson(200.0) as u64).sum();
        let mean = total as f64 / n as f64;
        assert!((mean - 200.0).abs() < 3.0, "mean {mean}");
    }

    #[test]
    fn normal_resamples_zero_uniform() {
        let mut src = ScriptedSource::new([0.0, 0.5, 0.25]);
        let x = src.normal(0.0, 1.0);
        assert!(x.is_finite());
    }

    #[test]
    fn uniform_int_covers_closed_range() {
        let mut low = ScriptedSource::new([0.0]);
        let mut high = ScriptedSource::new([0.999_999]);
        assert_eq!(low.uniform_int(1, 8), 1);
        assert_eq!(high.uniform_int(1, 8), 8);
        assert_eq!(low.uniform_int(5, 5), 5);
    }

    #[test]
    fn weighted_index_walks_weights_in_order() {
        let weights = [30, 35, 20, 10, 4, 1];
        let mut src = ScriptedSource::new([0.0, 0.29, 0.30, 0.649, 0.65, 0.995]);
        let picks: Vec<usize> = (0..6).map(|_| src.weighted_index(&weights)).collect();
        assert_eq!(picks, vec![0, 0, 1, 1, 2, 5]);
    }
}
