//! Epsilon-greedy variant selection.

use dyntest_core::config::validate_epsilon;
use dyntest_core::ExperimentResult;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::catalog::{Catalog, VariantRecord};

/// Which arm of the epsilon-greedy policy produced a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Explore,
    Exploit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub value: String,
    pub branch: Branch,
}

/// Epsilon-greedy bandit over catalog state.
///
/// Selection is pure: it reads counters but never records an exposure.
/// The random source is injectable so tests can pin either branch.
pub struct BanditSelector<R = StdRng> {
    epsilon: f64,
    rng: Mutex<R>,
}

impl BanditSelector<StdRng> {
    /// Selector seeded from OS entropy.
    pub fn new(epsilon: f64) -> ExperimentResult<Self> {
        Self::with_rng(epsilon, StdRng::from_entropy())
    }

    /// Reproducible selector.
    pub fn with_seed(epsilon: f64, seed: u64) -> ExperimentResult<Self> {
        Self::with_rng(epsilon, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> BanditSelector<R> {
    pub fn with_rng(epsilon: f64, rng: R) -> ExperimentResult<Self> {
        validate_epsilon(epsilon)?;
        Ok(Self {
            epsilon,
            rng: Mutex::new(rng),
        })
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Choose a variant for `key`. Unknown keys and experiments without
    /// variants yield `None`.
    pub fn choose(&self, catalog: &Catalog, key: &str) -> Option<Selection> {
        let selection = catalog
            .with_experiment(key, |experiment| self.choose_from(experiment.variants()))
            .flatten();

        match &selection {
            Some(s) => debug!(key, value = %s.value, branch = ?s.branch, "variant selected"),
            None => debug!(key, "no variant available"),
        }
        selection
    }

    /// Core policy over an ordered variant slice.
    pub fn choose_from(&self, variants: &[VariantRecord]) -> Option<Selection> {
        let n = variants.len();
        if n == 0 {
            return None;
        }

        // Exploring a single option is meaningless, so no draw is taken.
        if n > 1 {
            let mut rng = self.rng.lock();
            if rng.gen::<f64>() < self.epsilon {
                let idx = rng.gen_range(0..n);
                return Some(Selection {
                    value: variants[idx].value().to_string(),
                    branch: Branch::Explore,
                });
            }
        }

        best_index(variants).map(|idx| Selection {
            value: variants[idx].value().to_string(),
            branch: Branch::Exploit,
        })
    }
}

/// Index of the strictly highest chance of working; ties keep the earliest.
fn best_index(variants: &[VariantRecord]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, variant) in variants.iter().enumerate() {
        let rate = variant.chance_of_working();
        match best {
            Some((_, best_rate)) if rate <= best_rate => {}
            _ => best = Some((idx, rate)),
        }
    }
    best.map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dyntest_core::ExperimentDefinition;
    use rand::rngs::mock::StepRng;

    fn records(counts: &[(&str, u64, u64)]) -> Vec<VariantRecord> {
        counts
            .iter()
            .map(|(value, displayed, selected)| {
                let mut r = VariantRecord::new(*value);
                for _ in 0..*displayed {
                    r.record_exposure();
                }
                for _ in 0..*selected {
                    assert!(r.record_conversion());
                }
                r
            })
            .collect()
    }

    /// Every draw is just below 1.0, so any epsilon < 1 exploits.
    fn high_draws() -> StepRng {
        StepRng::new(u64::MAX, 0)
    }

    #[test]
    fn test_rejects_invalid_epsilon() {
        assert!(BanditSelector::with_seed(-0.1, 1).is_err());
        assert!(BanditSelector::with_seed(1.1, 1).is_err());
        assert!(BanditSelector::with_seed(0.1, 1).is_ok());
    }

    #[test]
    fn test_exploit_picks_strict_maximum() {
        let selector = BanditSelector::with_rng(0.1, high_draws()).unwrap();
        let variants = records(&[("a", 10, 1), ("b", 10, 5), ("c", 10, 3)]);
        for _ in 0..20 {
            let selection = selector.choose_from(&variants).unwrap();
            assert_eq!(selection.value, "b");
            assert_eq!(selection.branch, Branch::Exploit);
        }
    }

    #[test]
    fn test_exploit_tie_goes_to_first_in_order() {
        let selector = BanditSelector::with_rng(0.1, high_draws()).unwrap();
        let variants = records(&[("a", 4, 1), ("b", 4, 2), ("c", 2, 1)]);
        assert_eq!(selector.choose_from(&variants).unwrap().value, "b");

        let zeroes = records(&[("x", 0, 0), ("y", 0, 0)]);
        assert_eq!(selector.choose_from(&zeroes).unwrap().value, "x");
    }

    #[test]
    fn test_epsilon_comparison_is_strict() {
        // A draw of exactly 0.0 against epsilon 0.0 must not explore.
        let selector = BanditSelector::with_rng(0.0, StepRng::new(0, 0)).unwrap();
        let variants = records(&[("a", 0, 0), ("b", 2, 1)]);
        let selection = selector.choose_from(&variants).unwrap();
        assert_eq!(selection.branch, Branch::Exploit);
        assert_eq!(selection.value, "b");
    }

    #[test]
    fn test_draw_equal_to_epsilon_exploits() {
        // (1 << 63) >> 11 scaled by 2^-53 is exactly 0.5.
        let selector = BanditSelector::with_rng(0.5, StepRng::new(1 << 63, 0)).unwrap();
        let variants = records(&[("a", 0, 0), ("b", 2, 1)]);
        for _ in 0..10 {
            let selection = selector.choose_from(&variants).unwrap();
            assert_eq!(selection.branch, Branch::Exploit);
            assert_eq!(selection.value, "b");
        }
    }

    #[test]
    fn test_exploration_is_uniform() {
        let selector = BanditSelector::with_seed(1.0, 7).unwrap();
        let variants = records(&[("a", 10, 10), ("b", 10, 0), ("c", 10, 0)]);
        let trials = 30_000;
        let mut counts = [0usize; 3];
        for _ in 0..trials {
            let selection = selector.choose_from(&variants).unwrap();
            assert_eq!(selection.branch, Branch::Explore);
            let idx = variants.iter().position(|v| v.value() == selection.value).unwrap();
            counts[idx] += 1;
        }
        let expected = trials / 3;
        for (idx, count) in counts.iter().enumerate() {
            assert!(
                count.abs_diff(expected) < 600,
                "variant {idx} chosen {count} times, expected ~{expected}"
            );
        }
    }

    #[test]
    fn test_single_variant_always_exploits() {
        let selector = BanditSelector::with_seed(1.0, 3).unwrap();
        let variants = records(&[("only", 0, 0)]);
        for _ in 0..50 {
            assert_eq!(selector.choose_from(&variants).unwrap().branch, Branch::Exploit);
        }
    }

    #[test]
    fn test_unknown_and_empty_keys_yield_none() {
        let catalog = Catalog::build(&[ExperimentDefinition::new("Empty", vec![])]).unwrap();
        let selector = BanditSelector::with_seed(0.5, 1).unwrap();
        assert!(selector.choose(&catalog, "Empty").is_none());
        assert!(selector.choose(&catalog, "Missing").is_none());
    }
}
