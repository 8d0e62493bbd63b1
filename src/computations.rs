//! The demo's offloaded payload and the input it runs on.

use crate::model::DemoConfig;
use crate::offload::{ComputeError, Computation, Registry};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Sort ascending, drop duplicates, keep even values. Burns `spin_iterations` first to stand in
/// for a long-running job.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvenDistinctSort {
    pub spin_iterations: u64,
}

impl Computation for EvenDistinctSort {
    const NAME: &'static str = "even-distinct-sort";
    type Input = Vec<i64>;
    type Output = Vec<i64>;

    fn compute(&self, mut input: Vec<i64>) -> Result<Vec<i64>, ComputeError> {
        spin(self.spin_iterations);
        input.sort_unstable();
        input.dedup();
        input.retain(|n| n % 2 == 0);
        Ok(input)
    }
}

fn spin(iterations: u64) {
    let mut i = 0u64;
    while std::hint::black_box(i) < iterations {
        i += 1;
    }
}

/// Registry holding every computation the demo can offload.
pub fn registry(cfg: &DemoConfig) -> Registry {
    Registry::builder()
        .register(EvenDistinctSort {
            spin_iterations: cfg.spin_iterations,
        })
        .build()
}

/// `len` random values in `0..max_value`. Deterministic when `seed` is set.
pub fn generate_input(len: usize, max_value: i64, seed: Option<u64>) -> Vec<i64> {
    if max_value <= 0 {
        return vec![0; len];
    }
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    (0..len).map(|_| rng.gen_range(0..max_value)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(input: Vec<i64>) -> Vec<i64> {
        EvenDistinctSort::default().compute(input).expect("compute")
    }

    #[test]
    fn keeps_sorted_distinct_evens() {
        assert_eq!(run(vec![5, 2, 2, 4, 1, 4, 3]), vec![2, 4]);
    }

    #[test]
    fn empty_input() {
        assert_eq!(run(vec![]), Vec::<i64>::new());
    }

    #[test]
    fn no_even_values() {
        assert_eq!(run(vec![7, 9]), Vec::<i64>::new());
    }

    #[test]
    fn negative_evens_survive() {
        assert_eq!(run(vec![-3, -4, 0, -4, 6]), vec![-4, 0, 6]);
    }

    #[test]
    fn seeded_input_is_reproducible_and_bounded() {
        let a = generate_input(500, 100, Some(7));
        let b = generate_input(500, 100, Some(7));
        assert_eq!(a, b);
        assert_eq!(a.len(), 500);
        assert!(a.iter().all(|n| (0..100).contains(n)));
    }

    #[test]
    fn non_positive_bound_yields_zeros() {
        assert_eq!(generate_input(3, 0, None), vec![0, 0, 0]);
    }
}
