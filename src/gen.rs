//! Random instance generators.
//!
//! Processing times are drawn independently and uniformly, which is how the well known benchmark
//! sets for `F|prmu|C_max` are generated (Taillard uses integers in `[1, 99]`).
use rand::distributions::uniform::SampleUniform;
use rand::distributions::{Distribution, Uniform};
use rand::prelude::*;

use crate::pfsp::Instance;
use crate::{Error, Result, Time};

/// Range of processing times of [seeded] instances.
pub const DEFAULT_RANGE: (u32, u32) = (1, 99);

/// Generate an instance with `n` jobs and `m` machines whose processing times are drawn from
/// `U[low, high]`.
///
/// Fails with [Error::InvalidArgument] if `low > high` and with [Error::InvalidInstance] if there
/// would be no jobs or machines (or if the range yields invalid processing times).
pub fn uniform<T, R>(n: usize, m: usize, low: T, high: T, rng: &mut R) -> Result<Instance<T>>
where
    T: Time + SampleUniform,
    R: Rng + ?Sized,
{
    if low > high {
        return Err(Error::InvalidArgument(format!(
            "empty range of processing times [{low:?}, {high:?}]"
        )));
    }

    let dist = Uniform::new_inclusive(low, high);

    let p = (0..n)
        .map(|_| (0..m).map(|_| dist.sample(rng)).collect())
        .collect();

    Instance::new(p)
}

/// Generate a reproducible instance with `n` jobs and `m` machines and integer processing times
/// in [DEFAULT_RANGE].
///
/// ## Example
/// ```
/// # extern crate flowshop;
/// use flowshop::gen;
///
/// let a = gen::seeded(20, 5, 42).expect("valid instance");
/// let b = gen::seeded(20, 5, 42).expect("valid instance");
///
/// assert_eq!(a, b);
/// assert_eq!(a.num_jobs(), 20);
/// assert_eq!(a.num_machines(), 5);
/// ```
pub fn seeded(n: usize, m: usize, seed: u64) -> Result<Instance<u32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let (low, high) = DEFAULT_RANGE;
    uniform(n, m, low, high, &mut rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[test]
    fn uniform_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let instance = uniform(30, 4, 10u16, 20, &mut rng).expect("valid instance");

        assert_eq!(instance.num_jobs(), 30);
        assert_eq!(instance.num_machines(), 4);
        assert!(instance
            .processing_times()
            .iter()
            .flatten()
            .all(|&p| (10..=20).contains(&p)));
    }

    #[test]
    fn seeds_differ() {
        assert_ne!(seeded(10, 3, 1), seeded(10, 3, 2));
    }

    #[rstest]
    #[case::no_jobs(0, 3)]
    #[case::no_machines(3, 0)]
    fn uniform_empty(#[case] n: usize, #[case] m: usize) {
        assert!(matches!(seeded(n, m, 0), Err(Error::InvalidInstance(_))));
    }

    #[test]
    fn uniform_empty_range() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            uniform(2, 2, 5u32, 4, &mut rng),
            Err(Error::InvalidArgument(_))
        ));
    }
}
