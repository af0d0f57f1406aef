//! # Permutation flow-shop scheduling
//! This crate approximates solutions of the **permutation flow-shop** problem `F|prmu|C_max`.
//!
//! ## Problem
//!  - There are `n` jobs and `m` machines
//!  - Every job visits every machine in the same fixed order `0..m`
//!  - Every machine processes the jobs in the same order (a single permutation of jobs)
//!  - Job `j` occupies machine `k` for `p[j][k]` time units without interruption
//!
//! The objective is to **minimize the maximum completion time** (makespan) which is the time at
//! which the last job leaves the last machine. The problem is *NP-hard* for `m >= 3`.
//!
//! ## Algorithms
//! The [neh] module implements the *Nawaz–Enscore–Ham* (NEH) construction heuristic:
//!  1. jobs are sorted by their total processing time in non-increasing order
//!  1. the better ordering of the first two jobs is kept
//!  1. every other job is inserted at the position of the partial sequence that minimizes the
//!     partial makespan
//!
//! Supporting machinery (makespan evaluation and sequence relocation) lives in [pfsp].
//!
//! ## Example
//! ```
//! # extern crate flowshop;
//! use flowshop::pfsp::Instance;
//! use flowshop::neh;
//!
//! // p[job][machine]
//! let p: Vec<Vec<u32>> = vec![vec![4, 3], vec![2, 5]];
//! let instance = Instance::new(p).expect("valid instance");
//!
//! let solution = neh::neh(&instance).expect("feasible solution");
//!
//! assert_eq!(solution.sequence, vec![1, 0]);
//! assert_eq!(solution.value, 10);
//! ```
use std::fmt::Debug;
use std::ops::Add;

use num_traits::{CheckedAdd, Float, Zero};
use ordered_float::OrderedFloat;

pub mod error;
pub mod gen;
pub mod io;
pub mod monitor;
pub mod neh;
pub mod pfsp;

pub use error::{Error, Result};

/// Numeric domain of processing and completion times.
///
/// Implemented for unsigned and signed integers and for floats wrapped in
/// [`OrderedFloat`](ordered_float::OrderedFloat) (which makes them totally ordered).
pub trait Time: Copy + Debug + Ord + Zero + Add<Output = Self> {
    /// Upper bound of the time domain. Processing times must be strictly lower.
    fn inf() -> Self;

    #[inline]
    fn is_inf(&self) -> bool {
        *self == Self::inf()
    }

    /// Sum of two times or `None` if it does not fit into the time domain.
    fn checked_add(self, rhs: Self) -> Option<Self>;
}

macro_rules! int_time {
    ($($t:ty),*) => {
        $(
            impl Time for $t {
                #[inline]
                fn inf() -> Self {
                    <$t>::MAX
                }

                #[inline]
                fn checked_add(self, rhs: Self) -> Option<Self> {
                    CheckedAdd::checked_add(&self, &rhs)
                }
            }
        )*
    };
}

int_time!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl<F: Float + Debug> Time for OrderedFloat<F> {
    #[inline]
    fn inf() -> Self {
        OrderedFloat(F::infinity())
    }

    #[inline]
    fn checked_add(self, rhs: Self) -> Option<Self> {
        Some(self + rhs).filter(|sum| !sum.is_inf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_inf() {
        assert!(OrderedFloat::<f64>::inf().is_inf());
        assert!(!OrderedFloat(42.).is_inf());
        // NaN is ordered above infinity
        assert!(OrderedFloat(f64::NAN) > OrderedFloat::<f64>::inf());
    }

    #[test]
    fn int_inf() {
        assert_eq!(u8::inf(), 255);
        assert!(u32::MAX.is_inf());
        assert!(!0i64.is_inf());
    }

    #[test]
    fn checked_add_overflow() {
        assert_eq!(Time::checked_add(200u8, 55), Some(255));
        assert_eq!(Time::checked_add(200u8, 56), None);
        assert_eq!(Time::checked_add(-100i8, -29), None);
        assert_eq!(
            Time::checked_add(OrderedFloat(1.5), OrderedFloat(2.)),
            Some(OrderedFloat(3.5))
        );
        assert_eq!(
            Time::checked_add(OrderedFloat(f64::MAX), OrderedFloat(f64::MAX)),
            None
        );
    }
}
